//! Heuristics module for PD-TSP.
//!
//! This module exports the initial solution construction, the swap
//! neighborhood and the Tabu Search driver.

pub mod construction;
pub mod neighborhood;
pub mod tabu_search;

pub use construction::*;
pub use neighborhood::*;
pub use tabu_search::*;
