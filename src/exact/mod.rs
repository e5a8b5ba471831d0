//! Exact solvers module.

mod brute_force;

pub use brute_force::*;
