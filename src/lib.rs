//! PD-TSP Tabu Search Library
//!
//! Tabu Search for the single-vehicle Pickup and Delivery Traveling Salesman
//! Problem (PD-TSP), with an exhaustive baseline for small instances.
//!
//! # Features
//!
//! - Typed mathematical formulation (flow and capacity constraints 6.09 to 6.16)
//! - Tour evaluator building the incidence matrix and commodity flows
//! - Permutation-based construction of a feasible starting tour
//! - Swap neighborhood with tenure, aspiration and frequency penalties
//! - Brute-force enumeration and benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use pd_tsp_tabu::instance::PdpInstance;
//! use pd_tsp_tabu::heuristics::tabu_search::TabuSearch;
//! use pd_tsp_tabu::exact::BruteForce;
//!
//! let instance = PdpInstance::instance_one();
//!
//! let optimum = BruteForce::new().run(&instance).unwrap();
//! let outcome = TabuSearch::with_params(5, 10, 0.0).run(&instance).unwrap();
//!
//! println!("Brute force: {:?} = {}", optimum.best_tour, optimum.best_value);
//! println!("Tabu search: {:?} = {}", outcome.best_tour, outcome.best_value);
//! ```

pub mod combinatorics;
pub mod constraints;
pub mod error;
pub mod evaluator;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod exact;
pub mod benchmark;

pub use error::{InstanceError, SearchError, TourError};
pub use exact::BruteForce;
pub use heuristics::tabu_search::TabuSearch;
pub use instance::PdpInstance;
pub use solution::{Solution, Solver};
