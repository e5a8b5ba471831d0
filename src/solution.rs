//! Solution representation for PD-TSP.
//!
//! This module provides the result record produced by every solver and the
//! trait solvers implement.

use crate::error::{SearchError, TourError};
use crate::evaluator::{Evaluator, Tour};
use crate::instance::PdpInstance;
use serde::{Deserialize, Serialize};

/// Represents a solution to the PD-TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of node indices (starting and ending at depot 0)
    pub tour: Tour,
    /// Objective value (total travel cost)
    pub cost: f64,
    /// Whether the tour satisfies every constraint
    pub feasible: bool,
    /// Violated constraint identifier, when infeasible
    pub violated: Option<String>,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            feasible: false,
            violated: None,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Evaluate a tour and wrap it
    pub fn from_tour(
        instance: &PdpInstance,
        tour: Tour,
        algorithm: &str,
    ) -> Result<Self, TourError> {
        let mut solution = Solution {
            tour,
            algorithm: algorithm.to_string(),
            ..Solution::new()
        };
        solution.validate(instance)?;
        Ok(solution)
    }

    /// Recompute cost and feasibility
    pub fn validate(&mut self, instance: &PdpInstance) -> Result<(), TourError> {
        let eval = Evaluator::new(instance);
        self.cost = eval.objective(&self.tour)?;
        let report = eval.check_constraints(&self.tour)?;
        self.feasible = report.is_feasible();
        self.violated = report.violated.map(|c| c.id());
        Ok(())
    }

    /// Get the position of a node in the tour
    pub fn position(&self, node: usize) -> Option<usize> {
        self.tour.iter().position(|&n| n == node)
    }

    /// Vehicle load (pickup carried + delivery still on board) after each stop
    pub fn load_profile(&self, instance: &PdpInstance) -> Vec<i32> {
        let mut carried = 0;
        let mut remaining = instance.total_delivery();
        self.tour
            .iter()
            .map(|&node| {
                carried += instance.pickup()[node];
                remaining -= instance.delivery()[node];
                carried + remaining
            })
            .collect()
    }

    /// Get maximum load during tour
    pub fn max_load(&self, instance: &PdpInstance) -> i32 {
        self.load_profile(instance).into_iter().max().unwrap_or(0)
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        if let Some(id) = &self.violated {
            writeln!(f, "  Violated: (Eq. {})", id)?;
        }
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

/// Trait for complete solvers (search drivers and exact baselines)
pub trait Solver {
    fn solve(&self, instance: &PdpInstance) -> Result<Solution, SearchError>;
    fn name(&self) -> &str;
}
