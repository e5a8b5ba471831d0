//! Exhaustive enumeration baseline.
//!
//! Every ordering of the customers is evaluated, so the cost is `O(n!)`.
//! Only meant for verifying heuristics on instances with a handful of
//! customers.

use crate::combinatorics::{factorial, permutations};
use crate::error::SearchError;
use crate::evaluator::{Evaluator, Tour};
use crate::instance::PdpInstance;
use crate::solution::{Solution, Solver};

/// Brute-force solver configuration
#[derive(Debug, Clone)]
pub struct BruteForce {
    /// Refuse instances with more customers than this
    pub max_customers: usize,
}

/// Result of an exhaustive enumeration
#[derive(Debug, Clone)]
pub struct BruteForceOutcome {
    pub best_tour: Tour,
    pub best_value: f64,
    /// Tours enumerated
    pub explored: usize,
    /// Tours satisfying every constraint
    pub feasible: usize,
}

impl BruteForce {
    pub fn new() -> Self {
        BruteForce { max_customers: 9 }
    }

    pub fn with_max_customers(max_customers: usize) -> Self {
        BruteForce { max_customers }
    }

    /// Enumerate all tours and keep the cheapest feasible one.
    ///
    /// Ties go to the tour enumerated first.
    pub fn run(&self, instance: &PdpInstance) -> Result<BruteForceOutcome, SearchError> {
        let customers = instance.customers();
        if customers.len() > self.max_customers {
            return Err(SearchError::InstanceTooLarge {
                customers: customers.len(),
                limit: self.max_customers,
            });
        }
        log::info!(
            "Brute force on {}: {} tours to enumerate",
            instance.name(),
            factorial(customers.len())
        );

        let eval = Evaluator::new(instance);
        let mut best: Option<(Tour, f64)> = None;
        let mut explored = 0;
        let mut feasible = 0;

        for order in permutations(&customers, customers.len()) {
            let mut tour = Vec::with_capacity(order.len() + 2);
            tour.push(0);
            tour.extend(order);
            tour.push(0);
            explored += 1;

            let value = eval.objective(&tour)?;
            let report = eval.check_constraints(&tour)?;
            if !report.is_feasible() {
                log::trace!("{:?} = {} violates {:?}", tour, value, report.violated_ids());
                continue;
            }
            feasible += 1;

            if best.as_ref().map_or(true, |(_, b)| value < *b) {
                log::debug!("New best {:?} = {}", tour, value);
                best = Some((tour, value));
            }
        }

        let (best_tour, best_value) = best.ok_or(SearchError::NoFeasibleTour { explored })?;
        log::info!(
            "Brute force finished: best {:?} = {} ({} of {} tours feasible)",
            best_tour,
            best_value,
            feasible,
            explored
        );
        Ok(BruteForceOutcome {
            best_tour,
            best_value,
            explored,
            feasible,
        })
    }
}

impl Default for BruteForce {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for BruteForce {
    fn solve(&self, instance: &PdpInstance) -> Result<Solution, SearchError> {
        let start = std::time::Instant::now();
        let outcome = self.run(instance)?;
        let mut solution = Solution::from_tour(instance, outcome.best_tour, self.name())?;
        solution.iterations = Some(outcome.explored);
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "BruteForce"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_instance_optimum() {
        let instance = PdpInstance::instance_one();
        let outcome = BruteForce::new().run(&instance).unwrap();
        // [0,1,2,3,0] costs 25+5+20+10; ties keep the first enumerated tour.
        assert_eq!(outcome.best_tour, vec![0, 1, 2, 3, 0]);
        assert_eq!(outcome.best_value, 60.0);
        assert_eq!(outcome.explored, 6);
        // Starting with customer 2 overloads the vehicle.
        assert_eq!(outcome.feasible, 4);
    }

    #[test]
    fn test_optimum_is_minimal_over_all_feasible_tours() {
        let instance = PdpInstance::instance_two();
        let outcome = BruteForce::new().run(&instance).unwrap();
        let eval = Evaluator::new(&instance);
        for order in permutations(&instance.customers(), 4) {
            let tour: Tour = std::iter::once(0).chain(order).chain(std::iter::once(0)).collect();
            if eval.is_feasible(&tour).unwrap() {
                assert!(eval.objective(&tour).unwrap() >= outcome.best_value);
            }
        }
        assert!(eval.is_feasible(&outcome.best_tour).unwrap());
    }

    #[test]
    fn test_refuses_large_instances() {
        let instance = PdpInstance::random(6, 1);
        let err = BruteForce::with_max_customers(5).run(&instance).unwrap_err();
        assert_eq!(
            err,
            SearchError::InstanceTooLarge {
                customers: 6,
                limit: 5
            }
        );
    }

    #[test]
    fn test_reports_infeasible_instance() {
        let instance = PdpInstance::new(
            "tight",
            PdpInstance::instance_one().cost_matrix().to_vec(),
            vec![0, 30, 60, 20],
            vec![0, 70, 10, 40],
            100,
        )
        .unwrap();
        let err = BruteForce::new().run(&instance).unwrap_err();
        assert_eq!(err, SearchError::NoFeasibleTour { explored: 6 });
    }

    #[test]
    fn test_solver_interface() {
        let solution = BruteForce::new().solve(&PdpInstance::instance_one()).unwrap();
        assert_eq!(solution.algorithm, "BruteForce");
        assert!(solution.feasible);
        assert_eq!(solution.iterations, Some(6));
    }
}
