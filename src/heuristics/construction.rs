//! Initial solution construction by bounded permutation search.

use crate::combinatorics::permutations;
use crate::error::{SearchError, TourError};
use crate::evaluator::{Evaluator, Tour};
use crate::instance::PdpInstance;

/// Builds the starting tour of a search.
///
/// A supplied seed tour is used as-is when it is well formed and feasible.
/// Otherwise customer orders are enumerated `perm_depth` positions deep:
/// each k-permutation fixes the first k customers and the remaining ones
/// follow in ascending id order. The first feasible tour wins. When a depth
/// yields nothing feasible the depth grows by one, up to the customer count.
#[derive(Debug, Clone)]
pub struct InitialSolution {
    pub perm_depth: usize,
    pub seed_tour: Option<Tour>,
}

impl InitialSolution {
    pub fn new() -> Self {
        InitialSolution {
            perm_depth: 4,
            seed_tour: None,
        }
    }

    pub fn with_perm_depth(mut self, depth: usize) -> Self {
        self.perm_depth = depth;
        self
    }

    pub fn with_seed_tour(mut self, tour: Option<Tour>) -> Self {
        self.seed_tour = tour;
        self
    }

    pub fn construct(&self, instance: &PdpInstance) -> Result<Tour, SearchError> {
        if self.perm_depth == 0 {
            return Err(SearchError::InvalidConfig(
                "permutation depth must be at least 1".to_string(),
            ));
        }
        let eval = Evaluator::new(instance);

        if let Some(seed) = &self.seed_tour {
            match eval.check_constraints(seed) {
                Ok(report) if report.is_feasible() => {
                    log::info!("Using supplied seed tour {:?}", seed);
                    return Ok(seed.clone());
                }
                Ok(report) => log::warn!(
                    "Seed tour {:?} is infeasible ({:?}), searching for another",
                    seed,
                    report.violated_ids()
                ),
                Err(e) => log::warn!("Seed tour {:?} rejected: {}", seed, e),
            }
        }

        let customers = instance.customers();
        let mut depth = customers.len().min(self.perm_depth);
        loop {
            if let Some(tour) = self.search_depth(&eval, &customers, depth)? {
                log::info!("Initial solution {:?} found at depth {}", tour, depth);
                return Ok(tour);
            }
            if depth >= customers.len() {
                return Err(SearchError::NoInitialSolution { depth });
            }
            log::debug!("No feasible tour at depth {}, widening", depth);
            depth += 1;
        }
    }

    fn search_depth(
        &self,
        eval: &Evaluator<'_>,
        customers: &[usize],
        depth: usize,
    ) -> Result<Option<Tour>, TourError> {
        for prefix in permutations(customers, depth) {
            let tour = complete_tour(&prefix, customers);
            if eval.check_constraints(&tour)?.is_feasible() {
                return Ok(Some(tour));
            }
        }
        Ok(None)
    }
}

impl Default for InitialSolution {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a customer prefix with the depot, appending unused customers in order.
fn complete_tour(prefix: &[usize], customers: &[usize]) -> Tour {
    let mut tour = Vec::with_capacity(customers.len() + 2);
    tour.push(0);
    tour.extend_from_slice(prefix);
    tour.extend(customers.iter().filter(|c| !prefix.contains(*c)));
    tour.push(0);
    tour
}
