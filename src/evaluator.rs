//! Tour evaluation: objective value, flow reconstruction and constraint checks.
//!
//! A tour is `[0, c1, c2, ..., c_{n-1}, 0]`. From it we derive the
//! edge-incidence matrix `X` and the pickup/delivery flow matrices `Y`/`Z`,
//! then evaluate the instance's objective and constraints against them.

use crate::constraints::{Bindings, Constraint, Matrix};
use crate::error::TourError;
use crate::instance::PdpInstance;

/// A depot-anchored node sequence.
pub type Tour = Vec<usize>;

/// Consecutive `(from, to)` pairs of a tour
pub fn edge_order(tour: &[usize]) -> Vec<(usize, usize)> {
    tour.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Build the `n x n` edge-incidence matrix of an edge list
pub fn incidence_matrix(edges: &[(usize, usize)], n: usize) -> Result<Matrix, TourError> {
    let mut x = vec![vec![0; n]; n];
    for &(i, j) in edges {
        if i >= n || j >= n {
            return Err(TourError::malformed(format!(
                "edge ({}, {}) is outside a {}-node instance",
                i, j, n
            )));
        }
        x[i][j] = 1;
    }
    Ok(x)
}

/// Outcome of a constraint check
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintReport {
    /// First constraint found violated, if any
    pub violated: Option<Constraint>,
}

impl ConstraintReport {
    pub fn is_feasible(&self) -> bool {
        self.violated.is_none()
    }

    /// Identifiers of the violated constraints
    pub fn violated_ids(&self) -> Vec<String> {
        self.violated.iter().map(Constraint::id).collect()
    }
}

/// Evaluates tours against one instance.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    instance: &'a PdpInstance,
}

impl<'a> Evaluator<'a> {
    pub fn new(instance: &'a PdpInstance) -> Self {
        Evaluator { instance }
    }

    pub fn instance(&self) -> &'a PdpInstance {
        self.instance
    }

    /// Check length, depot anchoring and that every customer appears once.
    pub fn validate_tour(&self, tour: &[usize]) -> Result<(), TourError> {
        let n = self.instance.dimension();
        if tour.len() != n + 1 {
            return Err(TourError::malformed(format!(
                "expected {} nodes, got {}",
                n + 1,
                tour.len()
            )));
        }
        if tour[0] != 0 || tour[n] != 0 {
            return Err(TourError::malformed(format!(
                "tour {:?} must start and end at the depot",
                tour
            )));
        }

        let mut seen = vec![false; n];
        for &node in &tour[1..n] {
            if node == 0 || node >= n {
                return Err(TourError::malformed(format!(
                    "node {} is not a customer",
                    node
                )));
            }
            if seen[node] {
                return Err(TourError::malformed(format!("node {} visited twice", node)));
            }
            seen[node] = true;
        }
        Ok(())
    }

    /// Objective value of a tour
    pub fn objective(&self, tour: &[usize]) -> Result<f64, TourError> {
        self.validate_tour(tour)?;
        let x = incidence_matrix(&edge_order(tour), self.instance.dimension())?;
        Ok(self
            .instance
            .objective()
            .evaluate(&x, self.instance.cost_matrix()))
    }

    /// Pickup (`Y`) and delivery (`Z`) flow along the edges.
    ///
    /// `Y[i][j]` is the pickup load carried after visiting `i`; `Z[i][j]` is
    /// the delivery load still on board after serving `i`.
    pub fn flows(&self, edges: &[(usize, usize)]) -> Result<(Matrix, Matrix), TourError> {
        let n = self.instance.dimension();
        let pickup = self.instance.pickup();
        let delivery = self.instance.delivery();
        if let Some(&(i, j)) = edges.iter().find(|&&(i, j)| i >= n || j >= n) {
            return Err(TourError::malformed(format!(
                "edge ({}, {}) is outside a {}-node instance",
                i, j, n
            )));
        }

        let mut y = vec![vec![0; n]; n];
        let mut carried = 0;
        for &(i, j) in edges {
            carried += pickup[i];
            y[i][j] = carried;
        }
        let total_pickup = self.instance.total_pickup();
        if carried != total_pickup {
            return Err(TourError::InvariantViolation {
                quantity: "pickup",
                expected: total_pickup,
                actual: carried,
            });
        }

        let mut z = vec![vec![0; n]; n];
        let mut remaining = self.instance.total_delivery();
        for &(i, j) in edges {
            remaining -= delivery[i];
            z[i][j] = remaining;
        }
        if remaining != 0 {
            return Err(TourError::InvariantViolation {
                quantity: "remaining delivery",
                expected: 0,
                actual: remaining,
            });
        }

        Ok((y, z))
    }

    /// Evaluate every constraint, stopping at the first violation.
    pub fn check_constraints(&self, tour: &[usize]) -> Result<ConstraintReport, TourError> {
        self.validate_tour(tour)?;
        let edges = edge_order(tour);
        let n = self.instance.dimension();
        let x = incidence_matrix(&edges, n)?;
        let (y, z) = self.flows(&edges)?;

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Flow matrix Y for {:?}: {:?}", tour, y);
            log::trace!("Flow matrix Z for {:?}: {:?}", tour, z);
        }

        let bindings = Bindings {
            x: &x,
            y: &y,
            z: &z,
            pickup: self.instance.pickup(),
            delivery: self.instance.delivery(),
            capacity: self.instance.capacity(),
        };

        let violated = self
            .instance
            .constraints()
            .iter()
            .find(|c| !c.holds(&bindings))
            .copied();

        if let Some(c) = &violated {
            log::debug!("Tour {:?} violates (Eq. {}) {}", tour, c.id(), c);
        }
        Ok(ConstraintReport { violated })
    }

    /// `Ok(true)` when the tour satisfies every constraint.
    pub fn is_feasible(&self, tour: &[usize]) -> Result<bool, TourError> {
        Ok(self.check_constraints(tour)?.is_feasible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> PdpInstance {
        PdpInstance::instance_one()
    }

    #[test]
    fn test_edge_order() {
        assert_eq!(
            edge_order(&[0, 1, 2, 3, 0]),
            vec![(0, 1), (1, 2), (2, 3), (3, 0)]
        );
        assert!(edge_order(&[0]).is_empty());
    }

    #[test]
    fn test_incidence_matrix_rejects_out_of_range() {
        let x = incidence_matrix(&[(0, 1), (1, 0)], 2).unwrap();
        assert_eq!(x, vec![vec![0, 1], vec![1, 0]]);
        assert!(matches!(
            incidence_matrix(&[(0, 5)], 2),
            Err(TourError::Malformed { .. })
        ));
    }

    #[test]
    fn test_objective_is_sum_of_edge_costs() {
        let instance = create_test_instance();
        let eval = Evaluator::new(&instance);
        let tours = [
            vec![0, 1, 2, 3, 0],
            vec![0, 1, 3, 2, 0],
            vec![0, 2, 1, 3, 0],
            vec![0, 3, 2, 1, 0],
        ];
        for tour in &tours {
            let expected: f64 = edge_order(tour)
                .iter()
                .map(|&(i, j)| instance.cost(i, j))
                .sum();
            assert_eq!(eval.objective(tour).unwrap(), expected);
        }
        assert_eq!(eval.objective(&[0, 1, 2, 3, 0]).unwrap(), 60.0);
    }

    #[test]
    fn test_flows_follow_the_tour() {
        let instance = create_test_instance();
        let eval = Evaluator::new(&instance);
        let (y, z) = eval.flows(&edge_order(&[0, 1, 2, 3, 0])).unwrap();
        assert_eq!(y[0][1], 0);
        assert_eq!(y[1][2], 30);
        assert_eq!(y[2][3], 90);
        assert_eq!(y[3][0], 110);
        assert_eq!(z[0][1], 120);
        assert_eq!(z[1][2], 50);
        assert_eq!(z[2][3], 40);
        assert_eq!(z[3][0], 0);
    }

    #[test]
    fn test_flows_detect_partial_tour() {
        let instance = create_test_instance();
        let eval = Evaluator::new(&instance);
        let err = eval.flows(&edge_order(&[0, 1, 2, 0])).unwrap_err();
        assert!(matches!(
            err,
            TourError::InvariantViolation { quantity: "pickup", expected: 110, actual: 90 }
        ));
    }

    #[test]
    fn test_malformed_tours_are_rejected() {
        let instance = create_test_instance();
        let eval = Evaluator::new(&instance);
        for tour in [
            vec![0, 1, 2, 0],
            vec![1, 0, 2, 3, 0],
            vec![0, 1, 1, 3, 0],
            vec![0, 1, 2, 7, 0],
            vec![0, 1, 2, 3, 1],
        ] {
            assert!(
                matches!(eval.objective(&tour), Err(TourError::Malformed { .. })),
                "{:?} accepted",
                tour
            );
            assert!(eval.check_constraints(&tour).is_err());
        }
    }

    #[test]
    fn test_check_constraints_capacity() {
        let instance = create_test_instance();
        let eval = Evaluator::new(&instance);

        for tour in [[0, 1, 2, 3, 0], [0, 1, 3, 2, 0], [0, 3, 1, 2, 0], [0, 3, 2, 1, 0]] {
            let report = eval.check_constraints(&tour).unwrap();
            assert!(report.is_feasible(), "{:?} rejected: {:?}", tour, report);
            assert!(report.violated_ids().is_empty());
        }

        // Leaving node 2 first: 60 picked up + 110 still to deliver > 150.
        let report = eval.check_constraints(&[0, 2, 1, 3, 0]).unwrap();
        assert_eq!(report.violated, Some(Constraint::Capacity { from: 2, to: 1 }));
        assert_eq!(report.violated_ids(), vec!["6.12[2,1]".to_string()]);
        assert!(!eval.is_feasible(&[0, 2, 3, 1, 0]).unwrap());
    }

    #[test]
    fn test_tight_capacity_rejects_every_tour() {
        let instance = PdpInstance::new(
            "tight",
            instance_one_costs(),
            vec![0, 30, 60, 20],
            vec![0, 70, 10, 40],
            100,
        )
        .unwrap();
        let eval = Evaluator::new(&instance);
        // The first edge always carries the full delivery load of 120.
        let report = eval.check_constraints(&[0, 1, 2, 3, 0]).unwrap();
        assert_eq!(report.violated, Some(Constraint::Capacity { from: 0, to: 1 }));
    }

    fn instance_one_costs() -> Vec<Vec<f64>> {
        PdpInstance::instance_one().cost_matrix().to_vec()
    }
}
