//! Typed PD-TSP formulation: objective and constraint predicates.
//!
//! Every constraint is a pure predicate over the edge-incidence matrix `X`,
//! the pickup/delivery flow matrices `Y`/`Z`, the demand vectors `P`/`D`
//! and the capacity `Q`. The constraint list of an instance is the
//! single-vehicle PD-TSP model (equations 6.09 to 6.16).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Square integer matrix indexed by node id.
pub type Matrix = Vec<Vec<i32>>;

/// Everything a constraint predicate may read.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub x: &'a Matrix,
    pub y: &'a Matrix,
    pub z: &'a Matrix,
    pub pickup: &'a [i32],
    pub delivery: &'a [i32],
    pub capacity: i32,
}

impl<'a> Bindings<'a> {
    fn out_sum(m: &Matrix, i: usize) -> i32 {
        m[i].iter().sum()
    }

    fn in_sum(m: &Matrix, i: usize) -> i32 {
        m.iter().map(|row| row[i]).sum()
    }
}

/// A single constraint of the formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Customer `node` is left exactly once.
    VisitOnce { node: usize },
    /// In-degree equals out-degree at `node`.
    FlowConservation { node: usize },
    /// At most one vehicle departs the depot.
    SingleDeparture,
    /// `Y[i][j] + Z[i][j] <= Q * X[i][j]`.
    Capacity { from: usize, to: usize },
    /// Outgoing minus incoming pickup flow equals `P[node]`.
    PickupBalance { node: usize },
    /// Incoming minus outgoing delivery flow equals `D[node]`.
    DeliveryBalance { node: usize },
    PickupNonNegative { from: usize, to: usize },
    DeliveryNonNegative { from: usize, to: usize },
    /// `X[i][j]` is 0 or 1.
    BinaryEdge { from: usize, to: usize },
}

impl Constraint {
    /// Evaluate the predicate.
    pub fn holds(&self, b: &Bindings<'_>) -> bool {
        match *self {
            Constraint::VisitOnce { node } => Bindings::out_sum(b.x, node) == 1,
            Constraint::FlowConservation { node } => {
                Bindings::out_sum(b.x, node) - Bindings::in_sum(b.x, node) == 0
            }
            Constraint::SingleDeparture => Bindings::out_sum(b.x, 0) <= 1,
            Constraint::Capacity { from, to } => {
                b.y[from][to] + b.z[from][to] <= b.capacity * b.x[from][to]
            }
            Constraint::PickupBalance { node } => {
                Bindings::out_sum(b.y, node) - Bindings::in_sum(b.y, node) == b.pickup[node]
            }
            Constraint::DeliveryBalance { node } => {
                Bindings::in_sum(b.z, node) - Bindings::out_sum(b.z, node) == b.delivery[node]
            }
            Constraint::PickupNonNegative { from, to } => b.y[from][to] >= 0,
            Constraint::DeliveryNonNegative { from, to } => b.z[from][to] >= 0,
            Constraint::BinaryEdge { from, to } => matches!(b.x[from][to], 0 | 1),
        }
    }

    /// Equation tag of the constraint family.
    pub fn equation(&self) -> &'static str {
        match self {
            Constraint::VisitOnce { .. } => "6.09",
            Constraint::FlowConservation { .. } => "6.10",
            Constraint::SingleDeparture => "6.11",
            Constraint::Capacity { .. } => "6.12",
            Constraint::PickupBalance { .. } => "6.13",
            Constraint::DeliveryBalance { .. } => "6.14",
            Constraint::PickupNonNegative { .. } | Constraint::DeliveryNonNegative { .. } => {
                "6.15"
            }
            Constraint::BinaryEdge { .. } => "6.16",
        }
    }

    /// Stable identifier used in diagnostics, e.g. `6.12[1,2]`.
    pub fn id(&self) -> String {
        match *self {
            Constraint::VisitOnce { node }
            | Constraint::FlowConservation { node }
            | Constraint::PickupBalance { node }
            | Constraint::DeliveryBalance { node } => format!("{}[{}]", self.equation(), node),
            Constraint::SingleDeparture => format!("{}[0]", self.equation()),
            Constraint::Capacity { from, to }
            | Constraint::PickupNonNegative { from, to }
            | Constraint::DeliveryNonNegative { from, to }
            | Constraint::BinaryEdge { from, to } => {
                format!("{}[{},{}]", self.equation(), from, to)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Constraint::VisitOnce { node } => write!(f, "sum_j X[{}][j] == 1", node),
            Constraint::FlowConservation { node } => {
                write!(f, "sum_j X[{0}][j] - sum_j X[j][{0}] == 0", node)
            }
            Constraint::SingleDeparture => write!(f, "sum_j X[0][j] <= 1"),
            Constraint::Capacity { from, to } => {
                write!(f, "Y[{0}][{1}] + Z[{0}][{1}] <= Q * X[{0}][{1}]", from, to)
            }
            Constraint::PickupBalance { node } => {
                write!(f, "sum_j Y[{0}][j] - sum_j Y[j][{0}] == P[{0}]", node)
            }
            Constraint::DeliveryBalance { node } => {
                write!(f, "sum_j Z[j][{0}] - sum_j Z[{0}][j] == D[{0}]", node)
            }
            Constraint::PickupNonNegative { from, to } => write!(f, "Y[{}][{}] >= 0", from, to),
            Constraint::DeliveryNonNegative { from, to } => write!(f, "Z[{}][{}] >= 0", from, to),
            Constraint::BinaryEdge { from, to } => write!(f, "X[{}][{}] in {{0, 1}}", from, to),
        }
    }
}

/// Build the single-vehicle PD-TSP constraint list for `n` nodes.
///
/// Families appear in equation order; each family is expanded in ascending
/// node (or row-major pair) order.
pub fn standard_formulation(n: usize) -> Vec<Constraint> {
    let customers = 1..n;
    let pairs = || (0..n).flat_map(move |i| (0..n).map(move |j| (i, j)));

    let mut constraints = Vec::with_capacity(n + n + 1 + 4 * n * n + 2 * n);
    constraints.extend(customers.clone().map(|node| Constraint::VisitOnce { node }));
    constraints.extend((0..n).map(|node| Constraint::FlowConservation { node }));
    constraints.push(Constraint::SingleDeparture);
    constraints.extend(pairs().map(|(from, to)| Constraint::Capacity { from, to }));
    constraints.extend(customers.clone().map(|node| Constraint::PickupBalance { node }));
    constraints.extend(customers.map(|node| Constraint::DeliveryBalance { node }));
    constraints.extend(pairs().map(|(from, to)| Constraint::PickupNonNegative { from, to }));
    constraints.extend(pairs().map(|(from, to)| Constraint::DeliveryNonNegative { from, to }));
    constraints.extend(pairs().map(|(from, to)| Constraint::BinaryEdge { from, to }));
    constraints
}

/// Objective of the formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    /// `sum_i sum_j X[i][j] * C[i][j]`
    #[default]
    TravelCost,
}

impl Objective {
    pub fn evaluate(&self, x: &Matrix, cost: &[Vec<f64>]) -> f64 {
        match self {
            Objective::TravelCost => x
                .iter()
                .zip(cost)
                .map(|(x_row, c_row)| {
                    x_row
                        .iter()
                        .zip(c_row)
                        .map(|(&x_ij, &c_ij)| x_ij as f64 * c_ij)
                        .sum::<f64>()
                })
                .sum(),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::TravelCost => write!(f, "sum_i sum_j X[i][j] * C[i][j]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formulation_size() {
        let n = 4;
        let constraints = standard_formulation(n);
        // 3 visit-once, 4 conservation, 1 departure, 16 capacity,
        // 3 + 3 balance, 16 + 16 non-negativity, 16 binary
        assert_eq!(constraints.len(), 3 + 4 + 1 + 16 + 3 + 3 + 16 + 16 + 16);
        assert_eq!(constraints[0], Constraint::VisitOnce { node: 1 });
        assert_eq!(constraints[7], Constraint::SingleDeparture);
        assert_eq!(
            constraints.last(),
            Some(&Constraint::BinaryEdge { from: 3, to: 3 })
        );
    }

    #[test]
    fn test_capacity_predicate() {
        let x = vec![vec![0, 1], vec![1, 0]];
        let y = vec![vec![0, 0], vec![5, 0]];
        let z = vec![vec![0, 8], vec![0, 0]];
        let p = [0, 5];
        let d = [0, 8];
        let b = Bindings {
            x: &x,
            y: &y,
            z: &z,
            pickup: &p,
            delivery: &d,
            capacity: 7,
        };
        assert!(!Constraint::Capacity { from: 0, to: 1 }.holds(&b));
        assert!(Constraint::Capacity { from: 1, to: 0 }.holds(&b));
        assert!(Constraint::Capacity { from: 0, to: 0 }.holds(&b));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(Constraint::Capacity { from: 1, to: 2 }.id(), "6.12[1,2]");
        assert_eq!(Constraint::VisitOnce { node: 3 }.id(), "6.09[3]");
        assert_eq!(
            Constraint::BinaryEdge { from: 0, to: 1 }.to_string(),
            "X[0][1] in {0, 1}"
        );
    }

    #[test]
    fn test_travel_cost_objective() {
        let x = vec![vec![0, 1], vec![1, 0]];
        let c = vec![vec![0.0, 3.0], vec![4.0, 0.0]];
        assert_eq!(Objective::TravelCost.evaluate(&x, &c), 7.0);
    }
}
