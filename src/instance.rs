//! Module for building, loading and describing PD-TSP instances.
//!
//! An instance is a directed cost graph over `n` nodes (node 0 is the depot),
//! a pickup and a delivery quantity per node, a vehicle capacity, and the
//! typed constraint formulation derived from them. Instances are validated on
//! construction and never mutated afterwards.

use crate::constraints::{standard_formulation, Constraint, Objective};
use crate::error::InstanceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Names accepted by [`PdpInstance::builtin`].
pub const BUILTIN_INSTANCES: [&str; 2] = ["instance_one", "instance_two"];

/// On-disk representation; the constraint list is derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceFile {
    name: String,
    cost: Vec<Vec<f64>>,
    pickup: Vec<i32>,
    delivery: Vec<i32>,
    capacity: i32,
    #[serde(default)]
    objective: Objective,
}

/// Represents a complete single-vehicle PD-TSP instance
#[derive(Debug, Clone)]
pub struct PdpInstance {
    name: String,
    cost: Vec<Vec<f64>>,
    pickup: Vec<i32>,
    delivery: Vec<i32>,
    capacity: i32,
    objective: Objective,
    constraints: Vec<Constraint>,
}

impl PdpInstance {
    /// Build and validate an instance.
    pub fn new(
        name: impl Into<String>,
        cost: Vec<Vec<f64>>,
        pickup: Vec<i32>,
        delivery: Vec<i32>,
        capacity: i32,
    ) -> Result<Self, InstanceError> {
        let n = cost.len();
        if n < 2 {
            return Err(InstanceError::Shape(format!(
                "need a depot and at least one customer, got {} node(s)",
                n
            )));
        }
        for (i, row) in cost.iter().enumerate() {
            if row.len() != n {
                return Err(InstanceError::Shape(format!(
                    "cost row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            for (j, &c) in row.iter().enumerate() {
                if !c.is_finite() || c < 0.0 {
                    return Err(InstanceError::Shape(format!(
                        "cost[{}][{}] = {} must be finite and non-negative",
                        i, j, c
                    )));
                }
            }
            if row[i] != 0.0 {
                return Err(InstanceError::Shape(format!(
                    "cost[{0}][{0}] must be 0",
                    i
                )));
            }
        }
        for (label, v) in [("pickup", &pickup), ("delivery", &delivery)] {
            if v.len() != n {
                return Err(InstanceError::Shape(format!(
                    "{} vector has {} entries, expected {}",
                    label,
                    v.len(),
                    n
                )));
            }
            if v[0] != 0 {
                return Err(InstanceError::Shape(format!("{}[0] (depot) must be 0", label)));
            }
            if let Some(node) = v.iter().position(|&q| q < 0) {
                return Err(InstanceError::Shape(format!(
                    "{}[{}] must be non-negative",
                    label, node
                )));
            }
        }
        // Flows are bounded by the pickup total plus the delivery total.
        let load_bound = pickup
            .iter()
            .chain(&delivery)
            .try_fold(0i32, |acc, &q| acc.checked_add(q));
        if load_bound.is_none() {
            return Err(InstanceError::Shape(
                "combined pickup and delivery totals overflow i32".to_string(),
            ));
        }
        if capacity <= 0 {
            return Err(InstanceError::Shape(format!(
                "capacity must be positive, got {}",
                capacity
            )));
        }

        Ok(PdpInstance {
            name: name.into(),
            constraints: standard_formulation(n),
            cost,
            pickup,
            delivery,
            capacity,
            objective: Objective::TravelCost,
        })
    }

    /// Load an instance from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let text = fs::read_to_string(&path)?;
        let file: InstanceFile = serde_json::from_str(&text)?;
        let mut instance =
            Self::new(file.name, file.cost, file.pickup, file.delivery, file.capacity)?;
        instance.objective = file.objective;
        log::debug!(
            "Loaded instance {} ({} nodes) from {:?}",
            instance.name,
            instance.dimension(),
            path.as_ref()
        );
        Ok(instance)
    }

    /// Write the instance as pretty JSON
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), InstanceError> {
        let file = InstanceFile {
            name: self.name.clone(),
            cost: self.cost.clone(),
            pickup: self.pickup.clone(),
            delivery: self.delivery.clone(),
            capacity: self.capacity,
            objective: self.objective,
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// One of the bundled reference instances, by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "instance_one" => Some(Self::instance_one()),
            "instance_two" => Some(Self::instance_two()),
            _ => None,
        }
    }

    /// Resolve a bundled name first, then a JSON path.
    pub fn resolve(reference: &str) -> Result<Self, InstanceError> {
        match Self::builtin(reference) {
            Some(instance) => Ok(instance),
            None => Self::from_file(reference),
        }
    }

    /// Four nodes, capacity 150.
    pub fn instance_one() -> Self {
        let cost = [
            [0.0, 25.0, 15.0, 10.0],
            [25.0, 0.0, 5.0, 30.0],
            [15.0, 5.0, 0.0, 20.0],
            [10.0, 30.0, 20.0, 0.0],
        ];
        Self::bundled(
            "instance_one",
            cost.iter().map(|r| r.to_vec()).collect(),
            vec![0, 30, 60, 20],
            vec![0, 70, 10, 40],
        )
    }

    /// Five nodes with costs in the tens of thousands, capacity 150.
    pub fn instance_two() -> Self {
        let cost = [
            [0.0, 70_000.0, 55_000.0, 3_000.0, 65_000.0],
            [70_000.0, 0.0, 14_000.0, 65_000.0, 75_000.0],
            [55_000.0, 14_000.0, 0.0, 50_000.0, 55_000.0],
            [3_000.0, 65_000.0, 50_000.0, 0.0, 65_000.0],
            [65_000.0, 75_000.0, 55_000.0, 65_000.0, 0.0],
        ];
        Self::bundled(
            "instance_two",
            cost.iter().map(|r| r.to_vec()).collect(),
            vec![0, 17, 21, 35, 10],
            vec![0, 16, 21, 35, 8],
        )
    }

    fn bundled(name: &str, cost: Vec<Vec<f64>>, pickup: Vec<i32>, delivery: Vec<i32>) -> Self {
        // Bundled data satisfies every check in `new`.
        let n = cost.len();
        PdpInstance {
            name: name.to_string(),
            constraints: standard_formulation(n),
            cost,
            pickup,
            delivery,
            capacity: 150,
            objective: Objective::TravelCost,
        }
    }

    /// Generate a random instance with `customers` customers.
    ///
    /// Costs are symmetric integers in 1..=100, pickups and deliveries are in
    /// 0..=50. The capacity always covers the heavier of the two totals plus
    /// half of the lighter one, so some (but usually not all) orders are
    /// feasible. Deterministic via seed.
    pub fn random(customers: usize, seed: u64) -> Self {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = customers + 1;

        let mut cost = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i + 1..n {
                let c = rng.gen_range(1..=100u32) as f64;
                cost[i][j] = c;
                cost[j][i] = c;
            }
        }

        let mut pickup = vec![0; n];
        let mut delivery = vec![0; n];
        for node in 1..n {
            pickup[node] = rng.gen_range(0..=50);
            delivery[node] = rng.gen_range(0..=50);
        }

        let total_pickup: i32 = pickup.iter().sum();
        let total_delivery: i32 = delivery.iter().sum();
        let capacity =
            (total_pickup.max(total_delivery) + total_pickup.min(total_delivery) / 2).max(1);

        PdpInstance {
            name: format!("random-{}-{}", customers, seed),
            constraints: standard_formulation(n),
            cost,
            pickup,
            delivery,
            capacity,
            objective: Objective::TravelCost,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes, depot included
    pub fn dimension(&self) -> usize {
        self.cost.len()
    }

    /// Get the number of customer nodes (excluding depot)
    pub fn num_customers(&self) -> usize {
        self.dimension() - 1
    }

    /// Customer node ids in ascending order
    pub fn customers(&self) -> Vec<usize> {
        (1..self.dimension()).collect()
    }

    #[inline]
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.cost[i][j]
    }

    pub fn cost_matrix(&self) -> &[Vec<f64>] {
        &self.cost
    }

    pub fn pickup(&self) -> &[i32] {
        &self.pickup
    }

    pub fn delivery(&self) -> &[i32] {
        &self.delivery
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn total_pickup(&self) -> i32 {
        self.pickup.iter().sum()
    }

    pub fn total_delivery(&self) -> i32 {
        self.delivery.iter().sum()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();
        let off_diagonal: Vec<f64> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| self.cost(i, j))
            .collect();
        let avg_cost = off_diagonal.iter().sum::<f64>() / off_diagonal.len() as f64;
        let max_cost = off_diagonal.iter().cloned().fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            capacity: self.capacity,
            num_pickups: self.pickup.iter().filter(|&&p| p > 0).count(),
            num_deliveries: self.delivery.iter().filter(|&&d| d > 0).count(),
            total_pickup: self.total_pickup(),
            total_delivery: self.total_delivery(),
            avg_cost,
            max_cost,
        }
    }

    /// Human-readable listing of the objective and every constraint.
    pub fn formulation(&self) -> Formulation<'_> {
        Formulation { instance: self }
    }
}

/// Statistics about a PD-TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub capacity: i32,
    pub num_pickups: usize,
    pub num_deliveries: usize,
    pub total_pickup: i32,
    pub total_delivery: i32,
    pub avg_cost: f64,
    pub max_cost: f64,
}

impl fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} (1 depot + {} customers)", self.dimension, self.dimension - 1)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Pickup nodes: {}", self.num_pickups)?;
        writeln!(f, "  Delivery nodes: {}", self.num_deliveries)?;
        writeln!(f, "  Total pickup load: {}", self.total_pickup)?;
        writeln!(f, "  Total delivery load: {}", self.total_delivery)?;
        writeln!(f, "  Avg cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Max cost: {:.2}", self.max_cost)
    }
}

/// Display adapter returned by [`PdpInstance::formulation`].
pub struct Formulation<'a> {
    instance: &'a PdpInstance,
}

impl fmt::Display for Formulation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inst = self.instance;
        writeln!(f, "Problem {}:", inst.name)?;
        writeln!(f)?;
        writeln!(f, "MINIMIZE:")?;
        writeln!(f, "    {}", inst.objective)?;
        writeln!(f)?;
        writeln!(f, "Subject to:")?;
        for (idx, constraint) in inst.constraints.iter().enumerate() {
            writeln!(f, "{:>60}   (Eq. {:03})", constraint.to_string(), idx + 1)?;
        }
        writeln!(f)?;
        writeln!(f, "With:")?;
        writeln!(f, "Capacity     (Q): {}", inst.capacity)?;
        writeln!(f, "Pickup       (P): {:?}", inst.pickup)?;
        writeln!(f, "Delivery     (D): {:?}", inst.delivery)?;
        writeln!(f, "Cost matrix  (C):")?;
        for row in &inst.cost {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>8}", c)).collect();
            writeln!(f, "  [{}]", cells.join(" "))?;
        }
        Ok(())
    }
}
