//! Benchmarking and experimentation module for PD-TSP.
//!
//! Runs the exhaustive baseline and a set of Tabu Search configurations,
//! collects statistics, and compares the heuristic against the optimum.

use crate::error::SearchError;
use crate::exact::BruteForce;
use crate::heuristics::tabu_search::TabuSearch;
use crate::instance::PdpInstance;
use crate::solution::{Solution, Solver};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Solver label and what it returned
type LabeledOutcome = (String, Result<Solution, SearchError>);

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Instance capacity
    pub capacity: i32,
    /// Solution cost
    pub cost: f64,
    /// Whether solution is feasible
    pub feasible: bool,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Gap to best known (if available)
    pub gap_to_best: Option<f64>,
    /// Error message when the solver failed
    pub error: Option<String>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    pub num_instances: usize,
    pub num_feasible: usize,
    pub avg_cost: f64,
    pub best_cost: f64,
    pub worst_cost: f64,
    /// Sample standard deviation of cost (0 for a single result)
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Stall bound for every tabu run
    pub n_iter: usize,
    /// One tabu run per tenure
    pub tenures: Vec<usize>,
    /// Frequency penalty weight
    pub penalty_weight: f64,
    /// Run the exhaustive baseline when the instance is small enough
    pub run_exact: bool,
    /// Customer limit for the exhaustive baseline
    pub exact_max_customers: usize,
    /// Run instances in parallel
    pub parallel: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            n_iter: 100,
            tenures: vec![3, 5, 10],
            penalty_weight: 0.0,
            run_exact: true,
            exact_max_customers: 8,
            parallel: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Set best known solution for an instance
    pub fn set_best_known(&mut self, instance_name: &str, cost: f64) {
        self.best_known.insert(instance_name.to_string(), cost);
    }

    fn solvers(&self, instance: &PdpInstance) -> Vec<(String, Box<dyn Solver + Send + Sync>)> {
        let mut solvers: Vec<(String, Box<dyn Solver + Send + Sync>)> = Vec::new();
        if self.config.run_exact && instance.num_customers() <= self.config.exact_max_customers {
            solvers.push((
                "BruteForce".to_string(),
                Box::new(BruteForce::with_max_customers(self.config.exact_max_customers)),
            ));
        }
        for &tenure in &self.config.tenures {
            solvers.push((
                format!("TabuSearch-t{}", tenure),
                Box::new(TabuSearch::with_params(
                    self.config.n_iter,
                    tenure,
                    self.config.penalty_weight,
                )),
            ));
        }
        solvers
    }

    /// Run every configured solver on one instance, without recording.
    fn evaluate_instance(&self, instance: &PdpInstance) -> Vec<LabeledOutcome> {
        log::info!("Running benchmark on instance: {}", instance.name());
        self.solvers(instance)
            .into_iter()
            .map(|(label, solver)| (label, solver.solve(instance)))
            .collect()
    }

    /// Run full benchmark on an instance
    pub fn run_on_instance(&mut self, instance: &PdpInstance) {
        let outcomes = self.evaluate_instance(instance);
        self.absorb(instance, outcomes);
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[PdpInstance]) {
        let outcomes: Vec<_> = if self.config.parallel {
            instances
                .par_iter()
                .map(|instance| self.evaluate_instance(instance))
                .collect()
        } else {
            instances
                .iter()
                .map(|instance| self.evaluate_instance(instance))
                .collect()
        };
        for (instance, per_instance) in instances.iter().zip(outcomes) {
            self.absorb(instance, per_instance);
        }
    }

    /// Record outcomes; an exact optimum becomes the best known value first.
    fn absorb(&mut self, instance: &PdpInstance, outcomes: Vec<LabeledOutcome>) {
        for (label, outcome) in &outcomes {
            if let (true, Ok(solution)) = (label == "BruteForce", outcome) {
                if solution.feasible {
                    self.set_best_known(instance.name(), solution.cost);
                }
            }
        }
        for (label, outcome) in outcomes {
            match outcome {
                Ok(mut solution) => {
                    solution.algorithm = label;
                    self.record_result(instance, &solution);
                }
                Err(e) => {
                    log::error!("{} failed on {}: {}", label, instance.name(), e);
                    self.results.push(AlgorithmResult {
                        algorithm: label,
                        instance: instance.name().to_string(),
                        dimension: instance.dimension(),
                        capacity: instance.capacity(),
                        cost: f64::INFINITY,
                        feasible: false,
                        time: 0.0,
                        iterations: None,
                        gap_to_best: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }

    /// Record a result
    pub fn record_result(&mut self, instance: &PdpInstance, solution: &Solution) {
        let gap_to_best = self
            .best_known
            .get(instance.name())
            .filter(|&&best| best > 0.0)
            .map(|&best| (solution.cost - best) / best * 100.0);

        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name().to_string(),
            dimension: instance.dimension(),
            capacity: instance.capacity(),
            cost: solution.cost,
            feasible: solution.feasible,
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_best,
            error: None,
        });
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<&str, Vec<&AlgorithmResult>> = HashMap::new();
        for result in &self.results {
            stats_map.entry(&result.algorithm).or_default().push(result);
        }

        let mut statistics = Vec::new();
        for (algo, results) in stats_map {
            let feasible: Vec<&&AlgorithmResult> = results.iter().filter(|r| r.feasible).collect();
            if feasible.is_empty() {
                continue;
            }

            let costs: Vec<f64> = feasible.iter().map(|r| r.cost).collect();
            let times: Vec<f64> = feasible.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = feasible.iter().filter_map(|r| r.gap_to_best).collect();

            let std_cost = if costs.len() > 1 {
                Statistics::std_dev(&costs)
            } else {
                0.0
            };

            statistics.push(AlgorithmStatistics {
                algorithm: algo.to_string(),
                num_instances: results.len(),
                num_feasible: feasible.len(),
                avg_cost: Statistics::mean(&costs),
                best_cost: costs.iter().cloned().fold(f64::INFINITY, f64::min),
                worst_cost: costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                std_cost,
                avg_time: Statistics::mean(&times),
                total_time: times.iter().sum(),
                avg_gap: (!gaps.is_empty()).then(|| Statistics::mean(&gaps)),
            });
        }

        statistics.sort_by(|a, b| {
            a.avg_cost
                .total_cmp(&b.avg_cost)
                .then_with(|| a.algorithm.cmp(&b.algorithm))
        });
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     PD-TSP Tabu Search Benchmark\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str(&"-".repeat(80));
        report.push('\n');
        report.push_str(&format!(
            "{:<25} {:>10} {:>12} {:>12} {:>12} {:>10}\n",
            "Algorithm", "Feasible", "Avg Cost", "Best Cost", "Avg Gap%", "Avg Time"
        ));
        report.push_str(&"-".repeat(80));
        report.push('\n');

        for stat in self.compute_statistics() {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<25} {:>10} {:>12.2} {:>12.2} {:>12} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_feasible, stat.num_instances),
                stat.avg_cost,
                stat.best_cost,
                gap_str,
                stat.avg_time
            ));
        }
        report.push_str(&"-".repeat(80));
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");
        let mut instance_best: Vec<(&str, &AlgorithmResult)> = Vec::new();
        for result in self.results.iter().filter(|r| r.feasible) {
            match instance_best.iter_mut().find(|(name, _)| *name == result.instance) {
                Some(entry) if result.cost < entry.1.cost => entry.1 = result,
                Some(_) => {}
                None => instance_best.push((&result.instance, result)),
            }
        }
        for (instance, best) in instance_best {
            report.push_str(&format!(
                "  {}: {:.2} ({})\n",
                instance, best.cost, best.algorithm
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Get best known values
    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }
}

/// Helper function to load instances from a directory
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<PdpInstance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match PdpInstance::from_file(&path) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }
    }

    // Sort by dimension
    instances.sort_by(|a, b| {
        a.dimension()
            .cmp(&b.dimension())
            .then_with(|| a.name().cmp(b.name()))
    });

    instances
}
