//! PD-TSP Tabu Search - Command Line Interface
//!
//! Solves the single-vehicle Pickup and Delivery TSP with Tabu Search and
//! compares it against exhaustive enumeration.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pd_tsp_tabu::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use pd_tsp_tabu::exact::BruteForce;
use pd_tsp_tabu::heuristics::tabu_search::TabuSearch;
use pd_tsp_tabu::instance::{PdpInstance, BUILTIN_INSTANCES};
use pd_tsp_tabu::solution::{Solution, Solver};

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pd-tsp-tabu")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Tabu Search for the single-vehicle Pickup and Delivery TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance with Tabu Search
    Solve {
        /// Built-in instance name or path to a JSON instance file
        #[arg(short, long, default_value = "instance_one")]
        instance: String,

        /// Stop after this many consecutive rounds without improvement
        #[arg(short, long, default_value = "100")]
        n_iter: usize,

        /// Rounds a move stays tabu after being applied
        #[arg(short, long, default_value = "10")]
        tenure: usize,

        /// Weight of the frequency penalty
        #[arg(short, long, default_value = "0.0")]
        penalty: f64,

        /// Customers fixed by the construction prefix
        #[arg(long, default_value = "4")]
        perm_depth: usize,

        /// Starting tour, e.g. 0,1,3,2,0
        #[arg(long, value_delimiter = ',')]
        seed_tour: Option<Vec<usize>>,

        /// Evaluate neighbors in parallel
        #[arg(long)]
        parallel: bool,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Solve an instance by exhaustive enumeration
    Brute {
        #[arg(short, long, default_value = "instance_one")]
        instance: String,

        /// Refuse instances with more customers
        #[arg(long, default_value = "9")]
        max_customers: usize,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare Tabu Search against the exhaustive optimum
    Compare {
        #[arg(short, long, default_value = "instance_one")]
        instance: String,

        #[arg(short, long, default_value = "100")]
        n_iter: usize,

        /// Tenures to try
        #[arg(short, long, value_delimiter = ',', default_value = "3,5,10")]
        tenures: Vec<usize>,

        #[arg(short, long, default_value = "0.0")]
        penalty: f64,
    },

    /// Print statistics and the mathematical formulation of an instance
    Analyze {
        #[arg(short, long, default_value = "instance_one")]
        instance: String,
    },

    /// Generate a random instance
    Generate {
        /// Number of customers
        #[arg(short, long, default_value = "6")]
        customers: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run benchmarks on a directory of instances or on random instances
    Benchmark {
        /// Directory containing JSON instance files
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Number of random instances to generate when no directory is given
        #[arg(short, long, default_value = "10")]
        random: usize,

        /// Customers per random instance
        #[arg(short, long, default_value = "6")]
        customers: usize,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        #[arg(short, long, default_value = "100")]
        n_iter: usize,

        #[arg(short, long, value_delimiter = ',', default_value = "3,5,10")]
        tenures: Vec<usize>,

        #[arg(short, long, default_value = "0.0")]
        penalty: f64,

        /// Skip the exhaustive baseline
        #[arg(long)]
        no_exact: bool,

        /// Customer limit for the exhaustive baseline
        #[arg(long, default_value = "8")]
        exact_max_customers: usize,

        /// Run instances one at a time
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            n_iter,
            tenure,
            penalty,
            perm_depth,
            seed_tour,
            parallel,
            output,
            verbose,
        } => {
            let mut ts = TabuSearch::with_params(n_iter, tenure, penalty)
                .with_perm_depth(perm_depth)
                .with_parallel(parallel);
            if let Some(tour) = seed_tour {
                ts = ts.with_seed_tour(tour);
            }
            solve_instance(&instance, &ts, output, verbose);
        }

        Commands::Brute {
            instance,
            max_customers,
            output,
        } => {
            brute_force(&instance, max_customers, output);
        }

        Commands::Compare {
            instance,
            n_iter,
            tenures,
            penalty,
        } => {
            compare(&instance, n_iter, &tenures, penalty);
        }

        Commands::Analyze { instance } => {
            let instance = load_instance(&instance);
            println!("{}", instance.statistics());
            println!("{}", instance.formulation());
        }

        Commands::Generate {
            customers,
            seed,
            output,
        } => {
            let instance = PdpInstance::random(customers, seed);
            if let Err(e) = instance.to_file(&output) {
                eprintln!("Error writing instance: {}", e);
                std::process::exit(1);
            }
            println!("Instance {} saved to {:?}", instance.name(), output);
        }

        Commands::Benchmark {
            dir,
            random,
            customers,
            output,
            n_iter,
            tenures,
            penalty,
            no_exact,
            exact_max_customers,
            sequential,
        } => {
            let instances = match dir {
                Some(dir) => {
                    println!("Loading instances from {:?}...", dir);
                    load_instances_from_dir(&dir)
                }
                None => (0..random as u64)
                    .map(|seed| PdpInstance::random(customers, seed))
                    .collect(),
            };
            let config = BenchmarkConfig {
                n_iter,
                tenures,
                penalty_weight: penalty,
                run_exact: !no_exact,
                exact_max_customers,
                parallel: !sequential,
            };
            run_benchmark(&instances, config, &output);
        }
    }
}

fn load_instance(reference: &str) -> PdpInstance {
    match PdpInstance::resolve(reference) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance {}: {}", reference, e);
            eprintln!("Built-in instances: {}", BUILTIN_INSTANCES.join(", "));
            std::process::exit(1);
        }
    }
}

fn save_solution(solution: &Solution, path: &Path) {
    let written = serde_json::to_string_pretty(solution)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => println!("\nSolution saved to {:?}", path),
        Err(e) => {
            eprintln!("Failed to write output: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_solution(solution: &Solution) {
    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Tour: {:?}", solution.tour);
    println!("Cost: {:.2}", solution.cost);
    println!("Feasible: {}", solution.feasible);
    println!("Time: {:.4}s", solution.computation_time);
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }
}

fn solve_instance(reference: &str, ts: &TabuSearch, output: Option<PathBuf>, verbose: bool) {
    let instance = load_instance(reference);
    if verbose {
        println!("{}", instance.statistics());
    }

    println!(
        "Solving {} with Tabu Search (n_iter={}, tenure={}, penalty={})...",
        instance.name(),
        ts.n_iter,
        ts.tabu_tenure,
        ts.penalty_weight
    );
    let start = Instant::now();
    let outcome = match ts.run(&instance) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Tabu search failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    let mut solution = match Solution::from_tour(&instance, outcome.best_tour.clone(), ts.name()) {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("Invalid tour returned: {}", e);
            std::process::exit(1);
        }
    };
    solution.iterations = Some(outcome.iterations);
    solution.computation_time = elapsed;

    println!("Initial tour: {:?} = {:.2}", outcome.initial_tour, outcome.initial_value);
    print_solution(&solution);
    println!("Rounds: {}", outcome.rounds);

    if verbose {
        println!("Load profile: {:?}", solution.load_profile(&instance));
        println!("Max load: {} / {}", solution.max_load(&instance), instance.capacity());
        println!("Best value per round: {:?}", outcome.history);
        println!("\nTabu table:");
        println!("{:<14} {:>10} {:>12} {:>10} {:>10}", "Move", "Until", "Value", "Freq", "Penalty");
        for entry in &outcome.entries {
            println!(
                "{:<14} {:>10} {:>12.2} {:>10} {:>10.2}",
                entry.mv.to_string(),
                entry.tabu_until,
                entry.move_value,
                entry.frequency,
                entry.penalty
            );
        }
    }

    if let Some(path) = output {
        save_solution(&solution, &path);
    }
}

fn brute_force(reference: &str, max_customers: usize, output: Option<PathBuf>) {
    let instance = load_instance(reference);
    let solver = BruteForce::with_max_customers(max_customers);
    let solution = match solver.solve(&instance) {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("Brute force failed: {}", e);
            std::process::exit(1);
        }
    };
    print_solution(&solution);
    if let Some(path) = output {
        save_solution(&solution, &path);
    }
}

fn compare(reference: &str, n_iter: usize, tenures: &[usize], penalty: f64) {
    let instance = load_instance(reference);
    println!("Comparing solvers on {}...\n", instance.name());

    let optimum = match BruteForce::new().run(&instance) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            println!("Brute force unavailable: {}", e);
            None
        }
    };
    if let Some(opt) = &optimum {
        println!(
            "Brute force: {:?} = {:.2} ({} of {} tours feasible)",
            opt.best_tour, opt.best_value, opt.feasible, opt.explored
        );
    }

    println!(
        "\n{:<10} {:>12} {:>10} {:>10} {:>10}  Tour",
        "Tenure", "Cost", "Gap%", "Moves", "Time"
    );
    println!("{}", "-".repeat(70));
    for &tenure in tenures {
        let start = Instant::now();
        match TabuSearch::with_params(n_iter, tenure, penalty).run(&instance) {
            Ok(outcome) => {
                let gap = optimum
                    .as_ref()
                    .filter(|opt| opt.best_value > 0.0)
                    .map(|opt| (outcome.best_value - opt.best_value) / opt.best_value * 100.0)
                    .map(|gap| format!("{:.2}", gap))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<10} {:>12.2} {:>10} {:>10} {:>10.4}  {:?}",
                    tenure,
                    outcome.best_value,
                    gap,
                    outcome.iterations,
                    start.elapsed().as_secs_f64(),
                    outcome.best_tour
                );
            }
            Err(e) => println!("{:<10} failed: {}", tenure, e),
        }
    }
}

fn run_benchmark(instances: &[PdpInstance], config: BenchmarkConfig, output: &Path) {
    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }
    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    let parallel = config.parallel;
    let mut benchmark = Benchmark::new(config);
    if parallel {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Running {} instances in parallel", instances.len()));
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        benchmark.run_on_instances(instances);
        spinner.finish_with_message("done");
    } else {
        let pb = ProgressBar::new(instances.len() as u64);
        let template = "[{elapsed_precise}] {bar:40} {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style);
        }
        for instance in instances {
            pb.set_message(instance.name().to_string());
            benchmark.run_on_instance(instance);
            pb.inc(1);
        }
        pb.finish_with_message("done");
    }

    let results_path = output.join("results.csv");
    if let Err(e) = benchmark.export_to_csv(&results_path) {
        eprintln!("Failed to export results: {}", e);
        std::process::exit(1);
    }
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    if let Err(e) = benchmark.export_statistics_csv(&stats_path) {
        eprintln!("Failed to export statistics: {}", e);
        std::process::exit(1);
    }
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);
    let report_path = output.join("report.txt");
    match std::fs::write(&report_path, &report) {
        Ok(()) => println!("Report saved to {:?}", report_path),
        Err(e) => eprintln!("Failed to save report: {}", e),
    }
}
