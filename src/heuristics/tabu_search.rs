//! Tabu Search driver for the single-vehicle PD-TSP.
//!
//! # Algorithm
//!
//! 1. Build a feasible starting tour ([`InitialSolution`]).
//! 2. Keep one [`TabuEntry`] per unordered pair of customers.
//! 3. Each round, value every swap applied to the best tour and rank the
//!    moves by `move_value + frequency * penalty_weight`.
//! 4. Take the cheapest move that is not tabu. A tabu move is only taken when
//!    it yields a new feasible best (aspiration); otherwise it is shelved for
//!    the rest of the round and the next cheapest is considered.
//! 5. Stop after `n_iter` consecutive rounds without a feasible improvement.
//!
//! Ties are broken by the order of the tabu table, so runs are reproducible.

use crate::error::{SearchError, TourError};
use crate::evaluator::{Evaluator, Tour};
use crate::heuristics::construction::InitialSolution;
use crate::heuristics::neighborhood::{swap_moves, Move};
use crate::instance::PdpInstance;
use crate::solution::{Solution, Solver};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tabu Search configuration
#[derive(Debug, Clone)]
pub struct TabuSearch {
    /// Consecutive non-improving rounds before termination
    pub n_iter: usize,
    /// Tabu tenure (how long a move stays tabu)
    pub tabu_tenure: usize,
    /// Weight of a move's use count in its penalty
    pub penalty_weight: f64,
    /// Permutation depth of the initial solution search
    pub perm_depth: usize,
    /// Optional starting tour
    pub seed_tour: Option<Tour>,
    /// Evaluate the neighborhood with rayon
    pub parallel: bool,
}

impl TabuSearch {
    pub fn new() -> Self {
        TabuSearch {
            n_iter: 100,
            tabu_tenure: 10,
            penalty_weight: 0.0,
            perm_depth: 4,
            seed_tour: None,
            parallel: false,
        }
    }

    pub fn with_params(n_iter: usize, tabu_tenure: usize, penalty_weight: f64) -> Self {
        TabuSearch {
            n_iter,
            tabu_tenure,
            penalty_weight,
            ..Self::new()
        }
    }

    pub fn with_seed_tour(mut self, tour: Tour) -> Self {
        self.seed_tour = Some(tour);
        self
    }

    pub fn with_perm_depth(mut self, depth: usize) -> Self {
        self.perm_depth = depth;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.n_iter == 0 {
            return Err(SearchError::InvalidConfig("n_iter must be positive".into()));
        }
        if self.tabu_tenure == 0 {
            return Err(SearchError::InvalidConfig("tabu_tenure must be positive".into()));
        }
        if !(self.penalty_weight >= 0.0 && self.penalty_weight.is_finite()) {
            return Err(SearchError::InvalidConfig(format!(
                "penalty_weight must be finite and non-negative, got {}",
                self.penalty_weight
            )));
        }
        Ok(())
    }

    /// Initialize a run: build the starting tour and the tabu table.
    pub fn start<'a>(&self, instance: &'a PdpInstance) -> Result<TabuRun<'a>, SearchError> {
        TabuRun::new(instance, self.clone())
    }

    /// Run to termination.
    pub fn run(&self, instance: &PdpInstance) -> Result<TabuOutcome, SearchError> {
        self.start(instance)?.run()
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for TabuSearch {
    fn solve(&self, instance: &PdpInstance) -> Result<Solution, SearchError> {
        let start = std::time::Instant::now();
        let outcome = self.run(instance)?;
        let mut solution = Solution::from_tour(instance, outcome.best_tour, self.name())?;
        solution.iterations = Some(outcome.iterations);
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "TabuSearch"
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial tour built, no round executed yet
    Init,
    Iterating,
    Terminated,
}

/// Tabu memory for one swap move
#[derive(Debug, Clone, PartialEq)]
pub struct TabuEntry {
    pub mv: Move,
    /// The move is tabu while `tabu_until >= i`
    pub tabu_until: usize,
    /// Objective of the best tour with this move applied
    pub move_value: f64,
    /// Times the move has been applied
    pub frequency: usize,
    /// Selection score; infinite once shelved in the current round
    pub penalty: f64,
}

impl TabuEntry {
    fn new(mv: Move) -> Self {
        TabuEntry {
            mv,
            tabu_until: 0,
            move_value: 0.0,
            frequency: 0,
            penalty: 0.0,
        }
    }

    pub fn is_tabu(&self, i: usize) -> bool {
        self.tabu_until >= i
    }
}

/// Mutable state of one run
#[derive(Debug, Clone)]
pub struct SearchState {
    /// Last accepted candidate, i.e. the accepted swap applied to `best_path`
    pub current_path: Tour,
    pub current_value: f64,
    pub best_path: Tour,
    pub best_value: f64,
    /// Index of the next accepted move (starts at 1)
    pub i: usize,
    /// Consecutive rounds without a feasible improvement
    pub i_termination: usize,
}

/// Result of a Tabu Search run.
#[derive(Debug, Clone)]
pub struct TabuOutcome {
    pub best_tour: Tour,
    pub best_value: f64,
    pub initial_tour: Tour,
    pub initial_value: f64,
    /// Moves accepted
    pub iterations: usize,
    /// Rounds executed (accepted or stalled)
    pub rounds: usize,
    /// Best value after each round
    pub history: Vec<f64>,
    /// Tabu table at termination
    pub entries: Vec<TabuEntry>,
    /// Stopped by the cancellation flag rather than the stall bound
    pub cancelled: bool,
}

/// An in-flight search. Owns its state exclusively.
pub struct TabuRun<'a> {
    eval: Evaluator<'a>,
    config: TabuSearch,
    phase: Phase,
    state: SearchState,
    entries: Vec<TabuEntry>,
    initial_tour: Tour,
    initial_value: f64,
    rounds: usize,
    history: Vec<f64>,
}

impl<'a> TabuRun<'a> {
    fn new(instance: &'a PdpInstance, config: TabuSearch) -> Result<Self, SearchError> {
        config.check()?;
        let eval = Evaluator::new(instance);

        let initial_tour = InitialSolution::new()
            .with_perm_depth(config.perm_depth)
            .with_seed_tour(config.seed_tour.clone())
            .construct(instance)?;
        let initial_value = eval.objective(&initial_tour)?;

        let entries: Vec<TabuEntry> = swap_moves(&instance.customers())
            .into_iter()
            .map(TabuEntry::new)
            .collect();

        log::info!(
            "Tabu search on {}: initial {:?} = {}, {} moves, n_iter={}, tenure={}, penalty={}",
            instance.name(),
            initial_tour,
            initial_value,
            entries.len(),
            config.n_iter,
            config.tabu_tenure,
            config.penalty_weight
        );

        let state = SearchState {
            current_path: initial_tour.clone(),
            current_value: initial_value,
            best_path: initial_tour.clone(),
            best_value: initial_value,
            i: 1,
            i_termination: 0,
        };

        Ok(TabuRun {
            eval,
            config,
            phase: Phase::Init,
            state,
            entries,
            initial_tour,
            initial_value,
            rounds: 0,
            history: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn entries(&self) -> &[TabuEntry] {
        &self.entries
    }

    /// Value every move against the current best tour, in table order.
    fn evaluate_moves(&self) -> Result<Vec<(Tour, f64)>, TourError> {
        let best = &self.state.best_path;
        let eval = self.eval;
        let value = |mv: &Move| -> Result<(Tour, f64), TourError> {
            let candidate = mv.try_apply(best)?;
            let v = eval.objective(&candidate)?;
            Ok((candidate, v))
        };

        if self.config.parallel {
            self.entries.par_iter().map(|e| value(&e.mv)).collect()
        } else {
            self.entries.iter().map(|e| value(&e.mv)).collect()
        }
    }

    /// Constraint check where a broken flow invariant counts as infeasible.
    fn feasible(&self, tour: &[usize]) -> Result<bool, SearchError> {
        match self.eval.check_constraints(tour) {
            Ok(report) => Ok(report.is_feasible()),
            Err(e @ TourError::InvariantViolation { .. }) => {
                log::warn!("Treating {:?} as infeasible: {}", tour, e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Execute one round. Returns the phase after the round.
    pub fn step(&mut self) -> Result<Phase, SearchError> {
        if self.phase == Phase::Terminated {
            return Ok(self.phase);
        }
        self.rounds += 1;

        let candidates = self.evaluate_moves()?;
        let weight = self.config.penalty_weight;
        for (entry, (_, value)) in self.entries.iter_mut().zip(&candidates) {
            entry.move_value = *value;
            entry.penalty = value + entry.frequency as f64 * weight;
        }

        loop {
            let chosen = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| OrderedFloat(e.penalty))
                .map(|(k, _)| k);

            let k = match chosen {
                Some(k) if self.entries[k].penalty.is_finite() => k,
                _ => {
                    self.state.i_termination += 1;
                    log::debug!(
                        "Round {}: no admissible move (stall {})",
                        self.rounds,
                        self.state.i_termination
                    );
                    break;
                }
            };

            let i = self.state.i;
            let move_value = self.entries[k].move_value;
            let candidate = &candidates[k].0;

            if !self.entries[k].is_tabu(i) {
                self.state.current_path = candidate.clone();
                self.state.current_value = move_value;

                if move_value < self.state.best_value {
                    if self.feasible(candidate)? {
                        log::debug!(
                            "Round {}: {} improves best {} -> {}",
                            self.rounds,
                            self.entries[k].mv,
                            self.state.best_value,
                            move_value
                        );
                        self.state.best_path = candidate.clone();
                        self.state.best_value = move_value;
                        self.state.i_termination = 0;
                    } else {
                        log::debug!(
                            "Round {}: {} rejected, improving but infeasible",
                            self.rounds,
                            self.entries[k].mv
                        );
                        self.state.i_termination += 1;
                    }
                } else {
                    log::trace!(
                        "Round {}: {} accepted as non-improving ({})",
                        self.rounds,
                        self.entries[k].mv,
                        move_value
                    );
                    self.state.i_termination += 1;
                }

                let entry = &mut self.entries[k];
                entry.tabu_until = i + self.config.tabu_tenure;
                entry.frequency += 1;
                self.state.i += 1;
                break;
            }

            if move_value < self.state.best_value && self.feasible(candidate)? {
                log::debug!(
                    "Round {}: tabu {} overridden by aspiration ({} -> {})",
                    self.rounds,
                    self.entries[k].mv,
                    self.state.best_value,
                    move_value
                );
                self.state.current_path = candidate.clone();
                self.state.current_value = move_value;
                self.state.best_path = candidate.clone();
                self.state.best_value = move_value;
                self.entries[k].frequency += 1;
                self.state.i_termination = 0;
                self.state.i += 1;
                break;
            }

            self.entries[k].penalty = f64::INFINITY;
        }

        self.history.push(self.state.best_value);
        self.phase = if self.state.i_termination >= self.config.n_iter {
            Phase::Terminated
        } else {
            Phase::Iterating
        };
        Ok(self.phase)
    }

    /// Step until the stall bound is reached.
    pub fn run(mut self) -> Result<TabuOutcome, SearchError> {
        while self.step()? != Phase::Terminated {}
        Ok(self.finish(false))
    }

    /// Step until the stall bound is reached or `cancel` is raised.
    ///
    /// The flag is polled between rounds.
    pub fn run_cancellable(mut self, cancel: &AtomicBool) -> Result<TabuOutcome, SearchError> {
        loop {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Tabu search cancelled after {} rounds", self.rounds);
                return Ok(self.finish(true));
            }
            if self.step()? == Phase::Terminated {
                return Ok(self.finish(false));
            }
        }
    }

    fn finish(self, cancelled: bool) -> TabuOutcome {
        log::info!(
            "Tabu search finished: best {:?} = {} after {} moves / {} rounds",
            self.state.best_path,
            self.state.best_value,
            self.state.i - 1,
            self.rounds
        );
        TabuOutcome {
            best_tour: self.state.best_path,
            best_value: self.state.best_value,
            initial_tour: self.initial_tour,
            initial_value: self.initial_value,
            iterations: self.state.i - 1,
            rounds: self.rounds,
            history: self.history,
            entries: self.entries,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::BruteForce;

    fn create_test_instance() -> PdpInstance {
        PdpInstance::instance_one()
    }

    #[test]
    fn test_reference_trace() {
        let instance = create_test_instance();
        let outcome = TabuSearch::with_params(5, 10, 0.0).run(&instance).unwrap();

        assert_eq!(outcome.initial_tour, vec![0, 1, 2, 3, 0]);
        assert_eq!(outcome.best_tour, vec![0, 1, 2, 3, 0]);
        assert_eq!(outcome.best_value, 60.0);
        // Every move is taken once as a sideways step, then all are tabu.
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.rounds, 5);
        assert_eq!(outcome.history, vec![60.0; 5]);
        assert!(outcome.entries.iter().all(|e| e.frequency == 1));
        assert_eq!(outcome.entries[0].tabu_until, 11);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_improves_from_seed() {
        let instance = create_test_instance();
        let outcome = TabuSearch::with_params(5, 10, 0.0)
            .with_seed_tour(vec![0, 1, 3, 2, 0])
            .run(&instance)
            .unwrap();
        assert_eq!(outcome.initial_value, 90.0);
        assert_eq!(outcome.best_tour, vec![0, 3, 1, 2, 0]);
        assert_eq!(outcome.best_value, 60.0);
        assert_eq!(outcome.history[0], 60.0);
    }

    #[test]
    fn test_never_beats_brute_force() {
        let instance = create_test_instance();
        let brute = BruteForce::new().run(&instance).unwrap();
        assert!(brute.best_value <= 60.0);

        for tenure in [1, 2, 5, 10] {
            let outcome = TabuSearch::with_params(5, tenure, 0.5).run(&instance).unwrap();
            assert!(outcome.best_value >= brute.best_value);
            let eval = Evaluator::new(&instance);
            assert!(eval.is_feasible(&outcome.best_tour).unwrap());
        }
    }

    #[test]
    fn test_random_instances_against_brute_force() {
        for seed in 0..6 {
            let instance = PdpInstance::random(5, seed);
            let brute = BruteForce::new().run(&instance);
            let tabu = TabuSearch::with_params(20, 3, 1.0).run(&instance);
            match (brute, tabu) {
                (Ok(b), Ok(t)) => {
                    assert!(t.best_value >= b.best_value, "seed {}", seed);
                    let eval = Evaluator::new(&instance);
                    assert!(eval.is_feasible(&t.best_tour).unwrap());
                    assert!(t.best_value <= t.initial_value);
                }
                (Err(SearchError::NoFeasibleTour { .. }), Err(e)) => {
                    assert!(matches!(e, SearchError::NoInitialSolution { .. }));
                }
                (b, t) => panic!("seed {}: brute {:?} vs tabu {:?}", seed, b.is_ok(), t.is_ok()),
            }
        }
    }

    #[test]
    fn test_frequency_is_monotonic() {
        let instance = PdpInstance::instance_two();
        let mut run = TabuSearch::with_params(8, 2, 1_000.0).start(&instance).unwrap();
        let mut previous: Vec<usize> = run.entries().iter().map(|e| e.frequency).collect();
        let mut steps = 0;

        while run.phase() != Phase::Terminated {
            run.step().unwrap();
            let current: Vec<usize> = run.entries().iter().map(|e| e.frequency).collect();
            assert!(previous.iter().zip(&current).all(|(p, c)| c >= p));
            let total: usize = current.iter().sum();
            assert_eq!(total, run.state().i - 1);
            previous = current;
            steps += 1;
            assert!(steps < 10_000, "search did not terminate");
        }
    }

    #[test]
    fn test_stall_counter_bounds_termination() {
        let instance = PdpInstance::instance_two();
        let outcome = TabuSearch::with_params(3, 4, 0.0).run(&instance).unwrap();
        // History never gets worse and the last n_iter rounds did not improve.
        assert!(outcome.history.windows(2).all(|w| w[1] <= w[0]));
        let tail = &outcome.history[outcome.history.len() - 3..];
        assert!(tail.iter().all(|&v| v == outcome.best_value));
    }

    /// instance_one demands (tours starting with customer 2 overload the
    /// vehicle) over an asymmetric matrix where those tours are the cheapest.
    fn create_trap_instance() -> PdpInstance {
        let cost = vec![
            vec![0.0, 10.0, 1.0, 5.0],
            vec![2.0, 0.0, 10.0, 1.0],
            vec![5.0, 5.0, 0.0, 1.0],
            vec![2.0, 1.0, 10.0, 0.0],
        ];
        PdpInstance::new("trap", cost, vec![0, 30, 60, 20], vec![0, 70, 10, 40], 150).unwrap()
    }

    fn start_trap_run(instance: &PdpInstance) -> TabuRun<'_> {
        TabuSearch::with_params(10, 3, 0.0)
            .with_seed_tour(vec![0, 1, 2, 3, 0])
            .start(instance)
            .unwrap()
    }

    #[test]
    fn test_phase_moves_from_init_to_iterating() {
        let instance = create_trap_instance();
        let mut run = start_trap_run(&instance);
        assert_eq!(run.phase(), Phase::Init);
        assert_eq!(run.step().unwrap(), Phase::Iterating);
        assert_eq!(run.phase(), Phase::Iterating);
    }

    #[test]
    fn test_improving_infeasible_move_is_rejected() {
        let instance = create_trap_instance();
        let mut run = start_trap_run(&instance);
        assert_eq!(run.state().best_value, 23.0);

        // swap(1, 2) gives [0,2,1,3,0] = 9, cheapest but overloaded.
        run.step().unwrap();
        let state = run.state();
        assert_eq!(state.best_path, vec![0, 1, 2, 3, 0]);
        assert_eq!(state.best_value, 23.0);
        assert_eq!(state.current_path, vec![0, 2, 1, 3, 0]);
        assert_eq!(state.current_value, 9.0);
        assert_eq!(state.i_termination, 1);
        assert_eq!(state.i, 2);
        let entry = &run.entries()[0];
        assert_eq!(entry.mv, Move::swap(1, 2));
        assert_eq!(entry.frequency, 1);
        assert_eq!(entry.tabu_until, 4);

        // Still tabu and still infeasible: shelved, swap(1, 3) improves instead.
        run.step().unwrap();
        let state = run.state();
        assert_eq!(state.best_path, vec![0, 3, 2, 1, 0]);
        assert_eq!(state.best_value, 22.0);
        assert_eq!(state.i_termination, 0);
        assert_eq!(run.entries()[0].frequency, 1);
        assert_eq!(run.entries()[1].frequency, 1);
    }

    #[test]
    fn test_aspiration_overrides_tabu_status() {
        let instance = create_trap_instance();
        let mut run = start_trap_run(&instance);
        run.step().unwrap();
        run.step().unwrap();

        // swap(2, 3) gives [0,2,3,1,0] = 5, overloaded again.
        run.step().unwrap();
        assert_eq!(run.state().best_value, 22.0);
        assert_eq!(run.state().i_termination, 1);
        assert_eq!(run.entries()[2].frequency, 1);
        assert_eq!(run.entries()[2].tabu_until, 6);

        // swap(1, 2) is tabu until round 4 but reaches [0,3,1,2,0] = 21.
        assert!(run.entries()[0].is_tabu(run.state().i));
        run.step().unwrap();
        let state = run.state();
        assert_eq!(state.best_path, vec![0, 3, 1, 2, 0]);
        assert_eq!(state.best_value, 21.0);
        assert_eq!(state.current_path, state.best_path);
        assert_eq!(state.i_termination, 0);
        assert_eq!(state.i, 5);
        let entry = &run.entries()[0];
        assert_eq!(entry.frequency, 2);
        assert_eq!(entry.tabu_until, 4);
        assert!(Evaluator::new(&instance).is_feasible(&state.best_path).unwrap());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let instance = PdpInstance::random(6, 11);
        let sequential = TabuSearch::with_params(10, 3, 2.0).run(&instance);
        let parallel = TabuSearch::with_params(10, 3, 2.0)
            .with_parallel(true)
            .run(&instance);
        match (sequential, parallel) {
            (Ok(s), Ok(p)) => {
                assert_eq!(s.best_tour, p.best_tour);
                assert_eq!(s.history, p.history);
                assert_eq!(s.entries, p.entries);
            }
            (Err(s), Err(p)) => assert_eq!(s, p),
            _ => panic!("sequential and parallel runs disagree"),
        }
    }

    #[test]
    fn test_no_feasible_tour_is_reported() {
        let instance = PdpInstance::new(
            "tight",
            create_test_instance().cost_matrix().to_vec(),
            vec![0, 30, 60, 20],
            vec![0, 70, 10, 40],
            100,
        )
        .unwrap();
        let err = TabuSearch::with_params(5, 10, 0.0).run(&instance).unwrap_err();
        assert!(matches!(err, SearchError::NoInitialSolution { depth: 3 }));
    }

    #[test]
    fn test_cancellation_before_first_round() {
        let instance = create_test_instance();
        let cancel = AtomicBool::new(true);
        let outcome = TabuSearch::new()
            .start(&instance)
            .unwrap()
            .run_cancellable(&cancel)
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.best_tour, outcome.initial_tour);

        let keep_going = AtomicBool::new(false);
        let outcome = TabuSearch::with_params(5, 10, 0.0)
            .start(&instance)
            .unwrap()
            .run_cancellable(&keep_going)
            .unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.rounds, 5);
    }

    #[test]
    fn test_invalid_configuration() {
        let instance = create_test_instance();
        for config in [
            TabuSearch::with_params(0, 10, 0.0),
            TabuSearch::with_params(5, 0, 0.0),
            TabuSearch::with_params(5, 10, -1.0),
            TabuSearch::with_params(5, 10, f64::NAN),
        ] {
            assert!(matches!(
                config.run(&instance),
                Err(SearchError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_solver_interface() {
        let instance = create_test_instance();
        let solution = TabuSearch::with_params(5, 10, 0.0).solve(&instance).unwrap();
        assert!(solution.feasible);
        assert_eq!(solution.cost, 60.0);
        assert_eq!(solution.algorithm, "TabuSearch");
        assert_eq!(solution.iterations, Some(3));
    }

    #[test]
    fn test_single_customer_terminates() {
        let instance = PdpInstance::new(
            "single",
            vec![vec![0.0, 4.0], vec![6.0, 0.0]],
            vec![0, 3],
            vec![0, 2],
            10,
        )
        .unwrap();
        let outcome = TabuSearch::with_params(2, 1, 0.0).run(&instance).unwrap();
        assert_eq!(outcome.best_tour, vec![0, 1, 0]);
        assert_eq!(outcome.best_value, 10.0);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.iterations, 0);
    }
}
