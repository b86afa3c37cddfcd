//! Benchmark runner: drives each registration through warm-up and
//! measurement, then writes one report for the whole batch.
//!
//! ```text
//! Configuring -> WarmingUp -> Measuring -> ... -> Reporting -> Terminal
//! ```
//!
//! The first error from any phase moves the runner straight to `Terminal`;
//! remaining registrations are skipped and no report is written.

use crate::config::{RunOptions, SuiteSettings};
use crate::dialect::Dialect;
use crate::error::{BenchError, Result};
use crate::event::Event;
use crate::report::ResultRecorder;
use crate::schema::BenchmarkResult;
use crate::stats::{duration_ms, Statistics};
use crate::store::EventStore;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Configuring,
    WarmingUp,
    Measuring,
    Reporting,
    Terminal,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuring => "configuring",
            Self::WarmingUp => "warming up",
            Self::Measuring => "measuring",
            Self::Reporting => "reporting",
            Self::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// How often a registration's setup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupLevel {
    /// Once, before the first warm-up iteration.
    Trial,
    /// Before every warm-up and measurement iteration.
    Iteration,
}

/// State shared by every phase of a run.
pub struct HarnessContext {
    pub store: Box<dyn EventStore>,
    pub dialect: Dialect,
    /// In-memory fixture; only setup mutates it.
    pub events: Vec<Event>,
    pub settings: SuiteSettings,
    /// Whether query SQL carries the row-locking clause.
    pub lock_rows: bool,
}

impl HarnessContext {
    pub fn new(store: Box<dyn EventStore>, dialect: Dialect, settings: SuiteSettings) -> Self {
        let lock_rows = settings.for_update && store.supports_row_locking();
        if settings.for_update && !lock_rows {
            log::warn!(
                "Backend {} does not support row locking; queries run without a lock clause.",
                store.backend()
            );
        }
        Self {
            store,
            dialect,
            events: Vec::new(),
            settings,
            lock_rows,
        }
    }
}

pub type SetupFn = Box<dyn Fn(&mut HarnessContext) -> Result<()> + Send + Sync>;
pub type OperationFn = Box<dyn Fn(&HarnessContext) -> Result<()> + Send + Sync>;

/// A named benchmark: its setup, the operation to time, and the setup level.
pub struct Registration {
    pub name: String,
    pub level: SetupLevel,
    /// Reported next to the score.
    pub parameters: HashMap<String, serde_json::Value>,
    setup: SetupFn,
    operation: OperationFn,
}

impl Registration {
    pub fn new<S, O>(name: impl Into<String>, level: SetupLevel, setup: S, operation: O) -> Self
    where
        S: Fn(&mut HarnessContext) -> Result<()> + Send + Sync + 'static,
        O: Fn(&HarnessContext) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            level,
            parameters: HashMap::new(),
            setup: Box::new(setup),
            operation: Box::new(operation),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<BenchmarkResult>,
    /// `None` when reporting was disabled.
    pub report_path: Option<PathBuf>,
}

pub struct Runner {
    options: RunOptions,
    write_report: bool,
    state: RunnerState,
    history: Vec<RunnerState>,
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            write_report: true,
            state: RunnerState::Configuring,
            history: vec![RunnerState::Configuring],
        }
    }

    /// Skip the report file; results are still returned.
    pub fn without_report(mut self) -> Self {
        self.write_report = false;
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Every state entered so far, consecutive repeats collapsed.
    pub fn history(&self) -> &[RunnerState] {
        &self.history
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    fn enter(&mut self, state: RunnerState) {
        if self.state != state {
            log::debug!("Runner {} -> {}", self.state, state);
        }
        self.state = state;
        if self.history.last() != Some(&state) {
            self.history.push(state);
        }
    }

    /// Run every registration in order and write the report.
    pub fn run(
        &mut self,
        ctx: &mut HarnessContext,
        registrations: &[Registration],
    ) -> Result<RunOutcome> {
        match self.run_all(ctx, registrations) {
            Ok(outcome) => {
                self.enter(RunnerState::Terminal);
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Benchmark run aborted in {} phase: {}", self.state, e);
                self.enter(RunnerState::Terminal);
                Err(e)
            }
        }
    }

    fn run_all(
        &mut self,
        ctx: &mut HarnessContext,
        registrations: &[Registration],
    ) -> Result<RunOutcome> {
        self.options_check()?;
        let mut recorder = ResultRecorder::new(ctx.store.backend(), ctx.dialect.label());

        for registration in registrations {
            let stats = self.run_one(ctx, registration)?;
            log::info!(
                "{}: {:.3} ms/op ({} samples)",
                registration.name,
                stats.mean,
                stats.count()
            );
            recorder.record_statistics(
                &registration.name,
                registration.parameters.clone(),
                &self.options,
                &stats,
            );
        }

        self.enter(RunnerState::Reporting);
        let results = recorder.results().to_vec();
        let report_path = if self.write_report {
            Some(recorder.save(
                &self.options.result_dir,
                &self.options.result_prefix,
                self.options.result_format,
            )?)
        } else {
            None
        };

        Ok(RunOutcome {
            results,
            report_path,
        })
    }

    fn options_check(&self) -> Result<()> {
        if self.options.measurement_iterations == 0 || self.options.threads == 0 {
            return Err(BenchError::Configuration(
                "measurement iterations and threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn run_one(
        &mut self,
        ctx: &mut HarnessContext,
        registration: &Registration,
    ) -> Result<Statistics> {
        self.enter(RunnerState::Configuring);
        log::info!(
            "Benchmark {} ({:?} setup, {} thread(s))",
            registration.name,
            registration.level,
            self.options.threads
        );
        if registration.level == SetupLevel::Trial {
            (registration.setup)(&mut *ctx)?;
        }

        self.enter(RunnerState::WarmingUp);
        for i in 0..self.options.warmup_iterations {
            let samples = self.iteration(ctx, registration)?;
            log::debug!(
                "Warmup {}/{}: {:.3} ms/op",
                i + 1,
                self.options.warmup_iterations,
                mean_ms(&samples)
            );
        }

        self.enter(RunnerState::Measuring);
        let mut samples = Vec::with_capacity(self.options.measurement_iterations * self.options.threads);
        for i in 0..self.options.measurement_iterations {
            let timings = self.iteration(ctx, registration)?;
            log::debug!(
                "Iteration {}/{}: {:.3} ms/op",
                i + 1,
                self.options.measurement_iterations,
                mean_ms(&timings)
            );
            samples.extend(timings);
        }

        Ok(Statistics::from_durations(&samples))
    }

    /// One iteration: optional setup, the timed operation on every worker,
    /// then memory release. Returns one timing per worker.
    fn iteration(
        &self,
        ctx: &mut HarnessContext,
        registration: &Registration,
    ) -> Result<Vec<Duration>> {
        if registration.level == SetupLevel::Iteration {
            (registration.setup)(&mut *ctx)?;
        }

        let timings = run_workers(ctx, &registration.operation, self.options.threads)?;

        if self.options.force_gc {
            ctx.store
                .release_memory()
                .map_err(|e| BenchError::workload("release_memory", e))?;
        }
        Ok(timings)
    }
}

fn run_workers(ctx: &HarnessContext, operation: &OperationFn, threads: usize) -> Result<Vec<Duration>> {
    let timed = || -> Result<Duration> {
        let start = Instant::now();
        operation(ctx)?;
        Ok(start.elapsed())
    };

    if threads == 1 {
        return Ok(vec![timed()?]);
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads).map(|_| scope.spawn(timed)).collect();
        let mut timings = Vec::with_capacity(threads);
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(elapsed)) => timings.push(elapsed),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(timings),
        }
    })
}

fn mean_ms(samples: &[Duration]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().map(|d| duration_ms(*d)).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn context() -> HarnessContext {
        HarnessContext::new(
            Box::new(SqliteStore::open_in_memory().unwrap()),
            Dialect::Generic,
            SuiteSettings::default(),
        )
    }

    fn options(warmup: usize, iterations: usize, threads: usize) -> RunOptions {
        RunOptions {
            warmup_iterations: warmup,
            measurement_iterations: iterations,
            threads,
            force_gc: false,
            ..RunOptions::default()
        }
    }

    fn counting(level: SetupLevel) -> (Registration, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let setups = Arc::new(AtomicUsize::new(0));
        let ops = Arc::new(AtomicUsize::new(0));
        let (s, o) = (setups.clone(), ops.clone());
        let reg = Registration::new(
            "test/count",
            level,
            move |_| {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            move |_| {
                o.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        (reg, setups, ops)
    }

    #[test]
    fn trial_setup_runs_once() {
        let (reg, setups, ops) = counting(SetupLevel::Trial);
        let mut runner = Runner::new(options(2, 3, 1)).without_report();
        let outcome = runner.run(&mut context(), &[reg]).unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 1);
        assert_eq!(ops.load(Ordering::SeqCst), 5);
        assert_eq!(outcome.results[0].metrics.samples, 3);
        assert!(outcome.report_path.is_none());
    }

    #[test]
    fn iteration_setup_runs_before_every_iteration() {
        let (reg, setups, _) = counting(SetupLevel::Iteration);
        let mut runner = Runner::new(options(2, 3, 1)).without_report();
        runner.run(&mut context(), &[reg]).unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn every_worker_contributes_a_sample() {
        let (reg, _, ops) = counting(SetupLevel::Trial);
        let mut runner = Runner::new(options(1, 2, 4)).without_report();
        let outcome = runner.run(&mut context(), &[reg]).unwrap();
        assert_eq!(ops.load(Ordering::SeqCst), 12);
        assert_eq!(outcome.results[0].metrics.samples, 8);
        assert_eq!(outcome.results[0].threads, 4);
    }

    #[test]
    fn walks_states_in_order() {
        let (reg, _, _) = counting(SetupLevel::Trial);
        let mut runner = Runner::new(options(1, 1, 1)).without_report();
        assert_eq!(runner.state(), RunnerState::Configuring);
        runner.run(&mut context(), &[reg]).unwrap();
        assert_eq!(runner.state(), RunnerState::Terminal);
        assert_eq!(
            runner.history(),
            &[
                RunnerState::Configuring,
                RunnerState::WarmingUp,
                RunnerState::Measuring,
                RunnerState::Reporting,
                RunnerState::Terminal,
            ]
        );
    }

    #[test]
    fn failure_aborts_remaining_benchmarks() {
        let (second, second_setups, _) = counting(SetupLevel::Trial);
        let failing = Registration::new(
            "test/fail",
            SetupLevel::Trial,
            |_| Ok(()),
            |_| Err(BenchError::FixtureMismatch { expected: 1, actual: 0 }),
        );
        let mut runner = Runner::new(options(0, 1, 2)).without_report();
        let err = runner.run(&mut context(), &[failing, second]).unwrap_err();
        assert!(matches!(err, BenchError::FixtureMismatch { .. }));
        assert_eq!(runner.state(), RunnerState::Terminal);
        assert!(!runner.history().contains(&RunnerState::Reporting));
        assert_eq!(second_setups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_iterations_is_configuration_error() {
        let (reg, _, _) = counting(SetupLevel::Trial);
        let mut runner = Runner::new(options(0, 0, 1)).without_report();
        let err = runner.run(&mut context(), &[reg]).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn lock_clause_dropped_when_unsupported() {
        let ctx = context();
        assert!(ctx.settings.for_update);
        assert!(!ctx.lock_rows);
    }
}
