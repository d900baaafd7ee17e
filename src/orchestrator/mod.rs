// Experiment orchestrator module
//
// Runs parameter sweeps: reset the external store, then for each parameter
// value run a fixed number of trials one after another, each one dispatching
// a batch of timeline requests and reducing it to a single result row. At
// the end of a sweep the rows go to the reporter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::REQUEST_TIMEOUT;
use crate::config::{Config, ExperimentKind, ExperimentMode};
use crate::dispatcher;
use crate::error::BenchError;
use crate::reporter::{self, ExperimentSummary};
use crate::reset::{reset_best_effort, CommandReset, NoopReset, SeedParams, StateReset};
use crate::stats::{self, TrialSummary};
use crate::user_pool::TargetSelector;

/// Trials run for every parameter value.
pub const TRIALS_PER_VALUE: u32 = 3;
/// Users seeded for every experiment.
pub const USER_POPULATION: u32 = 1000;
/// Concurrency held constant by the post-volume and fan-out sweeps.
pub const FIXED_CONCURRENCY: usize = 50;
/// Requests per trial for the post-volume and fan-out sweeps.
pub const FIXED_VOLUME: usize = 200;

pub const CONCURRENCY_LEVELS: [u64; 6] = [1, 10, 20, 50, 100, 1000];
pub const POSTS_PER_USER_LEVELS: [u64; 3] = [10, 100, 1000];
pub const FOLLOWS_PER_USER_LEVELS: [u64; 3] = [10, 50, 100];

/// When the store is reset during a sweep.
#[derive(Debug, Clone)]
pub enum SweepReset {
    /// One baseline for the whole sweep.
    Once(SeedParams),
    /// A fresh baseline (and namespace) for every parameter value.
    PerValue(fn(u64) -> SeedParams),
}

/// How many workers a trial uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepConcurrency {
    Fixed(usize),
    /// The swept parameter is the concurrency level.
    FromParam,
}

/// Declarative description of one experiment kind's sweep.
#[derive(Debug, Clone)]
pub struct ParamSweepSpec {
    pub kind: ExperimentKind,
    pub values: Vec<u64>,
    pub trials: u32,
    pub reset: SweepReset,
    pub concurrency: SweepConcurrency,
    pub volume: fn(u64) -> usize,
}

impl ParamSweepSpec {
    pub fn for_kind(kind: ExperimentKind) -> Self {
        match kind {
            ExperimentKind::Concurrency => Self::concurrency_sweep(),
            ExperimentKind::PostVolume => Self::post_volume_sweep(),
            ExperimentKind::FanOut => Self::fan_out_sweep(),
        }
    }

    pub fn concurrency_sweep() -> Self {
        Self {
            kind: ExperimentKind::Concurrency,
            values: CONCURRENCY_LEVELS.to_vec(),
            trials: TRIALS_PER_VALUE,
            reset: SweepReset::Once(SeedParams::new(USER_POPULATION, 50, 20, "exp1")),
            concurrency: SweepConcurrency::FromParam,
            volume: concurrency_volume,
        }
    }

    pub fn post_volume_sweep() -> Self {
        Self {
            kind: ExperimentKind::PostVolume,
            values: POSTS_PER_USER_LEVELS.to_vec(),
            trials: TRIALS_PER_VALUE,
            reset: SweepReset::PerValue(post_volume_seed),
            concurrency: SweepConcurrency::Fixed(FIXED_CONCURRENCY),
            volume: fixed_volume,
        }
    }

    pub fn fan_out_sweep() -> Self {
        Self {
            kind: ExperimentKind::FanOut,
            values: FOLLOWS_PER_USER_LEVELS.to_vec(),
            trials: TRIALS_PER_VALUE,
            reset: SweepReset::PerValue(fan_out_seed),
            concurrency: SweepConcurrency::Fixed(FIXED_CONCURRENCY),
            volume: fixed_volume,
        }
    }

    pub fn concurrency_for(&self, value: u64) -> usize {
        match self.concurrency {
            SweepConcurrency::Fixed(c) => c,
            SweepConcurrency::FromParam => value as usize,
        }
    }

    pub fn volume_for(&self, value: u64) -> usize {
        (self.volume)(value)
    }

    pub fn expected_rows(&self) -> usize {
        self.values.len() * self.trials as usize
    }
}

/// Requests per trial for the concurrency sweep: twice the concurrency,
/// at least 50, and a flat 2000 at the top level.
pub fn concurrency_volume(concurrency: u64) -> usize {
    if concurrency == 1000 {
        return 2000;
    }
    (concurrency as usize * 2).max(50)
}

fn fixed_volume(_value: u64) -> usize {
    FIXED_VOLUME
}

fn post_volume_seed(posts_per_user: u64) -> SeedParams {
    SeedParams {
        users: USER_POPULATION,
        posts_per_user: posts_per_user as u32,
        follows_per_user: 20,
        prefix: format!("post{}", posts_per_user),
    }
}

fn fan_out_seed(follows_per_user: u64) -> SeedParams {
    SeedParams {
        users: USER_POPULATION,
        posts_per_user: 100,
        follows_per_user: follows_per_user as u32,
        prefix: format!("fan{}", follows_per_user),
    }
}

/// Outcome of one finished experiment kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub kind: ExperimentKind,
    pub rows: Vec<TrialSummary>,
    pub csv_path: PathBuf,
    pub summary: ExperimentSummary,
}

/// Experiment orchestrator - sequences sweeps and hands rows to the reporter.
pub struct Orchestrator {
    config: Config,
    reset: Arc<dyn StateReset>,
    shutdown_flag: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator resetting state through the configured commands.
    pub fn new(config: Config) -> Self {
        let reset: Arc<dyn StateReset> = if config.reset_enabled {
            Arc::new(CommandReset::from_config(&config))
        } else {
            Arc::new(NoopReset)
        };
        Self::with_reset(config, reset)
    }

    pub fn with_reset(config: Config, reset: Arc<dyn StateReset>) -> Self {
        Self {
            config,
            reset,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run every experiment kind selected by `mode`, in order.
    pub async fn run(&self, mode: ExperimentMode) -> Result<Vec<ExperimentReport>, BenchError> {
        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            error!(dir = %self.config.output_dir.display(), "cannot create output directory");
            return Err(e.into());
        }

        let mut reports = Vec::new();
        for kind in mode.kinds() {
            if self.is_shutdown_requested() {
                break;
            }
            reports.push(self.run_experiment(&ParamSweepSpec::for_kind(kind)).await?);
        }
        Ok(reports)
    }

    /// Sweep one experiment and persist its rows.
    pub async fn run_experiment(&self, spec: &ParamSweepSpec) -> Result<ExperimentReport, BenchError> {
        println!("\n=== EXPERIMENT: {} ===", spec.kind.name());
        info!(experiment = spec.kind.name(), values = ?spec.values, "starting sweep");

        let rows = self.run_sweep(spec).await?;

        let csv_path = self.config.output_dir.join(spec.kind.file_name());
        reporter::write_csv_results(&rows, &csv_path)?;
        println!("[CSV] Saved -> {}", csv_path.display());

        let summary = ExperimentSummary::new(spec.kind, &rows);
        let summary_path = self.config.output_dir.join(spec.kind.summary_file_name());
        if let Err(e) = reporter::write_json_summary(&summary, &summary_path) {
            warn!("failed to write summary '{}': {}", summary_path.display(), e);
        }
        reporter::display_summary(&summary);

        Ok(ExperimentReport {
            kind: spec.kind,
            rows,
            csv_path,
            summary,
        })
    }

    /// Run all trials of a sweep and return its rows, ordered by parameter
    /// value then trial index. A shutdown request stops the sweep between
    /// trials; rows gathered so far are kept.
    pub async fn run_sweep(&self, spec: &ParamSweepSpec) -> Result<Vec<TrialSummary>, BenchError> {
        let mut rows = Vec::with_capacity(spec.expected_rows());

        if let SweepReset::Once(params) = &spec.reset {
            reset_best_effort(self.reset.as_ref(), params).await;
        }

        'sweep: for &value in &spec.values {
            if self.is_shutdown_requested() {
                break;
            }

            let seed = match &spec.reset {
                SweepReset::Once(params) => params.clone(),
                SweepReset::PerValue(seed_for) => {
                    let params = seed_for(value);
                    reset_best_effort(self.reset.as_ref(), &params).await;
                    params
                }
            };

            let selector =
                TargetSelector::new(self.config.trimmed_base_url(), &seed.prefix, seed.users)?;
            let concurrency = spec.concurrency_for(value);
            let volume = spec.volume_for(value);
            println!(
                "Testing {} = {} (concurrency {}, target: {} reqs)",
                spec.kind.name(),
                value,
                concurrency,
                volume
            );

            for run in 1..=spec.trials {
                if self.is_shutdown_requested() {
                    warn!(experiment = spec.kind.name(), value, run, "shutdown requested, stopping sweep");
                    break 'sweep;
                }
                rows.push(self.run_trial(value, run, &selector, concurrency, volume).await);
            }
        }

        Ok(rows)
    }

    /// DISPATCH → AGGREGATE for one trial. Never fails: a batch that could
    /// not be dispatched is a degenerate trial.
    async fn run_trial(
        &self,
        value: u64,
        run: u32,
        selector: &TargetSelector,
        concurrency: usize,
        volume: usize,
    ) -> TrialSummary {
        println!("  -> Launching {} requests with {} workers...", volume, concurrency);
        let targets = selector.batch(volume);

        let outcomes = match dispatcher::dispatch(targets, concurrency, REQUEST_TIMEOUT).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(value, run, "batch could not be dispatched: {}", e);
                Vec::new()
            }
        };

        let (summary, trial_stats) = stats::aggregate(value, run, &outcomes);
        if trial_stats.failed > 0 {
            debug!(value, run, codes = ?trial_stats.status_codes, "status distribution");
        }
        stats::display_trial(&summary, &trial_stats);
        summary
    }

    /// Set up signal handling for SIGINT/SIGTERM.
    /// When a signal is received, sets the shutdown flag.
    pub fn setup_signal_handler(&self) -> Result<(), BenchError> {
        let flag = self.shutdown_flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .map_err(|e| BenchError::ConfigError(format!("Failed to set signal handler: {}", e)))
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Request shutdown (for testing or programmatic use).
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
