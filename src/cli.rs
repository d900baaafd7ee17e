// CLI definition using clap derive macros
use clap::Parser;

use crate::config::{self, ExperimentMode};
use crate::error::BenchError;
use crate::orchestrator::Orchestrator;

/// Latency benchmark for the timeline endpoint
#[derive(Parser, Debug, PartialEq)]
#[command(name = "feed-bench")]
pub struct Cli {
    /// Experiment to run: conc|post|fanout|all
    #[arg(value_enum)]
    pub mode: ExperimentMode,
}

/// Load the configuration from the environment and run the selected
/// experiments.
pub async fn run_benchmark(mode: ExperimentMode) -> Result<(), BenchError> {
    let cfg = config::load_from_env()?;
    tracing::info!(base_url = %cfg.base_url, output_dir = %cfg.output_dir.display(), "configuration loaded");

    let orchestrator = Orchestrator::new(cfg);
    orchestrator.setup_signal_handler()?;

    let reports = orchestrator.run(mode).await?;
    for report in &reports {
        println!(
            "[DONE] {}: {} rows -> {}",
            report.kind.name(),
            report.rows.len(),
            report.csv_path.display()
        );
    }
    if orchestrator.is_shutdown_requested() {
        eprintln!("Interrupted: partial results were written");
    }
    Ok(())
}
