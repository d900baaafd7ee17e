// Reporter module - result rows (CSV) and per-parameter summaries (JSON)
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::config::ExperimentKind;
use crate::error::BenchError;
use crate::stats::TrialSummary;

/// Column order of every persisted result file.
pub const CSV_HEADER: [&str; 4] = ["PARAM", "AVG_TIME", "RUN", "FAILED"];

/// Row layout as read back from a result file.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "PARAM")]
    param: u64,
    #[serde(rename = "AVG_TIME")]
    avg_time: f64,
    #[serde(rename = "RUN")]
    run: u32,
    #[serde(rename = "FAILED")]
    failed: u8,
}

/// Aggregate of all runs sharing one PARAM value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSummary {
    pub param: u64,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub runs: usize,
    pub failed_runs: usize,
}

/// Per-experiment summary consumed by chart rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub experiment: String,
    pub title: String,
    pub axis_label: String,
    pub params: Vec<ParamSummary>,
}

impl ExperimentSummary {
    pub fn new(kind: ExperimentKind, rows: &[TrialSummary]) -> Self {
        Self {
            experiment: kind.name().to_string(),
            title: kind.title().to_string(),
            axis_label: kind.axis_label().to_string(),
            params: summarize_by_param(rows),
        }
    }
}

/// Write rows with the fixed header to any writer.
pub fn write_csv_to<W: Write>(rows: &[TrialSummary], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.write_record([
            row.param.to_string(),
            row.avg_time_ms.to_string(),
            row.run.to_string(),
            u8::from(row.failed).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the result rows to `path`, replacing any existing file.
pub fn write_csv_results(rows: &[TrialSummary], path: &Path) -> Result<(), BenchError> {
    let file = std::fs::File::create(path).map_err(|e| {
        BenchError::ResultWrite(format!("Failed to create '{}': {}", path.display(), e))
    })?;
    write_csv_to(rows, file)
        .map_err(|e| BenchError::ResultWrite(format!("Failed to write '{}': {}", path.display(), e)))
}

/// Read a result file back into rows.
pub fn read_csv_results(path: &Path) -> anyhow::Result<Vec<TrialSummary>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        anyhow::bail!("unexpected header in '{}': {:?}", path.display(), headers);
    }

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        let row: CsvRow = record?;
        let failed = match row.failed {
            0 => false,
            1 => true,
            other => anyhow::bail!("FAILED must be 0 or 1, got {}", other),
        };
        rows.push(TrialSummary {
            param: row.param,
            avg_time_ms: row.avg_time,
            run: row.run,
            failed,
        });
    }
    Ok(rows)
}

/// Group rows by PARAM (first-seen order) with mean and sample standard
/// deviation of AVG_TIME. A single-run group has a deviation of 0.
pub fn summarize_by_param(rows: &[TrialSummary]) -> Vec<ParamSummary> {
    let mut groups: Vec<(u64, Vec<&TrialSummary>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(param, _)| *param == row.param) {
            Some((_, members)) => members.push(row),
            None => groups.push((row.param, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(param, members)| {
            let n = members.len();
            let mean = members.iter().map(|r| r.avg_time_ms).sum::<f64>() / n as f64;
            let std_dev = if n > 1 {
                let var = members
                    .iter()
                    .map(|r| (r.avg_time_ms - mean).powi(2))
                    .sum::<f64>()
                    / (n - 1) as f64;
                var.sqrt()
            } else {
                0.0
            };
            ParamSummary {
                param,
                mean_ms: mean,
                std_dev_ms: std_dev,
                runs: n,
                failed_runs: members.iter().filter(|r| r.failed).count(),
            }
        })
        .collect()
}

/// Write the per-parameter summary as pretty JSON.
pub fn write_json_summary(summary: &ExperimentSummary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Display the per-parameter table.
pub fn display_summary(summary: &ExperimentSummary) {
    println!("=== {} ===", summary.title);
    println!("{:>10} | {:>12} | {:>10} | {:>6}", summary.axis_label, "mean (ms)", "std (ms)", "failed");
    for p in &summary.params {
        println!(
            "{:>10} | {:>12.2} | {:>10.2} | {:>3}/{}",
            p.param, p.mean_ms, p.std_dev_ms, p.failed_runs, p.runs
        );
    }
    println!("============================");
}
