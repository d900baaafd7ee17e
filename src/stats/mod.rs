// Trial statistics module

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::RequestOutcome;

/// The only status counted as a successful request.
pub const SUCCESS_STATUS: u16 = 200;

/// One persisted row: the reduced result of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub param: u64,
    pub avg_time_ms: f64,
    pub run: u32,
    pub failed: bool,
}

/// Diagnostic counters for one trial. Not persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrialStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub transport_failures: usize,
    pub latency_p95_ms: Option<f64>,
    pub status_codes: HashMap<u16, usize>,
}

/// Reduce one batch of outcomes to a summary row.
///
/// The mean covers successful outcomes only. Any non-200 outcome marks the
/// trial failed; a trial with no success reports 0 and is always failed.
/// Outcome order is irrelevant.
///
/// The p95 in `TrialStats` is nearest-rank, not an interpolated quantile:
/// for latencies 1..=100 it is 95, where interpolation gives 95.95. It is
/// only printed, never persisted.
pub fn aggregate(param: u64, run: u32, outcomes: &[RequestOutcome]) -> (TrialSummary, TrialStats) {
    let mut latencies = Vec::with_capacity(outcomes.len());
    let mut stats = TrialStats {
        total: outcomes.len(),
        ..Default::default()
    };

    for outcome in outcomes {
        *stats.status_codes.entry(outcome.status()).or_insert(0) += 1;
        if outcome.is_transport_failure() {
            stats.transport_failures += 1;
        }
        if outcome.status() == SUCCESS_STATUS {
            latencies.push(outcome.latency_ms());
        } else {
            stats.failed += 1;
        }
    }
    stats.successful = latencies.len();

    if latencies.is_empty() {
        return (
            TrialSummary {
                param,
                avg_time_ms: 0.0,
                run,
                failed: true,
            },
            stats,
        );
    }

    let avg_time_ms = latencies.iter().sum::<f64>() / latencies.len() as f64;
    if latencies.len() > 1 {
        latencies.sort_by(|a, b| a.total_cmp(b));
        stats.latency_p95_ms = Some(percentile_at(&latencies, 95.0));
    }

    (
        TrialSummary {
            param,
            avg_time_ms,
            run,
            failed: stats.failed > 0,
        },
        stats,
    )
}

/// Get the value at a given percentile from a sorted slice using nearest-rank method.
/// Returns 0.0 for an empty slice.
pub fn percentile_at(sorted: &[f64], pct: f64) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }
    if len == 1 {
        return sorted[0];
    }
    // Nearest-rank: index = ceil(pct/100 * len) - 1
    let rank = (pct / 100.0 * len as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(len - 1);
    sorted[idx]
}

/// Print the per-trial progress line.
pub fn display_trial(summary: &TrialSummary, stats: &TrialStats) {
    match stats.latency_p95_ms {
        Some(p95) => println!(
            "     Stats: Avg={:.2}ms, P95={:.2}ms, Errors={}",
            summary.avg_time_ms, p95, stats.failed
        ),
        None => println!(
            "     Stats: Avg={:.2}ms, Errors={}",
            summary.avg_time_ms, stats.failed
        ),
    }
    println!(
        "   Run {} (param {}): {:.2} ms (Failed: {})",
        summary.run,
        summary.param,
        summary.avg_time_ms,
        u8::from(summary.failed)
    );
}
