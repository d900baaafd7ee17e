// Concurrent dispatcher module
//
// Fan-out/fan-in over a fixed-size worker pool: workers pull target URLs from
// a shared queue and push outcomes onto a results channel. The collector
// returns once every target has produced exactly one outcome. Outcomes come
// back in completion order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::client::{FailureReason, HttpExecutor, RequestExecutor, RequestOutcome};
use crate::error::BenchError;

/// Dispatch `targets` over `concurrency` workers sharing one freshly built
/// client. The client is released when this call returns.
pub async fn dispatch(
    targets: Vec<String>,
    concurrency: usize,
    timeout: Duration,
) -> Result<Vec<RequestOutcome>, BenchError> {
    let executor = Arc::new(HttpExecutor::new(concurrency, timeout)?);
    Ok(dispatch_with(executor, targets, concurrency).await)
}

/// Dispatch `targets` through an existing executor.
///
/// Runs `concurrency` workers (capped at the number of targets, floored at
/// one) and blocks until all outcomes are collected.
pub async fn dispatch_with(
    executor: Arc<dyn RequestExecutor>,
    targets: Vec<String>,
    concurrency: usize,
) -> Vec<RequestOutcome> {
    let expected = targets.len();
    if expected == 0 {
        return Vec::new();
    }

    let workers = concurrency.clamp(1, expected);
    let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
    let (tx, mut rx) = mpsc::channel::<RequestOutcome>(expected);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let executor = Arc::clone(&executor);
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                let Some(url) = next else {
                    break;
                };
                let outcome = executor.execute(&url).await;
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        }));
    }
    // Only workers hold senders now, so the channel closes when they finish.
    drop(tx);

    let mut outcomes = Vec::with_capacity(expected);
    while outcomes.len() < expected {
        match rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            None => break,
        }
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("dispatch worker terminated abnormally: {}", e);
        }
    }

    // A worker that died mid-request loses its outcome; account for it as a
    // failure so the batch size is preserved.
    let missing = expected - outcomes.len();
    if missing > 0 {
        warn!(missing, "outcomes lost to aborted workers, recording as failures");
        outcomes.extend((0..missing).map(|_| RequestOutcome::Failed {
            reason: FailureReason::Other("worker aborted".to_string()),
        }));
    }

    outcomes
}
