// Test doubles shared by module and integration tests
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{FailureReason, RequestExecutor, RequestOutcome};
use crate::error::BenchError;
use crate::reset::{SeedParams, StateReset};

/// Shared mock executor for tests.
/// Records executed URLs and the peak number of overlapping requests, and
/// can inject transport failures.
pub struct MockExecutor {
    status: u16,
    latency_ms: f64,
    fail_every: Option<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockExecutor {
    /// Every request answers `status` after `latency_ms`.
    pub fn always(status: u16, latency_ms: f64) -> Self {
        Self {
            status,
            latency_ms,
            fail_every: None,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Every `n`th request (by call order) fails at the transport level;
    /// the rest answer 200.
    pub fn failing_every(n: usize, latency_ms: f64) -> Self {
        Self {
            fail_every: Some(n.max(1)),
            ..Self::always(200, latency_ms)
        }
    }

    /// Hold each request for `delay` so overlapping requests can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn executed_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl RequestExecutor for MockExecutor {
    fn execute<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = RequestOutcome> + Send + 'a>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.fail_every {
                Some(n) if call % n == 0 => RequestOutcome::Failed {
                    reason: FailureReason::Timeout,
                },
                _ => RequestOutcome::Response {
                    latency_ms: self.latency_ms,
                    status: self.status,
                },
            }
        })
    }
}

/// One call observed by `RecordingReset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetCall {
    Clear,
    Seed(SeedParams),
}

/// Reset mock that records call order and can inject failures.
pub struct RecordingReset {
    calls: Mutex<Vec<ResetCall>>,
    fail_clear: AtomicBool,
    fail_seed: AtomicBool,
}

impl RecordingReset {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_clear: AtomicBool::new(false),
            fail_seed: AtomicBool::new(false),
        }
    }

    pub fn set_fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_seed(&self, fail: bool) {
        self.fail_seed.store(fail, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<ResetCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Prefixes passed to `seed`, in call order.
    pub fn seeded_prefixes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ResetCall::Seed(params) => Some(params.prefix),
                ResetCall::Clear => None,
            })
            .collect()
    }
}

impl Default for RecordingReset {
    fn default() -> Self {
        Self::new()
    }
}

impl StateReset for RecordingReset {
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<(), BenchError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(ResetCall::Clear);
            if self.fail_clear.load(Ordering::Relaxed) {
                return Err(BenchError::Reset("mock clear failure".to_string()));
            }
            Ok(())
        })
    }

    fn seed<'a>(
        &'a self,
        params: &'a SeedParams,
    ) -> Pin<Box<dyn Future<Output = Result<(), BenchError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(ResetCall::Seed(params.clone()));
            if self.fail_seed.load(Ordering::Relaxed) {
                return Err(BenchError::Reset("mock seed failure".to_string()));
            }
            Ok(())
        })
    }
}
