// HTTP client module
//
// Builds the per-trial reqwest client and executes single timeline requests,
// turning every transport failure into a RequestOutcome value.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::debug;

use crate::error::BenchError;

/// Status reported for requests that never produced an HTTP response.
pub const SYNTHETIC_FAILURE_STATUS: u16 = 500;

/// Ceiling on one request, connect through body. Not configurable.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Why a request produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Connect(String),
    Body(String),
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Connect(msg) => write!(f, "connection failed: {}", msg),
            FailureReason::Body(msg) => write!(f, "malformed response: {}", msg),
            FailureReason::Other(msg) => write!(f, "request error: {}", msg),
        }
    }
}

/// Result of one dispatched request.
///
/// Any HTTP response, whatever its status, is a `Response`. Success versus
/// failure is decided at aggregation time.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Response { latency_ms: f64, status: u16 },
    Failed { reason: FailureReason },
}

impl RequestOutcome {
    pub fn status(&self) -> u16 {
        match self {
            RequestOutcome::Response { status, .. } => *status,
            RequestOutcome::Failed { .. } => SYNTHETIC_FAILURE_STATUS,
        }
    }

    /// Latency in milliseconds; 0 for transport failures.
    pub fn latency_ms(&self) -> f64 {
        match self {
            RequestOutcome::Response { latency_ms, .. } => *latency_ms,
            RequestOutcome::Failed { .. } => 0.0,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, RequestOutcome::Failed { .. })
    }
}

/// Executes one request against a target URL. Implementations never fail:
/// every error is folded into the returned outcome.
pub trait RequestExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = RequestOutcome> + Send + 'a>>;
}

/// Build a client whose idle pool holds at least `concurrency` connections
/// per host. Exactly one attempt is made per request.
pub fn build_client(concurrency: usize, timeout: Duration) -> Result<Client, BenchError> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(concurrency.max(1))
        .build()
        .map_err(|e| BenchError::HttpClient(e.to_string()))
}

/// Issue one GET and measure wall-clock time until the body is fully read.
pub async fn fetch_timeline(client: &Client, url: &str) -> RequestOutcome {
    let start = Instant::now();

    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => return transport_failure(url, e),
    };
    let status = response.status().as_u16();

    if let Err(e) = response.bytes().await {
        return transport_failure(url, e);
    }

    RequestOutcome::Response {
        latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        status,
    }
}

fn transport_failure(url: &str, e: reqwest::Error) -> RequestOutcome {
    let reason = if e.is_timeout() {
        FailureReason::Timeout
    } else if e.is_connect() {
        FailureReason::Connect(e.to_string())
    } else if e.is_body() || e.is_decode() {
        FailureReason::Body(e.to_string())
    } else {
        FailureReason::Other(e.to_string())
    };
    debug!(url, %reason, "request failed");
    RequestOutcome::Failed { reason }
}

/// Executor backed by one shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Client factory: a fresh pool sized for `concurrency` workers.
    pub fn new(concurrency: usize, timeout: Duration) -> Result<Self, BenchError> {
        Ok(Self {
            client: build_client(concurrency, timeout)?,
        })
    }
}

impl RequestExecutor for HttpExecutor {
    fn execute<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = RequestOutcome> + Send + 'a>> {
        Box::pin(fetch_timeline(&self.client, url))
    }
}
