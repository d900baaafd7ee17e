#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Failed to write results: {0}")]
    ResultWrite(String),
    #[error("State reset failed: {0}")]
    Reset(String),
    #[error("Target population must be at least 1")]
    InvalidTargetPopulation,
}
