// Configuration manager module
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BenchError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "FEED_BENCH_CONFIG";
/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "FEED_BENCH_URL";
/// Environment variable overriding `output_dir`.
pub const OUTPUT_DIR_ENV: &str = "FEED_BENCH_OUT_DIR";

/// Experiment kind selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExperimentMode {
    Conc,
    Post,
    Fanout,
    All,
}

impl ExperimentMode {
    /// Experiment kinds to run for this mode, in execution order.
    pub fn kinds(&self) -> Vec<ExperimentKind> {
        match self {
            ExperimentMode::Conc => vec![ExperimentKind::Concurrency],
            ExperimentMode::Post => vec![ExperimentKind::PostVolume],
            ExperimentMode::Fanout => vec![ExperimentKind::FanOut],
            ExperimentMode::All => vec![
                ExperimentKind::Concurrency,
                ExperimentKind::PostVolume,
                ExperimentKind::FanOut,
            ],
        }
    }
}

/// One experiment kind and its result file / legend mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    Concurrency,
    PostVolume,
    FanOut,
}

impl ExperimentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExperimentKind::Concurrency => "conc",
            ExperimentKind::PostVolume => "post",
            ExperimentKind::FanOut => "fanout",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn summary_file_name(&self) -> String {
        format!("{}_summary.json", self.name())
    }

    pub fn title(&self) -> &'static str {
        match self {
            ExperimentKind::Concurrency => "Average time per request by concurrency",
            ExperimentKind::PostVolume => "Average time per request by post volume",
            ExperimentKind::FanOut => "Average time per request by fan-out",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            ExperimentKind::Concurrency => "Concurrent users",
            ExperimentKind::PostVolume => "Posts per user",
            ExperimentKind::FanOut => "Followees per user",
        }
    }
}

/// Main configuration, threaded explicitly into the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub reset_enabled: bool,
    pub clean_command: Vec<String>,
    pub seed_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            output_dir: PathBuf::from("out"),
            reset_enabled: true,
            clean_command: vec!["python".to_string(), "clean.py".to_string()],
            seed_command: vec!["python".to_string(), "seed.py".to_string()],
        }
    }
}

impl Config {
    /// Collects every validation error instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push("base_url must start with http:// or https://".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            errors.push("output_dir must not be empty".to_string());
        }
        if self.reset_enabled {
            if self.clean_command.is_empty() {
                errors.push("clean_command is required when reset_enabled is true".to_string());
            }
            if self.seed_command.is_empty() {
                errors.push("seed_command is required when reset_enabled is true".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Base URL without a trailing slash.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Parse a JSON config and validate it.
pub fn load_from_str(json: &str) -> Result<Config, BenchError> {
    let config: Config = serde_json::from_str(json)
        .map_err(|e| BenchError::ConfigError(format!("JSON parse error: {}", e)))?;

    config.validate().map_err(|errors| {
        BenchError::ConfigError(format!("Validation errors: {}", errors.join("; ")))
    })?;

    Ok(config)
}

/// Read a JSON config file and validate it.
pub fn load_from_file(path: &Path) -> Result<Config, BenchError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BenchError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    load_from_str(&content)
}

/// Build the configuration from the process environment.
pub fn load_from_env() -> Result<Config, BenchError> {
    load_with(|key| std::env::var(key).ok())
}

/// Resolve the configuration through `lookup`: optional config file first,
/// then single-value overrides, then validation.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, BenchError> {
    let mut config = match lookup(CONFIG_PATH_ENV) {
        Some(path) => load_from_file(Path::new(&path))?,
        None => Config::default(),
    };

    if let Some(url) = lookup(BASE_URL_ENV) {
        config.base_url = url;
    }
    if let Some(dir) = lookup(OUTPUT_DIR_ENV) {
        config.output_dir = PathBuf::from(dir);
    }

    config.validate().map_err(|errors| {
        BenchError::ConfigError(format!("Validation errors: {}", errors.join("; ")))
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert!(cfg.reset_enabled);
        assert_eq!(cfg.clean_command, vec!["python", "clean.py"]);
        assert_eq!(cfg.seed_command, vec!["python", "seed.py"]);
    }

    #[test]
    fn test_validate_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let cfg = Config {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("base_url")));
    }

    #[test]
    fn test_validate_requires_commands_only_when_reset_enabled() {
        let cfg = Config {
            clean_command: vec![],
            seed_command: vec![],
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().len(), 2);

        let cfg = Config {
            reset_enabled: false,
            clean_command: vec![],
            seed_command: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_multiple_errors() {
        let cfg = Config {
            base_url: String::new(),
            output_dir: PathBuf::new(),
            clean_command: vec![],
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().len(), 3);
    }

    #[test]
    fn test_load_from_str_empty_object_uses_defaults() {
        let cfg = load_from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_load_from_str_partial_config_uses_defaults() {
        let cfg = load_from_str(r#"{"base_url": "https://feed.example.com", "reset_enabled": false}"#)
            .unwrap();
        assert_eq!(cfg.base_url, "https://feed.example.com");
        assert!(!cfg.reset_enabled);
    }

    #[test]
    fn test_load_from_str_invalid_json() {
        let err = load_from_str("{not json").unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_load_from_str_validation_error() {
        let err = load_from_str(r#"{"output_dir": ""}"#).unwrap_err();
        assert!(err.to_string().contains("Validation errors"));
    }

    #[test]
    fn test_load_from_file_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_dir": "results", "seed_command": ["./seed.sh"]}}"#).unwrap();
        let cfg = load_from_file(file.path()).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("results"));
        assert_eq!(cfg.seed_command, vec!["./seed.sh"]);
    }

    #[test]
    fn test_load_from_file_nonexistent_file() {
        let err = load_from_file(Path::new("/nonexistent/feed-bench.json")).unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(_)));
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_with_no_env_uses_defaults() {
        let cfg = load_with(env_of(&[])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_load_with_env_overrides() {
        let cfg = load_with(env_of(&[
            (BASE_URL_ENV, "https://feed.example.com/"),
            (OUTPUT_DIR_ENV, "/tmp/bench-out"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "https://feed.example.com/");
        assert_eq!(cfg.trimmed_base_url(), "https://feed.example.com");
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/bench-out"));
    }

    #[test]
    fn test_load_with_config_file_then_override() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"base_url": "http://a.example", "reset_enabled": false}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cfg = load_with(env_of(&[
            (CONFIG_PATH_ENV, path.as_str()),
            (BASE_URL_ENV, "http://b.example"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://b.example");
        assert!(!cfg.reset_enabled);
    }

    #[test]
    fn test_load_with_invalid_override_fails_validation() {
        let err = load_with(env_of(&[(BASE_URL_ENV, "feed.example.com")])).unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(_)));
    }

    #[test]
    fn test_timeout_key_in_config_file_is_ignored() {
        // The per-request timeout is fixed; a config file cannot change it.
        let cfg = load_from_str(r#"{"request_timeout_secs": 1}"#).unwrap();
        assert_eq!(cfg, Config::default());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("timeout"));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn test_mode_kinds() {
        assert_eq!(ExperimentMode::Conc.kinds(), vec![ExperimentKind::Concurrency]);
        assert_eq!(ExperimentMode::Post.kinds(), vec![ExperimentKind::PostVolume]);
        assert_eq!(ExperimentMode::Fanout.kinds(), vec![ExperimentKind::FanOut]);
        assert_eq!(
            ExperimentMode::All.kinds(),
            vec![
                ExperimentKind::Concurrency,
                ExperimentKind::PostVolume,
                ExperimentKind::FanOut
            ]
        );
    }

    #[test]
    fn test_kind_file_names() {
        assert_eq!(ExperimentKind::Concurrency.file_name(), "conc.csv");
        assert_eq!(ExperimentKind::PostVolume.file_name(), "post.csv");
        assert_eq!(ExperimentKind::FanOut.file_name(), "fanout.csv");
        assert_eq!(ExperimentKind::FanOut.summary_file_name(), "fanout_summary.json");
    }
}
