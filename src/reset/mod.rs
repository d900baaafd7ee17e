// External state reset module
//
// The data store is reset through two external operations run in sequence:
// clear everything, then seed a baseline under a namespace prefix. Both are
// best-effort from the orchestrator's point of view.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::BenchError;

/// Baseline the store is seeded with before measuring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedParams {
    pub users: u32,
    pub posts_per_user: u32,
    pub follows_per_user: u32,
    pub prefix: String,
}

impl SeedParams {
    pub fn new(users: u32, posts_per_user: u32, follows_per_user: u32, prefix: &str) -> Self {
        Self {
            users,
            posts_per_user,
            follows_per_user,
            prefix: prefix.to_string(),
        }
    }

    /// Command-line arguments understood by the seeding script.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--users".to_string(),
            self.users.to_string(),
            "--posts".to_string(),
            self.posts_per_user.to_string(),
            "--follows".to_string(),
            self.follows_per_user.to_string(),
            "--prefix".to_string(),
            self.prefix.clone(),
        ]
    }
}

type ResetFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BenchError>> + Send + 'a>>;

/// External state-reset collaborator.
pub trait StateReset: Send + Sync {
    fn clear(&self) -> ResetFuture<'_>;
    fn seed<'a>(&'a self, params: &'a SeedParams) -> ResetFuture<'a>;
}

/// Clear then seed, logging failures instead of returning them.
/// Returns true when both steps succeeded.
pub async fn reset_best_effort(reset: &dyn StateReset, params: &SeedParams) -> bool {
    info!(
        users = params.users,
        posts = params.posts_per_user,
        follows = params.follows_per_user,
        prefix = %params.prefix,
        "resetting data store"
    );
    println!(
        "\n[SETUP] Reset DB: {} users, {} posts, {} follows ({})...",
        params.users, params.posts_per_user, params.follows_per_user, params.prefix
    );

    let mut ok = true;
    if let Err(e) = reset.clear().await {
        warn!("clear step failed, continuing: {}", e);
        ok = false;
    }
    if let Err(e) = reset.seed(params).await {
        warn!("seed step failed, continuing: {}", e);
        ok = false;
    }
    if ok {
        println!("  -> DB reset OK.");
    }
    ok
}

/// Runs the configured clean/seed programs as child processes.
#[derive(Debug, Clone)]
pub struct CommandReset {
    clean: Vec<String>,
    seed: Vec<String>,
}

impl CommandReset {
    pub fn new(clean: Vec<String>, seed: Vec<String>) -> Self {
        Self { clean, seed }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.clean_command.clone(), config.seed_command.clone())
    }
}

impl StateReset for CommandReset {
    fn clear(&self) -> ResetFuture<'_> {
        Box::pin(run_command(&self.clean, Vec::new()))
    }

    fn seed<'a>(&'a self, params: &'a SeedParams) -> ResetFuture<'a> {
        Box::pin(run_command(&self.seed, params.to_args()))
    }
}

async fn run_command(argv: &[String], extra_args: Vec<String>) -> Result<(), BenchError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BenchError::Reset("empty command".to_string()))?;

    let status = Command::new(program)
        .args(args)
        .args(&extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| BenchError::Reset(format!("failed to spawn '{}': {}", program, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(BenchError::Reset(format!("'{}' exited with {}", program, status)))
    }
}

/// Reset that does nothing, for runs against an already prepared store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReset;

impl StateReset for NoopReset {
    fn clear(&self) -> ResetFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn seed<'a>(&'a self, _params: &'a SeedParams) -> ResetFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}
