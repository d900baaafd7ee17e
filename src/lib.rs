pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod reporter;
pub mod reset;
pub mod stats;
pub mod testutil;
pub mod user_pool;
