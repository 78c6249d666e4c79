//! Application Layer
//!
//! CLI, configuration management and sample replay.

pub mod cli;
pub mod config;
pub mod replay;

pub use cli::Cli;
pub use config::Config;
