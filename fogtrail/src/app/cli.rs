//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fogtrail - Turn noisy location samples into clean trajectories
#[derive(Parser, Debug)]
#[command(name = "fogtrail")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON array of location samples through the dedup gate
    Replay {
        /// Input samples file
        #[arg(short, long)]
        input: PathBuf,

        /// Print only the summary, not every decision
        #[arg(short, long)]
        summary: bool,
    },

    /// Simplify a JSON array of points
    Simplify {
        /// Input points file
        #[arg(short, long)]
        input: PathBuf,

        /// Tolerance (overrides config)
        #[arg(short, long)]
        tolerance: Option<f64>,
    },

    /// Stitch a JSON array of segments into simplified chains
    Chains {
        /// Input segments file
        #[arg(short, long)]
        input: PathBuf,

        /// Tolerance (overrides config)
        #[arg(short, long)]
        tolerance: Option<f64>,
    },

    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration to the config path
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the default config file location
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
