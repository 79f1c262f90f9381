//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bargain")]
#[command(about = "Bargain - adaptive multi-party negotiation agents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one negotiation session between local agents
    Simulate {
        /// Domain file (JSON)
        #[arg(short, long)]
        domain: PathBuf,

        /// Utility profile per party (JSON), in turn order
        #[arg(short, long = "profile", required = true, num_args = 1..)]
        profiles: Vec<PathBuf>,

        /// Strategy per party: hardheaded, responsive, cooperative, selector or custom
        #[arg(short, long = "strategy", num_args = 1..)]
        strategies: Vec<String>,

        /// Engine configuration used by `custom` parties (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Deadline in rounds
        #[arg(short, long, default_value = "180")]
        rounds: u64,

        /// Wall-clock deadline in milliseconds, replaces --rounds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Write the session report here (JSON)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the acceptance threshold curve of a strategy
    Curve {
        /// Preset name
        #[arg(short, long, default_value = "hardheaded")]
        strategy: String,

        /// Engine configuration to plot instead of a preset (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of intervals between t=0 and t=1
        #[arg(long, default_value = "20")]
        steps: usize,

        /// Lowest reachable utility
        #[arg(long, default_value = "0.0")]
        min_utility: f64,

        /// Highest reachable utility
        #[arg(long, default_value = "1.0")]
        max_utility: f64,

        /// Worst recent opponent offer, for thresholds with opponent feedback
        #[arg(long)]
        opponent_floor: Option<f64>,
    },

    /// Print every preset configuration as JSON
    Presets,
}
