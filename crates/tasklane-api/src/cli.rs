//! CLI definitions for the `tasklane` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Task automation API server.
#[derive(Parser)]
#[command(name = "tasklane", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config.toml (defaults to $TASKLANE_CONFIG, then ~/.tasklane/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides [server] port).
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to (overrides [server] host).
        #[arg(long)]
        host: Option<String>,

        /// Register an agent with an empty manifest at startup. Repeatable.
        #[arg(long = "agent", value_name = "NAME")]
        agents: Vec<String>,
    },

    /// Print the resolved configuration.
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl Cli {
    /// Default log directives for the chosen verbosity. `RUST_LOG` wins.
    pub fn log_directives(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,tasklane=debug,tower_http=debug",
            _ => "trace",
        }
    }
}
