//! CLI command definitions and dispatch for the `chatgate` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod config;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Self-hosted messaging gateway: one chat session behind a REST API.
#[derive(Parser)]
#[command(name = "chatgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn,chatgate=info",
            1 => "info,chatgate=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and connect the session.
    Serve {
        /// Port to listen on (overrides PORT, CHATGATE_PORT and config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Show stored session state without starting the server.
    Status,

    /// Print the effective configuration.
    Config,

    /// Discard stored credentials so the next start requires a new login.
    ///
    /// Only local state is removed; run against a stopped server.
    Logout,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
