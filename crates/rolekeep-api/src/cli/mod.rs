//! CLI command definitions for the `rolekeep` binary.
//!
//! Uses clap derive macros for argument parsing. Role commands follow a
//! noun-verb pattern (e.g., `rolekeep role list`, `rolekeep role get admin`).

pub mod role;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Store, inspect, and expire service roles.
#[derive(Parser)]
#[command(name = "rolekeep", version, about, long_about = None)]
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

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage service roles (upsert, get, list, delete, delete-all).
    Role {
        #[command(subcommand)]
        action: role::RoleCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Log filter implied by `--quiet` and `-v` flags.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,rolekeep=debug",
            _ => "trace",
        }
    }
}
