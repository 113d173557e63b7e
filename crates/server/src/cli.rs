//! CLI argument parsing.

use clap::Parser;

/// Compliance-deadline tracking and notification server.
#[derive(Parser, Debug)]
#[command(name = "duewatch-server", version, about)]
pub struct Cli {
    /// Bind address override, e.g. "0.0.0.0:8080".
    #[arg(long, env = "HTTP_BIND")]
    pub bind: Option<String>,

    /// Seconds between due-job scans.
    #[arg(long, env = "SCHEDULER_TICK_SECS")]
    pub tick_secs: Option<u64>,

    /// Use the in-memory store even when PostgreSQL is configured.
    #[arg(long)]
    pub memory: bool,
}
