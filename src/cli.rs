//! CLI definitions for svcwatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// svcwatch CLI.
#[derive(Parser)]
#[command(name = "svcwatch")]
#[command(about = "Heartbeat-driven liveness tracking for a fleet of services")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve the API and run the monitor loop in the foreground (default)
    Run {
        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the heartbeat status of every service
    Status {
        /// Registry base URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Create or update a service's configuration
    Configure {
        /// Service key
        service_key: String,

        /// Registry base URL
        #[arg(long)]
        url: Option<String>,

        /// Service type (cloud_service, local_job)
        #[arg(long)]
        service_type: Option<String>,

        /// Expected seconds between heartbeats
        #[arg(long)]
        expected_period: Option<u64>,

        /// Seconds of silence before the service is dead
        #[arg(long)]
        dead_after: Option<u64>,

        /// Enable alerts
        #[arg(long, conflicts_with = "no_alerts")]
        alerts: bool,

        /// Disable alerts
        #[arg(long)]
        no_alerts: bool,

        /// Human-readable name
        #[arg(long)]
        display_name: Option<String>,

        /// Service group
        #[arg(long)]
        group: Option<String>,
    },

    /// Run one monitor pass against the configured store and print the report
    Check,
}

impl Commands {
    /// Whether the command talks to a running registry instead of the store.
    pub fn is_client(&self) -> bool {
        matches!(self, Commands::Status { .. } | Commands::Configure { .. })
    }
}
