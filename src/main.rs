//! svcwatch - heartbeat-driven liveness tracking
//!
//! Main entry point for the svcwatch CLI and server.

mod cli;
mod client;
mod server;

use clap::Parser;

use svcwatch_config::ConfigLoader;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::load_or_default(&cli.config)?;

    let command = cli.command.unwrap_or(Commands::Run {
        host: None,
        port: None,
    });

    // Client commands log to the console only
    server::init_tracing(&config.logging, !command.is_client())?;

    match command {
        Commands::Run { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run_server(config).await
        }
        Commands::Check => server::run_check(config).await,
        Commands::Status { url } => {
            let url = url.unwrap_or(config.server.url);
            client::print_status(&url).await
        }
        Commands::Configure {
            service_key,
            url,
            service_type,
            expected_period,
            dead_after,
            alerts,
            no_alerts,
            display_name,
            group,
        } => {
            let url = url.unwrap_or(config.server.url);
            let patch = client::build_patch(client::PatchArgs {
                service_type,
                expected_period,
                dead_after,
                alerts,
                no_alerts,
                display_name,
                group,
            })?;
            client::configure(&url, &service_key, patch).await
        }
    }
}
