//! Server initialization and startup logic for svcwatch.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use svcwatch_api::{ApiServer, AppState, ServerAddress};
use svcwatch_config::{Config, ConfigLoader, LoggingConfig, StoreBackend, StoreConfig};
use svcwatch_monitor::{
    AlertDispatcher, AlertManager, MonitorLoop, ServiceRegistry, StatusEngine, TransitionRecorder,
};
use svcwatch_protocols::Store;
use svcwatch_store::{MemoryStore, SqliteStore, TimedStore};

/// Initialize tracing with console and, optionally, file output.
///
/// Log files are written to the configured directory (default `~/.svcwatch/logs/`)
/// with daily rotation.
pub(crate) fn init_tracing(logging: &LoggingConfig, with_file: bool) -> anyhow::Result<()> {
    let file_layer = if with_file && logging.file {
        let log_dir = logging
            .dir
            .clone()
            .unwrap_or_else(|| ConfigLoader::data_dir().join("logs"));
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("svcwatch")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The guard flushes buffered lines on drop, so it lives for the whole process.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Open the configured backend, bounded by the store deadline.
pub(crate) async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    let inner: Arc<dyn Store> = match config.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.path)
                .await
                .with_context(|| format!("opening store at {}", config.path.display()))?;
            info!("SQLite store opened at {}", config.path.display());
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; state is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(Arc::new(TimedStore::new(inner, config.timeout())))
}

/// Run the server in foreground until interrupted.
pub(crate) async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Starting svcwatch v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config.store).await?;

    let registry = Arc::new(ServiceRegistry::new(store.clone()));
    registry.warm().await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    if config.monitor.enabled {
        let monitor = Arc::new(
            MonitorLoop::new(
                store.clone(),
                StatusEngine::new(config.monitor.heartbeat_window),
            )
            .with_interval(config.monitor.interval()),
        );
        tasks.push(("monitor loop", tokio::spawn(monitor.run(cancel_rx.clone()))));
    } else {
        warn!("Monitor loop disabled; statuses will not be updated");
    }

    if config.alerts.enabled {
        let manager = AlertManager::from_config(&config.alerts);
        info!("Alert channels: {}", manager.channel_names().join(", "));
        let dispatcher = Arc::new(
            AlertDispatcher::new(TransitionRecorder::new(store.clone()), manager)
                .with_interval(config.alerts.interval()),
        );
        tasks.push(("alert dispatcher", tokio::spawn(dispatcher.run(cancel_rx.clone()))));
    }

    let server = ApiServer::new(
        ServerAddress::new(&config.server.host, config.server.port),
        Arc::new(AppState::new(registry)),
    );
    let listener = server
        .bind()
        .await
        .with_context(|| format!("binding {}", server.address()))?;

    info!("svcwatch ready:");
    info!("  API Server:    http://{}", server.address());
    info!("  Store:         {:?}", config.store.backend);
    info!("  Monitor every: {}s", config.monitor.interval_secs);

    let served = server.serve(listener, shutdown_signal()).await;

    info!("Shutting down...");
    let _ = cancel_tx.send(true);
    for (name, task) in tasks {
        if let Err(e) = task.await {
            error!("{} task failed: {}", name, e);
        }
    }

    served.context("serving API")
}

/// Run a single monitor pass and print the report as JSON.
pub(crate) async fn run_check(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config.store).await?;
    let monitor = MonitorLoop::new(store, StatusEngine::new(config.monitor.heartbeat_window));
    let report = monitor.tick().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
