//! Dispatch gateway entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: read [`config::ServerConfig`] from the
//!    environment and validate it before anything binds.
//! 2. **Wire observability**: install `tracing-subscriber` with a JSON (or
//!    pretty) layer and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: open the queue store (Redis or
//!    in-memory) and the per-request [`config::EnvConfigSource`].
//! 4. **Run the selected command**:
//!    - `serve` (default): run the HTTP gateway until SIGINT / SIGTERM.
//!    - `enqueue`: push one job onto a queue and exit.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispatch::{Job, JobQueue, QueueName, QueueStore};
use gateway::{build_router, AppState};
use store::{InMemoryQueueStore, RedisQueueStore};
use tracing::{info, warn};

mod config;
mod telemetry;

use config::{process_env, EnvConfigSource, ServerConfig, StoreBackend};

/// CI job-dispatch gateway.
#[derive(Parser, Debug)]
#[command(name = "dispatch-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,

    /// Push one job onto a queue
    Enqueue {
        /// Target queue
        #[arg(long, default_value = QueueName::DEFAULT)]
        queue: String,

        /// Job as a JSON object, e.g. '{"branch":"main","clone_url":"..."}'
        job: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::from_env().context("invalid configuration")?;
    let _telemetry = telemetry::init(config.log_format)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Enqueue { queue, job } => enqueue(config, &queue, &job).await,
    }
}

async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn QueueStore>> {
    match backend {
        StoreBackend::Redis {
            url,
            connect_timeout,
        } => {
            let store = RedisQueueStore::connect(url, *connect_timeout)
                .await
                .context("failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory queue store; queued jobs are lost on restart");
            Ok(Arc::new(InMemoryQueueStore::new()))
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let store = open_store(&config.store).await?;
    let state = AppState::new(
        store,
        config.keys.clone(),
        Arc::new(EnvConfigSource::new(process_env())),
        config.docs_url.clone(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        addr = %config.bind,
        namespace = config.keys.namespace(),
        "Dispatch gateway listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Dispatch gateway stopped");
    Ok(())
}

async fn enqueue(config: ServerConfig, queue: &str, job: &str) -> Result<()> {
    let queue = QueueName::new(queue).context("queue name must not be empty")?;
    let job: Job = serde_json::from_str(job).context("job must be a JSON object")?;

    if config.store == StoreBackend::Memory {
        warn!("Enqueueing into an in-memory store has no effect outside this process");
    }
    let store = open_store(&config.store).await?;
    JobQueue::new(store, config.keys)
        .push(&queue, &job)
        .await
        .context("failed to enqueue job")?;

    info!(queue = %queue, "Job enqueued");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
