use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packsmith_core::{
    load_config, metrics, validate_config, BuildOrchestrator, JobStore, ProgressLevel,
    SqliteJobStore, TwaBundler, WorkspaceStore,
};

use packsmith_server::api::create_router;
use packsmith_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PACKSMITH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("packsmith {} starting", VERSION);
    info!("Database path: {:?}", config.database.path);
    info!("Workspace root: {:?}", config.workspace.root);

    // Log a config hash so deployments can be told apart in the logs
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // Create the job store
    let job_store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Create the workspace store (and its root directory)
    let workspaces = WorkspaceStore::new(&config.workspace);
    tokio::fs::create_dir_all(workspaces.root())
        .await
        .context("Failed to create workspace root")?;
    info!("Workspace store initialized");

    // Create the bundler and verify the toolchain is reachable
    let bundler = Arc::new(TwaBundler::new(config.builder.clone()));
    if let Err(e) = packsmith_core::Bundler::validate(bundler.as_ref()).await {
        warn!("Builder toolchain validation failed (builds will error): {}", e);
    }

    // Create the orchestrator
    let orchestrator = BuildOrchestrator::new(
        config.orchestrator.clone(),
        config.builder.clone(),
        Arc::clone(&job_store),
        bundler,
        workspaces,
    );

    // Relay progress events into the service log
    let mut progress_rx = orchestrator.progress().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = progress_rx.recv().await {
            match event.level {
                ProgressLevel::Error => error!("[{}] {}", event.job_id, event.message),
                ProgressLevel::Warn => warn!("[{}] {}", event.job_id, event.message),
                ProgressLevel::Info => info!("[{}] {}", event.job_id, event.message),
            }
        }
    });

    // Start the queue worker if enabled
    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!("Build queue worker started");
    } else {
        info!("Build queue worker disabled in config");
    }

    // Register core metrics
    let metrics_registry = prometheus::Registry::new();
    for metric in metrics::all_metrics() {
        if let Err(e) = metrics_registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        job_store,
        orchestrator.clone(),
        metrics_registry,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the queue worker if running
    if config.orchestrator.enabled {
        info!("Stopping build queue worker...");
        orchestrator.stop().await;
        info!("Build queue worker stopped");
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
