//! weblabel-server - Main entry point
//!
//! Serves recorded signal files and their label segments to the browser
//! labeling frontend, and persists label edits back to disk.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weblabel_common::config::{load_bootstrap_config, resolve_root_folder};
use weblabel_common::{DiscoveryOptions, FsLabelStore, PresetStore};
use weblabel_server::{build_router, AppState};

/// Command-line arguments for weblabel-server
#[derive(Parser, Debug)]
#[command(name = "weblabel-server")]
#[command(about = "Signal labeling backend")]
#[command(version)]
struct Args {
    /// Directory holding one sub-directory per signal file
    /// (falls back to WEBLABEL_ROOT_FOLDER, then the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "WEBLABEL_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,

    /// Frontend asset directory
    #[arg(long, env = "WEBLABEL_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// TOML config file (default: <config dir>/weblabel/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Require exactly this many auxiliary vectors (p0.npy, p1.npy, ...) per file
    #[arg(long)]
    expected_aux_vectors: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let bootstrap = load_bootstrap_config(args.config.as_deref());
    let level_directive = match &bootstrap {
        Ok(loaded) => loaded.toml.logging.filter_directive(),
        Err(_) => "weblabel_server=info,weblabel_common=info,tower_http=info".to_string(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting weblabel-server v{}", env!("CARGO_PKG_VERSION"));

    let bootstrap = bootstrap.context("Failed to load configuration")?;
    match &bootstrap.source {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    let config = bootstrap.toml;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    info!("Root folder: {}", root_folder.display());

    let options = DiscoveryOptions {
        expected_aux_vectors: args.expected_aux_vectors.or(config.expected_aux_vectors),
    };
    let store = FsLabelStore::discover(&root_folder, options)
        .context("Failed to index root folder")?;
    if store.is_empty() {
        warn!("No signal files found under {}", root_folder.display());
    }

    let static_dir = args.static_dir.or(config.static_assets);
    match &static_dir {
        Some(dir) => info!("Serving frontend from {}", dir.display()),
        None => warn!("No static asset directory configured, frontend will not be served"),
    }

    let state = AppState::new(Arc::new(store), PresetStore::new(&root_folder));
    let app = build_router(state, static_dir);

    let bind = args.bind.unwrap_or(config.bind_address);
    let port = args.port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {bind}:{port}"))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;
    info!("weblabel-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
