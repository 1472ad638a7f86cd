//! File Storage API server binary.
//!
//! Accepts multipart uploads into a flat storage directory, lists and serves
//! stored files by name, and reports health and storage metrics. The main
//! entry point parses configuration, prepares the storage root and runs the
//! HTTP listener until a shutdown signal arrives.

mod app;
mod config;
mod error;
mod files;
mod http;
mod logging;
mod service;
mod store;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::config::{Args, SHUTDOWN_GRACE_SECS};
use crate::http::build_cors_layer;
use crate::store::FileStore;

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let store = Arc::new(FileStore::new(PathBuf::from(&args.storage_dir)));
    store.ensure_root().await?;
    info!(root = %store.root_path().display(), "storage root ready");

    let mut app = app::build_router(store, args.max_upload_size);
    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!("🚀 Starting File Storage API at {}", addr);

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
