// SPDX-License-Identifier: Apache-2.0
//! Whiteboard sync server binary: axum routes, periodic flush, graceful
//! shutdown. Dispatches to plain or TLS-terminated binding depending on
//! whether both `--tls-cert`/`--tls-key` are given, and performs one
//! final cache flush before exiting on shutdown signal.

use anyhow::{anyhow, Context, Result};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use board_server::config::Args;
use board_server::state::AppState;
use board_store::PersistenceService;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let persistence = PersistenceService::open(
        args.data_dir.clone(),
        args.page_cache_size,
        args.board_cache_size,
    )
    .context("open persistence store")?;
    let state = AppState::new(persistence, &args);

    spawn_periodic_flush(state.clone(), args.flush_interval());

    let app = board_server::build_router(state.clone());

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    let shutdown_state = state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, flushing caches");
        shutdown_state.persistence.lock().await.flush_all();
        shutdown_handle.shutdown();
    });

    match (args.tls_cert, args.tls_key) {
        (Some(cert), Some(key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("load tls config")?;
            info!(listen = %args.listen, "whiteboard server listening (TLS)");
            axum_server::bind_rustls(args.listen, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        (None, None) => {
            info!(listen = %args.listen, "whiteboard server listening");
            axum_server::bind(args.listen)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            return Err(anyhow!(
                "must provide both --tls-cert and --tls-key or neither"
            ))
        }
    }

    Ok(())
}

fn spawn_periodic_flush(state: Arc<AppState>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            state.persistence.lock().await.flush_all();
        }
    });
}
