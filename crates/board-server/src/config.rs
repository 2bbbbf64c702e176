// SPDX-License-Identifier: Apache-2.0
//! CLI-derived server configuration.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5236;

/// `PORT`, if set and a valid `u16`, otherwise [`DEFAULT_PORT`].
fn default_listen() -> SocketAddr {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Collaborative whiteboard sync server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Whiteboard sync server")]
pub struct Args {
    /// TCP listener for browser clients. Falls back to `PORT` (default 5236)
    /// on `0.0.0.0` when not given explicitly.
    #[arg(long, default_value_t = default_listen())]
    pub listen: SocketAddr,
    /// Directory holding `.board`/`.page` files, `passwd.json`, `to_be_removed.json`.
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,
    /// Max pages held in memory before write-back eviction.
    #[arg(long, default_value_t = 256)]
    pub page_cache_size: usize,
    /// Max boards held in memory before write-back eviction.
    #[arg(long, default_value_t = 64)]
    pub board_cache_size: usize,
    /// Seconds between PING probes sent to each connection.
    #[arg(long, default_value_t = 5)]
    pub ping_interval_secs: u64,
    /// Seconds between periodic cache flushes.
    #[arg(long, default_value_t = 10)]
    pub flush_interval_secs: u64,
    /// Require a create-board credential match against `passwd.json`.
    #[arg(long, default_value_t = true)]
    pub require_create_credential: bool,
    /// Optional allowed Origin values (repeatable). Empty = accept all.
    #[arg(long)]
    pub allow_origin: Vec<String>,
    /// TLS certificate (PEM). If provided, `--tls-key` must also be provided.
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,
    /// TLS private key (PEM). If provided, `--tls-cert` must also be provided.
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

impl Args {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}
