// SPDX-License-Identifier: Apache-2.0
//! Shared server state: persistence, per-board broadcast channels, and the
//! per-connection state machine.

use crate::config::Args;
use board_proto::ServerMessage;
use board_store::PersistenceService;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

const BROADCAST_CAPACITY: usize = 256;

/// Process-wide state, shared across connections behind `Arc`.
pub struct AppState {
    pub persistence: Mutex<PersistenceService>,
    pub boards: Mutex<HashMap<String, broadcast::Sender<BoardEvent>>>,
    pub require_create_credential: bool,
    pub ping_interval: Duration,
    pub static_page: String,
}

/// A server message destined for every same-board peer except the proposer.
#[derive(Debug, Clone)]
pub struct BoardEvent {
    pub message: ServerMessage,
    pub origin_client_id: String,
}

impl AppState {
    pub fn new(persistence: PersistenceService, args: &Args) -> Arc<Self> {
        Arc::new(Self {
            persistence: Mutex::new(persistence),
            boards: Mutex::new(HashMap::new()),
            require_create_credential: args.require_create_credential,
            ping_interval: args.ping_interval(),
            static_page: crate::assets::render_page(),
        })
    }

    /// Get or lazily create the broadcast channel for `board_id`.
    pub async fn board_channel(&self, board_id: &str) -> broadcast::Sender<BoardEvent> {
        let mut boards = self.boards.lock().await;
        boards
            .entry(board_id.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone()
    }
}

/// Per-connection state machine: which board/page this socket is bound to.
#[derive(Debug, Default, Clone)]
pub struct ConnectionState {
    pub client_id: Option<String>,
    pub board_id: Option<String>,
    pub page_id: Option<String>,
}

impl ConnectionState {
    /// The bound board id, or a protocol-violation error if none is set.
    pub fn require_board(&self) -> Result<&str, &'static str> {
        self.board_id
            .as_deref()
            .ok_or("connection is not bound to a board yet")
    }
}
