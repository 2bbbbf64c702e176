// SPDX-License-Identifier: Apache-2.0
//! Library surface for the whiteboard sync server, split out from `main.rs`
//! so integration tests can build a real `Router` against an in-memory
//! `AppState` without spawning the binary.

pub mod assets;
pub mod config;
pub mod credential;
pub mod handler;
pub mod state;
pub mod ws;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use state::AppState;

/// Build the axum app: the single static page plus the `/ws` upgrade route.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_upgrade_handler))
        .with_state(state)
}

async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(state.static_page.clone())
}

async fn ws_upgrade_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let ping_interval = state.ping_interval;
    ws.on_upgrade(move |socket| ws::handle_socket(socket, state, ping_interval))
}
