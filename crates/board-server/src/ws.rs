// SPDX-License-Identifier: Apache-2.0
//! Per-connection WebSocket lifecycle: upgrade, message loop, board-scoped
//! broadcast fan-out, and the periodic PING task. A dedicated writer task
//! drains an mpsc channel so a slow peer never blocks fan-out to others;
//! the main loop joins reads, broadcast events, and the ping tick via
//! `tokio::select!`.

use crate::handler::handle_message;
use crate::state::{AppState, BoardEvent, ConnectionState};
use axum::extract::ws::{Message, WebSocket};
use board_proto::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, ping_interval: Duration) {
    let mut conn = ConnectionState::default();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(64);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut broadcast_rx: Option<broadcast::Receiver<BoardEvent>> = None;
    let mut ping_tick = tokio::time::interval(ping_interval);
    ping_tick.tick().await; // first tick fires immediately; discard it

    loop {
        if broadcast_rx.is_none() {
            if let Some(board_id) = conn.board_id.clone() {
                broadcast_rx = Some(state.board_channel(&board_id).await.subscribe());
            }
        }

        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(reply) = handle_message(&state, &mut conn, client_msg).await {
                                    send_json(&out_tx, &reply).await;
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "unparsable client message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = out_tx.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket read error");
                        break;
                    }
                }
            }
            event = recv_broadcast(&mut broadcast_rx) => {
                if let Some(event) = event {
                    if conn.client_id.as_deref() != Some(event.origin_client_id.as_str()) {
                        send_json(&out_tx, &event.message).await;
                    }
                }
            }
            _ = ping_tick.tick() => {
                if let (Some(board_id), Some(page_id)) = (conn.board_id.clone(), conn.page_id.clone()) {
                    if let Some(ping) = build_ping(&state, &board_id, &page_id).await {
                        send_json(&out_tx, &ping).await;
                    }
                }
            }
        }
    }

    drop(out_tx);
    let _ = writer.await;
    if let Some(client_id) = conn.client_id {
        info!(client_id, "connection closed");
    }
}

async fn recv_broadcast(
    rx: &mut Option<broadcast::Receiver<BoardEvent>>,
) -> Option<BoardEvent> {
    match rx {
        Some(r) => loop {
            match r.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}

async fn build_ping(state: &Arc<AppState>, board_id: &str, page_id: &str) -> Option<ServerMessage> {
    let mut persistence = state.persistence.lock().await;
    let board_registry: board_store::BoardRegistry = persistence.load_board(board_id).ok()?.clone();
    let page_nr = board_registry.page_number(page_id).map(|i| i + 1).unwrap_or(1);
    let total_pages = board_registry.total_pages();
    let page = persistence.load_page(page_id);
    let hashes = page.hashes_snapshot();
    let indices = board_engine::snapshot_indices(hashes.len());
    let snapshots = indices.into_iter().map(|i| hashes[i].to_hex()).collect();
    Some(ServerMessage::Ping {
        uuid: page_id.to_string(),
        hash: page.current_hash().to_hex(),
        page_nr,
        total_pages,
        snapshots,
    })
}

async fn send_json(out_tx: &mpsc::Sender<Message>, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(text) => {
            let _ = out_tx.send(Message::Text(text)).await;
        }
        Err(err) => warn!(error = %err, "failed to serialize server message"),
    }
}
