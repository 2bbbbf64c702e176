// SPDX-License-Identifier: Apache-2.0
//! Message dispatch: one function per client message type, routing through
//! `board-engine`/`board-store` and producing the direct response plus any
//! same-board broadcast.

use crate::credential::{digest_bytes, digest_hex};
use crate::state::{AppState, BoardEvent, ConnectionState};
use board_proto::{ActionKind, ClientMessage, DeclineReason, Digest, ServerMessage};
use board_store::BoardRegistry;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn decline(uuid: String, action_uuid: Option<String>, reason: DeclineReason) -> ServerMessage {
    ServerMessage::Decline {
        uuid,
        action_uuid,
        reason: reason.as_str().to_string(),
    }
}

/// Dispatch one client message. Returns the direct response to the sender;
/// any fan-out broadcast is published internally via `state.board_channel`.
pub async fn handle_message(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::RegisterBoard {
            board_id,
            client_id,
            request_id,
        } => handle_register_board(state, conn, board_id, client_id, request_id).await,
        ClientMessage::CreateBoard {
            passwd,
            client_id,
            request_id,
        } => handle_create_board(state, conn, passwd, client_id, request_id).await,
        ClientMessage::FullPageRequest {
            page_number,
            page_id,
            delta,
            request_id,
        } => handle_full_page_request(state, conn, page_number, page_id, delta, request_id).await,
        ClientMessage::ModActionProposal {
            passwd,
            page_uuid,
            payload,
            before_hash,
        } => handle_mod_action_proposal(state, conn, passwd, page_uuid, payload, before_hash).await,
        ClientMessage::ReplayRequest {
            page_uuid,
            present,
            present_hash,
            request_id: _,
        } => handle_replay_request(state, conn, page_uuid, present, present_hash).await,
    }
}

async fn handle_register_board(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    board_id: String,
    client_id: String,
    request_id: String,
) -> Option<ServerMessage> {
    let mut persistence = state.persistence.lock().await;
    let board_registry: BoardRegistry = match persistence.load_board(&board_id) {
        Ok(guard) => guard.clone(),
        Err(err) => {
            warn!(board_id, error = %err, "register-board: board not found");
            return None;
        }
    };
    drop(persistence);

    let first_page_id = board_registry.page_order[0].clone();
    let total_pages = board_registry.total_pages();

    conn.client_id = Some(client_id);
    conn.board_id = Some(board_id.clone());
    conn.page_id = Some(first_page_id.clone());

    Some(ServerMessage::BoardRegistered {
        board_id,
        first_page_id,
        total_pages,
        request_id,
    })
}

async fn handle_create_board(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    passwd: String,
    client_id: String,
    request_id: String,
) -> Option<ServerMessage> {
    if state.require_create_credential {
        let mut persistence = state.persistence.lock().await;
        let allowed = persistence.is_create_credential_valid(&digest_hex(&passwd));
        drop(persistence);
        if !allowed {
            warn!(client_id, "create-board: invalid create credential");
            return Some(decline(String::new(), None, DeclineReason::Unauthorized));
        }
    }

    let board_id = new_id();
    let first_page_id = new_id();
    let board_edit_key = new_id();

    let mut persistence = state.persistence.lock().await;
    persistence.create_board(
        &board_id,
        BoardRegistry::new(digest_bytes(&board_edit_key), first_page_id.clone()),
    );
    persistence.mark_board_dirty(&board_id);
    let mut page_guard = persistence.load_page(&first_page_id);
    page_guard.mark_dirty();
    drop(page_guard);
    drop(persistence);

    conn.client_id = Some(client_id);
    conn.board_id = Some(board_id.clone());
    conn.page_id = Some(first_page_id.clone());

    info!(board_id, "board created");
    Some(ServerMessage::BoardCreated {
        board_id,
        passwd: board_edit_key,
        first_page_id,
        request_id,
    })
}

async fn handle_full_page_request(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    page_number: Option<u32>,
    page_id: Option<String>,
    delta: Option<i64>,
    request_id: String,
) -> Option<ServerMessage> {
    let board_id = conn.require_board().ok()?.to_string();
    let mut persistence = state.persistence.lock().await;
    let board_registry: BoardRegistry = persistence.load_board(&board_id).ok()?.clone();
    let total_pages = board_registry.total_pages();

    let target_index = if let Some(number) = page_number {
        (number.saturating_sub(1) as usize).min(total_pages - 1)
    } else if let Some(id) = &page_id {
        let resolved = persistence.deletion_map().resolve(id, &board_registry);
        let base = board_registry.page_number(&resolved).unwrap_or(0);
        saturating_offset(base, delta.unwrap_or(0), total_pages)
    } else {
        let current = conn
            .page_id
            .as_deref()
            .unwrap_or(&board_registry.page_order[0]);
        board_registry.page_number(current).unwrap_or(0)
    };
    let resolved_page_id = board_registry.page_order[target_index].clone();

    let page = persistence.load_page(&resolved_page_id);
    let message = ServerMessage::FullPage {
        uuid: resolved_page_id.clone(),
        history: page.history_snapshot().to_vec(),
        present: page.present(),
        hash: page.current_hash().to_hex(),
        page_nr: target_index + 1,
        total_pages,
    };
    drop(page);
    drop(persistence);

    conn.page_id = Some(resolved_page_id);
    let _ = request_id;
    Some(message)
}

fn saturating_offset(base: usize, delta: i64, total: usize) -> usize {
    let offset = base as i64 + delta;
    offset.clamp(0, total as i64 - 1) as usize
}

async fn handle_mod_action_proposal(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    passwd: String,
    page_uuid: String,
    payload: board_proto::Action,
    before_hash: String,
) -> Option<ServerMessage> {
    let board_id = conn.require_board().ok()?.to_string();
    let client_id = conn.client_id.clone().unwrap_or_default();
    let mut persistence = state.persistence.lock().await;

    let board_registry: BoardRegistry = persistence.load_board(&board_id).ok()?.clone();
    if digest_bytes(&passwd) != board_registry.password_digest {
        drop(persistence);
        return Some(decline(
            page_uuid,
            Some(payload.uuid),
            DeclineReason::Unauthorized,
        ));
    }

    let response = match &payload.kind {
        ActionKind::NewPage => handle_new_page(
            &mut persistence,
            &board_id,
            &board_registry,
            &page_uuid,
            &payload,
        ),
        ActionKind::DeletePage { page_id } => handle_delete_page(
            &mut persistence,
            &board_id,
            &board_registry,
            page_id,
            &payload,
            conn,
        ),
        _ => handle_page_edit(
            &mut persistence,
            &board_registry,
            &page_uuid,
            payload,
            &before_hash,
        ),
    };
    drop(persistence);

    if let ServerMessage::Accept { .. } = &response {
        let channel = state.board_channel(&board_id).await;
        let _ = channel.send(BoardEvent {
            message: response.clone(),
            origin_client_id: client_id,
        });
    }
    Some(response)
}

/// Draw/Erase/Group/Undo/Redo: mutate the resolved page's action log.
fn handle_page_edit(
    persistence: &mut board_store::PersistenceService,
    board_registry: &BoardRegistry,
    page_uuid: &str,
    payload: board_proto::Action,
    before_hash: &str,
) -> ServerMessage {
    let resolved_page_id = persistence.deletion_map().resolve(page_uuid, board_registry);
    let total_pages = board_registry.total_pages();
    let page_nr = board_registry
        .page_number(&resolved_page_id)
        .map(|i| i + 1)
        .unwrap_or(1);

    let mut page = persistence.load_page(&resolved_page_id);
    if page.current_hash().to_hex() != before_hash {
        return decline(
            resolved_page_id.clone(),
            Some(payload.uuid),
            DeclineReason::CannotApply,
        );
    }

    let action_uuid = payload.uuid.clone();
    let result = match &payload.kind {
        ActionKind::Draw { .. } | ActionKind::Erase { .. } | ActionKind::Group { .. } => {
            page.apply_edit(payload)
        }
        ActionKind::Undo { target_action_uuid } => page.apply_undo(target_action_uuid),
        ActionKind::Redo { target_action_uuid } => page.apply_redo(target_action_uuid),
        ActionKind::NewPage | ActionKind::DeletePage { .. } => {
            unreachable!("board-level actions are dispatched before this point")
        }
    };

    match result {
        Ok(after_hash) => {
            page.mark_dirty();
            ServerMessage::Accept {
                uuid: resolved_page_id,
                action_uuid,
                before_hash: before_hash.to_string(),
                after_hash: after_hash.to_hex(),
                page_nr,
                total_pages,
            }
        }
        Err(reason) => decline(resolved_page_id, Some(action_uuid), reason),
    }
}

/// NewPage: board-level, does not touch any page's history. The
/// new page is inserted immediately after the connection's current page;
/// the reported before/after hash is the unaffected current page's hash,
/// since only `pageOrder`/`totalPages` changed.
fn handle_new_page(
    persistence: &mut board_store::PersistenceService,
    board_id: &str,
    board_registry: &BoardRegistry,
    page_uuid: &str,
    payload: &board_proto::Action,
) -> ServerMessage {
    let resolved_page_id = persistence.deletion_map().resolve(page_uuid, board_registry);
    let new_page_id = new_id();

    match persistence.load_board(board_id) {
        Ok(mut board_guard) => {
            board_guard.insert_after(&resolved_page_id, new_page_id.clone());
            board_guard.mark_dirty();
        }
        Err(_) => {
            return decline(
                resolved_page_id,
                Some(payload.uuid.clone()),
                DeclineReason::CannotApply,
            )
        }
    }
    let mut new_page_guard = persistence.load_page(&new_page_id);
    new_page_guard.mark_dirty();
    drop(new_page_guard);

    let updated_registry: BoardRegistry = persistence
        .load_board(board_id)
        .ok()
        .map(|g| g.clone())
        .unwrap_or_else(|| board_registry.clone());
    let page = persistence.load_page(&resolved_page_id);
    let hash = page.current_hash().to_hex();
    let page_nr = updated_registry
        .page_number(&resolved_page_id)
        .map(|i| i + 1)
        .unwrap_or(1);
    ServerMessage::Accept {
        uuid: resolved_page_id,
        action_uuid: payload.uuid.clone(),
        before_hash: hash.clone(),
        after_hash: hash,
        page_nr,
        total_pages: updated_registry.total_pages(),
    }
}

/// DeletePage: board-level. Removes `page_id` from the order and records
/// a redirect so future references resolve to the replacement page.
/// Reports the replacement page's (unaffected) hash.
fn handle_delete_page(
    persistence: &mut board_store::PersistenceService,
    board_id: &str,
    board_registry: &BoardRegistry,
    page_id: &str,
    payload: &board_proto::Action,
    conn: &mut ConnectionState,
) -> ServerMessage {
    let remove_result = match persistence.load_board(board_id) {
        Ok(mut board_guard) => {
            let result = board_guard.remove(page_id);
            if result.is_ok() {
                board_guard.mark_dirty();
            }
            result
        }
        Err(_) => Err(DeclineReason::CannotApply),
    };

    let replacement_page_id = match remove_result {
        Ok(replacement) => replacement,
        Err(reason) => return decline(page_id.to_string(), Some(payload.uuid.clone()), reason),
    };
    persistence
        .deletion_map_mut()
        .record(page_id.to_string(), replacement_page_id.clone());

    let updated_registry: BoardRegistry = persistence
        .load_board(board_id)
        .ok()
        .map(|g| g.clone())
        .unwrap_or_else(|| board_registry.clone());
    let resolved_page_id = persistence
        .deletion_map()
        .resolve(&replacement_page_id, &updated_registry);
    let page = persistence.load_page(&resolved_page_id);
    let hash = page.current_hash().to_hex();
    let page_nr = updated_registry
        .page_number(&resolved_page_id)
        .map(|i| i + 1)
        .unwrap_or(1);
    drop(page);

    if conn.page_id.as_deref() == Some(page_id) {
        conn.page_id = Some(resolved_page_id.clone());
    }

    ServerMessage::Accept {
        uuid: resolved_page_id,
        action_uuid: payload.uuid.clone(),
        before_hash: hash.clone(),
        after_hash: hash,
        page_nr,
        total_pages: updated_registry.total_pages(),
    }
}

async fn handle_replay_request(
    state: &Arc<AppState>,
    conn: &mut ConnectionState,
    page_uuid: String,
    present: usize,
    present_hash: String,
) -> Option<ServerMessage> {
    let board_id = conn.require_board().ok()?.to_string();
    let mut persistence = state.persistence.lock().await;
    let board_registry: BoardRegistry = persistence.load_board(&board_id).ok()?.clone();
    let resolved_page_id = persistence.deletion_map().resolve(&page_uuid, &board_registry);
    let total_pages = board_registry.total_pages();
    let page_nr = board_registry
        .page_number(&resolved_page_id)
        .map(|i| i + 1)
        .unwrap_or(1);

    let page = persistence.load_page(&resolved_page_id);
    let claimed_matches = page
        .hashes_snapshot()
        .get(present)
        .map(|h: &Digest| h.to_hex() == present_hash)
        .unwrap_or(false);

    let response = if claimed_matches {
        let edits = page.edits_since(present).to_vec();
        ServerMessage::Replay {
            uuid: resolved_page_id.clone(),
            before_hash: present_hash,
            after_hash: page.current_hash().to_hex(),
            edits,
            present: page.present(),
            current_hash: page.current_hash().to_hex(),
            page_nr,
            total_pages,
        }
    } else {
        ServerMessage::FullPage {
            uuid: resolved_page_id.clone(),
            history: page.history_snapshot().to_vec(),
            present: page.present(),
            hash: page.current_hash().to_hex(),
            page_nr,
            total_pages,
        }
    };
    drop(page);
    drop(persistence);
    conn.page_id = Some(resolved_page_id);
    Some(response)
}
