// SPDX-License-Identifier: Apache-2.0
//! The outer WebSocket message catalog.
//!
//! Unlike [`crate::canonical`] (used for the hash chain and on-disk
//! entities), these messages travel as plain JSON text frames — readable,
//! debuggable, and a closer match to how collaborative-editor wire
//! protocols are usually shipped in this corpus.

use crate::action::{Action, ActionUuid};
use serde::{Deserialize, Serialize};

/// Messages a client may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind this connection to an existing board.
    #[serde(rename = "register-board")]
    RegisterBoard {
        #[serde(rename = "boardId")]
        board_id: String,
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Create a new board, gated by the site-wide create credential.
    #[serde(rename = "create-board")]
    CreateBoard {
        passwd: String,
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Request a page's current full state, by number or by id+delta.
    #[serde(rename = "fullPage-requests")]
    FullPageRequest {
        #[serde(rename = "pageNumber", default)]
        page_number: Option<u32>,
        #[serde(rename = "pageId", default)]
        page_id: Option<String>,
        #[serde(default)]
        delta: Option<i64>,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Propose a modification to a page.
    #[serde(rename = "mod-action-proposals")]
    ModActionProposal {
        passwd: String,
        #[serde(rename = "page-uuid")]
        page_uuid: String,
        payload: Action,
        #[serde(rename = "before-hash")]
        before_hash: String,
    },
    /// Request catch-up from a known position.
    #[serde(rename = "replay-requests")]
    ReplayRequest {
        #[serde(rename = "page-uuid")]
        page_uuid: String,
        present: usize,
        #[serde(rename = "present-hash")]
        present_hash: String,
        #[serde(rename = "requestId")]
        request_id: String,
    },
}

/// Messages the server may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Acknowledges a `create-board` request.
    #[serde(rename = "board-created")]
    BoardCreated {
        #[serde(rename = "boardId")]
        board_id: String,
        passwd: String,
        #[serde(rename = "firstPageId")]
        first_page_id: String,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Acknowledges a `register-board` request.
    #[serde(rename = "board-registered")]
    BoardRegistered {
        #[serde(rename = "boardId")]
        board_id: String,
        #[serde(rename = "firstPageId")]
        first_page_id: String,
        #[serde(rename = "totalPages")]
        total_pages: usize,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Full snapshot of a page.
    #[serde(rename = "fullPage")]
    FullPage {
        uuid: String,
        history: Vec<Action>,
        present: usize,
        hash: String,
        #[serde(rename = "pageNr")]
        page_nr: usize,
        #[serde(rename = "totalPages")]
        total_pages: usize,
    },
    /// A modification was accepted and should be broadcast.
    #[serde(rename = "accept")]
    Accept {
        uuid: String,
        #[serde(rename = "action-uuid")]
        action_uuid: ActionUuid,
        #[serde(rename = "before-hash")]
        before_hash: String,
        #[serde(rename = "after-hash")]
        after_hash: String,
        #[serde(rename = "pageNr")]
        page_nr: usize,
        #[serde(rename = "totalPages")]
        total_pages: usize,
    },
    /// A modification was refused.
    #[serde(rename = "decline")]
    Decline {
        uuid: String,
        #[serde(rename = "action-uuid", default)]
        action_uuid: Option<ActionUuid>,
        reason: String,
    },
    /// Catch-up sequence since a known hash.
    #[serde(rename = "replay")]
    Replay {
        uuid: String,
        #[serde(rename = "beforeHash")]
        before_hash: String,
        #[serde(rename = "afterHash")]
        after_hash: String,
        edits: Vec<Action>,
        present: usize,
        #[serde(rename = "currentHash")]
        current_hash: String,
        #[serde(rename = "pageNr")]
        page_nr: usize,
        #[serde(rename = "totalPages")]
        total_pages: usize,
    },
    /// Liveness + consistency probe.
    #[serde(rename = "ping")]
    Ping {
        uuid: String,
        hash: String,
        #[serde(rename = "pageNr")]
        page_nr: usize,
        #[serde(rename = "totalPages")]
        total_pages: usize,
        snapshots: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_board_round_trips_through_json() {
        let msg = ClientMessage::RegisterBoard {
            board_id: "b1".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"register-board\""));
        assert!(json.contains("\"boardId\":\"b1\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn decline_uses_hyphenated_action_uuid_field() {
        let msg = ServerMessage::Decline {
            uuid: "p1".into(),
            action_uuid: Some("a1".into()),
            reason: "unauthorized".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"action-uuid\":\"a1\""));
    }
}
