// SPDX-License-Identifier: Apache-2.0
//! Action variants appended to a page's history.

use crate::canonical::Value;
use serde::{Deserialize, Serialize};

/// Unique-within-page identifier for an action or the element it draws.
pub type ActionUuid = String;

/// A record appended to a page's history, or a board-level directive that
/// does not touch the current page's history (`NewPage`/`DeletePage`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    /// Identifier, unique within the page. Collisions are a protocol
    /// violation.
    pub uuid: ActionUuid,
    /// The variant-specific body.
    pub kind: ActionKind,
}

/// Payload carried by an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Adds an opaque drawable element and marks it visible.
    Draw {
        /// Opaque element payload; never interpreted by the engine.
        element: ElementBlob,
    },
    /// Hides a previously-visible element.
    Erase {
        /// Uuid of the element to hide.
        target_uuid: ActionUuid,
    },
    /// An ordered sequence of sub-actions applied atomically.
    Group {
        /// Sub-actions, applied (or reverted) in order under commit rules.
        actions: Vec<Action>,
    },
    /// Moves `present` one step backward.
    Undo {
        /// Uuid of the action expected immediately before the cursor.
        target_action_uuid: ActionUuid,
    },
    /// Moves `present` one step forward.
    Redo {
        /// Uuid of the action expected immediately after the cursor.
        target_action_uuid: ActionUuid,
    },
    /// Board-level: insert a new page. Does not touch page history.
    NewPage,
    /// Board-level: remove a page. Does not touch page history.
    DeletePage {
        /// Identifier of the page to remove.
        page_id: String,
    },
}

/// Opaque element payload. The engine never inspects this — only the
/// drawing-primitive collaborators (outside this crate's scope) do.
pub type ElementBlob = Value;

impl Action {
    /// Convert to the canonical [`Value`] form used for hashing.
    pub fn to_canonical(&self) -> Value {
        Value::Object(vec![
            ("uuid".into(), Value::Text(self.uuid.clone())),
            ("kind".into(), self.kind.to_canonical()),
        ])
    }
}

impl ActionKind {
    fn to_canonical(&self) -> Value {
        match self {
            ActionKind::Draw { element } => Value::Object(vec![
                ("type".into(), Value::Text("draw".into())),
                ("element".into(), element.clone()),
            ]),
            ActionKind::Erase { target_uuid } => Value::Object(vec![
                ("type".into(), Value::Text("erase".into())),
                ("target_uuid".into(), Value::Text(target_uuid.clone())),
            ]),
            ActionKind::Group { actions } => Value::Object(vec![
                ("type".into(), Value::Text("group".into())),
                (
                    "actions".into(),
                    Value::Array(actions.iter().map(Action::to_canonical).collect()),
                ),
            ]),
            ActionKind::Undo { target_action_uuid } => Value::Object(vec![
                ("type".into(), Value::Text("undo".into())),
                (
                    "target_action_uuid".into(),
                    Value::Text(target_action_uuid.clone()),
                ),
            ]),
            ActionKind::Redo { target_action_uuid } => Value::Object(vec![
                ("type".into(), Value::Text("redo".into())),
                (
                    "target_action_uuid".into(),
                    Value::Text(target_action_uuid.clone()),
                ),
            ]),
            ActionKind::NewPage => {
                Value::Object(vec![("type".into(), Value::Text("new_page".into()))])
            }
            ActionKind::DeletePage { page_id } => Value::Object(vec![
                ("type".into(), Value::Text("delete_page".into())),
                ("page_id".into(), Value::Text(page_id.clone())),
            ]),
        }
    }
}

/// Reasons surfaced to the protocol layer when a proposal cannot be applied
/// Always one of these fixed strings — never dynamically
/// formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclineReason {
    /// Commit against current visual state failed.
    CannotApply,
    /// Undo requested when not targeting the immediate past.
    UndoNotImmediate,
    /// Redo requested when not targeting the immediate future.
    RedoNotImmediate,
    /// Message named an action type the engine does not understand.
    UnknownActionType,
    /// Attempted to delete the last remaining page of a board.
    CannotDeleteLastPage,
    /// Proposal's board password did not match.
    Unauthorized,
}

impl DeclineReason {
    /// Human-readable reason string, always one of a fixed set.
    pub fn as_str(self) -> &'static str {
        match self {
            DeclineReason::CannotApply => "cannot apply action to current visual state",
            DeclineReason::UndoNotImmediate => "can only undo the immediate past",
            DeclineReason::RedoNotImmediate => "can only redo the immediate future",
            DeclineReason::UnknownActionType => "unknown action type",
            DeclineReason::CannotDeleteLastPage => "cannot delete last page of a board",
            DeclineReason::Unauthorized => "unauthorized",
        }
    }
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
