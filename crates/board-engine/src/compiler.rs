// SPDX-License-Identifier: Apache-2.0
//! Pure commit/revert functions over `(elements, visible)`.
//!
//! Each op validates against the current state, mutates, and bails with a
//! typed [`DeclineReason`] on the first invalid sub-action rather than
//! partially applying a group.

use board_proto::{Action, ActionKind, ActionUuid, DeclineReason, ElementBlob};
use std::collections::{BTreeMap, BTreeSet};

/// The compiled visual state of a page: every committed element and the
/// subset currently shown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualState {
    /// All elements ever drawn, keyed by the action uuid that drew them.
    pub elements: BTreeMap<ActionUuid, ElementBlob>,
    /// The subset of `elements` currently visible.
    pub visible: BTreeSet<ActionUuid>,
}

impl VisualState {
    /// An empty state: no elements, nothing visible.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Commit `action` onto `state`, mutating it in place. On failure `state` is
/// left exactly as a successful [`VisualState::clone`] would have found it
/// before the call (group actions restore their snapshot on partial
/// failure; single-action failures never mutate at all).
pub fn commit(state: &mut VisualState, action: &Action) -> Result<(), DeclineReason> {
    match &action.kind {
        ActionKind::Draw { element } => commit_draw(state, &action.uuid, element),
        ActionKind::Erase { target_uuid } => commit_erase(state, target_uuid),
        ActionKind::Group { actions } => commit_group(state, actions),
        ActionKind::Undo { .. }
        | ActionKind::Redo { .. }
        | ActionKind::NewPage
        | ActionKind::DeletePage { .. } => Err(DeclineReason::UnknownActionType),
    }
}

/// Revert `action` from `state` (the inverse of [`commit`]), used for undo
/// and for recomputing state after a truncation.
pub fn revert(state: &mut VisualState, action: &Action) -> Result<(), DeclineReason> {
    match &action.kind {
        ActionKind::Draw { .. } => revert_draw(state, &action.uuid),
        ActionKind::Erase { target_uuid } => revert_erase(state, target_uuid),
        ActionKind::Group { actions } => revert_group(state, actions),
        ActionKind::Undo { .. }
        | ActionKind::Redo { .. }
        | ActionKind::NewPage
        | ActionKind::DeletePage { .. } => Err(DeclineReason::UnknownActionType),
    }
}

fn commit_draw(
    state: &mut VisualState,
    uuid: &ActionUuid,
    element: &ElementBlob,
) -> Result<(), DeclineReason> {
    state
        .elements
        .entry(uuid.clone())
        .or_insert_with(|| element.clone());
    state.visible.insert(uuid.clone());
    Ok(())
}

fn commit_erase(state: &mut VisualState, target: &ActionUuid) -> Result<(), DeclineReason> {
    if !state.visible.remove(target) {
        return Err(DeclineReason::CannotApply);
    }
    Ok(())
}

fn commit_group(state: &mut VisualState, actions: &[Action]) -> Result<(), DeclineReason> {
    let snapshot = state.clone();
    for sub in actions {
        if let Err(err) = commit(state, sub) {
            *state = snapshot;
            return Err(err);
        }
    }
    Ok(())
}

fn revert_draw(state: &mut VisualState, uuid: &ActionUuid) -> Result<(), DeclineReason> {
    if !state.visible.remove(uuid) {
        return Err(DeclineReason::CannotApply);
    }
    Ok(())
}

fn revert_erase(state: &mut VisualState, target: &ActionUuid) -> Result<(), DeclineReason> {
    state.visible.insert(target.clone());
    Ok(())
}

fn revert_group(state: &mut VisualState, actions: &[Action]) -> Result<(), DeclineReason> {
    let snapshot = state.clone();
    for sub in actions.iter().rev() {
        if let Err(err) = revert(state, sub) {
            *state = snapshot;
            return Err(err);
        }
    }
    Ok(())
}

/// Compile a sequence of actions from an empty state, for sanity checks and
/// catch-up replay.
pub fn compile(actions: &[Action]) -> Result<VisualState, DeclineReason> {
    let mut state = VisualState::new();
    for action in actions {
        commit(&mut state, action)?;
    }
    Ok(state)
}
