// SPDX-License-Identifier: Apache-2.0
//! The per-page history cursor: append, undo, redo, and hash chain.

use crate::compiler::{self, VisualState};
use board_proto::{Action, ActionKind, ActionUuid, DeclineReason, Digest};

/// A single page's action log plus the cursor over it.
///
/// `present` is the number of actions currently applied — `history[0..present]`
/// is the live prefix; anything past it is redo-reachable until an edit
/// truncates it away.
#[derive(Debug, Clone)]
pub struct Page {
    page_id: String,
    history: Vec<Action>,
    present: usize,
    hashes: Vec<Digest>,
    visible_state: VisualState,
}

impl Page {
    /// A fresh, empty page seeded from its own id.
    pub fn new(page_id: impl Into<String>) -> Self {
        let page_id = page_id.into();
        let seed = board_proto::hash::hash_bytes(page_id.as_bytes());
        Self {
            page_id,
            history: Vec::new(),
            present: 0,
            hashes: vec![seed],
            visible_state: VisualState::new(),
        }
    }

    /// Reconstruct a page from a persisted history, replaying it from
    /// scratch. Used on load; see [`Page::consistency_check`] for why the
    /// hash chain is not trusted blindly.
    pub fn from_history(page_id: impl Into<String>, history: Vec<Action>) -> Self {
        let mut page = Self::new(page_id);
        for action in history {
            // Persisted history is always Draw/Erase/Group — undo/redo are
            // cursor moves, never appended.
            page.append_committed(action);
        }
        page
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn present(&self) -> usize {
        self.present
    }

    pub fn current_hash(&self) -> Digest {
        self.hashes[self.present]
    }

    pub fn visible_state(&self) -> &VisualState {
        &self.visible_state
    }

    /// The live prefix of the history, i.e. what a full-page snapshot sends.
    pub fn history_snapshot(&self) -> &[Action] {
        &self.history[..self.present]
    }

    /// `hashes[0..=present]`, i.e. the chain links covering the live
    /// prefix — what gets persisted alongside `history_snapshot` so a
    /// reload can verify the chain instead of trusting it blindly.
    pub fn hashes_snapshot(&self) -> &[Digest] {
        &self.hashes[..=self.present]
    }

    /// All hashes from `present` forward to the end of the recorded hash
    /// array (used to build PING's dense hash list from a snapshot index).
    pub fn slice_from(&self, index: usize) -> &[Digest] {
        &self.hashes[index.min(self.hashes.len())..]
    }

    /// Actions committed strictly after `index`, for REPLAY catch-up.
    pub fn edits_since(&self, index: usize) -> &[Action] {
        &self.history[index.min(self.present)..self.present]
    }

    fn append_committed(&mut self, action: Action) {
        // Truncate any redo-reachable tail before appending (invariant 3).
        self.history.truncate(self.present);
        self.hashes.truncate(self.present + 1);
        let next_hash = board_proto::hash::hash_next(self.current_hash(), &action.to_canonical());
        self.history.push(action);
        self.hashes.push(next_hash);
        self.present += 1;
    }

    /// Apply a Draw/Erase/Group proposal. On success the action is appended
    /// and the cursor advances; on failure nothing changes.
    pub fn apply_edit(&mut self, action: Action) -> Result<Digest, DeclineReason> {
        match &action.kind {
            ActionKind::Draw { .. } | ActionKind::Erase { .. } | ActionKind::Group { .. } => {}
            _ => return Err(DeclineReason::UnknownActionType),
        }
        compiler::commit(&mut self.visible_state, &action)?;
        self.append_committed(action);
        self.check_consistency();
        Ok(self.current_hash())
    }

    /// Undo the action immediately before the cursor. `target_action_uuid`
    /// must name that exact action — undo only ever targets the immediate
    /// past, never an arbitrary earlier action.
    pub fn apply_undo(&mut self, target_action_uuid: &ActionUuid) -> Result<Digest, DeclineReason> {
        if self.present == 0 {
            return Err(DeclineReason::UndoNotImmediate);
        }
        let target = &self.history[self.present - 1];
        if &target.uuid != target_action_uuid {
            return Err(DeclineReason::UndoNotImmediate);
        }
        compiler::revert(&mut self.visible_state, &target.clone())?;
        self.present -= 1;
        self.check_consistency();
        Ok(self.current_hash())
    }

    /// Redo the action immediately after the cursor.
    pub fn apply_redo(&mut self, target_action_uuid: &ActionUuid) -> Result<Digest, DeclineReason> {
        if self.present >= self.history.len() {
            return Err(DeclineReason::RedoNotImmediate);
        }
        let target = &self.history[self.present];
        if &target.uuid != target_action_uuid {
            return Err(DeclineReason::RedoNotImmediate);
        }
        compiler::commit(&mut self.visible_state, &target.clone())?;
        self.present += 1;
        self.check_consistency();
        Ok(self.current_hash())
    }

    /// Recompute `visible_state` from `history[0..present]` via
    /// [`compiler::compile`], replacing whatever incremental state was held.
    /// Called when [`Page::check_consistency`] finds drift in a release
    /// build instead of panicking.
    pub fn rebuild_from_compile(&mut self) -> Result<(), DeclineReason> {
        self.visible_state = compiler::compile(&self.history[..self.present])?;
        Ok(())
    }

    /// Run after every mutation: in debug builds, assert the incrementally
    /// maintained visible state matches a from-scratch recompile; in release
    /// builds, log and repair via [`Page::rebuild_from_compile`] instead of
    /// panicking.
    fn check_consistency(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.consistency_check();
        }
        #[cfg(not(debug_assertions))]
        {
            match compiler::compile(&self.history[..self.present]) {
                Ok(recompiled) if recompiled == self.visible_state => {}
                _ => {
                    tracing::warn!(page_id = %self.page_id, "incremental visible state drifted from a full recompile, rebuilding");
                    let _ = self.rebuild_from_compile();
                }
            }
        }
    }

    /// Debug-only: assert the incrementally-maintained visible state matches
    /// a from-scratch recompile. See [`Page::check_consistency`] for the
    /// release-build fallback.
    #[cfg(debug_assertions)]
    pub fn consistency_check(&self) {
        let recompiled =
            compiler::compile(&self.history[..self.present]).expect("persisted history must compile");
        assert_eq!(
            recompiled, self.visible_state,
            "incremental visible state drifted from a full recompile"
        );
    }
}
