// SPDX-License-Identifier: Apache-2.0
//! Per-board page ordering and the create-credential digest.

use board_proto::DeclineReason;
use serde::{Deserialize, Serialize};

/// A board's ordered page list and its edit-credential digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardRegistry {
    /// SHA3/BLAKE3-class digest of the board's edit password (never the
    /// password itself; see `board-server`'s credential check).
    pub password_digest: [u8; 32],
    /// Page ids in board order. Each id appears at most once (invariant 5).
    pub page_order: Vec<String>,
}

impl BoardRegistry {
    pub fn new(password_digest: [u8; 32], first_page_id: impl Into<String>) -> Self {
        Self {
            password_digest,
            page_order: vec![first_page_id.into()],
        }
    }

    pub fn total_pages(&self) -> usize {
        self.page_order.len()
    }

    pub fn page_number(&self, page_id: &str) -> Option<usize> {
        self.page_order.iter().position(|id| id == page_id)
    }

    /// Insert-page policy: a new page lands immediately after
    /// `after_page_id`, the current page of the requesting connection.
    pub fn insert_after(&mut self, after_page_id: &str, new_page_id: impl Into<String>) {
        let index = self
            .page_order
            .iter()
            .position(|id| id == after_page_id)
            .map(|i| i + 1)
            .unwrap_or(self.page_order.len());
        self.page_order.insert(index, new_page_id.into());
    }

    /// Delete-page policy: removes `page_id` from the order, returning the
    /// replacement page id for redirect purposes
    /// (`page_order[min(removed_index, |page_order| - 1)]` *after*
    /// removal). Fails the last page of a board is non-deletable.
    pub fn remove(&mut self, page_id: &str) -> Result<String, DeclineReason> {
        if self.page_order.len() <= 1 {
            return Err(DeclineReason::CannotDeleteLastPage);
        }
        let Some(index) = self.page_order.iter().position(|id| id == page_id) else {
            return Err(DeclineReason::CannotApply);
        };
        self.page_order.remove(index);
        let replacement_index = index.min(self.page_order.len() - 1);
        Ok(self.page_order[replacement_index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_after_lands_immediately_after_current_page() {
        let mut reg = BoardRegistry::new([0; 32], "p1");
        reg.insert_after("p1", "p2");
        assert_eq!(reg.page_order, vec!["p1", "p2"]);
        reg.insert_after("p1", "p1b");
        assert_eq!(reg.page_order, vec!["p1", "p1b", "p2"]);
    }

    #[test]
    fn remove_middle_page_redirects_to_successor() {
        let mut reg = BoardRegistry::new([0; 32], "x");
        reg.insert_after("x", "y");
        reg.insert_after("y", "z");
        let replacement = reg.remove("y").unwrap();
        assert_eq!(replacement, "z");
        assert_eq!(reg.page_order, vec!["x", "z"]);
    }

    #[test]
    fn remove_last_page_in_order_redirects_to_new_tail() {
        let mut reg = BoardRegistry::new([0; 32], "x");
        reg.insert_after("x", "y");
        reg.insert_after("y", "z");
        let replacement = reg.remove("z").unwrap();
        assert_eq!(replacement, "y");
    }

    #[test]
    fn cannot_delete_last_remaining_page() {
        let mut reg = BoardRegistry::new([0; 32], "only");
        assert_eq!(reg.remove("only"), Err(DeclineReason::CannotDeleteLastPage));
    }
}
