// SPDX-License-Identifier: Apache-2.0
//! The page-deletion redirect graph.

use crate::registry::BoardRegistry;
use board_proto::{Value, REDIRECT_STEP_BOUND};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Forward map from a removed page id to its replacement. A chain of
/// deletes can require several hops before landing on a live page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeletionMap {
    redirects: HashMap<String, String>,
}

/// Why a redirect walk could not produce a usable page id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMiss {
    /// The walk revisited a page id already seen in this traversal.
    Cycle,
    /// The walk exceeded [`REDIRECT_STEP_BOUND`] hops without terminating.
    StepBoundExceeded,
}

impl DeletionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `removed` now redirects to `replacement`.
    pub fn record(&mut self, removed: impl Into<String>, replacement: impl Into<String>) {
        self.redirects.insert(removed.into(), replacement.into());
    }

    /// Resolve `page_id` against `board`: if it is still live, return it
    /// unchanged; otherwise follow the redirect chain to a live page,
    /// falling back to `board.page_order[0]` when the chain's final link is
    /// not itself live (a degenerate case, e.g. a stale redirect surviving
    /// a board reload) or when [`ResolutionMiss`] is encountered.
    pub fn resolve(&self, page_id: &str, board: &BoardRegistry) -> String {
        if board.page_order.iter().any(|id| id == page_id) {
            return page_id.to_string();
        }
        match self.walk(page_id) {
            Ok(resolved) if board.page_order.iter().any(|id| id == &resolved) => resolved,
            _ => board.page_order[0].clone(),
        }
    }

    /// Canonical form for the `to_be_removed.json` persisted layout: a
    /// `Map` from removed page id to replacement page id.
    pub fn to_canonical(&self) -> Value {
        let mut entries: Vec<_> = self.redirects.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
                .collect(),
        )
    }

    /// Inverse of [`DeletionMap::to_canonical`]. Non-matching shapes decode
    /// as an empty map rather than erroring — a corrupt redirect file
    /// should never block the server from starting.
    pub fn from_canonical(value: &Value) -> Self {
        let mut redirects = HashMap::new();
        if let Value::Map(entries) = value {
            for (k, v) in entries {
                if let (Value::Text(k), Value::Text(v)) = (k, v) {
                    redirects.insert(k.clone(), v.clone());
                }
            }
        }
        Self { redirects }
    }

    fn walk(&self, start: &str) -> Result<String, ResolutionMiss> {
        let mut visited = HashSet::new();
        visited.insert(start.to_string());
        let mut current = start.to_string();
        for _ in 0..REDIRECT_STEP_BOUND {
            let Some(next) = self.redirects.get(&current) else {
                return Ok(current);
            };
            if !visited.insert(next.clone()) {
                return Err(ResolutionMiss::Cycle);
            }
            current = next.clone();
        }
        Err(ResolutionMiss::StepBoundExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(pages: &[&str]) -> BoardRegistry {
        let mut reg = BoardRegistry::new([0; 32], pages[0]);
        for page in &pages[1..] {
            let last = reg.page_order.last().unwrap().clone();
            reg.insert_after(&last, *page);
        }
        reg
    }

    #[test]
    fn live_page_resolves_to_itself() {
        let map = DeletionMap::new();
        let b = board(&["x", "y", "z"]);
        assert_eq!(map.resolve("y", &b), "y");
    }

    #[test]
    fn single_hop_redirect_resolves_to_replacement() {
        let mut map = DeletionMap::new();
        map.record("y", "z");
        let b = board(&["x", "z"]);
        assert_eq!(map.resolve("y", &b), "z");
    }

    #[test]
    fn multi_hop_chain_resolves_to_final_live_page() {
        let mut map = DeletionMap::new();
        map.record("y", "z");
        map.record("z", "x");
        let b = board(&["x"]);
        assert_eq!(map.resolve("y", &b), "x");
    }

    #[test]
    fn cycle_falls_back_to_first_page() {
        let mut map = DeletionMap::new();
        map.record("a", "b");
        map.record("b", "a");
        let b = board(&["x"]);
        assert_eq!(map.resolve("a", &b), "x");
    }

    #[test]
    fn canonical_round_trip_preserves_redirects() {
        let mut map = DeletionMap::new();
        map.record("y", "z");
        map.record("w", "x");
        let bytes = board_proto::canonical::encode(&map.to_canonical());
        let decoded = board_proto::canonical::decode(&bytes).unwrap();
        let restored = DeletionMap::from_canonical(&decoded);
        assert_eq!(restored, map);
    }

    #[test]
    fn dead_end_not_landing_on_live_page_falls_back_to_first_page() {
        let mut map = DeletionMap::new();
        map.record("y", "ghost");
        let b = board(&["x"]);
        assert_eq!(map.resolve("y", &b), "x");
    }
}
