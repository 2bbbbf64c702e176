// SPDX-License-Identifier: Apache-2.0
//! Per-page action-log engine: the visual-state compiler, the undo/redo
//! cursor, the hash chain, and the PING snapshot-index generator.

pub mod compiler;
pub mod page;
pub mod snapshot;

pub use compiler::VisualState;
pub use page::Page;
pub use snapshot::snapshot_indices;
