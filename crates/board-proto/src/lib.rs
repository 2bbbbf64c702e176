// SPDX-License-Identifier: Apache-2.0
//! Wire schema, canonical encoding, and the hash-chain primitive for the
//! whiteboard session protocol.

pub mod action;
pub mod canonical;
pub mod hash;
pub mod message;

pub use action::{Action, ActionKind, ActionUuid, DeclineReason, ElementBlob};
pub use canonical::Value;
pub use hash::Digest;
pub use message::{ClientMessage, ServerMessage};

/// Step bound for deletion-redirect graph walks.
pub const REDIRECT_STEP_BOUND: usize = 100_000;
