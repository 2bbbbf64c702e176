// SPDX-License-Identifier: Apache-2.0
//! Error type for board/page persistence.

use thiserror::Error;

/// Errors that can occur loading or saving board/page entities.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not present on disk.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
