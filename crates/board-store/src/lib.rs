// SPDX-License-Identifier: Apache-2.0
//! Board/page persistence: the two-tier write-back cache, the deletion
//! redirect graph, and the on-disk entity layout.

pub mod cache;
pub mod deletion;
pub mod entity;
pub mod error;
pub mod persistence;
pub mod registry;

pub use cache::{CacheGuard, WriteBackCache};
pub use deletion::{DeletionMap, ResolutionMiss};
pub use entity::FsEntityStore;
pub use error::StoreError;
pub use persistence::PersistenceService;
pub use registry::BoardRegistry;
