// SPDX-License-Identifier: Apache-2.0
//! Ties the entity stores, the two-tier write-back cache, the
//! create-credential digest list, and the deletion map into one service
//! owned by `board-server`.

use crate::cache::{CacheGuard, WriteBackCache};
use crate::deletion::DeletionMap;
use crate::entity::FsEntityStore;
use crate::error::StoreError;
use crate::registry::BoardRegistry;
use board_engine::Page;
use board_proto::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

const PASSWD_FILE: &str = "passwd.json";
const DELETION_MAP_FILE: &str = "to_be_removed.json";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedPage {
    history: Vec<Action>,
    present: usize,
    state: PersistedVisible,
    hashes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedVisible {
    visible: Vec<String>,
}

/// Owns on-disk board/page entities, their caches, and the two small
/// board-wide registries (create-credential digests, deletion map).
pub struct PersistenceService {
    data_dir: PathBuf,
    page_store: FsEntityStore,
    board_store: FsEntityStore,
    page_cache: WriteBackCache<String, Page>,
    board_cache: WriteBackCache<String, BoardRegistry>,
    create_credentials: HashSet<String>,
    deletion_map: DeletionMap,
}

impl PersistenceService {
    /// Open (creating if absent) a persistence service rooted at `data_dir`.
    pub fn open(
        data_dir: impl Into<PathBuf>,
        page_cache_capacity: usize,
        board_cache_capacity: usize,
    ) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let page_store = FsEntityStore::new(&data_dir, "page")?;
        let board_store = FsEntityStore::new(&data_dir, "board")?;
        let create_credentials = load_create_credentials(&data_dir)?;
        let deletion_map = load_deletion_map(&data_dir)?;
        Ok(Self {
            data_dir,
            page_store,
            board_store,
            page_cache: WriteBackCache::new(page_cache_capacity),
            board_cache: WriteBackCache::new(board_cache_capacity),
            create_credentials,
            deletion_map,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn deletion_map(&self) -> &DeletionMap {
        &self.deletion_map
    }

    pub fn deletion_map_mut(&mut self) -> &mut DeletionMap {
        &mut self.deletion_map
    }

    pub fn is_create_credential_valid(&self, digest_hex: &str) -> bool {
        self.create_credentials.contains(digest_hex)
    }

    /// Load-or-create `page_id`, pinning it in the cache. Load failure (I/O
    /// or corruption) degrades to a fresh empty page with a `warn!` rather
    /// than failing the caller.
    pub fn load_page(&mut self, page_id: &str) -> CacheGuard<'_, String, Page> {
        if !self.page_cache.contains(&page_id.to_string()) {
            let page = match self.page_store.load::<PersistedPage>(page_id) {
                Ok(persisted) => restore_page(page_id, persisted),
                Err(StoreError::NotFound) => Page::new(page_id),
                Err(err) => {
                    warn!(page_id, error = %err, "page load failed, starting fresh");
                    Page::new(page_id)
                }
            };
            self.page_cache.insert(page_id.to_string(), page);
        }
        self.page_cache.pin(page_id.to_string())
    }

    /// Persist `page` immediately; logs and swallows I/O failures so a
    /// write-back miss never blocks the calling connection.
    pub fn save_page(&self, page: &Page) {
        let persisted = PersistedPage {
            history: page.history_snapshot().to_vec(),
            present: page.present(),
            state: PersistedVisible {
                visible: page.visible_state().visible.iter().cloned().collect(),
            },
            hashes: page
                .hashes_snapshot()
                .iter()
                .map(|h| h.to_hex())
                .collect(),
        };
        if let Err(err) = self.page_store.save(page.page_id(), &persisted) {
            warn!(page_id = page.page_id(), error = %err, "page save failed");
        }
    }

    pub fn load_board(&mut self, board_id: &str) -> Result<CacheGuard<'_, String, BoardRegistry>, StoreError> {
        if !self.board_cache.contains(&board_id.to_string()) {
            let board = self.board_store.load::<BoardRegistry>(board_id)?;
            self.board_cache.insert(board_id.to_string(), board);
        }
        Ok(self.board_cache.pin(board_id.to_string()))
    }

    pub fn create_board(&mut self, board_id: &str, registry: BoardRegistry) {
        self.board_cache.insert(board_id.to_string(), registry);
    }

    pub fn save_board(&self, board_id: &str, registry: &BoardRegistry) {
        if let Err(err) = self.board_store.save(board_id, registry) {
            warn!(board_id, error = %err, "board save failed");
        }
    }

    /// Flush every dirty page/board and evict anything over capacity,
    /// saving evicted entries first. Run periodically and once more at
    /// shutdown.
    pub fn flush_all(&mut self) {
        for page_id in self.page_cache.take_dirty() {
            if let Some(page) = self.page_cache.get(&page_id) {
                self.save_page(page);
            }
        }
        for board_id in self.board_cache.take_dirty() {
            if let Some(board) = self.board_cache.get(&board_id) {
                self.save_board(&board_id, board);
            }
        }
        for (_, page) in self.page_cache.evict_over_capacity() {
            self.save_page(&page);
        }
        for (board_id, board) in self.board_cache.evict_over_capacity() {
            self.save_board(&board_id, &board);
        }
        if let Err(err) = save_deletion_map(&self.data_dir, &self.deletion_map) {
            warn!(error = %err, "deletion map save failed");
        }
    }

    pub fn mark_board_dirty(&mut self, board_id: &str) {
        self.board_cache.mark_dirty(&board_id.to_string());
    }
}

fn restore_page(page_id: &str, persisted: PersistedPage) -> Page {
    let page = Page::from_history(page_id, persisted.history);
    if let Some(expected) = persisted.hashes.last() {
        if *expected != page.current_hash().to_hex() {
            warn!(page_id, "on-disk hash chain disagrees with replay, trusting replay");
        }
    }
    page
}

fn load_create_credentials(data_dir: &Path) -> Result<HashSet<String>, StoreError> {
    match std::fs::read(data_dir.join(PASSWD_FILE)) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(err) => {
            warn!(error = %err, "create-credential list unreadable, treating as empty");
            Ok(HashSet::new())
        }
    }
}

fn load_deletion_map(data_dir: &Path) -> Result<DeletionMap, StoreError> {
    match std::fs::read(data_dir.join(DELETION_MAP_FILE)) {
        Ok(bytes) => match board_proto::canonical::decode(&bytes) {
            Ok(value) => Ok(DeletionMap::from_canonical(&value)),
            Err(err) => {
                warn!(error = %err, "deletion map corrupt, starting empty");
                Ok(DeletionMap::new())
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DeletionMap::new()),
        Err(err) => {
            warn!(error = %err, "deletion map unreadable, starting empty");
            Ok(DeletionMap::new())
        }
    }
}

fn save_deletion_map(data_dir: &Path, map: &DeletionMap) -> Result<(), StoreError> {
    let bytes = board_proto::canonical::encode(&map.to_canonical());
    std::fs::write(data_dir.join(DELETION_MAP_FILE), bytes)?;
    Ok(())
}
