// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed entity storage for boards and pages, generalized from
//! `echo-config-fs::FsConfigStore` (platform config dir, one file per key)
//! to an explicit data directory with a per-entity-kind extension.

use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Raw byte storage keyed by entity id, rooted at a fixed directory.
pub struct FsEntityStore {
    base: PathBuf,
    extension: &'static str,
}

impl FsEntityStore {
    /// Root a store at `base/<id>.<extension>`, creating `base` if absent.
    pub fn new(base: impl Into<PathBuf>, extension: &'static str) -> Result<Self, StoreError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base, extension })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.base.join(format!("{id}.{}", self.extension))
    }

    fn load_raw(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save_raw(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    /// Load and deserialize the entity named `id`.
    pub fn load<T: DeserializeOwned>(&self, id: &str) -> Result<T, StoreError> {
        let bytes = self.load_raw(id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Serialize and persist the entity named `id`.
    pub fn save<T: Serialize>(&self, id: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.save_raw(id, &bytes)
    }

    /// Root directory this store writes under.
    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Dummy {
        value: u32,
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEntityStore::new(dir.path(), "page").unwrap();
        store.save("p1", &Dummy { value: 42 }).unwrap();
        let back: Dummy = store.load("p1").unwrap();
        assert_eq!(back, Dummy { value: 42 });
    }

    #[test]
    fn missing_entity_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEntityStore::new(dir.path(), "page").unwrap();
        let err = store.load::<Dummy>("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
