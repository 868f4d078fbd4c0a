// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;

use warden_relayer_types::ChainRole;

use super::{watermark_key, WatermarkStore};

const LAST_SCANNED_TREE: &str = "last_scanned";

/// SledStore is a store that keeps the watermarks in a [Sled](https://sled.rs)-based database.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    // Keeps the directory of a temporary store alive.
    _tmp: Option<std::sync::Arc<tempfile::TempDir>>,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    /// Create a new SledStore.
    pub fn open<P: AsRef<Path>>(
        path: P,
    ) -> warden_relayer_utils::Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db, _tmp: None })
    }

    /// Creates a temporary SledStore, removed when the last clone is dropped.
    pub fn temporary() -> warden_relayer_utils::Result<Self> {
        let dir = tempfile::tempdir()?;
        let db = sled::Config::new()
            .path(dir.path())
            .temporary(true)
            .open()?;
        Ok(Self {
            db,
            _tmp: Some(std::sync::Arc::new(dir)),
        })
    }
}

impl WatermarkStore for SledStore {
    #[tracing::instrument(skip(self))]
    fn get_last_scanned(
        &self,
        role: ChainRole,
    ) -> warden_relayer_utils::Result<Option<u64>> {
        let tree = self.db.open_tree(LAST_SCANNED_TREE)?;
        let val = tree.get(watermark_key(role))?;
        match val {
            Some(v) => {
                let bytes: [u8; 8] = v.as_ref().try_into().map_err(|_| {
                    warden_relayer_utils::Error::Generic(
                        "corrupted watermark entry",
                    )
                })?;
                Ok(Some(u64::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    fn set_last_scanned(
        &self,
        role: ChainRole,
        block_number: u64,
    ) -> warden_relayer_utils::Result<()> {
        let tree = self.db.open_tree(LAST_SCANNED_TREE)?;
        tree.insert(watermark_key(role), &block_number.to_be_bytes())?;
        tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_reads_back() {
        let store = SledStore::temporary().unwrap();
        assert_eq!(store.get_last_scanned(ChainRole::Source).unwrap(), None);
        store.set_last_scanned(ChainRole::Source, 1_000_000).unwrap();
        assert_eq!(
            store.get_last_scanned(ChainRole::Source).unwrap(),
            Some(1_000_000)
        );
        assert_eq!(
            store.get_last_scanned(ChainRole::Destination).unwrap(),
            None
        );
    }

    #[test]
    fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.set_last_scanned(ChainRole::Destination, 42).unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get_last_scanned(ChainRole::Destination).unwrap(),
            Some(42)
        );
    }
}
