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

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use warden_relayer_types::ChainRole;

use super::WatermarkStore;

/// InMemoryStore is a store that keeps the watermarks in memory.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    last_scanned: Arc<RwLock<HashMap<ChainRole, u64>>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl WatermarkStore for InMemoryStore {
    #[tracing::instrument(skip(self))]
    fn get_last_scanned(
        &self,
        role: ChainRole,
    ) -> warden_relayer_utils::Result<Option<u64>> {
        Ok(self.last_scanned.read().get(&role).copied())
    }

    #[tracing::instrument(skip(self))]
    fn set_last_scanned(
        &self,
        role: ChainRole,
        block_number: u64,
    ) -> warden_relayer_utils::Result<()> {
        self.last_scanned.write().insert(role, block_number);
        Ok(())
    }
}
