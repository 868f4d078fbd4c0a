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

use std::sync::Arc;

use ethers::types::{Address, H256};
use warden_relayer_types::ChainRole;
use warden_relayer_utils::clickable_link::tx_link;

use crate::{ChainClient, TxSigner};

/// Everything needed to read from and write to one side of the bridge.
///
/// Built once at startup and shared read-only between the watchers.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    /// The role this chain plays.
    pub role: ChainRole,
    /// The chain id, used when signing.
    pub chain_id: u64,
    /// RPC access.
    pub client: Arc<dyn ChainClient>,
    /// The bridge contract on this chain.
    pub contract: Address,
    /// Block explorer used for clickable transaction links.
    pub explorer: Option<url::Url>,
    /// How many blocks behind the head are considered settled.
    pub confirmations: u64,
    /// The warden signer, shared by both chains.
    pub signer: Arc<dyn TxSigner>,
    /// Held from gas estimation until broadcast, so two submitters on the
    /// same chain never read the same nonce.
    pub submit_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ChainHandle {
    /// Creates a handle with a fresh submission lock.
    pub fn new(
        role: ChainRole,
        chain_id: u64,
        client: Arc<dyn ChainClient>,
        contract: Address,
        signer: Arc<dyn TxSigner>,
    ) -> Self {
        Self {
            role,
            chain_id,
            client,
            contract,
            explorer: None,
            confirmations: 0,
            signer,
            submit_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Sets the block explorer.
    pub fn with_explorer(mut self, explorer: Option<url::Url>) -> Self {
        self.explorer = explorer;
        self
    }

    /// Sets the confirmation lag.
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// The chain's name, as its client reports it.
    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// `tx_hash` as an explorer hyperlink when an explorer is configured.
    pub fn tx_link(&self, tx_hash: H256) -> String {
        tx_link(self.explorer.as_ref(), tx_hash)
    }
}
