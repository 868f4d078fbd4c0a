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

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use warden_relayer_types::private_key::PrivateKey;
use warden_relayer_utils::Result;

/// The signing capability handed to the submitter.
#[async_trait::async_trait]
pub trait TxSigner: std::fmt::Debug + Send + Sync {
    /// The account transactions are sent from.
    fn address(&self) -> Address;
    /// Signs `tx` and returns the raw bytes ready for `eth_sendRawTransaction`.
    async fn sign(&self, tx: &TypedTransaction) -> Result<Bytes>;
}

/// A [`TxSigner`] holding the warden key in memory.
#[derive(Debug, Clone)]
pub struct LocalWalletSigner {
    wallet: LocalWallet,
}

impl LocalWalletSigner {
    /// Builds the signer from the configured private key.
    pub fn new(private_key: &PrivateKey) -> Result<Self> {
        let wallet = LocalWallet::from_bytes(private_key.as_bytes())?;
        Ok(Self { wallet })
    }
}

#[async_trait::async_trait]
impl TxSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign(&self, tx: &TypedTransaction) -> Result<Bytes> {
        let signature = self.wallet.sign_transaction(tx).await?;
        Ok(tx.rlp_signed(&signature))
    }
}
