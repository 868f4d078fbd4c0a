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

//! # Chain Client 🕸️
//!
//! Everything the relayer needs to talk to one side of the bridge: the
//! [`ChainClient`] RPC seam and its ethers implementation, the [`TxSigner`]
//! seam and the [`ChainHandle`] tying them to a bridge contract.

use std::fmt::Debug;
use std::time::Duration;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256};
use warden_relayer_utils::probe;
use warden_relayer_utils::{Error, Result};

mod ethers_client;
mod handle;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod signer;

pub use ethers_client::{is_range_too_large, EthersChainClient};
pub use handle::ChainHandle;
pub use signer::{LocalWalletSigner, TxSigner};

/// A log query against one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// The emitting contract.
    pub address: Address,
    /// `topic0`, the keccak hash of the event signature.
    pub event_signature: H256,
    /// Optional filters on `topic1..=topic3`.
    pub indexed_filters: [Option<H256>; 3],
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

impl LogQuery {
    /// A query for every `event_signature` log of `address` in `[from_block, to_block]`.
    pub fn new(
        address: Address,
        event_signature: H256,
        from_block: u64,
        to_block: u64,
    ) -> Self {
        Self {
            address,
            event_signature,
            indexed_filters: [None; 3],
            from_block,
            to_block,
        }
    }

    /// Whether `log` is selected by this query.
    pub fn matches(&self, log: &Log) -> bool {
        let in_range = log
            .block_number
            .map(|n| (self.from_block..=self.to_block).contains(&n.as_u64()))
            .unwrap_or(false);
        let topics_match = self
            .indexed_filters
            .iter()
            .enumerate()
            .all(|(i, filter)| match filter {
                Some(expected) => log.topics.get(i + 1) == Some(expected),
                None => true,
            });
        in_range
            && log.address == self.address
            && log.topics.first() == Some(&self.event_signature)
            && topics_match
    }
}

/// Read and write access to one chain.
///
/// Every call is bounded by a timeout; unreachable endpoints, timeouts and
/// malformed responses surface as [`Error::Connectivity`]. A node refusing
/// a gas estimate (a revert) is [`Error::CallRejected`].
#[async_trait::async_trait]
pub trait ChainClient: Debug + Send + Sync {
    /// A human readable name used in logs and errors.
    fn name(&self) -> &str;
    /// The chain id reported by the endpoint.
    async fn chain_id(&self) -> Result<u64>;
    /// The number of the latest block.
    async fn current_height(&self) -> Result<u64>;
    /// Logs selected by `query`, ordered by `(block_number, log_index)`.
    ///
    /// Fails with [`Error::RangeTooLarge`] when the provider refuses the range.
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>>;
    /// Gas estimate of `tx` against the latest state.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;
    /// The current legacy gas price.
    async fn gas_price(&self) -> Result<U256>;
    /// The pending nonce of `address`.
    async fn transaction_count(&self, address: Address) -> Result<U256>;
    /// Broadcasts a signed transaction and returns its hash.
    async fn send_raw(&self, signed: Bytes) -> Result<H256>;
    /// The receipt of `tx_hash`, if it is included.
    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>>;

    /// Polls the receipt of `tx_hash` every `poll_interval` until it shows up.
    ///
    /// Errors while polling are logged and polling goes on; once `timeout`
    /// elapses without a receipt this fails with [`Error::ConfirmationTimeout`].
    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TransactionReceipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        chain = %self.name(),
                        tx_hash = ?tx_hash,
                        "Error while polling for receipt: {}",
                        e
                    );
                }
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxSubmit,
                    chain = %self.name(),
                    tx_hash = ?tx_hash,
                    timed_out = true,
                );
                return Err(Error::ConfirmationTimeout {
                    tx_hash,
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChainClient;
    use ethers::types::U64;

    fn log_at(address: Address, topic0: H256, block: u64) -> Log {
        Log {
            address,
            topics: vec![topic0, H256::repeat_byte(1)],
            block_number: Some(U64::from(block)),
            ..Default::default()
        }
    }

    #[test]
    fn query_matches_on_address_topic_and_range() {
        let addr = Address::repeat_byte(0xaa);
        let sig = H256::repeat_byte(0x11);
        let mut query = LogQuery::new(addr, sig, 10, 20);
        assert!(query.matches(&log_at(addr, sig, 10)));
        assert!(query.matches(&log_at(addr, sig, 20)));
        assert!(!query.matches(&log_at(addr, sig, 21)));
        assert!(!query.matches(&log_at(Address::zero(), sig, 15)));
        assert!(!query.matches(&log_at(addr, H256::zero(), 15)));
        query.indexed_filters[0] = Some(H256::repeat_byte(2));
        assert!(!query.matches(&log_at(addr, sig, 15)));
        query.indexed_filters[0] = Some(H256::repeat_byte(1));
        assert!(query.matches(&log_at(addr, sig, 15)));
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn wait_for_receipt_times_out() {
        let client = MockChainClient::new("dst", 2);
        client.withhold_receipts(true);
        let hash = H256::repeat_byte(9);
        let err = client
            .wait_for_receipt(
                hash,
                Duration::from_secs(120),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConfirmationTimeout { tx_hash, timeout_secs: 120 } if tx_hash == hash
        ));
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn wait_for_receipt_survives_transient_errors() {
        let client = MockChainClient::new("dst", 2);
        client.set_height(5);
        client.fail_next_receipt_polls(2);
        let hash = client.send_raw(Bytes::from(vec![1, 2, 3])).await.unwrap();
        let receipt = client
            .wait_for_receipt(hash, Duration::from_secs(10), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(receipt.transaction_hash, hash);
        assert!(logs_contain("Error while polling for receipt"));
    }
}
