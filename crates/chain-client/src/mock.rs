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

//! In-process chain and signer used to drive the relayer in tests.

use std::collections::HashSet;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, Log, TransactionReceipt, H256, U256, U64,
};
use parking_lot::Mutex;
use warden_relayer_utils::{Error, Result};

use crate::{ChainClient, LogQuery, TxSigner};

#[derive(Debug, Default)]
struct MockState {
    chain_id: u64,
    height: u64,
    logs: Vec<Log>,
    range_limit: Option<u64>,
    rejected_blocks: HashSet<u64>,
    log_queries: Vec<LogQuery>,
    height_calls: usize,
    failing_estimates: Vec<Bytes>,
    estimates: usize,
    sent: Vec<Bytes>,
    reverted: HashSet<H256>,
    receipt_status: u64,
    withhold_receipts: bool,
    failing_receipt_polls: usize,
    nonce: u64,
    offline: bool,
}

/// A scripted [`ChainClient`].
///
/// Logs are served from memory, every broadcast is recorded and confirmed
/// at the current height unless told otherwise.
#[derive(Debug)]
pub struct MockChainClient {
    name: String,
    state: Mutex<MockState>,
}

impl MockChainClient {
    /// An empty chain at height zero.
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState {
                chain_id,
                receipt_status: 1,
                ..Default::default()
            }),
        }
    }

    /// Moves the head of the chain.
    pub fn set_height(&self, height: u64) {
        self.state.lock().height = height;
    }

    /// Adds a log the chain will serve.
    pub fn push_log(&self, log: Log) {
        self.state.lock().logs.push(log);
    }

    /// Queries spanning more than `limit` blocks fail with [`Error::RangeTooLarge`].
    pub fn set_range_limit(&self, limit: Option<u64>) {
        self.state.lock().range_limit = limit;
    }

    /// Every query touching `block` fails with [`Error::RangeTooLarge`].
    pub fn reject_block(&self, block: u64) {
        self.state.lock().rejected_blocks.insert(block);
    }

    /// Gas estimation of a transaction with this calldata fails.
    pub fn fail_estimate_for(&self, calldata: Bytes) {
        self.state.lock().failing_estimates.push(calldata);
    }

    /// Receipts report this status (1 success, 0 revert).
    pub fn set_receipt_status(&self, status: u64) {
        self.state.lock().receipt_status = status;
    }

    /// Receipts never show up.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.state.lock().withhold_receipts = withhold;
    }

    /// The next `n` receipt polls fail with a connectivity error.
    pub fn fail_next_receipt_polls(&self, n: usize) {
        self.state.lock().failing_receipt_polls = n;
    }

    /// Every call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Every log query made so far.
    pub fn log_queries(&self) -> Vec<LogQuery> {
        self.state.lock().log_queries.clone()
    }

    /// How often the height was read.
    pub fn height_calls(&self) -> usize {
        self.state.lock().height_calls
    }

    /// How many gas estimations were asked for.
    pub fn estimates(&self) -> usize {
        self.state.lock().estimates
    }

    /// Every signed payload broadcast so far, in order.
    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().sent.clone()
    }

    fn check_online(&self, method: &'static str) -> Result<()> {
        if self.state.lock().offline {
            return Err(Error::Connectivity {
                chain: self.name.clone(),
                method,
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chain_id(&self) -> Result<u64> {
        self.check_online("eth_chainId")?;
        Ok(self.state.lock().chain_id)
    }

    async fn current_height(&self) -> Result<u64> {
        self.check_online("eth_blockNumber")?;
        let mut state = self.state.lock();
        state.height_calls += 1;
        Ok(state.height)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.check_online("eth_getLogs")?;
        let mut state = self.state.lock();
        state.log_queries.push(query.clone());
        let span = query.to_block.saturating_sub(query.from_block) + 1;
        let too_wide = state.range_limit.map_or(false, |limit| span > limit);
        let rejected = state
            .rejected_blocks
            .iter()
            .any(|b| (query.from_block..=query.to_block).contains(b));
        if too_wide || rejected {
            return Err(Error::RangeTooLarge {
                from: query.from_block,
                to: query.to_block,
                reason: "query returned more than 10000 results".into(),
            });
        }
        let mut logs: Vec<Log> = state
            .logs
            .iter()
            .filter(|log| query.matches(log))
            .cloned()
            .collect();
        logs.sort_by_key(|log| {
            (log.block_number.unwrap_or_default(), log.log_index.unwrap_or_default())
        });
        Ok(logs)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.check_online("eth_estimateGas")?;
        let mut state = self.state.lock();
        state.estimates += 1;
        let data = tx.data().cloned().unwrap_or_default();
        if state.failing_estimates.contains(&data) {
            return Err(Error::CallRejected {
                chain: self.name.clone(),
                method: "eth_estimateGas",
                reason: "execution reverted".into(),
            });
        }
        Ok(U256::from(50_000u64))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.check_online("eth_gasPrice")?;
        Ok(U256::from(1_000_000_000u64))
    }

    async fn transaction_count(&self, _address: Address) -> Result<U256> {
        self.check_online("eth_getTransactionCount")?;
        Ok(U256::from(self.state.lock().nonce))
    }

    async fn send_raw(&self, signed: Bytes) -> Result<H256> {
        self.check_online("eth_sendRawTransaction")?;
        let mut state = self.state.lock();
        state.sent.push(signed.clone());
        state.nonce += 1;
        let hash = H256::from(ethers::utils::keccak256(
            [signed.as_ref(), &state.nonce.to_be_bytes()].concat(),
        ));
        if state.receipt_status == 0 {
            state.reverted.insert(hash);
        }
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>> {
        let mut state = self.state.lock();
        if state.failing_receipt_polls > 0 {
            state.failing_receipt_polls -= 1;
            return Err(Error::Connectivity {
                chain: self.name.clone(),
                method: "eth_getTransactionReceipt",
                reason: "503 Service Unavailable".into(),
            });
        }
        if state.withhold_receipts {
            return Ok(None);
        }
        let status = if state.reverted.contains(&tx_hash) { 0 } else { 1 };
        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(state.height)),
            status: Some(U64::from(status)),
            ..Default::default()
        }))
    }
}

/// A [`TxSigner`] whose "signed" bytes are the transaction calldata, so
/// tests can decode what was broadcast.
#[derive(Debug, Clone)]
pub struct MockSigner {
    address: Address,
}

impl MockSigner {
    /// A signer for `address`.
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new(Address::repeat_byte(0x57))
    }
}

#[async_trait::async_trait]
impl TxSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, tx: &TypedTransaction) -> Result<Bytes> {
        if tx.from() != Some(&self.address) {
            return Err(Error::Generic("transaction is not from the signer"));
        }
        Ok(tx.data().cloned().unwrap_or_default())
    }
}
