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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Middleware, MiddlewareError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockNumber, Bytes, Filter, Log, TransactionReceipt, H256, U256,
};
use regex::Regex;
use std::sync::OnceLock;
use warden_relayer_utils::{Error, Result};

use crate::{ChainClient, LogQuery};

/// Whether a JSON-RPC error message means the provider refused to serve
/// logs for a range that wide (or with that many results).
pub fn is_range_too_large(message: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)(block range|range too (large|wide|big)|exceed(s|ed)? (the )?max(imum)?( block)? range|more than \d+ results|response size (exceeded|is larger)|limited to a [\d,]+ (block )?range|ranges over [\d,]+ blocks|too many (blocks|results|logs))",
            )
            .ok()
        })
        .as_ref()
        .map(|re| re.is_match(message))
        .unwrap_or(false)
}

/// Whether a JSON-RPC error response is the node being overloaded or behind
/// rather than an answer about the call itself.
fn is_transient_response(code: i64, message: &str) -> bool {
    let message = message.to_lowercase();
    code == 429
        || message.contains("rate limit")
        || message.contains("too many requests")
        || message.contains("header not found")
        || message.contains("daily request count")
}

/// A [`ChainClient`] backed by any ethers [`Middleware`], usually a
/// `Provider<RetryClient<MultiProvider<Http>>>`.
#[derive(Debug, Clone)]
pub struct EthersChainClient<M> {
    name: String,
    provider: Arc<M>,
    rpc_timeout: Duration,
}

impl<M: Middleware + 'static> EthersChainClient<M> {
    /// Wraps `provider`; every call gives up after `rpc_timeout`.
    pub fn new(
        name: impl Into<String>,
        provider: Arc<M>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            rpc_timeout,
        }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &Arc<M> {
        &self.provider
    }

    fn connectivity(&self, method: &'static str, reason: String) -> Error {
        Error::Connectivity {
            chain: self.name.clone(),
            method,
            reason,
        }
    }

    async fn call<T, F>(&self, method: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, M::Error>> + Send,
    {
        match tokio::time::timeout(self.rpc_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.connectivity(method, e.to_string())),
            Err(_) => Err(self.connectivity(
                method,
                format!("timed out after {:?}", self.rpc_timeout),
            )),
        }
    }
}

#[async_trait::async_trait]
impl<M: Middleware + 'static> ChainClient for EthersChainClient<M> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chain_id(&self) -> Result<u64> {
        let id = self.call("eth_chainId", self.provider.get_chainid()).await?;
        Ok(id.low_u64())
    }

    async fn current_height(&self) -> Result<u64> {
        let height = self
            .call("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(height.as_u64())
    }

    #[tracing::instrument(skip(self), fields(chain = %self.name))]
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let mut filter = Filter::new()
            .address(query.address)
            .topic0(query.event_signature)
            .from_block(query.from_block)
            .to_block(query.to_block);
        let [t1, t2, t3] = query.indexed_filters;
        if let Some(t) = t1 {
            filter = filter.topic1(t);
        }
        if let Some(t) = t2 {
            filter = filter.topic2(t);
        }
        if let Some(t) = t3 {
            filter = filter.topic3(t);
        }
        let result = tokio::time::timeout(
            self.rpc_timeout,
            self.provider.get_logs(&filter),
        )
        .await;
        let mut logs = match result {
            Ok(Ok(logs)) => logs,
            Ok(Err(e)) => {
                let message = e
                    .as_error_response()
                    .map(|resp| resp.message.clone())
                    .unwrap_or_else(|| e.to_string());
                if is_range_too_large(&message) {
                    return Err(Error::RangeTooLarge {
                        from: query.from_block,
                        to: query.to_block,
                        reason: message,
                    });
                }
                return Err(self.connectivity("eth_getLogs", message));
            }
            Err(_) => {
                return Err(self.connectivity(
                    "eth_getLogs",
                    format!("timed out after {:?}", self.rpc_timeout),
                ))
            }
        };
        logs.sort_by_key(|log| {
            (log.block_number.unwrap_or_default(), log.log_index.unwrap_or_default())
        });
        Ok(logs)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        const METHOD: &str = "eth_estimateGas";
        let result = tokio::time::timeout(
            self.rpc_timeout,
            self.provider.estimate_gas(tx, None),
        )
        .await;
        match result {
            Ok(Ok(gas)) => Ok(gas),
            Ok(Err(e)) => match e.as_error_response() {
                Some(resp) if !is_transient_response(resp.code, &resp.message) => {
                    Err(Error::CallRejected {
                        chain: self.name.clone(),
                        method: METHOD,
                        reason: resp.message.clone(),
                    })
                }
                _ => Err(self.connectivity(METHOD, e.to_string())),
            },
            Err(_) => Err(self.connectivity(
                METHOD,
                format!("timed out after {:?}", self.rpc_timeout),
            )),
        }
    }

    async fn gas_price(&self) -> Result<U256> {
        self.call("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn transaction_count(&self, address: Address) -> Result<U256> {
        self.call(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(
                address,
                Some(BlockNumber::Pending.into()),
            ),
        )
        .await
    }

    async fn send_raw(&self, signed: Bytes) -> Result<H256> {
        let pending = self
            .call(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(signed),
            )
            .await?;
        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>> {
        self.call(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await
    }
}
