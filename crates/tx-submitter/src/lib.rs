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

#![warn(missing_docs)]
//! # Transaction Submitter 🕸️
//!
//! Turns a [`BridgeCall`] into a signed legacy transaction on the chain it
//! targets, broadcasts it and waits for its receipt.
//!
//! Nothing is retried here: every call ends in exactly one [`TxOutcome`]
//! and the caller decides what to do with it. The exception is a chain that
//! cannot be reached before anything was broadcast, which is handed back as
//! a retryable [`Error`] so the caller can try the same call again later.

use std::time::Duration;

use derive_more::Display;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionRequest, H256, U256};
use serde::Serialize;
use warden_chain_client::ChainHandle;
use warden_relayer_config::TxConfig;
use warden_relayer_utils::{probe, Error};

mod call;

pub use call::BridgeCall;

/// How a submission ended.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TxStatus {
    /// Included with status 1.
    #[display(fmt = "confirmed")]
    Confirmed,
    /// Included with status 0.
    #[display(fmt = "reverted")]
    Reverted,
    /// Broadcast but not seen included in time.
    #[display(fmt = "timed out")]
    TimedOut,
    /// Failed before broadcast, nothing was sent.
    #[display(fmt = "build failed")]
    BuildFailed,
}

/// The result of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    /// How it ended.
    pub status: TxStatus,
    /// The transaction hash, once broadcast.
    pub tx_hash: Option<H256>,
    /// The including block, once mined.
    pub block_number: Option<u64>,
    /// What went wrong, if anything.
    pub error: Option<String>,
}

impl TxOutcome {
    fn mined(status: TxStatus, tx_hash: H256, block_number: Option<u64>) -> Self {
        Self {
            status,
            tx_hash: Some(tx_hash),
            block_number,
            error: None,
        }
    }

    fn timed_out(tx_hash: H256, error: impl ToString) -> Self {
        Self {
            status: TxStatus::TimedOut,
            tx_hash: Some(tx_hash),
            block_number: None,
            error: Some(error.to_string()),
        }
    }

    /// Nothing was broadcast because of `error`.
    pub fn build_failed(error: impl ToString) -> Self {
        Self {
            status: TxStatus::BuildFailed,
            tx_hash: None,
            block_number: None,
            error: Some(error.to_string()),
        }
    }

    /// Whether the call took effect on chain.
    pub fn is_confirmed(&self) -> bool {
        self.status == TxStatus::Confirmed
    }
}

/// Tuning of the submitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxSubmitterConfig {
    /// Gas limit = estimate × this, must be greater than 1.
    pub gas_multiplier: f64,
    /// How long to wait for a receipt.
    pub receipt_timeout: Duration,
    /// How often to poll for it.
    pub poll_interval: Duration,
}

impl Default for TxSubmitterConfig {
    fn default() -> Self {
        TxConfig::default().into()
    }
}

impl From<TxConfig> for TxSubmitterConfig {
    fn from(config: TxConfig) -> Self {
        Self {
            gas_multiplier: config.gas_multiplier,
            receipt_timeout: config.receipt_timeout(),
            poll_interval: config.receipt_poll_interval(),
        }
    }
}

/// Scales a gas estimate by `multiplier`, rounding up, never below the
/// estimate itself.
pub fn apply_gas_multiplier(estimate: U256, multiplier: f64) -> U256 {
    // thousandths, so the multiplication stays in integers.
    let factor = (multiplier.max(1.0) * 1000.0).ceil() as u64;
    let scaled = estimate
        .saturating_mul(U256::from(factor))
        .saturating_add(U256::from(999u64))
        / U256::from(1000u64);
    scaled.max(estimate)
}

/// Submits bridge calls, one at a time per chain.
#[derive(Debug, Clone, Default)]
pub struct TxSubmitter {
    config: TxSubmitterConfig,
}

impl TxSubmitter {
    /// Creates a submitter.
    pub fn new(config: TxSubmitterConfig) -> Self {
        Self { config }
    }

    /// The submitter's configuration.
    pub fn config(&self) -> &TxSubmitterConfig {
        &self.config
    }

    /// Submits `call` on `handle`'s chain and waits for the outcome.
    ///
    /// Estimation, nonce lookup, signing and broadcast happen while holding
    /// the chain's submission lock; the receipt is awaited without it.
    ///
    /// Returns `Err` only when the chain could not be reached before the
    /// transaction was broadcast ([`Error::is_retryable`]); every other
    /// failure is an outcome.
    #[tracing::instrument(
        skip_all,
        fields(chain = %handle.name(), call = %call.function_name())
    )]
    pub async fn submit(
        &self,
        handle: &ChainHandle,
        call: BridgeCall,
    ) -> warden_relayer_utils::Result<TxOutcome> {
        if call.target_role() != handle.role {
            let reason = format!(
                "{} targets the {} chain, not {}",
                call.function_name(),
                call.target_role(),
                handle.role
            );
            tracing::error!("Refusing to submit {}: {}", call, reason);
            return Ok(TxOutcome::build_failed(reason));
        }

        let broadcast = {
            let _guard = handle.submit_lock.lock().await;
            self.build_and_broadcast(handle, &call).await
        };
        let tx_hash = match broadcast {
            Ok(tx_hash) => tx_hash,
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    "Could not reach {} to submit {}: {}",
                    handle.name(),
                    call,
                    e
                );
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxSubmit,
                    chain = %handle.name(),
                    call = %call.function_name(),
                    unreachable = true,
                    error = %e,
                );
                return Err(e);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to build {} on {}: {}",
                    call,
                    handle.name(),
                    e
                );
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxSubmit,
                    chain = %handle.name(),
                    call = %call.function_name(),
                    errored = true,
                    error = %e,
                );
                return Ok(TxOutcome::build_failed(e));
            }
        };
        let link = handle.tx_link(tx_hash);
        tracing::info!("Tx {} ({}) is submitted and pending!", link, call);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxSubmit,
            chain = %handle.name(),
            call = %call.function_name(),
            pending = true,
            tx_hash = ?tx_hash,
        );

        let receipt = handle
            .client
            .wait_for_receipt(
                tx_hash,
                self.config.receipt_timeout,
                self.config.poll_interval,
            )
            .await;
        let outcome = match receipt {
            Ok(receipt) => {
                let block_number = receipt.block_number.map(|n| n.as_u64());
                match receipt.status {
                    Some(status) if status.is_zero() => {
                        tracing::warn!("Tx {} ({}) Reverted", link, call);
                        TxOutcome::mined(TxStatus::Reverted, tx_hash, block_number)
                    }
                    _ => {
                        tracing::info!("Tx {} ({}) Finalized", link, call);
                        TxOutcome::mined(TxStatus::Confirmed, tx_hash, block_number)
                    }
                }
            }
            Err(e @ Error::ConfirmationTimeout { .. }) => {
                tracing::warn!("Tx {} ({}) not confirmed: {}", link, call, e);
                TxOutcome::timed_out(tx_hash, e)
            }
            Err(e) => {
                tracing::warn!("Lost track of Tx {} ({}): {}", link, call, e);
                TxOutcome::timed_out(tx_hash, e)
            }
        };
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxSubmit,
            chain = %handle.name(),
            call = %call.function_name(),
            status = %outcome.status,
            tx_hash = ?tx_hash,
        );
        Ok(outcome)
    }

    async fn build_and_broadcast(
        &self,
        handle: &ChainHandle,
        call: &BridgeCall,
    ) -> warden_relayer_utils::Result<H256> {
        let from = handle.signer.address();
        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(handle.contract)
            .data(call.calldata())
            .chain_id(handle.chain_id)
            .into();
        let estimate = handle.client.estimate_gas(&tx).await?;
        let gas = apply_gas_multiplier(estimate, self.config.gas_multiplier);
        tx.set_gas(gas);
        let gas_price = handle.client.gas_price().await?;
        tx.set_gas_price(gas_price);
        let nonce = handle.client.transaction_count(from).await?;
        tx.set_nonce(nonce);
        tracing::debug!(%estimate, %gas, %gas_price, %nonce, "Signing {}", call);
        let signed = handle.signer.sign(&tx).await?;
        handle.client.send_raw(signed).await
    }
}
