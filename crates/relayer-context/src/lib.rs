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
//! # Relayer Context Module 🕸️
//!
//! A module for managing the context of the relayer.
use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Provider, RetryClientBuilder};
use tokio::sync::broadcast;

use warden_chain_client::{
    ChainClient, ChainHandle, EthersChainClient, LocalWalletSigner, TxSigner,
};
use warden_relayer_config::WardenRelayerConfig;
use warden_relayer_types::{ChainRole, EthersClient};
use warden_relayer_utils::metric::Metrics;
use warden_relayer_utils::multi_provider::MultiProvider;

mod ethers_retry_policy;

pub use ethers_retry_policy::WardenHttpRetryPolicy;

/// RelayerContext contains Relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: WardenRelayerConfig,
    /// Broadcasts a shutdown signal to all running watchers and the HTTP server.
    ///
    /// When a graceful shutdown is initiated, a `()` value is sent via the
    /// broadcast::Sender. Each watcher receives it between two cycles and
    /// stops.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the relayer
    pub metrics: Arc<Metrics>,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(
        config: WardenRelayerConfig,
    ) -> warden_relayer_utils::Result<Self> {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Returns a raw receiver of the shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.notify_shutdown.subscribe()
    }

    /// Sends a shutdown signal to all subscribed tasks/connections.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// The warden signer, shared by both chains.
    pub fn signer(&self) -> warden_relayer_utils::Result<Arc<dyn TxSigner>> {
        let private_key = self
            .config
            .private_key
            .as_ref()
            .ok_or(warden_relayer_utils::Error::MissingSecrets)?;
        let signer = LocalWalletSigner::new(private_key)?;
        tracing::info!("Warden account: {:?}", signer.address());
        Ok(Arc::new(signer))
    }

    /// Returns the retrying, round robin ethers provider of the `role` chain.
    pub fn evm_provider(
        &self,
        role: ChainRole,
    ) -> warden_relayer_utils::Result<Arc<EthersClient>> {
        let chain_config = self.config.chain(role)?;
        let endpoints: Vec<Http> = chain_config
            .http_endpoint
            .urls()
            .into_iter()
            .map(|url| Http::new(url::Url::from(url)))
            .collect();
        if endpoints.is_empty() {
            return Err(warden_relayer_utils::Error::ChainNotConfigured {
                role: role.to_string(),
            });
        }
        let multi_provider = MultiProvider::new(Arc::new(endpoints));
        let client = RetryClientBuilder::default()
            .rate_limit_retries(10)
            .timeout_retries(3)
            .initial_backoff(Duration::from_millis(500))
            .build(multi_provider, WardenHttpRetryPolicy::boxed());
        let provider = Provider::new(client).interval(Duration::from_millis(
            self.config.tx.receipt_poll_interval,
        ));
        Ok(Arc::new(provider))
    }

    /// Builds the handle of the `role` chain.
    ///
    /// The chain id is read from the endpoint when the configuration does
    /// not pin it.
    pub async fn chain_handle(
        &self,
        role: ChainRole,
        signer: Arc<dyn TxSigner>,
    ) -> warden_relayer_utils::Result<ChainHandle> {
        let chain_config = self.config.chain(role)?;
        let provider = self.evm_provider(role)?;
        let client = EthersChainClient::new(
            chain_config.name.clone(),
            provider,
            self.config.tx.rpc_timeout(),
        );
        let chain_id = match chain_config.chain_id {
            Some(chain_id) => chain_id,
            None => client.chain_id().await?,
        };
        tracing::debug!(
            %role,
            chain_id,
            endpoints = chain_config.http_endpoint.urls().len(),
            "Connected {}",
            chain_config.name
        );
        let handle =
            ChainHandle::new(role, chain_id, Arc::new(client), chain_config.address, signer)
                .with_explorer(chain_config.explorer.clone())
                .with_confirmations(chain_config.block_confirmations);
        Ok(handle)
    }
}

/// Listens for the server shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the server
/// should shutdown.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Whether the signal was already received.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        self.shutdown = true;
    }
}
