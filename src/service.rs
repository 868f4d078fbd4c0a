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

//! # Relayer Service Module 🕸️
//!
//! A module for starting long-running tasks for event watching.
//!
//! ## Overview
//!
//! Services are tasks which the relayer constantly runs throughout its lifetime.
//! There is one watcher per bridge direction, plus the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use warden_bridge_watcher::{CycleSummary, Direction, RelayOrchestrator};
use warden_chain_client::ChainHandle;
use warden_relayer_context::RelayerContext;
use warden_relayer_store::WatermarkStore;
use warden_relayer_types::{BlockBound, ChainRole};
use warden_relayer_utils::probe;
use warden_tx_submitter::TxSubmitter;

use crate::handlers::{handle_metric_info, handle_relayer_info};

/// Both sides of the bridge, connected.
#[derive(Debug, Clone)]
pub struct Bridge {
    /// The chain deposits happen on.
    pub source: ChainHandle,
    /// The chain wrapped tokens live on.
    pub destination: ChainHandle,
}

impl Bridge {
    /// Connects to both chains with the configured warden key.
    pub async fn connect(ctx: &RelayerContext) -> crate::Result<Self> {
        let signer = ctx.signer()?;
        let source = ctx.chain_handle(ChainRole::Source, signer.clone()).await?;
        let destination =
            ctx.chain_handle(ChainRole::Destination, signer).await?;
        Ok(Self {
            source,
            destination,
        })
    }

    /// The handle of the `role` chain.
    pub fn handle(&self, role: ChainRole) -> &ChainHandle {
        match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        }
    }

    /// The orchestrator relaying `direction`.
    pub fn orchestrator(
        &self,
        ctx: &RelayerContext,
        direction: Direction,
        store: Option<Arc<dyn WatermarkStore>>,
    ) -> RelayOrchestrator {
        RelayOrchestrator::builder()
            .watched(self.handle(direction.watched()).clone())
            .target(self.handle(direction.target()).clone())
            .submitter(TxSubmitter::new(ctx.config.tx.into()))
            .scan(ctx.config.scan)
            .store(store)
            .metrics(ctx.metrics.clone())
            .build()
    }
}

/// The directions to relay, all of them unless `watch` picks one chain.
pub fn directions(watch: Option<ChainRole>) -> Vec<Direction> {
    match watch {
        Some(role) => vec![Direction::watching(role)],
        None => ChainRole::ALL.iter().copied().map(Direction::watching).collect(),
    }
}

/// Starts one watcher per direction in the background.
///
/// Every watcher runs until the context's shutdown signal fires.
pub fn ignite(
    ctx: &RelayerContext,
    bridge: &Bridge,
    store: Option<Arc<dyn WatermarkStore>>,
    watch: Option<ChainRole>,
) -> Vec<JoinHandle<crate::Result<()>>> {
    directions(watch)
        .into_iter()
        .map(|direction| {
            let orchestrator = bridge.orchestrator(ctx, direction, store.clone());
            let shutdown = ctx.subscribe_shutdown();
            tracing::info!("Starting the {} watcher", direction);
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Lifecycle,
                %direction,
                ignite = true,
            );
            tokio::spawn(async move { orchestrator.run(shutdown).await })
        })
        .collect()
}

/// Runs a single cycle per direction, over `[from, to]` when either bound
/// is given, and returns what each of them did.
pub async fn run_once(
    ctx: &RelayerContext,
    bridge: &Bridge,
    store: Option<Arc<dyn WatermarkStore>>,
    watch: Option<ChainRole>,
    from: Option<BlockBound>,
    to: Option<BlockBound>,
) -> crate::Result<Vec<CycleSummary>> {
    let explicit = from.is_some() || to.is_some();
    let from = from
        .unwrap_or(BlockBound::BehindLatest(ctx.config.scan.trailing_blocks));
    let to = to.unwrap_or(BlockBound::Latest);
    let cycles = directions(watch).into_iter().map(|direction| {
        let orchestrator = bridge.orchestrator(ctx, direction, store.clone());
        async move {
            if explicit {
                orchestrator.run_cycle_with(from, to).await
            } else {
                orchestrator.run_cycle().await
            }
        }
    });
    futures::future::try_join_all(cycles).await
}

/// Serves the relayer API on the configured port until shutdown.
///
/// # Arguments
///
/// * `ctx` - RelayContext reference that holds the configuration
pub async fn build_web_services(ctx: RelayerContext) -> crate::Result<()> {
    let socket_addr = SocketAddr::new([0, 0, 0, 0].into(), ctx.config.port);
    let mut shutdown = ctx.shutdown_signal();
    let api = Router::new()
        .route("/info", get(handle_relayer_info))
        .route("/metrics", get(handle_metric_info));
    let app = Router::new()
        .nest("/api/v1", api)
        .with_state(Arc::new(ctx))
        .into_make_service();

    tracing::info!("Starting the server on {}", socket_addr);
    axum::Server::bind(&socket_addr)
        .serve(app)
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use ethers::abi::AbiDecode;
    use ethers::types::Address;
    use warden_bridge_events::fixtures::{deposit_log, unwrap_log};
    use warden_bridge_events::{WithdrawCall, WrapCall};
    use warden_chain_client::mock::{MockChainClient, MockSigner};
    use warden_relayer_config::WardenRelayerConfig;

    use super::*;

    pub(crate) struct MockBridge {
        pub source: Arc<MockChainClient>,
        pub destination: Arc<MockChainClient>,
        pub bridge: Bridge,
    }

    pub(crate) fn mock_bridge() -> MockBridge {
        let source = Arc::new(MockChainClient::new("source", 31337));
        let destination = Arc::new(MockChainClient::new("destination", 31338));
        source.set_height(100);
        destination.set_height(100);
        let signer = Arc::new(MockSigner::default());
        let bridge = Bridge {
            source: ChainHandle::new(
                ChainRole::Source,
                31337,
                source.clone(),
                Address::repeat_byte(0x50),
                signer.clone(),
            ),
            destination: ChainHandle::new(
                ChainRole::Destination,
                31338,
                destination.clone(),
                Address::repeat_byte(0xd0),
                signer,
            ),
        };
        MockBridge {
            source,
            destination,
            bridge,
        }
    }

    fn seed(mock: &MockBridge) {
        for block in [20, 98] {
            mock.source.push_log(deposit_log(
                Address::repeat_byte(0x50),
                Address::repeat_byte(0xaa),
                Address::repeat_byte(0xbb),
                block.into(),
                block,
                0,
            ));
            mock.destination.push_log(unwrap_log(
                Address::repeat_byte(0xd0),
                Address::repeat_byte(0xcc),
                Address::repeat_byte(0xee),
                Address::repeat_byte(0x99),
                Address::repeat_byte(0xdd),
                block.into(),
                block,
                0,
            ));
        }
    }

    #[test]
    fn watch_limits_the_directions() {
        assert_eq!(directions(None).len(), 2);
        assert_eq!(
            directions(Some(ChainRole::Destination)),
            vec![Direction::DestinationToSource]
        );
    }

    #[tokio::test]
    async fn one_shot_relays_both_directions() {
        let mock = mock_bridge();
        seed(&mock);
        let ctx = RelayerContext::new(WardenRelayerConfig::default()).unwrap();
        let summaries =
            run_once(&ctx, &mock.bridge, None, None, None, None).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.confirmed == 1));
        let wrap = WrapCall::decode(&mock.destination.sent()[0]).unwrap();
        assert_eq!(wrap.amount, 98.into());
        let withdraw = WithdrawCall::decode(&mock.source.sent()[0]).unwrap();
        assert_eq!(withdraw.recipient, Address::repeat_byte(0xdd));
    }

    #[tokio::test]
    async fn explicit_range_on_one_chain() {
        let mock = mock_bridge();
        seed(&mock);
        let ctx = RelayerContext::new(WardenRelayerConfig::default()).unwrap();
        let summaries = run_once(
            &ctx,
            &mock.bridge,
            None,
            Some(ChainRole::Source),
            Some(BlockBound::Number(0)),
            Some(BlockBound::Number(50)),
        )
        .await
        .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].direction, Direction::SourceToDestination);
        let wrap = WrapCall::decode(&mock.destination.sent()[0]).unwrap();
        assert_eq!(wrap.amount, 20.into());
        assert!(mock.source.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignited_watchers_stop_on_shutdown() {
        let mock = mock_bridge();
        let ctx = RelayerContext::new(WardenRelayerConfig::default()).unwrap();
        let tasks = ignite(&ctx, &mock.bridge, None, None);
        assert_eq!(tasks.len(), 2);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        ctx.shutdown();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(mock.source.height_calls() >= 1);
        assert!(mock.destination.height_calls() >= 1);
    }
}
