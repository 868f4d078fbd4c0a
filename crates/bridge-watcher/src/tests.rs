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
use std::time::Duration;

use ethers::abi::AbiDecode;
use ethers::types::{Address, U256};
use tokio::sync::broadcast;
use tracing_test::traced_test;
use warden_bridge_events::fixtures::{deposit_log, unwrap_log};
use warden_bridge_events::{WithdrawCall, WrapCall};
use warden_chain_client::mock::{MockChainClient, MockSigner};
use warden_chain_client::ChainHandle;
use warden_relayer_config::ScanConfig;
use warden_relayer_store::{InMemoryStore, WatermarkStore};
use warden_relayer_types::{BlockBound, ChainRole};
use warden_relayer_utils::metric::Metrics;
use warden_relayer_utils::Error;
use warden_tx_submitter::BridgeCall;

use crate::{Direction, RelayOrchestrator, RelayState, ScanWindow};

const SOURCE_BRIDGE: Address = Address::repeat_byte(0x50);
const DESTINATION_BRIDGE: Address = Address::repeat_byte(0xd0);

struct Bridge {
    source: Arc<MockChainClient>,
    destination: Arc<MockChainClient>,
    metrics: Arc<Metrics>,
}

impl Bridge {
    fn new() -> Self {
        let source = Arc::new(MockChainClient::new("source", 31337));
        let destination = Arc::new(MockChainClient::new("destination", 31338));
        source.set_height(100);
        destination.set_height(50);
        Self {
            source,
            destination,
            metrics: Arc::new(Metrics::new().unwrap()),
        }
    }

    fn handle(&self, role: ChainRole) -> ChainHandle {
        let signer = Arc::new(MockSigner::default());
        match role {
            ChainRole::Source => ChainHandle::new(
                role,
                31337,
                self.source.clone(),
                SOURCE_BRIDGE,
                signer,
            ),
            ChainRole::Destination => ChainHandle::new(
                role,
                31338,
                self.destination.clone(),
                DESTINATION_BRIDGE,
                signer,
            ),
        }
    }

    fn orchestrator(
        &self,
        direction: Direction,
        scan: ScanConfig,
        store: Option<Arc<dyn WatermarkStore>>,
    ) -> RelayOrchestrator {
        RelayOrchestrator::builder()
            .watched(self.handle(direction.watched()))
            .target(self.handle(direction.target()))
            .scan(scan)
            .store(store)
            .metrics(self.metrics.clone())
            .build()
    }

    fn deposits(&self, scan: ScanConfig) -> RelayOrchestrator {
        self.orchestrator(Direction::SourceToDestination, scan, None)
    }

    fn deposit(&self, amount: u64, block: u64) {
        self.source.push_log(deposit_log(
            SOURCE_BRIDGE,
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbb),
            amount.into(),
            block,
            0,
        ));
    }

    fn wraps(&self) -> Vec<WrapCall> {
        self.destination
            .sent()
            .iter()
            .map(|data| WrapCall::decode(data).unwrap())
            .collect()
    }
}

fn window(role: ChainRole, start: u64, end: u64) -> ScanWindow {
    ScanWindow::new(role, start, end).unwrap()
}

#[tokio::test]
#[traced_test]
async fn deposit_is_wrapped_on_destination_once() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();

    assert_eq!(summary.window, Some(window(ChainRole::Source, 95, 100)));
    assert_eq!(summary.events_found, 1);
    assert_eq!(summary.confirmed, 1);
    let wraps = bridge.wraps();
    assert_eq!(wraps.len(), 1);
    assert_eq!(wraps[0].underlying_token, Address::repeat_byte(0xaa));
    assert_eq!(wraps[0].recipient, Address::repeat_byte(0xbb));
    assert_eq!(wraps[0].amount, U256::from(500));
    assert!(bridge.source.sent().is_empty());
}

#[tokio::test]
#[traced_test]
async fn unwrap_is_withdrawn_on_source_ignoring_the_burner() {
    let bridge = Bridge::new();
    bridge.destination.push_log(unwrap_log(
        DESTINATION_BRIDGE,
        Address::repeat_byte(0xcc),
        Address::repeat_byte(0xee),
        Address::repeat_byte(0x99),
        Address::repeat_byte(0xdd),
        7.into(),
        48,
        3,
    ));
    let summary = bridge
        .orchestrator(Direction::DestinationToSource, ScanConfig::default(), None)
        .run_cycle()
        .await
        .unwrap();

    assert_eq!(summary.confirmed, 1);
    let sent = bridge.source.sent();
    assert_eq!(sent.len(), 1);
    let withdraw = WithdrawCall::decode(&sent[0]).unwrap();
    assert_eq!(withdraw.token, Address::repeat_byte(0xcc));
    assert_eq!(withdraw.recipient, Address::repeat_byte(0xdd));
    assert_eq!(withdraw.amount, U256::from(7));
    assert!(bridge.destination.sent().is_empty());
}

#[tokio::test]
#[traced_test]
async fn zero_amounts_are_relayed_as_is() {
    let bridge = Bridge::new();
    bridge.deposit(0, 99);
    bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(bridge.wraps()[0].amount, U256::zero());
}

#[tokio::test]
#[traced_test]
async fn failed_estimate_does_not_block_other_events() {
    let bridge = Bridge::new();
    for (amount, block) in [(1, 96), (2, 97), (3, 98)] {
        bridge.deposit(amount, block);
    }
    let failing = BridgeCall::Wrap {
        underlying_token: Address::repeat_byte(0xaa),
        recipient: Address::repeat_byte(0xbb),
        amount: 2.into(),
    };
    bridge.destination.fail_estimate_for(failing.calldata());

    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(summary.events_found, 3);
    assert_eq!(summary.confirmed, 2);
    assert_eq!(summary.build_failed, 1);
    let amounts: Vec<U256> = bridge.wraps().iter().map(|w| w.amount).collect();
    assert_eq!(amounts, vec![U256::from(1), U256::from(3)]);
    assert!(logs_contain("Relaying Deposit"));
}

#[tokio::test]
#[traced_test]
async fn reverted_relays_are_counted_and_scanning_goes_on() {
    let bridge = Bridge::new();
    bridge.deposit(1, 96);
    bridge.deposit(2, 97);
    bridge.destination.set_receipt_status(0);
    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(summary.reverted, 2);
    assert_eq!(bridge.destination.sent().len(), 2);
}

#[tokio::test]
#[traced_test]
async fn rescanning_without_a_watermark_relays_again() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    let orchestrator = bridge.deposits(ScanConfig::default());
    orchestrator.run_cycle().await.unwrap();
    orchestrator.run_cycle().await.unwrap();
    assert_eq!(bridge.wraps().len(), 2);
}

#[tokio::test]
#[traced_test]
async fn watermark_prevents_relaying_twice() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = bridge.orchestrator(
        Direction::SourceToDestination,
        ScanConfig::default(),
        Some(store.clone()),
    );

    orchestrator.run_cycle().await.unwrap();
    assert_eq!(store.get_last_scanned(ChainRole::Source).unwrap(), Some(100));

    let idle = orchestrator.run_cycle().await.unwrap();
    assert_eq!(idle.window, None);
    assert_eq!(bridge.wraps().len(), 1);

    bridge.source.set_height(103);
    bridge.deposit(9, 102);
    let next = orchestrator.run_cycle().await.unwrap();
    assert_eq!(next.window, Some(window(ChainRole::Source, 101, 103)));
    assert_eq!(bridge.wraps().len(), 2);
}

#[tokio::test]
#[traced_test]
async fn unreachable_target_keeps_the_window_for_next_cycle() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    bridge.destination.set_offline(true);
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = bridge.orchestrator(
        Direction::SourceToDestination,
        ScanConfig::default(),
        Some(store.clone()),
    );

    let err = orchestrator.run_cycle().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(orchestrator.state(), RelayState::Idle);
    assert_eq!(store.get_last_scanned(ChainRole::Source).unwrap(), None);
    assert!(bridge.wraps().is_empty());
    assert!(logs_contain("aborting"));

    bridge.destination.set_offline(false);
    let summary = orchestrator.run_cycle().await.unwrap();
    assert_eq!(summary.window, Some(window(ChainRole::Source, 95, 100)));
    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.build_failed, 0);
    let wraps = bridge.wraps();
    assert_eq!(wraps.len(), 1);
    assert_eq!(wraps[0].amount, U256::from(500));
    assert_eq!(store.get_last_scanned(ChainRole::Source).unwrap(), Some(100));
}

#[tokio::test]
#[traced_test]
async fn watermark_catch_up_is_capped() {
    let bridge = Bridge::new();
    bridge.source.set_height(1_000);
    let store = Arc::new(InMemoryStore::default());
    store.set_last_scanned(ChainRole::Source, 10).unwrap();
    let scan = ScanConfig {
        max_span: 1_000,
        ..Default::default()
    };
    let orchestrator =
        bridge.orchestrator(Direction::SourceToDestination, scan, Some(store.clone()));

    let summary = orchestrator.run_cycle().await.unwrap();
    assert_eq!(summary.window, Some(window(ChainRole::Source, 11, 510)));
    let summary = orchestrator.run_cycle().await.unwrap();
    assert_eq!(summary.window, Some(window(ChainRole::Source, 511, 1_000)));
}

#[tokio::test]
#[traced_test]
async fn undecodable_logs_are_skipped() {
    let bridge = Bridge::new();
    let mut broken = deposit_log(
        SOURCE_BRIDGE,
        Address::repeat_byte(0xaa),
        Address::repeat_byte(0xbb),
        1.into(),
        97,
        0,
    );
    broken.data = Default::default();
    bridge.source.push_log(broken);
    bridge.deposit(2, 98);

    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.events_found, 1);
    assert_eq!(bridge.wraps().len(), 1);
    assert!(logs_contain("Skipping log"));
}

#[tokio::test]
#[traced_test]
async fn wide_windows_are_scanned_block_by_block() {
    let bridge = Bridge::new();
    bridge.deposit(5, 97);
    let scan = ScanConfig {
        max_span: 3,
        ..Default::default()
    };
    bridge.deposits(scan).run_cycle().await.unwrap();

    let queried: Vec<(u64, u64)> = bridge
        .source
        .log_queries()
        .iter()
        .map(|q| (q.from_block, q.to_block))
        .collect();
    assert_eq!(queried, (95..=100).map(|b| (b, b)).collect::<Vec<_>>());
    assert_eq!(bridge.wraps().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn refused_ranges_fall_back_to_single_blocks() {
    let bridge = Bridge::new();
    bridge.deposit(5, 96);
    bridge.deposit(6, 99);
    bridge.source.set_range_limit(Some(1));
    bridge.source.reject_block(99);

    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    let queries = bridge.source.log_queries();
    assert_eq!((queries[0].from_block, queries[0].to_block), (95, 100));
    assert_eq!(queries.len(), 1 + 6);
    assert_eq!(summary.skipped_ranges, 1);
    let amounts: Vec<U256> = bridge.wraps().iter().map(|w| w.amount).collect();
    assert_eq!(amounts, vec![U256::from(5)]);
}

#[tokio::test]
#[traced_test]
async fn explicit_range_is_relayed() {
    let bridge = Bridge::new();
    bridge.deposit(1, 20);
    bridge.deposit(2, 98);
    let summary = bridge
        .deposits(ScanConfig::default())
        .run_cycle_with(BlockBound::Number(10), BlockBound::Number(30))
        .await
        .unwrap();
    assert_eq!(summary.window, Some(window(ChainRole::Source, 10, 30)));
    let amounts: Vec<U256> = bridge.wraps().iter().map(|w| w.amount).collect();
    assert_eq!(amounts, vec![U256::from(1)]);
}

#[tokio::test]
#[traced_test]
async fn inverted_range_makes_no_query() {
    let bridge = Bridge::new();
    let orchestrator = bridge.deposits(ScanConfig::default());
    let err = orchestrator
        .run_cycle_with(BlockBound::Number(10), BlockBound::Number(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { .. }));
    assert!(bridge.source.log_queries().is_empty());
    assert_eq!(orchestrator.state(), RelayState::Idle);
}

#[tokio::test]
#[traced_test]
async fn offline_chain_aborts_the_cycle() {
    let bridge = Bridge::new();
    bridge.source.set_offline(true);
    let orchestrator = bridge.deposits(ScanConfig::default());
    let err = orchestrator.run_cycle().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(orchestrator.state(), RelayState::Idle);
}

#[tokio::test]
#[traced_test]
async fn cycles_are_counted_per_direction() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    bridge
        .deposits(ScanConfig::default())
        .run_cycle()
        .await
        .unwrap();
    let text = bridge.metrics.gather_metrics().unwrap();
    assert!(text.contains("warden_cycles{direction=\"source_to_destination\"} 1"));
    assert!(text.contains(
        "warden_relays_confirmed{direction=\"source_to_destination\"} 1"
    ));
    assert!(text.contains(
        "warden_last_scanned_block{direction=\"source_to_destination\"} 100"
    ));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn run_stops_on_shutdown() {
    let bridge = Bridge::new();
    bridge.deposit(500, 98);
    let orchestrator = Arc::new(bridge.deposits(ScanConfig::default()));
    let (tx, rx) = broadcast::channel(1);
    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(rx).await })
    };
    tokio::time::sleep(Duration::from_millis(12_500)).await;
    tx.send(()).unwrap();
    task.await.unwrap().unwrap();
    // cycles at 0s, 5s and 10s
    assert_eq!(bridge.wraps().len(), 3);
    assert_eq!(orchestrator.state(), RelayState::Idle);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn run_backs_off_while_offline() {
    let bridge = Bridge::new();
    bridge.source.set_offline(true);
    let orchestrator = Arc::new(bridge.deposits(ScanConfig::default()));
    let (tx, rx) = broadcast::channel(1);
    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(rx).await })
    };
    tokio::time::sleep(Duration::from_secs(60)).await;
    tx.send(()).unwrap();
    task.await.unwrap().unwrap();
    let text = bridge.metrics.gather_metrics().unwrap();
    assert!(text.contains("warden_bridge_watcher_back_off{direction=\"source_to_destination\"}"));
    assert!(logs_contain("Cycle aborted"));
}
