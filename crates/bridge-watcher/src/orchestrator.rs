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

use backoff::backoff::Backoff;
use derive_more::Display;
use ethers::types::Log;
use parking_lot::RwLock;
use prometheus::IntCounterVec;
use serde::Serialize;
use tokio::sync::broadcast;
use typed_builder::TypedBuilder;
use warden_bridge_events::{decode, BridgeEvent, EventKind};
use warden_chain_client::{ChainHandle, LogQuery};
use warden_relayer_config::ScanConfig;
use warden_relayer_store::WatermarkStore;
use warden_relayer_types::{BlockBound, ChainRole};
use warden_relayer_utils::metric::Metrics;
use warden_relayer_utils::{probe, retry, Error, Result};
use warden_tx_submitter::{BridgeCall, TxStatus, TxSubmitter};

use crate::window::{split, ScanWindow, ScanWindowManager};

/// Which way events flow.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `Deposit` on the source chain, `wrap` on the destination chain.
    #[display(fmt = "source->destination")]
    SourceToDestination,
    /// `Unwrap` on the destination chain, `withdraw` on the source chain.
    #[display(fmt = "destination->source")]
    DestinationToSource,
}

impl Direction {
    /// The direction whose events are read from `role`.
    pub fn watching(role: ChainRole) -> Self {
        match role {
            ChainRole::Source => Direction::SourceToDestination,
            ChainRole::Destination => Direction::DestinationToSource,
        }
    }

    /// The chain scanned for events.
    pub fn watched(self) -> ChainRole {
        match self {
            Direction::SourceToDestination => ChainRole::Source,
            Direction::DestinationToSource => ChainRole::Destination,
        }
    }

    /// The chain calls are submitted to.
    pub fn target(self) -> ChainRole {
        self.watched().opposite()
    }

    /// The event relayed in this direction.
    pub fn event_kind(self) -> EventKind {
        match self {
            Direction::SourceToDestination => EventKind::Deposit,
            Direction::DestinationToSource => EventKind::Unwrap,
        }
    }

    /// The call answering `event`.
    ///
    /// For an `Unwrap` only the underlying token, recipient and amount are
    /// forwarded; the wrapped token and the burner stay on the destination.
    pub fn outbound_call(self, event: &BridgeEvent) -> BridgeCall {
        match self {
            Direction::SourceToDestination => BridgeCall::Wrap {
                underlying_token: event.token,
                recipient: event.recipient,
                amount: event.amount,
            },
            Direction::DestinationToSource => BridgeCall::Withdraw {
                token: event.token,
                recipient: event.recipient,
                amount: event.amount,
            },
        }
    }

    /// The metrics label of the direction.
    pub fn label(self) -> &'static str {
        match self {
            Direction::SourceToDestination => "source_to_destination",
            Direction::DestinationToSource => "destination_to_source",
        }
    }
}

/// What an orchestrator is doing right now.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelayState {
    /// Between cycles.
    #[default]
    #[display(fmt = "idle")]
    Idle,
    /// Fetching logs.
    #[display(fmt = "scanning")]
    Scanning,
    /// Turning logs into events.
    #[display(fmt = "decoding")]
    Decoding,
    /// Submitting calls on the other chain.
    #[display(fmt = "relaying")]
    Relaying,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// The direction of the cycle.
    pub direction: Direction,
    /// The scanned window, `None` when there was nothing new to scan.
    pub window: Option<ScanWindow>,
    /// Decoded events.
    pub events_found: usize,
    /// Calls confirmed on the target chain.
    pub confirmed: usize,
    /// Calls mined but reverted.
    pub reverted: usize,
    /// Calls broadcast but not seen mined in time.
    pub timed_out: usize,
    /// Calls that failed before broadcast.
    pub build_failed: usize,
    /// Logs that could not be decoded.
    pub decode_errors: usize,
    /// Blocks the provider refused to return logs for.
    pub skipped_ranges: usize,
}

impl CycleSummary {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            window: None,
            events_found: 0,
            confirmed: 0,
            reverted: 0,
            timed_out: 0,
            build_failed: 0,
            decode_errors: 0,
            skipped_ranges: 0,
        }
    }

    fn record(&mut self, status: TxStatus) {
        match status {
            TxStatus::Confirmed => self.confirmed += 1,
            TxStatus::Reverted => self.reverted += 1,
            TxStatus::TimedOut => self.timed_out += 1,
            TxStatus::BuildFailed => self.build_failed += 1,
        }
    }
}

/// Relays the events of one chain to the other, one direction per instance.
///
/// The direction follows from the watched handle's role.
#[derive(Debug, TypedBuilder)]
pub struct RelayOrchestrator {
    /// The chain scanned for events.
    watched: ChainHandle,
    /// The chain calls are submitted to.
    target: ChainHandle,
    /// Submits the outbound calls.
    #[builder(default)]
    submitter: TxSubmitter,
    /// Scan tuning.
    #[builder(default)]
    scan: ScanConfig,
    /// Where the last scanned block is remembered, if anywhere.
    #[builder(default)]
    store: Option<Arc<dyn WatermarkStore>>,
    /// Where cycle counters are reported.
    metrics: Arc<Metrics>,
    #[builder(default, setter(skip))]
    state: RwLock<RelayState>,
}

impl RelayOrchestrator {
    /// The direction this orchestrator relays.
    pub fn direction(&self) -> Direction {
        Direction::watching(self.watched.role)
    }

    /// The current state.
    pub fn state(&self) -> RelayState {
        *self.state.read()
    }

    fn set_state(&self, state: RelayState) {
        *self.state.write() = state;
    }

    /// Runs one cycle over the trailing window, or from the watermark on
    /// when a store is configured.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let result = self.next_cycle().await;
        self.finish(result)
    }

    /// Runs one cycle over an explicit range.
    pub async fn run_cycle_with(
        &self,
        start: BlockBound,
        end: BlockBound,
    ) -> Result<CycleSummary> {
        let result = async {
            self.set_state(RelayState::Scanning);
            let window = ScanWindowManager::new(&self.watched)
                .compute_window(start, end)
                .await?;
            self.relay_window(window).await
        }
        .await;
        self.finish(result)
    }

    /// Runs cycles until `shutdown` fires.
    ///
    /// Failed cycles back off exponentially up to the configured cap. The
    /// shutdown signal is only looked at between cycles, so a broadcast
    /// transaction is always followed up.
    #[tracing::instrument(skip_all, fields(direction = %self.direction()))]
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let direction = self.direction();
        let mut backoff = retry::cycle_backoff(
            self.scan.polling_interval(),
            self.scan.max_backoff_interval(),
        );
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            %direction,
            started = true,
        );
        loop {
            let delay = match self.run_cycle().await {
                Ok(_) => {
                    backoff.reset();
                    self.scan.polling_interval()
                }
                Err(e) => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.scan.max_backoff_interval());
                    if e.is_retryable() {
                        tracing::warn!(
                            "Cycle aborted: {}, retrying in {}ms",
                            e,
                            delay.as_millis()
                        );
                    } else {
                        tracing::error!(
                            "Cycle failed: {}, retrying in {}ms",
                            e,
                            delay.as_millis()
                        );
                    }
                    self.metrics
                        .bridge_watcher_back_off
                        .with_label_values(&[direction.label()])
                        .inc();
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %probe::Kind::Retry,
                        %direction,
                        backoff_ms = delay.as_millis() as u64,
                    );
                    delay
                }
            };
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            %direction,
            shutdown = true,
        );
        Ok(())
    }

    fn finish(&self, result: Result<CycleSummary>) -> Result<CycleSummary> {
        self.set_state(RelayState::Idle);
        if let Ok(summary) = &result {
            let direction = summary.direction;
            tracing::info!(
                window = ?summary.window,
                events = summary.events_found,
                confirmed = summary.confirmed,
                reverted = summary.reverted,
                timed_out = summary.timed_out,
                build_failed = summary.build_failed,
                decode_errors = summary.decode_errors,
                skipped_ranges = summary.skipped_ranges,
                "{} cycle done",
                direction,
            );
            self.metrics
                .cycles
                .with_label_values(&[direction.label()])
                .inc();
        }
        result
    }

    async fn next_cycle(&self) -> Result<CycleSummary> {
        self.set_state(RelayState::Scanning);
        match self.next_window().await? {
            Some(window) => self.relay_window(window).await,
            None => {
                tracing::trace!("No new blocks on {}", self.watched.name());
                Ok(CycleSummary::new(self.direction()))
            }
        }
    }

    /// The window of the next cycle, `None` when the watermark has caught
    /// up with the confirmed head.
    async fn next_window(&self) -> Result<Option<ScanWindow>> {
        let role = self.watched.role;
        let manager = ScanWindowManager::new(&self.watched);
        let last_scanned = match &self.store {
            Some(store) => store.get_last_scanned(role)?,
            None => None,
        };
        let Some(last) = last_scanned else {
            let window = manager
                .compute_window(
                    BlockBound::BehindLatest(self.scan.trailing_blocks),
                    BlockBound::Latest,
                )
                .await?;
            return Ok(Some(window));
        };
        let head = manager.confirmed_head().await?;
        let start = last.saturating_add(1);
        if start > head {
            return Ok(None);
        }
        let cap = self.scan.max_blocks_per_cycle.max(1);
        let end = head.min(last.saturating_add(cap));
        ScanWindow::new(role, start, end).map(Some)
    }

    #[tracing::instrument(skip(self), fields(direction = %self.direction()))]
    async fn relay_window(&self, window: ScanWindow) -> Result<CycleSummary> {
        let direction = self.direction();
        let mut summary = CycleSummary::new(direction);
        summary.window = Some(window);

        self.set_state(RelayState::Scanning);
        let mut logs = Vec::new();
        for part in split(window, self.scan.max_span) {
            logs.extend(self.fetch_logs(part, &mut summary).await?);
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Scan,
            %direction,
            start = window.start,
            end = window.end,
            logs = logs.len(),
        );

        self.set_state(RelayState::Decoding);
        let events = self.decode_logs(&logs, &mut summary);
        summary.events_found = events.len();

        self.set_state(RelayState::Relaying);
        for event in &events {
            let call = direction.outbound_call(event);
            let outcome = match self.submitter.submit(&self.target, call.clone()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // the watermark stays put, the window is scanned again.
                    tracing::warn!(
                        ?event,
                        %call,
                        "Could not relay {} from {}, aborting {}: {}",
                        event.kind,
                        self.watched.tx_link(event.source_tx_hash),
                        window,
                        e,
                    );
                    return Err(e);
                }
            };
            match outcome.status {
                TxStatus::Confirmed => {}
                TxStatus::Reverted | TxStatus::BuildFailed => {
                    tracing::error!(
                        ?event,
                        %call,
                        reason = outcome.error.as_deref().unwrap_or("reverted"),
                        "Relaying {} from {} failed ({})",
                        event.kind,
                        self.watched.tx_link(event.source_tx_hash),
                        outcome.status,
                    );
                }
                TxStatus::TimedOut => {
                    tracing::warn!(
                        ?event,
                        %call,
                        "Relayed {} from {} but its tx is not confirmed yet",
                        event.kind,
                        self.watched.tx_link(event.source_tx_hash),
                    );
                }
            }
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Relay,
                %direction,
                source_tx_hash = ?event.source_tx_hash,
                status = %outcome.status,
                tx_hash = ?outcome.tx_hash,
            );
            summary.record(outcome.status);
        }

        self.advance_watermark(window)?;
        self.report(&summary, window);
        Ok(summary)
    }

    async fn fetch_logs(
        &self,
        window: ScanWindow,
        summary: &mut CycleSummary,
    ) -> Result<Vec<Log>> {
        match self.query(window).await {
            Err(Error::RangeTooLarge { reason, .. }) if !window.is_single_block() => {
                tracing::debug!(
                    "Provider refused {}: {}, querying block by block",
                    window,
                    reason
                );
                let mut logs = Vec::new();
                for block in window.blocks() {
                    match self.query(block).await {
                        Ok(found) => logs.extend(found),
                        Err(Error::RangeTooLarge { reason, .. }) => {
                            self.skip(block, &reason, summary)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(logs)
            }
            Err(Error::RangeTooLarge { reason, .. }) => {
                self.skip(window, &reason, summary);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn query(&self, window: ScanWindow) -> Result<Vec<Log>> {
        let query = LogQuery::new(
            self.watched.contract,
            self.direction().event_kind().signature(),
            window.start,
            window.end,
        );
        self.watched.client.get_logs(&query).await
    }

    fn skip(&self, window: ScanWindow, reason: &str, summary: &mut CycleSummary) {
        tracing::warn!("Skipping {}, provider refused it: {}", window, reason);
        summary.skipped_ranges += 1;
    }

    fn decode_logs(&self, logs: &[Log], summary: &mut CycleSummary) -> Vec<BridgeEvent> {
        let kind = self.direction().event_kind();
        logs.iter()
            .filter_map(|log| match decode(log, kind) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(
                        block = ?log.block_number,
                        log_index = ?log.log_index,
                        tx_hash = ?log.transaction_hash,
                        "Skipping log: {}",
                        e
                    );
                    summary.decode_errors += 1;
                    None
                }
            })
            .collect()
    }

    /// Moves the watermark to the end of `window`, never backwards.
    fn advance_watermark(&self, window: ScanWindow) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let role = self.watched.role;
        let previous = store.get_last_scanned(role)?;
        if previous.map_or(true, |last| window.end > last) {
            store.set_last_scanned(role, window.end)?;
        }
        Ok(())
    }

    fn report(&self, summary: &CycleSummary, window: ScanWindow) {
        let label = [summary.direction.label()];
        let m = &self.metrics;
        let add = |counter: &IntCounterVec, n: usize| {
            counter.with_label_values(&label).inc_by(n as u64)
        };
        add(&m.events_found, summary.events_found);
        add(&m.relays_confirmed, summary.confirmed);
        add(&m.relays_reverted, summary.reverted);
        add(&m.relays_timed_out, summary.timed_out);
        add(&m.relays_build_failed, summary.build_failed);
        add(&m.decode_errors, summary.decode_errors);
        add(&m.skipped_ranges, summary.skipped_ranges);
        m.last_scanned_block
            .with_label_values(&label)
            .set(window.end as i64);
    }
}
