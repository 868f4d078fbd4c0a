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

use prometheus::{opts, Encoder, IntCounterVec, IntGaugeVec, Registry, TextEncoder};

/// A struct definition for collecting metrics in the relayer.
///
/// Every counter is labeled by relay `direction`, so the two watchers of a
/// relayer share one set of metrics.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Poll cycles completed.
    pub cycles: IntCounterVec,
    /// Bridge events found in scanned windows.
    pub events_found: IntCounterVec,
    /// Relays whose receipt reported success.
    pub relays_confirmed: IntCounterVec,
    /// Relays whose receipt reported a revert.
    pub relays_reverted: IntCounterVec,
    /// Relays broadcast but never seen included.
    pub relays_timed_out: IntCounterVec,
    /// Relays that failed before broadcasting.
    pub relays_build_failed: IntCounterVec,
    /// Logs that could not be decoded.
    pub decode_errors: IntCounterVec,
    /// Single blocks the provider refused to serve logs for.
    pub skipped_ranges: IntCounterVec,
    /// Bridge watcher back off metric
    pub bridge_watcher_back_off: IntCounterVec,
    /// Last block each direction finished scanning.
    pub last_scanned_block: IntGaugeVec,
}

impl Metrics {
    /// Instantiates the various metrics and their counters, also creates a registry for the counters and
    /// registers the counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("warden".into()), None)?;
        let counter = |name: &str, help: &str| {
            let c = IntCounterVec::new(opts!(name, help), &["direction"])?;
            registry.register(Box::new(c.clone()))?;
            Ok::<_, prometheus::Error>(c)
        };

        let cycles = counter("cycles", "Poll cycles completed")?;
        let events_found =
            counter("events_found", "Bridge events found while scanning")?;
        let relays_confirmed =
            counter("relays_confirmed", "Relayed transactions confirmed")?;
        let relays_reverted =
            counter("relays_reverted", "Relayed transactions reverted")?;
        let relays_timed_out = counter(
            "relays_timed_out",
            "Relayed transactions not confirmed in time",
        )?;
        let relays_build_failed = counter(
            "relays_build_failed",
            "Relayed transactions that failed before broadcast",
        )?;
        let decode_errors =
            counter("decode_errors", "Logs that failed to decode")?;
        let skipped_ranges = counter(
            "skipped_ranges",
            "Blocks skipped because the provider rejected the range",
        )?;
        let bridge_watcher_back_off = counter(
            "bridge_watcher_back_off",
            "specifies how many times the bridge watcher backed off",
        )?;
        let last_scanned_block = IntGaugeVec::new(
            opts!("last_scanned_block", "Last block scanned per direction"),
            &["direction"],
        )?;
        registry.register(Box::new(last_scanned_block.clone()))?;

        Ok(Self {
            registry,
            cycles,
            events_found,
            relays_confirmed,
            relays_reverted,
            relays_timed_out,
            relays_build_failed,
            decode_errors,
            skipped_ranges,
            bridge_watcher_back_off,
            last_scanned_block,
        })
    }

    /// Gathers the whole relayer metrics in the prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, GatherMetricsError> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        // Gather the metrics.
        let metric_families = self.registry.gather();
        // Encode them to send.
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

/// Failure while rendering the metrics.
#[derive(Debug, thiserror::Error)]
pub enum GatherMetricsError {
    /// Encoding failed.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// The encoder produced invalid utf8.
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_labeled_by_direction() {
        let metrics = Metrics::new().unwrap();
        metrics
            .relays_confirmed
            .with_label_values(&["source_to_destination"])
            .inc_by(2);
        metrics
            .last_scanned_block
            .with_label_values(&["destination_to_source"])
            .set(42);
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains(
            "warden_relays_confirmed{direction=\"source_to_destination\"} 2"
        ));
        assert!(text.contains(
            "warden_last_scanned_block{direction=\"destination_to_source\"} 42"
        ));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        // Each relayer owns its registry, so two instances can coexist.
        assert!(Metrics::new().is_ok());
        assert!(Metrics::new().is_ok());
    }
}
