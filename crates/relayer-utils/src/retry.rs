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

//! Retry logic for async calls

use std::time::Duration;

use backoff::ExponentialBackoff;

/// The exponential backoff used between failed poll cycles.
///
/// Starts at the polling interval and grows up to `max_interval`; it never
/// gives up, since a watcher only stops on shutdown.
pub fn cycle_backoff(
    polling_interval: Duration,
    max_interval: Duration,
) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: polling_interval,
        current_interval: polling_interval,
        max_interval: max_interval.max(polling_interval),
        max_elapsed_time: None,
        ..Default::default()
    }
}
