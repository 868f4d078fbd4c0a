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
//! # Bridge Watcher 🕸️
//!
//! Watches one side of the bridge for `Deposit` or `Unwrap` events and
//! relays each of them as the matching call on the other side.
//!
//! Two pieces live here:
//!
//! - [`ScanWindowManager`] turns requested [`BlockBound`]s into concrete,
//!   confirmed block ranges and [`split`]s them into queryable windows.
//! - [`RelayOrchestrator`] is the per-direction loop: scan, decode, relay,
//!   then sleep until the next cycle.
//!
//! [`BlockBound`]: warden_relayer_types::BlockBound

mod orchestrator;
mod window;

pub use orchestrator::{CycleSummary, Direction, RelayOrchestrator, RelayState};
pub use window::{split, ScanWindow, ScanWindowManager, SplitWindows};

#[cfg(test)]
mod tests;
