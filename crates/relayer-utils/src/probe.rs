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

use derive_more::Display;
/// Target for logger
pub const TARGET: &str = "warden_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relayer changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// A watcher scanned a block window on a specific chain.
    #[display(fmt = "scan")]
    Scan,
    /// A decoded bridge event was turned into an outbound call.
    #[display(fmt = "relay")]
    Relay,
    /// Transaction submission state on a specific chain.
    #[display(fmt = "tx_submit")]
    TxSubmit,
    /// When the relayer will retry to do something.
    #[display(fmt = "retry")]
    Retry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_as_snake_case() {
        assert_eq!(Kind::Lifecycle.to_string(), "lifecycle");
        assert_eq!(Kind::TxSubmit.to_string(), "tx_submit");
        assert_eq!(Kind::Retry.to_string(), "retry");
    }
}
