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

//! Types shared between the configuration and the runtime crates.

use derive_more::Display;
use ethers::providers;
use serde::{Deserialize, Serialize};
use warden_relayer_utils::multi_provider::MultiProvider;

pub use block_bound::BlockBound;

pub mod block_bound;
pub mod private_key;
pub mod rpc_url;

/// Ethereum client using Ethers, that includes a retry strategy and
/// round-robins over every configured endpoint.
pub type EthersClient =
    providers::Provider<providers::RetryClient<MultiProvider<providers::Http>>>;

/// The role a chain plays in the bridge.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    /// The chain holding the locked underlying tokens.
    #[display(fmt = "source")]
    Source,
    /// The chain minting the wrapped tokens.
    #[display(fmt = "destination")]
    Destination,
}

impl ChainRole {
    /// Both roles, source first.
    pub const ALL: [ChainRole; 2] = [ChainRole::Source, ChainRole::Destination];

    /// The other side of the bridge.
    pub fn opposite(self) -> Self {
        match self {
            ChainRole::Source => ChainRole::Destination,
            ChainRole::Destination => ChainRole::Source,
        }
    }
}

impl std::str::FromStr for ChainRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "src" => Ok(ChainRole::Source),
            "destination" | "dest" | "dst" => Ok(ChainRole::Destination),
            other => Err(format!(
                "unknown chain role `{other}`, expected `source` or `destination`"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_swaps_roles() {
        assert_eq!(ChainRole::Source.opposite(), ChainRole::Destination);
        assert_eq!(ChainRole::Destination.opposite(), ChainRole::Source);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!("Source".parse::<ChainRole>(), Ok(ChainRole::Source));
        assert_eq!("dst".parse::<ChainRole>(), Ok(ChainRole::Destination));
        assert!("sideways".parse::<ChainRole>().is_err());
        assert_eq!(ChainRole::Destination.to_string(), "destination");
        let json = serde_json::to_string(&ChainRole::Source).unwrap();
        assert_eq!(json, "\"source\"");
    }
}
