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

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use warden_relayer_types::rpc_url::RpcUrl;

use crate::defaults;

/// One or many http(s) endpoints of the same chain.
///
/// Requests round-robin over the list when more than one is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpEndpoint {
    /// Single http endpoint
    Single(RpcUrl),
    /// Multiple http endpoints
    Multiple(Vec<RpcUrl>),
}

impl HttpEndpoint {
    /// Every configured endpoint, in order.
    pub fn urls(&self) -> Vec<RpcUrl> {
        match self {
            HttpEndpoint::Single(url) => vec![url.clone()],
            HttpEndpoint::Multiple(urls) => urls.clone(),
        }
    }
}

/// Configuration for one side of the bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    /// String that groups configuration for this chain on a human-readable name.
    #[serde(default)]
    pub name: String,
    /// chain specific id (output of chainId opcode on EVM networks)
    ///
    /// When left out it is asked from the endpoint at startup.
    #[serde(rename(serialize = "chainId"))]
    pub chain_id: Option<u64>,
    /// Http(s) Endpoint(s) for quick Req/Res
    #[serde(alias = "http_endpoint")]
    pub http_endpoint: HttpEndpoint,
    /// Block Explorer for this chain.
    ///
    /// Optional, and only used for printing a clickable links
    /// for transactions.
    #[serde(skip_serializing)]
    pub explorer: Option<url::Url>,
    /// The address of the bridge contract on this chain.
    pub address: Address,
    /// The JSON ABI of the bridge contract, checked against the events and
    /// calls the relayer needs.
    #[serde(default, skip_serializing)]
    pub abi: Option<serde_json::Value>,
    /// How many blocks behind the head are considered settled.
    #[serde(
        default = "defaults::block_confirmations",
        rename(serialize = "blockConfirmations")
    )]
    pub block_confirmations: u64,
}
