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
use serde::Serialize;
use warden_relayer_config::TokenConfig;
use warden_relayer_utils::probe;
use warden_tx_submitter::{BridgeCall, TxOutcome, TxSubmitter};

use crate::service::Bridge;

/// What registering one token did on each chain.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRegistration {
    /// The source-chain token.
    pub token: Address,
    /// `registerToken` on the source chain.
    pub registered: TxOutcome,
    /// `createToken` on the destination chain.
    pub created: TxOutcome,
}

impl TokenRegistration {
    /// Whether both calls were confirmed.
    pub fn is_complete(&self) -> bool {
        self.registered.is_confirmed() && self.created.is_confirmed()
    }
}

/// Registers every token on the source chain and creates its wrapped
/// counterpart on the destination chain.
///
/// Both calls are made for every token, whatever the outcome of the first.
/// An unreachable chain is reported as a build failure of that call.
pub async fn register_tokens(
    bridge: &Bridge,
    submitter: &TxSubmitter,
    tokens: &[TokenConfig],
) -> Vec<TokenRegistration> {
    tracing::info!("Registering {} token(s)", tokens.len());
    let mut registrations = Vec::with_capacity(tokens.len());
    for token in tokens {
        let (name, symbol) = (token.name(), token.symbol());
        tracing::info!("Registering {} on {}", symbol, bridge.source.name());
        let registered = submitter
            .submit(
                &bridge.source,
                BridgeCall::RegisterToken {
                    token: token.address,
                },
            )
            .await
            .unwrap_or_else(TxOutcome::build_failed);
        tracing::info!(
            "Creating wrapped {} on {}",
            symbol,
            bridge.destination.name()
        );
        let created = submitter
            .submit(
                &bridge.destination,
                BridgeCall::CreateToken {
                    underlying_token: token.address,
                    name,
                    symbol: symbol.clone(),
                },
            )
            .await
            .unwrap_or_else(TxOutcome::build_failed);
        let registration = TokenRegistration {
            token: token.address,
            registered,
            created,
        };
        if !registration.is_complete() {
            tracing::warn!(
                registered = %registration.registered.status,
                created = %registration.created.status,
                "Token {} is not fully registered",
                symbol
            );
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            token = ?token.address,
            registered = %registration.registered.status,
            created = %registration.created.status,
        );
        registrations.push(registration);
    }
    registrations
}
