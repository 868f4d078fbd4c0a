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

use std::fmt;

use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, U256};
use serde::Serialize;
use warden_bridge_events::{
    CreateTokenCall, RegisterTokenCall, WithdrawCall, WrapCall,
};
use warden_relayer_types::ChainRole;

/// A call the relayer makes on one of the bridge contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum BridgeCall {
    /// Mint wrapped tokens on the destination chain for a source deposit.
    Wrap {
        /// The source-chain token that was deposited.
        underlying_token: Address,
        /// Who receives the wrapped tokens.
        recipient: Address,
        /// How much to mint.
        amount: U256,
    },
    /// Release underlying tokens on the source chain for a destination unwrap.
    Withdraw {
        /// The source-chain token to release.
        token: Address,
        /// Who receives it.
        recipient: Address,
        /// How much to release.
        amount: U256,
    },
    /// Allow deposits of `token` on the source chain.
    RegisterToken {
        /// The token to allow.
        token: Address,
    },
    /// Deploy the wrapped counterpart of `underlying_token` on the destination chain.
    CreateToken {
        /// The source-chain token.
        underlying_token: Address,
        /// Name of the wrapped token.
        name: String,
        /// Symbol of the wrapped token.
        symbol: String,
    },
}

impl BridgeCall {
    /// The chain whose contract this call goes to.
    pub fn target_role(&self) -> ChainRole {
        match self {
            BridgeCall::Wrap { .. } | BridgeCall::CreateToken { .. } => {
                ChainRole::Destination
            }
            BridgeCall::Withdraw { .. } | BridgeCall::RegisterToken { .. } => {
                ChainRole::Source
            }
        }
    }

    /// The contract function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            BridgeCall::Wrap { .. } => "wrap",
            BridgeCall::Withdraw { .. } => "withdraw",
            BridgeCall::RegisterToken { .. } => "registerToken",
            BridgeCall::CreateToken { .. } => "createToken",
        }
    }

    /// ABI encoded calldata, selector included.
    pub fn calldata(&self) -> Bytes {
        let data = match self.clone() {
            BridgeCall::Wrap {
                underlying_token,
                recipient,
                amount,
            } => WrapCall {
                underlying_token,
                recipient,
                amount,
            }
            .encode(),
            BridgeCall::Withdraw {
                token,
                recipient,
                amount,
            } => WithdrawCall {
                token,
                recipient,
                amount,
            }
            .encode(),
            BridgeCall::RegisterToken { token } => {
                RegisterTokenCall { token }.encode()
            }
            BridgeCall::CreateToken {
                underlying_token,
                name,
                symbol,
            } => CreateTokenCall {
                underlying_token,
                name,
                symbol,
            }
            .encode(),
        };
        data.into()
    }
}

impl fmt::Display for BridgeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeCall::Wrap {
                underlying_token,
                recipient,
                amount,
            } => write!(f, "wrap({underlying_token:?}, {recipient:?}, {amount})"),
            BridgeCall::Withdraw {
                token,
                recipient,
                amount,
            } => write!(f, "withdraw({token:?}, {recipient:?}, {amount})"),
            BridgeCall::RegisterToken { token } => {
                write!(f, "registerToken({token:?})")
            }
            BridgeCall::CreateToken {
                underlying_token,
                name,
                symbol,
            } => write!(f, "createToken({underlying_token:?}, {name:?}, {symbol:?})"),
        }
    }
}
