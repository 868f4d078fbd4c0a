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

//! Bindings generated from the parts of the bridge ABIs the relayer uses.
#![allow(missing_docs, clippy::too_many_arguments)]

use ethers::contract::abigen;

abigen!(
    SourceBridgeContract,
    r#"[
        event Deposit(address indexed token, address indexed recipient, uint256 amount)
        function withdraw(address token, address recipient, uint256 amount)
        function registerToken(address token)
    ]"#,
);

abigen!(
    DestinationBridgeContract,
    r#"[
        event Unwrap(address indexed underlying_token, address indexed wrapped_token, address frm, address indexed to, uint256 amount)
        function wrap(address underlying_token, address recipient, uint256 amount)
        function createToken(address underlying_token, string name, string symbol) returns (address)
    ]"#,
);

pub use destination_bridge_contract::{
    CreateTokenCall, DestinationBridgeContract, UnwrapFilter, WrapCall,
};
pub use source_bridge_contract::{
    DepositFilter, RegisterTokenCall, SourceBridgeContract, WithdrawCall,
};
