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

use ethers::abi::{encode, Token};
use ethers::types::{Address, Log, H256, U256, U64};

use crate::EventKind;

fn mined(
    contract: Address,
    topics: Vec<H256>,
    data: Vec<u8>,
    block: u64,
    log_index: u64,
) -> Log {
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&block.to_be_bytes());
    seed[8..16].copy_from_slice(&log_index.to_be_bytes());
    seed[16..].copy_from_slice(&contract.as_bytes()[..16]);
    Log {
        address: contract,
        topics,
        data: data.into(),
        block_number: Some(U64::from(block)),
        log_index: Some(U256::from(log_index)),
        transaction_hash: Some(H256::from(seed)),
        transaction_index: Some(U64::zero()),
        ..Default::default()
    }
}

/// A mined `Deposit(token, recipient, amount)` log of `contract`.
pub fn deposit_log(
    contract: Address,
    token: Address,
    recipient: Address,
    amount: U256,
    block: u64,
    log_index: u64,
) -> Log {
    mined(
        contract,
        vec![
            EventKind::Deposit.signature(),
            H256::from(token),
            H256::from(recipient),
        ],
        encode(&[Token::Uint(amount)]),
        block,
        log_index,
    )
}

/// A mined `Unwrap(underlying_token, wrapped_token, frm, to, amount)` log of `contract`.
#[allow(clippy::too_many_arguments)]
pub fn unwrap_log(
    contract: Address,
    underlying_token: Address,
    wrapped_token: Address,
    frm: Address,
    to: Address,
    amount: U256,
    block: u64,
    log_index: u64,
) -> Log {
    mined(
        contract,
        vec![
            EventKind::Unwrap.signature(),
            H256::from(underlying_token),
            H256::from(wrapped_token),
            H256::from(to),
        ],
        encode(&[Token::Address(frm), Token::Uint(amount)]),
        block,
        log_index,
    )
}
