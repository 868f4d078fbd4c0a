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
//! # Bridge Events 🕸️
//!
//! Typed bindings of the source and destination bridge contracts, and the
//! decoder turning their raw `Deposit` / `Unwrap` logs into [`BridgeEvent`]s.

use derive_more::Display;
use ethers::abi::RawLog;
use ethers::contract::{EthEvent, EthLogDecode};
use ethers::types::{Address, Log, H256, U256};
use serde::Serialize;
use warden_relayer_utils::{Error, Result};

/// Generated contract bindings.
pub mod contracts;
/// Builders of raw logs, for tests.
#[cfg(any(test, feature = "mock"))]
pub mod fixtures;

pub use contracts::*;

/// The two event shapes the relayer watches.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// `Deposit(token, recipient, amount)` on the source chain.
    #[display(fmt = "Deposit")]
    Deposit,
    /// `Unwrap(underlying_token, wrapped_token, frm, to, amount)` on the destination chain.
    #[display(fmt = "Unwrap")]
    Unwrap,
}

impl EventKind {
    /// keccak256 of the event signature, the expected `topic0`.
    pub fn signature(self) -> H256 {
        match self {
            EventKind::Deposit => DepositFilter::signature(),
            EventKind::Unwrap => UnwrapFilter::signature(),
        }
    }
}

/// A decoded bridge event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeEvent {
    /// Which event this is.
    pub kind: EventKind,
    /// The token to act on: the deposited token, or the underlying token of an unwrap.
    pub token: Address,
    /// The destination-local wrapped token of an unwrap, for diagnostics only.
    pub counterpart_token: Option<Address>,
    /// Who receives the tokens on the other chain.
    pub recipient: Address,
    /// The amount, forwarded as is (zero included).
    pub amount: U256,
    /// The transaction that emitted the event.
    pub source_tx_hash: H256,
    /// The block that included it.
    pub source_block_number: u64,
    /// Position of the log in its block.
    pub log_index: u64,
}

/// Decodes `log` as an event of kind `expected`.
///
/// Fails with [`Error::Decode`] when `topic0` is not the signature of
/// `expected`, when topics or data do not match the event ABI, or when the
/// log is still pending (no block number or transaction hash).
pub fn decode(log: &Log, expected: EventKind) -> Result<BridgeEvent> {
    match log.topics.first() {
        Some(topic0) if *topic0 == expected.signature() => {}
        Some(topic0) => {
            return Err(Error::Decode(format!(
                "topic0 {topic0:?} is not the {expected} signature"
            )))
        }
        None => {
            return Err(Error::Decode(format!(
                "log without topics, expected {expected}"
            )))
        }
    }
    let source_block_number = log
        .block_number
        .ok_or_else(|| Error::Decode("pending log without block number".into()))?
        .as_u64();
    let source_tx_hash = log.transaction_hash.ok_or_else(|| {
        Error::Decode("pending log without transaction hash".into())
    })?;
    let log_index = log.log_index.unwrap_or_default().low_u64();
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let malformed =
        |e: ethers::abi::Error| Error::Decode(format!("malformed {expected} log: {e}"));
    let event = match expected {
        EventKind::Deposit => {
            let ev = <DepositFilter as EthLogDecode>::decode_log(&raw)
                .map_err(malformed)?;
            BridgeEvent {
                kind: expected,
                token: ev.token,
                counterpart_token: None,
                recipient: ev.recipient,
                amount: ev.amount,
                source_tx_hash,
                source_block_number,
                log_index,
            }
        }
        EventKind::Unwrap => {
            // `frm` is the burner on the destination chain, it plays no part
            // in the withdrawal.
            let ev = <UnwrapFilter as EthLogDecode>::decode_log(&raw)
                .map_err(malformed)?;
            BridgeEvent {
                kind: expected,
                token: ev.underlying_token,
                counterpart_token: Some(ev.wrapped_token),
                recipient: ev.to,
                amount: ev.amount,
                source_tx_hash,
                source_block_number,
                log_index,
            }
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{deposit_log, unwrap_log};
    use ethers::abi::AbiDecode;
    use ethers::abi::AbiEncode;
    use ethers::contract::EthCall;
    use warden_relayer_config::abi::required_signatures;
    use warden_relayer_types::ChainRole;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[test]
    fn decodes_deposit() {
        let log = deposit_log(addr(0x01), addr(0xaa), addr(0xbb), 500.into(), 12, 3);
        let ev = decode(&log, EventKind::Deposit).unwrap();
        assert_eq!(ev.kind, EventKind::Deposit);
        assert_eq!(ev.token, addr(0xaa));
        assert_eq!(ev.recipient, addr(0xbb));
        assert_eq!(ev.amount, U256::from(500));
        assert_eq!(ev.counterpart_token, None);
        assert_eq!(ev.source_block_number, 12);
        assert_eq!(ev.log_index, 3);
        assert_eq!(Some(ev.source_tx_hash), log.transaction_hash);
    }

    #[test]
    fn decodes_unwrap_and_ignores_frm() {
        let log = unwrap_log(
            addr(0x02),
            addr(0xcc),
            addr(0xee),
            addr(0xff),
            addr(0xdd),
            7.into(),
            40,
            0,
        );
        let ev = decode(&log, EventKind::Unwrap).unwrap();
        assert_eq!(ev.token, addr(0xcc));
        assert_eq!(ev.counterpart_token, Some(addr(0xee)));
        assert_eq!(ev.recipient, addr(0xdd));
        assert_eq!(ev.amount, U256::from(7));
    }

    #[test]
    fn zero_amount_and_zero_address_survive() {
        let log = deposit_log(
            addr(0x01),
            Address::zero(),
            Address::zero(),
            U256::zero(),
            1,
            0,
        );
        let ev = decode(&log, EventKind::Deposit).unwrap();
        assert_eq!(ev.token, Address::zero());
        assert_eq!(ev.recipient, Address::zero());
        assert!(ev.amount.is_zero());
    }

    #[test]
    fn wrong_topic0_is_rejected() {
        let log = deposit_log(addr(0x01), addr(0xaa), addr(0xbb), 1.into(), 1, 0);
        assert!(matches!(
            decode(&log, EventKind::Unwrap),
            Err(Error::Decode(_))
        ));
        let mut no_topics = log.clone();
        no_topics.topics.clear();
        assert!(matches!(
            decode(&no_topics, EventKind::Deposit),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn malformed_and_pending_logs_are_rejected() {
        let log = deposit_log(addr(0x01), addr(0xaa), addr(0xbb), 1.into(), 1, 0);
        let mut truncated = log.clone();
        truncated.data = vec![0u8; 5].into();
        assert!(matches!(
            decode(&truncated, EventKind::Deposit),
            Err(Error::Decode(_))
        ));
        let mut missing_topic = log.clone();
        missing_topic.topics.pop();
        assert!(decode(&missing_topic, EventKind::Deposit).is_err());
        let mut pending = log.clone();
        pending.block_number = None;
        assert!(decode(&pending, EventKind::Deposit).is_err());
        let mut no_hash = log;
        no_hash.transaction_hash = None;
        assert!(decode(&no_hash, EventKind::Deposit).is_err());
    }

    #[test]
    fn bindings_match_required_abi_items() {
        let source = [
            format!("event {}", DepositFilter::abi_signature()),
            format!("function {}", WithdrawCall::abi_signature()),
            format!("function {}", RegisterTokenCall::abi_signature()),
        ];
        let destination = [
            format!("event {}", UnwrapFilter::abi_signature()),
            format!("function {}", WrapCall::abi_signature()),
            format!("function {}", CreateTokenCall::abi_signature()),
        ];
        assert_eq!(required_signatures(ChainRole::Source), source);
        assert_eq!(required_signatures(ChainRole::Destination), destination);
    }

    #[test]
    fn wrap_calldata_starts_with_selector() {
        let call = WrapCall {
            underlying_token: addr(0xaa),
            recipient: addr(0xbb),
            amount: 500.into(),
        };
        let data = call.clone().encode();
        assert_eq!(&data[..4], &WrapCall::selector());
        assert_eq!(WrapCall::decode(&data).unwrap(), call);
    }
}
