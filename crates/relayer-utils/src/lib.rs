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
//! # Relayer Utils 🕸️
//!
//! The error type shared by every warden relayer crate, together with the
//! small helpers (retry strategies, probes, metrics, multi-endpoint
//! provider) the other crates build on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ethers::types::H256;

/// Printing transaction hashes as terminal hyperlinks.
pub mod clickable_link;
/// Metrics functionality
pub mod metric;
/// Multi provider for ethers.
pub mod multi_provider;
/// A module used for debugging relayer lifecycle, scan state, or other relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;

/// An enum of all possible errors that could be encountered during the execution of the
/// Warden Relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// HTTP Error
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    /// Elliptic Curve error.
    #[error(transparent)]
    EllipticCurve(#[from] ethers::core::k256::elliptic_curve::Error),
    /// Error in Http Provider (ethers client).
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Ether wallet errors.
    #[error(transparent)]
    EtherWalletError(#[from] ethers::signers::WalletError),
    /// ABI encoding or decoding error.
    #[error(transparent)]
    Abi(#[from] ethers::abi::Error),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// Prometheus registry error.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// A chain role is missing from the configuration.
    #[error("Chain not configured: {}", role)]
    ChainNotConfigured {
        /// The role of the missing chain.
        role: String,
    },
    /// Missing Secrets in the config (the warden private key).
    #[error("Missing required private-key in the config")]
    MissingSecrets,
    /// The configured contract ABI does not describe a required item.
    #[error("ABI of the {} contract has no `{}`", role, signature)]
    AbiMismatch {
        /// The role of the chain whose ABI is wrong.
        role: String,
        /// The canonical signature that was not found.
        signature: String,
    },
    /// A configured value is outside of its valid range.
    #[error("Invalid configuration: {}", _0)]
    InvalidConfig(String),
    /// The RPC endpoint is unreachable, timed out or returned garbage.
    #[error("Connectivity error on {} while calling {}: {}", chain, method, reason)]
    Connectivity {
        /// The chain the call was made against.
        chain: String,
        /// The RPC method.
        method: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// The node answered a call with a JSON-RPC error, e.g. a revert
    /// during gas estimation. Asking again gives the same answer.
    #[error("{} rejected {}: {}", chain, method, reason)]
    CallRejected {
        /// The chain the call was made against.
        chain: String,
        /// The RPC method.
        method: &'static str,
        /// The node's message.
        reason: String,
    },
    /// The provider refused the requested log range.
    #[error("Provider rejected log range #{}..=#{}: {}", from, to, reason)]
    RangeTooLarge {
        /// First block of the rejected range.
        from: u64,
        /// Last block of the rejected range.
        to: u64,
        /// The provider's message.
        reason: String,
    },
    /// A resolved scan window ends before it starts.
    #[error("Invalid block range: end #{} < start #{}", end, start)]
    InvalidRange {
        /// Resolved start block.
        start: u64,
        /// Resolved end block.
        end: u64,
    },
    /// A raw log could not be decoded into a bridge event.
    #[error("Failed to decode log: {}", _0)]
    Decode(String),
    /// A broadcast transaction was not included within the timeout.
    #[error("Tx 0x{:x} not confirmed after {}s", tx_hash, timeout_secs)]
    ConfirmationTimeout {
        /// The hash of the broadcast transaction.
        tx_hash: H256,
        /// The timeout that elapsed.
        timeout_secs: u64,
    },
    /// a backgorund task failed and stopped Abnormally.
    #[error("Task Stopped Apnormally")]
    TaskStoppedAbnormally,
}

impl Error {
    /// Whether the error is a transient connectivity failure, after which
    /// the whole cycle should be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connectivity { .. }
                | Error::EthersProvider(_)
                | Error::Io(_)
                | Error::Hyper(_)
        )
    }
}

/// A type alias for the result for warden relayer, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for HandlerError {
    fn from(value: Error) -> Self {
        HandlerError(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}

/// Error type for HTTP handlers
pub struct HandlerError(
    /// HTTP status code for response
    pub StatusCode,
    /// Response message
    pub String,
);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connectivity_errors_are_retryable() {
        let connectivity = Error::Connectivity {
            chain: "source".into(),
            method: "eth_blockNumber",
            reason: "timed out".into(),
        };
        assert!(connectivity.is_retryable());
        assert!(!Error::Decode("bad topic".into()).is_retryable());
        assert!(!Error::CallRejected {
            chain: "destination".into(),
            method: "eth_estimateGas",
            reason: "execution reverted".into(),
        }
        .is_retryable());
        assert!(!Error::InvalidRange { start: 10, end: 5 }.is_retryable());
        assert!(!Error::RangeTooLarge {
            from: 1,
            to: 100,
            reason: "too many".into()
        }
        .is_retryable());
    }
}
