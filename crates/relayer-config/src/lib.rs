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

//! # Relayer Configuration Module 🕸️
//!
//! A module for configuring the relayer.
//!
//! ## Overview
//!
//! The relayer configuration module is responsible for configuring the relayer.
//! Possible configuration include:
//! * `port`: The port the relayer will listen on. Defaults to 9955
//! * `source` / `destination`: the two bridge chains and their contracts.
//!   See [config/local](../../config/local) for an example.
//! * `private-key`: the warden key signing on both chains.
//! * `scan`, `tx`, `watermark`: tuning of the watchers and the submitter.
//! * `tokens`: tokens registered on both sides by `--register-tokens`.

/// Contract ABI checks
pub mod abi;
/// Bridge chain configuration
pub mod chain;
/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Default values for the configuration
pub mod defaults;
/// Utils for processing configuration
pub mod utils;

use std::time::Duration;

use chain::ChainConfig;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use warden_relayer_types::private_key::PrivateKey;
use warden_relayer_types::ChainRole;

/// WardenRelayerConfig is the configuration for the warden relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WardenRelayerConfig {
    /// Metrics/info HTTP Server Port number
    ///
    /// default to 9955
    #[serde(default = "defaults::relayer_port", skip_serializing)]
    pub port: u16,
    /// The chain the underlying tokens live on.
    pub source: Option<ChainConfig>,
    /// The chain the wrapped tokens are minted on.
    pub destination: Option<ChainConfig>,
    /// The Private Key of the warden account, used on both chains.
    /// the format is more dynamic here:
    /// 1. if it starts with '0x' then this would be raw (64 bytes) hex encoded
    ///    private key.
    ///    Example: 0x8917174396171783496173419137618235192359106130478137647163400318
    ///
    /// 2. if it starts with '$' then it would be considered as an Enviroment variable
    ///    of a hex-encoded private key.
    ///   Example: $WARDEN_PRIVATE_KEY
    ///
    /// 3. if it starts with '@' then the rest is a path to a file whose first
    ///    line is the hex-encoded private key.
    ///   Example: @/run/secrets/warden.key
    #[serde(skip_serializing, alias = "private_key")]
    pub private_key: Option<PrivateKey>,
    /// Scanning configuration.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Transaction submission configuration.
    #[serde(default)]
    pub tx: TxConfig,
    /// Where the last scanned block of each chain is remembered.
    #[serde(default)]
    pub watermark: WatermarkBackend,
    /// Tokens to register on both chains with `--register-tokens`.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl Default for WardenRelayerConfig {
    fn default() -> Self {
        Self {
            port: defaults::relayer_port(),
            source: None,
            destination: None,
            private_key: None,
            scan: ScanConfig::default(),
            tx: TxConfig::default(),
            watermark: WatermarkBackend::default(),
            tokens: Vec::new(),
        }
    }
}

impl WardenRelayerConfig {
    /// The configuration of the chain playing `role`.
    pub fn chain(
        &self,
        role: ChainRole,
    ) -> warden_relayer_utils::Result<&ChainConfig> {
        let chain = match role {
            ChainRole::Source => self.source.as_ref(),
            ChainRole::Destination => self.destination.as_ref(),
        };
        chain.ok_or_else(|| warden_relayer_utils::Error::ChainNotConfigured {
            role: role.to_string(),
        })
    }

    /// Makes sure that the config is valid, by going
    /// through the whole config and doing some basic checks.
    pub fn verify(&self) -> warden_relayer_utils::Result<()> {
        use warden_relayer_utils::Error;
        for role in ChainRole::ALL {
            let chain = self.chain(role)?;
            if chain.http_endpoint.urls().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{role} chain has no http-endpoint"
                )));
            }
            if chain.address == Address::zero() {
                return Err(Error::InvalidConfig(format!(
                    "{role} bridge address is the zero address"
                )));
            }
            match &chain.abi {
                Some(abi) => abi::verify_abi(role, abi)?,
                None => tracing::debug!(
                    "No ABI configured for the {role} contract, skipping the check"
                ),
            }
        }
        if self.private_key.is_none() {
            return Err(Error::MissingSecrets);
        }
        self.scan.verify()?;
        self.tx.verify()?;
        Ok(())
    }
}

/// ScanConfig is the configuration for the bridge watchers.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Blocks behind the head rescanned each cycle when no watermark is kept.
    #[serde(
        default = "defaults::trailing_blocks",
        rename(serialize = "trailingBlocks")
    )]
    pub trailing_blocks: u64,
    /// Windows spanning this many blocks or more are queried block by block.
    #[serde(default = "defaults::max_span", rename(serialize = "maxSpan"))]
    pub max_span: u64,
    /// Milliseconds between two poll cycles.
    #[serde(
        default = "defaults::polling_interval",
        rename(serialize = "pollingInterval")
    )]
    pub polling_interval: u64,
    /// Cap on blocks scanned in one cycle when catching up from a watermark.
    #[serde(
        default = "defaults::max_blocks_per_cycle",
        rename(serialize = "maxBlocksPerCycle")
    )]
    pub max_blocks_per_cycle: u64,
    /// Upper bound, in milliseconds, of the back off after failed cycles.
    #[serde(
        default = "defaults::max_backoff_interval",
        rename(serialize = "maxBackoffInterval")
    )]
    pub max_backoff_interval: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            trailing_blocks: defaults::trailing_blocks(),
            max_span: defaults::max_span(),
            polling_interval: defaults::polling_interval(),
            max_blocks_per_cycle: defaults::max_blocks_per_cycle(),
            max_backoff_interval: defaults::max_backoff_interval(),
        }
    }
}

impl ScanConfig {
    /// Polling interval as a [`Duration`].
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval)
    }

    /// Back off cap as a [`Duration`].
    pub fn max_backoff_interval(&self) -> Duration {
        Duration::from_millis(self.max_backoff_interval)
    }

    fn verify(&self) -> warden_relayer_utils::Result<()> {
        if self.max_span == 0 || self.max_blocks_per_cycle == 0 {
            return Err(warden_relayer_utils::Error::InvalidConfig(
                "scan.max-span and scan.max-blocks-per-cycle must be positive"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// TxConfig is the configuration for the transaction submitter.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TxConfig {
    /// The gas limit is the node's estimate times this multiplier.
    #[serde(
        default = "defaults::gas_multiplier",
        rename(serialize = "gasMultiplier")
    )]
    pub gas_multiplier: f64,
    /// Seconds to wait for a receipt.
    #[serde(
        default = "defaults::receipt_timeout",
        rename(serialize = "receiptTimeout")
    )]
    pub receipt_timeout: u64,
    /// Milliseconds between receipt polls.
    #[serde(
        default = "defaults::receipt_poll_interval",
        rename(serialize = "receiptPollInterval")
    )]
    pub receipt_poll_interval: u64,
    /// Seconds a single RPC call may take.
    #[serde(
        default = "defaults::rpc_timeout",
        rename(serialize = "rpcTimeout")
    )]
    pub rpc_timeout: u64,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            gas_multiplier: defaults::gas_multiplier(),
            receipt_timeout: defaults::receipt_timeout(),
            receipt_poll_interval: defaults::receipt_poll_interval(),
            rpc_timeout: defaults::rpc_timeout(),
        }
    }
}

impl TxConfig {
    /// Receipt timeout as a [`Duration`].
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout)
    }

    /// Receipt poll interval as a [`Duration`].
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval)
    }

    /// Per-call RPC timeout as a [`Duration`].
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout)
    }

    fn verify(&self) -> warden_relayer_utils::Result<()> {
        if !(self.gas_multiplier > 1.0 && self.gas_multiplier.is_finite()) {
            return Err(warden_relayer_utils::Error::InvalidConfig(format!(
                "tx.gas-multiplier must be greater than 1.0, got {}",
                self.gas_multiplier
            )));
        }
        if self.receipt_poll_interval == 0 || self.rpc_timeout == 0 {
            return Err(warden_relayer_utils::Error::InvalidConfig(
                "tx.receipt-poll-interval and tx.rpc-timeout must be positive"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// Where the watchers remember the last block they scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkBackend {
    /// Nothing is remembered, every cycle rescans the trailing window.
    #[default]
    Disabled,
    /// Remembered for the lifetime of the process.
    Memory,
    /// Remembered on disk.
    Sled,
}

/// A token to register on the source chain and mirror on the destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TokenConfig {
    /// The underlying token on the source chain.
    pub address: Address,
    /// Name of the wrapped token, `Token-<last 4 hex>` when left out.
    pub name: Option<String>,
    /// Symbol of the wrapped token, `T<last 4 hex>` when left out.
    pub symbol: Option<String>,
}

impl TokenConfig {
    fn suffix(&self) -> String {
        let hex = format!("{:x}", self.address);
        hex[hex.len() - 4..].to_string()
    }

    /// The configured name or the derived default.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Token-{}", self.suffix()))
    }

    /// The configured symbol or the derived default.
    pub fn symbol(&self) -> String {
        self.symbol
            .clone()
            .unwrap_or_else(|| format!("T{}", self.suffix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const KEY: &str =
        "0x8917174396171783496173419137618235192359106130478137647163400318";

    fn config_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
    }

    fn minimal() -> serde_json::Value {
        serde_json::json!({
            "private-key": KEY,
            "source": {
                "name": "src",
                "http-endpoint": "http://localhost:8545",
                "address": "0x00000000000000000000000000000000000000aa"
            },
            "destination": {
                "name": "dst",
                "http-endpoint": ["http://localhost:9545", "http://localhost:9546"],
                "address": "0x00000000000000000000000000000000000000bb",
                "block-confirmations": 3
            }
        })
    }

    #[test]
    fn all_config_files_are_correct() {
        // Every directory under the shipped config dir must load and verify.
        let config_dirs = std::fs::read_dir(config_root())
            .expect("Failed to read config directory")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();
        assert!(
            !config_dirs.is_empty(),
            "No config directories found in the config directory"
        );
        std::env::set_var("WARDEN_PRIVATE_KEY", KEY);
        for config_subdir in config_dirs {
            let _ = dotenv::from_path(config_subdir.join(".env.example"));
            let config = utils::load(&config_subdir).unwrap_or_else(|e| {
                panic!("Failed to parse config file in directory: {config_subdir:?} with error: {e}")
            });
            config.verify().unwrap_or_else(|e| {
                panic!("Config in {config_subdir:?} does not verify: {e}")
            });
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config: WardenRelayerConfig =
            serde_json::from_value(minimal()).unwrap();
        config.verify().unwrap();
        assert_eq!(config.port, 9955);
        assert_eq!(config.scan.trailing_blocks, 5);
        assert_eq!(config.scan.max_span, 30);
        assert_eq!(config.tx.gas_multiplier, 1.2);
        assert_eq!(config.tx.receipt_timeout(), Duration::from_secs(120));
        assert_eq!(config.watermark, WatermarkBackend::Disabled);
        let dst = config.chain(ChainRole::Destination).unwrap();
        assert_eq!(dst.http_endpoint.urls().len(), 2);
        assert_eq!(dst.block_confirmations, 3);
        assert_eq!(
            config.chain(ChainRole::Source).unwrap().block_confirmations,
            0
        );
    }

    #[test]
    fn missing_chain_is_fatal() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("destination");
        let config: WardenRelayerConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.verify(),
            Err(warden_relayer_utils::Error::ChainNotConfigured { .. })
        ));
    }

    #[test]
    fn missing_key_is_fatal() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("private-key");
        let config: WardenRelayerConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.verify(),
            Err(warden_relayer_utils::Error::MissingSecrets)
        ));
    }

    #[test]
    fn gas_multiplier_must_exceed_one() {
        let mut value = minimal();
        value["tx"] = serde_json::json!({ "gas-multiplier": 1.0 });
        let config: WardenRelayerConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.verify(),
            Err(warden_relayer_utils::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn incomplete_abi_is_fatal() {
        let mut value = minimal();
        value["source"]["abi"] = serde_json::json!([]);
        let config: WardenRelayerConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.verify(),
            Err(warden_relayer_utils::Error::AbiMismatch { .. })
        ));
    }

    #[test]
    fn token_names_default_to_address_suffix() {
        let token: TokenConfig = serde_json::from_value(serde_json::json!({
            "address": "0x0000000000000000000000000000000000c0ffee"
        }))
        .unwrap();
        assert_eq!(token.name(), "Token-ffee");
        assert_eq!(token.symbol(), "Tffee");
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config: WardenRelayerConfig =
            serde_json::from_value(minimal()).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("8917174396"));
        assert!(!json.contains("private"));
    }
}
