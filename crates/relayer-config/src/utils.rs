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

use config::{Config, File};
use std::path::{Path, PathBuf};

use crate::WardenRelayerConfig;

/// The prefix of environment variables overriding file configuration, as in
/// `WARDEN__TX__GAS_MULTIPLIER=1.5`.
pub const ENV_PREFIX: &str = "WARDEN";

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(
    base_dir: P,
) -> warden_relayer_utils::Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(warden_relayer_utils::Error::from))
        .collect()
}

/// Try to parse the [`WardenRelayerConfig`] from the given config file(s).
///
/// TOML files are merged first and JSON files after them, so a
/// `contract_info.json` holding `{ "source": { "address", "abi" }, .. }`
/// completes the chain sections of the TOML configuration.
pub fn parse_from_files(
    files: &[PathBuf],
) -> warden_relayer_utils::Result<WardenRelayerConfig> {
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        // get file extension
        let ext = config_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    // also merge in the environment (with a prefix of WARDEN).
    let builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX).separator("__"),
    );
    let cfg = builder.build()?;
    // and finally deserialize the config and post-process it
    let config: Result<
        WardenRelayerConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Load the configuration files and
///
/// Returns `Ok(WardenRelayerConfig)` on success, or `Err(Error)` on failure.
///
/// # Arguments
///
/// * `path` - The path to the configuration directory
///
/// # Example
///
/// ```no_run
/// use warden_relayer_config::utils::load;
///
/// let path = "/path/to/config";
/// let _ = load(path);
/// ```
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> warden_relayer_utils::Result<WardenRelayerConfig> {
    let mut files = search_config_files(path)?;
    // toml first, so json contract info lands on top of it.
    files.sort_by_key(|p| {
        (p.extension().map_or(true, |e| e != "toml"), p.clone())
    });
    parse_from_files(&files)
}

/// The postloading_process exists to validate configuration and standardize
/// the format of the configuration
pub fn postloading_process(
    mut config: WardenRelayerConfig,
) -> warden_relayer_utils::Result<WardenRelayerConfig> {
    tracing::trace!("Checking configration sanity ...");
    for (role, chain) in [
        ("source", config.source.as_mut()),
        ("destination", config.destination.as_mut()),
    ] {
        if let Some(chain) = chain {
            if chain.name.trim().is_empty() {
                chain.name = role.to_string();
            }
            if chain.abi.is_none() {
                tracing::warn!(
                    "!!WARNING!!: no ABI configured for the {} contract ({:?}), \
                    it will not be checked at startup",
                    role,
                    chain.address
                );
            }
        }
    }
    if let (Some(src), Some(dst)) = (&config.source, &config.destination) {
        if src.chain_id.is_some() && src.chain_id == dst.chain_id {
            tracing::warn!(
                "!!WARNING!!: source and destination share chain id {:?}",
                src.chain_id
            );
        }
    }

    tracing::trace!(
        "postloaded config: {}",
        serde_json::to_string_pretty(&config)?
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_contract_info_completes_toml() {
        let dir = tempfile::tempdir().unwrap();
        let mut toml = std::fs::File::create(dir.path().join("main.toml")).unwrap();
        writeln!(
            toml,
            r#"
private-key = "0x8917174396171783496173419137618235192359106130478137647163400318"

[source]
name = "fuji"
http-endpoint = "http://localhost:8545"

[destination]
http-endpoint = "http://localhost:9545"
chain-id = 97

[scan]
max-span = 10
"#
        )
        .unwrap();
        let mut json =
            std::fs::File::create(dir.path().join("contract_info.json")).unwrap();
        writeln!(
            json,
            r#"{{
  "source": {{ "address": "0x00000000000000000000000000000000000000aa" }},
  "destination": {{ "address": "0x00000000000000000000000000000000000000bb" }}
}}"#
        )
        .unwrap();

        let config = load(dir.path()).unwrap();
        let src = config.source.unwrap();
        let dst = config.destination.unwrap();
        assert_eq!(src.name, "fuji");
        assert_eq!(dst.name, "destination");
        assert_eq!(dst.chain_id, Some(97));
        assert_eq!(src.address, ethers::types::Address::from_low_u64_be(0xaa));
        assert_eq!(config.scan.max_span, 10);
        assert_eq!(config.scan.trailing_blocks, 5);
    }

    #[test]
    fn unknown_directory_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert!(config.source.is_none());
        assert!(config.verify().is_err());
    }
}
