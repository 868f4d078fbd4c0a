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

use crate::{WardenRelayerConfig, WatermarkBackend};
use anyhow::Context;
use directories_next::ProjectDirs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use structopt::StructOpt;
use warden_relayer_store::{InMemoryStore, SledStore, WatermarkStore};
use warden_relayer_types::{BlockBound, ChainRole};

/// Package identifier, where the default configuration & database are defined.
/// If the user does not start the relayer with the `--config-dir`
/// it will default to read from the default location depending on the OS.
pub const PACKAGE_ID: [&str; 3] = ["tools", "warden", "warden-relayer"];

/// The Warden Relayer Command-line tool
///
/// Start the relayer from a config file:
///
/// $ warden-relayer -vvv -c <CONFIG_DIR_PATH>
#[derive(StructOpt, Debug, Default)]
#[structopt(name = "Warden Relayer")]
pub struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: i32,
    /// Directory that contains configration files.
    #[structopt(
        short = "c",
        long = "config-dir",
        value_name = "PATH",
        parse(from_os_str)
    )]
    pub config_dir: Option<PathBuf>,
    /// Create the Database Store in a temporary directory.
    /// and will be deleted when the process exits.
    #[structopt(long)]
    pub tmp: bool,
    /// Run a single scan cycle per direction and exit.
    #[structopt(long)]
    pub once: bool,
    /// First block of an explicit one-shot range (`latest`, `latest-<k>` or a number).
    #[structopt(long, value_name = "BLOCK")]
    pub from_block: Option<BlockBound>,
    /// Last block of an explicit one-shot range (`latest`, `latest-<k>` or a number).
    #[structopt(long, value_name = "BLOCK")]
    pub to_block: Option<BlockBound>,
    /// Only watch one chain (`source` or `destination`).
    #[structopt(long, value_name = "ROLE")]
    pub watch: Option<ChainRole>,
    /// Register the configured tokens on both chains and exit.
    #[structopt(long)]
    pub register_tokens: bool,
}

impl Opts {
    /// Whether the relayer should scan once and exit.
    pub fn is_one_shot(&self) -> bool {
        self.once || self.from_block.is_some() || self.to_block.is_some()
    }
}

/// Loads the configuration from the given directory.
///
/// Returns `Ok(Config)` on success, or `Err(anyhow::Error)` on failure.
///
/// # Arguments
///
/// * `config_dir` - An optional `PathBuf` representing the directory that contains the configuration.
///
/// # Example
///
/// ```no_run
/// # use std::path::PathBuf;
/// # use warden_relayer_config::cli::load_config;
/// let arg = Some(PathBuf::from("/tmp/config"));
/// let config = load_config(arg)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config<P>(
    config_dir: Option<P>,
) -> Result<WardenRelayerConfig, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::debug!("Getting default dirs for warden relayer");
    let dirs = ProjectDirs::from(PACKAGE_ID[0], PACKAGE_ID[1], PACKAGE_ID[2])
        .context("failed to get config")?;
    let path = match config_dir {
        Some(p) => p.as_ref().to_path_buf(),
        None => dirs.config_dir().to_path_buf(),
    };
    // return an error if the path is not a directory.
    if !path.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", path.display()));
    }
    tracing::trace!("Loading Config from {} ..", path.display());
    let v = crate::utils::load(path)?;
    tracing::trace!("Config loaded..");
    Ok(v)
}

/// Sets up the logger for the relayer, based on the verbosity level passed in.
///
/// Returns `Ok(())` on success, or `Err(anyhow::Error)` on failure.
///
/// # Arguments
///
/// * `verbosity` - An i32 integer representing the verbosity level.
///
/// # Examples
///
/// ```no_run
/// # use warden_relayer_config::cli::setup_logger;
/// let arg = 3;
/// setup_logger(arg)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn setup_logger(verbosity: i32) -> anyhow::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for krate in [
        "warden_relayer",
        "warden_bridge_watcher",
        "warden_tx_submitter",
        "warden_chain_client",
        warden_relayer_utils::probe::TARGET,
    ] {
        env_filter = env_filter.add_directive(format!("{krate}={log_level}").parse()?);
    }
    let logger = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter);
    // if we are not compiling for integration tests, we should use pretty logs
    #[cfg(not(feature = "integration-tests"))]
    let logger = logger.pretty();
    // otherwise, we should use json, which is easy to parse.
    #[cfg(feature = "integration-tests")]
    let logger = logger.json().flatten_event(true).with_current_span(false);

    logger
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set up the logger: {e}"))?;
    Ok(())
}

/// Creates the watermark store selected in the configuration.
///
/// Returns `Ok(None)` when watermarks are disabled, and the sled store lives
/// next to the config dir (or in the OS data dir) unless `--tmp` is passed.
///
/// # Arguments
///
/// * `opts` - The command line options.
/// * `config` - The loaded configuration.
pub fn create_store(
    opts: &Opts,
    config: &WardenRelayerConfig,
) -> anyhow::Result<Option<Arc<dyn WatermarkStore>>> {
    let store: Arc<dyn WatermarkStore> = match config.watermark {
        WatermarkBackend::Disabled => return Ok(None),
        WatermarkBackend::Memory => Arc::new(InMemoryStore::default()),
        // check if we shall use the temp dir.
        WatermarkBackend::Sled if opts.tmp => {
            tracing::debug!("Using temp dir for store");
            Arc::new(SledStore::temporary()?)
        }
        WatermarkBackend::Sled => {
            let dirs =
                ProjectDirs::from(PACKAGE_ID[0], PACKAGE_ID[1], PACKAGE_ID[2])
                    .context("failed to get config")?;
            let p = match opts.config_dir.as_ref() {
                Some(p) => p.to_path_buf(),
                None => dirs.data_local_dir().to_path_buf(),
            };
            let db_path = match opts.config_dir.as_ref().zip(p.parent()) {
                Some((_, parent)) => parent.join("store"),
                None => p.join("store"),
            };
            tracing::debug!("Opening store at {}", db_path.display());
            Arc::new(SledStore::open(db_path)?)
        }
    };
    Ok(Some(store))
}
