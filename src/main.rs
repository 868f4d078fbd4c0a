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

//! Warden Relayer Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use tokio::signal::unix;

use warden_relayer::bootstrap::register_tokens;
use warden_relayer::service::{self, Bridge};
use warden_relayer_config::cli::{create_store, load_config, setup_logger, Opts};
use warden_relayer_context::RelayerContext;
use warden_tx_submitter::TxSubmitter;

/// The main entry point for the relayer.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose)?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;
    config.verify()?;

    let ctx = RelayerContext::new(config)?;
    let bridge = Bridge::connect(&ctx).await?;

    if args.register_tokens {
        let submitter = TxSubmitter::new(ctx.config.tx.into());
        let registrations =
            register_tokens(&bridge, &submitter, &ctx.config.tokens).await;
        let incomplete = registrations.iter().filter(|r| !r.is_complete()).count();
        if incomplete > 0 {
            anyhow::bail!("{incomplete} token(s) were not fully registered");
        }
        tracing::info!("All tokens registered");
        return Ok(());
    }

    // persistent storage for the relayer
    let store = create_store(&args, &ctx.config)?;

    if args.is_one_shot() {
        let summaries = service::run_once(
            &ctx,
            &bridge,
            store,
            args.watch,
            args.from_block,
            args.to_block,
        )
        .await?;
        for summary in summaries {
            println!("{}", serde_json::to_string(&summary)?);
        }
        return Ok(());
    }

    let server_handle = tokio::spawn(service::build_web_services(ctx.clone()));
    // start all background services.
    // this does not block, will fire the services on background tasks.
    let watchers = service::ignite(&ctx, &bridge, store, args.watch);
    tracing::event!(
        target: warden_relayer_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %warden_relayer_utils::probe::Kind::Lifecycle,
        started = true
    );
    // watch for signals
    let mut ctrlc_signal = unix::signal(unix::SignalKind::interrupt())?;
    let mut termination_signal = unix::signal(unix::SignalKind::terminate())?;
    let mut quit_signal = unix::signal(unix::SignalKind::quit())?;
    tokio::select! {
        _ = ctrlc_signal.recv() => {
            tracing::warn!("Interrupted (Ctrl+C) ...");
        },
        _ = termination_signal.recv() => {
            tracing::warn!("Got Terminate signal ...");
        },
        _ = quit_signal.recv() => {
            tracing::warn!("Quitting ...");
        },
    }
    tracing::event!(
        target: warden_relayer_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %warden_relayer_utils::probe::Kind::Lifecycle,
        shutdown = true
    );
    tracing::warn!("Shutting down...");
    // send shutdown signal to all of the application.
    ctx.shutdown();
    // watchers stop between cycles, so an in flight relay is followed up.
    for result in futures::future::join_all(watchers).await {
        match result {
            Ok(Err(e)) => tracing::error!("Watcher stopped with error: {}", e),
            Err(e) => tracing::error!("Watcher task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }
    if let Ok(Err(e)) = server_handle.await {
        tracing::error!("Server stopped with error: {}", e);
    }
    tracing::info!("Clean Exit ..");
    Ok(())
}
