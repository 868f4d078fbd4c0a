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

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ethers::types::Address;
use serde::Serialize;
use warden_chain_client::{LocalWalletSigner, TxSigner};
use warden_relayer_config::WardenRelayerConfig;
use warden_relayer_context::RelayerContext;
use warden_relayer_utils::HandlerError;

/// Response of `GET /api/v1/info`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerInformationResponse {
    /// The configuration, without secrets or endpoint paths.
    #[serde(flatten)]
    pub config: WardenRelayerConfig,
    /// The warden account.
    pub warden: Option<Address>,
}

/// Handles relayer configuration requests
///
/// Returns the non-secret part of the configuration and the warden address.
pub async fn handle_relayer_info(
    State(ctx): State<Arc<RelayerContext>>,
) -> Json<RelayerInformationResponse> {
    let warden = ctx
        .config
        .private_key
        .as_ref()
        .and_then(|key| LocalWalletSigner::new(key).ok())
        .map(|signer| signer.address());
    Json(RelayerInformationResponse {
        config: ctx.config.clone(),
        warden,
    })
}

/// Handles relayer metric requests
///
/// Returns the prometheus text exposition of the relayer's metrics.
pub async fn handle_metric_info(
    State(ctx): State<Arc<RelayerContext>>,
) -> Result<String, HandlerError> {
    ctx.metrics.gather_metrics().map_err(|e| {
        HandlerError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}
