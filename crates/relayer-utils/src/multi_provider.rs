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

use core::fmt::Debug;
use ethers::providers::{JsonRpcClient, ProviderError};
use futures::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// MultiProvider is a JsonRpcClient that will round-robin requests to the underlying providers.
#[derive(Debug, Clone)]
pub struct MultiProvider<P> {
    providers: Arc<Vec<P>>,
    last_used: Arc<AtomicUsize>,
}

impl<P> MultiProvider<P> {
    /// Creates a new round-robin client over `providers`.
    pub fn new(providers: Arc<Vec<P>>) -> Self {
        Self {
            providers,
            last_used: Default::default(),
        }
    }

    /// Number of underlying endpoints.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if there is no endpoint to talk to.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait::async_trait]
impl<P: JsonRpcClient> JsonRpcClient for MultiProvider<P>
where
    P::Error: Into<ProviderError>,
{
    type Error = ProviderError;

    async fn request<
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    >(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, Self::Error> {
        if self.providers.is_empty() {
            return Err(ProviderError::CustomError(
                "no rpc endpoint configured".into(),
            ));
        }
        // Fetch the next provider index to use
        // incrementing it by 1 and wrapping around if it exceeds the number of providers
        let next_provider_idx = self
            .last_used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last_used| {
                Some(last_used.saturating_add(1) % self.providers.len())
            })
            .unwrap_or_default();

        if let Some(provider) = self.providers.get(next_provider_idx) {
            provider
                .request(method, params)
                .map_err(P::Error::into)
                .await
        } else {
            Err(ProviderError::CustomError(format!(
                "rpc endpoint #{next_provider_idx} not found"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockProvider, Middleware, Provider};
    use ethers::types::U64;

    #[tokio::test]
    async fn should_round_robin_requests() {
        let p1 = MockProvider::new();
        let p2 = MockProvider::new();
        p1.push(U64::from(10)).unwrap();
        p2.push(U64::from(20)).unwrap();

        let multi_provider =
            MultiProvider::new(vec![p1.clone(), p2.clone()].into());
        assert_eq!(multi_provider.len(), 2);
        assert_eq!(multi_provider.last_used.load(Ordering::SeqCst), 0);
        let provider = Provider::new(multi_provider.clone());
        assert_eq!(provider.get_block_number().await.unwrap(), 10.into());
        assert_eq!(multi_provider.last_used.load(Ordering::SeqCst), 1);
        assert_eq!(provider.get_block_number().await.unwrap(), 20.into());
        // back to the first endpoint.
        p1.push(U64::from(11)).unwrap();
        assert_eq!(provider.get_block_number().await.unwrap(), 11.into());
    }

    #[tokio::test]
    async fn empty_provider_list_is_an_error() {
        let multi_provider: MultiProvider<MockProvider> =
            MultiProvider::new(Vec::new().into());
        let provider = Provider::new(multi_provider);
        assert!(provider.get_block_number().await.is_err());
    }
}
