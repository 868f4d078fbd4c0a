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

use std::time::Duration;

use ethers::providers::{JsonRpcError, ProviderError, RetryPolicy};
use warden_chain_client::is_range_too_large;
use warden_relayer_utils::probe;

/// Implements [RetryPolicy] that will retry requests that errored with
/// status code 429 i.e. TOO_MANY_REQUESTS
///
/// Infura often fails with a `"header not found"` rpc error which is apparently linked to load
/// balancing, which are retried as well.
#[derive(Debug)]
pub struct WardenHttpRetryPolicy {
    err_regex: Option<regex::Regex>,
}

impl WardenHttpRetryPolicy {
    /// Creates the policy.
    pub fn new() -> Self {
        Self {
            err_regex: regex::Regex::new(
                r"(?mixU)\b(?:rate|limit|429|Too \s Many \s Requests)\b",
            )
            .ok(),
        }
    }

    /// Creates the policy, boxed for [`ethers::providers::RetryClientBuilder::build`].
    pub fn boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    // some providers send invalid JSON RPC in the error case (no `id:u64`), but the
    // text should be a `JsonRpcError`
    fn should_retry_serde_error(&self, err: &serde_json::Error) -> bool {
        #[derive(serde::Deserialize)]
        struct Resp {
            error: JsonRpcError,
        }

        let err_text = err.to_string();
        if let Ok(resp) = serde_json::from_str::<Resp>(&err_text) {
            return should_retry_json_rpc_error(&resp.error);
        }

        // last resort: a plain text body mentioning a rate limit.
        let err_text = err_text.to_lowercase();
        let should_retry = self
            .err_regex
            .as_ref()
            .map(|re| re.is_match(&err_text))
            .unwrap_or(false)
            || err_text.starts_with("expected value at line 1 column 1");

        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Retry,
            should_retry = should_retry,
            error = %err_text,
        );
        should_retry
    }
}

impl Default for WardenHttpRetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn should_retry_json_rpc_error(err: &JsonRpcError) -> bool {
    let JsonRpcError { code, message, .. } = err;
    // infura reports oversized log queries with the rate limit code too
    if is_range_too_large(message) {
        return false;
    }

    // alchemy throws it this way
    if *code == 429 {
        return true;
    }

    // This is an infura error code for `exceeded project rate limit`
    if *code == -32005 {
        return true;
    }

    // alternative alchemy error for specific IPs
    if *code == -32016 && message.contains("rate limit") {
        return true;
    }

    match message.as_str() {
        // infura load balancer hiccup
        "header not found" => true,
        // infura, out of daily budget
        "daily request count exceeded, request rate limited" => true,
        _ => false,
    }
}

impl RetryPolicy<ProviderError> for WardenHttpRetryPolicy {
    fn should_retry(&self, error: &ProviderError) -> bool {
        tracing::trace!("should_retry: {:?}", error);
        match error {
            ProviderError::HTTPError(err) => {
                err.status() == Some(http::StatusCode::TOO_MANY_REQUESTS)
            }
            ProviderError::JsonRpcClientError(err) => {
                if let Some(e) = err.as_error_response() {
                    return should_retry_json_rpc_error(e);
                }
                if let Some(e) = err.as_serde_error() {
                    return self.should_retry_serde_error(e);
                }
                false
            }
            ProviderError::SerdeJson(err) => self.should_retry_serde_error(err),
            _ => false,
        }
    }

    fn backoff_hint(&self, error: &ProviderError) -> Option<Duration> {
        const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

        let ProviderError::JsonRpcClientError(err) = error else {
            return Some(DEFAULT_BACKOFF);
        };
        // infura puts the requested backoff in the error data when the
        // daily limit is exceeded
        let backoff_seconds = err
            .as_error_response()
            .and_then(|e| e.data.as_ref())
            .and_then(|data| data.get("rate"))
            .and_then(|rate| rate.get("backoff_seconds"));
        match backoff_seconds {
            Some(v) if v.is_u64() => v.as_u64().map(Duration::from_secs),
            Some(v) => v
                .as_f64()
                .map(|s| Duration::from_secs(s as u64 + 1))
                .or(Some(DEFAULT_BACKOFF)),
            None => Some(DEFAULT_BACKOFF),
        }
    }
}

#[cfg(test)]
mod tests {
    use ethers::providers::HttpClientError;

    use super::*;

    fn rpc_error(
        code: i64,
        message: &str,
        data: Option<serde_json::Value>,
    ) -> ProviderError {
        ProviderError::from(HttpClientError::JsonRpcError(JsonRpcError {
            code,
            message: message.into(),
            data,
        }))
    }

    #[test]
    fn rate_limits_are_retried() {
        let policy = WardenHttpRetryPolicy::new();
        assert!(policy.should_retry(&rpc_error(429, "Too Many Requests", None)));
        assert!(policy.should_retry(&rpc_error(-32005, "limit exceeded", None)));
        assert!(policy.should_retry(&rpc_error(
            -32016,
            "your IP exceeded the rate limit",
            None
        )));
        assert!(policy.should_retry(&rpc_error(-32000, "header not found", None)));
    }

    #[test]
    fn contract_errors_are_not_retried() {
        let policy = WardenHttpRetryPolicy::new();
        assert!(!policy.should_retry(&rpc_error(3, "execution reverted", None)));
        assert!(!policy.should_retry(&rpc_error(
            -32005,
            "query returned more than 10000 results",
            None
        )));
        assert!(!policy.should_retry(&ProviderError::CustomError(
            "no rpc endpoint configured".into()
        )));
    }

    #[test]
    fn plain_text_rate_limit_bodies_are_retried() {
        let policy = WardenHttpRetryPolicy::new();
        let err = serde_json::from_str::<serde_json::Value>("rate limited")
            .unwrap_err();
        assert!(policy.should_retry(&ProviderError::SerdeJson(err)));
    }

    #[test]
    fn backoff_hint_follows_infura() {
        let policy = WardenHttpRetryPolicy::new();
        let data = serde_json::json!({ "rate": { "backoff_seconds": 30 } });
        let err = rpc_error(-32005, "daily request count exceeded", Some(data));
        assert_eq!(policy.backoff_hint(&err), Some(Duration::from_secs(30)));
        let data = serde_json::json!({ "rate": { "backoff_seconds": 1.5 } });
        let err = rpc_error(-32005, "daily request count exceeded", Some(data));
        assert_eq!(policy.backoff_hint(&err), Some(Duration::from_secs(2)));
        let err = rpc_error(429, "Too Many Requests", None);
        assert_eq!(policy.backoff_hint(&err), Some(Duration::from_secs(5)));
    }
}
