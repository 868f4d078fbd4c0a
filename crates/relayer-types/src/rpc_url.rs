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

use serde::{Deserialize, Serialize, Serializer};

/// An RPC URL Wrapper around [`url::Url`] to support the `serde` deserialization
/// from environment variables.
///
/// Hosted endpoints usually carry the API key in the path or the query, so
/// the `Display`, `Debug` and `Serialize` impls only show the origin.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcUrl(url::Url);

impl RpcUrl {
    /// Returns the inner [`url::Url`].
    pub fn as_url(&self) -> &url::Url {
        &self.0
    }

    /// `scheme://host:port` of the endpoint.
    pub fn origin(&self) -> String {
        let mut out = self.0.scheme().to_string();
        if let Some(host) = self.0.host_str() {
            out.push_str("://");
            out.push_str(host);
        }
        if let Some(port) = self.0.port_or_known_default() {
            out.push_str(&format!(":{port}"));
        }
        out
    }
}

impl std::fmt::Display for RpcUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.origin())?;
        if self.0.path() != "/" || self.0.query().is_some() {
            f.write_str("/…")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RpcUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RpcUrl({self})")
    }
}

impl Serialize for RpcUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<RpcUrl> for url::Url {
    fn from(rpc_url: RpcUrl) -> Self {
        rpc_url.0
    }
}

impl From<url::Url> for RpcUrl {
    fn from(url: url::Url) -> Self {
        RpcUrl(url)
    }
}

impl std::ops::Deref for RpcUrl {
    type Target = url::Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RpcUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RpcUrlVistor;
        impl<'de> serde::de::Visitor<'de> for RpcUrlVistor {
            type Value = url::Url;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "rpc url string or an env var containing a rpc url string in it",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let raw = match value.strip_prefix('$') {
                    Some(var) => {
                        tracing::trace!("Reading {} from env", var);
                        std::env::var(var).map_err(|e| {
                            E::custom(format!(
                                "error while loading this env {var}: {e}",
                            ))
                        })?
                    }
                    None => value.to_string(),
                };
                let url = url::Url::parse(raw.trim())
                    .map_err(|e| E::custom(format!("{e:?}")))?;
                match url.scheme() {
                    "http" | "https" => Ok(url),
                    other => Err(E::custom(format!(
                        "unsupported rpc scheme `{other}`, expected http(s)"
                    ))),
                }
            }
        }

        let rpc_url = deserializer.deserialize_str(RpcUrlVistor)?;
        Ok(Self(rpc_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str) -> Result<RpcUrl, serde_json::Error> {
        serde_json::from_value(serde_json::Value::String(value.into()))
    }

    #[test]
    fn display_hides_api_keys() {
        let url = parse("https://mainnet.infura.io/v3/secret-key").unwrap();
        assert_eq!(url.to_string(), "https://mainnet.infura.io:443/…");
        assert_eq!(url.path(), "/v3/secret-key");
        let bare = parse("http://localhost:8545").unwrap();
        assert_eq!(bare.to_string(), "http://localhost:8545");
    }

    #[test]
    fn reads_from_env() {
        std::env::set_var("WARDEN_TEST_RPC_URL", "http://127.0.0.1:8545");
        let url = parse("$WARDEN_TEST_RPC_URL").unwrap();
        assert_eq!(url.port(), Some(8545));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(parse("ws://localhost:8546").is_err());
        assert!(parse("not a url").is_err());
    }
}
