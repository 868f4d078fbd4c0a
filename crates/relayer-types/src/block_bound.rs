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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A requested edge of a block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockBound {
    /// The latest block, lagged by the chain's confirmation count.
    #[default]
    Latest,
    /// `k` blocks behind [`BlockBound::Latest`], saturating at zero.
    BehindLatest(u64),
    /// An absolute block number.
    Number(u64),
}

impl BlockBound {
    /// Resolves the bound against the confirmed head of the chain.
    pub fn resolve(self, confirmed_head: u64) -> u64 {
        match self {
            BlockBound::Latest => confirmed_head,
            BlockBound::BehindLatest(k) => confirmed_head.saturating_sub(k),
            BlockBound::Number(n) => n,
        }
    }

    /// Whether resolving this bound needs the current chain height.
    pub fn is_relative(self) -> bool {
        !matches!(self, BlockBound::Number(_))
    }
}

impl From<u64> for BlockBound {
    fn from(n: u64) -> Self {
        BlockBound::Number(n)
    }
}

impl fmt::Display for BlockBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockBound::Latest => f.write_str("latest"),
            BlockBound::BehindLatest(k) => write!(f, "latest-{k}"),
            BlockBound::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for BlockBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(BlockBound::Latest);
        }
        if let Some(k) = s
            .get(..7)
            .filter(|p| p.eq_ignore_ascii_case("latest-"))
            .map(|_| &s[7..])
        {
            return k
                .trim()
                .parse()
                .map(BlockBound::BehindLatest)
                .map_err(|e| format!("invalid offset in `{s}`: {e}"));
        }
        s.parse().map(BlockBound::Number).map_err(|_| {
            format!("`{s}` is not a block number, `latest` or `latest-<k>`")
        })
    }
}

impl Serialize for BlockBound {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockBound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct BlockBoundVisitor;
        impl<'de> serde::de::Visitor<'de> for BlockBoundVisitor {
            type Value = BlockBound;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str("a block number, `latest` or `latest-<k>`")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(BlockBound::Number(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(BlockBound::Number)
                    .map_err(|_| E::custom("block numbers are never negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }
        deserializer.deserialize_any(BlockBoundVisitor)
    }
}
