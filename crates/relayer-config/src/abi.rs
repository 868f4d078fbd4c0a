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

//! Checking a JSON contract ABI against the items the relayer calls.

use std::collections::BTreeSet;

use serde_json::Value;
use warden_relayer_types::ChainRole;
use warden_relayer_utils::Error;

/// Events and functions the source contract must expose.
pub const SOURCE_REQUIRED: &[&str] = &[
    "event Deposit(address,address,uint256)",
    "function withdraw(address,address,uint256)",
    "function registerToken(address)",
];

/// Events and functions the destination contract must expose.
pub const DESTINATION_REQUIRED: &[&str] = &[
    "event Unwrap(address,address,address,address,uint256)",
    "function wrap(address,address,uint256)",
    "function createToken(address,string,string)",
];

/// What a contract playing `role` must expose.
pub fn required_signatures(role: ChainRole) -> &'static [&'static str] {
    match role {
        ChainRole::Source => SOURCE_REQUIRED,
        ChainRole::Destination => DESTINATION_REQUIRED,
    }
}

fn canonical_type(param: &Value) -> Result<String, Error> {
    let ty = param
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidConfig("abi parameter without a type".into()))?;
    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let components = param
                .get("components")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    Error::InvalidConfig("tuple parameter without components".into())
                })?;
            let inner = components
                .iter()
                .map(canonical_type)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({}){}", inner.join(","), suffix))
        }
        None => Ok(ty.to_string()),
    }
}

/// Every event and function of a JSON ABI as `"<kind> name(type,..)"`.
pub fn canonical_signatures(abi: &Value) -> Result<BTreeSet<String>, Error> {
    // Hardhat/foundry artifacts wrap the ABI in an object.
    let items = match abi {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("abi")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidConfig("abi is not an array".into()))?,
        _ => return Err(Error::InvalidConfig("abi is not an array".into())),
    };
    let mut out = BTreeSet::new();
    for item in items {
        let kind = match item.get("type").and_then(Value::as_str) {
            Some(k @ ("event" | "function")) => k,
            _ => continue,
        };
        let Some(name) = item.get("name").and_then(Value::as_str) else {
            continue;
        };
        let inputs = match item.get("inputs").and_then(Value::as_array) {
            Some(inputs) => inputs
                .iter()
                .map(canonical_type)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        out.insert(format!("{kind} {name}({})", inputs.join(",")));
    }
    Ok(out)
}

/// Fails with [`Error::AbiMismatch`] on the first required item `abi` lacks.
pub fn verify_abi(role: ChainRole, abi: &Value) -> Result<(), Error> {
    let available = canonical_signatures(abi)?;
    match required_signatures(role)
        .iter()
        .find(|sig| !available.contains(**sig))
    {
        Some(missing) => Err(Error::AbiMismatch {
            role: role.to_string(),
            signature: (*missing).to_string(),
        }),
        None => Ok(()),
    }
}
