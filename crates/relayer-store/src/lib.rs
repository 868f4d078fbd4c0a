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

//! # Relayer Store Module 🕸️
//!
//! A module for managing the storage of the relayer.
//!
//! ## Overview
//!
//! The relayer store module remembers, per chain role, the last block a
//! bridge watcher has fully scanned (its watermark), so that a watcher
//! resumes from there instead of rescanning a trailing window.

use std::fmt::Debug;
use std::sync::Arc;

use warden_relayer_types::ChainRole;
use warden_relayer_utils::Result;

/// A module for managing in-memory storage of the relayer.
pub mod mem;
/// A module for setting up and managing a [Sled](https://sled.rs)-based database.
#[cfg(feature = "sled")]
pub mod sled;

/// A store that uses [`sled`](https://sled.rs) as the backend.
#[cfg(feature = "sled")]
pub use self::sled::SledStore;
/// A store that uses in memory data structures as the backend.
pub use mem::InMemoryStore;

/// WatermarkStore is a simple trait for storing and retrieving the last
/// fully scanned block of each chain.
pub trait WatermarkStore: Debug + Send + Sync {
    /// The last block fully scanned on the chain playing `role`, if any.
    fn get_last_scanned(&self, role: ChainRole) -> Result<Option<u64>>;
    /// Records `block_number` as fully scanned on the chain playing `role`.
    fn set_last_scanned(&self, role: ChainRole, block_number: u64) -> Result<()>;
}

impl<S: WatermarkStore + ?Sized> WatermarkStore for Arc<S> {
    fn get_last_scanned(&self, role: ChainRole) -> Result<Option<u64>> {
        S::get_last_scanned(self, role)
    }

    fn set_last_scanned(&self, role: ChainRole, block_number: u64) -> Result<()> {
        S::set_last_scanned(self, role, block_number)
    }
}

/// The key a watermark is stored under.
pub(crate) fn watermark_key(role: ChainRole) -> &'static [u8] {
    match role {
        ChainRole::Source => b"source",
        ChainRole::Destination => b"destination",
    }
}
