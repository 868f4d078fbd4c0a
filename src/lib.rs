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

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Warden Relayer Crate 🕸️
//!
//! A relayer for a two-chain token bridge.
//!
//! ## Overview
//!
//! The bridge consists of two contracts. The source contract locks tokens
//! and emits `Deposit`; the destination contract mints wrapped tokens on
//! `wrap` and burns them, emitting `Unwrap`. The relayer is the warden
//! account authorised on both: it watches each chain and answers every
//! event with the matching call on the other one.
//!
//! - `Deposit(token, recipient, amount)` on source becomes
//!   `wrap(token, recipient, amount)` on destination.
//! - `Unwrap(underlying, wrapped, frm, to, amount)` on destination becomes
//!   `withdraw(underlying, to, amount)` on source.
//!
//! Delivery is at least once. Without a watermark store the trailing window
//! is rescanned every cycle, and the contracts are expected to tolerate a
//! repeated call.
//!
//! The crate glues the workspace together: [`service`] starts one watcher
//! per direction and the HTTP API, [`bootstrap`] registers tokens on both
//! chains.

/// Token registration on both chains.
pub mod bootstrap;
/// HTTP handlers of the relayer API.
pub mod handlers;
/// Long running services of the relayer.
pub mod service;

/// A type alias for the result for warden relayer, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, warden_relayer_utils::Error>;
