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

/// The default port the relayer will listen on. Defaults to 9955.
pub const fn relayer_port() -> u16 {
    9955
}
/// Blocks behind the confirmed head scanned each cycle when no watermark is kept.
pub const fn trailing_blocks() -> u64 {
    5
}
/// Windows spanning at least this many blocks are queried one block at a time.
pub const fn max_span() -> u64 {
    30
}
/// Milliseconds between two poll cycles.
pub const fn polling_interval() -> u64 {
    5_000
}
/// Cap on the blocks a single watermark-driven cycle scans.
pub const fn max_blocks_per_cycle() -> u64 {
    500
}
/// Milliseconds the exponential back off may grow to after failed cycles.
pub const fn max_backoff_interval() -> u64 {
    60_000
}
/// Gas limit is the estimate times this.
pub const fn gas_multiplier() -> f64 {
    1.2
}
/// Seconds to wait for a receipt before giving up on a transaction.
pub const fn receipt_timeout() -> u64 {
    120
}
/// Milliseconds between two receipt polls.
pub const fn receipt_poll_interval() -> u64 {
    1_000
}
/// Seconds a single RPC call may take.
pub const fn rpc_timeout() -> u64 {
    30
}
/// No confirmation lag by default.
pub const fn block_confirmations() -> u64 {
    0
}
