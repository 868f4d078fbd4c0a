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
use std::sync::Arc;

use serde::Serialize;
use warden_chain_client::{ChainClient, ChainHandle};
use warden_relayer_types::{BlockBound, ChainRole};
use warden_relayer_utils::{Error, Result};

/// An inclusive block range on one chain, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScanWindow {
    /// The chain the range belongs to.
    pub role: ChainRole,
    /// First block, inclusive.
    pub start: u64,
    /// Last block, inclusive.
    pub end: u64,
}

impl ScanWindow {
    /// A window over `[start, end]`, or [`Error::InvalidRange`] when it
    /// would be empty.
    pub fn new(role: ChainRole, start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { role, start, end })
    }

    fn single(role: ChainRole, block: u64) -> Self {
        Self {
            role,
            start: block,
            end: block,
        }
    }

    /// Whether the window spans exactly one block.
    pub fn is_single_block(&self) -> bool {
        self.start == self.end
    }

    /// The number of blocks in the window.
    pub fn block_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The blocks of the window, one window each.
    pub fn blocks(&self) -> SplitWindows {
        SplitWindows::per_block(*self)
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}..=#{}", self.role, self.start, self.end)
    }
}

/// Splits `window` into the windows actually queried.
///
/// A window with `end - start < max_span` is yielded unchanged, any wider
/// one is yielded block by block, ascending. The sequence is lazy and can
/// be restarted by cloning it.
pub fn split(window: ScanWindow, max_span: u64) -> SplitWindows {
    if window.end - window.start < max_span {
        SplitWindows::whole(window)
    } else {
        SplitWindows::per_block(window)
    }
}

/// The iterator returned by [`split`].
#[derive(Debug, Clone)]
pub struct SplitWindows {
    window: ScanWindow,
    next: Option<u64>,
    whole: bool,
}

impl SplitWindows {
    fn whole(window: ScanWindow) -> Self {
        Self {
            window,
            next: Some(window.start),
            whole: true,
        }
    }

    fn per_block(window: ScanWindow) -> Self {
        Self {
            window,
            next: Some(window.start),
            whole: false,
        }
    }
}

impl Iterator for SplitWindows {
    type Item = ScanWindow;

    fn next(&mut self) -> Option<ScanWindow> {
        let block = self.next?;
        if self.whole {
            self.next = None;
            return Some(self.window);
        }
        self.next = if block < self.window.end {
            Some(block + 1)
        } else {
            None
        };
        Some(ScanWindow::single(self.window.role, block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match (self.next, self.whole) {
            (None, _) => 0,
            (Some(_), true) => 1,
            (Some(block), false) => (self.window.end - block + 1) as usize,
        };
        (remaining, Some(remaining))
    }
}

/// Resolves requested bounds into [`ScanWindow`]s for one chain.
#[derive(Debug, Clone)]
pub struct ScanWindowManager {
    role: ChainRole,
    client: Arc<dyn ChainClient>,
    confirmations: u64,
}

impl ScanWindowManager {
    /// A manager for the chain of `handle`, honouring its confirmation lag.
    pub fn new(handle: &ChainHandle) -> Self {
        Self {
            role: handle.role,
            client: handle.client.clone(),
            confirmations: handle.confirmations,
        }
    }

    /// The highest block considered settled: the head minus the
    /// confirmation lag.
    pub async fn confirmed_head(&self) -> Result<u64> {
        let height = self.client.current_height().await?;
        Ok(height.saturating_sub(self.confirmations))
    }

    /// Resolves `start` and `end` into a window.
    ///
    /// The chain height is read at most once, and only when one of the
    /// bounds is relative to it.
    #[tracing::instrument(skip(self), fields(chain = %self.role))]
    pub async fn compute_window(
        &self,
        start: BlockBound,
        end: BlockBound,
    ) -> Result<ScanWindow> {
        let head = if start.is_relative() || end.is_relative() {
            self.confirmed_head().await?
        } else {
            0
        };
        let window =
            ScanWindow::new(self.role, start.resolve(head), end.resolve(head))?;
        tracing::trace!(%window, head, "Computed scan window");
        Ok(window)
    }
}
