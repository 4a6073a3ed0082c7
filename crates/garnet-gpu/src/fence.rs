// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The draw-fence counter shared between producers and the dispatch thread.

use garnet_core::FenceId;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter of consumer-side render progress.
///
/// Only the consumer advances it; producers read it to pick fence values for
/// submissions. Reads are relaxed on purpose: a stale value can only make a
/// producer pick a fence that is already satisfied or delay a command by a
/// tick, never reorder execution, because fence comparison is monotone and
/// one-directional.
#[derive(Debug, Default)]
pub struct FenceCounter {
    value: AtomicU64,
}

impl FenceCounter {
    /// Creates a counter starting at zero, the value
    /// [`FenceId::IMMEDIATE`] always satisfies.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently completed fence.
    pub fn current(&self) -> FenceId {
        FenceId(self.value.load(Ordering::Relaxed))
    }

    /// Marks one more unit of consumer work complete and returns the new
    /// fence. Consumer-thread only.
    pub fn advance(&self) -> FenceId {
        FenceId(self.value.fetch_add(1, Ordering::Release) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_the_always_satisfied_fence() {
        let fence = FenceCounter::new();
        assert_eq!(fence.current(), FenceId::IMMEDIATE);
    }

    #[test]
    fn advance_is_monotone() {
        let fence = FenceCounter::new();
        assert_eq!(fence.advance(), FenceId(1));
        assert_eq!(fence.advance(), FenceId(2));
        assert_eq!(fence.current(), FenceId(2));
    }
}
