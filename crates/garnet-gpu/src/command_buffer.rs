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

//! The cross-thread queue of deferred resource commands.

use garnet_core::{FenceId, GpuCommand};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;

/// Queue depth at which [`ResourceCommandBuffer::submit`] starts warning
/// when no explicit threshold was configured.
const DEFAULT_PENDING_WARN: usize = 4096;

/// A command waiting in the queue, keyed for fence-then-submission ordering.
#[derive(Debug)]
struct PendingCommand {
    wait_fence: FenceId,
    seq: u64,
    command: GpuCommand,
}

impl PendingCommand {
    fn key(&self) -> (FenceId, u64) {
        (self.wait_fence, self.seq)
    }
}

// Ordering ignores the payload: two commands never share a sequence number,
// so the key alone is a total order.
impl PartialEq for PendingCommand {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PendingCommand {}

impl PartialOrd for PendingCommand {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingCommand {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<Reverse<PendingCommand>>,
    next_seq: u64,
}

/// The queue decoupling the thread that decides a resource operation is
/// needed from the thread that performs it against the native device.
///
/// Commands are delivered **in fence order first, submission order second,
/// never ahead of their fence**: [`pop_ready`](Self::pop_ready) returns the
/// eligible command with the smallest `(wait_fence, submission)` key, so a
/// command posted later but whose fence is already satisfied overtakes an
/// earlier one still waiting on future render progress. Internally that is a
/// min-heap on the same key, making each operation `O(log n)` rather than a
/// scan of the whole queue.
///
/// The queue is unbounded; `submit` never blocks on depth. Backpressure is
/// out of scope for engine-internal traffic, but crossing the configured
/// warn threshold is logged so a stalled consumer is visible.
#[derive(Debug)]
pub struct ResourceCommandBuffer {
    state: Mutex<QueueState>,
    pending_warn: usize,
}

impl ResourceCommandBuffer {
    /// Creates an empty buffer with the default warn threshold.
    pub fn new() -> Self {
        Self::with_pending_warn(DEFAULT_PENDING_WARN)
    }

    /// Creates an empty buffer warning once the queue holds `threshold`
    /// commands.
    pub fn with_pending_warn(threshold: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            pending_warn: threshold,
        }
    }

    /// Appends a command gated on `wait_fence`.
    ///
    /// May be called from any number of producer threads; their interleaving
    /// is serialized here, so submission order is only well-defined
    /// per producer thread.
    pub fn submit(&self, wait_fence: FenceId, command: GpuCommand) {
        log::trace!(
            "queueing {} of {:?} gated on {wait_fence}",
            command.opcode(),
            command.handle()
        );
        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(PendingCommand {
            wait_fence,
            seq,
            command,
        }));
        let depth = state.heap.len();
        if depth == self.pending_warn {
            log::warn!(
                "resource command queue reached {depth} pending commands; \
                 is the dispatch thread stalled?"
            );
        }
    }

    /// Removes and returns the next command whose fence requirement
    /// `wait_fence <= current_fence` is satisfied.
    ///
    /// Returns `None`, leaving the queue untouched, when the queue is
    /// empty or every command is still fence-blocked.
    pub fn pop_ready(&self, current_fence: FenceId) -> Option<GpuCommand> {
        let mut state = self.state.lock().unwrap();
        match state.heap.peek() {
            Some(Reverse(pending)) if pending.wait_fence <= current_fence => {
                state.heap.pop().map(|Reverse(pending)| pending.command)
            }
            _ => None,
        }
    }

    /// Discards every queued command.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        let dropped = state.heap.len();
        state.heap.clear();
        if dropped > 0 {
            log::debug!("cleared {dropped} pending resource commands");
        }
    }

    /// Number of commands currently queued, eligible or not.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().heap.len()
    }

    /// `true` if no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceCommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}
