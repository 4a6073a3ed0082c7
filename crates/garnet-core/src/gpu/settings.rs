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

//! Global settings for the GPU resource core.

use serde::{Deserialize, Serialize};

/// A collection of settings that shape resource tracking and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuSettings {
    /// Poll cadence of the dispatch thread in milliseconds. Each poll drains
    /// every eligible command and then advances the draw fence once.
    pub dispatch_poll_ms: u64,
    /// Queue depth at which the command buffer starts logging warnings. The
    /// queue itself is unbounded; this only surfaces a producer outrunning
    /// the dispatch thread.
    pub pending_warn_threshold: usize,
    /// Optional soft budget for estimated device memory. Exceeding it logs a
    /// warning per allocation; nothing is evicted automatically.
    pub memory_budget_bytes: Option<u64>,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            dispatch_poll_ms: 2,
            pending_warn_threshold: 4096,
            memory_budget_bytes: None,
        }
    }
}
