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

//! Deferred resource commands and the fence values that gate them.

use crate::gpu::error::ResourceError;
use crate::gpu::handle::GpuResourceHandle;
use crate::gpu::resource::GpuResourceDesc;
use std::fmt;

/// A point in the consumer thread's render progress.
///
/// The fence counter increases monotonically as the render thread completes
/// units of work (typically one tick per frame). A command tagged with a
/// fence value is never executed before the counter has reached it.
/// Producers may read the counter without locking: a stale value only delays
/// a command, never reorders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FenceId(pub u64);

impl FenceId {
    /// The fence value every drain satisfies: the command runs at the next
    /// dispatch opportunity.
    pub const IMMEDIATE: FenceId = FenceId(0);
}

impl fmt::Display for FenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fence {}", self.0)
    }
}

/// How an update interacts with data the device may still be reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceUpdateFlag {
    /// No promise made; the backend synchronizes as needed.
    Default,
    /// The whole previous content may be thrown away.
    Discard,
    /// The caller promises not to touch bytes the device is reading.
    NoOverwrite,
}

/// Result of a deferred readback, delivered over the command's reply channel.
pub type ReadbackResult = Result<Vec<u8>, ResourceError>;

/// A deferred resource operation, executed on the dispatch thread once its
/// fence requirement is met.
///
/// One variant per opcode. Variable-length payloads are owned by the command
/// (`Update` deep-copies the caller's bytes at submission), so a command
/// outlives the producer's stack frame and frees its payload when executed
/// or dropped.
#[derive(Debug)]
pub enum GpuCommand {
    /// Create the native object backing `handle`.
    Create {
        /// Database handle the native object will be associated with.
        handle: GpuResourceHandle,
        /// Creation parameters forwarded to the backend.
        desc: GpuResourceDesc,
    },
    /// Write bytes into the native object backing `handle`.
    Update {
        /// Target resource.
        handle: GpuResourceHandle,
        /// Byte offset of the write.
        offset: u64,
        /// The bytes to write, owned by the command.
        data: Vec<u8>,
        /// Synchronization promise for the write.
        flag: SurfaceUpdateFlag,
    },
    /// Destroy the native object backing `handle`.
    Destroy {
        /// Target resource.
        handle: GpuResourceHandle,
    },
    /// Read the native object's bytes back and deliver them to the producer.
    Readback {
        /// Target resource.
        handle: GpuResourceHandle,
        /// Channel the result is delivered on. A dropped receiver is
        /// tolerated; the result is discarded.
        reply: flume::Sender<ReadbackResult>,
    },
}

impl GpuCommand {
    /// The resource this command targets.
    pub fn handle(&self) -> GpuResourceHandle {
        match self {
            GpuCommand::Create { handle, .. }
            | GpuCommand::Update { handle, .. }
            | GpuCommand::Destroy { handle }
            | GpuCommand::Readback { handle, .. } => *handle,
        }
    }

    /// Short opcode name for logs.
    pub fn opcode(&self) -> &'static str {
        match self {
            GpuCommand::Create { .. } => "create",
            GpuCommand::Update { .. } => "update",
            GpuCommand::Destroy { .. } => "destroy",
            GpuCommand::Readback { .. } => "readback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::resource::GpuResourceType;

    #[test]
    fn fence_ids_order_numerically() {
        assert!(FenceId(2) < FenceId(5));
        assert!(FenceId::IMMEDIATE <= FenceId(0));
    }

    #[test]
    fn command_exposes_target_handle_and_opcode() {
        let handle = GpuResourceHandle::new(GpuResourceType::Buffer, 3);
        let cmd = GpuCommand::Update {
            handle,
            offset: 16,
            data: vec![0xAB; 8],
            flag: SurfaceUpdateFlag::Discard,
        };
        assert_eq!(cmd.handle(), handle);
        assert_eq!(cmd.opcode(), "update");
    }
}
