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

//! The contract between the command dispatcher and a concrete graphics
//! backend.

use crate::gpu::command::SurfaceUpdateFlag;
use crate::gpu::error::BackendError;
use crate::gpu::resource::GpuResourceDesc;
use std::fmt::Debug;

/// Identifier a backend assigns to a native object it created.
///
/// Opaque outside the backend; the dispatcher maps database handles to these
/// and never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeResourceId(pub u64);

/// The contract every concrete graphics backend fulfills.
///
/// All methods are invoked from a single consumer thread (native graphics
/// devices of this engine's generation have single-thread affinity), so
/// implementations may assume calls never overlap, but must still be
/// `Send + Sync` to travel into that thread.
pub trait GpuBackend: Send + Sync + Debug {
    /// Short backend name for logs (e.g. `"headless"`).
    fn name(&self) -> &str;

    /// Creates the native object described by `descriptor`.
    /// ## Returns
    /// A `Result` containing the backend's id for the new object, or an
    /// error if the native allocation fails.
    /// ## Errors
    /// * `BackendError::AllocationFailed` - if the native API rejects the
    ///   creation parameters or is out of device memory.
    fn create_resource(&self, descriptor: &GpuResourceDesc)
        -> Result<NativeResourceId, BackendError>;

    /// Writes `data` into the native object at byte `offset`.
    /// ## Arguments
    /// * `flag` - the caller's synchronization promise for the write.
    /// ## Errors
    /// * `BackendError::UnknownResource` - if `id` is not live.
    /// * `BackendError::OutOfBounds` - if the write exceeds the storage.
    fn update_resource(
        &self,
        id: NativeResourceId,
        offset: u64,
        data: &[u8],
        flag: SurfaceUpdateFlag,
    ) -> Result<(), BackendError>;

    /// Destroys the native object.
    /// ## Errors
    /// * `BackendError::UnknownResource` - if `id` is not live.
    fn destroy_resource(&self, id: NativeResourceId) -> Result<(), BackendError>;

    /// Reads the native object's full contents back into CPU memory.
    /// ## Errors
    /// * `BackendError::UnknownResource` - if `id` is not live.
    /// * `BackendError::Unsupported` - if the resource kind has no byte
    ///   storage to read.
    fn read_back(&self, id: NativeResourceId) -> Result<Vec<u8>, BackendError>;
}
