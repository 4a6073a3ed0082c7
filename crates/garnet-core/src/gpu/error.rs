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

//! Error types for the resource database and the backend boundary.
//!
//! Errors are local and terminal: the layer that detects a failure logs it
//! and returns it to its direct caller; nothing is retried and nothing
//! aborts the process.

use crate::gpu::backend::NativeResourceId;
use crate::gpu::handle::GpuResourceHandle;
use crate::gpu::resource::GpuResourceType;
use std::fmt;

/// An error raised by the resource database or its factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No factory is registered for the requested resource type.
    UnregisteredType(GpuResourceType),
    /// A factory for the type is already registered; the existing one is kept.
    DuplicateFactory(GpuResourceType),
    /// The creation descriptor was malformed (wrong variant for the type,
    /// zero-sized extent, or otherwise rejected by the footprint estimate).
    InvalidDescriptor(String),
    /// The handle does not name a live resource (deleted, reused, or forged).
    StaleHandle(GpuResourceHandle),
    /// An error reported by the native backend.
    Backend(BackendError),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::UnregisteredType(ty) => {
                write!(f, "no factory registered for {ty} resources")
            }
            ResourceError::DuplicateFactory(ty) => {
                write!(f, "a factory for {ty} resources is already registered")
            }
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "invalid resource descriptor: {msg}")
            }
            ResourceError::StaleHandle(handle) => {
                write!(f, "handle {handle:?} does not name a live resource")
            }
            ResourceError::Backend(err) => write!(f, "backend operation failed: {err}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for ResourceError {
    fn from(err: BackendError) -> Self {
        ResourceError::Backend(err)
    }
}

/// An error originating from a concrete graphics backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not allocate the native object.
    AllocationFailed(String),
    /// The native resource id is not known to the backend.
    UnknownResource(NativeResourceId),
    /// A write or read fell outside the resource's storage.
    OutOfBounds {
        /// Requested starting byte.
        offset: u64,
        /// Requested byte count.
        len: u64,
        /// Actual storage size of the resource.
        size: u64,
    },
    /// The operation is not supported for this resource kind.
    Unsupported(String),
    /// The native device was lost; the engine must reinitialize.
    DeviceLost,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::AllocationFailed(msg) => {
                write!(f, "native allocation failed: {msg}")
            }
            BackendError::UnknownResource(id) => {
                write!(f, "unknown native resource {id:?}")
            }
            BackendError::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "access of {len} bytes at offset {offset} exceeds resource size {size}"
                )
            }
            BackendError::Unsupported(msg) => write!(f, "unsupported operation: {msg}"),
            BackendError::DeviceLost => write!(f, "the native graphics device was lost"),
        }
    }
}

impl std::error::Error for BackendError {}
