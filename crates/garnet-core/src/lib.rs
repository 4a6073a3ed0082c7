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

//! # Garnet Core
//!
//! Foundational crate containing the GPU resource data model, traits, and
//! interface contracts shared by the resource database, the command
//! dispatcher, and the concrete backends.

#![warn(missing_docs)]

pub mod gpu;
pub mod sync;
pub mod telemetry;

pub use gpu::{
    BackendError, BufferDesc, FenceId, GpuBackend, GpuCommand, GpuResource, GpuResourceDesc,
    GpuResourceFactory, GpuResourceHandle, GpuResourceType, GpuSettings, KernelDesc,
    NativeResourceId, PortBindingDesc, ReadbackResult, ResourceError, SurfaceUpdateFlag,
    TextureDesc, TextureFormat, UniformDesc,
};
pub use sync::SpinLock;
