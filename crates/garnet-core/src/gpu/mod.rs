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

//! Contracts for GPU resource lifetime management: opaque handles, typed
//! descriptors, deferred commands, and the backend trait every native
//! graphics implementation fulfills.

pub mod backend;
pub mod command;
pub mod error;
pub mod handle;
pub mod resource;
pub mod settings;

pub use backend::{GpuBackend, NativeResourceId};
pub use command::{FenceId, GpuCommand, ReadbackResult, SurfaceUpdateFlag};
pub use error::{BackendError, ResourceError};
pub use handle::GpuResourceHandle;
pub use resource::{
    BufferDesc, GpuResource, GpuResourceDesc, GpuResourceFactory, GpuResourceType, KernelDesc,
    PortBindingDesc, TextureDesc, TextureFormat, UniformDesc,
};
pub use settings::GpuSettings;
