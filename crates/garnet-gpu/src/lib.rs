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

//! # Garnet GPU
//!
//! Resource lifetime management and cross-thread command dispatch: the
//! handle-table database with its factory registry, the device-memory
//! footprint cache, the fence-gated command buffer, and the dispatcher that
//! drains it on the render thread.
//!
//! Producers interact through [`GpuContext`]; exactly one consumer thread
//! (spawned via [`DispatchThread`] or driven manually through
//! [`CommandDispatcher`]) executes the deferred work against a
//! [`GpuBackend`](garnet_core::GpuBackend).

#![warn(missing_docs)]

pub mod cache;
pub mod command_buffer;
pub mod context;
pub mod database;
pub mod dispatcher;
pub mod fence;
pub mod resources;
pub mod telemetry;

pub use cache::{GraphicsResourceItem, ResourceCache};
pub use command_buffer::ResourceCommandBuffer;
pub use context::GpuContext;
pub use database::{CreatedResource, GpuResourceDatabase};
pub use dispatcher::{CommandDispatcher, DispatchThread};
pub use fence::FenceCounter;
