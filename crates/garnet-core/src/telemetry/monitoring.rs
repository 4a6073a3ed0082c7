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

//! Resource usage monitoring interfaces.
//!
//! These traits let monitoring code observe the resource cache's accounting
//! without depending on its implementation, and let the cache stay ignorant
//! of who is watching it.

use std::any::Any;
use std::borrow::Cow;
use std::fmt::Debug;

/// The kind of resource pool a monitor reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredResourceType {
    /// Estimated native device memory held by GPU resources.
    DeviceMemory,
    /// CPU-side memory held by the resource subsystem itself.
    SystemMemory,
}

/// A snapshot of a monitored resource pool's usage.
///
/// All figures are estimates: the cache's accounting is intentionally
/// conservative rather than exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsageReport {
    /// Bytes currently in use.
    pub current_bytes: u64,
    /// Highest value `current_bytes` has ever reached, if tracked.
    pub peak_bytes: Option<u64>,
    /// Configured capacity or budget of the pool, if any.
    pub total_capacity_bytes: Option<u64>,
}

/// Read-only access to the device-memory accounting of the resource cache.
///
/// Implemented by the cache; held weakly by monitors so that observation
/// never extends the cache's lifetime.
pub trait DeviceMemoryProvider: Send + Sync + Debug {
    /// Estimated bytes of device memory currently tracked.
    fn device_memory_usage_bytes(&self) -> u64;

    /// Highest value the usage estimate has ever reached.
    fn device_memory_peak_bytes(&self) -> u64;

    /// The configured soft budget, if one was set.
    fn device_memory_budget_bytes(&self) -> Option<u64>;
}

/// A named source of [`ResourceUsageReport`]s.
pub trait ResourceMonitor: Send + Sync {
    /// Unique identifier for this monitor instance.
    fn monitor_id(&self) -> Cow<'static, str>;

    /// The resource pool this monitor reports on.
    fn resource_type(&self) -> MonitoredResourceType;

    /// A current usage snapshot.
    fn usage_report(&self) -> ResourceUsageReport;

    /// Downcast hook for callers that know the concrete monitor type.
    fn as_any(&self) -> &dyn Any;
}
