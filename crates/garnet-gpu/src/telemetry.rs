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

//! Device-memory monitoring backed by the resource cache.

use garnet_core::telemetry::{
    DeviceMemoryProvider, MonitoredResourceType, ResourceMonitor, ResourceUsageReport,
};
use std::borrow::Cow;
use std::sync::Weak;

/// Reports the resource cache's estimated device-memory usage through the
/// unified [`ResourceMonitor`] interface.
///
/// Holds its provider weakly so monitoring never extends the cache's
/// lifetime; after the cache is gone the monitor yields empty reports.
#[derive(Debug)]
pub struct GpuMemoryMonitor {
    provider: Weak<dyn DeviceMemoryProvider>,
    monitor_id: String,
}

impl GpuMemoryMonitor {
    /// Creates a monitor over `provider`.
    pub fn new(provider: Weak<dyn DeviceMemoryProvider>, monitor_id: String) -> Self {
        Self {
            provider,
            monitor_id,
        }
    }
}

impl ResourceMonitor for GpuMemoryMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.monitor_id.clone())
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::DeviceMemory
    }

    fn usage_report(&self) -> ResourceUsageReport {
        match self.provider.upgrade() {
            Some(provider) => ResourceUsageReport {
                current_bytes: provider.device_memory_usage_bytes(),
                peak_bytes: Some(provider.device_memory_peak_bytes()),
                total_capacity_bytes: provider.device_memory_budget_bytes(),
            },
            // The cache is gone; report nothing rather than stale figures.
            None => ResourceUsageReport::default(),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResourceCache;
    use garnet_core::{BufferDesc, GpuResourceDesc};
    use std::sync::Arc;

    #[test]
    fn report_tracks_the_cache() {
        let cache = Arc::new(ResourceCache::new(Some(1 << 20)));
        let provider_cache: Arc<dyn DeviceMemoryProvider> = cache.clone();
        let provider: Weak<dyn DeviceMemoryProvider> = Arc::downgrade(&provider_cache);
        let monitor = GpuMemoryMonitor::new(provider, "gpu-memory/test".to_string());

        let item = cache
            .create_resource(&GpuResourceDesc::Buffer(BufferDesc {
                length: 512,
                dynamic: false,
            }))
            .unwrap();

        let report = monitor.usage_report();
        assert_eq!(report.current_bytes, 512);
        assert_eq!(report.peak_bytes, Some(512));
        assert_eq!(report.total_capacity_bytes, Some(1 << 20));

        cache.delete_resource(item);
        assert_eq!(monitor.usage_report().current_bytes, 0);
    }

    #[test]
    fn dropped_cache_yields_the_empty_report() {
        let cache: Arc<dyn DeviceMemoryProvider> = Arc::new(ResourceCache::new(None));
        let provider: Weak<dyn DeviceMemoryProvider> = Arc::downgrade(&cache);
        let monitor = GpuMemoryMonitor::new(provider, "gpu-memory/orphan".to_string());
        drop(cache);
        assert_eq!(monitor.usage_report(), ResourceUsageReport::default());
    }
}
