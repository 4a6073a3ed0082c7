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

//! Estimated device-memory accounting for live GPU resources.

use garnet_core::telemetry::DeviceMemoryProvider;
use garnet_core::{GpuResourceDesc, GpuResourceType, SpinLock};
use std::sync::atomic::{AtomicU64, Ordering};

/// Flat estimate for resource kinds whose real device footprint is
/// driver-opaque (uniforms, kernels, port bindings).
const OPAQUE_RESOURCE_BYTES: u64 = 1024;

/// Estimates the device-memory footprint of the resource `desc` creates.
///
/// The figure is an estimate for coarse budget decisions, not a promise
/// about actual driver allocation. A result of `0` is the malformed-request
/// signal: every descriptor a factory would accept estimates strictly
/// positive.
pub fn estimate_resource_size(desc: &GpuResourceDesc) -> u64 {
    match desc {
        GpuResourceDesc::Texture(texture) => {
            let base_bytes = texture.slice_bytes() * u64::from(texture.depth);
            // Mip chains converge to one third of the base level.
            let mip_bytes = base_bytes / 3;
            (base_bytes + mip_bytes) * u64::from(texture.faces)
        }
        GpuResourceDesc::Buffer(buffer) => buffer.length,
        GpuResourceDesc::Uniform(_) | GpuResourceDesc::Kernel(_) | GpuResourceDesc::PortBinding(_) => {
            OPAQUE_RESOURCE_BYTES
        }
    }
}

/// A tracked cache entry: one live resource's estimated footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsResourceItem {
    /// Slot id inside the cache. Unique until the slot is reused after
    /// deletion.
    id: u32,
    /// Type of the tracked resource.
    pub resource_type: GpuResourceType,
    /// Estimated device-memory footprint in bytes. Always strictly positive.
    pub estimated_bytes: u64,
}

impl GraphicsResourceItem {
    /// The cache-internal slot id of this entry.
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Default)]
struct CacheState {
    slots: Vec<Option<GraphicsResourceItem>>,
    free: Vec<u32>,
    live: usize,
    total_bytes: u64,
}

/// Tracks the estimated device-memory footprint of every live resource.
///
/// The cache is the single cross-thread mutation point for memory
/// accounting, guarded by a [`SpinLock`]: mutations are a few loads and
/// stores, and contention is create/destroy-rate, not per-frame. The lock is
/// never held across factory or backend calls: re-entering the cache while
/// holding it would deadlock.
#[derive(Debug)]
pub struct ResourceCache {
    state: SpinLock<CacheState>,
    // Mirrors of the locked accounting, so telemetry reads never contend
    // with resource creation.
    total_bytes: AtomicU64,
    peak_bytes: AtomicU64,
    budget_bytes: Option<u64>,
}

impl ResourceCache {
    /// Creates an empty cache with an optional soft memory budget.
    pub fn new(budget_bytes: Option<u64>) -> Self {
        Self {
            state: SpinLock::new(CacheState::default()),
            total_bytes: AtomicU64::new(0),
            peak_bytes: AtomicU64::new(0),
            budget_bytes,
        }
    }

    /// Starts tracking the resource `desc` describes.
    ///
    /// Returns `None`, with an error log, when the footprint estimate is
    /// zero, which marks the descriptor malformed (a zero-sized base mip or
    /// empty buffer), distinguishing it from any valid resource.
    pub fn create_resource(&self, desc: &GpuResourceDesc) -> Option<GraphicsResourceItem> {
        let estimated_bytes = estimate_resource_size(desc);
        if estimated_bytes == 0 {
            log::error!(
                "rejecting {} descriptor with zero-byte footprint estimate: {desc:?}",
                desc.resource_type()
            );
            return None;
        }

        let mut state = self.state.lock();
        let id = match state.free.pop() {
            Some(id) => id,
            None => state.slots.len() as u32,
        };
        let item = GraphicsResourceItem {
            id,
            resource_type: desc.resource_type(),
            estimated_bytes,
        };
        if (id as usize) == state.slots.len() {
            state.slots.push(Some(item));
        } else {
            state.slots[id as usize] = Some(item);
        }
        state.live += 1;
        state.total_bytes += estimated_bytes;
        let total = state.total_bytes;
        drop(state);

        self.publish_totals(total);
        if let Some(budget) = self.budget_bytes {
            if total > budget {
                log::warn!(
                    "estimated device memory {total} bytes exceeds the {budget}-byte budget"
                );
            }
        }
        Some(item)
    }

    /// Stops tracking `item` and releases its footprint.
    ///
    /// `item` must currently be tracked by this cache; deleting a foreign or
    /// already-deleted item is a caller bug caught by a debug assertion and
    /// ignored (with an error log) in release builds.
    pub fn delete_resource(&self, item: GraphicsResourceItem) {
        let mut state = self.state.lock();
        match state.slots.get_mut(item.id as usize) {
            Some(slot) if *slot == Some(item) => {
                *slot = None;
                state.free.push(item.id);
                state.live -= 1;
                state.total_bytes -= item.estimated_bytes;
                let total = state.total_bytes;
                drop(state);
                self.publish_totals(total);
            }
            _ => {
                drop(state);
                debug_assert!(false, "deleting an item the cache does not track");
                log::error!(
                    "ignoring delete of untracked cache item {} ({})",
                    item.id,
                    item.resource_type
                );
            }
        }
    }

    /// Drops every tracked entry unconditionally. Engine shutdown only.
    pub fn delete_all_resources(&self) {
        let mut state = self.state.lock();
        state.slots.clear();
        state.free.clear();
        state.live = 0;
        state.total_bytes = 0;
        drop(state);
        self.publish_totals(0);
    }

    /// `true` if `item` is currently tracked.
    pub fn contains(&self, item: GraphicsResourceItem) -> bool {
        let state = self.state.lock();
        matches!(state.slots.get(item.id as usize), Some(Some(_)))
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.state.lock().live
    }

    /// `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current estimated footprint across all tracked resources.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Highest value [`total_bytes`](Self::total_bytes) has reached.
    pub fn peak_bytes(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    fn publish_totals(&self, total: u64) {
        self.total_bytes.store(total, Ordering::Relaxed);
        self.peak_bytes.fetch_max(total, Ordering::Relaxed);
    }
}

impl DeviceMemoryProvider for ResourceCache {
    fn device_memory_usage_bytes(&self) -> u64 {
        self.total_bytes()
    }

    fn device_memory_peak_bytes(&self) -> u64 {
        self.peak_bytes()
    }

    fn device_memory_budget_bytes(&self) -> Option<u64> {
        self.budget_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_core::{BufferDesc, KernelDesc, TextureDesc, TextureFormat, UniformDesc};

    fn buffer_desc(length: u64) -> GpuResourceDesc {
        GpuResourceDesc::Buffer(BufferDesc {
            length,
            dynamic: false,
        })
    }

    #[test]
    fn texture_estimate_covers_slices_faces_and_mips() {
        let desc = GpuResourceDesc::Texture(TextureDesc {
            width: 64,
            height: 64,
            depth: 2,
            faces: 6,
            mip_levels: 4,
            format: TextureFormat::Rgba8,
        });
        let base = 64 * 64 * 4 * 2;
        assert_eq!(estimate_resource_size(&desc), (base + base / 3) * 6);
    }

    #[test]
    fn opaque_kinds_get_the_flat_estimate() {
        let kernel = GpuResourceDesc::Kernel(KernelDesc {
            entry: "blur_main".to_string(),
        });
        let uniform = GpuResourceDesc::Uniform(UniformDesc { length: 4 });
        assert_eq!(estimate_resource_size(&kernel), OPAQUE_RESOURCE_BYTES);
        assert_eq!(estimate_resource_size(&uniform), OPAQUE_RESOURCE_BYTES);
    }

    #[test]
    fn tracked_footprints_are_strictly_positive() {
        let cache = ResourceCache::new(None);
        let item = cache
            .create_resource(&buffer_desc(256))
            .expect("valid descriptor");
        assert!(item.estimated_bytes > 0);
        assert_eq!(cache.total_bytes(), 256);
    }

    #[test]
    fn zero_estimate_marks_the_descriptor_malformed() {
        let cache = ResourceCache::new(None);
        assert!(cache.create_resource(&buffer_desc(0)).is_none());
        let degenerate = GpuResourceDesc::Texture(TextureDesc::new_2d(0, 64, TextureFormat::Rgba8));
        assert!(cache.create_resource(&degenerate).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn delete_releases_footprint_and_reuses_the_slot() {
        let cache = ResourceCache::new(None);
        let first = cache.create_resource(&buffer_desc(100)).unwrap();
        let second = cache.create_resource(&buffer_desc(50)).unwrap();
        assert_eq!(cache.total_bytes(), 150);

        cache.delete_resource(first);
        assert_eq!(cache.total_bytes(), 50);
        assert!(!cache.contains(first));
        assert!(cache.contains(second));

        let third = cache.create_resource(&buffer_desc(10)).unwrap();
        assert_eq!(third.id(), first.id());
    }

    #[test]
    fn peak_survives_deletion() {
        let cache = ResourceCache::new(None);
        let item = cache.create_resource(&buffer_desc(4096)).unwrap();
        cache.delete_resource(item);
        assert_eq!(cache.total_bytes(), 0);
        assert_eq!(cache.peak_bytes(), 4096);
    }

    #[test]
    fn delete_all_empties_the_table() {
        let cache = ResourceCache::new(None);
        for length in 1..=8 {
            cache.create_resource(&buffer_desc(length)).unwrap();
        }
        cache.delete_all_resources();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }
}
