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

//! The resource database: typed handle table, factory registry, and
//! name-based interning.

use crate::cache::{GraphicsResourceItem, ResourceCache};
use garnet_core::gpu::handle::MAX_SLOTS_PER_TYPE;
use garnet_core::{
    GpuResource, GpuResourceDesc, GpuResourceFactory, GpuResourceHandle, GpuResourceType,
    ResourceError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Outcome of a database allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedResource {
    /// Handle of the live resource.
    pub handle: GpuResourceHandle,
    /// `true` when an existing resource of the same type and name was
    /// reused instead of creating a new one.
    pub reused: bool,
}

/// One live slot in a type's table.
#[derive(Debug)]
struct Slot {
    resource: Arc<dyn GpuResource>,
    name: Option<String>,
    cache_item: GraphicsResourceItem,
}

/// Per-type state: the registered factory plus the slot table it populates.
#[derive(Debug)]
struct ResourceManager {
    factory: Arc<dyn GpuResourceFactory>,
    description: String,
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
    by_name: HashMap<String, u32>,
    live: usize,
}

impl ResourceManager {
    fn new(description: String, factory: Arc<dyn GpuResourceFactory>) -> Self {
        Self {
            factory,
            description,
            slots: Vec::new(),
            free: Vec::new(),
            by_name: HashMap::new(),
            live: 0,
        }
    }

    fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }
}

/// Manages GPU resource creation and deletion, and the mapping between
/// resource names and handles.
///
/// One [`ResourceManager`] per registered type holds the factory and the
/// slot table handles index into. All operations serialize on a single
/// mutex; factories run under it and therefore must not call back into the
/// database.
///
/// A note on atomicity: cache accounting and slot allocation are two
/// independently locked steps, not one transaction. A factory failure after
/// the cache insert rolls the insert back before returning; no other
/// interleaving can observe the gap, because the database lock is held
/// across both steps and the cache lock is always the innermost of the two.
#[derive(Debug)]
pub struct GpuResourceDatabase {
    managers: Mutex<HashMap<GpuResourceType, ResourceManager>>,
    cache: Arc<ResourceCache>,
}

impl GpuResourceDatabase {
    /// Creates an empty database whose footprint accounting goes to `cache`.
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self {
            managers: Mutex::new(HashMap::new()),
            cache,
        }
    }

    /// Registers the factory for `resource_type`.
    ///
    /// At most one factory per type: a second registration returns `false`,
    /// logs an error, and leaves the existing factory in place.
    pub fn register_factory(
        &self,
        resource_type: GpuResourceType,
        description: &str,
        factory: Arc<dyn GpuResourceFactory>,
    ) -> bool {
        let mut managers = self.managers.lock().unwrap();
        if let Some(existing) = managers.get(&resource_type) {
            log::error!(
                "a factory for {resource_type} resources is already registered \
                 ('{}'); keeping it",
                existing.description
            );
            return false;
        }
        managers.insert(
            resource_type,
            ResourceManager::new(description.to_string(), factory),
        );
        log::debug!("registered {resource_type} resource factory '{description}'");
        true
    }

    /// `true` if a factory for `resource_type` is registered.
    pub fn has_factory(&self, resource_type: GpuResourceType) -> bool {
        self.managers.lock().unwrap().contains_key(&resource_type)
    }

    /// Creates a resource of `resource_type`, or returns the existing one
    /// interned under `name`.
    ///
    /// A non-empty `name` de-duplicates: if a live resource of the same type
    /// and name exists its handle is returned and `desc` is ignored
    /// entirely. An empty `name` always allocates.
    ///
    /// ## Errors
    /// * `ResourceError::UnregisteredType` - no factory for `resource_type`.
    /// * `ResourceError::InvalidDescriptor` - `desc` is for another type, or
    ///   its footprint estimate rejected it as malformed.
    /// * any error the factory returns.
    ///
    /// Failures are logged here and leave the database unchanged; they never
    /// abort the process.
    pub fn create_resource(
        &self,
        resource_type: GpuResourceType,
        name: &str,
        desc: &GpuResourceDesc,
    ) -> Result<CreatedResource, ResourceError> {
        let mut managers = self.managers.lock().unwrap();
        let manager = match managers.get_mut(&resource_type) {
            Some(manager) => manager,
            None => {
                log::error!("cannot create {resource_type} resource: no factory registered");
                return Err(ResourceError::UnregisteredType(resource_type));
            }
        };

        if !name.is_empty() {
            if let Some(&index) = manager.by_name.get(name) {
                return Ok(CreatedResource {
                    handle: GpuResourceHandle::new(resource_type, index),
                    reused: true,
                });
            }
        }

        if desc.resource_type() != resource_type {
            let err = ResourceError::InvalidDescriptor(format!(
                "{} descriptor supplied for a {resource_type} resource",
                desc.resource_type()
            ));
            log::error!("{err}");
            return Err(err);
        }

        if manager.live as u32 >= MAX_SLOTS_PER_TYPE {
            let err = ResourceError::InvalidDescriptor(format!(
                "{resource_type} slot table is full ({MAX_SLOTS_PER_TYPE} live resources)"
            ));
            log::error!("{err}");
            return Err(err);
        }

        // The footprint estimate doubles as descriptor validation; a zero
        // estimate is the malformed-request signal.
        let cache_item = match self.cache.create_resource(desc) {
            Some(item) => item,
            None => {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "{resource_type} descriptor rejected by footprint estimate"
                )));
            }
        };

        let resource = match manager.factory.create_resource(desc) {
            Ok(resource) => resource,
            Err(err) => {
                self.cache.delete_resource(cache_item);
                log::error!("factory for {resource_type} resources failed: {err}");
                return Err(err);
            }
        };

        let index = match manager.free.pop() {
            Some(index) => index,
            None => manager.slots.len() as u32,
        };
        let slot = Slot {
            resource,
            name: (!name.is_empty()).then(|| name.to_string()),
            cache_item,
        };
        if (index as usize) == manager.slots.len() {
            manager.slots.push(Some(slot));
        } else {
            manager.slots[index as usize] = Some(slot);
        }
        if !name.is_empty() {
            manager.by_name.insert(name.to_string(), index);
        }
        manager.live += 1;

        let handle = GpuResourceHandle::new(resource_type, index);
        log::trace!("created {handle:?} ('{name}', {} bytes estimated)", cache_item.estimated_bytes);
        Ok(CreatedResource {
            handle,
            reused: false,
        })
    }

    /// Deletes the resource behind `handle`, freeing its slot and cache
    /// entry and handing the object back to its factory.
    ///
    /// A stale or foreign handle is ignored: deletion is where teardown
    /// races surface, and a caller releasing an already-gone resource is
    /// not an error worth more than a debug line.
    pub fn delete_resource(&self, handle: GpuResourceHandle) {
        let mut managers = self.managers.lock().unwrap();
        let Some(manager) = managers.get_mut(&handle.resource_type()) else {
            log::debug!("delete of {handle:?} ignored: type has no registered factory");
            return;
        };
        let index = handle.index();
        let Some(slot) = manager
            .slots
            .get_mut(index as usize)
            .and_then(Option::take)
        else {
            log::debug!("delete of {handle:?} ignored: slot is not live");
            return;
        };

        if let Some(name) = &slot.name {
            manager.by_name.remove(name);
        }
        manager.free.push(index);
        manager.live -= 1;
        let factory = Arc::clone(&manager.factory);
        drop(managers);

        self.cache.delete_resource(slot.cache_item);
        factory.destroy_resource(slot.resource);
        log::trace!("deleted {handle:?}");
    }

    /// Deletes every live resource of every type. Full shutdown only; the
    /// order across types is unspecified.
    pub fn delete_all_resources(&self) {
        let mut managers = self.managers.lock().unwrap();
        let mut reclaimed = Vec::new();
        for (resource_type, manager) in managers.iter_mut() {
            for slot in manager.slots.iter_mut() {
                if let Some(slot) = slot.take() {
                    reclaimed.push((Arc::clone(&manager.factory), slot));
                }
            }
            manager.slots.clear();
            manager.free.clear();
            manager.by_name.clear();
            manager.live = 0;
            log::debug!("tore down all {resource_type} resources");
        }
        drop(managers);

        for (factory, slot) in reclaimed {
            self.cache.delete_resource(slot.cache_item);
            factory.destroy_resource(slot.resource);
        }
    }

    /// Looks up a live resource by type and name. A miss is not an error.
    pub fn find_resource(
        &self,
        resource_type: GpuResourceType,
        name: &str,
    ) -> Option<GpuResourceHandle> {
        let managers = self.managers.lock().unwrap();
        let manager = managers.get(&resource_type)?;
        manager
            .by_name
            .get(name)
            .map(|&index| GpuResourceHandle::new(resource_type, index))
    }

    /// Silent validity probe: `true` iff `handle` names a live resource.
    ///
    /// Never logs, even for forged values; callers probe with it before
    /// risky operations.
    pub fn check_handle(&self, handle: GpuResourceHandle) -> bool {
        let managers = self.managers.lock().unwrap();
        managers
            .get(&handle.resource_type())
            .is_some_and(|manager| manager.slot(handle.index()).is_some())
    }

    /// Shared reference to the live resource behind `handle`.
    pub fn get_resource(&self, handle: GpuResourceHandle) -> Option<Arc<dyn GpuResource>> {
        let managers = self.managers.lock().unwrap();
        managers
            .get(&handle.resource_type())?
            .slot(handle.index())
            .map(|slot| Arc::clone(&slot.resource))
    }

    /// The name a live resource was interned under, if any.
    pub fn resource_name(&self, handle: GpuResourceHandle) -> Option<String> {
        let managers = self.managers.lock().unwrap();
        managers
            .get(&handle.resource_type())?
            .slot(handle.index())?
            .name
            .clone()
    }

    /// Total number of live resources across every type.
    pub fn resource_count(&self) -> usize {
        let managers = self.managers.lock().unwrap();
        managers.values().map(|manager| manager.live).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{register_standard_factories, BufferFactory};
    use garnet_core::{BufferDesc, UniformDesc};

    fn buffer_desc(length: u64) -> GpuResourceDesc {
        GpuResourceDesc::Buffer(BufferDesc {
            length,
            dynamic: false,
        })
    }

    fn database_with_standard_factories() -> GpuResourceDatabase {
        let cache = Arc::new(ResourceCache::new(None));
        let db = GpuResourceDatabase::new(cache);
        register_standard_factories(&db);
        db
    }

    #[test]
    fn handles_are_pairwise_distinct_without_deletes() {
        let db = database_with_standard_factories();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let created = db
                .create_resource(GpuResourceType::Buffer, "", &buffer_desc(16))
                .expect("create succeeds");
            assert!(!created.reused);
            handles.push(created.handle);
        }
        for (i, a) in handles.iter().enumerate() {
            for b in &handles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn named_resources_intern_regardless_of_descriptor() {
        let db = database_with_standard_factories();
        let first = db
            .create_resource(GpuResourceType::Buffer, "shared.vb", &buffer_desc(64))
            .unwrap();
        let second = db
            .create_resource(GpuResourceType::Buffer, "shared.vb", &buffer_desc(4096))
            .unwrap();
        assert_eq!(first.handle, second.handle);
        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(db.resource_count(), 1);
    }

    #[test]
    fn unregistered_type_is_an_error_not_a_panic() {
        let cache = Arc::new(ResourceCache::new(None));
        let db = GpuResourceDatabase::new(cache);
        let err = db
            .create_resource(GpuResourceType::Buffer, "", &buffer_desc(16))
            .unwrap_err();
        assert_eq!(err, ResourceError::UnregisteredType(GpuResourceType::Buffer));
    }

    #[test]
    fn second_factory_registration_keeps_the_first() {
        let cache = Arc::new(ResourceCache::new(None));
        let db = GpuResourceDatabase::new(cache);
        assert!(db.register_factory(
            GpuResourceType::Buffer,
            "buffer",
            Arc::new(BufferFactory)
        ));
        assert!(!db.register_factory(
            GpuResourceType::Buffer,
            "late duplicate",
            Arc::new(BufferFactory)
        ));
        // The surviving factory still serves creation.
        assert!(db
            .create_resource(GpuResourceType::Buffer, "", &buffer_desc(8))
            .is_ok());
    }

    #[test]
    fn mismatched_descriptor_is_rejected() {
        let db = database_with_standard_factories();
        let uniform = GpuResourceDesc::Uniform(UniformDesc { length: 16 });
        let err = db
            .create_resource(GpuResourceType::Buffer, "", &uniform)
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidDescriptor(_)));
    }

    #[test]
    fn malformed_descriptor_leaves_no_residue() {
        let db = database_with_standard_factories();
        assert!(db
            .create_resource(GpuResourceType::Buffer, "bad", &buffer_desc(0))
            .is_err());
        assert_eq!(db.resource_count(), 0);
        assert_eq!(db.find_resource(GpuResourceType::Buffer, "bad"), None);
    }

    #[test]
    fn delete_frees_the_slot_and_name() {
        let db = database_with_standard_factories();
        let created = db
            .create_resource(GpuResourceType::Buffer, "grid.vb", &buffer_desc(128))
            .unwrap();
        assert!(db.check_handle(created.handle));

        db.delete_resource(created.handle);
        assert!(!db.check_handle(created.handle));
        assert_eq!(db.find_resource(GpuResourceType::Buffer, "grid.vb"), None);

        // Deleting again is a tolerated no-op.
        db.delete_resource(created.handle);
    }

    #[test]
    fn find_resource_miss_is_none() {
        let db = database_with_standard_factories();
        assert_eq!(db.find_resource(GpuResourceType::Texture, "absent"), None);
    }

    #[test]
    fn lookup_helpers_reflect_live_state() {
        let db = database_with_standard_factories();
        assert!(db.has_factory(GpuResourceType::Texture));

        let created = db
            .create_resource(GpuResourceType::Buffer, "debug.vb", &buffer_desc(64))
            .unwrap();
        assert_eq!(db.resource_name(created.handle).as_deref(), Some("debug.vb"));
        let resource = db.get_resource(created.handle).expect("live resource");
        assert_eq!(resource.resource_type(), GpuResourceType::Buffer);

        db.delete_resource(created.handle);
        assert!(db.get_resource(created.handle).is_none());
        assert_eq!(db.resource_name(created.handle), None);
    }

    #[test]
    fn delete_all_resources_empties_every_table() {
        let db = database_with_standard_factories();
        let mut handles = Vec::new();
        for i in 0..4 {
            handles.push(
                db.create_resource(
                    GpuResourceType::Buffer,
                    &format!("buf.{i}"),
                    &buffer_desc(32),
                )
                .unwrap()
                .handle,
            );
        }
        handles.push(
            db.create_resource(
                GpuResourceType::Uniform,
                "params",
                &GpuResourceDesc::Uniform(UniformDesc { length: 64 }),
            )
            .unwrap()
            .handle,
        );

        db.delete_all_resources();
        assert_eq!(db.resource_count(), 0);
        for handle in handles {
            assert!(!db.check_handle(handle));
        }
    }
}
