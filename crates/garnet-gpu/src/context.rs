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

//! The engine-context service object wiring the resource core together.

use crate::cache::ResourceCache;
use crate::command_buffer::ResourceCommandBuffer;
use crate::database::GpuResourceDatabase;
use crate::dispatcher::{CommandDispatcher, DispatchThread};
use crate::fence::FenceCounter;
use crate::telemetry::GpuMemoryMonitor;
use garnet_core::telemetry::DeviceMemoryProvider;
use garnet_core::{
    FenceId, GpuBackend, GpuCommand, GpuResourceDesc, GpuResourceHandle, GpuResourceType,
    GpuSettings, ReadbackResult, ResourceError, SurfaceUpdateFlag,
};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// The explicitly constructed, dependency-injected owner of the resource
/// core (database, cache, command buffer, fence counter, and backend):
/// one instance per running engine, passed to call sites instead of living
/// in process-wide statics.
///
/// Producer threads call the methods here; exactly one consumer drains the
/// command buffer, either via [`spawn_dispatch_thread`](Self::spawn_dispatch_thread)
/// or by driving a [`CommandDispatcher`] manually.
#[derive(Debug)]
pub struct GpuContext {
    backend: Arc<dyn GpuBackend>,
    database: Arc<GpuResourceDatabase>,
    cache: Arc<ResourceCache>,
    commands: Arc<ResourceCommandBuffer>,
    fence: Arc<FenceCounter>,
    settings: GpuSettings,
}

impl GpuContext {
    /// Builds the resource core around `backend`.
    pub fn new(backend: Arc<dyn GpuBackend>, settings: GpuSettings) -> Self {
        let cache = Arc::new(ResourceCache::new(settings.memory_budget_bytes));
        let database = Arc::new(GpuResourceDatabase::new(Arc::clone(&cache)));
        let commands = Arc::new(ResourceCommandBuffer::with_pending_warn(
            settings.pending_warn_threshold,
        ));
        let fence = Arc::new(FenceCounter::new());
        log::info!("GPU resource core initialized for backend '{}'", backend.name());
        Self {
            backend,
            database,
            cache,
            commands,
            fence,
            settings,
        }
    }

    /// The resource database.
    pub fn database(&self) -> &Arc<GpuResourceDatabase> {
        &self.database
    }

    /// The footprint cache.
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// The deferred command queue.
    pub fn commands(&self) -> &Arc<ResourceCommandBuffer> {
        &self.commands
    }

    /// The draw-fence counter.
    pub fn fence(&self) -> &Arc<FenceCounter> {
        &self.fence
    }

    /// The backend commands execute against.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// The settings the context was built with.
    pub fn settings(&self) -> &GpuSettings {
        &self.settings
    }

    /// Builds the consumer-side dispatcher for this context's queue.
    pub fn create_dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.commands),
            Arc::clone(&self.fence),
        )
    }

    /// Spawns the consumer thread at the configured poll cadence.
    pub fn spawn_dispatch_thread(&self) -> DispatchThread {
        DispatchThread::spawn(
            self.create_dispatcher(),
            Duration::from_millis(self.settings.dispatch_poll_ms),
        )
    }

    /// Creates a resource and queues creation of its native object.
    ///
    /// Interning applies: when a live resource of the same type and
    /// non-empty name exists its handle is returned and nothing new is
    /// created or queued.
    pub fn create_resource(
        &self,
        resource_type: GpuResourceType,
        name: &str,
        desc: GpuResourceDesc,
    ) -> Result<GpuResourceHandle, ResourceError> {
        let created = self.database.create_resource(resource_type, name, &desc)?;
        if !created.reused {
            self.commands.submit(
                FenceId::IMMEDIATE,
                GpuCommand::Create {
                    handle: created.handle,
                    desc,
                },
            );
        }
        Ok(created.handle)
    }

    /// Deletes the resource now on the producer side and queues destruction
    /// of its native object gated on `wait_fence`.
    ///
    /// The fence lets callers sequence destruction after the frame that last
    /// referenced the resource. Deleting while updates targeting the same
    /// handle are still queued is a caller ordering bug.
    pub fn delete_resource(&self, handle: GpuResourceHandle, wait_fence: FenceId) {
        if !self.database.check_handle(handle) {
            log::debug!("delete of {handle:?} ignored: not a live resource");
            return;
        }
        self.database.delete_resource(handle);
        self.commands
            .submit(wait_fence, GpuCommand::Destroy { handle });
    }

    /// Queues a write of `data` into the resource, gated on `wait_fence`.
    ///
    /// The bytes are copied here so the command outlives the caller's
    /// buffer. An invalid handle is logged and dropped; there is no native
    /// object the write could reach.
    pub fn update_resource(
        &self,
        handle: GpuResourceHandle,
        offset: u64,
        data: &[u8],
        flag: SurfaceUpdateFlag,
        wait_fence: FenceId,
    ) {
        if !self.database.check_handle(handle) {
            log::error!("update of {handle:?} dropped: not a live resource");
            return;
        }
        self.commands.submit(
            wait_fence,
            GpuCommand::Update {
                handle,
                offset,
                data: data.to_vec(),
                flag,
            },
        );
    }

    /// Queues a readback of the resource's native contents, gated on
    /// `wait_fence`. The result arrives on the returned channel once the
    /// dispatch thread executes the command.
    pub fn read_back(
        &self,
        handle: GpuResourceHandle,
        wait_fence: FenceId,
    ) -> flume::Receiver<ReadbackResult> {
        let (reply, result) = flume::bounded(1);
        if self.database.check_handle(handle) {
            self.commands
                .submit(wait_fence, GpuCommand::Readback { handle, reply });
        } else {
            // Resolve immediately; there is nothing to read.
            let _ = reply.send(Err(ResourceError::StaleHandle(handle)));
        }
        result
    }

    /// Looks up a live resource by type and name.
    pub fn find_resource(
        &self,
        resource_type: GpuResourceType,
        name: &str,
    ) -> Option<GpuResourceHandle> {
        self.database.find_resource(resource_type, name)
    }

    /// Silent handle validity probe.
    pub fn check_handle(&self, handle: GpuResourceHandle) -> bool {
        self.database.check_handle(handle)
    }

    /// A monitor reporting this context's estimated device-memory usage.
    ///
    /// The monitor holds the cache weakly; it outliving the context is safe
    /// and merely yields empty reports.
    pub fn memory_monitor(&self) -> GpuMemoryMonitor {
        let cache: Arc<dyn DeviceMemoryProvider> = self.cache.clone();
        let provider: Weak<dyn DeviceMemoryProvider> = Arc::downgrade(&cache);
        GpuMemoryMonitor::new(provider, format!("gpu-memory/{}", self.backend.name()))
    }

    /// Tears the resource core down: every live resource is deleted and the
    /// command queue is discarded. Engine shutdown only; stop the dispatch
    /// thread first so in-flight destroys reach the backend.
    pub fn shutdown(&self) {
        self.database.delete_all_resources();
        self.cache.delete_all_resources();
        self.commands.clear();
        log::info!("GPU resource core shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::register_standard_factories;
    use garnet_core::{BackendError, BufferDesc, NativeResourceId};

    /// Backend that accepts everything and remembers nothing.
    #[derive(Debug, Default)]
    struct NullBackend;

    impl GpuBackend for NullBackend {
        fn name(&self) -> &str {
            "null"
        }

        fn create_resource(
            &self,
            _descriptor: &GpuResourceDesc,
        ) -> Result<NativeResourceId, BackendError> {
            Ok(NativeResourceId(1))
        }

        fn update_resource(
            &self,
            _id: NativeResourceId,
            _offset: u64,
            _data: &[u8],
            _flag: SurfaceUpdateFlag,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        fn destroy_resource(&self, _id: NativeResourceId) -> Result<(), BackendError> {
            Ok(())
        }

        fn read_back(&self, _id: NativeResourceId) -> Result<Vec<u8>, BackendError> {
            Ok(Vec::new())
        }
    }

    fn context() -> GpuContext {
        let ctx = GpuContext::new(Arc::new(NullBackend), GpuSettings::default());
        register_standard_factories(ctx.database());
        ctx
    }

    fn buffer_desc(length: u64) -> GpuResourceDesc {
        GpuResourceDesc::Buffer(BufferDesc {
            length,
            dynamic: false,
        })
    }

    #[test]
    fn create_queues_exactly_one_native_creation() {
        let ctx = context();
        let handle = ctx
            .create_resource(GpuResourceType::Buffer, "hud.vb", buffer_desc(128))
            .expect("create succeeds");
        assert_eq!(ctx.commands().len(), 1);

        // The interned second create queues nothing.
        let again = ctx
            .create_resource(GpuResourceType::Buffer, "hud.vb", buffer_desc(999))
            .expect("interned create succeeds");
        assert_eq!(again, handle);
        assert_eq!(ctx.commands().len(), 1);
    }

    #[test]
    fn update_of_invalid_handle_queues_nothing() {
        let ctx = context();
        let handle = ctx
            .create_resource(GpuResourceType::Buffer, "", buffer_desc(64))
            .unwrap();
        ctx.delete_resource(handle, FenceId::IMMEDIATE);
        let queued = ctx.commands().len();
        ctx.update_resource(handle, 0, &[1, 2, 3], SurfaceUpdateFlag::Default, FenceId(1));
        assert_eq!(ctx.commands().len(), queued);
    }

    #[test]
    fn read_back_of_stale_handle_resolves_immediately() {
        let ctx = context();
        let handle = ctx
            .create_resource(GpuResourceType::Buffer, "", buffer_desc(64))
            .unwrap();
        ctx.delete_resource(handle, FenceId::IMMEDIATE);
        let result = ctx.read_back(handle, FenceId::IMMEDIATE);
        assert_eq!(
            result.try_recv().expect("resolved without a dispatcher"),
            Err(ResourceError::StaleHandle(handle))
        );
    }

    #[test]
    fn shutdown_leaves_nothing_live() {
        let ctx = context();
        for i in 0..3 {
            ctx.create_resource(GpuResourceType::Buffer, &format!("b{i}"), buffer_desc(32))
                .unwrap();
        }
        ctx.shutdown();
        assert_eq!(ctx.database().resource_count(), 0);
        assert!(ctx.cache().is_empty());
        assert!(ctx.commands().is_empty());
    }
}
