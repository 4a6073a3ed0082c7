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

use garnet_core::{
    BufferDesc, FenceId, GpuResourceDesc, GpuResourceType, GpuSettings, SurfaceUpdateFlag,
};
use garnet_gpu::resources::register_standard_factories;
use garnet_gpu::GpuContext;
use garnet_infra::HeadlessBackend;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn headless_context() -> GpuContext {
    let ctx = GpuContext::new(Arc::new(HeadlessBackend::new()), GpuSettings::default());
    register_standard_factories(ctx.database());
    ctx
}

fn buffer_desc(length: u64) -> GpuResourceDesc {
    GpuResourceDesc::Buffer(BufferDesc {
        length,
        dynamic: true,
    })
}

#[test]
fn fence_gated_update_reaches_the_backend_in_order() {
    // --- 1. ARRANGE ---
    let ctx = headless_context();
    let handle = ctx
        .create_resource(GpuResourceType::Buffer, "stream.vb", buffer_desc(8))
        .expect("create succeeds");

    // An update that must not run before frame 2's draws are issued.
    ctx.update_resource(
        handle,
        0,
        &[7u8; 8],
        SurfaceUpdateFlag::Discard,
        FenceId(2),
    );

    let mut dispatcher = ctx.create_dispatcher();

    // --- 2. ACT ---
    // Frame 0: only the creation is eligible.
    assert_eq!(dispatcher.dispatch_ready(), 1);
    assert_eq!(ctx.commands().len(), 1);

    // Two frames pass; the fence requirement is now met.
    dispatcher.advance_fence();
    dispatcher.advance_fence();
    assert_eq!(dispatcher.dispatch_ready(), 1);

    // --- 3. ASSERT ---
    // The readback is itself a queued command: no reply until dispatched.
    let receiver = ctx.read_back(handle, FenceId::IMMEDIATE);
    assert!(receiver.try_recv().is_err());
    dispatcher.dispatch_ready();
    let bytes = receiver
        .recv_timeout(Duration::from_secs(1))
        .expect("reply delivered")
        .expect("readback succeeds");
    assert_eq!(bytes, vec![7u8; 8]);
}

#[test]
fn update_then_destroy_in_the_same_fence_class_preserves_order() {
    let ctx = headless_context();
    let handle = ctx
        .create_resource(GpuResourceType::Buffer, "", buffer_desc(16))
        .expect("create succeeds");

    ctx.update_resource(handle, 0, &[1u8; 16], SurfaceUpdateFlag::Default, FenceId(3));
    ctx.delete_resource(handle, FenceId(3));

    let mut dispatcher = ctx.create_dispatcher();
    dispatcher.dispatch_ready(); // creation
    for _ in 0..3 {
        dispatcher.advance_fence();
    }

    // Both commands are eligible; per-thread FIFO within the equal fence
    // class means the update executes against a live native object and the
    // destroy lands last.
    assert_eq!(dispatcher.dispatch_ready(), 2);
    assert_eq!(dispatcher.native_count(), 0);
}

#[test]
fn producer_and_dispatch_thread_cooperate_across_threads() {
    let ctx = Arc::new(headless_context());
    let dispatch = ctx.spawn_dispatch_thread();

    let handle = ctx
        .create_resource(GpuResourceType::Buffer, "worker.vb", buffer_desc(64))
        .expect("create succeeds");

    // A second producer thread streams updates gated on near-future fences.
    let producer = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for round in 0u8..4 {
                let fence = FenceId(ctx.fence().current().0 + 1);
                ctx.update_resource(
                    handle,
                    0,
                    &[round; 64],
                    SurfaceUpdateFlag::Default,
                    fence,
                );
                thread::sleep(Duration::from_millis(5));
            }
        })
    };
    producer.join().expect("producer thread panicked");

    // Give the dispatch thread a few ticks past the last fence, then read.
    let receiver = ctx.read_back(handle, FenceId(ctx.fence().current().0 + 1));
    let bytes = receiver
        .recv_timeout(Duration::from_secs(2))
        .expect("dispatch thread replies")
        .expect("readback succeeds");
    assert_eq!(bytes, vec![3u8; 64]);

    dispatch.stop();
    ctx.shutdown();
    assert_eq!(ctx.database().resource_count(), 0);
    assert!(ctx.cache().is_empty());
}

#[test]
fn teardown_after_dispatch_leaves_no_native_objects() {
    let backend = Arc::new(HeadlessBackend::new());
    let ctx = GpuContext::new(
        Arc::clone(&backend) as Arc<dyn garnet_core::GpuBackend>,
        GpuSettings::default(),
    );
    register_standard_factories(ctx.database());

    let mut handles = Vec::new();
    for i in 0..5 {
        handles.push(
            ctx.create_resource(GpuResourceType::Buffer, &format!("b{i}"), buffer_desc(32))
                .expect("create succeeds"),
        );
    }

    let mut dispatcher = ctx.create_dispatcher();
    dispatcher.dispatch_ready();
    assert_eq!(backend.resource_count(), 5);

    for handle in &handles {
        ctx.delete_resource(*handle, FenceId::IMMEDIATE);
    }
    dispatcher.dispatch_ready();
    assert_eq!(backend.resource_count(), 0);

    for handle in handles {
        assert!(!ctx.check_handle(handle));
    }
}
