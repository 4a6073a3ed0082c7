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

// Garnet Sandbox
// Drives the GPU resource core against the headless backend: factory
// registration, fence-gated updates, readback, and monitored shutdown.

use std::mem;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use garnet_core::telemetry::ResourceMonitor;
use garnet_core::{
    BufferDesc, FenceId, GpuResourceDesc, GpuResourceType, GpuSettings, SurfaceUpdateFlag,
    TextureDesc, TextureFormat, UniformDesc,
};
use garnet_gpu::resources::register_standard_factories;
use garnet_gpu::GpuContext;
use garnet_infra::HeadlessBackend;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

const TRIANGLE: &[Vertex] = &[
    Vertex {
        position: [0.0, 0.5, 0.0],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0],
    },
];

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let settings = GpuSettings {
        memory_budget_bytes: Some(16 << 20),
        ..GpuSettings::default()
    };
    let ctx = GpuContext::new(Arc::new(HeadlessBackend::new()), settings);
    register_standard_factories(ctx.database());
    let monitor = ctx.memory_monitor();

    let dispatch = ctx.spawn_dispatch_thread();

    // A named vertex buffer; the second create proves interning.
    let vertex_bytes: &[u8] = bytemuck::cast_slice(TRIANGLE);
    let vb_desc = GpuResourceDesc::Buffer(BufferDesc {
        length: vertex_bytes.len() as u64,
        dynamic: true,
    });
    let vb = ctx.create_resource(GpuResourceType::Buffer, "triangle.vb", vb_desc.clone())?;
    let again = ctx.create_resource(GpuResourceType::Buffer, "triangle.vb", vb_desc)?;
    assert_eq!(vb, again);
    log::info!("vertex buffer {vb:?} interned under 'triangle.vb'");

    // Supporting cast: a texture and a uniform block.
    let texture = ctx.create_resource(
        GpuResourceType::Texture,
        "checker.tex",
        GpuResourceDesc::Texture(TextureDesc::new_2d(64, 64, TextureFormat::Rgba8)),
    )?;
    let params = ctx.create_resource(
        GpuResourceType::Uniform,
        "material.params",
        GpuResourceDesc::Uniform(UniformDesc {
            length: mem::size_of::<[f32; 4]>() as u64,
        }),
    )?;
    log::info!("created {texture:?} and {params:?}");

    // Upload the triangle, gated one frame into the future.
    let upload_fence = FenceId(ctx.fence().current().0 + 1);
    ctx.update_resource(vb, 0, vertex_bytes, SurfaceUpdateFlag::Discard, upload_fence);

    // Let the dispatch thread pass the fence, then read the bytes back.
    thread::sleep(Duration::from_millis(20));
    let readback = ctx
        .read_back(vb, FenceId(ctx.fence().current().0 + 1))
        .recv_timeout(Duration::from_secs(2))
        .context("dispatch thread did not reply")?
        .context("readback failed")?;
    anyhow::ensure!(
        readback == vertex_bytes,
        "readback returned different bytes than were uploaded"
    );
    log::info!("readback verified {} bytes", readback.len());

    let report = monitor.usage_report();
    log::info!(
        "estimated device memory: {} bytes current, {:?} bytes peak",
        report.current_bytes,
        report.peak_bytes
    );

    // Retire the buffer after the current frame's work.
    ctx.delete_resource(vb, FenceId(ctx.fence().current().0 + 1));
    thread::sleep(Duration::from_millis(20));

    dispatch.stop();
    ctx.shutdown();
    log::info!("sandbox done");
    Ok(())
}
