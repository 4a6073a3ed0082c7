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

//! Resource types, creation descriptors, and the factory contract used by
//! the resource database.

use crate::gpu::error::ResourceError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The closed set of resource classes managed by the resource database.
///
/// Each type has a stable `u8` tag used in handle encoding; tags are part of
/// the handle layout and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResourceType {
    /// A 2D/3D/cube texture with mip chain.
    Texture,
    /// A vertex, index, or raw byte buffer.
    Buffer,
    /// A uniform parameter set. Device-side footprint is driver-opaque.
    Uniform,
    /// A compiled GPU program. Device-side footprint is driver-opaque.
    Kernel,
    /// A binding of surfaces to a kernel's ports. Footprint is driver-opaque.
    PortBinding,
}

impl GpuResourceType {
    /// Every resource type, in tag order.
    pub const ALL: [GpuResourceType; 5] = [
        GpuResourceType::Texture,
        GpuResourceType::Buffer,
        GpuResourceType::Uniform,
        GpuResourceType::Kernel,
        GpuResourceType::PortBinding,
    ];

    /// The stable tag stored in a handle's high bits.
    pub fn tag(self) -> u8 {
        match self {
            GpuResourceType::Texture => 1,
            GpuResourceType::Buffer => 2,
            GpuResourceType::Uniform => 3,
            GpuResourceType::Kernel => 4,
            GpuResourceType::PortBinding => 5,
        }
    }

    /// Decodes a tag back to its resource type. `None` for unknown tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(GpuResourceType::Texture),
            2 => Some(GpuResourceType::Buffer),
            3 => Some(GpuResourceType::Uniform),
            4 => Some(GpuResourceType::Kernel),
            5 => Some(GpuResourceType::PortBinding),
            _ => None,
        }
    }

    /// Lower-case human-readable name, used in logs and `Display`.
    pub fn name(self) -> &'static str {
        match self {
            GpuResourceType::Texture => "texture",
            GpuResourceType::Buffer => "buffer",
            GpuResourceType::Uniform => "uniform",
            GpuResourceType::Kernel => "kernel",
            GpuResourceType::PortBinding => "port-binding",
        }
    }
}

impl fmt::Display for GpuResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel formats understood by the footprint heuristics and the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, 4 bytes per texel.
    Rgba8,
    /// 8-bit BGRA, 4 bytes per texel.
    Bgra8,
    /// Two 16-bit float channels, 4 bytes per texel.
    Rg16Float,
    /// Single 32-bit float channel, 4 bytes per texel.
    R32Float,
    /// 24-bit depth with 8-bit stencil, 4 bytes per texel.
    Depth24Stencil8,
}

impl TextureFormat {
    /// Storage cost of one texel in bytes.
    pub fn bytes_per_texel(self) -> u64 {
        match self {
            TextureFormat::Rgba8
            | TextureFormat::Bgra8
            | TextureFormat::Rg16Float
            | TextureFormat::R32Float
            | TextureFormat::Depth24Stencil8 => 4,
        }
    }
}

/// A descriptor used to create a texture resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width of the base mip level in texels.
    pub width: u32,
    /// Height of the base mip level in texels.
    pub height: u32,
    /// Depth of the base mip level; 1 for 2D textures.
    pub depth: u32,
    /// Number of faces; 1 for plain textures, 6 for cube maps.
    pub faces: u32,
    /// Number of mip levels including the base level.
    pub mip_levels: u32,
    /// Texel storage format.
    pub format: TextureFormat,
}

impl TextureDesc {
    /// Convenience constructor for a single-face 2D texture with a full
    /// default mip chain of 1.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            depth: 1,
            faces: 1,
            mip_levels: 1,
            format,
        }
    }

    /// Byte size of one depth slice of the base mip level.
    pub fn slice_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * self.format.bytes_per_texel()
    }
}

/// A descriptor used to create a buffer resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Total byte length of the buffer.
    pub length: u64,
    /// `true` for buffers rewritten every frame; hints the backend toward
    /// CPU-visible placement.
    pub dynamic: bool,
}

/// A descriptor used to create a uniform parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDesc {
    /// Byte length of the CPU-side parameter block.
    pub length: u64,
}

/// A descriptor used to create a kernel (GPU program) resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDesc {
    /// Name of the kernel entry point.
    pub entry: String,
}

/// A descriptor used to create a port binding, attaching surfaces to a
/// kernel's input/output ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBindingDesc {
    /// Entry-point name of the kernel the binding targets.
    pub kernel: String,
    /// Number of ports bound.
    pub port_count: u32,
}

/// A creation descriptor, one variant per resource type.
///
/// This is the strongly typed replacement for an opaque parameter blob: the
/// database, the cache heuristics, and the backends all pattern-match on it
/// instead of trusting a caller-supplied layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuResourceDesc {
    /// Creation parameters for a texture.
    Texture(TextureDesc),
    /// Creation parameters for a buffer.
    Buffer(BufferDesc),
    /// Creation parameters for a uniform parameter set.
    Uniform(UniformDesc),
    /// Creation parameters for a kernel.
    Kernel(KernelDesc),
    /// Creation parameters for a port binding.
    PortBinding(PortBindingDesc),
}

impl GpuResourceDesc {
    /// The resource type this descriptor creates.
    pub fn resource_type(&self) -> GpuResourceType {
        match self {
            GpuResourceDesc::Texture(_) => GpuResourceType::Texture,
            GpuResourceDesc::Buffer(_) => GpuResourceType::Buffer,
            GpuResourceDesc::Uniform(_) => GpuResourceType::Uniform,
            GpuResourceDesc::Kernel(_) => GpuResourceType::Kernel,
            GpuResourceDesc::PortBinding(_) => GpuResourceType::PortBinding,
        }
    }
}

/// The polymorphic CPU-side resource object owned by a database slot.
///
/// Concrete implementations retain whatever state the engine needs between
/// creation and destruction; the native device object lives behind a
/// [`NativeResourceId`](crate::gpu::backend::NativeResourceId) on the
/// dispatch side and is never stored here.
pub trait GpuResource: Send + Sync + fmt::Debug {
    /// The type this resource was created as.
    fn resource_type(&self) -> GpuResourceType;

    /// Downcast hook for callers that know the concrete resource type.
    fn as_any(&self) -> &dyn Any;
}

/// A factory registered with the resource database, one per resource type.
///
/// The database stays agnostic of concrete resource implementations by
/// deferring construction and destruction here. Factories must not call back
/// into the database: creation runs under the database lock.
pub trait GpuResourceFactory: Send + Sync + fmt::Debug {
    /// Builds the CPU-side resource object for `desc`.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidDescriptor` - if `desc` is not a descriptor
    ///   this factory understands or its parameters are rejected.
    fn create_resource(&self, desc: &GpuResourceDesc)
        -> Result<Arc<dyn GpuResource>, ResourceError>;

    /// Reclaims a resource previously produced by this factory.
    ///
    /// The default implementation simply drops the reference; factories that
    /// pool or recycle resources override this.
    fn destroy_resource(&self, resource: Arc<dyn GpuResource>) {
        drop(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_for_every_type() {
        for ty in GpuResourceType::ALL {
            assert_eq!(GpuResourceType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn tag_zero_is_reserved() {
        // Tag 0 would let a zero raw handle decode; it must stay unused.
        assert_eq!(GpuResourceType::from_tag(0), None);
    }

    #[test]
    fn descriptor_reports_its_resource_type() {
        let desc = GpuResourceDesc::Buffer(BufferDesc {
            length: 64,
            dynamic: false,
        });
        assert_eq!(desc.resource_type(), GpuResourceType::Buffer);
    }

    #[test]
    fn texture_slice_bytes_scales_with_extent() {
        let desc = TextureDesc::new_2d(256, 128, TextureFormat::Rgba8);
        assert_eq!(desc.slice_bytes(), 256 * 128 * 4);
    }
}
