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

//! The standard resource classes and their factories.
//!
//! Each class is a thin CPU-side object retaining its creation descriptor;
//! the native device object lives on the dispatch side. Engines with richer
//! per-resource state register their own factories instead of these.

use crate::database::GpuResourceDatabase;
use garnet_core::{
    BufferDesc, GpuResource, GpuResourceDesc, GpuResourceFactory, GpuResourceType, KernelDesc,
    PortBindingDesc, ResourceError, TextureDesc, UniformDesc,
};
use std::any::Any;
use std::sync::Arc;

/// Defines a descriptor-retaining resource class and its factory.
macro_rules! standard_resource {
    ($(#[$doc:meta])* $resource:ident, $factory:ident, $variant:ident, $desc:ty) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $resource {
            desc: $desc,
        }

        impl $resource {
            /// The descriptor this resource was created from.
            pub fn desc(&self) -> &$desc {
                &self.desc
            }
        }

        impl GpuResource for $resource {
            fn resource_type(&self) -> GpuResourceType {
                GpuResourceType::$variant
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        #[doc = concat!("Factory producing [`", stringify!($resource), "`] objects.")]
        #[derive(Debug, Default)]
        pub struct $factory;

        impl GpuResourceFactory for $factory {
            fn create_resource(
                &self,
                desc: &GpuResourceDesc,
            ) -> Result<Arc<dyn GpuResource>, ResourceError> {
                match desc {
                    GpuResourceDesc::$variant(desc) => Ok(Arc::new($resource {
                        desc: desc.clone(),
                    })),
                    other => Err(ResourceError::InvalidDescriptor(format!(
                        "{} factory given a {} descriptor",
                        GpuResourceType::$variant,
                        other.resource_type()
                    ))),
                }
            }
        }
    };
}

standard_resource!(
    /// CPU-side texture resource.
    TextureResource,
    TextureFactory,
    Texture,
    TextureDesc
);

standard_resource!(
    /// CPU-side buffer resource.
    BufferResource,
    BufferFactory,
    Buffer,
    BufferDesc
);

standard_resource!(
    /// CPU-side uniform parameter set.
    UniformResource,
    UniformFactory,
    Uniform,
    UniformDesc
);

standard_resource!(
    /// CPU-side kernel resource.
    KernelResource,
    KernelFactory,
    Kernel,
    KernelDesc
);

standard_resource!(
    /// CPU-side port binding.
    PortBindingResource,
    PortBindingFactory,
    PortBinding,
    PortBindingDesc
);

/// Registers the standard factory for every resource type.
///
/// Types that already have a factory keep it; `register_factory` logs those
/// collisions.
pub fn register_standard_factories(db: &GpuResourceDatabase) {
    db.register_factory(GpuResourceType::Texture, "texture", Arc::new(TextureFactory));
    db.register_factory(GpuResourceType::Buffer, "buffer", Arc::new(BufferFactory));
    db.register_factory(GpuResourceType::Uniform, "uniform", Arc::new(UniformFactory));
    db.register_factory(GpuResourceType::Kernel, "kernel", Arc::new(KernelFactory));
    db.register_factory(
        GpuResourceType::PortBinding,
        "port binding",
        Arc::new(PortBindingFactory),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_core::TextureFormat;

    #[test]
    fn factory_retains_the_descriptor() {
        let desc = TextureDesc::new_2d(32, 32, TextureFormat::Bgra8);
        let resource = TextureFactory
            .create_resource(&GpuResourceDesc::Texture(desc.clone()))
            .expect("matching descriptor");
        assert_eq!(resource.resource_type(), GpuResourceType::Texture);
        let texture = resource
            .as_any()
            .downcast_ref::<TextureResource>()
            .expect("concrete type");
        assert_eq!(texture.desc(), &desc);
    }

    #[test]
    fn factory_rejects_foreign_descriptors() {
        let err = KernelFactory
            .create_resource(&GpuResourceDesc::Buffer(BufferDesc {
                length: 8,
                dynamic: false,
            }))
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidDescriptor(_)));
    }
}
