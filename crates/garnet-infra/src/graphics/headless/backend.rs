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

//! A backend that keeps resource contents in ordinary memory.
//!
//! Used by tests, tools, and servers that run the engine without a device.
//! Buffers, textures, and uniforms get real byte storage, so update and
//! readback behave like a driver that always succeeds; kernels and port
//! bindings are tracked but hold no bytes.

use garnet_core::{
    BackendError, GpuBackend, GpuResourceDesc, NativeResourceId, SurfaceUpdateFlag,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
struct HeadlessResource {
    desc: GpuResourceDesc,
    bytes: Option<Vec<u8>>,
}

impl HeadlessResource {
    fn new(desc: &GpuResourceDesc) -> Self {
        let storage_len = match desc {
            GpuResourceDesc::Buffer(buffer) => Some(buffer.length),
            GpuResourceDesc::Texture(texture) => {
                Some(texture.slice_bytes() * u64::from(texture.depth) * u64::from(texture.faces))
            }
            GpuResourceDesc::Uniform(uniform) => Some(uniform.length),
            GpuResourceDesc::Kernel(_) | GpuResourceDesc::PortBinding(_) => None,
        };
        Self {
            desc: desc.clone(),
            bytes: storage_len.map(|len| vec![0u8; len as usize]),
        }
    }
}

/// An in-memory [`GpuBackend`] with no native device behind it.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    resources: Mutex<HashMap<NativeResourceId, HeadlessResource>>,
    next_id: AtomicU64,
}

impl HeadlessBackend {
    /// Creates an empty headless backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live native objects.
    pub fn resource_count(&self) -> usize {
        self.resources.lock().unwrap().len()
    }
}

impl GpuBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_resource(
        &self,
        descriptor: &GpuResourceDesc,
    ) -> Result<NativeResourceId, BackendError> {
        let id = NativeResourceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let resource = HeadlessResource::new(descriptor);
        log::trace!(
            "headless created {id:?} ({}, {} storage bytes)",
            descriptor.resource_type(),
            resource.bytes.as_ref().map_or(0, Vec::len)
        );
        self.resources.lock().unwrap().insert(id, resource);
        Ok(id)
    }

    fn update_resource(
        &self,
        id: NativeResourceId,
        offset: u64,
        data: &[u8],
        _flag: SurfaceUpdateFlag,
    ) -> Result<(), BackendError> {
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(&id)
            .ok_or(BackendError::UnknownResource(id))?;
        let Some(bytes) = resource.bytes.as_mut() else {
            return Err(BackendError::Unsupported(format!(
                "{} resources have no byte storage to update",
                resource.desc.resource_type()
            )));
        };
        let size = bytes.len() as u64;
        let len = data.len() as u64;
        let end = offset.checked_add(len).filter(|&end| end <= size);
        let Some(end) = end else {
            return Err(BackendError::OutOfBounds { offset, len, size });
        };
        bytes[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn destroy_resource(&self, id: NativeResourceId) -> Result<(), BackendError> {
        match self.resources.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(BackendError::UnknownResource(id)),
        }
    }

    fn read_back(&self, id: NativeResourceId) -> Result<Vec<u8>, BackendError> {
        let resources = self.resources.lock().unwrap();
        let resource = resources.get(&id).ok_or(BackendError::UnknownResource(id))?;
        match &resource.bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(BackendError::Unsupported(format!(
                "{} resources have no byte storage to read",
                resource.desc.resource_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_core::{BufferDesc, KernelDesc, TextureDesc, TextureFormat};

    fn buffer_desc(length: u64) -> GpuResourceDesc {
        GpuResourceDesc::Buffer(BufferDesc {
            length,
            dynamic: false,
        })
    }

    #[test]
    fn updates_are_visible_to_readback() {
        let backend = HeadlessBackend::new();
        let id = backend.create_resource(&buffer_desc(8)).unwrap();
        backend
            .update_resource(id, 2, &[9, 9, 9], SurfaceUpdateFlag::Default)
            .unwrap();
        assert_eq!(backend.read_back(id).unwrap(), vec![0, 0, 9, 9, 9, 0, 0, 0]);
    }

    #[test]
    fn texture_storage_covers_slices_and_faces() {
        let backend = HeadlessBackend::new();
        let desc = GpuResourceDesc::Texture(TextureDesc {
            width: 4,
            height: 4,
            depth: 2,
            faces: 6,
            mip_levels: 1,
            format: TextureFormat::Rgba8,
        });
        let id = backend.create_resource(&desc).unwrap();
        assert_eq!(backend.read_back(id).unwrap().len(), 4 * 4 * 4 * 2 * 6);
    }

    #[test]
    fn out_of_range_update_is_rejected() {
        let backend = HeadlessBackend::new();
        let id = backend.create_resource(&buffer_desc(4)).unwrap();
        let err = backend
            .update_resource(id, 2, &[1, 2, 3], SurfaceUpdateFlag::Default)
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::OutOfBounds {
                offset: 2,
                len: 3,
                size: 4
            }
        );
    }

    #[test]
    fn operations_on_unknown_ids_fail() {
        let backend = HeadlessBackend::new();
        let ghost = NativeResourceId(77);
        assert_eq!(
            backend.read_back(ghost).unwrap_err(),
            BackendError::UnknownResource(ghost)
        );
        assert_eq!(
            backend.destroy_resource(ghost).unwrap_err(),
            BackendError::UnknownResource(ghost)
        );
    }

    #[test]
    fn kernels_have_no_byte_storage() {
        let backend = HeadlessBackend::new();
        let id = backend
            .create_resource(&GpuResourceDesc::Kernel(KernelDesc {
                entry: "main".to_string(),
            }))
            .unwrap();
        assert!(matches!(
            backend.read_back(id).unwrap_err(),
            BackendError::Unsupported(_)
        ));
    }

    #[test]
    fn destroy_releases_the_slot() {
        let backend = HeadlessBackend::new();
        let id = backend.create_resource(&buffer_desc(4)).unwrap();
        assert_eq!(backend.resource_count(), 1);
        backend.destroy_resource(id).unwrap();
        assert_eq!(backend.resource_count(), 0);
    }
}
