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

//! Opaque, typed handles for GPU resources.

use crate::gpu::resource::GpuResourceType;
use std::fmt;
use std::num::NonZeroU32;

/// Number of low bits reserved for the slot index.
const INDEX_BITS: u32 = 24;

/// Mask selecting the slot-index bits of a raw handle value.
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Maximum number of slots a single resource type can address.
///
/// The low bits of a handle carry `slot index + 1`, so the largest storable
/// index is one less than the raw field maximum.
pub const MAX_SLOTS_PER_TYPE: u32 = INDEX_MASK - 1;

/// An opaque handle identifying a resource in the resource database without
/// exposing a pointer to it.
///
/// The high 8 bits carry the resource's type tag and the low 24 bits carry
/// `slot index + 1`. The `+ 1` keeps the all-zero bit pattern
/// unrepresentable: there is no null handle, and `Option<GpuResourceHandle>`
/// is the same size as the raw `u32`.
///
/// A handle stays unique until its slot is reused after deletion; holders
/// that may outlive the resource should re-validate with the database's
/// `check_handle` before risky operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuResourceHandle(NonZeroU32);

impl GpuResourceHandle {
    /// Packs a resource type and slot index into a handle.
    ///
    /// `index` must be below [`MAX_SLOTS_PER_TYPE`]; the resource database
    /// never allocates past that bound.
    pub fn new(resource_type: GpuResourceType, index: u32) -> Self {
        debug_assert!(index < MAX_SLOTS_PER_TYPE, "slot index out of range");
        let raw = (u32::from(resource_type.tag()) << INDEX_BITS) | (index + 1);
        // The low field is index + 1, so the packed value is never zero.
        Self(NonZeroU32::new(raw).expect("packed handle value is non-zero"))
    }

    /// Reconstructs a handle from its raw transport value.
    ///
    /// Returns `None` if `raw` is zero, carries an unknown type tag, or has
    /// empty index bits. Never logs: this is a silent validity probe usable
    /// on untrusted values.
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw & INDEX_MASK == 0 {
            return None;
        }
        GpuResourceType::from_tag((raw >> INDEX_BITS) as u8)?;
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw `u32` transport value of this handle.
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    /// The resource type encoded in the handle's tag bits.
    pub fn resource_type(self) -> GpuResourceType {
        // Both constructors validate the tag bits.
        GpuResourceType::from_tag((self.0.get() >> INDEX_BITS) as u8)
            .expect("handle carries a valid type tag")
    }

    /// The slot index encoded in the handle's low bits.
    pub fn index(self) -> u32 {
        (self.0.get() & INDEX_MASK) - 1
    }
}

impl fmt::Debug for GpuResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource_type(), self.index())
    }
}
