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

use crate::renderer::api::{ClearValue, GpuVirtualAddress, ResourceDesc, ResourceId, ResourceState};
use crate::renderer::{GraphicsDevice, ResourceError};
use std::fmt;
use std::sync::Arc;

/// A copyable reference to a committed resource, as carried by per-frame
/// submission records.
///
/// It does not own the resource. Its `initial_state` seeds the central state
/// tracker the first time the resource is transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    /// The resource.
    pub id: ResourceId,
    /// The state the resource was created in.
    pub initial_state: ResourceState,
}

/// Anything that names a committed resource the command context can transition.
pub trait AsResource {
    /// The resource and its creation state.
    fn resource_handle(&self) -> ResourceHandle;
}

impl AsResource for ResourceHandle {
    fn resource_handle(&self) -> ResourceHandle {
        *self
    }
}

/// Exclusive owner of one committed GPU allocation.
///
/// The allocation is released when the `GpuResource` is dropped. The resource
/// does not store its current usage state: the [`CommandContext`] that records
/// transitions is the single authority for it.
///
/// [`CommandContext`]: crate::gpu::CommandContext
pub struct GpuResource {
    device: Arc<dyn GraphicsDevice>,
    id: ResourceId,
    desc: ResourceDesc,
    initial_state: ResourceState,
}

impl GpuResource {
    /// Allocates a committed resource on `device`.
    ///
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - The device could not allocate it.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        desc: ResourceDesc,
        initial_state: ResourceState,
        clear_value: Option<ClearValue>,
    ) -> Result<Self, ResourceError> {
        let id = device.create_committed_resource(&desc, initial_state, clear_value)?;
        log::trace!("Created resource {:?} '{}'", id, desc.label);
        Ok(Self {
            device: device.clone(),
            id,
            desc,
            initial_state,
        })
    }

    /// The backend id of the allocation.
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The creation description.
    #[inline]
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    /// The state the resource was created in.
    #[inline]
    pub fn initial_state(&self) -> ResourceState {
        self.initial_state
    }

    /// The GPU virtual address of the first byte.
    #[inline]
    pub fn gpu_virtual_address(&self) -> GpuVirtualAddress {
        GpuVirtualAddress::new(self.id, 0)
    }

    /// The size in bytes for buffers, the width for textures.
    #[inline]
    pub fn width(&self) -> u64 {
        self.desc.width
    }

    /// The device the resource lives on.
    #[inline]
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl AsResource for GpuResource {
    fn resource_handle(&self) -> ResourceHandle {
        ResourceHandle {
            id: self.id,
            initial_state: self.initial_state,
        }
    }
}

impl fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("id", &self.id)
            .field("label", &self.desc.label)
            .field("initial_state", &self.initial_state)
            .finish()
    }
}

impl Drop for GpuResource {
    fn drop(&mut self) {
        log::trace!("Destroying resource {:?} '{}'", self.id, self.desc.label);
        self.device.destroy_resource(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use crate::renderer::api::HeapType;

    #[test]
    fn test_resource_released_on_drop() {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());

        let resource = GpuResource::create(
            &device,
            ResourceDesc::buffer("scratch", 64, HeapType::Default),
            ResourceState::Common,
            None,
        )
        .expect("allocation");
        let id = resource.id();
        assert_eq!(mock.live_resource_count(), 1);

        drop(resource);

        assert_eq!(mock.live_resource_count(), 0);
        assert_eq!(mock.state().destroyed, vec![id]);
    }

    #[test]
    fn test_failed_allocation_is_reported() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let result = GpuResource::create(
            &device,
            ResourceDesc::buffer("empty", 0, HeapType::Default),
            ResourceState::Common,
            None,
        );
        assert!(matches!(result, Err(ResourceError::AllocationFailed { .. })));
    }
}
