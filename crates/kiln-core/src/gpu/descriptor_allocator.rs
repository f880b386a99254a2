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

use crate::renderer::api::{
    DescriptorHandle, DescriptorHeapDesc, DescriptorHeapId, DescriptorHeapKind,
};
use crate::renderer::{GraphicsDevice, ResourceError};
use std::sync::Arc;

/// Bump allocator over a pool of fixed-capacity descriptor heaps.
///
/// Slots are handed out once, at resource-creation time, and never returned.
/// When the current heap is full a new heap of the same capacity is created
/// and appended to the pool; heaps already in the pool are kept alive for the
/// lifetime of the allocator so every handle it returned stays valid.
#[derive(Debug)]
pub struct DescriptorAllocator {
    device: Arc<dyn GraphicsDevice>,
    kind: DescriptorHeapKind,
    capacity: u32,
    heaps: Vec<DescriptorHeapId>,
    remaining: u32,
}

impl DescriptorAllocator {
    /// The default number of slots per heap.
    pub const DEFAULT_HEAP_CAPACITY: u32 = 256;

    /// Creates an allocator for `kind`. No heap is created until the first allocation.
    pub fn new(device: Arc<dyn GraphicsDevice>, kind: DescriptorHeapKind, capacity: u32) -> Self {
        Self {
            device,
            kind,
            capacity: capacity.max(1),
            heaps: Vec::new(),
            remaining: 0,
        }
    }

    /// Returns the next free slot, creating a new heap if the current one is full.
    ///
    /// ## Errors
    /// * `ResourceError` - If the device fails to create a new heap.
    pub fn allocate(&mut self) -> Result<DescriptorHandle, ResourceError> {
        if self.remaining == 0 {
            let heap = self.device.create_descriptor_heap(&DescriptorHeapDesc {
                kind: self.kind,
                capacity: self.capacity,
                shader_visible: self.kind.is_shader_visible(),
            })?;
            log::debug!(
                "{:?} descriptor pool grew to {} heap(s) of {} slots",
                self.kind,
                self.heaps.len() + 1,
                self.capacity
            );
            self.heaps.push(heap);
            self.remaining = self.capacity;
        }

        let heap = *self
            .heaps
            .last()
            .ok_or_else(|| ResourceError::BackendError("descriptor pool is empty".into()))?;
        let index = self.capacity - self.remaining;
        self.remaining -= 1;
        Ok(DescriptorHandle::new(
            heap,
            index,
            self.kind.is_shader_visible(),
        ))
    }

    /// The heap category this allocator serves.
    pub fn kind(&self) -> DescriptorHeapKind {
        self.kind
    }

    /// The slots per heap.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Every heap created so far, oldest first.
    pub fn heaps(&self) -> &[DescriptorHeapId] {
        &self.heaps
    }
}

/// One allocator per descriptor heap category.
#[derive(Debug)]
pub struct DescriptorAllocators {
    /// Shader-visible constant buffer, shader resource and unordered access views.
    pub cbv_srv_uav: DescriptorAllocator,
    /// Shader-visible samplers.
    pub sampler: DescriptorAllocator,
    /// Render target views.
    pub rtv: DescriptorAllocator,
    /// Depth stencil views.
    pub dsv: DescriptorAllocator,
}

impl DescriptorAllocators {
    /// Creates the four allocators with `capacity` slots per heap.
    pub fn new(device: &Arc<dyn GraphicsDevice>, capacity: u32) -> Self {
        Self {
            cbv_srv_uav: DescriptorAllocator::new(
                device.clone(),
                DescriptorHeapKind::CbvSrvUav,
                capacity,
            ),
            sampler: DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Sampler, capacity),
            rtv: DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Rtv, capacity),
            dsv: DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Dsv, capacity),
        }
    }

    /// The shader-visible heaps draws and dispatches resolve tables against.
    pub fn shader_visible_heaps(&self) -> Vec<DescriptorHeapId> {
        self.cbv_srv_uav
            .heaps()
            .iter()
            .chain(self.sampler.heaps())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use std::collections::HashSet;

    #[test]
    fn test_exhausted_heap_spills_into_new_heap() {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut allocator = DescriptorAllocator::new(device, DescriptorHeapKind::CbvSrvUav, 256);

        let handles: Vec<_> = (0..257)
            .map(|_| allocator.allocate().expect("allocation"))
            .collect();

        assert_eq!(allocator.heaps().len(), 2);
        let distinct: HashSet<_> = handles.iter().map(|h| h.cpu()).collect();
        assert_eq!(distinct.len(), 257);

        let first = handles[0].cpu();
        let last_of_first = handles[255].cpu();
        let spilled = handles[256].cpu();
        assert_eq!(first.heap, last_of_first.heap);
        assert_eq!(last_of_first.index, 255);
        assert_ne!(spilled.heap, first.heap);
        assert_eq!(spilled.index, 0);

        let state = mock.state();
        assert_eq!(state.heaps.len(), 2);
        assert!(state.heaps.values().all(|h| h.desc.capacity == 256));
    }

    #[test]
    fn test_handles_from_both_heaps_stay_writable() {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Sampler, 4);

        let handles: Vec<_> = (0..5).map(|_| allocator.allocate().unwrap()).collect();
        for h in &handles {
            device
                .create_sampler(&crate::renderer::api::SamplerDesc::LINEAR_WRAP, h.cpu())
                .expect("slot must remain valid");
        }

        let state = mock.state();
        assert!(handles.iter().all(|h| state.descriptor(h.cpu()).is_some()));
    }

    #[test]
    fn test_visibility_follows_heap_kind() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let mut rtv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Rtv, 8);
        let mut srv = DescriptorAllocator::new(device, DescriptorHeapKind::CbvSrvUav, 8);

        assert!(rtv.allocate().unwrap().gpu().is_none());
        assert!(srv.allocate().unwrap().gpu().is_some());
    }
}
