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

//! Buffer resources: CPU-writable upload buffers and GPU structured buffers.

use super::descriptor_allocator::DescriptorAllocator;
use super::resource::{AsResource, GpuResource, ResourceHandle};
use super::{align_up, CONSTANT_BUFFER_ALIGNMENT};
use crate::renderer::api::{
    ConstantBufferViewDesc, DescriptorHandle, GpuDescriptorHandle, GpuVirtualAddress, HeapType,
    IndexBufferView, IndexFormat, ResourceDesc, ResourceFlags, ResourceState,
    ShaderResourceViewDesc, UnorderedAccessViewDesc, VertexBufferView,
};
use crate::renderer::{GraphicsDevice, ResourceError};
use bytemuck::Pod;
use std::marker::PhantomData;
use std::sync::Arc;

fn shader_visible(handle: &DescriptorHandle) -> Result<GpuDescriptorHandle, ResourceError> {
    handle.gpu().ok_or_else(|| {
        ResourceError::InvalidView("descriptor was allocated from a CPU-only heap".to_string())
    })
}

/// A buffer in the upload heap with a CPU-side mapping.
///
/// Writes go through [`map`](Self::map) and are published to the GPU by
/// [`unmap`](Self::unmap). There is a single producer thread and no GPU read
/// is in flight while the frame core writes (the previous frame has been
/// fenced), so no further synchronization is needed.
#[derive(Debug)]
pub struct UploadBuffer {
    resource: GpuResource,
    mapped: Vec<u8>,
    dirty: Option<(usize, usize)>,
}

impl UploadBuffer {
    /// Allocates `size` bytes in the upload heap.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        label: &str,
        size: u64,
    ) -> Result<Self, ResourceError> {
        let resource = GpuResource::create(
            device,
            ResourceDesc::buffer(label, size, HeapType::Upload),
            ResourceState::GenericRead,
            None,
        )?;
        Ok(Self {
            resource,
            mapped: vec![0; size as usize],
            dirty: None,
        })
    }

    /// Allocates a buffer sized for `data` and uploads it.
    pub fn with_data(
        device: &Arc<dyn GraphicsDevice>,
        label: &str,
        data: &[u8],
    ) -> Result<Self, ResourceError> {
        let mut buffer = Self::create(device, label, data.len().max(4) as u64)?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    /// Opens the whole buffer for CPU writes.
    pub fn map(&mut self) -> &mut [u8] {
        self.dirty = Some((0, self.mapped.len()));
        &mut self.mapped
    }

    /// Publishes the bytes written since [`map`](Self::map) to the GPU copy.
    pub fn unmap(&mut self) -> Result<(), ResourceError> {
        if let Some((start, end)) = self.dirty.take() {
            self.resource.device().write_buffer(
                self.resource.id(),
                start as u64,
                &self.mapped[start..end],
            )?;
        }
        Ok(())
    }

    /// Copies `data` at `offset` and publishes it.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), ResourceError> {
        let end = offset + data.len();
        if end > self.mapped.len() {
            return Err(ResourceError::OutOfBounds {
                resource: self.resource.id(),
                offset: offset as u64,
                len: data.len() as u64,
                size: self.mapped.len() as u64,
            });
        }
        self.mapped[offset..end].copy_from_slice(data);
        self.dirty = Some((offset, end));
        self.unmap()
    }

    /// The size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.resource.width()
    }

    /// The GPU address of the first byte.
    pub fn gpu_virtual_address(&self) -> GpuVirtualAddress {
        self.resource.gpu_virtual_address()
    }

    /// A view of the first `size_in_bytes` bytes as vertices of `stride` bytes.
    pub fn vertex_buffer_view(&self, stride: u32, size_in_bytes: u32) -> VertexBufferView {
        VertexBufferView {
            location: self.gpu_virtual_address(),
            size_in_bytes,
            stride_in_bytes: stride,
        }
    }

    /// A view of the first `size_in_bytes` bytes as indices.
    pub fn index_buffer_view(&self, format: IndexFormat, size_in_bytes: u32) -> IndexBufferView {
        IndexBufferView {
            location: self.gpu_virtual_address(),
            size_in_bytes,
            format,
        }
    }

    /// The underlying resource.
    pub fn resource(&self) -> &GpuResource {
        &self.resource
    }
}

impl AsResource for UploadBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

/// A typed constant buffer in the upload heap, padded to 256 bytes.
#[derive(Debug)]
pub struct ConstantBuffer<T: Pod> {
    buffer: UploadBuffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    /// Allocates the buffer and uploads `initial`.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        label: &str,
        initial: &T,
    ) -> Result<Self, ResourceError> {
        let size = align_up(std::mem::size_of::<T>() as u64, CONSTANT_BUFFER_ALIGNMENT);
        let mut buffer = UploadBuffer::create(device, label, size)?;
        buffer.write(0, bytemuck::bytes_of(initial))?;
        Ok(Self {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Replaces the constants.
    pub fn update(&mut self, value: &T) -> Result<(), ResourceError> {
        self.buffer.write(0, bytemuck::bytes_of(value))
    }

    /// The address bound to root constant buffer parameters.
    pub fn gpu_virtual_address(&self) -> GpuVirtualAddress {
        self.buffer.gpu_virtual_address()
    }

    /// Writes a constant buffer view into a freshly allocated descriptor slot.
    pub fn create_view(
        &self,
        allocator: &mut DescriptorAllocator,
    ) -> Result<DescriptorHandle, ResourceError> {
        let handle = allocator.allocate()?;
        self.buffer.resource().device().create_constant_buffer_view(
            &ConstantBufferViewDesc {
                location: self.gpu_virtual_address(),
                size_in_bytes: self.buffer.size() as u32,
            },
            handle.cpu(),
        )?;
        Ok(handle)
    }
}

/// A read-only structured buffer in the default heap, exposed through an SRV.
#[derive(Debug)]
pub struct StructuredBuffer {
    resource: GpuResource,
    element_size: u32,
    element_count: u32,
    srv: DescriptorHandle,
}

impl StructuredBuffer {
    /// Allocates `element_count` elements of `element_size` bytes, optionally
    /// filled with `initial_data`.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        allocator: &mut DescriptorAllocator,
        label: &str,
        element_size: u32,
        element_count: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<Self, ResourceError> {
        let size = element_size as u64 * element_count.max(1) as u64;
        let resource = GpuResource::create(
            device,
            ResourceDesc::buffer(label, size, HeapType::Default),
            ResourceState::NonPixelShaderResource,
            None,
        )?;
        if let Some(data) = initial_data {
            device.write_buffer(resource.id(), 0, data)?;
        }
        let srv = allocator.allocate()?;
        device.create_shader_resource_view(
            resource.id(),
            &ShaderResourceViewDesc::StructuredBuffer {
                first_element: 0,
                num_elements: element_count,
                stride: element_size,
            },
            srv.cpu(),
        )?;
        Ok(Self {
            resource,
            element_size,
            element_count,
            srv,
        })
    }

    /// Overwrites elements starting at element `first`.
    pub fn write(&self, first: u32, data: &[u8]) -> Result<(), ResourceError> {
        self.resource.device().write_buffer(
            self.resource.id(),
            first as u64 * self.element_size as u64,
            data,
        )
    }

    /// The SRV descriptor.
    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    /// The SRV as a descriptor table start.
    pub fn srv_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        shader_visible(&self.srv)
    }

    /// The number of elements.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }
}

impl AsResource for StructuredBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

/// A structured buffer the GPU writes through a UAV and reads through an SRV.
#[derive(Debug)]
pub struct ReadWriteBuffer {
    resource: GpuResource,
    element_size: u32,
    element_count: u32,
    srv: DescriptorHandle,
    uav: DescriptorHandle,
}

impl ReadWriteBuffer {
    /// Allocates `element_count` elements of `element_size` bytes in the
    /// default heap, in the `Common` state.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        allocator: &mut DescriptorAllocator,
        label: &str,
        element_size: u32,
        element_count: u32,
    ) -> Result<Self, ResourceError> {
        let size = element_size as u64 * element_count.max(1) as u64;
        let resource = GpuResource::create(
            device,
            ResourceDesc::buffer(label, size, HeapType::Default)
                .with_flags(ResourceFlags::ALLOW_UNORDERED_ACCESS),
            ResourceState::Common,
            None,
        )?;
        let srv = allocator.allocate()?;
        device.create_shader_resource_view(
            resource.id(),
            &ShaderResourceViewDesc::StructuredBuffer {
                first_element: 0,
                num_elements: element_count,
                stride: element_size,
            },
            srv.cpu(),
        )?;
        let uav = allocator.allocate()?;
        device.create_unordered_access_view(
            resource.id(),
            &UnorderedAccessViewDesc {
                first_element: 0,
                num_elements: element_count,
                stride: element_size,
            },
            uav.cpu(),
        )?;
        Ok(Self {
            resource,
            element_size,
            element_count,
            srv,
            uav,
        })
    }

    /// Overwrites elements starting at element `first` from the CPU.
    pub fn write(&self, first: u32, data: &[u8]) -> Result<(), ResourceError> {
        self.resource.device().write_buffer(
            self.resource.id(),
            first as u64 * self.element_size as u64,
            data,
        )
    }

    /// The SRV descriptor.
    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    /// The UAV descriptor.
    pub fn uav(&self) -> DescriptorHandle {
        self.uav
    }

    /// The SRV as a descriptor table start.
    pub fn srv_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        shader_visible(&self.srv)
    }

    /// The UAV as a descriptor table start.
    pub fn uav_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        shader_visible(&self.uav)
    }

    /// The whole buffer viewed as vertices (skinning output).
    pub fn vertex_buffer_view(&self) -> VertexBufferView {
        VertexBufferView {
            location: self.resource.gpu_virtual_address(),
            size_in_bytes: self.element_size * self.element_count,
            stride_in_bytes: self.element_size,
        }
    }

    /// The number of elements.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// The size of one element in bytes.
    pub fn element_size(&self) -> u32 {
        self.element_size
    }
}

impl AsResource for ReadWriteBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDescriptor, MockDevice};
    use crate::renderer::api::DescriptorHeapKind;

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct Params {
        scale: f32,
        bias: f32,
    }

    fn setup() -> (MockDevice, Arc<dyn GraphicsDevice>) {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        (mock, device)
    }

    #[test]
    fn test_upload_buffer_publishes_on_unmap() {
        let (mock, device) = setup();
        let mut buffer = UploadBuffer::create(&device, "upload", 8).unwrap();
        let id = buffer.resource().id();

        buffer.map()[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(mock.contents(id).unwrap(), vec![0; 8]);

        buffer.unmap().unwrap();
        assert_eq!(mock.contents(id).unwrap(), vec![1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_upload_write_out_of_bounds_fails() {
        let (_mock, device) = setup();
        let mut buffer = UploadBuffer::create(&device, "upload", 4).unwrap();
        assert!(matches!(
            buffer.write(2, &[0; 4]),
            Err(ResourceError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_constant_buffer_is_256_aligned() {
        let (mock, device) = setup();
        let cb = ConstantBuffer::create(&device, "params", &Params { scale: 2.0, bias: 1.0 })
            .unwrap();
        let id = cb.gpu_virtual_address().resource();

        let data = mock.contents(id).unwrap();
        assert_eq!(data.len(), 256);
        assert_eq!(&data[..8], bytemuck::bytes_of(&Params { scale: 2.0, bias: 1.0 }));
    }

    #[test]
    fn test_read_write_buffer_exposes_srv_and_uav() {
        let (mock, device) = setup();
        let mut alloc = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::CbvSrvUav, 16);

        let buffer = ReadWriteBuffer::create(&device, &mut alloc, "particles", 64, 10).unwrap();

        let state = mock.state();
        assert!(matches!(
            state.descriptor(buffer.srv().cpu()),
            Some(MockDescriptor::Srv(_, ShaderResourceViewDesc::StructuredBuffer { num_elements: 10, stride: 64, .. }))
        ));
        assert!(matches!(
            state.descriptor(buffer.uav().cpu()),
            Some(MockDescriptor::Uav(_, UnorderedAccessViewDesc { num_elements: 10, .. }))
        ));
        assert_eq!(buffer.vertex_buffer_view().size_in_bytes, 640);
    }
}
