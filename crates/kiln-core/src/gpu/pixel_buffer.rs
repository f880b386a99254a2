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

//! Image resources: render targets, depth targets and sampled textures.

use super::descriptor_allocator::DescriptorAllocator;
use super::resource::{AsResource, GpuResource, ResourceHandle};
use crate::math::LinearRgba;
use crate::renderer::api::{
    ClearValue, CpuDescriptorHandle, DescriptorHandle, Format, GpuDescriptorHandle, ResourceDesc,
    ResourceFlags, ResourceState, ShaderResourceViewDesc,
};
use crate::renderer::{GraphicsDevice, ResourceError};
use std::sync::Arc;

fn table(handle: &DescriptorHandle) -> Result<GpuDescriptorHandle, ResourceError> {
    handle.gpu().ok_or_else(|| {
        ResourceError::InvalidView("descriptor was allocated from a CPU-only heap".to_string())
    })
}

/// An offscreen color render target that can also be sampled.
///
/// Owns an RTV and an SRV. Resizing recreates the resource and rewrites both
/// views into the same descriptor slots, so handles stay stable.
#[derive(Debug)]
pub struct ColorBuffer {
    resource: GpuResource,
    rtv: DescriptorHandle,
    srv: DescriptorHandle,
    clear_color: LinearRgba,
    size: (u32, u32),
}

impl ColorBuffer {
    /// Creates a `width` x `height` target.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        rtv_allocator: &mut DescriptorAllocator,
        srv_allocator: &mut DescriptorAllocator,
        label: &str,
        (width, height): (u32, u32),
        format: Format,
        clear_color: LinearRgba,
    ) -> Result<Self, ResourceError> {
        let resource = Self::allocate(device, label, width, height, format, clear_color)?;
        let rtv = rtv_allocator.allocate()?;
        let srv = srv_allocator.allocate()?;
        Self::write_views(device, &resource, rtv, srv)?;
        Ok(Self {
            resource,
            rtv,
            srv,
            clear_color,
            size: (width, height),
        })
    }

    fn allocate(
        device: &Arc<dyn GraphicsDevice>,
        label: &str,
        width: u32,
        height: u32,
        format: Format,
        clear_color: LinearRgba,
    ) -> Result<GpuResource, ResourceError> {
        GpuResource::create(
            device,
            ResourceDesc::texture_2d(
                label,
                width.max(1),
                height.max(1),
                format,
                ResourceFlags::ALLOW_RENDER_TARGET,
            ),
            ResourceState::Common,
            Some(ClearValue::Color(clear_color.to_array())),
        )
    }

    fn write_views(
        device: &Arc<dyn GraphicsDevice>,
        resource: &GpuResource,
        rtv: DescriptorHandle,
        srv: DescriptorHandle,
    ) -> Result<(), ResourceError> {
        device.create_render_target_view(resource.id(), rtv.cpu())?;
        device.create_shader_resource_view(
            resource.id(),
            &ShaderResourceViewDesc::Texture2D {
                format: resource.desc().format,
            },
            srv.cpu(),
        )
    }

    /// Recreates the target at a new size, keeping its descriptor slots.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        if self.size == (width, height) {
            return Ok(());
        }
        let device = self.resource.device().clone();
        let desc = self.resource.desc().clone();
        let resource = Self::allocate(
            &device,
            &desc.label,
            width,
            height,
            desc.format,
            self.clear_color,
        )?;
        Self::write_views(&device, &resource, self.rtv, self.srv)?;
        self.resource = resource;
        self.size = (width, height);
        Ok(())
    }

    /// The render target view.
    pub fn rtv(&self) -> CpuDescriptorHandle {
        self.rtv.cpu()
    }

    /// The shader resource view.
    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    /// The shader resource view as a descriptor table start.
    pub fn srv_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        table(&self.srv)
    }

    /// The color the target is cleared to.
    pub fn clear_color(&self) -> LinearRgba {
        self.clear_color
    }

    /// The texel format.
    pub fn format(&self) -> Format {
        self.resource.desc().format
    }

    /// The size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl AsResource for ColorBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

/// A depth target with an optional SRV for sampling (shadow maps, scene depth).
#[derive(Debug)]
pub struct DepthBuffer {
    resource: GpuResource,
    dsv: DescriptorHandle,
    srv: Option<DescriptorHandle>,
    clear_depth: f32,
    size: (u32, u32),
}

impl DepthBuffer {
    /// The format of every depth buffer.
    pub const FORMAT: Format = Format::Depth32Float;

    /// Creates a `width` x `height` depth target. An SRV is created only when
    /// `srv_allocator` is given.
    pub fn create(
        device: &Arc<dyn GraphicsDevice>,
        dsv_allocator: &mut DescriptorAllocator,
        srv_allocator: Option<&mut DescriptorAllocator>,
        label: &str,
        (width, height): (u32, u32),
    ) -> Result<Self, ResourceError> {
        let sampled = srv_allocator.is_some();
        let resource = Self::allocate(device, label, width, height, sampled)?;
        let dsv = dsv_allocator.allocate()?;
        let srv = match srv_allocator {
            Some(alloc) => Some(alloc.allocate()?),
            None => None,
        };
        Self::write_views(device, &resource, dsv, srv)?;
        Ok(Self {
            resource,
            dsv,
            srv,
            clear_depth: 1.0,
            size: (width, height),
        })
    }

    fn allocate(
        device: &Arc<dyn GraphicsDevice>,
        label: &str,
        width: u32,
        height: u32,
        sampled: bool,
    ) -> Result<GpuResource, ResourceError> {
        let mut flags = ResourceFlags::ALLOW_DEPTH_STENCIL;
        if !sampled {
            flags |= ResourceFlags::DENY_SHADER_RESOURCE;
        }
        GpuResource::create(
            device,
            ResourceDesc::texture_2d(label, width.max(1), height.max(1), Self::FORMAT, flags),
            ResourceState::DepthWrite,
            Some(ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            }),
        )
    }

    fn write_views(
        device: &Arc<dyn GraphicsDevice>,
        resource: &GpuResource,
        dsv: DescriptorHandle,
        srv: Option<DescriptorHandle>,
    ) -> Result<(), ResourceError> {
        device.create_depth_stencil_view(resource.id(), dsv.cpu())?;
        if let Some(srv) = srv {
            device.create_shader_resource_view(
                resource.id(),
                &ShaderResourceViewDesc::Texture2D {
                    format: Self::FORMAT,
                },
                srv.cpu(),
            )?;
        }
        Ok(())
    }

    /// Recreates the target at a new size, keeping its descriptor slots.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        if self.size == (width, height) {
            return Ok(());
        }
        let device = self.resource.device().clone();
        let label = self.resource.desc().label.clone();
        let resource = Self::allocate(&device, &label, width, height, self.srv.is_some())?;
        Self::write_views(&device, &resource, self.dsv, self.srv)?;
        self.resource = resource;
        self.size = (width, height);
        Ok(())
    }

    /// The depth stencil view.
    pub fn dsv(&self) -> CpuDescriptorHandle {
        self.dsv.cpu()
    }

    /// The shader resource view, if the buffer is sampled.
    pub fn srv(&self) -> Option<DescriptorHandle> {
        self.srv
    }

    /// The shader resource view as a descriptor table start.
    pub fn srv_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        self.srv
            .as_ref()
            .ok_or_else(|| ResourceError::InvalidView("depth buffer is not sampled".to_string()))
            .and_then(table)
    }

    /// The depth the buffer is cleared to.
    pub fn clear_depth(&self) -> f32 {
        self.clear_depth
    }

    /// The size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl AsResource for DepthBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

/// An immutable sampled 2D texture uploaded once from CPU memory.
#[derive(Debug)]
pub struct Texture {
    resource: GpuResource,
    srv: DescriptorHandle,
    size: (u32, u32),
}

impl Texture {
    /// Creates an RGBA8 texture from tightly packed pixel rows.
    pub fn from_rgba8(
        device: &Arc<dyn GraphicsDevice>,
        allocator: &mut DescriptorAllocator,
        label: &str,
        (width, height): (u32, u32),
        pixels: &[u8],
    ) -> Result<Self, ResourceError> {
        let format = Format::Rgba8UnormSrgb;
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        if pixels.len() != expected {
            return Err(ResourceError::InvalidView(format!(
                "texture '{label}' expects {expected} bytes of pixels, got {}",
                pixels.len()
            )));
        }
        let resource = GpuResource::create(
            device,
            ResourceDesc::texture_2d(label, width, height, format, ResourceFlags::empty()),
            ResourceState::PixelShaderResource,
            None,
        )?;
        device.write_texture(resource.id(), pixels, width * format.bytes_per_pixel())?;
        let srv = allocator.allocate()?;
        device.create_shader_resource_view(
            resource.id(),
            &ShaderResourceViewDesc::Texture2D { format },
            srv.cpu(),
        )?;
        Ok(Self {
            resource,
            srv,
            size: (width, height),
        })
    }

    /// A 1x1 opaque white texture, the fallback for missing content.
    pub fn white(
        device: &Arc<dyn GraphicsDevice>,
        allocator: &mut DescriptorAllocator,
    ) -> Result<Self, ResourceError> {
        Self::from_rgba8(device, allocator, "white", (1, 1), &[255, 255, 255, 255])
    }

    /// The shader resource view.
    pub fn srv(&self) -> DescriptorHandle {
        self.srv
    }

    /// The shader resource view as a descriptor table start.
    pub fn srv_table(&self) -> Result<GpuDescriptorHandle, ResourceError> {
        table(&self.srv)
    }

    /// The size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl AsResource for Texture {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource.resource_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDescriptor, MockDevice};
    use crate::renderer::api::DescriptorHeapKind;

    #[test]
    fn test_color_buffer_resize_keeps_descriptor_slots() {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut rtv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Rtv, 4);
        let mut srv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::CbvSrvUav, 4);

        let mut buffer = ColorBuffer::create(
            &device,
            &mut rtv,
            &mut srv,
            "scene",
            (64, 32),
            Format::Rgba16Float,
            LinearRgba::BLACK,
        )
        .unwrap();
        let old = buffer.resource_handle().id;
        let rtv_slot = buffer.rtv();

        buffer.resize(128, 64).unwrap();

        let new = buffer.resource_handle().id;
        assert_ne!(old, new);
        assert_eq!(buffer.rtv(), rtv_slot);
        assert_eq!(
            mock.state().descriptor(rtv_slot),
            Some(&MockDescriptor::Rtv(new))
        );
        assert!(mock.state().destroyed.contains(&old));
    }

    #[test]
    fn test_depth_buffer_without_srv_cannot_be_sampled() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let mut dsv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Dsv, 4);

        let depth = DepthBuffer::create(&device, &mut dsv, None, "depth", (16, 16)).unwrap();

        assert!(depth.srv().is_none());
        assert!(depth.srv_table().is_err());
    }

    #[test]
    fn test_texture_rejects_short_pixel_data() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let mut srv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::CbvSrvUav, 4);
        assert!(Texture::from_rgba8(&device, &mut srv, "bad", (2, 2), &[0; 4]).is_err());
        assert!(Texture::white(&device, &mut srv).is_ok());
    }
}
