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

//! Committed resources: identifiers, descriptions, usage states and views.

use bitflags::bitflags;

/// An opaque handle to a committed resource owned by a backend.
///
/// Identifiers are never reused during the lifetime of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

/// The usage state a resource is in on the GPU timeline.
///
/// The states are mutually exclusive: a resource is in exactly one of them at
/// any time, and moving between two of them requires a transition barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// No particular usage; the state resources are created in by default.
    Common,
    /// Readable by any stage. The only state an upload-heap resource is in.
    GenericRead,
    /// Bound as a vertex buffer or read as a constant buffer.
    VertexAndConstantBuffer,
    /// Bound as an index buffer.
    IndexBuffer,
    /// Written as a color attachment.
    RenderTarget,
    /// Written as a depth attachment.
    DepthWrite,
    /// Bound as a read-only depth attachment.
    DepthRead,
    /// Read by the pixel stage.
    PixelShaderResource,
    /// Read by any stage other than the pixel stage.
    NonPixelShaderResource,
    /// Read and written through an unordered-access view.
    UnorderedAccess,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDest,
    /// Owned by the presentation engine.
    Present,
}

impl ResourceState {
    /// Returns `true` for states in which the GPU only reads the resource.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            ResourceState::GenericRead
                | ResourceState::VertexAndConstantBuffer
                | ResourceState::IndexBuffer
                | ResourceState::DepthRead
                | ResourceState::PixelShaderResource
                | ResourceState::NonPixelShaderResource
                | ResourceState::CopySource
                | ResourceState::Present
        )
    }
}

/// The memory pool a committed resource is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapType {
    /// GPU-local memory, written by the GPU or by explicit uploads.
    Default,
    /// CPU-writable memory read directly by the GPU.
    Upload,
}

/// The dimensionality of a committed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDimension {
    /// A linear byte buffer.
    Buffer,
    /// A two-dimensional image.
    Texture2D,
}

/// The texel formats used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// No format (buffers).
    Unknown,
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, linear.
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB encoded.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA, used for HDR scene targets.
    Rgba16Float,
    /// 32-bit float single channel.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl Format {
    /// Size of a single texel in bytes, or `0` for [`Format::Unknown`].
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Format::Unknown => 0,
            Format::Rgba8Unorm
            | Format::Rgba8UnormSrgb
            | Format::Bgra8Unorm
            | Format::Bgra8UnormSrgb
            | Format::R32Float
            | Format::Depth32Float => 4,
            Format::Rgba16Float => 8,
        }
    }

    /// Returns `true` for depth formats.
    pub fn is_depth(self) -> bool {
        matches!(self, Format::Depth32Float)
    }
}

bitflags! {
    /// Additional capabilities requested for a committed resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceFlags: u32 {
        /// The resource may be bound as a color render target.
        const ALLOW_RENDER_TARGET = 1 << 0;
        /// The resource may be bound as a depth-stencil target.
        const ALLOW_DEPTH_STENCIL = 1 << 1;
        /// The resource may be bound through an unordered-access view.
        const ALLOW_UNORDERED_ACCESS = 1 << 2;
        /// The resource is never read by shaders.
        const DENY_SHADER_RESOURCE = 1 << 3;
    }
}

/// A clear value optimized for at resource creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// A color clear.
    Color([f32; 4]),
    /// A depth/stencil clear.
    DepthStencil {
        /// Depth value.
        depth: f32,
        /// Stencil value.
        stencil: u8,
    },
}

/// Describes a committed resource to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDesc {
    /// A debug label.
    pub label: String,
    /// Buffer or texture.
    pub dimension: ResourceDimension,
    /// Width in texels, or size in bytes for buffers.
    pub width: u64,
    /// Height in texels; `1` for buffers.
    pub height: u32,
    /// The texel format; [`Format::Unknown`] for buffers.
    pub format: Format,
    /// Extra binding capabilities.
    pub flags: ResourceFlags,
    /// The memory pool.
    pub heap_type: HeapType,
}

impl ResourceDesc {
    /// Describes a buffer of `size` bytes.
    pub fn buffer(label: impl Into<String>, size: u64, heap_type: HeapType) -> Self {
        Self {
            label: label.into(),
            dimension: ResourceDimension::Buffer,
            width: size,
            height: 1,
            format: Format::Unknown,
            flags: ResourceFlags::empty(),
            heap_type,
        }
    }

    /// Describes a two-dimensional texture in the default heap.
    pub fn texture_2d(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: Format,
        flags: ResourceFlags,
    ) -> Self {
        Self {
            label: label.into(),
            dimension: ResourceDimension::Texture2D,
            width: width as u64,
            height,
            format,
            flags,
            heap_type: HeapType::Default,
        }
    }

    /// Adds capability flags to the description.
    pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns `true` if this describes a buffer.
    pub fn is_buffer(&self) -> bool {
        self.dimension == ResourceDimension::Buffer
    }
}

/// A GPU virtual address: a resource plus a byte offset into it.
///
/// The resource index is stored in the high 32 bits and the offset in the low
/// 32 bits, so addresses of the same resource compare by offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuVirtualAddress(pub u64);

impl GpuVirtualAddress {
    /// Builds the address of `offset` bytes into `resource`.
    #[inline]
    pub const fn new(resource: ResourceId, offset: u32) -> Self {
        Self(((resource.0 as u64) << 32) | offset as u64)
    }

    /// The resource this address points into.
    #[inline]
    pub const fn resource(self) -> ResourceId {
        ResourceId((self.0 >> 32) as u32)
    }

    /// The byte offset into the resource.
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 as u32
    }

    /// Returns the address `bytes` further into the same resource.
    #[inline]
    pub const fn offset_by(self, bytes: u32) -> Self {
        Self::new(self.resource(), self.offset() + bytes)
    }
}

/// The width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// A view of a buffer region used as vertex input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferView {
    /// Start of the vertex data.
    pub location: GpuVirtualAddress,
    /// Size of the viewed region in bytes.
    pub size_in_bytes: u32,
    /// Distance between consecutive vertices.
    pub stride_in_bytes: u32,
}

/// A view of a buffer region used as index input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferView {
    /// Start of the index data.
    pub location: GpuVirtualAddress,
    /// Size of the viewed region in bytes.
    pub size_in_bytes: u32,
    /// The index width.
    pub format: IndexFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_address_packs_resource_and_offset() {
        let addr = GpuVirtualAddress::new(ResourceId(7), 512);
        assert_eq!(addr.resource(), ResourceId(7));
        assert_eq!(addr.offset(), 512);
        assert_eq!(addr.offset_by(256).offset(), 768);
        assert_eq!(addr.offset_by(256).resource(), ResourceId(7));
    }

    #[test]
    fn test_read_only_states() {
        assert!(ResourceState::PixelShaderResource.is_read_only());
        assert!(!ResourceState::RenderTarget.is_read_only());
        assert!(!ResourceState::UnorderedAccess.is_read_only());
    }
}
