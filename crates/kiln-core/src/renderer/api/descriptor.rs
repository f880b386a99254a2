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

//! Descriptor heaps, descriptor handles and the view descriptions written into them.

use super::pipeline::CompareFunction;
use super::resource::{Format, GpuVirtualAddress};

/// The category of descriptors a heap stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    /// Constant buffer, shader resource and unordered access views.
    CbvSrvUav,
    /// Samplers.
    Sampler,
    /// Render target views.
    Rtv,
    /// Depth stencil views.
    Dsv,
}

impl DescriptorHeapKind {
    /// Whether heaps of this kind are visible to shaders.
    pub fn is_shader_visible(self) -> bool {
        matches!(self, DescriptorHeapKind::CbvSrvUav | DescriptorHeapKind::Sampler)
    }
}

/// An opaque handle to a descriptor heap owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorHeapId(pub u32);

/// Describes a descriptor heap to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapDesc {
    /// The category of descriptors.
    pub kind: DescriptorHeapKind,
    /// The fixed number of slots.
    pub capacity: u32,
    /// Whether shaders can reference the heap through descriptor tables.
    pub shader_visible: bool,
}

/// The CPU-side address of a descriptor slot, used to write views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuDescriptorHandle {
    /// The heap the slot lives in.
    pub heap: DescriptorHeapId,
    /// The slot index inside the heap.
    pub index: u32,
}

/// The GPU-side address of a descriptor slot, used as a descriptor table start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuDescriptorHandle {
    /// The heap the slot lives in.
    pub heap: DescriptorHeapId,
    /// The slot index inside the heap.
    pub index: u32,
}

/// A reference to one descriptor slot.
///
/// This is a plain value: it does not own the slot and its validity is tied to
/// the heap it was allocated from, which lives as long as its allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle {
    cpu: CpuDescriptorHandle,
    gpu: Option<GpuDescriptorHandle>,
}

impl DescriptorHandle {
    /// Creates a handle for `index` in `heap`, with a GPU half if the heap is
    /// shader visible.
    pub fn new(heap: DescriptorHeapId, index: u32, shader_visible: bool) -> Self {
        Self {
            cpu: CpuDescriptorHandle { heap, index },
            gpu: shader_visible.then_some(GpuDescriptorHandle { heap, index }),
        }
    }

    /// The CPU half of the handle.
    #[inline]
    pub fn cpu(&self) -> CpuDescriptorHandle {
        self.cpu
    }

    /// The GPU half of the handle, if the heap is shader visible.
    #[inline]
    pub fn gpu(&self) -> Option<GpuDescriptorHandle> {
        self.gpu
    }

    /// Returns `true` if the handle can be used as a descriptor table start.
    #[inline]
    pub fn is_shader_visible(&self) -> bool {
        self.gpu.is_some()
    }
}

/// Describes a shader resource view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderResourceViewDesc {
    /// A sampled 2D texture.
    Texture2D {
        /// The view format.
        format: Format,
    },
    /// A structured buffer read through a storage binding.
    StructuredBuffer {
        /// The first viewed element.
        first_element: u64,
        /// The number of viewed elements.
        num_elements: u32,
        /// The size of one element in bytes.
        stride: u32,
    },
}

/// Describes an unordered access view over a structured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedAccessViewDesc {
    /// The first viewed element.
    pub first_element: u64,
    /// The number of viewed elements.
    pub num_elements: u32,
    /// The size of one element in bytes.
    pub stride: u32,
}

/// Describes a constant buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferViewDesc {
    /// The start of the constants.
    pub location: GpuVirtualAddress,
    /// The size of the viewed region (a multiple of 256).
    pub size_in_bytes: u32,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Point,
    /// Bilinear.
    Linear,
}

/// Behavior outside the `[0, 1]` texture coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Repeat the texture.
    Wrap,
    /// Clamp to the edge texel.
    Clamp,
    /// Mirror on every repeat.
    Mirror,
}

/// Describes a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    /// Minification, magnification and mip filter.
    pub filter: FilterMode,
    /// Address mode applied on all axes.
    pub address_mode: AddressMode,
    /// A comparison function for depth comparison samplers.
    pub comparison: Option<CompareFunction>,
}

impl SamplerDesc {
    /// Bilinear, repeating.
    pub const LINEAR_WRAP: Self = Self {
        filter: FilterMode::Linear,
        address_mode: AddressMode::Wrap,
        comparison: None,
    };
    /// Bilinear, clamped.
    pub const LINEAR_CLAMP: Self = Self {
        filter: FilterMode::Linear,
        address_mode: AddressMode::Clamp,
        comparison: None,
    };
    /// Nearest, clamped.
    pub const POINT_CLAMP: Self = Self {
        filter: FilterMode::Point,
        address_mode: AddressMode::Clamp,
        comparison: None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_gpu_half_follows_visibility() {
        let visible = DescriptorHandle::new(DescriptorHeapId(1), 4, true);
        let hidden = DescriptorHandle::new(DescriptorHeapId(1), 4, false);

        assert_eq!(
            visible.gpu(),
            Some(GpuDescriptorHandle {
                heap: DescriptorHeapId(1),
                index: 4
            })
        );
        assert!(hidden.gpu().is_none());
        assert_eq!(visible.cpu(), hidden.cpu());
    }
}
