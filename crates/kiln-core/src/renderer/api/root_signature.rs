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

//! The binding contract between recorded commands and shaders.
//!
//! A backend maps root parameter `i` to bind group `i` in the shader; the
//! descriptors of a table occupy bindings `0..count` of that group. Static
//! samplers share one extra group placed after the last parameter, one binding
//! per sampler in declaration order.

use super::descriptor::SamplerDesc;

/// An opaque handle to a finalized root signature owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootSignatureId(pub u32);

/// The shader stages a root parameter is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVisibility {
    /// Every stage, including compute.
    All,
    /// The vertex stage only.
    Vertex,
    /// The pixel stage only.
    Pixel,
}

/// The type of the descriptors in a descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorRangeKind {
    /// Filterable float textures.
    Texture,
    /// Depth textures, read with loads.
    DepthTexture,
    /// Read-only structured buffers.
    StructuredBuffer,
    /// Read/write structured buffers.
    ReadWriteBuffer,
    /// Constant buffer views.
    ConstantBuffer,
}

/// A contiguous run of descriptors referenced by one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorRange {
    /// The descriptor type.
    pub kind: DescriptorRangeKind,
    /// The first shader register of the range.
    pub base_register: u32,
    /// How many consecutive descriptors the table spans.
    pub count: u32,
}

/// One slot of a root signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootParameter {
    /// A constant buffer bound directly by GPU virtual address.
    ConstantBuffer {
        /// The shader register.
        register: u32,
        /// The visible stages.
        visibility: ShaderVisibility,
    },
    /// A descriptor table bound by its first GPU descriptor handle.
    DescriptorTable {
        /// The descriptors of the table.
        range: DescriptorRange,
        /// The visible stages.
        visibility: ShaderVisibility,
    },
}

/// A sampler baked into the root signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticSampler {
    /// The shader register.
    pub register: u32,
    /// The sampler state.
    pub desc: SamplerDesc,
    /// The visible stages.
    pub visibility: ShaderVisibility,
}

/// The complete, validated layout a backend compiles into a root signature.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSignatureLayout {
    /// A debug label.
    pub label: String,
    /// The parameters, in slot order.
    pub parameters: Vec<RootParameter>,
    /// The static samplers, in declaration order.
    pub static_samplers: Vec<StaticSampler>,
}

impl RootSignatureLayout {
    /// The bind group index holding the static samplers, if there are any.
    pub fn sampler_group(&self) -> Option<u32> {
        (!self.static_samplers.is_empty()).then_some(self.parameters.len() as u32)
    }
}
