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

//! Plain per-frame submission records.
//!
//! Records hold handles and counts only. The buffers they reference must stay
//! alive until the frame that consumed them has been submitted.

use kiln_core::gpu::ResourceHandle;
use kiln_core::renderer::api::{
    GpuDescriptorHandle, GpuVirtualAddress, IndexBufferView, VertexBufferView,
};

/// The geometry pass category of an object. Opaque objects draw first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DrawPass {
    /// Depth-written, unblended.
    #[default]
    Opaque,
    /// Alpha-blended, depth-tested without writes.
    Transparent,
}

/// An indexed mesh drawn in the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortObject {
    /// Vertices.
    pub vertex_buffer: VertexBufferView,
    /// Indices.
    pub index_buffer: IndexBufferView,
    /// [`MaterialConstants`](super::MaterialConstants).
    pub material: GpuVirtualAddress,
    /// [`WorldTransformConstants`](super::WorldTransformConstants).
    pub world_transform: GpuVirtualAddress,
    /// [`CameraConstants`](super::CameraConstants).
    pub camera: GpuVirtualAddress,
    /// Albedo texture table.
    pub texture: GpuDescriptorHandle,
    /// Dissolve mask table.
    pub mask_texture: GpuDescriptorHandle,
    /// Indices to draw.
    pub index_count: u32,
    /// Category.
    pub draw_pass: DrawPass,
}

/// A shadow caster drawn depth-only from the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowObject {
    /// Vertices.
    pub vertex_buffer: VertexBufferView,
    /// Indices.
    pub index_buffer: IndexBufferView,
    /// [`WorldTransformConstants`](super::WorldTransformConstants).
    pub world_transform: GpuVirtualAddress,
    /// Indices to draw.
    pub index_count: u32,
}

/// A skinning dispatch writing posed vertices into an output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinningObject {
    /// Joint palette table (structured buffer SRV).
    pub palette: GpuDescriptorHandle,
    /// Bind-pose vertex table (structured buffer SRV).
    pub input_vertices: GpuDescriptorHandle,
    /// Influence table (structured buffer SRV).
    pub influences: GpuDescriptorHandle,
    /// Posed vertex table (read/write buffer UAV).
    pub output_vertices: GpuDescriptorHandle,
    /// The posed vertex buffer itself, transitioned around the dispatch.
    pub output_resource: ResourceHandle,
    /// [`SkinningInformation`](super::SkinningInformation).
    pub skinning_information: GpuVirtualAddress,
    /// Vertices to skin.
    pub vertex_count: u32,
}

/// Debug lines of a skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bone {
    /// [`LineVertex`](super::LineVertex) pairs.
    pub vertex_buffer: VertexBufferView,
    /// [`WorldTransformConstants`](super::WorldTransformConstants).
    pub world_transform: GpuVirtualAddress,
    /// [`CameraConstants`](super::CameraConstants).
    pub camera: GpuVirtualAddress,
    /// Vertices to draw, two per line.
    pub vertex_count: u32,
}
