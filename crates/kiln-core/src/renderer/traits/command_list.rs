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

use crate::renderer::api::*;
use crate::renderer::error::RenderError;
use std::any::Any;

/// A native command list: an ordered recording of GPU work for one frame.
///
/// All binding state (root signatures, pipeline, root arguments, input
/// buffers, render targets, viewport) persists across draws until replaced,
/// the way it does on an explicit API. Nothing is validated here: using a
/// root parameter index the bound root signature does not declare is a bug
/// left to the backend to report.
pub trait CommandList: Send {
    /// Records transition and UAV barriers.
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]);

    /// Binds the descriptor heaps subsequent tables are resolved against.
    fn set_descriptor_heaps(&mut self, heaps: &[DescriptorHeapId]);

    /// Binds the root signature used by draws.
    fn set_graphics_root_signature(&mut self, root_signature: RootSignatureId);

    /// Binds the root signature used by dispatches.
    fn set_compute_root_signature(&mut self, root_signature: RootSignatureId);

    /// Binds a graphics or compute pipeline state object.
    fn set_pipeline_state(&mut self, pipeline: PipelineId);

    /// Binds a constant buffer address to a graphics root parameter.
    fn set_graphics_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress);

    /// Binds a constant buffer address to a compute root parameter.
    fn set_compute_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress);

    /// Binds a descriptor table to a graphics root parameter.
    fn set_graphics_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle);

    /// Binds a descriptor table to a compute root parameter.
    fn set_compute_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle);

    /// Binds vertex buffers starting at `start_slot`.
    fn ia_set_vertex_buffers(&mut self, start_slot: u32, views: &[VertexBufferView]);

    /// Binds the index buffer.
    fn ia_set_index_buffer(&mut self, view: &IndexBufferView);

    /// Sets the primitive topology. It must agree with the bound pipeline.
    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Binds color and depth targets.
    fn om_set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    );

    /// Clears a render target view.
    fn clear_render_target_view(&mut self, view: CpuDescriptorHandle, color: [f32; 4]);

    /// Clears a depth stencil view.
    fn clear_depth_stencil_view(&mut self, view: CpuDescriptorHandle, depth: f32, stencil: u8);

    /// Sets the viewport.
    fn rs_set_viewport(&mut self, viewport: &Viewport);

    /// Sets the scissor rectangle.
    fn rs_set_scissor_rect(&mut self, rect: &ScissorRect);

    /// Draws non-indexed, instanced primitives.
    fn draw_instanced(
        &mut self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    );

    /// Draws indexed, instanced primitives.
    fn draw_indexed_instanced(
        &mut self,
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    );

    /// Dispatches compute thread groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Copies a byte range between two buffers.
    fn copy_buffer_region(
        &mut self,
        dest: ResourceId,
        dest_offset: u64,
        source: ResourceId,
        source_offset: u64,
        num_bytes: u64,
    );

    /// Ends recording. A closed list can be executed but not recorded into.
    fn close(&mut self) -> Result<(), RenderError>;

    /// Discards the recorded commands and reopens the list for recording.
    fn reset(&mut self) -> Result<(), RenderError>;

    /// Number of commands recorded since the last reset.
    fn len(&self) -> usize;

    /// Returns `true` if nothing was recorded since the last reset.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gives the owning backend access to its concrete list at submission time.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
