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

//! Frame recording.
//!
//! A [`CommandContext`] wraps one native command list and the
//! [`ResourceStateTracker`] that knows the current state of every resource it
//! touched. Typed views ([`GraphicsContext`], [`ComputeContext`]) expose the
//! pipeline-specific commands; both flush pending barriers before any command
//! that reads or writes resources.

use super::pipeline_state::{ComputePso, GraphicsPso};
use super::pixel_buffer::{ColorBuffer, DepthBuffer};
use super::resource::AsResource;
use super::root_signature::RootSignature;
use super::state_tracker::{ResourceStateTracker, ResourceUsage};
use crate::renderer::api::{
    CpuDescriptorHandle, DescriptorHeapId, GpuDescriptorHandle, GpuVirtualAddress,
    IndexBufferView, PipelineId, PrimitiveTopology, ResourceState, RootSignatureId, ScissorRect,
    VertexBufferView, Viewport,
};
use crate::renderer::{CommandList, GraphicsDevice, RenderError};
use std::ops::{Deref, DerefMut};

/// Counters collected while recording one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls recorded.
    pub draw_calls: u32,
    /// Compute dispatches recorded.
    pub dispatches: u32,
    /// Barriers recorded.
    pub barriers: u32,
    /// Pipeline state changes recorded.
    pub pipeline_switches: u32,
    /// Root signature changes recorded.
    pub root_signature_switches: u32,
}

impl FrameStats {
    /// The work recorded between `earlier` and `self`.
    pub fn since(self, earlier: FrameStats) -> FrameStats {
        FrameStats {
            draw_calls: self.draw_calls.saturating_sub(earlier.draw_calls),
            dispatches: self.dispatches.saturating_sub(earlier.dispatches),
            barriers: self.barriers.saturating_sub(earlier.barriers),
            pipeline_switches: self
                .pipeline_switches
                .saturating_sub(earlier.pipeline_switches),
            root_signature_switches: self
                .root_signature_switches
                .saturating_sub(earlier.root_signature_switches),
        }
    }
}

/// Records commands for one frame and owns all resource-state bookkeeping.
pub struct CommandContext {
    label: String,
    list: Box<dyn CommandList>,
    tracker: ResourceStateTracker,
    stats: FrameStats,
    graphics_root: Option<RootSignatureId>,
    compute_root: Option<RootSignatureId>,
    pipeline: Option<PipelineId>,
    heaps: Vec<DescriptorHeapId>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("label", &self.label)
            .field("recorded", &self.list.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl CommandContext {
    /// Creates a context recording into a fresh command list of `device`.
    pub fn new(device: &dyn GraphicsDevice, label: &str) -> Result<Self, RenderError> {
        Ok(Self {
            label: label.to_string(),
            list: device.create_command_list(label)?,
            tracker: ResourceStateTracker::new(),
            stats: FrameStats::default(),
            graphics_root: None,
            compute_root: None,
            pipeline: None,
            heaps: Vec::new(),
        })
    }

    /// Graphics commands.
    pub fn graphics(&mut self) -> GraphicsContext<'_> {
        GraphicsContext { ctx: self }
    }

    /// Compute commands.
    pub fn compute(&mut self) -> ComputeContext<'_> {
        ComputeContext { ctx: self }
    }

    /// Moves `resource` to `state`. A transition to the current state records nothing.
    pub fn transition_resource(&mut self, resource: &impl AsResource, state: ResourceState) {
        self.tracker.transition(resource.resource_handle(), state);
    }

    /// Orders unordered-access writes to `resource` before later accesses.
    pub fn insert_uav_barrier(&mut self, resource: &impl AsResource) {
        self.tracker.uav_barrier(resource.resource_handle());
    }

    /// Transitions every resource a pass declares, then flushes.
    pub fn transition_for_pass(&mut self, usages: &[ResourceUsage]) {
        for usage in usages {
            self.tracker.transition(usage.resource, usage.state);
        }
        self.flush_resource_barriers();
    }

    /// Records all queued barriers as one batch.
    pub fn flush_resource_barriers(&mut self) {
        if !self.tracker.has_pending() {
            return;
        }
        let barriers = self.tracker.flush();
        self.stats.barriers += barriers.len() as u32;
        self.list.resource_barrier(&barriers);
    }

    /// The state `resource` is currently tracked in.
    pub fn resource_state(&self, resource: &impl AsResource) -> ResourceState {
        let handle = resource.resource_handle();
        self.tracker
            .state(handle.id)
            .unwrap_or(handle.initial_state)
    }

    /// Binds the shader-visible heaps descriptor tables resolve against.
    pub fn set_descriptor_heaps(&mut self, heaps: &[DescriptorHeapId]) {
        if self.heaps == heaps {
            return;
        }
        self.heaps = heaps.to_vec();
        self.list.set_descriptor_heaps(heaps);
    }

    /// Copies `num_bytes` between buffers, transitioning both for the copy.
    pub fn copy_buffer_region(
        &mut self,
        dest: &impl AsResource,
        dest_offset: u64,
        source: &impl AsResource,
        source_offset: u64,
        num_bytes: u64,
    ) {
        self.transition_resource(dest, ResourceState::CopyDest);
        self.transition_resource(source, ResourceState::CopySource);
        self.flush_resource_barriers();
        self.list.copy_buffer_region(
            dest.resource_handle().id,
            dest_offset,
            source.resource_handle().id,
            source_offset,
            num_bytes,
        );
    }

    /// Flushes pending barriers and closes the list for submission.
    pub fn close(&mut self) -> Result<(), RenderError> {
        self.flush_resource_barriers();
        self.list.close()
    }

    /// Starts a new recording. Tracked resource states carry over.
    pub fn reset(&mut self) -> Result<(), RenderError> {
        self.list.reset()?;
        self.stats = FrameStats::default();
        self.graphics_root = None;
        self.compute_root = None;
        self.pipeline = None;
        self.heaps.clear();
        Ok(())
    }

    /// Forgets the tracked state of resources `device` has destroyed.
    ///
    /// Must only run between frames, when no barrier is pending.
    pub fn forget_destroyed_resources(&mut self, device: &dyn GraphicsDevice) {
        let forgotten = self.tracker.retain(|id| device.resource_exists(id));
        if forgotten > 0 {
            log::debug!(
                "Context '{}' forgot {forgotten} destroyed resources",
                self.label
            );
        }
    }

    /// Number of resources whose state this context tracks.
    pub fn tracked_resources(&self) -> usize {
        self.tracker.len()
    }

    /// Counters of the current recording.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The underlying command list.
    pub fn native_mut(&mut self) -> &mut dyn CommandList {
        self.list.as_mut()
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        if self.pipeline == Some(pipeline) {
            return;
        }
        self.pipeline = Some(pipeline);
        self.stats.pipeline_switches += 1;
        self.list.set_pipeline_state(pipeline);
    }
}

/// The graphics view of a [`CommandContext`].
#[derive(Debug)]
pub struct GraphicsContext<'a> {
    ctx: &'a mut CommandContext,
}

impl Deref for GraphicsContext<'_> {
    type Target = CommandContext;

    fn deref(&self) -> &CommandContext {
        &*self.ctx
    }
}

impl DerefMut for GraphicsContext<'_> {
    fn deref_mut(&mut self) -> &mut CommandContext {
        &mut *self.ctx
    }
}

impl GraphicsContext<'_> {
    /// Binds the root signature, skipped if it is already bound.
    pub fn set_root_signature(&mut self, root_signature: &RootSignature) {
        let id = root_signature.id();
        if self.ctx.graphics_root == Some(id) {
            return;
        }
        self.ctx.graphics_root = Some(id);
        self.ctx.stats.root_signature_switches += 1;
        self.ctx.list.set_graphics_root_signature(id);
    }

    /// Binds the pipeline, skipped if it is already bound.
    pub fn set_pipeline_state(&mut self, pso: &GraphicsPso) {
        self.ctx.bind_pipeline(pso.id());
    }

    /// Binds a constant buffer to root parameter `index`.
    pub fn set_constant_buffer(&mut self, index: u32, address: GpuVirtualAddress) {
        self.ctx
            .list
            .set_graphics_root_constant_buffer_view(index, address);
    }

    /// Binds a descriptor table to root parameter `index`.
    pub fn set_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.ctx
            .list
            .set_graphics_root_descriptor_table(index, table);
    }

    /// Binds one vertex buffer at `slot`.
    pub fn set_vertex_buffer(&mut self, slot: u32, view: VertexBufferView) {
        self.ctx.list.ia_set_vertex_buffers(slot, &[view]);
    }

    /// Binds the index buffer.
    pub fn set_index_buffer(&mut self, view: &IndexBufferView) {
        self.ctx.list.ia_set_index_buffer(view);
    }

    /// Sets the primitive topology.
    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.ctx.list.ia_set_primitive_topology(topology);
    }

    /// Binds color targets and an optional depth target.
    pub fn set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    ) {
        self.ctx
            .list
            .om_set_render_targets(render_targets, depth_stencil);
    }

    /// Clears any render target to `color`, transitioning it first.
    pub fn clear_render_target(
        &mut self,
        resource: &impl AsResource,
        rtv: CpuDescriptorHandle,
        color: [f32; 4],
    ) {
        self.ctx
            .transition_resource(resource, ResourceState::RenderTarget);
        self.ctx.flush_resource_barriers();
        self.ctx.list.clear_render_target_view(rtv, color);
    }

    /// Clears a color buffer to its clear color.
    pub fn clear_color(&mut self, target: &ColorBuffer) {
        self.clear_render_target(target, target.rtv(), target.clear_color().to_array());
    }

    /// Clears a depth buffer to its clear depth.
    pub fn clear_depth(&mut self, target: &DepthBuffer) {
        self.ctx
            .transition_resource(target, ResourceState::DepthWrite);
        self.ctx.flush_resource_barriers();
        self.ctx
            .list
            .clear_depth_stencil_view(target.dsv(), target.clear_depth(), 0);
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.ctx.list.rs_set_viewport(viewport);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor(&mut self, rect: &ScissorRect) {
        self.ctx.list.rs_set_scissor_rect(rect);
    }

    /// Covers a `width` x `height` target with both viewport and scissor.
    pub fn set_viewport_and_scissor(&mut self, width: u32, height: u32) {
        self.set_viewport(&Viewport::full(width, height));
        self.set_scissor(&ScissorRect::full(width, height));
    }

    /// Draws non-indexed, instanced primitives.
    pub fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) {
        self.ctx.flush_resource_barriers();
        self.ctx.stats.draw_calls += 1;
        self.ctx
            .list
            .draw_instanced(vertex_count, instance_count, start_vertex, start_instance);
    }

    /// Draws `vertex_count` vertices once.
    pub fn draw(&mut self, vertex_count: u32) {
        self.draw_instanced(vertex_count, 1, 0, 0);
    }

    /// Draws indexed, instanced primitives.
    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) {
        self.ctx.flush_resource_barriers();
        self.ctx.stats.draw_calls += 1;
        self.ctx.list.draw_indexed_instanced(
            index_count,
            instance_count,
            start_index,
            base_vertex,
            start_instance,
        );
    }

    /// Draws `index_count` indices once.
    pub fn draw_indexed(&mut self, index_count: u32) {
        self.draw_indexed_instanced(index_count, 1, 0, 0, 0);
    }
}

/// The compute view of a [`CommandContext`].
#[derive(Debug)]
pub struct ComputeContext<'a> {
    ctx: &'a mut CommandContext,
}

impl Deref for ComputeContext<'_> {
    type Target = CommandContext;

    fn deref(&self) -> &CommandContext {
        &*self.ctx
    }
}

impl DerefMut for ComputeContext<'_> {
    fn deref_mut(&mut self) -> &mut CommandContext {
        &mut *self.ctx
    }
}

impl ComputeContext<'_> {
    /// Binds the root signature, skipped if it is already bound.
    pub fn set_root_signature(&mut self, root_signature: &RootSignature) {
        let id = root_signature.id();
        if self.ctx.compute_root == Some(id) {
            return;
        }
        self.ctx.compute_root = Some(id);
        self.ctx.stats.root_signature_switches += 1;
        self.ctx.list.set_compute_root_signature(id);
    }

    /// Binds the pipeline, skipped if it is already bound.
    pub fn set_pipeline_state(&mut self, pso: &ComputePso) {
        self.ctx.bind_pipeline(pso.id());
    }

    /// Binds a constant buffer to root parameter `index`.
    pub fn set_constant_buffer(&mut self, index: u32, address: GpuVirtualAddress) {
        self.ctx
            .list
            .set_compute_root_constant_buffer_view(index, address);
    }

    /// Binds a descriptor table to root parameter `index`.
    pub fn set_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.ctx.list.set_compute_root_descriptor_table(index, table);
    }

    /// Dispatches a grid of thread groups.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.ctx.flush_resource_barriers();
        self.ctx.stats.dispatches += 1;
        self.ctx.list.dispatch(x, y, z);
    }

    /// Dispatches enough groups of `group_size` threads to cover `thread_count`.
    pub fn dispatch_1d(&mut self, thread_count: u32, group_size: u32) {
        let groups = thread_count.div_ceil(group_size.max(1)).max(1);
        self.dispatch(groups, 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::ResourceHandle;
    use crate::mock::{recorded_commands, MockCommand, MockDevice};
    use crate::renderer::api::{ResourceBarrier, ResourceId};

    fn handle(id: u32, initial_state: ResourceState) -> ResourceHandle {
        ResourceHandle {
            id: ResourceId(id),
            initial_state,
        }
    }

    fn barrier_count(ctx: &mut CommandContext) -> usize {
        recorded_commands(ctx.native_mut())
            .iter()
            .filter(|c| matches!(c, MockCommand::Barrier(_)))
            .count()
    }

    #[test]
    fn test_redundant_transition_records_no_barrier() {
        let device = MockDevice::new();
        let mut ctx = CommandContext::new(&device, "frame").unwrap();
        let target = handle(7, ResourceState::Common);

        ctx.transition_resource(&target, ResourceState::RenderTarget);
        ctx.transition_resource(&target, ResourceState::RenderTarget);
        ctx.graphics().draw(3);
        ctx.transition_resource(&target, ResourceState::RenderTarget);
        ctx.graphics().draw(3);

        assert_eq!(barrier_count(&mut ctx), 1);
        assert_eq!(ctx.stats().barriers, 1);
        assert_eq!(
            ctx.resource_state(&target),
            ResourceState::RenderTarget
        );
    }

    #[test]
    fn test_barriers_are_flushed_before_draw() {
        let device = MockDevice::new();
        let mut ctx = CommandContext::new(&device, "frame").unwrap();
        let texture = handle(1, ResourceState::RenderTarget);

        ctx.transition_resource(&texture, ResourceState::PixelShaderResource);
        ctx.graphics().draw(3);

        let commands = recorded_commands(ctx.native_mut());
        assert_eq!(
            commands,
            vec![
                MockCommand::Barrier(ResourceBarrier::Transition {
                    resource: texture.id,
                    before: ResourceState::RenderTarget,
                    after: ResourceState::PixelShaderResource,
                }),
                MockCommand::DrawInstanced {
                    vertex_count: 3,
                    instance_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_states_carry_over_reset() {
        let device = MockDevice::new();
        let mut ctx = CommandContext::new(&device, "frame").unwrap();
        let buffer = handle(4, ResourceState::Common);
        ctx.transition_resource(&buffer, ResourceState::UnorderedAccess);
        ctx.close().unwrap();
        ctx.reset().unwrap();

        ctx.transition_resource(&buffer, ResourceState::UnorderedAccess);
        ctx.flush_resource_barriers();

        assert_eq!(barrier_count(&mut ctx), 0);
        assert_eq!(ctx.stats(), FrameStats::default());
    }

    #[test]
    fn test_dispatch_1d_rounds_up() {
        let device = MockDevice::new();
        let mut ctx = CommandContext::new(&device, "compute").unwrap();
        ctx.compute().dispatch_1d(1025, 1024);
        ctx.compute().dispatch_1d(0, 64);

        let commands = recorded_commands(ctx.native_mut());
        assert_eq!(
            commands,
            vec![MockCommand::Dispatch(2, 1, 1), MockCommand::Dispatch(1, 1, 1)]
        );
        assert_eq!(ctx.stats().dispatches, 2);
    }

    #[test]
    fn test_copy_transitions_both_buffers() {
        let device = MockDevice::new();
        let mut ctx = CommandContext::new(&device, "copy").unwrap();
        let dest = handle(1, ResourceState::Common);
        let src = handle(2, ResourceState::GenericRead);

        ctx.copy_buffer_region(&dest, 0, &src, 0, 16);

        assert_eq!(ctx.resource_state(&dest), ResourceState::CopyDest);
        assert_eq!(ctx.resource_state(&src), ResourceState::CopySource);
        assert_eq!(barrier_count(&mut ctx), 2);
    }
}
