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

use super::conversions::IntoWgpu;
use super::registry::{PipelineEntry, Registry, RootArgument, WgpuShared};
use kiln_core::renderer::api::{
    CpuDescriptorHandle, DescriptorHeapId, GpuDescriptorHandle, GpuVirtualAddress,
    IndexBufferView, PipelineId, PrimitiveTopology, ResourceBarrier, ResourceId, RootSignatureId,
    ScissorRect, VertexBufferView, Viewport,
};
use kiln_core::renderer::{CommandList, RenderError};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded command.
#[derive(Debug, Clone)]
enum Command {
    Barriers(usize),
    SetDescriptorHeaps,
    SetGraphicsRootSignature(RootSignatureId),
    SetComputeRootSignature(RootSignatureId),
    SetPipeline(PipelineId),
    SetGraphicsRootArgument(u32, RootArgument),
    SetComputeRootArgument(u32, RootArgument),
    SetVertexBuffers(u32, Vec<VertexBufferView>),
    SetIndexBuffer(IndexBufferView),
    SetTopology(PrimitiveTopology),
    SetRenderTargets(Vec<CpuDescriptorHandle>, Option<CpuDescriptorHandle>),
    ClearRenderTarget(CpuDescriptorHandle, [f32; 4]),
    ClearDepthStencil(CpuDescriptorHandle, f32),
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    },
    Dispatch(u32, u32, u32),
    CopyBufferRegion {
        dest: ResourceId,
        dest_offset: u64,
        source: ResourceId,
        source_offset: u64,
        num_bytes: u64,
    },
}

/// The `wgpu` implementation of [`CommandList`].
///
/// Commands are recorded as data and translated into a `wgpu::CommandBuffer`
/// when the queue executes the list.
pub struct WgpuCommandList {
    shared: Arc<WgpuShared>,
    label: String,
    commands: Vec<Command>,
    closed: bool,
}

impl std::fmt::Debug for WgpuCommandList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuCommandList")
            .field("label", &self.label)
            .field("commands", &self.commands.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl WgpuCommandList {
    pub(crate) fn new(shared: Arc<WgpuShared>, label: &str) -> Self {
        Self {
            shared,
            label: label.to_string(),
            commands: Vec::new(),
            closed: false,
        }
    }

    /// Whether `close` was called since the last reset.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, command: Command) {
        if self.closed {
            log::warn!("Command recorded into closed list '{}' was dropped", self.label);
            return;
        }
        self.commands.push(command);
    }

    /// Translates the recording into a command buffer.
    pub(crate) fn encode(&self) -> Result<wgpu::CommandBuffer, RenderError> {
        let mut registry = self.shared.registry()?;
        let encoder = self
            .shared
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&self.label),
            });
        let mut replay = Replay::new(&self.shared.device, &mut registry, encoder);
        for command in &self.commands {
            replay.apply(command)?;
        }
        replay.finish()
    }
}

impl CommandList for WgpuCommandList {
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) {
        log::trace!("{} barriers (tracked by wgpu)", barriers.len());
        self.record(Command::Barriers(barriers.len()));
    }

    fn set_descriptor_heaps(&mut self, _heaps: &[DescriptorHeapId]) {
        self.record(Command::SetDescriptorHeaps);
    }

    fn set_graphics_root_signature(&mut self, root_signature: RootSignatureId) {
        self.record(Command::SetGraphicsRootSignature(root_signature));
    }

    fn set_compute_root_signature(&mut self, root_signature: RootSignatureId) {
        self.record(Command::SetComputeRootSignature(root_signature));
    }

    fn set_pipeline_state(&mut self, pipeline: PipelineId) {
        self.record(Command::SetPipeline(pipeline));
    }

    fn set_graphics_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress) {
        self.record(Command::SetGraphicsRootArgument(
            index,
            RootArgument::ConstantBuffer(address),
        ));
    }

    fn set_compute_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress) {
        self.record(Command::SetComputeRootArgument(
            index,
            RootArgument::ConstantBuffer(address),
        ));
    }

    fn set_graphics_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.record(Command::SetGraphicsRootArgument(index, RootArgument::Table(table)));
    }

    fn set_compute_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.record(Command::SetComputeRootArgument(index, RootArgument::Table(table)));
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, views: &[VertexBufferView]) {
        self.record(Command::SetVertexBuffers(start_slot, views.to_vec()));
    }

    fn ia_set_index_buffer(&mut self, view: &IndexBufferView) {
        self.record(Command::SetIndexBuffer(*view));
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.record(Command::SetTopology(topology));
    }

    fn om_set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    ) {
        self.record(Command::SetRenderTargets(
            render_targets.to_vec(),
            depth_stencil,
        ));
    }

    fn clear_render_target_view(&mut self, view: CpuDescriptorHandle, color: [f32; 4]) {
        self.record(Command::ClearRenderTarget(view, color));
    }

    fn clear_depth_stencil_view(&mut self, view: CpuDescriptorHandle, depth: f32, _stencil: u8) {
        self.record(Command::ClearDepthStencil(view, depth));
    }

    fn rs_set_viewport(&mut self, viewport: &Viewport) {
        self.record(Command::SetViewport(*viewport));
    }

    fn rs_set_scissor_rect(&mut self, rect: &ScissorRect) {
        self.record(Command::SetScissor(*rect));
    }

    fn draw_instanced(
        &mut self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) {
        self.record(Command::Draw {
            vertex_count: vertex_count_per_instance,
            instance_count,
            start_vertex,
            start_instance,
        });
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) {
        self.record(Command::DrawIndexed {
            index_count: index_count_per_instance,
            instance_count,
            start_index,
            base_vertex,
            start_instance,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(Command::Dispatch(x, y, z));
    }

    fn copy_buffer_region(
        &mut self,
        dest: ResourceId,
        dest_offset: u64,
        source: ResourceId,
        source_offset: u64,
        num_bytes: u64,
    ) {
        self.record(Command::CopyBufferRegion {
            dest,
            dest_offset,
            source,
            source_offset,
            num_bytes,
        });
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Submission(format!(
                "Command list '{}' closed twice",
                self.label
            )));
        }
        self.closed = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), RenderError> {
        self.commands.clear();
        self.closed = false;
        Ok(())
    }

    fn len(&self) -> usize {
        self.commands.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Binding state carried across commands while a list is translated.
///
/// Render passes open lazily at the first draw after the targets change.
/// Clears are folded into the load operation of the pass that uses the
/// target; a clear whose target is not used by the next pass gets a pass of
/// its own before that pass begins.
struct Replay<'a> {
    device: &'a wgpu::Device,
    registry: &'a mut Registry,
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
    target_size: (u32, u32),

    graphics_root: Option<RootSignatureId>,
    compute_root: Option<RootSignatureId>,
    pipeline: Option<PipelineId>,
    graphics_arguments: BTreeMap<u32, RootArgument>,
    compute_arguments: BTreeMap<u32, RootArgument>,
    vertex_buffers: BTreeMap<u32, VertexBufferView>,
    index_buffer: Option<IndexBufferView>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,

    color_targets: Vec<CpuDescriptorHandle>,
    depth_target: Option<CpuDescriptorHandle>,
    color_clears: Vec<(CpuDescriptorHandle, [f32; 4])>,
    depth_clears: Vec<(CpuDescriptorHandle, f32)>,
}

impl<'a> Replay<'a> {
    fn new(
        device: &'a wgpu::Device,
        registry: &'a mut Registry,
        encoder: wgpu::CommandEncoder,
    ) -> Self {
        Self {
            device,
            registry,
            encoder,
            pass: None,
            target_size: (0, 0),
            graphics_root: None,
            compute_root: None,
            pipeline: None,
            graphics_arguments: BTreeMap::new(),
            compute_arguments: BTreeMap::new(),
            vertex_buffers: BTreeMap::new(),
            index_buffer: None,
            viewport: None,
            scissor: None,
            color_targets: Vec::new(),
            depth_target: None,
            color_clears: Vec::new(),
            depth_clears: Vec::new(),
        }
    }

    fn apply(&mut self, command: &Command) -> Result<(), RenderError> {
        match command {
            Command::Barriers(_) | Command::SetDescriptorHeaps | Command::SetTopology(_) => {}
            Command::SetGraphicsRootSignature(id) => {
                if self.graphics_root != Some(*id) {
                    self.graphics_root = Some(*id);
                    self.graphics_arguments.clear();
                }
            }
            Command::SetComputeRootSignature(id) => {
                if self.compute_root != Some(*id) {
                    self.compute_root = Some(*id);
                    self.compute_arguments.clear();
                }
            }
            Command::SetPipeline(id) => self.pipeline = Some(*id),
            Command::SetGraphicsRootArgument(index, argument) => {
                self.graphics_arguments.insert(*index, *argument);
            }
            Command::SetComputeRootArgument(index, argument) => {
                self.compute_arguments.insert(*index, *argument);
            }
            Command::SetVertexBuffers(start, views) => {
                for (slot, view) in (*start..).zip(views) {
                    self.vertex_buffers.insert(slot, *view);
                }
            }
            Command::SetIndexBuffer(view) => self.index_buffer = Some(*view),
            Command::SetRenderTargets(colors, depth) => {
                if *colors != self.color_targets || *depth != self.depth_target {
                    self.pass = None;
                    self.color_targets = colors.clone();
                    self.depth_target = *depth;
                }
            }
            Command::ClearRenderTarget(view, color) => {
                self.pass = None;
                self.color_clears.retain(|(v, _)| v != view);
                self.color_clears.push((*view, *color));
            }
            Command::ClearDepthStencil(view, depth) => {
                self.pass = None;
                self.depth_clears.retain(|(v, _)| v != view);
                self.depth_clears.push((*view, *depth));
            }
            Command::SetViewport(viewport) => self.viewport = Some(*viewport),
            Command::SetScissor(rect) => self.scissor = Some(*rect),
            Command::Draw {
                vertex_count,
                instance_count,
                start_vertex,
                start_instance,
            } => {
                let pass = self.prepare_draw(false)?;
                pass.draw(
                    *start_vertex..start_vertex + vertex_count,
                    *start_instance..start_instance + instance_count,
                );
            }
            Command::DrawIndexed {
                index_count,
                instance_count,
                start_index,
                base_vertex,
                start_instance,
            } => {
                let pass = self.prepare_draw(true)?;
                pass.draw_indexed(
                    *start_index..start_index + index_count,
                    *base_vertex,
                    *start_instance..start_instance + instance_count,
                );
            }
            Command::Dispatch(x, y, z) => self.dispatch(*x, *y, *z)?,
            Command::CopyBufferRegion {
                dest,
                dest_offset,
                source,
                source_offset,
                num_bytes,
            } => {
                self.pass = None;
                self.flush_clears()?;
                let source = self.registry.buffer(*source)?;
                let dest = self.registry.buffer(*dest)?;
                self.encoder.copy_buffer_to_buffer(
                    source,
                    *source_offset,
                    dest,
                    *dest_offset,
                    *num_bytes,
                );
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<wgpu::CommandBuffer, RenderError> {
        self.pass = None;
        self.flush_clears()?;
        Ok(self.encoder.finish())
    }

    /// Runs every pending clear in a pass of its own.
    fn flush_clears(&mut self) -> Result<(), RenderError> {
        for (view, color) in std::mem::take(&mut self.color_clears) {
            let (view, _) = self.registry.render_target_view(view)?;
            self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear"),
                color_attachments: &[Some(color_attachment(&view, Some(color)))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        for (view, depth) in std::mem::take(&mut self.depth_clears) {
            let (view, _) = self.registry.depth_stencil_view(view)?;
            self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&view, Some(depth))),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        Ok(())
    }

    fn open_pass(&mut self) -> Result<(), RenderError> {
        // Pending clears of the targets about to be bound become load ops.
        let mut color_loads = Vec::with_capacity(self.color_targets.len());
        for target in &self.color_targets {
            let index = self.color_clears.iter().position(|(v, _)| v == target);
            color_loads.push(index.map(|i| self.color_clears.remove(i).1));
        }
        let depth_load = self.depth_target.and_then(|target| {
            let index = self.depth_clears.iter().position(|(v, _)| *v == target)?;
            Some(self.depth_clears.remove(index).1)
        });
        self.flush_clears()?;

        let mut size = None;
        let mut color_views = Vec::with_capacity(self.color_targets.len());
        for target in &self.color_targets {
            let (view, view_size) = self.registry.render_target_view(*target)?;
            size.get_or_insert(view_size);
            color_views.push(view);
        }
        let depth_view = match self.depth_target {
            Some(target) => {
                let (view, view_size) = self.registry.depth_stencil_view(target)?;
                size.get_or_insert(view_size);
                Some(view)
            }
            None => None,
        };
        self.target_size = size.ok_or_else(|| {
            RenderError::Submission("Draw recorded without any render target".to_string())
        })?;

        let color_attachments: Vec<_> = color_views
            .iter()
            .zip(color_loads)
            .map(|(view, clear)| Some(color_attachment(view, clear)))
            .collect();
        let pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_view
                    .as_ref()
                    .map(|view| depth_attachment(view, depth_load)),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.pass = Some(pass);
        Ok(())
    }

    /// Opens a pass if needed and applies all graphics state to it.
    fn prepare_draw(&mut self, indexed: bool) -> Result<&mut wgpu::RenderPass<'static>, RenderError> {
        if self.pass.is_none() {
            self.open_pass()?;
        }
        let pipeline = match self.pipeline.and_then(|id| self.registry.pipelines.get(&id)) {
            Some(PipelineEntry::Graphics(pipeline)) => pipeline.clone(),
            _ => {
                return Err(RenderError::Submission(format!(
                    "Draw recorded without a graphics pipeline ({:?})",
                    self.pipeline
                )))
            }
        };
        let root = self.graphics_root.ok_or_else(|| {
            RenderError::Submission("Draw recorded without a root signature".to_string())
        })?;
        let bind_groups = self
            .registry
            .root_bind_groups(self.device, root, &self.graphics_arguments)?;

        let mut vertex_buffers = Vec::with_capacity(self.vertex_buffers.len());
        for (slot, view) in &self.vertex_buffers {
            let buffer = self.registry.buffer(view.location.resource())?.clone();
            let start = view.location.offset() as u64;
            vertex_buffers.push((*slot, buffer, start..start + view.size_in_bytes as u64));
        }
        let index_buffer = match (indexed, self.index_buffer) {
            (false, _) => None,
            (true, Some(view)) => {
                let buffer = self.registry.buffer(view.location.resource())?.clone();
                let start = view.location.offset() as u64;
                Some((buffer, start..start + view.size_in_bytes as u64, view.format))
            }
            (true, None) => {
                return Err(RenderError::Submission(
                    "Indexed draw recorded without an index buffer".to_string(),
                ))
            }
        };

        let (width, height) = self.target_size;
        let viewport = self.viewport.unwrap_or(Viewport::full(width, height));
        let scissor = self.scissor.unwrap_or(ScissorRect::full(width, height));
        let left = scissor.left.min(width);
        let top = scissor.top.min(height);

        let pass = self.pass.as_mut().ok_or_else(|| {
            RenderError::Submission("Render pass closed while drawing".to_string())
        })?;
        pass.set_pipeline(&pipeline);
        for (group, bind_group) in bind_groups.iter().enumerate() {
            pass.set_bind_group(group as u32, bind_group, &[]);
        }
        for (slot, buffer, range) in &vertex_buffers {
            pass.set_vertex_buffer(*slot, buffer.slice(range.clone()));
        }
        if let Some((buffer, range, format)) = &index_buffer {
            pass.set_index_buffer(buffer.slice(range.clone()), format.into_wgpu());
        }
        pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
        pass.set_scissor_rect(
            left,
            top,
            scissor.right.min(width).saturating_sub(left),
            scissor.bottom.min(height).saturating_sub(top),
        );
        Ok(pass)
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), RenderError> {
        self.pass = None;
        self.flush_clears()?;
        let pipeline = match self.pipeline.and_then(|id| self.registry.pipelines.get(&id)) {
            Some(PipelineEntry::Compute(pipeline)) => pipeline.clone(),
            _ => {
                return Err(RenderError::Submission(format!(
                    "Dispatch recorded without a compute pipeline ({:?})",
                    self.pipeline
                )))
            }
        };
        let root = self.compute_root.ok_or_else(|| {
            RenderError::Submission("Dispatch recorded without a root signature".to_string())
        })?;
        let bind_groups = self
            .registry
            .root_bind_groups(self.device, root, &self.compute_arguments)?;

        let mut pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        for (group, bind_group) in bind_groups.iter().enumerate() {
            pass.set_bind_group(group as u32, bind_group, &[]);
        }
        pass.dispatch_workgroups(x, y, z);
        Ok(())
    }
}

fn color_attachment(
    view: &wgpu::TextureView,
    clear: Option<[f32; 4]>,
) -> wgpu::RenderPassColorAttachment<'_> {
    let load = match clear {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
    }
}

fn depth_attachment(
    view: &wgpu::TextureView,
    clear: Option<f32>,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}
