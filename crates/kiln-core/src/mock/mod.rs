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

//! A recording backend for tests.
//!
//! Every object the [`MockDevice`] creates is kept in a shared [`MockState`]
//! that tests can inspect: buffer contents, descriptor slots, root signature
//! layouts, pipeline descriptions. Command lists record [`MockCommand`]s and
//! the [`MockQueue`] appends executed lists to the same state. The fence
//! completes as soon as it is signaled.

use crate::renderer::api::*;
use crate::renderer::error::{PipelineError, RenderError, ResourceError, ShaderError};
use crate::renderer::traits::{CommandList, CommandQueue, GraphicsDevice, SwapChain};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One command recorded by a [`MockCommandList`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    /// `resource_barrier`, one entry per barrier.
    Barrier(ResourceBarrier),
    /// `set_descriptor_heaps`
    SetDescriptorHeaps(Vec<DescriptorHeapId>),
    /// `set_graphics_root_signature`
    SetGraphicsRootSignature(RootSignatureId),
    /// `set_compute_root_signature`
    SetComputeRootSignature(RootSignatureId),
    /// `set_pipeline_state`
    SetPipelineState(PipelineId),
    /// `set_graphics_root_constant_buffer_view`
    SetGraphicsRootCbv(u32, GpuVirtualAddress),
    /// `set_compute_root_constant_buffer_view`
    SetComputeRootCbv(u32, GpuVirtualAddress),
    /// `set_graphics_root_descriptor_table`
    SetGraphicsRootTable(u32, GpuDescriptorHandle),
    /// `set_compute_root_descriptor_table`
    SetComputeRootTable(u32, GpuDescriptorHandle),
    /// `ia_set_vertex_buffers`
    SetVertexBuffers(u32, Vec<VertexBufferView>),
    /// `ia_set_index_buffer`
    SetIndexBuffer(IndexBufferView),
    /// `ia_set_primitive_topology`
    SetPrimitiveTopology(PrimitiveTopology),
    /// `om_set_render_targets`
    SetRenderTargets(Vec<CpuDescriptorHandle>, Option<CpuDescriptorHandle>),
    /// `clear_render_target_view`
    ClearRenderTarget(CpuDescriptorHandle, [f32; 4]),
    /// `clear_depth_stencil_view`
    ClearDepthStencil(CpuDescriptorHandle, f32),
    /// `rs_set_viewport`
    SetViewport(Viewport),
    /// `rs_set_scissor_rect`
    SetScissorRect(ScissorRect),
    /// `draw_instanced`
    DrawInstanced {
        /// Vertices per instance.
        vertex_count: u32,
        /// Instances.
        instance_count: u32,
    },
    /// `draw_indexed_instanced`
    DrawIndexedInstanced {
        /// Indices per instance.
        index_count: u32,
        /// Instances.
        instance_count: u32,
    },
    /// `dispatch`
    Dispatch(u32, u32, u32),
    /// `copy_buffer_region`
    CopyBufferRegion {
        /// Destination buffer.
        dest: ResourceId,
        /// Source buffer.
        source: ResourceId,
        /// Copied bytes.
        num_bytes: u64,
    },
}

impl MockCommand {
    /// Returns `true` for draw commands.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            MockCommand::DrawInstanced { .. } | MockCommand::DrawIndexedInstanced { .. }
        )
    }
}

/// A committed resource known to the mock device.
#[derive(Debug, Clone)]
pub struct MockResource {
    /// The creation description.
    pub desc: ResourceDesc,
    /// The creation state.
    pub initial_state: ResourceState,
    /// The bytes written so far (buffers and textures).
    pub data: Vec<u8>,
}

/// A view written into a mock descriptor slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MockDescriptor {
    /// A shader resource view.
    Srv(ResourceId, ShaderResourceViewDesc),
    /// An unordered access view.
    Uav(ResourceId, UnorderedAccessViewDesc),
    /// A constant buffer view.
    Cbv(ConstantBufferViewDesc),
    /// A render target view.
    Rtv(ResourceId),
    /// A depth stencil view.
    Dsv(ResourceId),
    /// A sampler.
    Sampler(SamplerDesc),
}

/// A descriptor heap known to the mock device.
#[derive(Debug, Clone)]
pub struct MockHeap {
    /// The creation description.
    pub desc: DescriptorHeapDesc,
    /// The slots, `None` until written.
    pub slots: Vec<Option<MockDescriptor>>,
}

/// Everything the mock backend has been asked to create or execute.
#[derive(Debug, Default)]
pub struct MockState {
    next_id: u32,
    /// Live resources.
    pub resources: HashMap<ResourceId, MockResource>,
    /// Resources destroyed so far, in order.
    pub destroyed: Vec<ResourceId>,
    /// Descriptor heaps.
    pub heaps: HashMap<DescriptorHeapId, MockHeap>,
    /// Shader sources by module.
    pub shader_modules: HashMap<ShaderModuleId, String>,
    /// Root signature layouts.
    pub root_signatures: HashMap<RootSignatureId, RootSignatureLayout>,
    /// Graphics pipeline descriptions.
    pub graphics_pipelines: HashMap<PipelineId, GraphicsPipelineDesc>,
    /// Compute pipeline descriptions.
    pub compute_pipelines: HashMap<PipelineId, ComputePipelineDesc>,
    /// Commands of every executed list, in submission order.
    pub executed: Vec<MockCommand>,
    /// Number of lists executed.
    pub executed_lists: usize,
}

impl MockState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn write_descriptor(
        &mut self,
        dest: CpuDescriptorHandle,
        descriptor: MockDescriptor,
    ) -> Result<(), ResourceError> {
        let heap = self.heaps.get_mut(&dest.heap).ok_or_else(|| {
            ResourceError::InvalidView(format!("unknown descriptor heap {:?}", dest.heap))
        })?;
        let capacity = heap.desc.capacity;
        let slot = heap.slots.get_mut(dest.index as usize).ok_or_else(|| {
            ResourceError::InvalidView(format!(
                "slot {} outside heap of {capacity} descriptors",
                dest.index
            ))
        })?;
        *slot = Some(descriptor);
        Ok(())
    }

    fn require(&self, id: ResourceId) -> Result<&MockResource, ResourceError> {
        self.resources.get(&id).ok_or(ResourceError::NotFound(id))
    }

    /// Returns the view written into a descriptor slot.
    pub fn descriptor(&self, handle: CpuDescriptorHandle) -> Option<&MockDescriptor> {
        self.heaps
            .get(&handle.heap)?
            .slots
            .get(handle.index as usize)?
            .as_ref()
    }
}

/// A [`GraphicsDevice`] that records instead of rendering.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
    capabilities: DeviceCapabilities,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Creates a mock device with compute support.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            capabilities: DeviceCapabilities::default(),
        }
    }

    /// Creates a mock device that reports no compute support.
    pub fn without_compute() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                supports_compute: false,
                ..DeviceCapabilities::default()
            },
            ..Self::new()
        }
    }

    /// Locks the recorded state for inspection.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Creates a queue executing into this device's state.
    pub fn create_queue(&self) -> MockQueue {
        MockQueue {
            state: self.state.clone(),
            completed: 0,
        }
    }

    /// Returns the bytes last written to a resource.
    pub fn contents(&self, id: ResourceId) -> Option<Vec<u8>> {
        self.state().resources.get(&id).map(|r| r.data.clone())
    }

    /// Number of resources created and not yet destroyed.
    pub fn live_resource_count(&self) -> usize {
        self.state().resources.len()
    }
}

impl GraphicsDevice for MockDevice {
    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        _clear_value: Option<ClearValue>,
    ) -> Result<ResourceId, ResourceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::AllocationFailed {
                label: desc.label.clone(),
                details: "zero-sized resource".to_string(),
            });
        }
        let mut state = self.state();
        let id = ResourceId(state.next_id());
        let size = if desc.is_buffer() {
            desc.width as usize
        } else {
            desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel() as usize
        };
        state.resources.insert(
            id,
            MockResource {
                desc: desc.clone(),
                initial_state,
                data: vec![0; size],
            },
        );
        Ok(id)
    }

    fn destroy_resource(&self, id: ResourceId) {
        let mut state = self.state();
        if state.resources.remove(&id).is_some() {
            state.destroyed.push(id);
        }
    }

    fn resource_exists(&self, id: ResourceId) -> bool {
        self.state().resources.contains_key(&id)
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let resource = state
            .resources
            .get_mut(&id)
            .ok_or(ResourceError::NotFound(id))?;
        let size = resource.data.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(ResourceError::OutOfBounds {
                resource: id,
                offset,
                len: data.len() as u64,
                size,
            });
        }
        resource.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn write_texture(
        &self,
        id: ResourceId,
        data: &[u8],
        _bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        self.write_buffer(id, 0, data)
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapId, ResourceError> {
        let mut state = self.state();
        let id = DescriptorHeapId(state.next_id());
        state.heaps.insert(
            id,
            MockHeap {
                desc: *desc,
                slots: vec![None; desc.capacity as usize],
            },
        );
        Ok(id)
    }

    fn create_shader_resource_view(
        &self,
        resource: ResourceId,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require(resource)?;
        state.write_descriptor(dest, MockDescriptor::Srv(resource, *desc))
    }

    fn create_unordered_access_view(
        &self,
        resource: ResourceId,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let flags = state.require(resource)?.desc.flags;
        if !flags.contains(ResourceFlags::ALLOW_UNORDERED_ACCESS) {
            return Err(ResourceError::InvalidView(format!(
                "{resource:?} was not created with ALLOW_UNORDERED_ACCESS"
            )));
        }
        state.write_descriptor(dest, MockDescriptor::Uav(resource, *desc))
    }

    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require(desc.location.resource())?;
        state.write_descriptor(dest, MockDescriptor::Cbv(*desc))
    }

    fn create_render_target_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require(resource)?;
        state.write_descriptor(dest, MockDescriptor::Rtv(resource))
    }

    fn create_depth_stencil_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require(resource)?;
        state.write_descriptor(dest, MockDescriptor::Dsv(resource))
    }

    fn create_sampler(
        &self,
        desc: &SamplerDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        self.state()
            .write_descriptor(dest, MockDescriptor::Sampler(*desc))
    }

    fn create_shader_module(
        &self,
        desc: &ShaderModuleDesc<'_>,
    ) -> Result<ShaderModuleId, ShaderError> {
        if desc.source.trim().is_empty() {
            return Err(ShaderError::CompilationError {
                label: desc.label.to_string(),
                details: "empty source".to_string(),
            });
        }
        let mut state = self.state();
        let id = ShaderModuleId(state.next_id());
        state.shader_modules.insert(id, desc.source.to_string());
        Ok(id)
    }

    fn create_root_signature(
        &self,
        layout: &RootSignatureLayout,
    ) -> Result<RootSignatureId, PipelineError> {
        let mut state = self.state();
        let id = RootSignatureId(state.next_id());
        state.root_signatures.insert(id, layout.clone());
        Ok(id)
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineId, PipelineError> {
        let mut state = self.state();
        if !state.root_signatures.contains_key(&desc.root_signature) {
            return Err(PipelineError::UnknownRootSignature(desc.root_signature));
        }
        let id = PipelineId(state.next_id());
        state.graphics_pipelines.insert(id, desc.clone());
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<PipelineId, PipelineError> {
        let mut state = self.state();
        if !state.root_signatures.contains_key(&desc.root_signature) {
            return Err(PipelineError::UnknownRootSignature(desc.root_signature));
        }
        let id = PipelineId(state.next_id());
        state.compute_pipelines.insert(id, desc.clone());
        Ok(id)
    }

    fn create_command_list(&self, _label: &str) -> Result<Box<dyn CommandList>, RenderError> {
        Ok(Box::new(MockCommandList::default()))
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }
}

/// A [`CommandList`] that stores its commands.
#[derive(Debug, Default)]
pub struct MockCommandList {
    commands: Vec<MockCommand>,
    closed: bool,
}

impl MockCommandList {
    /// The commands recorded since the last reset.
    pub fn commands(&self) -> &[MockCommand] {
        &self.commands
    }

    /// Whether the list is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn push(&mut self, command: MockCommand) {
        debug_assert!(!self.closed, "recording into a closed command list");
        self.commands.push(command);
    }
}

impl CommandList for MockCommandList {
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) {
        for barrier in barriers {
            self.push(MockCommand::Barrier(*barrier));
        }
    }

    fn set_descriptor_heaps(&mut self, heaps: &[DescriptorHeapId]) {
        self.push(MockCommand::SetDescriptorHeaps(heaps.to_vec()));
    }

    fn set_graphics_root_signature(&mut self, root_signature: RootSignatureId) {
        self.push(MockCommand::SetGraphicsRootSignature(root_signature));
    }

    fn set_compute_root_signature(&mut self, root_signature: RootSignatureId) {
        self.push(MockCommand::SetComputeRootSignature(root_signature));
    }

    fn set_pipeline_state(&mut self, pipeline: PipelineId) {
        self.push(MockCommand::SetPipelineState(pipeline));
    }

    fn set_graphics_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress) {
        self.push(MockCommand::SetGraphicsRootCbv(index, address));
    }

    fn set_compute_root_constant_buffer_view(&mut self, index: u32, address: GpuVirtualAddress) {
        self.push(MockCommand::SetComputeRootCbv(index, address));
    }

    fn set_graphics_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.push(MockCommand::SetGraphicsRootTable(index, table));
    }

    fn set_compute_root_descriptor_table(&mut self, index: u32, table: GpuDescriptorHandle) {
        self.push(MockCommand::SetComputeRootTable(index, table));
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, views: &[VertexBufferView]) {
        self.push(MockCommand::SetVertexBuffers(start_slot, views.to_vec()));
    }

    fn ia_set_index_buffer(&mut self, view: &IndexBufferView) {
        self.push(MockCommand::SetIndexBuffer(*view));
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.push(MockCommand::SetPrimitiveTopology(topology));
    }

    fn om_set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    ) {
        self.push(MockCommand::SetRenderTargets(
            render_targets.to_vec(),
            depth_stencil,
        ));
    }

    fn clear_render_target_view(&mut self, view: CpuDescriptorHandle, color: [f32; 4]) {
        self.push(MockCommand::ClearRenderTarget(view, color));
    }

    fn clear_depth_stencil_view(&mut self, view: CpuDescriptorHandle, depth: f32, _stencil: u8) {
        self.push(MockCommand::ClearDepthStencil(view, depth));
    }

    fn rs_set_viewport(&mut self, viewport: &Viewport) {
        self.push(MockCommand::SetViewport(*viewport));
    }

    fn rs_set_scissor_rect(&mut self, rect: &ScissorRect) {
        self.push(MockCommand::SetScissorRect(*rect));
    }

    fn draw_instanced(
        &mut self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        _start_vertex: u32,
        _start_instance: u32,
    ) {
        self.push(MockCommand::DrawInstanced {
            vertex_count: vertex_count_per_instance,
            instance_count,
        });
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count_per_instance: u32,
        instance_count: u32,
        _start_index: u32,
        _base_vertex: i32,
        _start_instance: u32,
    ) {
        self.push(MockCommand::DrawIndexedInstanced {
            index_count: index_count_per_instance,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.push(MockCommand::Dispatch(x, y, z));
    }

    fn copy_buffer_region(
        &mut self,
        dest: ResourceId,
        _dest_offset: u64,
        source: ResourceId,
        _source_offset: u64,
        num_bytes: u64,
    ) {
        self.push(MockCommand::CopyBufferRegion {
            dest,
            source,
            num_bytes,
        });
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Submission(
                "command list closed twice".to_string(),
            ));
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

/// A [`CommandQueue`] whose fence completes as soon as it is signaled.
#[derive(Debug)]
pub struct MockQueue {
    state: Arc<Mutex<MockState>>,
    completed: u64,
}

impl CommandQueue for MockQueue {
    fn execute_command_list(&mut self, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let list = list
            .as_any_mut()
            .downcast_mut::<MockCommandList>()
            .ok_or_else(|| RenderError::Submission("foreign command list".to_string()))?;
        if !list.closed {
            return Err(RenderError::Submission(
                "executing a command list that is still recording".to_string(),
            ));
        }
        let mut state = self.state.lock().expect("mock state poisoned");
        state.executed.extend(list.commands.iter().cloned());
        state.executed_lists += 1;
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<(), RenderError> {
        self.completed = self.completed.max(value);
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.completed
    }

    fn wait_until(&mut self, value: u64) -> Result<(), RenderError> {
        if self.completed < value {
            return Err(RenderError::Submission(format!(
                "fence value {value} was never signaled"
            )));
        }
        Ok(())
    }
}

/// A [`SwapChain`] over two mock resources.
#[derive(Debug)]
pub struct MockSwapChain {
    back_buffers: [ResourceId; 2],
    current: u32,
    size: (u32, u32),
    /// Number of presents so far.
    pub presents: usize,
    /// Number of `resize` calls so far.
    pub resizes: usize,
    lost: bool,
}

impl MockSwapChain {
    /// Creates the two back buffers on `device`.
    pub fn new(device: &MockDevice, width: u32, height: u32) -> Result<Self, ResourceError> {
        let create = |i: u32| {
            device.create_committed_resource(
                &ResourceDesc::texture_2d(
                    format!("back buffer {i}"),
                    width,
                    height,
                    Format::Bgra8UnormSrgb,
                    ResourceFlags::ALLOW_RENDER_TARGET,
                ),
                ResourceState::Present,
                None,
            )
        };
        Ok(Self {
            back_buffers: [create(0)?, create(1)?],
            current: 1,
            size: (width, height),
            presents: 0,
            resizes: 0,
            lost: false,
        })
    }

    /// Reports [`RenderError::SurfaceLost`] from every acquire until the next resize.
    pub fn with_lost_surface(mut self) -> Self {
        self.lost = true;
        self
    }
}

impl SwapChain for MockSwapChain {
    fn back_buffer(&self, index: u32) -> ResourceId {
        self.back_buffers[index as usize % 2]
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn format(&self) -> Format {
        Format::Bgra8UnormSrgb
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn acquire_next_image(&mut self) -> Result<u32, RenderError> {
        if self.lost {
            return Err(RenderError::SurfaceLost);
        }
        self.current = (self.current + 1) % 2;
        Ok(self.current)
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.presents += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.size = (width, height);
        self.resizes += 1;
        self.lost = false;
        Ok(())
    }
}

/// Returns the commands recorded so far into a context backed by a mock device.
pub fn recorded_commands(list: &mut dyn CommandList) -> Vec<MockCommand> {
    list.as_any_mut()
        .downcast_mut::<MockCommandList>()
        .map(|l| l.commands().to_vec())
        .unwrap_or_default()
}
