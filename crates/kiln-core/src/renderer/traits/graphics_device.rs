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
use crate::renderer::error::{PipelineError, RenderError, ResourceError, ShaderError};
use crate::renderer::traits::CommandList;
use std::fmt::Debug;

/// The creation interface of a graphics backend.
///
/// There is exactly one device per process. Every object it creates is named by
/// an opaque id; ownership of those ids lives in the wrappers of [`crate::gpu`].
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Allocates a committed resource.
    ///
    /// ## Arguments
    /// * `desc` - The size, format, capabilities and heap of the resource.
    /// * `initial_state` - The state the resource starts in on the GPU timeline.
    /// * `clear_value` - The clear value render targets are optimized for.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the backend rejects the allocation.
    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        clear_value: Option<ClearValue>,
    ) -> Result<ResourceId, ResourceError>;

    /// Releases a committed resource. Unknown ids are ignored.
    fn destroy_resource(&self, id: ResourceId);

    /// Whether `id` names a resource that has not been destroyed.
    fn resource_exists(&self, id: ResourceId) -> bool;

    /// Copies `data` into a buffer at `offset`.
    ///
    /// The write is ordered before any command list executed afterwards.
    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Replaces the full contents of a 2D texture with tightly packed rows of
    /// `bytes_per_row` bytes.
    fn write_texture(
        &self,
        id: ResourceId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError>;

    /// Creates a descriptor heap with a fixed number of slots.
    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapId, ResourceError>;

    /// Writes a shader resource view of `resource` into `dest`.
    fn create_shader_resource_view(
        &self,
        resource: ResourceId,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Writes an unordered access view of `resource` into `dest`.
    fn create_unordered_access_view(
        &self,
        resource: ResourceId,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Writes a constant buffer view into `dest`.
    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Writes a render target view of `resource` into `dest`.
    fn create_render_target_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Writes a depth stencil view of `resource` into `dest`.
    fn create_depth_stencil_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Writes a sampler into `dest`.
    fn create_sampler(
        &self,
        desc: &SamplerDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError>;

    /// Compiles a shader module from source.
    fn create_shader_module(&self, desc: &ShaderModuleDesc<'_>)
        -> Result<ShaderModuleId, ShaderError>;

    /// Compiles a root signature from a complete layout.
    fn create_root_signature(
        &self,
        layout: &RootSignatureLayout,
    ) -> Result<RootSignatureId, PipelineError>;

    /// Compiles a graphics pipeline state object.
    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineId, PipelineError>;

    /// Compiles a compute pipeline state object.
    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<PipelineId, PipelineError>;

    /// Creates a command list (with its allocator) in the recording state.
    fn create_command_list(&self, label: &str) -> Result<Box<dyn CommandList>, RenderError>;

    /// Reports the optional capabilities of the device.
    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::default()
    }
}
