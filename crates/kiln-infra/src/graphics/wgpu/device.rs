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

use super::command::WgpuCommandList;
use super::conversions::{
    color_target, range_binding_type, range_visibility, sampler_binding_type, sampler_descriptor,
    texture_format, uniform_binding_type, IntoWgpu,
};
use super::registry::{
    Descriptor, DescriptorHeap, PipelineEntry, Registry, ResourceEntry, RootSignatureEntry,
    WgpuShared,
};
use kiln_core::renderer::api::{
    ClearValue, ComputePipelineDesc, ConstantBufferViewDesc, CpuDescriptorHandle,
    DescriptorHeapDesc, DescriptorHeapId, DeviceCapabilities, GraphicsPipelineDesc, PipelineId,
    ResourceDesc, ResourceDimension, ResourceFlags, ResourceId, ResourceState, RootParameter,
    RootSignatureId, RootSignatureLayout, SamplerDesc, ShaderModuleDesc, ShaderModuleId,
    ShaderResourceViewDesc, ShaderStageDesc, UnorderedAccessViewDesc,
};
use kiln_core::renderer::{
    CommandList, GraphicsDevice, PipelineError, RenderError, ResourceError, ShaderError,
};
use std::borrow::Cow;
use std::sync::{Arc, MutexGuard};

/// The `wgpu` implementation of [`GraphicsDevice`].
///
/// Cloning is cheap: every clone shares the same device, queue and registry.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    pub(crate) shared: Arc<WgpuShared>,
}

impl WgpuDevice {
    pub(crate) fn new(shared: Arc<WgpuShared>) -> Self {
        Self { shared }
    }

    fn registry(&self) -> Result<MutexGuard<'_, Registry>, ResourceError> {
        self.shared.registry()
    }

    /// Runs `create` inside a validation error scope and returns the first
    /// error wgpu reported, if any.
    fn validated<T>(&self, create: impl FnOnce() -> T) -> Result<T, String> {
        self.shared
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        match pollster::block_on(self.shared.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }

    fn create_buffer(&self, desc: &ResourceDesc) -> Result<ResourceEntry, ResourceError> {
        let limit = self.shared.device.limits().max_buffer_size;
        if desc.width == 0 || desc.width > limit {
            return Err(ResourceError::AllocationFailed {
                label: desc.label.clone(),
                details: format!("buffer size {} is outside 1..={limit}", desc.width),
            });
        }
        // Queue writes and copies work in 4-byte units.
        let size = desc.width.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(ResourceEntry::Buffer(buffer))
    }

    fn create_texture(&self, desc: &ResourceDesc) -> Result<ResourceEntry, ResourceError> {
        let format = texture_format(desc.format).ok_or_else(|| ResourceError::AllocationFailed {
            label: desc.label.clone(),
            details: "textures need a known format".to_string(),
        })?;
        let limit = self.shared.device.limits().max_texture_dimension_2d as u64;
        if desc.width == 0 || desc.height == 0 || desc.width > limit || desc.height as u64 > limit
        {
            return Err(ResourceError::AllocationFailed {
                label: desc.label.clone(),
                details: format!(
                    "{}x{} is outside the 1..={limit} texture range",
                    desc.width, desc.height
                ),
            });
        }

        let mut usage = wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC;
        if !desc.flags.contains(ResourceFlags::DENY_SHADER_RESOURCE) {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if desc
            .flags
            .intersects(ResourceFlags::ALLOW_RENDER_TARGET | ResourceFlags::ALLOW_DEPTH_STENCIL)
        {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        if desc.flags.contains(ResourceFlags::ALLOW_UNORDERED_ACCESS) {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }

        let texture = self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width as u32,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(ResourceEntry::Texture { texture, view })
    }

    fn shader_stage<'r>(
        registry: &'r Registry,
        label: &str,
        stage: &ShaderStageDesc,
    ) -> Result<&'r wgpu::ShaderModule, PipelineError> {
        registry
            .shader_modules
            .get(&stage.module)
            .ok_or_else(|| {
                PipelineError::Shader(ShaderError::CompilationError {
                    label: label.to_string(),
                    details: format!("{:?} is not a compiled module", stage.module),
                })
            })
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        clear_value: Option<ClearValue>,
    ) -> Result<ResourceId, ResourceError> {
        let entry = match desc.dimension {
            ResourceDimension::Buffer => self.create_buffer(desc)?,
            ResourceDimension::Texture2D => self.create_texture(desc)?,
        };
        let id = self.registry()?.insert_resource(entry);
        log::trace!(
            "Created {id:?} '{}' ({:?}, {initial_state:?}, clear {clear_value:?})",
            desc.label,
            desc.dimension
        );
        Ok(id)
    }

    fn destroy_resource(&self, id: ResourceId) {
        // wgpu keeps the memory alive until in-flight submissions retire.
        match self.registry() {
            Ok(mut registry) => {
                if registry.remove_resource(id).is_some() {
                    log::trace!("Released {id:?}");
                }
            }
            Err(e) => log::error!("Failed to release {id:?}: {e}"),
        }
    }

    fn resource_exists(&self, id: ResourceId) -> bool {
        self.registry()
            .map(|registry| registry.resources.contains_key(&id))
            .unwrap_or(false)
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let registry = self.registry()?;
        let buffer = registry.buffer(id)?;
        let len = data.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > buffer.size()) {
            return Err(ResourceError::OutOfBounds {
                resource: id,
                offset,
                len,
                size: buffer.size(),
            });
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(ResourceError::BackendError(format!(
                "Write into {id:?} at unaligned offset {offset}"
            )));
        }
        if len % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.shared.queue.write_buffer(buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize, 0);
            self.shared.queue.write_buffer(buffer, offset, &padded);
        }
        Ok(())
    }

    fn write_texture(
        &self,
        id: ResourceId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        let registry = self.registry()?;
        let texture = match registry.resources.get(&id) {
            Some(ResourceEntry::Texture { texture, .. }) => texture,
            Some(_) => return Err(ResourceError::InvalidView(format!("{id:?} is not a texture"))),
            None => return Err(ResourceError::NotFound(id)),
        };
        let size = bytes_per_row as u64 * texture.height() as u64;
        if (data.len() as u64) < size {
            return Err(ResourceError::OutOfBounds {
                resource: id,
                offset: 0,
                len: data.len() as u64,
                size,
            });
        }
        self.shared.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(texture.height()),
            },
            texture.size(),
        );
        Ok(())
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapId, ResourceError> {
        let mut registry = self.registry()?;
        let id = DescriptorHeapId(registry.next_id());
        let slots = std::iter::repeat_with(|| None)
            .take(desc.capacity as usize)
            .collect();
        registry.heaps.insert(id, DescriptorHeap { desc: *desc, slots });
        log::debug!("Created {:?} descriptor heap of {}", desc.kind, desc.capacity);
        Ok(id)
    }

    fn create_shader_resource_view(
        &self,
        resource: ResourceId,
        desc: &ShaderResourceViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry()?;
        match desc {
            ShaderResourceViewDesc::Texture2D { .. } => {
                registry.texture_view(resource)?;
            }
            ShaderResourceViewDesc::StructuredBuffer { .. } => {
                registry.buffer(resource)?;
            }
        }
        registry.write_descriptor(
            dest,
            Descriptor::ShaderResource {
                resource,
                desc: *desc,
            },
        )
    }

    fn create_unordered_access_view(
        &self,
        resource: ResourceId,
        desc: &UnorderedAccessViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry()?;
        registry.buffer(resource)?;
        registry.write_descriptor(
            dest,
            Descriptor::UnorderedAccess {
                resource,
                desc: *desc,
            },
        )
    }

    fn create_constant_buffer_view(
        &self,
        desc: &ConstantBufferViewDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry()?;
        registry.buffer(desc.location.resource())?;
        registry.write_descriptor(dest, Descriptor::ConstantBuffer(*desc))
    }

    fn create_render_target_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry()?;
        match registry.resources.get(&resource) {
            Some(ResourceEntry::Texture { .. } | ResourceEntry::BackBuffer { .. }) => {}
            Some(ResourceEntry::Buffer(_)) => {
                return Err(ResourceError::InvalidView(format!(
                    "{resource:?} is a buffer and cannot be a render target"
                )))
            }
            None => return Err(ResourceError::NotFound(resource)),
        }
        registry.write_descriptor(dest, Descriptor::RenderTarget(resource))
    }

    fn create_depth_stencil_view(
        &self,
        resource: ResourceId,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry()?;
        match registry.resources.get(&resource) {
            Some(ResourceEntry::Texture { texture, .. })
                if texture.format().is_depth_stencil_format() => {}
            Some(_) => {
                return Err(ResourceError::InvalidView(format!(
                    "{resource:?} is not a depth texture"
                )))
            }
            None => return Err(ResourceError::NotFound(resource)),
        }
        registry.write_descriptor(dest, Descriptor::DepthStencil(resource))
    }

    fn create_sampler(
        &self,
        desc: &SamplerDesc,
        dest: CpuDescriptorHandle,
    ) -> Result<(), ResourceError> {
        let sampler = self.shared.device.create_sampler(&sampler_descriptor(desc));
        self.registry()?
            .write_descriptor(dest, Descriptor::Sampler(sampler))
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
        let module = self
            .validated(|| {
                self.shared
                    .device
                    .create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(desc.label),
                        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.source)),
                    })
            })
            .map_err(|details| ShaderError::CompilationError {
                label: desc.label.to_string(),
                details,
            })?;

        let mut registry = self.registry().map_err(|e| ShaderError::CompilationError {
            label: desc.label.to_string(),
            details: e.to_string(),
        })?;
        let id = ShaderModuleId(registry.next_id());
        registry.shader_modules.insert(id, module);
        log::debug!("Compiled shader module '{}' as {id:?}", desc.label);
        Ok(id)
    }

    fn create_root_signature(
        &self,
        layout: &RootSignatureLayout,
    ) -> Result<RootSignatureId, PipelineError> {
        let invalid = |details: String| PipelineError::InvalidRootSignature {
            label: layout.label.clone(),
            details,
        };
        let group_count =
            layout.parameters.len() + usize::from(layout.sampler_group().is_some());
        let max_groups = self.shared.device.limits().max_bind_groups as usize;
        if group_count > max_groups {
            return Err(invalid(format!(
                "{group_count} bind groups exceed the device limit of {max_groups}"
            )));
        }

        let device = &self.shared.device;
        let mut bind_group_layouts = Vec::with_capacity(group_count);
        for (index, parameter) in layout.parameters.iter().enumerate() {
            let entries: Vec<_> = match *parameter {
                RootParameter::ConstantBuffer { visibility, .. } => vec![wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: visibility.into_wgpu(),
                    ty: uniform_binding_type(),
                    count: None,
                }],
                RootParameter::DescriptorTable { range, visibility } => {
                    if range.count == 0 {
                        return Err(invalid(format!("table {index} has an empty range")));
                    }
                    (0..range.count)
                        .map(|binding| wgpu::BindGroupLayoutEntry {
                            binding,
                            visibility: range_visibility(range.kind, visibility),
                            ty: range_binding_type(range.kind),
                            count: None,
                        })
                        .collect()
                }
            };
            let label = format!("{} #{index}", layout.label);
            bind_group_layouts.push(
                self.validated(|| {
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(&label),
                        entries: &entries,
                    })
                })
                .map_err(&invalid)?,
            );
        }

        let mut sampler_group = None;
        if !layout.static_samplers.is_empty() {
            let entries: Vec<_> = layout
                .static_samplers
                .iter()
                .enumerate()
                .map(|(binding, sampler)| wgpu::BindGroupLayoutEntry {
                    binding: binding as u32,
                    visibility: sampler.visibility.into_wgpu(),
                    ty: wgpu::BindingType::Sampler(sampler_binding_type(&sampler.desc)),
                    count: None,
                })
                .collect();
            let label = format!("{} samplers", layout.label);
            let sampler_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&label),
                entries: &entries,
            });
            let samplers: Vec<_> = layout
                .static_samplers
                .iter()
                .map(|s| device.create_sampler(&sampler_descriptor(&s.desc)))
                .collect();
            let entries: Vec<_> = samplers
                .iter()
                .enumerate()
                .map(|(binding, sampler)| wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: wgpu::BindingResource::Sampler(sampler),
                })
                .collect();
            sampler_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: &sampler_layout,
                entries: &entries,
            }));
            bind_group_layouts.push(sampler_layout);
        }

        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .validated(|| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&layout.label),
                    bind_group_layouts: &layout_refs,
                    push_constant_ranges: &[],
                })
            })
            .map_err(&invalid)?;

        let mut registry = self.registry().map_err(|e| invalid(e.to_string()))?;
        let id = RootSignatureId(registry.next_id());
        registry.root_signatures.insert(
            id,
            RootSignatureEntry {
                layout: layout.clone(),
                bind_group_layouts,
                pipeline_layout,
                sampler_group,
            },
        );
        log::debug!(
            "Created root signature '{}' with {} parameters and {} static samplers",
            layout.label,
            layout.parameters.len(),
            layout.static_samplers.len()
        );
        Ok(id)
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineId, PipelineError> {
        let incomplete = |missing: &'static str| PipelineError::IncompleteDescription {
            label: desc.label.clone(),
            missing,
        };
        let targets = desc
            .render_targets
            .iter()
            .map(|t| color_target(t).map(Some))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| incomplete("render target format"))?;
        let depth_stencil = desc
            .depth_stencil
            .map(|ds| {
                Some(wgpu::DepthStencilState {
                    format: texture_format(ds.format)?,
                    depth_write_enabled: ds.depth_write_enabled,
                    depth_compare: ds.depth_compare.into_wgpu(),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState {
                        constant: desc.rasterizer.depth_bias.constant,
                        slope_scale: desc.rasterizer.depth_bias.slope_scale,
                        clamp: desc.rasterizer.depth_bias.clamp,
                    },
                })
            })
            .map(|ds| ds.ok_or_else(|| incomplete("depth stencil format")))
            .transpose()?;

        let mut attributes: Vec<Vec<wgpu::VertexAttribute>> =
            vec![Vec::new(); desc.input_layout.slots.len()];
        for element in &desc.input_layout.elements {
            let slot = attributes
                .get_mut(element.input_slot as usize)
                .ok_or_else(|| incomplete("input slot for a vertex element"))?;
            slot.push(wgpu::VertexAttribute {
                format: element.format.into_wgpu(),
                offset: element.aligned_byte_offset as u64,
                shader_location: element.shader_location,
            });
        }
        let buffers: Vec<_> = desc
            .input_layout
            .slots
            .iter()
            .zip(&attributes)
            .map(|(slot, attributes)| wgpu::VertexBufferLayout {
                array_stride: slot.stride as u64,
                step_mode: slot.classification.into_wgpu(),
                attributes,
            })
            .collect();

        let mut registry = self
            .registry()
            .map_err(|e| PipelineError::CompilationFailed {
                label: desc.label.clone(),
                details: e.to_string(),
            })?;
        let root = registry
            .root_signatures
            .get(&desc.root_signature)
            .ok_or(PipelineError::UnknownRootSignature(desc.root_signature))?;
        let vertex_module = Self::shader_stage(&registry, &desc.label, &desc.vertex)?;
        let fragment_module = desc
            .pixel
            .as_ref()
            .map(|stage| Self::shader_stage(&registry, &desc.label, stage).map(|m| (m, stage)))
            .transpose()?;

        let pipeline = self
            .validated(|| {
                self.shared
                    .device
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some(&desc.label),
                        layout: Some(&root.pipeline_layout),
                        vertex: wgpu::VertexState {
                            module: vertex_module,
                            entry_point: Some(&desc.vertex.entry_point),
                            compilation_options: Default::default(),
                            buffers: &buffers,
                        },
                        fragment: fragment_module.map(|(module, stage)| wgpu::FragmentState {
                            module,
                            entry_point: Some(&stage.entry_point),
                            compilation_options: Default::default(),
                            targets: &targets,
                        }),
                        primitive: wgpu::PrimitiveState {
                            topology: desc.topology.into_wgpu(),
                            strip_index_format: None,
                            front_face: desc.rasterizer.front_face.into_wgpu(),
                            cull_mode: desc.rasterizer.cull_mode.into_wgpu(),
                            polygon_mode: desc.rasterizer.fill_mode.into_wgpu(),
                            unclipped_depth: false,
                            conservative: false,
                        },
                        depth_stencil,
                        multisample: wgpu::MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    })
            })
            .map_err(|details| PipelineError::CompilationFailed {
                label: desc.label.clone(),
                details,
            })?;

        let id = PipelineId(registry.next_id());
        registry
            .pipelines
            .insert(id, PipelineEntry::Graphics(pipeline));
        log::debug!("Compiled graphics pipeline '{}' as {id:?}", desc.label);
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<PipelineId, PipelineError> {
        let mut registry = self
            .registry()
            .map_err(|e| PipelineError::CompilationFailed {
                label: desc.label.clone(),
                details: e.to_string(),
            })?;
        let root = registry
            .root_signatures
            .get(&desc.root_signature)
            .ok_or(PipelineError::UnknownRootSignature(desc.root_signature))?;
        let module = Self::shader_stage(&registry, &desc.label, &desc.compute)?;

        let pipeline = self
            .validated(|| {
                self.shared
                    .device
                    .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                        label: Some(&desc.label),
                        layout: Some(&root.pipeline_layout),
                        module,
                        entry_point: Some(&desc.compute.entry_point),
                        compilation_options: Default::default(),
                        cache: None,
                    })
            })
            .map_err(|details| PipelineError::CompilationFailed {
                label: desc.label.clone(),
                details,
            })?;

        let id = PipelineId(registry.next_id());
        registry.pipelines.insert(id, PipelineEntry::Compute(pipeline));
        log::debug!("Compiled compute pipeline '{}' as {id:?}", desc.label);
        Ok(id)
    }

    fn create_command_list(&self, label: &str) -> Result<Box<dyn CommandList>, RenderError> {
        Ok(Box::new(WgpuCommandList::new(self.shared.clone(), label)))
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.shared.capabilities
    }
}
