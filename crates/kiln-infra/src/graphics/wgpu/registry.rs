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

//! The objects behind the opaque ids handed out by [`super::WgpuDevice`].

use kiln_core::renderer::api::{
    ConstantBufferViewDesc, CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapId,
    DescriptorRangeKind, DeviceCapabilities, GpuVirtualAddress, PipelineId, ResourceId,
    RootParameter, RootSignatureId, RootSignatureLayout, ShaderModuleId, ShaderResourceViewDesc,
    UnorderedAccessViewDesc,
};
use kiln_core::renderer::{RenderError, ResourceError};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use std::sync::{Mutex, MutexGuard};

/// The largest range bound to a root constant buffer.
const MAX_UNIFORM_BINDING: u64 = 64 * 1024;

/// Device, queue and object registry shared by the device, its command lists,
/// the queue and the swap chain.
#[derive(Debug)]
pub(crate) struct WgpuShared {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub capabilities: DeviceCapabilities,
    registry: Mutex<Registry>,
}

impl WgpuShared {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, capabilities: DeviceCapabilities) -> Self {
        Self {
            device,
            queue,
            capabilities,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Locks the registry.
    pub fn registry(&self) -> Result<MutexGuard<'_, Registry>, ResourceError> {
        self.registry
            .lock()
            .map_err(|_| ResourceError::BackendError("Object registry lock poisoned".to_string()))
    }
}

/// A committed resource.
#[derive(Debug)]
pub(crate) enum ResourceEntry {
    Buffer(wgpu::Buffer),
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    /// A swap chain image. The view is only present between acquire and present.
    BackBuffer {
        view: Option<wgpu::TextureView>,
        size: (u32, u32),
    },
}

/// What a descriptor slot holds.
#[derive(Debug)]
pub(crate) enum Descriptor {
    ShaderResource {
        resource: ResourceId,
        desc: ShaderResourceViewDesc,
    },
    UnorderedAccess {
        resource: ResourceId,
        desc: UnorderedAccessViewDesc,
    },
    ConstantBuffer(ConstantBufferViewDesc),
    RenderTarget(ResourceId),
    DepthStencil(ResourceId),
    Sampler(wgpu::Sampler),
}

impl Descriptor {
    fn name(&self) -> &'static str {
        match self {
            Descriptor::ShaderResource { .. } => "a shader resource view",
            Descriptor::UnorderedAccess { .. } => "an unordered access view",
            Descriptor::ConstantBuffer(_) => "a constant buffer view",
            Descriptor::RenderTarget(_) => "a render target view",
            Descriptor::DepthStencil(_) => "a depth stencil view",
            Descriptor::Sampler(_) => "a sampler",
        }
    }
}

#[derive(Debug)]
pub(crate) struct DescriptorHeap {
    pub desc: DescriptorHeapDesc,
    pub slots: Vec<Option<Descriptor>>,
}

#[derive(Debug)]
pub(crate) struct RootSignatureEntry {
    pub layout: RootSignatureLayout,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub sampler_group: Option<wgpu::BindGroup>,
}

#[derive(Debug)]
pub(crate) enum PipelineEntry {
    Graphics(wgpu::RenderPipeline),
    Compute(wgpu::ComputePipeline),
}

/// The value bound to one root parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RootArgument {
    ConstantBuffer(GpuVirtualAddress),
    Table(kiln_core::renderer::api::GpuDescriptorHandle),
}

type BindGroupKey = (RootSignatureId, u32, RootArgument);

/// A resource resolved for a bind group entry.
enum Binding {
    Buffer {
        buffer: wgpu::Buffer,
        offset: u64,
        size: Option<NonZeroU64>,
    },
    View(wgpu::TextureView),
}

impl Binding {
    fn resource(&self) -> wgpu::BindingResource<'_> {
        match self {
            Binding::Buffer {
                buffer,
                offset,
                size,
            } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: *offset,
                size: *size,
            }),
            Binding::View(view) => wgpu::BindingResource::TextureView(view),
        }
    }
}

/// Every live object of the device.
///
/// Bind groups are built lazily from (root signature, parameter, argument)
/// and cached until a descriptor is rewritten or a resource released.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    next_id: u32,
    pub resources: HashMap<ResourceId, ResourceEntry>,
    pub heaps: HashMap<DescriptorHeapId, DescriptorHeap>,
    pub root_signatures: HashMap<RootSignatureId, RootSignatureEntry>,
    pub pipelines: HashMap<PipelineId, PipelineEntry>,
    pub shader_modules: HashMap<ShaderModuleId, wgpu::ShaderModule>,
    bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
}

impl Registry {
    /// A fresh id, unique across every object kind.
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert_resource(&mut self, entry: ResourceEntry) -> ResourceId {
        let id = ResourceId(self.next_id());
        self.resources.insert(id, entry);
        id
    }

    pub fn remove_resource(&mut self, id: ResourceId) -> Option<ResourceEntry> {
        let entry = self.resources.remove(&id);
        if entry.is_some() {
            self.bind_groups.clear();
        }
        entry
    }

    pub fn buffer(&self, id: ResourceId) -> Result<&wgpu::Buffer, ResourceError> {
        match self.resources.get(&id) {
            Some(ResourceEntry::Buffer(buffer)) => Ok(buffer),
            Some(_) => Err(ResourceError::InvalidView(format!("{id:?} is not a buffer"))),
            None => Err(ResourceError::NotFound(id)),
        }
    }

    /// The default view of a texture or of an acquired back buffer, with its size.
    pub fn texture_view(
        &self,
        id: ResourceId,
    ) -> Result<(wgpu::TextureView, (u32, u32)), ResourceError> {
        match self.resources.get(&id) {
            Some(ResourceEntry::Texture { texture, view }) => {
                Ok((view.clone(), (texture.width(), texture.height())))
            }
            Some(ResourceEntry::BackBuffer {
                view: Some(view),
                size,
            }) => Ok((view.clone(), *size)),
            Some(ResourceEntry::BackBuffer { view: None, .. }) => Err(
                ResourceError::BackendError(format!("Back buffer {id:?} used before acquire")),
            ),
            Some(ResourceEntry::Buffer(_)) => {
                Err(ResourceError::InvalidView(format!("{id:?} is not a texture")))
            }
            None => Err(ResourceError::NotFound(id)),
        }
    }

    /// Stores `descriptor` in the slot named by `dest`.
    pub fn write_descriptor(
        &mut self,
        dest: CpuDescriptorHandle,
        descriptor: Descriptor,
    ) -> Result<(), ResourceError> {
        let heap = self.heaps.get_mut(&dest.heap).ok_or_else(|| {
            ResourceError::InvalidView(format!("Descriptor heap {:?} does not exist", dest.heap))
        })?;
        let capacity = heap.desc.capacity;
        let slot = heap.slots.get_mut(dest.index as usize).ok_or_else(|| {
            ResourceError::InvalidView(format!(
                "Slot {} is outside heap {:?} of {} descriptors",
                dest.index, dest.heap, capacity
            ))
        })?;
        *slot = Some(descriptor);
        self.bind_groups.clear();
        Ok(())
    }

    fn descriptor(&self, heap: DescriptorHeapId, index: u32) -> Result<&Descriptor, ResourceError> {
        self.heaps
            .get(&heap)
            .and_then(|h| h.slots.get(index as usize))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                ResourceError::InvalidView(format!("Slot {index} of heap {heap:?} is empty"))
            })
    }

    /// The view written by `create_render_target_view` into `handle`.
    pub fn render_target_view(
        &self,
        handle: CpuDescriptorHandle,
    ) -> Result<(wgpu::TextureView, (u32, u32)), ResourceError> {
        match self.descriptor(handle.heap, handle.index)? {
            Descriptor::RenderTarget(resource) => self.texture_view(*resource),
            other => Err(ResourceError::InvalidView(format!(
                "Render target slot {} holds {}",
                handle.index,
                other.name()
            ))),
        }
    }

    /// The view written by `create_depth_stencil_view` into `handle`.
    pub fn depth_stencil_view(
        &self,
        handle: CpuDescriptorHandle,
    ) -> Result<(wgpu::TextureView, (u32, u32)), ResourceError> {
        match self.descriptor(handle.heap, handle.index)? {
            Descriptor::DepthStencil(resource) => self.texture_view(*resource),
            other => Err(ResourceError::InvalidView(format!(
                "Depth stencil slot {} holds {}",
                handle.index,
                other.name()
            ))),
        }
    }

    /// The bind groups of every root parameter followed by the static sampler group.
    ///
    /// ## Errors
    /// * `RenderError::Submission` - If a parameter has no argument bound.
    pub fn root_bind_groups(
        &mut self,
        device: &wgpu::Device,
        root_signature: RootSignatureId,
        arguments: &BTreeMap<u32, RootArgument>,
    ) -> Result<Vec<wgpu::BindGroup>, RenderError> {
        let entry = self
            .root_signatures
            .get(&root_signature)
            .ok_or_else(|| RenderError::Submission(format!("Unknown {root_signature:?}")))?;
        let parameter_count = entry.layout.parameters.len() as u32;
        let sampler_group = entry.sampler_group.clone();

        let mut groups = Vec::with_capacity(parameter_count as usize + 1);
        for index in 0..parameter_count {
            let argument = *arguments.get(&index).ok_or_else(|| {
                RenderError::Submission(format!(
                    "Root parameter {index} of {root_signature:?} is unbound"
                ))
            })?;
            let key = (root_signature, index, argument);
            let group = match self.bind_groups.get(&key) {
                Some(group) => group.clone(),
                None => {
                    let group = self.create_bind_group(device, root_signature, index, argument)?;
                    self.bind_groups.insert(key, group.clone());
                    group
                }
            };
            groups.push(group);
        }
        groups.extend(sampler_group);
        Ok(groups)
    }

    fn create_bind_group(
        &self,
        device: &wgpu::Device,
        root_signature: RootSignatureId,
        index: u32,
        argument: RootArgument,
    ) -> Result<wgpu::BindGroup, RenderError> {
        let entry = self
            .root_signatures
            .get(&root_signature)
            .ok_or_else(|| RenderError::Submission(format!("Unknown {root_signature:?}")))?;
        let i = index as usize;
        let bindings = match (entry.layout.parameters[i], argument) {
            (RootParameter::ConstantBuffer { .. }, RootArgument::ConstantBuffer(address)) => {
                vec![self.constant_buffer_binding(address, None)?]
            }
            (RootParameter::DescriptorTable { range, .. }, RootArgument::Table(table)) => {
                let mut bindings = Vec::with_capacity(range.count as usize);
                for offset in 0..range.count {
                    bindings.push(self.table_binding(range.kind, table.heap, table.index + offset)?);
                }
                bindings
            }
            _ => {
                return Err(RenderError::Submission(format!(
                    "Root parameter {index} of '{}' bound with the wrong kind of argument",
                    entry.layout.label
                )))
            }
        };
        let entries: Vec<_> = bindings
            .iter()
            .enumerate()
            .map(|(binding, b)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: b.resource(),
            })
            .collect();
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&entry.layout.label),
            layout: &entry.bind_group_layouts[i],
            entries: &entries,
        }))
    }

    fn constant_buffer_binding(
        &self,
        address: GpuVirtualAddress,
        size: Option<u32>,
    ) -> Result<Binding, ResourceError> {
        let buffer = self.buffer(address.resource())?;
        let offset = address.offset() as u64;
        let size = match size {
            Some(size) => size as u64,
            None => buffer.size().saturating_sub(offset).min(MAX_UNIFORM_BINDING),
        };
        Ok(Binding::Buffer {
            buffer: buffer.clone(),
            offset,
            size: NonZeroU64::new(size),
        })
    }

    fn element_binding(
        &self,
        resource: ResourceId,
        first_element: u64,
        num_elements: u32,
        stride: u32,
    ) -> Result<Binding, ResourceError> {
        Ok(Binding::Buffer {
            buffer: self.buffer(resource)?.clone(),
            offset: first_element * stride as u64,
            size: NonZeroU64::new(num_elements as u64 * stride as u64),
        })
    }

    fn table_binding(
        &self,
        kind: DescriptorRangeKind,
        heap: DescriptorHeapId,
        index: u32,
    ) -> Result<Binding, ResourceError> {
        let descriptor = self.descriptor(heap, index)?;
        match (kind, descriptor) {
            (
                DescriptorRangeKind::Texture | DescriptorRangeKind::DepthTexture,
                Descriptor::ShaderResource {
                    resource,
                    desc: ShaderResourceViewDesc::Texture2D { .. },
                },
            ) => Ok(Binding::View(self.texture_view(*resource)?.0)),
            (
                DescriptorRangeKind::StructuredBuffer,
                Descriptor::ShaderResource {
                    resource,
                    desc:
                        ShaderResourceViewDesc::StructuredBuffer {
                            first_element,
                            num_elements,
                            stride,
                        },
                },
            ) => self.element_binding(*resource, *first_element, *num_elements, *stride),
            (DescriptorRangeKind::ReadWriteBuffer, Descriptor::UnorderedAccess { resource, desc }) => {
                self.element_binding(*resource, desc.first_element, desc.num_elements, desc.stride)
            }
            (DescriptorRangeKind::ConstantBuffer, Descriptor::ConstantBuffer(view)) => {
                self.constant_buffer_binding(view.location, Some(view.size_in_bytes))
            }
            (kind, other) => Err(ResourceError::InvalidView(format!(
                "Slot {index} of heap {heap:?} holds {} where a {kind:?} table expects another view",
                other.name()
            ))),
        }
    }
}
