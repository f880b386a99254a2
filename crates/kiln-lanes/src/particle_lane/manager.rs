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

use super::emitter::{BurstTimer, ParticleEmitter};
use super::pool::ParticlePool;
use super::types::{pcg_hash, EmitterConstants, GpuParticle, PerFrameConstants};
use crate::render_lane::SCENE_COLOR_FORMAT;
use kiln_core::gpu::{
    BlendMode, ColorBuffer, CommandContext, ComputePso, ComputePsoDesc, ConstantBuffer,
    DepthBuffer, DepthWrite, GraphicsPsoDesc, PsoMatrix, ReadWriteBuffer, ResourceUsage,
    RootSignature, RootSignatureDesc,
};
use kiln_core::renderer::api::{
    CompareFunction, DescriptorRangeKind, GpuDescriptorHandle, GpuVirtualAddress,
    PrimitiveTopology, RasterizerState, ResourceState, SamplerDesc, ShaderVisibility,
};
use kiln_core::renderer::{GraphicsDevice, RenderError, ResourceError};
use kiln_core::GraphicsCore;
use slotmap::{new_key_type, Key, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Addresses a particle group in a [`ParticleManager`].
    pub struct ParticleGroupKey;
    /// Addresses an emitter within its group.
    pub struct EmitterKey;
}

/// Threads per group of the update stage, matching `particle.wgsl`.
pub const UPDATE_GROUP_SIZE: u32 = 256;

/// Everything needed to create a particle group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleGroupDesc {
    /// Pool capacity, also the instance count of every draw.
    pub max_instances: u32,
    /// Blend mode of the draw.
    pub blend: BlendMode,
    /// Depth write policy of the draw.
    pub depth_write: DepthWrite,
    /// The billboard texture table.
    pub texture: GpuDescriptorHandle,
}

#[derive(Debug)]
struct EmitterSlot {
    emitter: ParticleEmitter,
    timer: BurstTimer,
    constants: ConstantBuffer<EmitterConstants>,
    packed: EmitterConstants,
}

/// One pool of particles sharing a texture and a pipeline.
#[derive(Debug)]
pub struct ParticleGroup {
    desc: ParticleGroupDesc,
    particles: ReadWriteBuffer,
    free_list: ReadWriteBuffer,
    free_list_index: ReadWriteBuffer,
    emitters: SlotMap<EmitterKey, EmitterSlot>,
    cpu_pool: Option<ParticlePool>,
    initialized: bool,
}

impl ParticleGroup {
    /// The creation parameters.
    pub fn desc(&self) -> &ParticleGroupDesc {
        &self.desc
    }

    /// Number of emitters.
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// The CPU pool, present when the device cannot run compute.
    pub fn cpu_pool(&self) -> Option<&ParticlePool> {
        self.cpu_pool.as_ref()
    }

    /// Whether the initialize stage has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[derive(Debug)]
struct ComputeStages {
    root: RootSignature,
    initialize: ComputePso,
    emit: ComputePso,
    update: ComputePso,
}

/// Owns every particle group and runs their simulation and draws.
///
/// Simulation runs on the GPU through three compute stages. When the device
/// reports no compute support each group simulates in a [`ParticlePool`]
/// instead and uploads its slots every update; drawing is identical.
#[derive(Debug)]
pub struct ParticleManager {
    device: Arc<dyn GraphicsDevice>,
    compute: Option<ComputeStages>,
    render_root: RootSignature,
    render_psos: PsoMatrix,
    frame: ConstantBuffer<PerFrameConstants>,
    frame_constants: PerFrameConstants,
    groups: SlotMap<ParticleGroupKey, ParticleGroup>,
}

impl ParticleManager {
    /// Compiles the particle pipelines.
    pub fn new(core: &mut GraphicsCore) -> Result<Self, RenderError> {
        let device = core.device.clone();
        let shader = core.shaders.load(device.as_ref(), "particle.wgsl")?;

        let compute = if device.capabilities().supports_compute {
            let pool_buffer = |desc: RootSignatureDesc, index: usize| {
                desc.init_as_descriptor_range(
                    index,
                    DescriptorRangeKind::ReadWriteBuffer,
                    index as u32,
                    1,
                    ShaderVisibility::All,
                )
            };
            let mut desc = RootSignatureDesc::new("particle compute", 5, 0);
            for index in 0..3 {
                desc = pool_buffer(desc, index);
            }
            let root = desc
                .init_as_constant_buffer(3, 0, ShaderVisibility::All)
                .init_as_constant_buffer(4, 1, ShaderVisibility::All)
                .finalize(device.as_ref())?;
            let stage = |label: &str, entry: &str| {
                ComputePsoDesc::new(label)
                    .set_compute_shader(shader, entry)
                    .finalize(&root, device.as_ref())
            };
            let initialize = stage("particle initialize", "cs_initialize")?;
            let emit = stage("particle emit", "cs_emit")?;
            let update = stage("particle update", "cs_update")?;
            Some(ComputeStages {
                root,
                initialize,
                emit,
                update,
            })
        } else {
            log::warn!("Device has no compute support, particles simulate on the CPU");
            None
        };

        let render_root = RootSignatureDesc::new("particle draw", 3, 1)
            .init_as_descriptor_range(
                0,
                DescriptorRangeKind::StructuredBuffer,
                0,
                1,
                ShaderVisibility::Vertex,
            )
            .init_as_constant_buffer(1, 0, ShaderVisibility::Vertex)
            .init_as_descriptor_range(2, DescriptorRangeKind::Texture, 0, 1, ShaderVisibility::Pixel)
            .init_static_sampler(0, 0, SamplerDesc::LINEAR_WRAP, ShaderVisibility::Pixel)
            .finalize(device.as_ref())?;
        let base = GraphicsPsoDesc::new("particle draw")
            .set_vertex_shader(shader, "vs_main")
            .set_pixel_shader(shader, "fs_main")
            .set_primitive_topology(PrimitiveTopology::TriangleList)
            .set_rasterizer_state(RasterizerState::no_cull())
            .set_render_target_format(SCENE_COLOR_FORMAT, None)
            .set_depth_stencil(DepthBuffer::FORMAT, true, CompareFunction::LessEqual);
        let render_psos = PsoMatrix::build(&base, &render_root, device.as_ref(), "particle")?;

        let frame_constants = PerFrameConstants::default();
        let frame = ConstantBuffer::create(&device, "particle frame", &frame_constants)?;

        Ok(Self {
            device,
            compute,
            render_root,
            render_psos,
            frame,
            frame_constants,
            groups: SlotMap::with_key(),
        })
    }

    /// Whether simulation runs on the GPU.
    pub fn simulates_on_gpu(&self) -> bool {
        self.compute.is_some()
    }

    /// Creates a group. Its initialize stage runs on the next [`update`](Self::update).
    pub fn create_group(
        &mut self,
        core: &mut GraphicsCore,
        desc: ParticleGroupDesc,
    ) -> Result<ParticleGroupKey, ResourceError> {
        let allocator = &mut core.descriptors.cbv_srv_uav;
        let capacity = desc.max_instances.max(1);
        let particles = ReadWriteBuffer::create(
            &self.device,
            allocator,
            "particles",
            std::mem::size_of::<GpuParticle>() as u32,
            capacity,
        )?;
        let free_list =
            ReadWriteBuffer::create(&self.device, allocator, "particle free list", 4, capacity)?;
        let free_list_index =
            ReadWriteBuffer::create(&self.device, allocator, "particle free list index", 4, 1)?;
        let cpu_pool = self.compute.is_none().then(|| ParticlePool::new(capacity));
        let key = self.groups.insert(ParticleGroup {
            desc: ParticleGroupDesc {
                max_instances: capacity,
                ..desc
            },
            particles,
            free_list,
            free_list_index,
            emitters: SlotMap::with_key(),
            cpu_pool,
            initialized: false,
        });
        log::debug!("Created particle group {key:?} with {capacity} slots");
        Ok(key)
    }

    /// Removes a group and its emitters.
    pub fn remove_group(&mut self, key: ParticleGroupKey) -> bool {
        self.groups.remove(key).is_some()
    }

    /// A group by key.
    pub fn group(&self, key: ParticleGroupKey) -> Option<&ParticleGroup> {
        self.groups.get(key)
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Adds an emitter to a group. Returns `None` when the group is gone.
    pub fn add_emitter(
        &mut self,
        group: ParticleGroupKey,
        emitter: ParticleEmitter,
    ) -> Result<Option<EmitterKey>, ResourceError> {
        let Some(group) = self.groups.get_mut(group) else {
            return Ok(None);
        };
        let packed = emitter.constants(false, 0);
        let constants = ConstantBuffer::create(&self.device, "particle emitter", &packed)?;
        Ok(Some(group.emitters.insert(EmitterSlot {
            emitter,
            timer: BurstTimer::default(),
            constants,
            packed,
        })))
    }

    /// Removes an emitter, returning its description.
    pub fn remove_emitter(
        &mut self,
        group: ParticleGroupKey,
        emitter: EmitterKey,
    ) -> Option<ParticleEmitter> {
        self.groups
            .get_mut(group)?
            .emitters
            .remove(emitter)
            .map(|slot| slot.emitter)
    }

    /// Mutable access to an emitter, e.g. to move it.
    pub fn emitter_mut(
        &mut self,
        group: ParticleGroupKey,
        emitter: EmitterKey,
    ) -> Option<&mut ParticleEmitter> {
        self.groups
            .get_mut(group)?
            .emitters
            .get_mut(emitter)
            .map(|slot| &mut slot.emitter)
    }

    /// Advances every group by `delta_time` seconds.
    pub fn update(&mut self, ctx: &mut CommandContext, delta_time: f32) -> Result<(), RenderError> {
        self.frame_constants.time += delta_time;
        self.frame_constants.delta_time = delta_time;
        self.frame_constants.frame = self.frame_constants.frame.wrapping_add(1);
        self.frame.update(&self.frame_constants)?;

        let frame_index = self.frame_constants.frame;
        for group in self.groups.values_mut() {
            for (key, slot) in &mut group.emitters {
                let fired = slot.timer.tick(&slot.emitter, delta_time);
                let seed = pcg_hash(frame_index ^ pcg_hash(key.data().as_ffi() as u32));
                slot.packed = slot.emitter.constants(fired, seed);
                slot.constants.update(&slot.packed)?;
            }
        }

        match &self.compute {
            Some(stages) => {
                let frame = self.frame.gpu_virtual_address();
                for group in self.groups.values_mut() {
                    Self::simulate_on_gpu(ctx, stages, frame, group)?;
                }
            }
            None => {
                for group in self.groups.values_mut() {
                    Self::simulate_on_cpu(group, delta_time)?;
                }
            }
        }
        Ok(())
    }

    fn simulate_on_gpu(
        ctx: &mut CommandContext,
        stages: &ComputeStages,
        frame: GpuVirtualAddress,
        group: &mut ParticleGroup,
    ) -> Result<(), RenderError> {
        let particles = group.particles.uav_table()?;
        let free_list = group.free_list.uav_table()?;
        let free_list_index = group.free_list_index.uav_table()?;
        let capacity = group.desc.max_instances;

        ctx.transition_for_pass(&[
            ResourceUsage::new(&group.particles, ResourceState::UnorderedAccess),
            ResourceUsage::new(&group.free_list, ResourceState::UnorderedAccess),
            ResourceUsage::new(&group.free_list_index, ResourceState::UnorderedAccess),
        ]);
        let mut compute = ctx.compute();
        compute.set_root_signature(&stages.root);
        compute.set_descriptor_table(0, particles);
        compute.set_descriptor_table(1, free_list);
        compute.set_descriptor_table(2, free_list_index);
        compute.set_constant_buffer(3, frame);
        compute.set_constant_buffer(4, frame);

        if !group.initialized {
            compute.set_pipeline_state(&stages.initialize);
            compute.dispatch_1d(capacity, UPDATE_GROUP_SIZE);
            group.initialized = true;
            insert_pool_barriers(&mut compute, group);
        }

        let firing = group.emitters.values().filter(|slot| slot.packed.emit != 0);
        for slot in firing {
            compute.set_pipeline_state(&stages.emit);
            compute.set_constant_buffer(3, slot.constants.gpu_virtual_address());
            compute.dispatch(1, 1, 1);
            insert_pool_barriers(&mut compute, group);
        }

        compute.set_pipeline_state(&stages.update);
        compute.dispatch_1d(capacity, UPDATE_GROUP_SIZE);
        insert_pool_barriers(&mut compute, group);
        Ok(())
    }

    fn simulate_on_cpu(group: &mut ParticleGroup, delta_time: f32) -> Result<(), ResourceError> {
        let Some(pool) = group.cpu_pool.as_mut() else {
            return Ok(());
        };
        group.initialized = true;
        for slot in group.emitters.values() {
            pool.emit(&slot.packed);
        }
        pool.update(delta_time);
        group
            .particles
            .write(0, bytemuck::cast_slice(pool.particles()))
    }

    /// Draws every group into the scene targets.
    ///
    /// Each group draws `max_instances` instances; dead slots collapse to
    /// zero-area quads in the vertex shader.
    pub fn draw(
        &self,
        ctx: &mut CommandContext,
        camera: GpuVirtualAddress,
        color: &ColorBuffer,
        depth: &DepthBuffer,
    ) -> Result<(), RenderError> {
        if self.groups.is_empty() {
            return Ok(());
        }
        let mut usages = vec![
            ResourceUsage::new(color, ResourceState::RenderTarget),
            ResourceUsage::new(depth, ResourceState::DepthWrite),
        ];
        usages.extend(
            self.groups
                .values()
                .map(|g| ResourceUsage::new(&g.particles, ResourceState::NonPixelShaderResource)),
        );
        ctx.transition_for_pass(&usages);

        let (width, height) = color.size();
        let mut gfx = ctx.graphics();
        gfx.set_render_targets(&[color.rtv()], Some(depth.dsv()));
        gfx.set_viewport_and_scissor(width, height);
        gfx.set_root_signature(&self.render_root);
        gfx.set_primitive_topology(PrimitiveTopology::TriangleList);
        gfx.set_constant_buffer(1, camera);
        for group in self.groups.values() {
            let pso = self
                .render_psos
                .get(group.desc.blend, group.desc.depth_write);
            gfx.set_pipeline_state(pso);
            gfx.set_descriptor_table(0, group.particles.srv_table()?);
            gfx.set_descriptor_table(2, group.desc.texture);
            gfx.draw_instanced(6, group.desc.max_instances, 0, 0);
        }
        Ok(())
    }
}

fn insert_pool_barriers(ctx: &mut CommandContext, group: &ParticleGroup) {
    ctx.insert_uav_barrier(&group.particles);
    ctx.insert_uav_barrier(&group.free_list);
    ctx.insert_uav_barrier(&group.free_list_index);
}
