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

use super::constants::{DirectionalLight, LightConstants};
use super::pipelines::{object_slots, RenderPipelines, SCENE_COLOR_FORMAT};
use super::records::{Bone, DrawPass, ShadowObject, SkinningObject, SortObject};
use kiln_core::gpu::{
    ColorBuffer, CommandContext, ConstantBuffer, DepthBuffer, FrameStats, ResourceUsage,
};
use kiln_core::math::LinearRgba;
use kiln_core::renderer::api::{
    GpuDescriptorHandle, GpuVirtualAddress, IndexBufferView, PrimitiveTopology, ResourceState,
    VertexBufferView,
};
use kiln_core::renderer::{RenderError, ResourceError};
use kiln_core::GraphicsCore;

/// Construction parameters of the [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    /// Size of the scene targets in pixels.
    pub size: (u32, u32),
    /// Edge length of the square shadow map.
    pub shadow_map_size: u32,
    /// The color the scene is cleared to.
    pub clear_color: LinearRgba,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            size: (1280, 720),
            shadow_map_size: 2048,
            clear_color: LinearRgba::rgb(0.1, 0.25, 0.5),
        }
    }
}

/// Collects a frame's drawables and replays them in a fixed pass order.
///
/// Nothing is retained across frames: [`render`](Self::render) empties every
/// queue, so an object that is not submitted again is not drawn again. That
/// is how callers express "not drawn this frame", e.g. after culling.
#[derive(Debug)]
pub struct Renderer {
    pipelines: RenderPipelines,
    scene_color: ColorBuffer,
    scene_depth: DepthBuffer,
    shadow_map: DepthBuffer,
    light: ConstantBuffer<LightConstants>,
    shadow_map_size: u32,
    sort_objects: Vec<SortObject>,
    skinning_objects: Vec<SkinningObject>,
    shadow_objects: Vec<ShadowObject>,
    bones: Vec<Bone>,
    last_stats: FrameStats,
}

impl Renderer {
    /// Creates the scene targets, the shadow map and every pipeline.
    pub fn new(core: &mut GraphicsCore, settings: RendererSettings) -> Result<Self, RenderError> {
        let pipelines = RenderPipelines::new(core)?;
        let device = core.device.clone();
        let scene_color = ColorBuffer::create(
            &device,
            &mut core.descriptors.rtv,
            &mut core.descriptors.cbv_srv_uav,
            "scene color",
            settings.size,
            SCENE_COLOR_FORMAT,
            settings.clear_color,
        )?;
        let scene_depth = DepthBuffer::create(
            &device,
            &mut core.descriptors.dsv,
            Some(&mut core.descriptors.cbv_srv_uav),
            "scene depth",
            settings.size,
        )?;
        let shadow_map = DepthBuffer::create(
            &device,
            &mut core.descriptors.dsv,
            Some(&mut core.descriptors.cbv_srv_uav),
            "shadow map",
            (settings.shadow_map_size, settings.shadow_map_size),
        )?;
        let light = ConstantBuffer::create(
            &device,
            "directional light",
            &DirectionalLight::default().constants(settings.shadow_map_size),
        )?;
        log::info!(
            "Renderer ready: scene {}x{}, shadow map {}",
            settings.size.0,
            settings.size.1,
            settings.shadow_map_size
        );
        Ok(Self {
            pipelines,
            scene_color,
            scene_depth,
            shadow_map,
            light,
            shadow_map_size: settings.shadow_map_size,
            sort_objects: Vec::new(),
            skinning_objects: Vec::new(),
            shadow_objects: Vec::new(),
            bones: Vec::new(),
            last_stats: FrameStats::default(),
        })
    }

    /// Queues a mesh for the geometry pass of this frame.
    #[allow(clippy::too_many_arguments)]
    pub fn add_object(
        &mut self,
        vertex_buffer: VertexBufferView,
        index_buffer: IndexBufferView,
        material: GpuVirtualAddress,
        world_transform: GpuVirtualAddress,
        camera: GpuVirtualAddress,
        texture: GpuDescriptorHandle,
        mask_texture: GpuDescriptorHandle,
        index_count: u32,
        draw_pass: DrawPass,
    ) {
        self.submit(SortObject {
            vertex_buffer,
            index_buffer,
            material,
            world_transform,
            camera,
            texture,
            mask_texture,
            index_count,
            draw_pass,
        });
    }

    /// Queues a prepared [`SortObject`].
    pub fn submit(&mut self, object: SortObject) {
        self.sort_objects.push(object);
    }

    /// Queues a skinning dispatch for this frame.
    pub fn add_skinning_object(&mut self, object: SkinningObject) {
        self.skinning_objects.push(object);
    }

    /// Queues a shadow caster for this frame.
    pub fn add_shadow_object(&mut self, object: ShadowObject) {
        self.shadow_objects.push(object);
    }

    /// Queues debug bone lines for this frame.
    pub fn add_bone(&mut self, bone: Bone) {
        self.bones.push(bone);
    }

    /// Updates the directional light.
    pub fn set_light(&mut self, light: &DirectionalLight) -> Result<(), ResourceError> {
        self.light.update(&light.constants(self.shadow_map_size))
    }

    /// Records the frame: skinning, shadow, geometry, bones. Empties every queue.
    ///
    /// The queues are emptied whether or not recording succeeds.
    pub fn render(&mut self, ctx: &mut CommandContext) -> Result<FrameStats, RenderError> {
        let before = ctx.stats();
        let recorded = self.record_passes(ctx);

        self.sort_objects.clear();
        self.skinning_objects.clear();
        self.shadow_objects.clear();
        self.bones.clear();

        recorded?;
        self.last_stats = ctx.stats().since(before);
        log::trace!("Renderer frame: {:?}", self.last_stats);
        Ok(self.last_stats)
    }

    fn record_passes(&mut self, ctx: &mut CommandContext) -> Result<(), RenderError> {
        self.validate()?;
        self.sort_objects.sort_by_key(|o| o.draw_pass);

        self.skinning_pass(ctx)?;
        self.shadow_pass(ctx);
        self.geometry_pass(ctx)?;
        self.bone_pass(ctx);
        Ok(())
    }

    /// Rejects draws that would read past their index buffer.
    fn validate(&self) -> Result<(), RenderError> {
        let draws = self
            .sort_objects
            .iter()
            .map(|o| (&o.index_buffer, o.index_count))
            .chain(
                self.shadow_objects
                    .iter()
                    .map(|o| (&o.index_buffer, o.index_count)),
            );
        for (view, index_count) in draws {
            let needed = index_count as u64 * view.format.size() as u64;
            if needed > view.size_in_bytes as u64 {
                return Err(RenderError::Submission(format!(
                    "Draw of {index_count} indices reads {needed} bytes from a {}-byte index buffer",
                    view.size_in_bytes
                )));
            }
        }
        Ok(())
    }

    fn skinning_pass(&mut self, ctx: &mut CommandContext) -> Result<(), RenderError> {
        if self.skinning_objects.is_empty() {
            return Ok(());
        }
        let Some(skinning) = &self.pipelines.skinning else {
            log::warn!(
                "Dropping {} skinning dispatches: compute is unavailable",
                self.skinning_objects.len()
            );
            return Ok(());
        };
        let mut compute = ctx.compute();
        compute.set_root_signature(&skinning.root);
        compute.set_pipeline_state(&skinning.pso);
        for object in &self.skinning_objects {
            compute.transition_resource(&object.output_resource, ResourceState::UnorderedAccess);
            compute.set_descriptor_table(0, object.palette);
            compute.set_descriptor_table(1, object.input_vertices);
            compute.set_descriptor_table(2, object.influences);
            compute.set_descriptor_table(3, object.output_vertices);
            compute.set_constant_buffer(4, object.skinning_information);
            compute.dispatch_1d(object.vertex_count, 64);
        }
        for object in &self.skinning_objects {
            compute.transition_resource(
                &object.output_resource,
                ResourceState::VertexAndConstantBuffer,
            );
        }
        compute.flush_resource_barriers();
        Ok(())
    }

    fn shadow_pass(&mut self, ctx: &mut CommandContext) {
        let mut gfx = ctx.graphics();
        gfx.clear_depth(&self.shadow_map);
        if self.shadow_objects.is_empty() {
            return;
        }
        let (width, height) = self.shadow_map.size();
        gfx.set_render_targets(&[], Some(self.shadow_map.dsv()));
        gfx.set_viewport_and_scissor(width, height);
        gfx.set_root_signature(&self.pipelines.shadow_root);
        gfx.set_pipeline_state(&self.pipelines.shadow);
        gfx.set_primitive_topology(PrimitiveTopology::TriangleList);
        gfx.set_constant_buffer(1, self.light.gpu_virtual_address());
        for object in &self.shadow_objects {
            gfx.set_vertex_buffer(0, object.vertex_buffer);
            gfx.set_index_buffer(&object.index_buffer);
            gfx.set_constant_buffer(0, object.world_transform);
            gfx.draw_indexed(object.index_count);
        }
    }

    fn geometry_pass(&mut self, ctx: &mut CommandContext) -> Result<(), RenderError> {
        ctx.transition_for_pass(&[
            ResourceUsage::new(&self.shadow_map, ResourceState::PixelShaderResource),
            ResourceUsage::new(&self.scene_color, ResourceState::RenderTarget),
            ResourceUsage::new(&self.scene_depth, ResourceState::DepthWrite),
        ]);
        let shadow_table = self.shadow_map.srv_table()?;
        let mut gfx = ctx.graphics();
        gfx.clear_color(&self.scene_color);
        gfx.clear_depth(&self.scene_depth);
        let (width, height) = self.scene_color.size();
        gfx.set_render_targets(&[self.scene_color.rtv()], Some(self.scene_depth.dsv()));
        gfx.set_viewport_and_scissor(width, height);
        if self.sort_objects.is_empty() {
            return Ok(());
        }
        gfx.set_root_signature(&self.pipelines.object_root);
        gfx.set_primitive_topology(PrimitiveTopology::TriangleList);
        gfx.set_descriptor_table(object_slots::SHADOW_MAP, shadow_table);
        gfx.set_constant_buffer(object_slots::LIGHT, self.light.gpu_virtual_address());

        let mut current_pass = None;
        for object in &self.sort_objects {
            if current_pass != Some(object.draw_pass) {
                gfx.set_pipeline_state(self.pipelines.object_pso(object.draw_pass));
                current_pass = Some(object.draw_pass);
            }
            gfx.set_vertex_buffer(0, object.vertex_buffer);
            gfx.set_index_buffer(&object.index_buffer);
            gfx.set_constant_buffer(object_slots::MATERIAL, object.material);
            gfx.set_constant_buffer(object_slots::WORLD, object.world_transform);
            gfx.set_constant_buffer(object_slots::CAMERA, object.camera);
            gfx.set_descriptor_table(object_slots::TEXTURE, object.texture);
            gfx.set_descriptor_table(object_slots::MASK, object.mask_texture);
            gfx.draw_indexed(object.index_count);
        }
        Ok(())
    }

    fn bone_pass(&mut self, ctx: &mut CommandContext) {
        if self.bones.is_empty() {
            return;
        }
        let mut gfx = ctx.graphics();
        gfx.set_render_targets(&[self.scene_color.rtv()], None);
        gfx.set_root_signature(&self.pipelines.bone_root);
        gfx.set_pipeline_state(&self.pipelines.bone);
        gfx.set_primitive_topology(PrimitiveTopology::LineList);
        for bone in &self.bones {
            gfx.set_vertex_buffer(0, bone.vertex_buffer);
            gfx.set_constant_buffer(0, bone.world_transform);
            gfx.set_constant_buffer(1, bone.camera);
            gfx.draw(bone.vertex_count);
        }
    }

    /// Recreates the scene targets at a new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.scene_color.resize(width, height)?;
        self.scene_depth.resize(width, height)
    }

    /// The scene color target, input of the post-process chain.
    pub fn scene_color(&self) -> &ColorBuffer {
        &self.scene_color
    }

    /// The scene depth target.
    pub fn scene_depth(&self) -> &DepthBuffer {
        &self.scene_depth
    }

    /// The shadow map.
    pub fn shadow_map(&self) -> &DepthBuffer {
        &self.shadow_map
    }

    /// Counters of the last [`render`](Self::render).
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Number of queued geometry objects.
    pub fn sort_object_count(&self) -> usize {
        self.sort_objects.len()
    }

    /// Number of queued skinning dispatches.
    pub fn skinning_object_count(&self) -> usize {
        self.skinning_objects.len()
    }

    /// Number of queued shadow casters.
    pub fn shadow_object_count(&self) -> usize {
        self.shadow_objects.len()
    }

    /// Number of queued bone overlays.
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Whether all four queues are empty.
    pub fn is_empty(&self) -> bool {
        self.sort_objects.is_empty()
            && self.skinning_objects.is_empty()
            && self.shadow_objects.is_empty()
            && self.bones.is_empty()
    }
}
