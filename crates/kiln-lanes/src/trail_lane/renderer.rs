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

use super::trail::{Trail, TrailSettings, TrailVertex};
use crate::render_lane::SCENE_COLOR_FORMAT;
use kiln_core::gpu::{
    BlendMode, ColorBuffer, CommandContext, DepthBuffer, DepthWrite, GraphicsPsoDesc, PsoMatrix,
    ResourceUsage, RootSignature, RootSignatureDesc,
};
use kiln_core::math::Vec3;
use kiln_core::renderer::api::{
    CompareFunction, DescriptorRangeKind, GpuDescriptorHandle, GpuVirtualAddress, InputLayout,
    PrimitiveTopology, RasterizerState, ResourceState, SamplerDesc, ShaderVisibility,
    VertexFormat,
};
use kiln_core::renderer::{GraphicsDevice, RenderError, ResourceError};
use kiln_core::GraphicsCore;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Addresses a trail in a [`TrailRenderer`].
    pub struct TrailKey;
}

#[derive(Debug)]
struct TrailEntry {
    trail: Trail,
    blend: BlendMode,
    texture: GpuDescriptorHandle,
}

/// Owns every trail and draws them after the geometry pass.
#[derive(Debug)]
pub struct TrailRenderer {
    device: Arc<dyn GraphicsDevice>,
    root: RootSignature,
    psos: PsoMatrix,
    trails: SlotMap<TrailKey, TrailEntry>,
}

impl TrailRenderer {
    /// Compiles the trail pipelines.
    pub fn new(core: &mut GraphicsCore) -> Result<Self, RenderError> {
        let device = core.device.clone();
        let shader = core.shaders.load(device.as_ref(), "trail.wgsl")?;
        let root = RootSignatureDesc::new("trail", 2, 1)
            .init_as_constant_buffer(0, 0, ShaderVisibility::Vertex)
            .init_as_descriptor_range(1, DescriptorRangeKind::Texture, 0, 1, ShaderVisibility::Pixel)
            .init_static_sampler(0, 0, SamplerDesc::LINEAR_CLAMP, ShaderVisibility::Pixel)
            .finalize(device.as_ref())?;
        let base = GraphicsPsoDesc::new("trail")
            .set_vertex_shader(shader, "vs_main")
            .set_pixel_shader(shader, "fs_main")
            .set_input_layout(
                InputLayout::empty()
                    .with_slot(TrailVertex::STRIDE)
                    .with_element("POSITION", VertexFormat::Float32x4, 0, 0)
                    .with_element("COLOR", VertexFormat::Float32x4, 0, 16)
                    .with_element("TEXCOORD", VertexFormat::Float32x2, 0, 32),
            )
            .set_primitive_topology(PrimitiveTopology::TriangleStrip)
            .set_rasterizer_state(RasterizerState::no_cull())
            .set_render_target_format(SCENE_COLOR_FORMAT, None)
            .set_depth_stencil(DepthBuffer::FORMAT, false, CompareFunction::LessEqual);
        let psos = PsoMatrix::build(&base, &root, device.as_ref(), "trail")?;
        Ok(Self {
            device,
            root,
            psos,
            trails: SlotMap::with_key(),
        })
    }

    /// Creates an empty trail.
    pub fn create_trail(
        &mut self,
        settings: TrailSettings,
        blend: BlendMode,
        texture: GpuDescriptorHandle,
    ) -> Result<TrailKey, ResourceError> {
        let trail = Trail::new(&self.device, settings)?;
        Ok(self.trails.insert(TrailEntry {
            trail,
            blend,
            texture,
        }))
    }

    /// Removes a trail.
    pub fn remove_trail(&mut self, key: TrailKey) -> bool {
        self.trails.remove(key).is_some()
    }

    /// A trail by key.
    pub fn trail(&self, key: TrailKey) -> Option<&Trail> {
        self.trails.get(key).map(|e| &e.trail)
    }

    /// Feeds a trail its current ends. Returns `false` when the trail is gone.
    pub fn update_trail(
        &mut self,
        key: TrailKey,
        delta_time: f32,
        head: Vec3,
        front: Vec3,
    ) -> Result<bool, ResourceError> {
        match self.trails.get_mut(key) {
            Some(entry) => {
                entry.trail.update(delta_time, head, front)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of trails.
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    /// Whether there are no trails.
    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Draws every trail with at least one segment.
    pub fn draw(
        &self,
        ctx: &mut CommandContext,
        camera: GpuVirtualAddress,
        color: &ColorBuffer,
        depth: &DepthBuffer,
    ) {
        let mut drawable = self
            .trails
            .values()
            .filter(|e| e.trail.vertex_count() >= 4)
            .peekable();
        if drawable.peek().is_none() {
            return;
        }
        ctx.transition_for_pass(&[
            ResourceUsage::new(color, ResourceState::RenderTarget),
            ResourceUsage::new(depth, ResourceState::DepthWrite),
        ]);
        let (width, height) = color.size();
        let mut gfx = ctx.graphics();
        gfx.set_render_targets(&[color.rtv()], Some(depth.dsv()));
        gfx.set_viewport_and_scissor(width, height);
        gfx.set_root_signature(&self.root);
        gfx.set_primitive_topology(PrimitiveTopology::TriangleStrip);
        gfx.set_constant_buffer(0, camera);
        for entry in drawable {
            gfx.set_pipeline_state(self.psos.get(entry.blend, DepthWrite::Disabled));
            gfx.set_vertex_buffer(0, entry.trail.vertex_buffer_view());
            gfx.set_descriptor_table(1, entry.texture);
            gfx.draw(entry.trail.vertex_count());
        }
    }
}
