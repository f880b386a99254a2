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

use super::effects::{default_constants, PostConstants, PostEffectKind, PostEffectSettings};
use crate::render_lane::SCENE_COLOR_FORMAT;
use kiln_core::gpu::{
    AsResource, ColorBuffer, CommandContext, ConstantBuffer, DepthBuffer, Display, GraphicsPso,
    GraphicsPsoDesc, ResourceHandle, ResourceUsage, RootSignature, RootSignatureDesc,
};
use kiln_core::math::LinearRgba;
use kiln_core::renderer::api::{
    DescriptorRangeKind, GpuDescriptorHandle, PrimitiveTopology, RasterizerState, ResourceState,
    SamplerDesc, ShaderVisibility,
};
use kiln_core::renderer::{RenderError, ResourceError};
use kiln_core::GraphicsCore;

const INPUT_SLOT: u32 = 0;
const CONSTANTS_SLOT: u32 = 1;
const DEPTH_SLOT: u32 = 2;

/// The image a chain run produced: either the scene color or one effect buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOutput {
    /// Shader resource table of the image.
    pub srv: GpuDescriptorHandle,
    /// The image resource.
    pub resource: ResourceHandle,
}

impl AsResource for PostOutput {
    fn resource_handle(&self) -> ResourceHandle {
        self.resource
    }
}

fn effect_root_desc(label: &str) -> RootSignatureDesc {
    RootSignatureDesc::new(label, 3, 1)
        .init_as_descriptor_range(
            INPUT_SLOT as usize,
            DescriptorRangeKind::Texture,
            0,
            1,
            ShaderVisibility::Pixel,
        )
        .init_as_constant_buffer(CONSTANTS_SLOT as usize, 0, ShaderVisibility::Pixel)
        .init_as_descriptor_range(
            DEPTH_SLOT as usize,
            DescriptorRangeKind::DepthTexture,
            1,
            1,
            ShaderVisibility::Pixel,
        )
        .init_static_sampler(0, 0, SamplerDesc::LINEAR_CLAMP, ShaderVisibility::Pixel)
}

#[derive(Debug)]
struct PostStage {
    kind: PostEffectKind,
    enabled: bool,
    target: ColorBuffer,
    root: RootSignature,
    pso: GraphicsPso,
    constants: ConstantBuffer<PostConstants>,
}

/// The fixed-order full-screen effect chain.
///
/// Every effect owns its target, root signature, pipeline and constants, so
/// toggling one never disturbs another. Effects start disabled.
#[derive(Debug)]
pub struct PostProcessChain {
    stages: Vec<PostStage>,
    copy_root: RootSignature,
    copy_pso: GraphicsPso,
}

impl PostProcessChain {
    /// Creates every effect at `size` and the composite pipeline for the display format.
    pub fn new(core: &mut GraphicsCore, size: (u32, u32)) -> Result<Self, RenderError> {
        let device = core.device.clone();
        let shader = core.shaders.load(device.as_ref(), "postprocess.wgsl")?;

        let mut stages = Vec::with_capacity(PostEffectKind::ORDER.len());
        for kind in PostEffectKind::ORDER {
            let root = effect_root_desc(kind.label()).finalize(device.as_ref())?;
            let pso = GraphicsPsoDesc::new(kind.label())
                .set_vertex_shader(shader, "vs_main")
                .set_pixel_shader(shader, kind.entry_point())
                .set_primitive_topology(PrimitiveTopology::TriangleList)
                .set_rasterizer_state(RasterizerState::no_cull())
                .set_render_target_format(SCENE_COLOR_FORMAT, None)
                .finalize(&root, device.as_ref())?;
            let target = ColorBuffer::create(
                &device,
                &mut core.descriptors.rtv,
                &mut core.descriptors.cbv_srv_uav,
                kind.label(),
                size,
                SCENE_COLOR_FORMAT,
                LinearRgba::BLACK,
            )?;
            let constants = ConstantBuffer::create(&device, kind.label(), &default_constants(kind))?;
            stages.push(PostStage {
                kind,
                enabled: false,
                target,
                root,
                pso,
                constants,
            });
        }

        let copy_shader = core.shaders.load(device.as_ref(), "copy.wgsl")?;
        let copy_root = RootSignatureDesc::new("composite", 1, 1)
            .init_as_descriptor_range(0, DescriptorRangeKind::Texture, 0, 1, ShaderVisibility::Pixel)
            .init_static_sampler(0, 0, SamplerDesc::LINEAR_CLAMP, ShaderVisibility::Pixel)
            .finalize(device.as_ref())?;
        let copy_pso = GraphicsPsoDesc::new("composite")
            .set_vertex_shader(copy_shader, "vs_main")
            .set_pixel_shader(copy_shader, "fs_main")
            .set_rasterizer_state(RasterizerState::no_cull())
            .set_render_target_format(core.display.format(), None)
            .finalize(&copy_root, device.as_ref())?;

        Ok(Self {
            stages,
            copy_root,
            copy_pso,
        })
    }

    /// Turns an effect on or off.
    pub fn set_enabled(&mut self, kind: PostEffectKind, enabled: bool) {
        self.stages[kind.index()].enabled = enabled;
    }

    /// Whether an effect runs.
    pub fn is_enabled(&self, kind: PostEffectKind) -> bool {
        self.stages[kind.index()].enabled
    }

    /// Number of effects that run.
    pub fn enabled_count(&self) -> usize {
        self.stages.iter().filter(|s| s.enabled).count()
    }

    /// Uploads new parameters for the effect `S` configures.
    pub fn configure<S: PostEffectSettings>(&mut self, settings: &S) -> Result<(), ResourceError> {
        self.stages[S::KIND.index()]
            .constants
            .update(&settings.pack())
    }

    /// The target an effect renders into.
    pub fn target(&self, kind: PostEffectKind) -> &ColorBuffer {
        &self.stages[kind.index()].target
    }

    /// Runs the enabled effects in order, each reading the previous output.
    ///
    /// Disabled effects record nothing. With every effect disabled the scene
    /// color itself is returned.
    pub fn apply(
        &self,
        ctx: &mut CommandContext,
        scene: &ColorBuffer,
        depth: &DepthBuffer,
    ) -> Result<PostOutput, RenderError> {
        let mut current = PostOutput {
            srv: scene.srv_table()?,
            resource: scene.resource_handle(),
        };
        let depth_table = depth.srv_table()?;

        for stage in self.stages.iter().filter(|s| s.enabled) {
            ctx.transition_for_pass(&[
                ResourceUsage::new(&current, ResourceState::PixelShaderResource),
                ResourceUsage::new(depth, ResourceState::PixelShaderResource),
                ResourceUsage::new(&stage.target, ResourceState::RenderTarget),
            ]);
            let (width, height) = stage.target.size();
            let mut gfx = ctx.graphics();
            gfx.set_render_targets(&[stage.target.rtv()], None);
            gfx.set_viewport_and_scissor(width, height);
            gfx.set_root_signature(&stage.root);
            gfx.set_pipeline_state(&stage.pso);
            gfx.set_primitive_topology(PrimitiveTopology::TriangleList);
            gfx.set_descriptor_table(INPUT_SLOT, current.srv);
            gfx.set_constant_buffer(CONSTANTS_SLOT, stage.constants.gpu_virtual_address());
            gfx.set_descriptor_table(DEPTH_SLOT, depth_table);
            gfx.draw(3);
            log::trace!("Post effect '{}' applied", stage.kind.label());

            current = PostOutput {
                srv: stage.target.srv_table()?,
                resource: stage.target.resource_handle(),
            };
        }
        Ok(current)
    }

    /// Draws `output` over the display's current back buffer.
    pub fn composite_to_back_buffer(
        &self,
        ctx: &mut CommandContext,
        output: &PostOutput,
        display: &Display,
    ) {
        let back_buffer = display.back_buffer();
        ctx.transition_for_pass(&[
            ResourceUsage::new(output, ResourceState::PixelShaderResource),
            ResourceUsage::new(back_buffer, ResourceState::RenderTarget),
        ]);
        let (width, height) = display.size();
        let mut gfx = ctx.graphics();
        gfx.set_render_targets(&[back_buffer.rtv()], None);
        gfx.set_viewport_and_scissor(width, height);
        gfx.set_root_signature(&self.copy_root);
        gfx.set_pipeline_state(&self.copy_pso);
        gfx.set_primitive_topology(PrimitiveTopology::TriangleList);
        gfx.set_descriptor_table(0, output.srv);
        gfx.draw(3);
    }

    /// Recreates every effect target at a new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        for stage in &mut self.stages {
            stage.target.resize(width, height)?;
        }
        Ok(())
    }
}
