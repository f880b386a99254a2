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

use super::constants::{LineVertex, Vertex};
use super::records::DrawPass;
use kiln_core::gpu::{
    BlendMode, ComputePso, ComputePsoDesc, DepthBuffer, DepthWrite, GraphicsPso, GraphicsPsoDesc,
    PsoMatrix, RootSignature, RootSignatureDesc,
};
use kiln_core::renderer::api::{
    CompareFunction, DepthBias, DescriptorRangeKind, Format, InputLayout, PrimitiveTopology,
    RasterizerState, SamplerDesc, ShaderVisibility, VertexFormat,
};
use kiln_core::renderer::{GraphicsDevice, RenderError};
use kiln_core::GraphicsCore;

/// The format of the scene color target and every post-process buffer.
pub const SCENE_COLOR_FORMAT: Format = Format::Rgba16Float;

/// Root parameter slots of `object3d.wgsl`.
pub mod object_slots {
    /// Material constants.
    pub const MATERIAL: u32 = 0;
    /// World transform constants.
    pub const WORLD: u32 = 1;
    /// Camera constants.
    pub const CAMERA: u32 = 2;
    /// Albedo texture.
    pub const TEXTURE: u32 = 3;
    /// Dissolve mask.
    pub const MASK: u32 = 4;
    /// Shadow map.
    pub const SHADOW_MAP: u32 = 5;
    /// Directional light.
    pub const LIGHT: u32 = 6;
}

/// The input layout of [`Vertex`].
pub fn vertex_input_layout() -> InputLayout {
    InputLayout::empty()
        .with_slot(Vertex::STRIDE)
        .with_element("POSITION", VertexFormat::Float32x4, 0, 0)
        .with_element("TEXCOORD", VertexFormat::Float32x2, 0, 16)
        .with_element("NORMAL", VertexFormat::Float32x3, 0, 32)
}

/// The skinning dispatch's root signature and pipeline.
#[derive(Debug)]
pub(crate) struct SkinningPipeline {
    pub(crate) root: RootSignature,
    pub(crate) pso: ComputePso,
}

/// Root signatures and pipelines of the Renderer's four passes.
#[derive(Debug)]
pub struct RenderPipelines {
    pub(crate) object_root: RootSignature,
    pub(crate) objects: PsoMatrix,
    pub(crate) shadow_root: RootSignature,
    pub(crate) shadow: GraphicsPso,
    /// `None` on devices without compute shaders.
    pub(crate) skinning: Option<SkinningPipeline>,
    pub(crate) bone_root: RootSignature,
    pub(crate) bone: GraphicsPso,
}

impl RenderPipelines {
    /// Loads the shaders and compiles every pipeline.
    pub fn new(core: &mut GraphicsCore) -> Result<Self, RenderError> {
        let device = core.device.clone();
        let device = device.as_ref();

        let object_root = RootSignatureDesc::new("object3d", 7, 1)
            .init_as_constant_buffer(object_slots::MATERIAL as usize, 0, ShaderVisibility::All)
            .init_as_constant_buffer(object_slots::WORLD as usize, 1, ShaderVisibility::Vertex)
            .init_as_constant_buffer(object_slots::CAMERA as usize, 2, ShaderVisibility::All)
            .init_as_descriptor_range(
                object_slots::TEXTURE as usize,
                DescriptorRangeKind::Texture,
                0,
                1,
                ShaderVisibility::Pixel,
            )
            .init_as_descriptor_range(
                object_slots::MASK as usize,
                DescriptorRangeKind::Texture,
                1,
                1,
                ShaderVisibility::Pixel,
            )
            .init_as_descriptor_range(
                object_slots::SHADOW_MAP as usize,
                DescriptorRangeKind::DepthTexture,
                2,
                1,
                ShaderVisibility::Pixel,
            )
            .init_as_constant_buffer(object_slots::LIGHT as usize, 3, ShaderVisibility::All)
            .init_static_sampler(0, 0, SamplerDesc::LINEAR_WRAP, ShaderVisibility::Pixel)
            .finalize(device)?;
        let object_shader = core.shaders.load(device, "object3d.wgsl")?;
        let object_base = GraphicsPsoDesc::new("object3d")
            .set_vertex_shader(object_shader, "vs_main")
            .set_pixel_shader(object_shader, "fs_main")
            .set_input_layout(vertex_input_layout())
            .set_render_target_format(SCENE_COLOR_FORMAT, None)
            .set_depth_stencil(DepthBuffer::FORMAT, true, CompareFunction::LessEqual);
        let objects = PsoMatrix::build(&object_base, &object_root, device, "object3d")?;

        let shadow_root = RootSignatureDesc::new("shadow", 2, 0)
            .init_as_constant_buffer(0, 0, ShaderVisibility::Vertex)
            .init_as_constant_buffer(1, 1, ShaderVisibility::Vertex)
            .finalize(device)?;
        let shadow_shader = core.shaders.load(device, "shadow.wgsl")?;
        let shadow = GraphicsPsoDesc::new("shadow")
            .set_vertex_shader(shadow_shader, "vs_main")
            .set_input_layout(vertex_input_layout())
            .set_rasterizer_state(RasterizerState {
                depth_bias: DepthBias {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
                ..RasterizerState::default()
            })
            .set_depth_stencil(DepthBuffer::FORMAT, true, CompareFunction::LessEqual)
            .finalize(&shadow_root, device)?;

        let skinning = if device.capabilities().supports_compute {
            Some(skinning_pipeline(core, device)?)
        } else {
            log::warn!("Compute shaders are unavailable, skinning is disabled");
            None
        };

        let bone_root = RootSignatureDesc::new("bone", 2, 0)
            .init_as_constant_buffer(0, 0, ShaderVisibility::Vertex)
            .init_as_constant_buffer(1, 1, ShaderVisibility::Vertex)
            .finalize(device)?;
        let bone_shader = core.shaders.load(device, "bone.wgsl")?;
        let bone = GraphicsPsoDesc::new("bone")
            .set_vertex_shader(bone_shader, "vs_main")
            .set_pixel_shader(bone_shader, "fs_main")
            .set_input_layout(
                InputLayout::empty()
                    .with_slot(LineVertex::STRIDE)
                    .with_element("POSITION", VertexFormat::Float32x4, 0, 0)
                    .with_element("COLOR", VertexFormat::Float32x4, 0, 16),
            )
            .set_primitive_topology(PrimitiveTopology::LineList)
            .set_rasterizer_state(RasterizerState::no_cull())
            .set_render_target_format(SCENE_COLOR_FORMAT, BlendMode::Normal.blend_state())
            .finalize(&bone_root, device)?;

        Ok(Self {
            object_root,
            objects,
            shadow_root,
            shadow,
            skinning,
            bone_root,
            bone,
        })
    }

    /// The geometry pipeline for a draw pass category.
    pub fn object_pso(&self, pass: DrawPass) -> &GraphicsPso {
        match pass {
            DrawPass::Opaque => self.objects.get(BlendMode::None, DepthWrite::Enabled),
            DrawPass::Transparent => self.objects.get(BlendMode::Normal, DepthWrite::Disabled),
        }
    }
}

fn skinning_pipeline(
    core: &mut GraphicsCore,
    device: &dyn GraphicsDevice,
) -> Result<SkinningPipeline, RenderError> {
    let root = RootSignatureDesc::new("skinning", 5, 0)
        .init_as_descriptor_range(
            0,
            DescriptorRangeKind::StructuredBuffer,
            0,
            1,
            ShaderVisibility::All,
        )
        .init_as_descriptor_range(
            1,
            DescriptorRangeKind::StructuredBuffer,
            1,
            1,
            ShaderVisibility::All,
        )
        .init_as_descriptor_range(
            2,
            DescriptorRangeKind::StructuredBuffer,
            2,
            1,
            ShaderVisibility::All,
        )
        .init_as_descriptor_range(
            3,
            DescriptorRangeKind::ReadWriteBuffer,
            0,
            1,
            ShaderVisibility::All,
        )
        .init_as_constant_buffer(4, 0, ShaderVisibility::All)
        .finalize(device)?;
    let shader = core.shaders.load(device, "skinning.wgsl")?;
    let pso = ComputePsoDesc::new("skinning")
        .set_compute_shader(shader, "cs_main")
        .finalize(&root, device)?;
    Ok(SkinningPipeline { root, pso })
}
