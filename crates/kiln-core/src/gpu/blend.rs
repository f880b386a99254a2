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

//! Blend modes and the blend x depth-write pipeline matrix shared by lanes.

use super::pipeline_state::{GraphicsPso, GraphicsPsoDesc};
use super::root_signature::RootSignature;
use crate::renderer::api::{BlendComponent, BlendFactor, BlendOperation, BlendState};
use crate::renderer::{GraphicsDevice, PipelineError};

/// How a fragment is combined with the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Blending disabled; the fragment replaces the destination.
    None,
    /// Alpha blending.
    #[default]
    Normal,
    /// Additive.
    Add,
    /// Destination minus source.
    Subtract,
    /// Multiplicative.
    Multiply,
    /// Screen.
    Screen,
}

impl BlendMode {
    /// Every mode, in matrix order.
    pub const ALL: [BlendMode; 6] = [
        BlendMode::None,
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::Multiply,
        BlendMode::Screen,
    ];

    /// The position of the mode in [`BlendMode::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The blend state of the mode, `None` when blending is off.
    pub fn blend_state(self) -> Option<BlendState> {
        let component = |src_factor, dst_factor, operation| BlendComponent {
            src_factor,
            dst_factor,
            operation,
        };
        let color = match self {
            BlendMode::None => return None,
            BlendMode::Normal => component(
                BlendFactor::SrcAlpha,
                BlendFactor::OneMinusSrcAlpha,
                BlendOperation::Add,
            ),
            BlendMode::Add => component(BlendFactor::SrcAlpha, BlendFactor::One, BlendOperation::Add),
            BlendMode::Subtract => component(
                BlendFactor::SrcAlpha,
                BlendFactor::One,
                BlendOperation::ReverseSubtract,
            ),
            BlendMode::Multiply => {
                component(BlendFactor::Zero, BlendFactor::SrcColor, BlendOperation::Add)
            }
            BlendMode::Screen => component(
                BlendFactor::OneMinusDstColor,
                BlendFactor::One,
                BlendOperation::Add,
            ),
        };
        Some(BlendState {
            color,
            alpha: BlendComponent::REPLACE,
        })
    }
}

/// Whether passing fragments write depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthWrite {
    /// Depth is written.
    #[default]
    Enabled,
    /// Depth is tested but not written.
    Disabled,
}

impl DepthWrite {
    /// Both settings, in matrix order.
    pub const ALL: [DepthWrite; 2] = [DepthWrite::Enabled, DepthWrite::Disabled];

    fn index(self) -> usize {
        self as usize
    }
}

/// One pipeline per blend mode and depth-write setting, all derived from a
/// single base description.
#[derive(Debug, Clone)]
pub struct PsoMatrix {
    psos: Vec<GraphicsPso>,
}

impl PsoMatrix {
    /// Compiles the twelve variants of `base`.
    ///
    /// `base` must describe a pipeline with depth testing; each variant
    /// overrides its blend state and depth-write flag.
    pub fn build(
        base: &GraphicsPsoDesc,
        root_signature: &RootSignature,
        device: &dyn GraphicsDevice,
        label: &str,
    ) -> Result<Self, PipelineError> {
        let mut psos = Vec::with_capacity(BlendMode::ALL.len() * DepthWrite::ALL.len());
        for blend in BlendMode::ALL {
            for depth in DepthWrite::ALL {
                let pso = base
                    .clone()
                    .with_label(format!("{label} {blend:?}/{depth:?}"))
                    .set_blend_state(blend.blend_state())
                    .set_depth_write(depth == DepthWrite::Enabled)
                    .finalize(root_signature, device)?;
                psos.push(pso);
            }
        }
        Ok(Self { psos })
    }

    /// The pipeline for `blend` and `depth`.
    pub fn get(&self, blend: BlendMode, depth: DepthWrite) -> &GraphicsPso {
        &self.psos[blend.index() * DepthWrite::ALL.len() + depth.index()]
    }

    /// Number of pipelines in the matrix.
    pub fn len(&self) -> usize {
        self.psos.len()
    }

    /// Always `false` for a built matrix.
    pub fn is_empty(&self) -> bool {
        self.psos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RootSignatureDesc;
    use crate::mock::MockDevice;
    use crate::renderer::api::{CompareFunction, Format, ShaderModuleDesc, ShaderVisibility};

    #[test]
    fn test_blend_descriptors_for_every_mode() {
        let expect = |src, dst, op| {
            Some(BlendState {
                color: BlendComponent {
                    src_factor: src,
                    dst_factor: dst,
                    operation: op,
                },
                alpha: BlendComponent::REPLACE,
            })
        };
        use BlendFactor::*;
        assert_eq!(BlendMode::None.blend_state(), None);
        assert_eq!(
            BlendMode::Normal.blend_state(),
            expect(SrcAlpha, OneMinusSrcAlpha, BlendOperation::Add)
        );
        assert_eq!(
            BlendMode::Add.blend_state(),
            expect(SrcAlpha, One, BlendOperation::Add)
        );
        assert_eq!(
            BlendMode::Subtract.blend_state(),
            expect(SrcAlpha, One, BlendOperation::ReverseSubtract)
        );
        assert_eq!(
            BlendMode::Multiply.blend_state(),
            expect(Zero, SrcColor, BlendOperation::Add)
        );
        assert_eq!(
            BlendMode::Screen.blend_state(),
            expect(OneMinusDstColor, One, BlendOperation::Add)
        );
    }

    #[test]
    fn test_matrix_holds_twelve_distinct_pipelines() {
        let device = MockDevice::new();
        let root = RootSignatureDesc::new("matrix", 1, 0)
            .init_as_constant_buffer(0, 0, ShaderVisibility::All)
            .finalize(&device)
            .unwrap();
        let module = device
            .create_shader_module(&ShaderModuleDesc {
                label: "m.wgsl",
                source: "fn main() {}",
            })
            .unwrap();
        let base = GraphicsPsoDesc::new("base")
            .set_vertex_shader(module, "vs_main")
            .set_pixel_shader(module, "fs_main")
            .set_render_target_format(Format::Rgba16Float, None)
            .set_depth_stencil(Format::Depth32Float, true, CompareFunction::LessEqual);

        let matrix = PsoMatrix::build(&base, &root, &device, "objects").unwrap();

        assert_eq!(matrix.len(), 12);
        let transparent = matrix.get(BlendMode::Normal, DepthWrite::Disabled).desc();
        assert_eq!(
            transparent.render_targets[0].blend,
            BlendMode::Normal.blend_state()
        );
        assert_eq!(transparent.depth_stencil.map(|d| d.depth_write_enabled), Some(false));
        assert_ne!(
            matrix.get(BlendMode::Add, DepthWrite::Enabled).id(),
            matrix.get(BlendMode::Add, DepthWrite::Disabled).id()
        );
    }
}
