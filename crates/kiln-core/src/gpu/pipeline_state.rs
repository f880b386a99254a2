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

use super::root_signature::RootSignature;
use crate::renderer::api::{
    BlendState, CompareFunction, ComputePipelineDesc, DepthStencilState, Format,
    GraphicsPipelineDesc, InputLayout, PipelineId, PrimitiveTopology, RasterizerState,
    RenderTargetState, RootSignatureId, ShaderModuleId, ShaderStageDesc,
};
use crate::renderer::{GraphicsDevice, PipelineError};

/// Builder for a [`GraphicsPso`].
///
/// A vertex shader and at least one render target or a depth target are
/// required. The description can be cloned and tweaked to derive variants,
/// which is how blend/depth matrices are built.
#[derive(Debug, Clone)]
pub struct GraphicsPsoDesc {
    label: String,
    vertex: Option<ShaderStageDesc>,
    pixel: Option<ShaderStageDesc>,
    input_layout: InputLayout,
    topology: PrimitiveTopology,
    rasterizer: RasterizerState,
    render_targets: Vec<RenderTargetState>,
    depth_stencil: Option<DepthStencilState>,
}

impl GraphicsPsoDesc {
    /// Starts a triangle-list description with the default rasterizer state.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            vertex: None,
            pixel: None,
            input_layout: InputLayout::empty(),
            topology: PrimitiveTopology::TriangleList,
            rasterizer: RasterizerState::default(),
            render_targets: Vec::new(),
            depth_stencil: None,
        }
    }

    /// Renames the description.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the vertex stage.
    pub fn set_vertex_shader(mut self, module: ShaderModuleId, entry_point: &str) -> Self {
        self.vertex = Some(ShaderStageDesc {
            module,
            entry_point: entry_point.to_string(),
        });
        self
    }

    /// Sets the pixel stage.
    pub fn set_pixel_shader(mut self, module: ShaderModuleId, entry_point: &str) -> Self {
        self.pixel = Some(ShaderStageDesc {
            module,
            entry_point: entry_point.to_string(),
        });
        self
    }

    /// Sets the vertex input layout.
    pub fn set_input_layout(mut self, layout: InputLayout) -> Self {
        self.input_layout = layout;
        self
    }

    /// Sets the primitive topology.
    pub fn set_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Sets the rasterizer state.
    pub fn set_rasterizer_state(mut self, rasterizer: RasterizerState) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Sets a single render target.
    pub fn set_render_target_format(self, format: Format, blend: Option<BlendState>) -> Self {
        self.set_render_target_formats(&[RenderTargetState { format, blend }])
    }

    /// Sets every render target.
    pub fn set_render_target_formats(mut self, targets: &[RenderTargetState]) -> Self {
        self.render_targets = targets.to_vec();
        self
    }

    /// Replaces the blend state of every render target.
    pub fn set_blend_state(mut self, blend: Option<BlendState>) -> Self {
        for target in &mut self.render_targets {
            target.blend = blend;
        }
        self
    }

    /// Enables depth testing against a `format` target.
    pub fn set_depth_stencil(
        mut self,
        format: Format,
        depth_write_enabled: bool,
        depth_compare: CompareFunction,
    ) -> Self {
        self.depth_stencil = Some(DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare,
        });
        self
    }

    /// Disables the depth test.
    pub fn without_depth(mut self) -> Self {
        self.depth_stencil = None;
        self
    }

    /// Toggles depth writes, keeping the rest of the depth state.
    pub fn set_depth_write(mut self, enabled: bool) -> Self {
        if let Some(depth) = &mut self.depth_stencil {
            depth.depth_write_enabled = enabled;
        }
        self
    }

    /// Validates the description and compiles it against `root_signature`.
    ///
    /// ## Errors
    /// * `PipelineError::IncompleteDescription` - No vertex shader, or no output.
    /// * Any error the device reports while compiling.
    pub fn finalize(
        &self,
        root_signature: &RootSignature,
        device: &dyn GraphicsDevice,
    ) -> Result<GraphicsPso, PipelineError> {
        let vertex = self
            .vertex
            .clone()
            .ok_or_else(|| PipelineError::IncompleteDescription {
                label: self.label.clone(),
                missing: "vertex shader",
            })?;
        if self.render_targets.is_empty() && self.depth_stencil.is_none() {
            return Err(PipelineError::IncompleteDescription {
                label: self.label.clone(),
                missing: "render target or depth stencil",
            });
        }

        let desc = GraphicsPipelineDesc {
            label: self.label.clone(),
            root_signature: root_signature.id(),
            vertex,
            pixel: self.pixel.clone(),
            input_layout: self.input_layout.clone(),
            topology: self.topology,
            rasterizer: self.rasterizer,
            render_targets: self.render_targets.clone(),
            depth_stencil: self.depth_stencil,
        };
        let id = device.create_graphics_pipeline(&desc)?;
        log::debug!("Finalized graphics PSO '{}' as {:?}", desc.label, id);
        Ok(GraphicsPso { id, desc })
    }
}

/// A compiled, immutable graphics pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPso {
    id: PipelineId,
    desc: GraphicsPipelineDesc,
}

impl GraphicsPso {
    /// The backend handle.
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// The root signature the pipeline was compiled against.
    pub fn root_signature(&self) -> RootSignatureId {
        self.desc.root_signature
    }

    /// The full description the pipeline was compiled from.
    pub fn desc(&self) -> &GraphicsPipelineDesc {
        &self.desc
    }
}

/// Builder for a [`ComputePso`].
#[derive(Debug, Clone)]
pub struct ComputePsoDesc {
    label: String,
    compute: Option<ShaderStageDesc>,
}

impl ComputePsoDesc {
    /// Starts an empty description.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            compute: None,
        }
    }

    /// Sets the compute stage.
    pub fn set_compute_shader(mut self, module: ShaderModuleId, entry_point: &str) -> Self {
        self.compute = Some(ShaderStageDesc {
            module,
            entry_point: entry_point.to_string(),
        });
        self
    }

    /// Compiles the pipeline against `root_signature`.
    ///
    /// ## Errors
    /// * `PipelineError::IncompleteDescription` - No compute shader.
    pub fn finalize(
        &self,
        root_signature: &RootSignature,
        device: &dyn GraphicsDevice,
    ) -> Result<ComputePso, PipelineError> {
        let compute = self
            .compute
            .clone()
            .ok_or_else(|| PipelineError::IncompleteDescription {
                label: self.label.clone(),
                missing: "compute shader",
            })?;
        let desc = ComputePipelineDesc {
            label: self.label.clone(),
            root_signature: root_signature.id(),
            compute,
        };
        let id = device.create_compute_pipeline(&desc)?;
        log::debug!("Finalized compute PSO '{}' as {:?}", desc.label, id);
        Ok(ComputePso { id, desc })
    }
}

/// A compiled, immutable compute pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePso {
    id: PipelineId,
    desc: ComputePipelineDesc,
}

impl ComputePso {
    /// The backend handle.
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// The root signature the pipeline was compiled against.
    pub fn root_signature(&self) -> RootSignatureId {
        self.desc.root_signature
    }

    /// The full description the pipeline was compiled from.
    pub fn desc(&self) -> &ComputePipelineDesc {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RootSignatureDesc;
    use crate::mock::MockDevice;
    use crate::renderer::api::{ShaderModuleDesc, ShaderVisibility};

    fn setup() -> (MockDevice, RootSignature, ShaderModuleId) {
        let device = MockDevice::new();
        let root = RootSignatureDesc::new("test", 1, 0)
            .init_as_constant_buffer(0, 0, ShaderVisibility::All)
            .finalize(&device)
            .unwrap();
        let module = device
            .create_shader_module(&ShaderModuleDesc {
                label: "test.wgsl",
                source: "@vertex fn vs_main() {}",
            })
            .unwrap();
        (device, root, module)
    }

    #[test]
    fn test_missing_vertex_shader_is_rejected() {
        let (device, root, _) = setup();
        let desc = GraphicsPsoDesc::new("no vs").set_render_target_format(Format::Rgba8Unorm, None);
        assert!(matches!(
            desc.finalize(&root, &device),
            Err(PipelineError::IncompleteDescription {
                missing: "vertex shader",
                ..
            })
        ));
    }

    #[test]
    fn test_pipeline_without_outputs_is_rejected() {
        let (device, root, module) = setup();
        let desc = GraphicsPsoDesc::new("no outputs").set_vertex_shader(module, "vs_main");
        assert!(desc.finalize(&root, &device).is_err());
    }

    #[test]
    fn test_depth_only_pipeline_is_accepted() {
        let (device, root, module) = setup();
        let pso = GraphicsPsoDesc::new("shadow")
            .set_vertex_shader(module, "vs_main")
            .set_depth_stencil(Format::Depth32Float, true, CompareFunction::Less)
            .finalize(&root, &device)
            .unwrap();

        assert!(pso.desc().pixel.is_none());
        assert_eq!(pso.root_signature(), root.id());
        assert_eq!(
            device.state().graphics_pipelines.get(&pso.id()),
            Some(pso.desc())
        );
    }

    #[test]
    fn test_compute_pipeline_requires_shader() {
        let (device, root, module) = setup();
        assert!(ComputePsoDesc::new("empty").finalize(&root, &device).is_err());
        let pso = ComputePsoDesc::new("update")
            .set_compute_shader(module, "cs_update")
            .finalize(&root, &device)
            .unwrap();
        assert_eq!(pso.desc().compute.entry_point, "cs_update");
    }
}
