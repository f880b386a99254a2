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

//! Shader modules and the fixed-function state compiled into pipeline state objects.

use super::resource::Format;
use super::root_signature::RootSignatureId;

/// An opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub u32);

/// An opaque handle to a compiled graphics or compute pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u32);

/// Describes a shader module to compile.
#[derive(Debug, Clone)]
pub struct ShaderModuleDesc<'a> {
    /// A debug label, usually the file name.
    pub label: &'a str,
    /// WGSL source text.
    pub source: &'a str,
}

/// One programmable stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStageDesc {
    /// The module containing the entry point.
    pub module: ShaderModuleId,
    /// The entry point name.
    pub entry_point: String,
}

/// Factors in the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source color.
    SrcColor,
    /// `1 - source color`
    OneMinusSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// `1 - source alpha`
    OneMinusSrcAlpha,
    /// Destination color.
    DstColor,
    /// `1 - destination color`
    OneMinusDstColor,
    /// Destination alpha.
    DstAlpha,
    /// `1 - destination alpha`
    OneMinusDstAlpha,
}

/// The operator combining the weighted source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `src + dst`
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// A blend equation for one group of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Weight applied to the fragment output.
    pub src_factor: BlendFactor,
    /// Weight applied to the framebuffer value.
    pub dst_factor: BlendFactor,
    /// How the weighted values are combined.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// `src * 1 + dst * 0`, i.e. the fragment replaces the destination.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };
}

/// The blend state of one render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// The equation for the RGB channels.
    pub color: BlendComponent,
    /// The equation for the alpha channel.
    pub alpha: BlendComponent,
}

/// Comparison used by depth tests and comparison samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less.
    Less,
    /// Passes if the new value is less or equal.
    LessEqual,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is greater.
    Greater,
    /// Passes if the new value is greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Independent points.
    PointList,
    /// Independent lines, two vertices each.
    LineList,
    /// Independent triangles, three vertices each.
    TriangleList,
    /// A connected triangle strip.
    TriangleStrip,
}

/// Which faces are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling.
    None,
    /// Discard front faces.
    Front,
    /// Discard back faces.
    Back,
}

/// The winding of front faces in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Clockwise triangles face the viewer.
    Clockwise,
    /// Counter-clockwise triangles face the viewer.
    CounterClockwise,
}

/// Fill mode of rasterized polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Filled triangles.
    Solid,
    /// Triangle edges only.
    Wireframe,
}

/// Depth biasing, used against shadow acne.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBias {
    /// A constant added to every depth value.
    pub constant: i32,
    /// A factor scaled by the depth slope of the primitive.
    pub slope_scale: f32,
    /// The maximum bias applied.
    pub clamp: f32,
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerState {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Front face winding.
    pub front_face: FrontFace,
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Depth bias.
    pub depth_bias: DepthBias,
}

impl Default for RasterizerState {
    /// Back-face culling with clockwise front faces.
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            fill_mode: FillMode::Solid,
            depth_bias: DepthBias::default(),
        }
    }
}

impl RasterizerState {
    /// Rasterizer state with culling disabled.
    pub fn no_cull() -> Self {
        Self {
            cull_mode: CullMode::None,
            ..Self::default()
        }
    }
}

/// Depth test state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// The format of the depth target.
    pub format: Format,
    /// Whether passing fragments write their depth.
    pub depth_write_enabled: bool,
    /// The depth test.
    pub depth_compare: CompareFunction,
}

/// The format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One `f32`.
    Float32,
    /// Two `f32`.
    Float32x2,
    /// Three `f32`.
    Float32x3,
    /// Four `f32`.
    Float32x4,
    /// Four `u32`.
    Uint32x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 | VertexFormat::Uint32x4 => 16,
        }
    }
}

/// How often a vertex buffer slot advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClassification {
    /// Once per vertex.
    PerVertex,
    /// Once per instance.
    PerInstance,
}

/// One attribute of the input layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElement {
    /// The semantic name, kept for diagnostics.
    pub semantic: &'static str,
    /// The attribute format.
    pub format: VertexFormat,
    /// The vertex buffer slot the attribute is read from.
    pub input_slot: u32,
    /// The byte offset inside a vertex of that slot.
    pub aligned_byte_offset: u32,
    /// The `@location` in the vertex shader.
    pub shader_location: u32,
}

/// One vertex buffer slot of the input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputSlot {
    /// Distance between consecutive elements.
    pub stride: u32,
    /// Per-vertex or per-instance stepping.
    pub classification: InputClassification,
}

/// The vertex input layout of a graphics pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputLayout {
    /// The vertex buffer slots, indexed by slot number.
    pub slots: Vec<InputSlot>,
    /// The attributes.
    pub elements: Vec<InputElement>,
}

impl InputLayout {
    /// An empty layout, for pipelines that fetch vertices themselves.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a per-vertex slot of `stride` bytes.
    pub fn with_slot(mut self, stride: u32) -> Self {
        self.slots.push(InputSlot {
            stride,
            classification: InputClassification::PerVertex,
        });
        self
    }

    /// Appends an attribute to slot `input_slot`.
    pub fn with_element(
        mut self,
        semantic: &'static str,
        format: VertexFormat,
        input_slot: u32,
        aligned_byte_offset: u32,
    ) -> Self {
        let shader_location = self.elements.len() as u32;
        self.elements.push(InputElement {
            semantic,
            format,
            input_slot,
            aligned_byte_offset,
            shader_location,
        });
        self
    }
}

/// One color attachment of a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetState {
    /// The attachment format.
    pub format: Format,
    /// The blend state, or `None` to write the fragment unblended.
    pub blend: Option<BlendState>,
}

/// The complete description a backend compiles into a graphics pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    /// A debug label.
    pub label: String,
    /// The finalized root signature the pipeline binds against.
    pub root_signature: RootSignatureId,
    /// The vertex stage.
    pub vertex: ShaderStageDesc,
    /// The pixel stage; `None` for depth-only pipelines.
    pub pixel: Option<ShaderStageDesc>,
    /// The vertex input layout.
    pub input_layout: InputLayout,
    /// The primitive topology.
    pub topology: PrimitiveTopology,
    /// The rasterizer state.
    pub rasterizer: RasterizerState,
    /// The color attachments.
    pub render_targets: Vec<RenderTargetState>,
    /// The depth attachment.
    pub depth_stencil: Option<DepthStencilState>,
}

/// The complete description a backend compiles into a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineDesc {
    /// A debug label.
    pub label: String,
    /// The finalized root signature the pipeline binds against.
    pub root_signature: RootSignatureId,
    /// The compute stage.
    pub compute: ShaderStageDesc,
}
