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

use kiln_core::renderer::api::{
    AddressMode, BlendComponent, BlendFactor, BlendOperation, BlendState, CompareFunction,
    CullMode, DescriptorRangeKind, FillMode, FilterMode, Format, FrontFace, IndexFormat,
    InputClassification, PrimitiveTopology, RenderTargetState, SamplerDesc, ShaderVisibility,
    VertexFormat,
};

/// A local extension trait to convert engine types into their wgpu counterparts.
/// This avoids the orphan rule while keeping an idiomatic `.into_wgpu()` syntax.
pub(crate) trait IntoWgpu<T> {
    fn into_wgpu(self) -> T;
}

// --- Formats ---

/// The wgpu texture format of `format`, or `None` for [`Format::Unknown`].
pub(crate) fn texture_format(format: Format) -> Option<wgpu::TextureFormat> {
    Some(match format {
        Format::Unknown => return None,
        Format::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        Format::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        Format::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        Format::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        Format::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        Format::R32Float => wgpu::TextureFormat::R32Float,
        Format::Depth32Float => wgpu::TextureFormat::Depth32Float,
    })
}

/// The engine format of a surface format. Formats the engine does not name map
/// to [`Format::Unknown`].
pub(crate) fn format_from_wgpu(format: wgpu::TextureFormat) -> Format {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Format::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => Format::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => Format::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => Format::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => Format::Rgba16Float,
        wgpu::TextureFormat::R32Float => Format::R32Float,
        wgpu::TextureFormat::Depth32Float => Format::Depth32Float,
        _ => Format::Unknown,
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32x4 => wgpu::VertexFormat::Uint32x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for InputClassification {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            InputClassification::PerVertex => wgpu::VertexStepMode::Vertex,
            InputClassification::PerInstance => wgpu::VertexStepMode::Instance,
        }
    }
}

// --- Fixed-function state ---

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl IntoWgpu<wgpu::BlendComponent> for BlendComponent {
    fn into_wgpu(self) -> wgpu::BlendComponent {
        wgpu::BlendComponent {
            src_factor: self.src_factor.into_wgpu(),
            dst_factor: self.dst_factor.into_wgpu(),
            operation: self.operation.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendState {
    fn into_wgpu(self) -> wgpu::BlendState {
        wgpu::BlendState {
            color: self.color.into_wgpu(),
            alpha: self.alpha.into_wgpu(),
        }
    }
}

/// The color target of a pipeline, or `None` when its format is unknown.
pub(crate) fn color_target(target: &RenderTargetState) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format: texture_format(target.format)?,
        blend: target.blend.map(IntoWgpu::into_wgpu),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::Clockwise => wgpu::FrontFace::Cw,
            FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
        }
    }
}

impl IntoWgpu<wgpu::PolygonMode> for FillMode {
    fn into_wgpu(self) -> wgpu::PolygonMode {
        match self {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wireframe => wgpu::PolygonMode::Line,
        }
    }
}

// --- Samplers ---

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Wrap => wgpu::AddressMode::Repeat,
            AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
            AddressMode::Mirror => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Point => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// The descriptor of a sampler object built from `desc`.
pub(crate) fn sampler_descriptor(desc: &SamplerDesc) -> wgpu::SamplerDescriptor<'static> {
    let address_mode = desc.address_mode.into_wgpu();
    let filter = desc.filter.into_wgpu();
    wgpu::SamplerDescriptor {
        label: None,
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: filter,
        compare: desc.comparison.map(IntoWgpu::into_wgpu),
        ..Default::default()
    }
}

/// How a sampler is declared in a bind group layout.
pub(crate) fn sampler_binding_type(desc: &SamplerDesc) -> wgpu::SamplerBindingType {
    if desc.comparison.is_some() {
        wgpu::SamplerBindingType::Comparison
    } else {
        wgpu::SamplerBindingType::Filtering
    }
}

// --- Binding layout ---

impl IntoWgpu<wgpu::ShaderStages> for ShaderVisibility {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderVisibility::All => wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ShaderVisibility::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderVisibility::Pixel => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

/// The stages a descriptor of `kind` is visible to. Writable storage is not
/// allowed in vertex shaders.
pub(crate) fn range_visibility(
    kind: DescriptorRangeKind,
    visibility: ShaderVisibility,
) -> wgpu::ShaderStages {
    let stages = visibility.into_wgpu();
    match kind {
        DescriptorRangeKind::ReadWriteBuffer => stages - wgpu::ShaderStages::VERTEX,
        _ => stages,
    }
}

/// The binding type of one descriptor of a table range.
pub(crate) fn range_binding_type(kind: DescriptorRangeKind) -> wgpu::BindingType {
    match kind {
        DescriptorRangeKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        DescriptorRangeKind::DepthTexture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        DescriptorRangeKind::StructuredBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        DescriptorRangeKind::ReadWriteBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        DescriptorRangeKind::ConstantBuffer => uniform_binding_type(),
    }
}

/// The binding type of a root constant buffer.
pub(crate) fn uniform_binding_type() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_formats_round_trip() {
        for format in [
            Format::Rgba8Unorm,
            Format::Bgra8UnormSrgb,
            Format::Rgba16Float,
            Format::Depth32Float,
        ] {
            let native = texture_format(format).unwrap();
            assert_eq!(format_from_wgpu(native), format);
        }
        assert!(texture_format(Format::Unknown).is_none());
        assert_eq!(
            format_from_wgpu(wgpu::TextureFormat::Rg8Unorm),
            Format::Unknown
        );
    }

    #[test]
    fn test_clockwise_front_face_and_back_culling() {
        assert_eq!(FrontFace::Clockwise.into_wgpu(), wgpu::FrontFace::Cw);
        assert_eq!(CullMode::Back.into_wgpu(), Some(wgpu::Face::Back));
        assert_eq!(CullMode::None.into_wgpu(), None);
    }

    #[test]
    fn test_writable_storage_is_hidden_from_vertex_stage() {
        let stages = range_visibility(DescriptorRangeKind::ReadWriteBuffer, ShaderVisibility::All);
        assert!(!stages.contains(wgpu::ShaderStages::VERTEX));
        assert!(stages.contains(wgpu::ShaderStages::COMPUTE));

        let stages = range_visibility(DescriptorRangeKind::StructuredBuffer, ShaderVisibility::All);
        assert!(stages.contains(wgpu::ShaderStages::VERTEX));
    }

    #[test]
    fn test_comparison_samplers_bind_as_comparison() {
        let shadow = SamplerDesc {
            comparison: Some(CompareFunction::LessEqual),
            ..SamplerDesc::POINT_CLAMP
        };
        assert_eq!(
            sampler_binding_type(&shadow),
            wgpu::SamplerBindingType::Comparison
        );
        let descriptor = sampler_descriptor(&SamplerDesc::LINEAR_WRAP);
        assert_eq!(descriptor.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(descriptor.mag_filter, wgpu::FilterMode::Linear);
    }
}
