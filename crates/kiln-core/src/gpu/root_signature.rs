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

use crate::renderer::api::{
    DescriptorRange, DescriptorRangeKind, RootParameter, RootSignatureId, RootSignatureLayout,
    SamplerDesc, ShaderVisibility, StaticSampler,
};
use crate::renderer::{GraphicsDevice, PipelineError};

/// Builder for a [`RootSignature`].
///
/// The number of parameters and static samplers is fixed up front; every slot
/// must be initialized before [`finalize`](Self::finalize) succeeds.
#[derive(Debug, Clone)]
pub struct RootSignatureDesc {
    label: String,
    parameters: Vec<Option<RootParameter>>,
    samplers: Vec<Option<StaticSampler>>,
}

impl RootSignatureDesc {
    /// Starts a description with `num_parameters` root parameters and
    /// `num_samplers` static samplers, all uninitialized.
    pub fn new(label: impl Into<String>, num_parameters: usize, num_samplers: usize) -> Self {
        Self {
            label: label.into(),
            parameters: vec![None; num_parameters],
            samplers: vec![None; num_samplers],
        }
    }

    /// Makes parameter `index` a root constant buffer view at `register`.
    pub fn init_as_constant_buffer(
        mut self,
        index: usize,
        register: u32,
        visibility: ShaderVisibility,
    ) -> Self {
        if let Some(slot) = self.parameters.get_mut(index) {
            *slot = Some(RootParameter::ConstantBuffer {
                register,
                visibility,
            });
        } else {
            log::warn!(
                "Root signature '{}': parameter {} is out of range",
                self.label,
                index
            );
        }
        self
    }

    /// Makes parameter `index` a descriptor table of `count` descriptors of
    /// `kind` starting at `base_register`.
    pub fn init_as_descriptor_range(
        mut self,
        index: usize,
        kind: DescriptorRangeKind,
        base_register: u32,
        count: u32,
        visibility: ShaderVisibility,
    ) -> Self {
        if let Some(slot) = self.parameters.get_mut(index) {
            *slot = Some(RootParameter::DescriptorTable {
                range: DescriptorRange {
                    kind,
                    base_register,
                    count,
                },
                visibility,
            });
        } else {
            log::warn!(
                "Root signature '{}': parameter {} is out of range",
                self.label,
                index
            );
        }
        self
    }

    /// Sets static sampler `index`.
    pub fn init_static_sampler(
        mut self,
        index: usize,
        register: u32,
        desc: SamplerDesc,
        visibility: ShaderVisibility,
    ) -> Self {
        if let Some(slot) = self.samplers.get_mut(index) {
            *slot = Some(StaticSampler {
                register,
                desc,
                visibility,
            });
        } else {
            log::warn!(
                "Root signature '{}': static sampler {} is out of range",
                self.label,
                index
            );
        }
        self
    }

    /// Validates the description and compiles it on `device`.
    ///
    /// ## Errors
    /// * `PipelineError::IncompleteDescription` - A parameter or sampler was never initialized.
    /// * `PipelineError::InvalidRootSignature` - A descriptor table is empty.
    pub fn finalize(&self, device: &dyn GraphicsDevice) -> Result<RootSignature, PipelineError> {
        let layout = self.layout()?;
        let id = device.create_root_signature(&layout)?;
        log::debug!(
            "Finalized root signature '{}' ({} parameters, {} samplers)",
            layout.label,
            layout.parameters.len(),
            layout.static_samplers.len()
        );
        Ok(RootSignature { id, layout })
    }

    fn layout(&self) -> Result<RootSignatureLayout, PipelineError> {
        let parameters = self
            .parameters
            .iter()
            .map(|p| {
                p.ok_or_else(|| PipelineError::IncompleteDescription {
                    label: self.label.clone(),
                    missing: "root parameter",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let static_samplers = self
            .samplers
            .iter()
            .map(|s| {
                s.ok_or_else(|| PipelineError::IncompleteDescription {
                    label: self.label.clone(),
                    missing: "static sampler",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(i) = parameters.iter().position(|p| {
            matches!(p, RootParameter::DescriptorTable { range, .. } if range.count == 0)
        }) {
            return Err(PipelineError::InvalidRootSignature {
                label: self.label.clone(),
                details: format!("descriptor table at parameter {i} is empty"),
            });
        }

        Ok(RootSignatureLayout {
            label: self.label.clone(),
            parameters,
            static_samplers,
        })
    }
}

/// A finalized, immutable root signature.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSignature {
    id: RootSignatureId,
    layout: RootSignatureLayout,
}

impl RootSignature {
    /// The backend handle.
    pub fn id(&self) -> RootSignatureId {
        self.id
    }

    /// The validated layout.
    pub fn layout(&self) -> &RootSignatureLayout {
        &self.layout
    }

    /// The number of root parameters.
    pub fn num_parameters(&self) -> usize {
        self.layout.parameters.len()
    }

    /// The parameter at `index`.
    pub fn parameter(&self, index: usize) -> Option<&RootParameter> {
        self.layout.parameters.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    #[test]
    fn test_uninitialized_parameter_is_rejected() {
        let device = MockDevice::new();
        let desc = RootSignatureDesc::new("partial", 2, 0).init_as_constant_buffer(
            0,
            0,
            ShaderVisibility::All,
        );

        let result = desc.finalize(&device);

        assert!(matches!(
            result,
            Err(PipelineError::IncompleteDescription {
                missing: "root parameter",
                ..
            })
        ));
        assert!(device.state().root_signatures.is_empty());
    }

    #[test]
    fn test_uninitialized_sampler_is_rejected() {
        let device = MockDevice::new();
        let desc = RootSignatureDesc::new("no sampler", 0, 1);
        assert!(matches!(
            desc.finalize(&device),
            Err(PipelineError::IncompleteDescription {
                missing: "static sampler",
                ..
            })
        ));
    }

    #[test]
    fn test_finalized_layout_keeps_slot_order() {
        let device = MockDevice::new();
        let root = RootSignatureDesc::new("object", 2, 1)
            .init_as_constant_buffer(0, 0, ShaderVisibility::Vertex)
            .init_as_descriptor_range(
                1,
                DescriptorRangeKind::Texture,
                0,
                1,
                ShaderVisibility::Pixel,
            )
            .init_static_sampler(0, 0, SamplerDesc::LINEAR_WRAP, ShaderVisibility::Pixel)
            .finalize(&device)
            .expect("complete description");

        assert_eq!(root.num_parameters(), 2);
        assert!(matches!(
            root.parameter(1),
            Some(RootParameter::DescriptorTable { .. })
        ));
        assert_eq!(root.layout().sampler_group(), Some(2));
        assert_eq!(
            device.state().root_signatures.get(&root.id()),
            Some(root.layout())
        );
    }

    #[test]
    fn test_empty_table_is_invalid() {
        let device = MockDevice::new();
        let desc = RootSignatureDesc::new("empty", 1, 0).init_as_descriptor_range(
            0,
            DescriptorRangeKind::StructuredBuffer,
            0,
            0,
            ShaderVisibility::All,
        );
        assert!(matches!(
            desc.finalize(&device),
            Err(PipelineError::InvalidRootSignature { .. })
        ));
    }
}
