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

//! Post effect identities and their typed parameters.

use bytemuck::{Pod, Zeroable};
use kiln_core::math::LinearRgba;

/// The full-screen effects, in the order the chain applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PostEffectKind {
    /// Depth-discontinuity edge lines.
    Outline,
    /// Desaturation.
    GrayScale,
    /// Barrel distortion.
    LensDistortion,
    /// Depth-dependent blur.
    DepthOfField,
    /// Bright-pass glow.
    Bloom,
    /// Blur toward a screen point.
    RadialBlur,
    /// Depth fog.
    Fog,
    /// Edge darkening.
    Vignette,
    /// Final hue, saturation and value adjustment.
    HsvComposite,
}

impl PostEffectKind {
    /// Every effect, in application order.
    pub const ORDER: [PostEffectKind; 9] = [
        PostEffectKind::Outline,
        PostEffectKind::GrayScale,
        PostEffectKind::LensDistortion,
        PostEffectKind::DepthOfField,
        PostEffectKind::Bloom,
        PostEffectKind::RadialBlur,
        PostEffectKind::Fog,
        PostEffectKind::Vignette,
        PostEffectKind::HsvComposite,
    ];

    /// Position in [`ORDER`](Self::ORDER).
    pub fn index(self) -> usize {
        self as usize
    }

    /// The fragment entry point in `postprocess.wgsl`.
    pub fn entry_point(self) -> &'static str {
        match self {
            PostEffectKind::Outline => "fs_outline",
            PostEffectKind::GrayScale => "fs_grayscale",
            PostEffectKind::LensDistortion => "fs_lens_distortion",
            PostEffectKind::DepthOfField => "fs_depth_of_field",
            PostEffectKind::Bloom => "fs_bloom",
            PostEffectKind::RadialBlur => "fs_radial_blur",
            PostEffectKind::Fog => "fs_fog",
            PostEffectKind::Vignette => "fs_vignette",
            PostEffectKind::HsvComposite => "fs_hsv",
        }
    }

    /// Debug label.
    pub fn label(self) -> &'static str {
        match self {
            PostEffectKind::Outline => "outline",
            PostEffectKind::GrayScale => "grayscale",
            PostEffectKind::LensDistortion => "lens distortion",
            PostEffectKind::DepthOfField => "depth of field",
            PostEffectKind::Bloom => "bloom",
            PostEffectKind::RadialBlur => "radial blur",
            PostEffectKind::Fog => "fog",
            PostEffectKind::Vignette => "vignette",
            PostEffectKind::HsvComposite => "hsv composite",
        }
    }
}

/// The constant buffer every post effect reads. Each effect assigns its own
/// meaning to the four vectors; see the `pack` implementations.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct PostConstants {
    /// Parameters.
    pub params: [[f32; 4]; 4],
}

/// Typed parameters of one effect.
pub trait PostEffectSettings {
    /// The effect configured by these settings.
    const KIND: PostEffectKind;

    /// Packs the settings for the shader.
    fn pack(&self) -> PostConstants;
}

/// [`PostEffectKind::Outline`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct OutlineSettings {
    /// Line color.
    pub color: LinearRgba,
    /// Sampling offset in pixels.
    pub thickness: f32,
    /// Depth difference that counts as an edge.
    pub depth_threshold: f32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            color: LinearRgba::BLACK,
            thickness: 1.0,
            depth_threshold: 0.002,
        }
    }
}

impl PostEffectSettings for OutlineSettings {
    const KIND: PostEffectKind = PostEffectKind::Outline;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                self.color.to_array(),
                [self.thickness, self.depth_threshold, 0.0, 0.0],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::GrayScale`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GrayScaleSettings {
    /// Blend between the source (0) and full gray (1).
    pub intensity: f32,
}

impl Default for GrayScaleSettings {
    fn default() -> Self {
        Self { intensity: 1.0 }
    }
}

impl PostEffectSettings for GrayScaleSettings {
    const KIND: PostEffectKind = PostEffectKind::GrayScale;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [[self.intensity, 0.0, 0.0, 0.0], [0.0; 4], [0.0; 4], [0.0; 4]],
        }
    }
}

/// [`PostEffectKind::LensDistortion`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LensDistortionSettings {
    /// Radial distortion coefficient; positive bulges outward.
    pub strength: f32,
    /// Scale applied after distortion to hide the borders.
    pub zoom: f32,
}

impl Default for LensDistortionSettings {
    fn default() -> Self {
        Self {
            strength: 0.2,
            zoom: 1.0,
        }
    }
}

impl PostEffectSettings for LensDistortionSettings {
    const KIND: PostEffectKind = PostEffectKind::LensDistortion;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [[self.strength, self.zoom, 0.0, 0.0], [0.0; 4], [0.0; 4], [0.0; 4]],
        }
    }
}

/// [`PostEffectKind::DepthOfField`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DepthOfFieldSettings {
    /// Depth buffer value in focus.
    pub focus_depth: f32,
    /// Depth range around the focus that stays sharp.
    pub focus_range: f32,
    /// Maximum blur radius in pixels.
    pub blur_radius: f32,
}

impl Default for DepthOfFieldSettings {
    fn default() -> Self {
        Self {
            focus_depth: 0.98,
            focus_range: 0.01,
            blur_radius: 4.0,
        }
    }
}

impl PostEffectSettings for DepthOfFieldSettings {
    const KIND: PostEffectKind = PostEffectKind::DepthOfField;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                [self.focus_depth, self.focus_range, self.blur_radius, 0.0],
                [0.0; 4],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::Bloom`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct BloomSettings {
    /// Luminance above which pixels glow.
    pub threshold: f32,
    /// Strength of the added glow.
    pub intensity: f32,
    /// Blur radius in pixels.
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            intensity: 1.0,
            radius: 4.0,
        }
    }
}

impl PostEffectSettings for BloomSettings {
    const KIND: PostEffectKind = PostEffectKind::Bloom;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                [self.threshold, self.intensity, self.radius, 0.0],
                [0.0; 4],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::RadialBlur`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RadialBlurSettings {
    /// Blur center in texture coordinates.
    pub center: [f32; 2],
    /// Sample spread toward the center.
    pub strength: f32,
    /// Number of samples along each ray.
    pub samples: u32,
}

impl Default for RadialBlurSettings {
    fn default() -> Self {
        Self {
            center: [0.5, 0.5],
            strength: 0.1,
            samples: 10,
        }
    }
}

impl PostEffectSettings for RadialBlurSettings {
    const KIND: PostEffectKind = PostEffectKind::RadialBlur;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                [
                    self.center[0],
                    self.center[1],
                    self.strength,
                    self.samples.max(1) as f32,
                ],
                [0.0; 4],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::Fog`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FogSettings {
    /// Fog color.
    pub color: LinearRgba,
    /// Depth buffer value where fog starts.
    pub start: f32,
    /// Exponential density.
    pub density: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            color: LinearRgba::rgb(0.7, 0.75, 0.8),
            start: 0.9,
            density: 8.0,
        }
    }
}

impl PostEffectSettings for FogSettings {
    const KIND: PostEffectKind = PostEffectKind::Fog;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                self.color.to_array(),
                [self.start, self.density, 0.0, 0.0],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::Vignette`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct VignetteSettings {
    /// Darkening color.
    pub color: LinearRgba,
    /// Scale of the falloff.
    pub scale: f32,
    /// Exponent of the falloff.
    pub power: f32,
}

impl Default for VignetteSettings {
    fn default() -> Self {
        Self {
            color: LinearRgba::BLACK,
            scale: 16.0,
            power: 0.8,
        }
    }
}

impl PostEffectSettings for VignetteSettings {
    const KIND: PostEffectKind = PostEffectKind::Vignette;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                self.color.to_array(),
                [self.scale, self.power, 0.0, 0.0],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// [`PostEffectKind::HsvComposite`] parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct HsvSettings {
    /// Hue rotation in turns.
    pub hue: f32,
    /// Saturation offset.
    pub saturation: f32,
    /// Value offset.
    pub value: f32,
}

impl Default for HsvSettings {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            value: 0.0,
        }
    }
}

impl PostEffectSettings for HsvSettings {
    const KIND: PostEffectKind = PostEffectKind::HsvComposite;

    fn pack(&self) -> PostConstants {
        PostConstants {
            params: [
                [self.hue, self.saturation, self.value, 0.0],
                [0.0; 4],
                [0.0; 4],
                [0.0; 4],
            ],
        }
    }
}

/// The default constants of an effect.
pub(crate) fn default_constants(kind: PostEffectKind) -> PostConstants {
    match kind {
        PostEffectKind::Outline => OutlineSettings::default().pack(),
        PostEffectKind::GrayScale => GrayScaleSettings::default().pack(),
        PostEffectKind::LensDistortion => LensDistortionSettings::default().pack(),
        PostEffectKind::DepthOfField => DepthOfFieldSettings::default().pack(),
        PostEffectKind::Bloom => BloomSettings::default().pack(),
        PostEffectKind::RadialBlur => RadialBlurSettings::default().pack(),
        PostEffectKind::Fog => FogSettings::default().pack(),
        PostEffectKind::Vignette => VignetteSettings::default().pack(),
        PostEffectKind::HsvComposite => HsvSettings::default().pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_index() {
        for (i, kind) in PostEffectKind::ORDER.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(std::mem::size_of::<PostConstants>(), 64);
    }

    #[test]
    fn test_radial_blur_never_packs_zero_samples() {
        let settings = RadialBlurSettings {
            samples: 0,
            ..RadialBlurSettings::default()
        };
        assert_eq!(settings.pack().params[0][3], 1.0);
    }
}
