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

//! The engine configuration read from `kiln.ron`.
//!
//! Every field has a default, so a file only needs to name what it changes
//! and a missing file means "all defaults".

use anyhow::{Context, Result};
use kiln_core::gpu::GraphicsSettings;
use kiln_core::math::LinearRgba;
use kiln_infra::BackendSettings;
use kiln_lanes::post_lane::{
    BloomSettings, DepthOfFieldSettings, FogSettings, GrayScaleSettings, HsvSettings,
    LensDistortionSettings, OutlineSettings, PostEffectKind, RadialBlurSettings,
    VignetteSettings,
};
use kiln_lanes::render_lane::RendererSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The file the runtime looks for in its working directory.
pub const DEFAULT_CONFIG_PATH: &str = "kiln.ron";

/// The whole configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The main window.
    pub window: WindowConfig,
    /// Backend and frame core.
    pub graphics: GraphicsConfig,
    /// Where assets are read from.
    pub assets: AssetConfig,
    /// The post-process chain.
    pub post: PostConfig,
}

/// The main window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text.
    pub title: String,
    /// Initial width in logical pixels.
    pub width: u32,
    /// Initial height in logical pixels.
    pub height: u32,
    /// Whether the user may resize the window.
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "kiln".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Backend and frame core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Present in FIFO order.
    pub vsync: bool,
    /// Prefer a discrete adapter.
    pub high_performance: bool,
    /// Slots per descriptor heap.
    pub descriptor_heap_capacity: u32,
    /// Edge length of the shadow map.
    pub shadow_map_size: u32,
    /// Linear RGBA the scene is cleared to.
    pub clear_color: LinearRgba,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            high_performance: true,
            descriptor_heap_capacity: 256,
            shadow_map_size: 2048,
            clear_color: LinearRgba::rgb(0.1, 0.25, 0.5),
        }
    }
}

impl GraphicsConfig {
    /// Settings for the wgpu backend.
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            vsync: self.vsync,
            high_performance: self.high_performance,
        }
    }

    /// Settings for the frame core, loading shaders from `shader_dir`.
    pub fn core_settings(&self, shader_dir: &Path) -> GraphicsSettings {
        GraphicsSettings {
            descriptor_heap_capacity: self.descriptor_heap_capacity,
            shader_dir: shader_dir.to_path_buf(),
            clear_color: LinearRgba::BLACK,
        }
    }

    /// Settings for the renderer's targets at `size`.
    pub fn renderer_settings(&self, size: (u32, u32)) -> RendererSettings {
        RendererSettings {
            size,
            shadow_map_size: self.shadow_map_size,
            clear_color: self.clear_color,
        }
    }
}

/// Where assets are read from, relative to the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// WGSL sources.
    pub shader_dir: PathBuf,
    /// OBJ models and their textures.
    pub models_dir: PathBuf,
    /// The model the demo scene spins.
    pub demo_model: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("assets/shaders"),
            models_dir: PathBuf::from("assets/models"),
            demo_model: "cube.obj".to_string(),
        }
    }
}

/// The post-process chain: which effects run and their parameters.
///
/// The chain always applies effects in its fixed order; the order of
/// `enabled` does not matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Effects switched on at startup.
    pub enabled: Vec<PostEffectKind>,
    #[allow(missing_docs)]
    pub outline: OutlineSettings,
    #[allow(missing_docs)]
    pub gray_scale: GrayScaleSettings,
    #[allow(missing_docs)]
    pub lens_distortion: LensDistortionSettings,
    #[allow(missing_docs)]
    pub depth_of_field: DepthOfFieldSettings,
    #[allow(missing_docs)]
    pub bloom: BloomSettings,
    #[allow(missing_docs)]
    pub radial_blur: RadialBlurSettings,
    #[allow(missing_docs)]
    pub fog: FogSettings,
    #[allow(missing_docs)]
    pub vignette: VignetteSettings,
    #[allow(missing_docs)]
    pub hsv: HsvSettings,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            enabled: vec![PostEffectKind::Bloom, PostEffectKind::Vignette],
            outline: OutlineSettings::default(),
            gray_scale: GrayScaleSettings::default(),
            lens_distortion: LensDistortionSettings::default(),
            depth_of_field: DepthOfFieldSettings::default(),
            bloom: BloomSettings::default(),
            radial_blur: RadialBlurSettings::default(),
            fog: FogSettings::default(),
            vignette: VignetteSettings::default(),
            hsv: HsvSettings::default(),
        }
    }
}

impl PostConfig {
    /// Whether `kind` is switched on.
    pub fn is_enabled(&self, kind: PostEffectKind) -> bool {
        self.enabled.contains(&kind)
    }
}

impl EngineConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).context("Invalid engine configuration")
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No configuration at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let config = Self::from_ron(&text).with_context(|| format!("In '{}'", path.display()))?;
        log::info!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("kiln.ron")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.graphics.descriptor_heap_capacity, 256);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "(window: (title: \"demo\", width: 640), post: (enabled: [Fog], fog: (density: 2.0)))"
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.window.title, "demo");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert!(config.post.is_enabled(PostEffectKind::Fog));
        assert!(!config.post.is_enabled(PostEffectKind::Bloom));

        assert_eq!(config.post.fog.density, 2.0);
        assert_eq!(config.post.fog.start, FogSettings::default().start);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(window: (width: \"wide\"))").unwrap();
        assert!(EngineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_unknown_effect_is_rejected() {
        assert!(EngineConfig::from_ron("(post: (enabled: [Sparkles]))").is_err());
    }

    #[test]
    fn test_bundled_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../kiln.ron");
        let config = EngineConfig::load(path).unwrap();
        assert_eq!(config.assets.demo_model, "cube.obj");
        assert_eq!(config.graphics.clear_color, LinearRgba::rgb(0.1, 0.25, 0.5));
        assert_eq!(config.post.vignette.color, LinearRgba::BLACK);
    }

    #[test]
    fn test_settings_conversions() {
        let graphics = GraphicsConfig {
            vsync: false,
            shadow_map_size: 1024,
            ..GraphicsConfig::default()
        };
        assert!(!graphics.backend_settings().vsync);
        let renderer = graphics.renderer_settings((320, 200));
        assert_eq!(renderer.size, (320, 200));
        assert_eq!(renderer.shadow_map_size, 1024);
    }

    #[test]
    fn test_settings_are_read_in_place() {
        let config = EngineConfig::from_ron(
            "(post: (outline: (color: (1.0, 0.0, 0.0, 1.0)), radial_blur: (samples: 4)))",
        )
        .unwrap();
        assert_eq!(config.post.outline.color, LinearRgba::rgb(1.0, 0.0, 0.0));
        assert_eq!(
            config.post.outline.thickness,
            OutlineSettings::default().thickness
        );
        assert_eq!(config.post.radial_blur.samples, 4);
        assert_eq!(config.post.radial_blur.center, [0.5, 0.5]);
    }
}
