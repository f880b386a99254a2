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

use super::error::AssetError;
use kiln_core::gpu::{DescriptorAllocator, Texture};
use kiln_core::renderer::api::GpuDescriptorHandle;
use kiln_core::renderer::{GraphicsDevice, ResourceError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct LoadedTexture {
    texture: Texture,
    table: GpuDescriptorHandle,
}

impl LoadedTexture {
    fn new(texture: Texture) -> Result<Self, ResourceError> {
        let table = texture.srv_table()?;
        Ok(Self { texture, table })
    }
}

/// Decodes image files into sampled textures, once per path.
///
/// Lookups of textures that were never loaded return a 1x1 white texture,
/// so a missing file shows up untextured instead of failing the frame.
#[derive(Debug)]
pub struct TextureManager {
    device: Arc<dyn GraphicsDevice>,
    textures: HashMap<PathBuf, LoadedTexture>,
    white: LoadedTexture,
}

impl TextureManager {
    /// Creates the manager and its white fallback.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        allocator: &mut DescriptorAllocator,
    ) -> Result<Self, ResourceError> {
        let white = LoadedTexture::new(Texture::white(&device, allocator)?)?;
        Ok(Self {
            device,
            textures: HashMap::new(),
            white,
        })
    }

    /// Loads `path` unless it is already cached and returns its table.
    pub fn load(
        &mut self,
        allocator: &mut DescriptorAllocator,
        path: impl AsRef<Path>,
    ) -> Result<GpuDescriptorHandle, AssetError> {
        let path = path.as_ref();
        if let Some(loaded) = self.textures.get(path) {
            return Ok(loaded.table);
        }
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.insert_encoded(allocator, path, &bytes)
    }

    /// Decodes an in-memory image file and caches it under `key`.
    pub fn load_from_memory(
        &mut self,
        allocator: &mut DescriptorAllocator,
        key: impl AsRef<Path>,
        bytes: &[u8],
    ) -> Result<GpuDescriptorHandle, AssetError> {
        let key = key.as_ref();
        if let Some(loaded) = self.textures.get(key) {
            return Ok(loaded.table);
        }
        self.insert_encoded(allocator, key, bytes)
    }

    fn insert_encoded(
        &mut self,
        allocator: &mut DescriptorAllocator,
        key: &Path,
        bytes: &[u8],
    ) -> Result<GpuDescriptorHandle, AssetError> {
        let image = image::load_from_memory(bytes)
            .map_err(|source| AssetError::Image {
                path: key.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let size = image.dimensions();
        let label = key.display().to_string();
        let texture = Texture::from_rgba8(&self.device, allocator, &label, size, image.as_raw())?;
        let loaded = LoadedTexture::new(texture)?;
        let table = loaded.table;
        self.textures.insert(key.to_path_buf(), loaded);
        log::debug!("Loaded texture '{label}' ({}x{})", size.0, size.1);
        Ok(table)
    }

    /// The table of a loaded texture, or of the white fallback.
    pub fn get(&self, path: impl AsRef<Path>) -> GpuDescriptorHandle {
        self.textures
            .get(path.as_ref())
            .map_or(self.white.table, |loaded| loaded.table)
    }

    /// The size of a loaded texture.
    pub fn size(&self, path: impl AsRef<Path>) -> Option<(u32, u32)> {
        self.textures
            .get(path.as_ref())
            .map(|loaded| loaded.texture.size())
    }

    /// The white fallback's table.
    pub fn white(&self) -> GpuDescriptorHandle {
        self.white.table
    }

    /// Whether `path` is cached.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.textures.contains_key(path.as_ref())
    }

    /// Number of cached textures, not counting the fallback.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::mock::MockDevice;
    use kiln_core::renderer::api::DescriptorHeapKind;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn setup() -> (MockDevice, DescriptorAllocator, TextureManager) {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::CbvSrvUav, 16);
        let manager = TextureManager::new(device, &mut allocator).unwrap();
        (mock, allocator, manager)
    }

    #[test]
    fn test_missing_texture_falls_back_to_white() {
        let (_mock, _allocator, manager) = setup();
        assert_eq!(manager.get("nowhere.png"), manager.white());
    }

    #[test]
    fn test_textures_are_cached_by_path() {
        let (mock, mut allocator, mut manager) = setup();
        let bytes = png_bytes();
        let first = manager
            .load_from_memory(&mut allocator, "red.png", &bytes)
            .unwrap();
        let resources = mock.live_resource_count();
        let second = manager
            .load_from_memory(&mut allocator, "red.png", &bytes)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.live_resource_count(), resources);
        assert_ne!(manager.get("red.png"), manager.white());
        assert_eq!(manager.size("red.png"), Some((2, 2)));
    }

    #[test]
    fn test_load_reads_from_disk() {
        let (_mock, mut allocator, mut manager) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        std::fs::write(&path, png_bytes()).unwrap();
        manager.load(&mut allocator, &path).unwrap();
        assert!(manager.contains(&path));
        assert!(manager.load(&mut allocator, dir.path().join("absent.png")).is_err());
    }
}
