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
use super::obj_loader::{load_obj, ObjMesh};
use crate::render_lane::Vertex;
use kiln_core::gpu::UploadBuffer;
use kiln_core::renderer::api::{IndexBufferView, IndexFormat, VertexBufferView};
use kiln_core::renderer::{GraphicsDevice, ResourceError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A mesh uploaded for drawing.
#[derive(Debug)]
pub struct Model {
    vertex_buffer: UploadBuffer,
    index_buffer: UploadBuffer,
    vertex_count: u32,
    index_count: u32,
    diffuse_texture: Option<PathBuf>,
}

impl Model {
    /// Uploads `mesh`.
    pub fn from_mesh(
        device: &Arc<dyn GraphicsDevice>,
        name: &str,
        mesh: &ObjMesh,
    ) -> Result<Self, ResourceError> {
        let vertex_buffer = UploadBuffer::with_data(
            device,
            &format!("{name} vertices"),
            bytemuck::cast_slice(&mesh.vertices),
        )?;
        let index_buffer = UploadBuffer::with_data(
            device,
            &format!("{name} indices"),
            bytemuck::cast_slice(&mesh.indices),
        )?;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
            diffuse_texture: mesh.diffuse_texture.clone(),
        })
    }

    /// The vertices.
    pub fn vertex_buffer_view(&self) -> VertexBufferView {
        self.vertex_buffer
            .vertex_buffer_view(Vertex::STRIDE, self.vertex_count * Vertex::STRIDE)
    }

    /// The 32-bit indices.
    pub fn index_buffer_view(&self) -> IndexBufferView {
        self.index_buffer
            .index_buffer_view(IndexFormat::Uint32, self.index_count * IndexFormat::Uint32.size())
    }

    /// Indices to draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The material's diffuse texture, if the OBJ named one.
    pub fn diffuse_texture(&self) -> Option<&Path> {
        self.diffuse_texture.as_deref()
    }
}

/// Loads OBJ models once per file name.
#[derive(Debug)]
pub struct ModelManager {
    device: Arc<dyn GraphicsDevice>,
    models: HashMap<String, Model>,
}

impl ModelManager {
    /// Creates an empty manager.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            models: HashMap::new(),
        }
    }

    /// Loads `directory/file_name` unless a model of that name is cached.
    pub fn load(
        &mut self,
        directory: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<&Model, AssetError> {
        if !self.models.contains_key(file_name) {
            let mesh = load_obj(directory.as_ref().join(file_name))?;
            let model = Model::from_mesh(&self.device, file_name, &mesh)?;
            self.models.insert(file_name.to_string(), model);
        }
        self.models
            .get(file_name)
            .ok_or_else(|| AssetError::NoModels(file_name.to_string()))
    }

    /// A cached model.
    pub fn get(&self, file_name: &str) -> Option<&Model> {
        self.models.get(file_name)
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::mock::MockDevice;

    #[test]
    fn test_model_is_loaded_once_with_its_texture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tri.obj"),
            "mtllib tri.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nusemtl skin\nf 1/1 2/2 3/3\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("tri.mtl"), "newmtl skin\nmap_Kd skin.png\n").unwrap();

        let mock = MockDevice::new();
        let mut models = ModelManager::new(Arc::new(mock.clone()));
        let model = models.load(dir.path(), "tri.obj").unwrap();
        assert_eq!(model.index_count(), 3);
        assert_eq!(model.diffuse_texture(), Some(dir.path().join("skin.png").as_path()));

        let resources = mock.live_resource_count();
        models.load(dir.path(), "tri.obj").unwrap();
        assert_eq!(mock.live_resource_count(), resources);
        assert!(models.get("absent.obj").is_none());
    }
}
