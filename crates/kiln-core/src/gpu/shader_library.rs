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

use crate::renderer::api::{ShaderModuleDesc, ShaderModuleId};
use crate::renderer::{GraphicsDevice, ShaderError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads WGSL files from a directory and compiles each one once.
#[derive(Debug)]
pub struct ShaderLibrary {
    root: PathBuf,
    modules: HashMap<String, ShaderModuleId>,
}

impl ShaderLibrary {
    /// Creates a library reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modules: HashMap::new(),
        }
    }

    /// Returns the module compiled from `file_name`, compiling it on first use.
    ///
    /// ## Errors
    /// * `ShaderError::LoadError` - The file cannot be read.
    /// * `ShaderError::CompilationError` - The device rejected the source.
    pub fn load(
        &mut self,
        device: &dyn GraphicsDevice,
        file_name: &str,
    ) -> Result<ShaderModuleId, ShaderError> {
        if let Some(id) = self.modules.get(file_name) {
            return Ok(*id);
        }
        let path = self.root.join(file_name);
        let source = std::fs::read_to_string(&path).map_err(|e| ShaderError::LoadError {
            path: path.display().to_string(),
            source_error: e.to_string(),
        })?;
        let id = device.create_shader_module(&ShaderModuleDesc {
            label: file_name,
            source: &source,
        })?;
        log::debug!("Compiled shader '{}'", path.display());
        self.modules.insert(file_name.to_string(), id);
        Ok(id)
    }

    /// The directory shaders are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    #[test]
    fn test_shader_is_compiled_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("copy.wgsl"), "@fragment fn fs_main() {}").unwrap();
        let device = MockDevice::new();
        let mut library = ShaderLibrary::new(dir.path());

        let a = library.load(&device, "copy.wgsl").unwrap();
        let b = library.load(&device, "copy.wgsl").unwrap();

        assert_eq!(a, b);
        assert_eq!(device.state().shader_modules.len(), 1);
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let device = MockDevice::new();
        let mut library = ShaderLibrary::new(dir.path());
        assert!(matches!(
            library.load(&device, "missing.wgsl"),
            Err(ShaderError::LoadError { .. })
        ));
    }
}
