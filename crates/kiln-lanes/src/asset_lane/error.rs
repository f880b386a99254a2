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

use kiln_core::renderer::ResourceError;
use std::path::PathBuf;

/// Errors raised while loading textures and models.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The cause.
        source: std::io::Error,
    },

    /// The OBJ or MTL data was rejected by the parser.
    #[error("Failed to parse OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),

    /// The image could not be decoded.
    #[error("Failed to decode image '{path}': {source}")]
    Image {
        /// The file.
        path: PathBuf,
        /// The cause.
        source: image::ImageError,
    },

    /// The GPU copy could not be created.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The OBJ file parsed but holds no geometry.
    #[error("'{0}' contains no models")]
    NoModels(String),
}
