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


//! Asset lane: OBJ models and image textures, loaded once and cached.

mod error;
mod model_manager;
mod obj_loader;
mod texture_manager;

pub use error::AssetError;
pub use model_manager::{Model, ModelManager};
pub use obj_loader::{load_obj, load_obj_from_reader, ObjMesh};
pub use texture_manager::TextureManager;
