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

//! Rendering lane: frame submission and replay.
//!
//! Gameplay code describes what to draw by pushing plain records into the
//! [`Renderer`] during update. [`Renderer::render`] decides in what order and
//! with what state: GPU skinning, the shadow pass, the geometry pass (opaque
//! then transparent, one pipeline switch per category) and debug bones.

mod constants;
mod pipelines;
mod records;
mod renderer;

pub use constants::*;
pub use pipelines::{object_slots, vertex_input_layout, RenderPipelines, SCENE_COLOR_FORMAT};
pub use records::*;
pub use renderer::{Renderer, RendererSettings};
