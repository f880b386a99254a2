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

//! # Kiln Lanes
//!
//! The hot-path systems of the engine, built on `kiln-core`'s frame core.
//! Each lane is an explicitly constructed service: it creates its root
//! signatures and pipelines once from a [`GraphicsCore`](kiln_core::GraphicsCore)
//! and records its passes into the frame's command context.
//!
//! - [`render_lane`]: per-frame submission queues and their replay.
//! - [`post_lane`]: the fixed-order post-process chain.
//! - [`particle_lane`]: GPU particle groups and their emitters.
//! - [`trail_lane`]: ribbon trails.
//! - [`asset_lane`]: OBJ and image loading with the model and texture caches.

#![warn(missing_docs)]

pub mod asset_lane;
pub mod particle_lane;
pub mod post_lane;
pub mod render_lane;
pub mod trail_lane;
