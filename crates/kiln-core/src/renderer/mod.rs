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

//! Provides the backend-agnostic, explicit-API rendering contracts.
//!
//! This module defines the "common language" spoken between the frame core in
//! [`crate::gpu`] and a concrete backend. The vocabulary is that of an explicit
//! graphics API: committed resources with usage states, descriptor heaps and
//! handles, root signatures, pipeline state objects, command lists with
//! transition barriers, and a fenced command queue.
//!
//! This module defines the 'what'; the 'how' lives in a backend crate (the wgpu
//! backend in `kiln-infra`) which implements the [`traits`].

pub mod api;
pub mod error;
pub mod traits;

pub use self::api::*;
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::traits::{CommandList, CommandQueue, GraphicsDevice, SwapChain};
