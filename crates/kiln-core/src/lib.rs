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

//! # Kiln Core
//!
//! Foundational crate of the Kiln engine. It owns the explicit GPU resource
//! model (committed resources, descriptor heaps, root signatures, pipeline
//! states, resource-state transitions, fences) and the native contracts a
//! graphics backend has to satisfy to drive it.

#![warn(missing_docs)]

pub mod gpu;
pub mod math;
pub mod renderer;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gpu::GraphicsCore;
