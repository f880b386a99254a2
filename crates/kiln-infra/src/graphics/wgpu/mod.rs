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

//! The `wgpu` implementation of the native graphics contracts.
//!
//! wgpu has no descriptor heaps, root signatures or transition barriers, so
//! this backend emulates them:
//!
//! - Descriptor heaps are CPU-side slot arrays. A descriptor remembers what it
//!   views and is resolved into a `wgpu::BindGroup` when a table is bound.
//! - A root signature becomes one bind group layout per root parameter, plus a
//!   trailing group holding every static sampler.
//! - Command lists record into a plain command vector and are translated into
//!   render and compute passes at submission. Barriers are left to wgpu's own
//!   usage tracking.

mod backend;
mod command;
mod conversions;
mod device;
mod queue;
mod registry;
mod swap_chain;

pub use self::backend::{BackendSettings, WgpuBackend};
pub use self::command::WgpuCommandList;
pub use self::device::WgpuDevice;
pub use self::queue::WgpuCommandQueue;
pub use self::swap_chain::WgpuSwapChain;
