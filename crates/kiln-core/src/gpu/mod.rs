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

//! The GPU resource and frame-recording core.
//!
//! These types sit on top of the native contracts in [`crate::renderer`] and
//! give them ownership and bookkeeping:
//!
//! - [`GpuResource`] and the buffer family own committed allocations.
//! - [`DescriptorAllocator`] hands out descriptor slots from a growing pool of heaps.
//! - [`RootSignature`], [`GraphicsPso`] and [`ComputePso`] are finalized, immutable
//!   binding contracts and pipeline states.
//! - [`CommandContext`] records a frame and is the only place resource states change.
//! - [`FencedQueue`] and [`Display`] submit, synchronize and present.
//! - [`GraphicsCore`] bundles them into one explicitly constructed service.

mod blend;
mod buffer;
mod command_context;
mod command_queue;
mod descriptor_allocator;
mod display;
mod graphics_core;
mod pipeline_state;
mod pixel_buffer;
mod resource;
mod root_signature;
mod shader_library;
mod state_tracker;

pub use self::blend::{BlendMode, DepthWrite, PsoMatrix};
pub use self::buffer::{ConstantBuffer, ReadWriteBuffer, StructuredBuffer, UploadBuffer};
pub use self::command_context::{CommandContext, ComputeContext, FrameStats, GraphicsContext};
pub use self::command_queue::FencedQueue;
pub use self::descriptor_allocator::{DescriptorAllocator, DescriptorAllocators};
pub use self::display::{BackBuffer, Display};
pub use self::graphics_core::{GraphicsCore, GraphicsSettings};
pub use self::pipeline_state::{ComputePso, ComputePsoDesc, GraphicsPso, GraphicsPsoDesc};
pub use self::pixel_buffer::{ColorBuffer, DepthBuffer, Texture};
pub use self::resource::{AsResource, GpuResource, ResourceHandle};
pub use self::root_signature::{RootSignature, RootSignatureDesc};
pub use self::shader_library::ShaderLibrary;
pub use self::state_tracker::{ResourceStateTracker, ResourceUsage};

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

/// The alignment of constant buffers and constant buffer views.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;
