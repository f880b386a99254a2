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

//! Data carried by recorded commands.

use super::resource::{ResourceId, ResourceState};

/// A synchronization barrier recorded into a command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceBarrier {
    /// Moves a resource from one usage state to another.
    Transition {
        /// The resource being transitioned.
        resource: ResourceId,
        /// The state the resource is currently in.
        before: ResourceState,
        /// The state the resource moves to.
        after: ResourceState,
    },
    /// Orders unordered-access writes to a resource between two dispatches or draws.
    UnorderedAccess {
        /// The resource being written.
        resource: ResourceId,
    },
}

/// The rasterization viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Minimum depth.
    pub min_depth: f32,
    /// Maximum depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering a `width` x `height` target with the full depth range.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// The scissor rectangle, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Right edge (exclusive).
    pub right: u32,
    /// Bottom edge (exclusive).
    pub bottom: u32,
}

impl ScissorRect {
    /// A rectangle covering a `width` x `height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }
}

/// Optional capabilities a device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Whether compute pipelines can be dispatched.
    pub supports_compute: bool,
    /// The alignment required for constant buffer offsets.
    pub constant_buffer_alignment: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            supports_compute: true,
            constant_buffer_alignment: 256,
        }
    }
}
