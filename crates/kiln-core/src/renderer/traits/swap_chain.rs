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

use crate::renderer::api::{Format, ResourceId};
use crate::renderer::error::RenderError;

/// The ring of presentable back buffers bound to a window.
///
/// Back buffers are committed resources created in the
/// [`Present`](crate::renderer::api::ResourceState::Present) state; their ids
/// stay stable across acquires and resizes.
pub trait SwapChain: Send {
    /// The number of back buffers in the ring.
    fn buffer_count(&self) -> u32 {
        2
    }

    /// The resource behind back buffer `index`.
    fn back_buffer(&self, index: u32) -> ResourceId;

    /// The index of the back buffer acquired last.
    fn current_back_buffer_index(&self) -> u32;

    /// The format of the back buffers.
    fn format(&self) -> Format;

    /// The size of the back buffers in pixels.
    fn size(&self) -> (u32, u32);

    /// Acquires the next back buffer and returns its index.
    ///
    /// ## Errors
    /// * `RenderError::SurfaceLost` - The surface must be resized before retrying.
    fn acquire_next_image(&mut self) -> Result<u32, RenderError>;

    /// Presents the back buffer acquired last.
    fn present(&mut self) -> Result<(), RenderError>;

    /// Recreates the back buffers at a new size.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;
}
