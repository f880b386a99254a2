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

use crate::renderer::error::RenderError;
use crate::renderer::traits::CommandList;

/// A GPU queue with a monotonic fence.
///
/// Work executed on the queue retires in submission order. `signal(v)` makes
/// the fence reach `v` once all previously executed work has retired.
pub trait CommandQueue: Send {
    /// Submits a closed command list.
    fn execute_command_list(&mut self, list: &mut dyn CommandList) -> Result<(), RenderError>;

    /// Enqueues a fence signal after all previously executed work.
    fn signal(&mut self, value: u64) -> Result<(), RenderError>;

    /// The last fence value the GPU has reached.
    fn completed_value(&self) -> u64;

    /// Blocks the calling thread until the fence reaches `value`.
    fn wait_until(&mut self, value: u64) -> Result<(), RenderError>;
}
