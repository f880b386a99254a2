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

//! Defines the native contracts a graphics backend implements.
//!
//! - [`GraphicsDevice`]: creates committed resources, descriptor heaps and views,
//!   shader modules, root signatures, pipelines and command lists.
//! - [`CommandList`]: records one frame of commands.
//! - [`CommandQueue`]: executes command lists and exposes a monotonic fence.
//! - [`SwapChain`]: the ring of presentable back buffers.

mod command_list;
mod command_queue;
mod graphics_device;
mod swap_chain;

pub use self::command_list::CommandList;
pub use self::command_queue::CommandQueue;
pub use self::graphics_device::GraphicsDevice;
pub use self::swap_chain::SwapChain;
