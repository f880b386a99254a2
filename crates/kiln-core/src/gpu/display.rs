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

use super::command_context::{CommandContext, GraphicsContext};
use super::descriptor_allocator::DescriptorAllocator;
use super::resource::{AsResource, ResourceHandle};
use crate::math::LinearRgba;
use crate::renderer::api::{CpuDescriptorHandle, DescriptorHandle, Format, ResourceState};
use crate::renderer::{GraphicsDevice, RenderError, SwapChain};
use std::sync::Arc;

/// One swap chain image and its render target view.
#[derive(Debug, Clone, Copy)]
pub struct BackBuffer {
    handle: ResourceHandle,
    rtv: DescriptorHandle,
}

impl BackBuffer {
    /// The render target view.
    pub fn rtv(&self) -> CpuDescriptorHandle {
        self.rtv.cpu()
    }
}

impl AsResource for BackBuffer {
    fn resource_handle(&self) -> ResourceHandle {
        self.handle
    }
}

/// The window's swap chain with a render target view per back buffer.
///
/// Back buffers rest in `Present` between frames; [`begin_frame`](Self::begin_frame)
/// and [`end_frame`](Self::end_frame) move the current one in and out of
/// `RenderTarget` through the command context.
pub struct Display {
    device: Arc<dyn GraphicsDevice>,
    swap_chain: Box<dyn SwapChain>,
    back_buffers: Vec<BackBuffer>,
    current: u32,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("size", &self.swap_chain.size())
            .field("format", &self.swap_chain.format())
            .field("back_buffers", &self.back_buffers)
            .field("current", &self.current)
            .finish()
    }
}

impl Display {
    /// Creates render target views for every back buffer of `swap_chain`.
    pub fn new(
        swap_chain: Box<dyn SwapChain>,
        rtv_allocator: &mut DescriptorAllocator,
        device: &Arc<dyn GraphicsDevice>,
    ) -> Result<Self, RenderError> {
        let mut back_buffers = Vec::with_capacity(swap_chain.buffer_count() as usize);
        for i in 0..swap_chain.buffer_count() {
            let rtv = rtv_allocator.allocate()?;
            let id = swap_chain.back_buffer(i);
            device.create_render_target_view(id, rtv.cpu())?;
            back_buffers.push(BackBuffer {
                handle: ResourceHandle {
                    id,
                    initial_state: ResourceState::Present,
                },
                rtv,
            });
        }
        let (width, height) = swap_chain.size();
        log::info!(
            "Display created: {}x{} {:?}, {} back buffers",
            width,
            height,
            swap_chain.format(),
            back_buffers.len()
        );
        Ok(Self {
            device: device.clone(),
            current: swap_chain.current_back_buffer_index(),
            swap_chain,
            back_buffers,
        })
    }

    /// Acquires the next back buffer and returns its index.
    pub fn acquire(&mut self) -> Result<u32, RenderError> {
        self.current = self.swap_chain.acquire_next_image()?;
        Ok(self.current)
    }

    /// The back buffer acquired last.
    pub fn back_buffer(&self) -> &BackBuffer {
        &self.back_buffers[self.current as usize % self.back_buffers.len()]
    }

    /// Index of the back buffer acquired last.
    pub fn current_index(&self) -> u32 {
        self.current
    }

    /// Makes the current back buffer the render target and clears it.
    pub fn begin_frame(&self, gfx: &mut GraphicsContext<'_>, clear_color: LinearRgba) {
        let back_buffer = *self.back_buffer();
        let (width, height) = self.size();
        gfx.clear_render_target(&back_buffer, back_buffer.rtv(), clear_color.to_array());
        gfx.set_render_targets(&[back_buffer.rtv()], None);
        gfx.set_viewport_and_scissor(width, height);
    }

    /// Returns the current back buffer to `Present`.
    pub fn end_frame(&self, ctx: &mut CommandContext) {
        let back_buffer = *self.back_buffer();
        ctx.transition_resource(&back_buffer, ResourceState::Present);
        ctx.flush_resource_barriers();
    }

    /// Presents the current back buffer.
    pub fn present(&mut self) -> Result<(), RenderError> {
        self.swap_chain.present()
    }

    /// Resizes the swap chain and rewrites the back buffer views in place.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 || (width, height) == self.size() {
            return Ok(());
        }
        self.rebuild(width, height)?;
        log::info!("Display resized to {}x{}", width, height);
        Ok(())
    }

    /// Reconfigures the swap chain at its current size, even if nothing changed.
    ///
    /// Used after the surface was lost or went out of date.
    pub fn recreate(&mut self) -> Result<(), RenderError> {
        let (width, height) = self.size();
        self.rebuild(width.max(1), height.max(1))?;
        log::info!("Display recreated at {}x{}", width, height);
        Ok(())
    }

    fn rebuild(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.swap_chain.resize(width, height)?;
        for (i, back_buffer) in self.back_buffers.iter_mut().enumerate() {
            let id = self.swap_chain.back_buffer(i as u32);
            self.device
                .create_render_target_view(id, back_buffer.rtv.cpu())?;
            back_buffer.handle.id = id;
        }
        Ok(())
    }

    /// The size of the back buffers in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.swap_chain.size()
    }

    /// The back buffer format.
    pub fn format(&self) -> Format {
        self.swap_chain.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{recorded_commands, MockCommand, MockDevice, MockSwapChain};
    use crate::renderer::api::{DescriptorHeapKind, ResourceBarrier};

    fn display(mock: &MockDevice) -> (Display, Arc<dyn GraphicsDevice>) {
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut rtv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Rtv, 8);
        let swap_chain = MockSwapChain::new(mock, 320, 240).unwrap();
        (
            Display::new(Box::new(swap_chain), &mut rtv, &device).unwrap(),
            device,
        )
    }

    #[test]
    fn test_frame_moves_back_buffer_through_render_target() {
        let mock = MockDevice::new();
        let (mut display, device) = display(&mock);
        let mut ctx = CommandContext::new(device.as_ref(), "frame").unwrap();

        assert_eq!(display.acquire().unwrap(), 0);
        display.begin_frame(&mut ctx.graphics(), LinearRgba::BLACK);
        display.end_frame(&mut ctx);

        let id = display.back_buffer().resource_handle().id;
        let barriers: Vec<_> = recorded_commands(ctx.native_mut())
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::Barrier(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(
            barriers,
            vec![
                ResourceBarrier::Transition {
                    resource: id,
                    before: ResourceState::Present,
                    after: ResourceState::RenderTarget,
                },
                ResourceBarrier::Transition {
                    resource: id,
                    before: ResourceState::RenderTarget,
                    after: ResourceState::Present,
                },
            ]
        );
    }

    #[test]
    fn test_acquire_alternates_back_buffers() {
        let mock = MockDevice::new();
        let (mut display, _) = display(&mock);
        let first = {
            display.acquire().unwrap();
            display.back_buffer().rtv()
        };
        display.acquire().unwrap();
        assert_ne!(display.back_buffer().rtv(), first);
        display.acquire().unwrap();
        assert_eq!(display.back_buffer().rtv(), first);
    }

    #[test]
    fn test_resize_ignores_zero_size() {
        let mock = MockDevice::new();
        let (mut display, _) = display(&mock);
        display.resize(0, 100).unwrap();
        assert_eq!(display.size(), (320, 240));
        display.resize(640, 480).unwrap();
        assert_eq!(display.size(), (640, 480));
    }

    #[test]
    fn test_recreate_reconfigures_a_lost_surface() {
        let mock = MockDevice::new();
        let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
        let mut rtv = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::Rtv, 8);
        let swap_chain = MockSwapChain::new(&mock, 320, 240).unwrap().with_lost_surface();
        let mut display = Display::new(Box::new(swap_chain), &mut rtv, &device).unwrap();

        assert!(matches!(display.acquire(), Err(RenderError::SurfaceLost)));
        display.resize(320, 240).unwrap();
        assert!(matches!(display.acquire(), Err(RenderError::SurfaceLost)));

        display.recreate().unwrap();
        assert_eq!(display.size(), (320, 240));
        assert!(display.acquire().is_ok());
    }
}
