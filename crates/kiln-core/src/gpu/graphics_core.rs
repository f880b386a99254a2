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

use super::command_context::CommandContext;
use super::command_queue::FencedQueue;
use super::descriptor_allocator::{DescriptorAllocator, DescriptorAllocators};
use super::display::Display;
use super::shader_library::ShaderLibrary;
use crate::math::LinearRgba;
use crate::renderer::{CommandQueue, GraphicsDevice, RenderError, SwapChain};
use std::path::PathBuf;
use std::sync::Arc;

/// Construction parameters of the [`GraphicsCore`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsSettings {
    /// Slots per descriptor heap.
    pub descriptor_heap_capacity: u32,
    /// The directory WGSL shaders are loaded from.
    pub shader_dir: PathBuf,
    /// The color the back buffer is cleared to each frame.
    pub clear_color: LinearRgba,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            descriptor_heap_capacity: DescriptorAllocator::DEFAULT_HEAP_CAPACITY,
            shader_dir: PathBuf::from("assets/shaders"),
            clear_color: LinearRgba::rgb(0.1, 0.25, 0.5),
        }
    }
}

/// The graphics services of one device, constructed once and passed by
/// reference to every system that records GPU work.
#[derive(Debug)]
pub struct GraphicsCore {
    /// The device.
    pub device: Arc<dyn GraphicsDevice>,
    /// Descriptor allocators, one per heap category.
    pub descriptors: DescriptorAllocators,
    /// The submission queue and its fence.
    pub queue: FencedQueue,
    /// The frame's command context.
    pub context: CommandContext,
    /// The window's swap chain.
    pub display: Display,
    /// Compiled shader modules.
    pub shaders: ShaderLibrary,
    settings: GraphicsSettings,
    last_frame_fence: u64,
}

impl GraphicsCore {
    /// Assembles the services around a backend's device, queue and swap chain.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        queue: Box<dyn CommandQueue>,
        swap_chain: Box<dyn SwapChain>,
        settings: GraphicsSettings,
    ) -> Result<Self, RenderError> {
        let mut descriptors = DescriptorAllocators::new(&device, settings.descriptor_heap_capacity);
        let display = Display::new(swap_chain, &mut descriptors.rtv, &device)?;
        let context = CommandContext::new(device.as_ref(), "frame")?;
        Ok(Self {
            shaders: ShaderLibrary::new(settings.shader_dir.clone()),
            queue: FencedQueue::new(queue),
            device,
            descriptors,
            context,
            display,
            settings,
            last_frame_fence: 0,
        })
    }

    /// Waits for the previous frame, resets the context and acquires a back buffer.
    ///
    /// The back buffer is cleared and bound as the render target.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.queue.wait_for_fence(self.last_frame_fence)?;
        self.context.reset()?;
        self.context
            .forget_destroyed_resources(self.device.as_ref());
        self.display.acquire()?;
        let heaps = self.descriptors.shader_visible_heaps();
        self.context.set_descriptor_heaps(&heaps);
        self.display
            .begin_frame(&mut self.context.graphics(), self.settings.clear_color);
        Ok(())
    }

    /// Transitions the back buffer for presentation, submits and presents.
    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        self.display.end_frame(&mut self.context);
        self.last_frame_fence = self.queue.execute(&mut self.context)?;
        self.display.present()
    }

    /// Resizes the swap chain after the GPU went idle.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.queue.wait_for_idle()?;
        self.display.resize(width, height)
    }

    /// Rebuilds the swap chain at its current size after the surface was lost.
    pub fn recover_surface(&mut self) -> Result<(), RenderError> {
        self.queue.wait_for_idle()?;
        self.display.recreate()
    }

    /// The settings the core was built with.
    pub fn settings(&self) -> &GraphicsSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::ColorBuffer;
    use crate::mock::{MockCommand, MockDevice, MockSwapChain};
    use crate::renderer::api::Format;

    #[test]
    fn test_frame_is_submitted_and_fenced() {
        let mock = MockDevice::new();
        let swap_chain = MockSwapChain::new(&mock, 64, 64).unwrap();
        let mut core = GraphicsCore::new(
            Arc::new(mock.clone()),
            Box::new(mock.create_queue()),
            Box::new(swap_chain),
            GraphicsSettings::default(),
        )
        .unwrap();

        core.begin_frame().unwrap();
        core.end_frame().unwrap();
        core.begin_frame().unwrap();
        core.end_frame().unwrap();

        let state = mock.state();
        assert_eq!(state.executed_lists, 2);
        let clears = state
            .executed
            .iter()
            .filter(|c| matches!(c, MockCommand::ClearRenderTarget(..)))
            .count();
        assert_eq!(clears, 2);
        assert!(core.queue.is_fence_complete(2));
    }

    #[test]
    fn test_lost_surface_recovers_after_recreate() {
        let mock = MockDevice::new();
        let swap_chain = MockSwapChain::new(&mock, 64, 64).unwrap().with_lost_surface();
        let mut core = GraphicsCore::new(
            Arc::new(mock.clone()),
            Box::new(mock.create_queue()),
            Box::new(swap_chain),
            GraphicsSettings::default(),
        )
        .unwrap();

        assert!(matches!(core.begin_frame(), Err(RenderError::SurfaceLost)));
        core.recover_surface().unwrap();
        core.begin_frame().unwrap();
        core.end_frame().unwrap();
        assert_eq!(mock.state().executed_lists, 1);
    }

    #[test]
    fn test_resized_targets_leave_no_stale_states() {
        let mock = MockDevice::new();
        let swap_chain = MockSwapChain::new(&mock, 64, 64).unwrap();
        let mut core = GraphicsCore::new(
            Arc::new(mock.clone()),
            Box::new(mock.create_queue()),
            Box::new(swap_chain),
            GraphicsSettings::default(),
        )
        .unwrap();
        let mut target = ColorBuffer::create(
            &core.device,
            &mut core.descriptors.rtv,
            &mut core.descriptors.cbv_srv_uav,
            "scene color",
            (64, 64),
            Format::Rgba16Float,
            LinearRgba::BLACK,
        )
        .unwrap();

        // Both back buffers and the target.
        for _ in 0..2 {
            core.begin_frame().unwrap();
            core.context.graphics().clear_color(&target);
            core.end_frame().unwrap();
        }
        let tracked = core.context.tracked_resources();

        for size in [(32, 32), (48, 48), (64, 64)] {
            target.resize(size.0, size.1).unwrap();
            core.begin_frame().unwrap();
            core.context.graphics().clear_color(&target);
            core.end_frame().unwrap();
        }
        assert_eq!(tracked, 3);
        assert_eq!(core.context.tracked_resources(), tracked);
    }
}
