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

use super::conversions::format_from_wgpu;
use super::registry::{ResourceEntry, WgpuShared};
use kiln_core::renderer::api::{Format, ResourceId};
use kiln_core::renderer::{RenderError, SwapChain};
use std::sync::Arc;

const BUFFER_COUNT: u32 = 2;

/// The `wgpu` implementation of [`SwapChain`].
///
/// wgpu hands out a fresh surface texture on every acquire. Each back buffer
/// is a registry entry with a stable [`ResourceId`] whose view is swapped in
/// at acquire and cleared at present.
#[derive(Debug)]
pub struct WgpuSwapChain {
    shared: Arc<WgpuShared>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    back_buffers: [ResourceId; BUFFER_COUNT as usize],
    current: u32,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuSwapChain {
    pub(crate) fn new(
        shared: Arc<WgpuShared>,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Result<Self, RenderError> {
        surface.configure(&shared.device, &config);
        let size = (config.width, config.height);
        let back_buffers = {
            let mut registry = shared.registry()?;
            [(); BUFFER_COUNT as usize]
                .map(|_| registry.insert_resource(ResourceEntry::BackBuffer { view: None, size }))
        };
        log::info!(
            "Swap chain configured: {}x{} {:?}, {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );
        Ok(Self {
            shared,
            surface,
            config,
            back_buffers,
            current: BUFFER_COUNT - 1,
            frame: None,
        })
    }

    fn set_view(&self, index: u32, view: Option<wgpu::TextureView>) -> Result<(), RenderError> {
        let mut registry = self.shared.registry()?;
        let size = (self.config.width, self.config.height);
        if let Some(entry) = registry.resources.get_mut(&self.back_buffers[index as usize]) {
            *entry = ResourceEntry::BackBuffer { view, size };
        }
        Ok(())
    }
}

impl SwapChain for WgpuSwapChain {
    fn buffer_count(&self) -> u32 {
        BUFFER_COUNT
    }

    fn back_buffer(&self, index: u32) -> ResourceId {
        self.back_buffers[(index % BUFFER_COUNT) as usize]
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn format(&self) -> Format {
        format_from_wgpu(self.config.format)
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn acquire_next_image(&mut self) -> Result<u32, RenderError> {
        if self.frame.is_some() {
            log::warn!("Back buffer acquired twice without present");
            self.frame = None;
        }
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                return Err(RenderError::SurfaceLost)
            }
            Err(e) => return Err(RenderError::SurfaceAcquireFailed(e.to_string())),
        };
        if frame.suboptimal {
            log::debug!("Surface texture is suboptimal");
        }
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.current = (self.current + 1) % BUFFER_COUNT;
        self.set_view(self.current, Some(view))?;
        self.frame = Some(frame);
        Ok(self.current)
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self.frame.take().ok_or_else(|| {
            RenderError::Submission("Present without an acquired back buffer".to_string())
        })?;
        self.set_view(self.current, None)?;
        frame.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.frame = None;
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.shared.device, &self.config);
        for index in 0..BUFFER_COUNT {
            self.set_view(index, None)?;
        }
        log::info!("Swap chain resized to {}x{}", self.config.width, self.config.height);
        Ok(())
    }
}
