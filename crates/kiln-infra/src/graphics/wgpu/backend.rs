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

use super::device::WgpuDevice;
use super::queue::WgpuCommandQueue;
use super::registry::WgpuShared;
use super::swap_chain::WgpuSwapChain;
use anyhow::{anyhow, Context, Result};
use kiln_core::renderer::api::DeviceCapabilities;
use std::sync::Arc;

/// The fewest bind groups a pipeline may need: the lit object signature uses
/// seven parameters plus its static sampler group.
const REQUIRED_BIND_GROUPS: u32 = 8;

/// Choices made once when the backend starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSettings {
    /// Present in FIFO order instead of the lowest-latency mode available.
    pub vsync: bool,
    /// Prefer a discrete adapter over an integrated one.
    pub high_performance: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            high_performance: true,
        }
    }
}

/// The device, queue and swap chain of one window, sharing a single wgpu device.
#[derive(Debug)]
pub struct WgpuBackend {
    /// Creation interface.
    pub device: WgpuDevice,
    /// The direct queue.
    pub queue: WgpuCommandQueue,
    /// The window's back buffers.
    pub swap_chain: WgpuSwapChain,
}

impl WgpuBackend {
    /// Initializes wgpu for a window surface of `size` physical pixels.
    ///
    /// ## Errors
    /// Fails if no adapter can present to the surface, or if the adapter
    /// cannot bind [`REQUIRED_BIND_GROUPS`] groups per pipeline.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: (u32, u32),
        settings: BackendSettings,
    ) -> Result<Self> {
        pollster::block_on(Self::new_async(target.into(), size, settings))
    }

    async fn new_async(
        target: wgpu::SurfaceTarget<'static>,
        (width, height): (u32, u32),
        settings: BackendSettings,
    ) -> Result<Self> {
        log::info!("Initializing the wgpu backend...");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        let surface = instance
            .create_surface(target)
            .context("Failed to create the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: if settings.high_performance {
                    wgpu::PowerPreference::HighPerformance
                } else {
                    wgpu::PowerPreference::LowPower
                },
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("No graphics adapter can present to the window")?;
        let info = adapter.get_info();
        log::info!(
            "Using graphics adapter \"{}\" ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let adapter_limits = adapter.limits();
        if adapter_limits.max_bind_groups < REQUIRED_BIND_GROUPS {
            return Err(anyhow!(
                "Adapter binds {} groups per pipeline, {} are required",
                adapter_limits.max_bind_groups,
                REQUIRED_BIND_GROUPS
            ));
        }
        let downlevel = adapter.get_downlevel_capabilities();
        let capabilities = DeviceCapabilities {
            supports_compute: downlevel
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            constant_buffer_alignment: adapter_limits.min_uniform_buffer_offset_alignment,
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("kiln device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter_limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create the logical device")?;
        device.on_uncaptured_error(Box::new(|e| {
            log::error!("wgpu uncaptured error: {e}");
        }));
        log::info!("Device capabilities: {capabilities:?}");

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("The surface reports no formats"))?;
        let present_mode = if settings.vsync {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let shared = Arc::new(WgpuShared::new(device, queue, capabilities));
        let swap_chain = WgpuSwapChain::new(shared.clone(), surface, config)?;
        Ok(Self {
            device: WgpuDevice::new(shared.clone()),
            queue: WgpuCommandQueue::new(shared),
            swap_chain,
        })
    }
}
