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

//! The `winit` application driving the [`Engine`].

use crate::config::EngineConfig;
use crate::engine::Engine;
use anyhow::{anyhow, Context, Result};
use kiln_core::GraphicsCore;
use kiln_infra::{WgpuBackend, WinitWindow, WinitWindowBuilder};
use kiln_lanes::post_lane::PostEffectKind;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

const TITLE_REFRESH: Duration = Duration::from_secs(1);

/// Event loop state. The window and engine only exist after `resumed`.
struct App {
    config: EngineConfig,
    window: Option<WinitWindow>,
    engine: Option<Engine>,
    last_frame: Instant,
    title_updated: Instant,
    frames_since_title: u32,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            window: None,
            engine: None,
            last_frame: now,
            title_updated: now,
            frames_since_title: 0,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = WinitWindowBuilder::new()
            .with_title(self.config.window.title.clone())
            .with_dimensions(self.config.window.width, self.config.window.height)
            .with_resizable(self.config.window.resizable)
            .build(event_loop)
            .context("Failed to create the window")?;

        let backend = WgpuBackend::new(
            window.clone(),
            window.inner_size(),
            self.config.graphics.backend_settings(),
        )?;
        let core = GraphicsCore::new(
            Arc::new(backend.device),
            Box::new(backend.queue),
            Box::new(backend.swap_chain),
            self.config.graphics.core_settings(&self.config.assets.shader_dir),
        )?;
        let engine = Engine::new(core, &self.config)?;

        self.window = Some(window);
        self.engine = Some(engine);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(engine), Some(window)) = (self.engine.as_mut(), self.window.as_ref()) else {
            return Ok(());
        };
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if let Some(stats) = engine.frame(delta_time)? {
            self.frames_since_title += 1;
            let since = now.duration_since(self.title_updated);
            if since >= TITLE_REFRESH {
                let fps = self.frames_since_title as f32 / since.as_secs_f32();
                window.set_title(&format!(
                    "{} | {fps:.0} fps | {} draws, {} dispatches, {} pipeline switches",
                    self.config.window.title,
                    stats.draw_calls,
                    stats.dispatches,
                    stats.pipeline_switches
                ));
                self.title_updated = now;
                self.frames_since_title = 0;
            }
        }
        Ok(())
    }

    /// Digits 1 to 9 toggle the post effects in chain order.
    fn toggle_effect(&mut self, key: KeyCode) {
        const DIGITS: [KeyCode; 9] = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
            KeyCode::Digit6,
            KeyCode::Digit7,
            KeyCode::Digit8,
            KeyCode::Digit9,
        ];
        let (Some(engine), Some(index)) =
            (self.engine.as_mut(), DIGITS.iter().position(|d| *d == key))
        else {
            return;
        };
        let kind = PostEffectKind::ORDER[index];
        let post = engine.post_mut();
        let enabled = !post.is_enabled(kind);
        post.set_enabled(kind, enabled);
        let state = if enabled { "on" } else { "off" };
        log::info!("Post effect '{}' {state}", kind.label());
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(WinitWindow::id) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested, exiting event loop...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(engine) = self.engine.as_mut() {
                    if let Err(e) = engine.resize(size.width, size.height) {
                        self.fail(event_loop, e.into());
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape {
                    event_loop.exit();
                } else {
                    self.toggle_effect(code);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Opens the window and runs frames until it is closed.
///
/// Blocks the calling thread. Returns the first error any frame raised.
pub fn run(config: EngineConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.error {
        Some(error) => Err(error),
        None if app.engine.is_none() => {
            Err(anyhow!("The event loop ended before the engine started"))
        }
        None => {
            log::info!(
                "Engine stopped after {} frames",
                app.engine.as_ref().map_or(0, Engine::frame_index)
            );
            Ok(())
        }
    }
}
