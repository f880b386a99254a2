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

//! The `winit` window the engine renders into.

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use std::sync::Arc;
use winit::{
    dpi::LogicalSize,
    error::OsError,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

/// A shared handle to a `winit` window.
///
/// Clones refer to the same window, so one can be handed to the graphics
/// backend as its surface target while the application keeps another.
#[derive(Debug, Clone)]
pub struct WinitWindow {
    inner: Arc<Window>,
}

/// Builds [`WinitWindow`]s.
#[derive(Debug, Clone)]
pub struct WinitWindowBuilder {
    title: String,
    width: u32,
    height: u32,
    resizable: bool,
}

impl WinitWindowBuilder {
    /// A 1280x720 resizable window titled "kiln".
    pub fn new() -> Self {
        Self {
            title: "kiln".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner size in logical pixels.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether the user may resize the window.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Creates the window on `event_loop`.
    ///
    /// # Errors
    /// Returns an `OsError` if the platform refuses to create the window.
    pub fn build(self, event_loop: &ActiveEventLoop) -> Result<WinitWindow, OsError> {
        log::info!(
            "Creating window '{}' ({}x{})",
            self.title,
            self.width,
            self.height
        );
        let attributes = Window::default_attributes()
            .with_title(self.title)
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
            .with_visible(true);
        let window = event_loop.create_window(attributes)?;
        log::debug!("Window {:?} created", window.id());
        Ok(WinitWindow {
            inner: Arc::new(window),
        })
    }
}

impl Default for WinitWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WinitWindow {
    /// The physical size of the client area.
    pub fn inner_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    /// The display's scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.inner.scale_factor()
    }

    /// Schedules a `RedrawRequested` event.
    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    /// Replaces the title, for instance with frame statistics.
    pub fn set_title(&self, title: &str) {
        self.inner.set_title(title);
    }

    /// The id events for this window carry.
    pub fn id(&self) -> WindowId {
        self.inner.id()
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}
