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

use super::command::WgpuCommandList;
use super::registry::WgpuShared;
use kiln_core::renderer::{CommandList, CommandQueue, RenderError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The `wgpu` implementation of [`CommandQueue`].
///
/// The fence is emulated with `on_submitted_work_done` callbacks: each signal
/// registers one that raises the completed value once everything submitted
/// before it has retired.
#[derive(Debug)]
pub struct WgpuCommandQueue {
    shared: Arc<WgpuShared>,
    completed: Arc<AtomicU64>,
    last_signaled: u64,
}

impl WgpuCommandQueue {
    pub(crate) fn new(shared: Arc<WgpuShared>) -> Self {
        Self {
            shared,
            completed: Arc::new(AtomicU64::new(0)),
            last_signaled: 0,
        }
    }

    fn poll(&self, poll_type: wgpu::PollType) -> Result<(), RenderError> {
        self.shared
            .device
            .poll(poll_type)
            .map(|_| ())
            .map_err(|e| RenderError::Submission(format!("Device poll failed: {e}")))
    }
}

impl CommandQueue for WgpuCommandQueue {
    fn execute_command_list(&mut self, list: &mut dyn CommandList) -> Result<(), RenderError> {
        let list = list
            .as_any_mut()
            .downcast_mut::<WgpuCommandList>()
            .ok_or_else(|| {
                RenderError::Submission("Command list was not created by this device".to_string())
            })?;
        if !list.is_closed() {
            return Err(RenderError::Submission(
                "Command list executed before close".to_string(),
            ));
        }
        let buffer = list.encode()?;
        self.shared.queue.submit(std::iter::once(buffer));
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<(), RenderError> {
        self.last_signaled = self.last_signaled.max(value);
        let completed = self.completed.clone();
        self.shared.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        // Callbacks only run while the device is polled.
        if let Err(e) = self.poll(wgpu::PollType::Poll) {
            log::warn!("{e}");
        }
        self.completed.load(Ordering::Acquire)
    }

    fn wait_until(&mut self, value: u64) -> Result<(), RenderError> {
        if self.completed.load(Ordering::Acquire) >= value {
            return Ok(());
        }
        if value > self.last_signaled {
            return Err(RenderError::Submission(format!(
                "Waiting for fence value {value} that was never signaled (last {})",
                self.last_signaled
            )));
        }
        self.poll(wgpu::PollType::Wait)?;
        self.completed.fetch_max(self.last_signaled, Ordering::AcqRel);
        Ok(())
    }
}
