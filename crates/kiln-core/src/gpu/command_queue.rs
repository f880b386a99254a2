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
use crate::renderer::{CommandQueue, RenderError};

/// A submission queue paired with a monotonically increasing fence.
///
/// Every [`execute`](Self::execute) signals the next fence value; waiting for
/// a value blocks until the GPU finished everything submitted before it.
pub struct FencedQueue {
    queue: Box<dyn CommandQueue>,
    next_fence_value: u64,
    last_completed: u64,
}

impl std::fmt::Debug for FencedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FencedQueue")
            .field("next_fence_value", &self.next_fence_value)
            .field("last_completed", &self.last_completed)
            .finish()
    }
}

impl FencedQueue {
    /// Wraps a native queue. The fence starts at zero.
    pub fn new(queue: Box<dyn CommandQueue>) -> Self {
        Self {
            queue,
            next_fence_value: 1,
            last_completed: 0,
        }
    }

    /// Closes and submits `context`, then signals the fence.
    ///
    /// Returns the fence value that completes with this submission.
    pub fn execute(&mut self, context: &mut CommandContext) -> Result<u64, RenderError> {
        context.close()?;
        self.queue.execute_command_list(context.native_mut())?;
        let value = self.next_fence_value;
        self.queue.signal(value)?;
        self.next_fence_value += 1;
        log::trace!(
            "Submitted '{}' ({} draws, {} dispatches), fence {}",
            context.label(),
            context.stats().draw_calls,
            context.stats().dispatches,
            value
        );
        Ok(value)
    }

    /// Whether the GPU has passed `value`.
    pub fn is_fence_complete(&mut self, value: u64) -> bool {
        if value > self.last_completed {
            self.last_completed = self.last_completed.max(self.queue.completed_value());
        }
        value <= self.last_completed
    }

    /// Blocks until the GPU has passed `value`.
    pub fn wait_for_fence(&mut self, value: u64) -> Result<(), RenderError> {
        if self.is_fence_complete(value) {
            return Ok(());
        }
        self.queue.wait_until(value)?;
        self.last_completed = self.last_completed.max(value);
        Ok(())
    }

    /// Blocks until every submission so far has completed.
    pub fn wait_for_idle(&mut self) -> Result<(), RenderError> {
        self.wait_for_fence(self.next_fence_value - 1)
    }

    /// The value the next submission will signal.
    pub fn next_fence_value(&self) -> u64 {
        self.next_fence_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    #[test]
    fn test_each_submission_signals_a_larger_value() {
        let device = MockDevice::new();
        let mut queue = FencedQueue::new(Box::new(device.create_queue()));
        let mut ctx = CommandContext::new(&device, "frame").unwrap();

        ctx.graphics().draw(3);
        let first = queue.execute(&mut ctx).unwrap();
        ctx.reset().unwrap();
        ctx.graphics().draw(3);
        let second = queue.execute(&mut ctx).unwrap();

        assert!(second > first);
        assert!(queue.is_fence_complete(second));
        queue.wait_for_idle().unwrap();
        assert_eq!(device.state().executed_lists, 2);
    }

    #[test]
    fn test_unsignaled_value_is_not_complete() {
        let device = MockDevice::new();
        let mut queue = FencedQueue::new(Box::new(device.create_queue()));
        assert!(!queue.is_fence_complete(5));
        assert!(queue.wait_for_fence(5).is_err());
    }
}
