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

use super::resource::{AsResource, ResourceHandle};
use crate::renderer::api::{ResourceBarrier, ResourceId, ResourceState};
use std::collections::HashMap;

/// A resource and the state a pass needs it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceUsage {
    /// The resource.
    pub resource: ResourceHandle,
    /// The required state.
    pub state: ResourceState,
}

impl ResourceUsage {
    /// Declares that `resource` is used in `state`.
    pub fn new(resource: &impl AsResource, state: ResourceState) -> Self {
        Self {
            resource: resource.resource_handle(),
            state,
        }
    }
}

/// The single record of the current state of every resource a context touched.
///
/// Resources enter the tracker in their creation state the first time they
/// are seen. Transitions to the state a resource is already in produce no
/// barrier; the rest are queued until [`flush`](Self::flush).
#[derive(Debug, Default)]
pub struct ResourceStateTracker {
    states: HashMap<ResourceId, ResourceState>,
    pending: Vec<ResourceBarrier>,
}

impl ResourceStateTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state `id` is in, if it was ever seen.
    pub fn state(&self, id: ResourceId) -> Option<ResourceState> {
        self.states.get(&id).copied()
    }

    /// Queues a transition of `resource` to `after`.
    ///
    /// Returns `true` if a barrier was queued.
    pub fn transition(&mut self, resource: ResourceHandle, after: ResourceState) -> bool {
        let current = self
            .states
            .entry(resource.id)
            .or_insert(resource.initial_state);
        if *current == after {
            return false;
        }
        self.pending.push(ResourceBarrier::Transition {
            resource: resource.id,
            before: *current,
            after,
        });
        *current = after;
        true
    }

    /// Queues an unordered-access barrier on `resource`.
    pub fn uav_barrier(&mut self, resource: ResourceHandle) {
        self.states
            .entry(resource.id)
            .or_insert(resource.initial_state);
        self.pending
            .push(ResourceBarrier::UnorderedAccess { resource: resource.id });
    }

    /// Whether barriers are waiting to be recorded.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Takes the queued barriers.
    pub fn flush(&mut self) -> Vec<ResourceBarrier> {
        std::mem::take(&mut self.pending)
    }

    /// Number of resources with a known state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no resource was seen yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forgets every resource for which `keep` returns `false`.
    ///
    /// Returns how many were forgotten.
    pub fn retain(&mut self, mut keep: impl FnMut(ResourceId) -> bool) -> usize {
        let before = self.states.len();
        self.states.retain(|id, _| keep(*id));
        before - self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u32, initial_state: ResourceState) -> ResourceHandle {
        ResourceHandle {
            id: ResourceId(id),
            initial_state,
        }
    }

    #[test]
    fn test_first_use_starts_from_initial_state() {
        let mut tracker = ResourceStateTracker::new();
        let rt = handle(1, ResourceState::Common);

        assert!(tracker.transition(rt, ResourceState::RenderTarget));

        assert_eq!(
            tracker.flush(),
            vec![ResourceBarrier::Transition {
                resource: rt.id,
                before: ResourceState::Common,
                after: ResourceState::RenderTarget,
            }]
        );
        assert_eq!(tracker.state(rt.id), Some(ResourceState::RenderTarget));
    }

    #[test]
    fn test_repeated_transition_is_free() {
        let mut tracker = ResourceStateTracker::new();
        let tex = handle(2, ResourceState::PixelShaderResource);

        assert!(!tracker.transition(tex, ResourceState::PixelShaderResource));
        assert!(tracker.transition(tex, ResourceState::RenderTarget));
        assert!(!tracker.transition(tex, ResourceState::RenderTarget));

        assert_eq!(tracker.flush().len(), 1);
        assert!(!tracker.has_pending());
    }

    #[test]
    fn test_state_survives_flush() {
        let mut tracker = ResourceStateTracker::new();
        let buf = handle(3, ResourceState::Common);
        tracker.transition(buf, ResourceState::UnorderedAccess);
        tracker.flush();

        tracker.transition(buf, ResourceState::VertexAndConstantBuffer);

        assert_eq!(
            tracker.flush(),
            vec![ResourceBarrier::Transition {
                resource: buf.id,
                before: ResourceState::UnorderedAccess,
                after: ResourceState::VertexAndConstantBuffer,
            }]
        );
    }

    #[test]
    fn test_retain_drops_only_rejected_resources() {
        let mut tracker = ResourceStateTracker::new();
        tracker.transition(handle(4, ResourceState::Common), ResourceState::CopyDest);
        tracker.transition(handle(5, ResourceState::Common), ResourceState::CopyDest);
        tracker.flush();

        assert_eq!(tracker.retain(|id| id != ResourceId(4)), 1);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.state(ResourceId(4)), None);
        assert_eq!(tracker.state(ResourceId(5)), Some(ResourceState::CopyDest));
    }
}
