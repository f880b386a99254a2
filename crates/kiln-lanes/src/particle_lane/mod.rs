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

//! Particle lane: GPU-resident particle pools with a free-list allocator.
//!
//! A group's slots live in one read/write buffer. A second buffer holds the
//! stack of free slot indices and a third its top index, updated atomically
//! by the emit stage (pop) and the update stage (push on death). The CPU
//! never reads particle counts back.

mod emitter;
mod manager;
mod pool;
mod types;

pub use emitter::ParticleEmitter;
pub use manager::{
    EmitterKey, ParticleGroup, ParticleGroupDesc, ParticleGroupKey, ParticleManager,
    UPDATE_GROUP_SIZE,
};
pub use pool::ParticlePool;
pub use types::{
    pcg_hash, spawn_particle, EmitterConstants, GpuParticle, PerFrameConstants, RandomStream,
};
