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

//! Layouts shared with `particle.wgsl`, and the hash both sides draw random
//! numbers from.

use bytemuck::{Pod, Zeroable};

/// One slot of the particle pool.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct GpuParticle {
    /// World position.
    pub translate: [f32; 3],
    /// Seconds the particle lives.
    pub lifetime: f32,
    /// Billboard scale.
    pub scale: [f32; 3],
    /// Seconds since emission.
    pub current_time: f32,
    /// World velocity per second.
    pub velocity: [f32; 3],
    /// Non-zero while the slot is live.
    pub alive: u32,
    /// Color; alpha fades with age.
    pub color: [f32; 4],
}

/// What one emitter asks the emit stage to spawn this frame.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct EmitterConstants {
    /// Emission center.
    pub translate: [f32; 3],
    /// Emission sphere radius.
    pub radius: f32,
    /// Particles to spawn.
    pub count: u32,
    /// Non-zero when the emitter fires this frame.
    pub emit: u32,
    /// Random seed of this frame's batch.
    pub seed: u32,
    /// Shortest lifetime.
    pub lifetime_min: f32,
    /// Longest lifetime.
    pub lifetime_max: f32,
    /// Initial speed.
    pub speed: f32,
    /// Initial scale.
    pub scale: f32,
    /// Padding.
    pub _pad: f32,
    /// Initial color.
    pub color: [f32; 4],
}

/// Time constants of the update stage.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct PerFrameConstants {
    /// Seconds since the manager started.
    pub time: f32,
    /// Seconds since the previous update.
    pub delta_time: f32,
    /// Update counter.
    pub frame: u32,
    /// Padding.
    pub _pad: u32,
}

/// The PCG hash, identical to `pcg_hash` in `particle.wgsl`.
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// A stream of random numbers seeded per particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomStream(u32);

impl RandomStream {
    /// The stream of the `index`-th particle of a batch seeded with `seed`.
    pub fn new(seed: u32, index: u32) -> Self {
        Self(pcg_hash(seed ^ pcg_hash(index)))
    }

    /// The next value in `[0, 1]`.
    pub fn next_unit(&mut self) -> f32 {
        self.0 = pcg_hash(self.0);
        self.0 as f32 / u32::MAX as f32
    }

    /// The next value in `[-1, 1]`.
    pub fn next_signed(&mut self) -> f32 {
        self.next_unit() * 2.0 - 1.0
    }
}

/// Writes a freshly emitted particle from `emitter`, drawing from `rng` in
/// the same order as the shader.
pub fn spawn_particle(emitter: &EmitterConstants, rng: &mut RandomStream) -> GpuParticle {
    let offset = [rng.next_signed(), rng.next_signed(), rng.next_signed()];
    let direction = [rng.next_signed(), rng.next_signed(), rng.next_signed()];
    let t = rng.next_unit();
    let lifetime = emitter.lifetime_min + (emitter.lifetime_max - emitter.lifetime_min) * t;
    GpuParticle {
        translate: [
            emitter.translate[0] + offset[0] * emitter.radius,
            emitter.translate[1] + offset[1] * emitter.radius,
            emitter.translate[2] + offset[2] * emitter.radius,
        ],
        lifetime,
        scale: [emitter.scale; 3],
        current_time: 0.0,
        velocity: [
            direction[0] * emitter.speed,
            direction[1] * emitter.speed,
            direction[2] * emitter.speed,
        ],
        alive: 1,
        color: emitter.color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_match_shader_declarations() {
        assert_eq!(std::mem::size_of::<GpuParticle>(), 64);
        assert_eq!(std::mem::size_of::<EmitterConstants>(), 64);
        assert_eq!(std::mem::size_of::<PerFrameConstants>(), 16);
    }

    #[test]
    fn test_pcg_hash_known_values() {
        assert_eq!(pcg_hash(0), pcg_hash(0));
        assert_ne!(pcg_hash(0), pcg_hash(1));
        let mut stream = RandomStream::new(7, 3);
        for _ in 0..64 {
            let v = stream.next_unit();
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
