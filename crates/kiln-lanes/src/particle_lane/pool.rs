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

use super::types::{spawn_particle, EmitterConstants, GpuParticle, RandomStream};

/// A CPU particle pool with the same initialize, emit and update rules as
/// the compute stages.
///
/// The free list is an index stack: `free_list[0..=free_list_index]` holds
/// the free slots and `free_list_index` is `-1` when the pool is full.
/// Every slot is either live or on the stack, never both.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Vec<GpuParticle>,
    free_list: Vec<u32>,
    free_list_index: i32,
}

impl ParticlePool {
    /// The initialize stage: every slot dead and on the free list.
    pub fn new(capacity: u32) -> Self {
        Self {
            particles: vec![GpuParticle::default(); capacity as usize],
            free_list: (0..capacity).collect(),
            free_list_index: capacity as i32 - 1,
        }
    }

    /// The emit stage. Returns how many particles were spawned, which is
    /// fewer than requested when the pool runs out of free slots.
    pub fn emit(&mut self, emitter: &EmitterConstants) -> u32 {
        if emitter.emit == 0 {
            return 0;
        }
        let mut spawned = 0;
        for i in 0..emitter.count {
            if self.free_list_index < 0 {
                break;
            }
            let slot = self.free_list[self.free_list_index as usize];
            self.free_list_index -= 1;
            let mut rng = RandomStream::new(emitter.seed, i);
            self.particles[slot as usize] = spawn_particle(emitter, &mut rng);
            spawned += 1;
        }
        spawned
    }

    /// The update stage. Returns how many particles died.
    pub fn update(&mut self, delta_time: f32) -> u32 {
        let mut died = 0;
        for (slot, particle) in self.particles.iter_mut().enumerate() {
            if particle.alive == 0 {
                continue;
            }
            particle.current_time += delta_time;
            if particle.current_time >= particle.lifetime {
                particle.alive = 0;
                particle.scale = [0.0; 3];
                self.free_list_index += 1;
                self.free_list[self.free_list_index as usize] = slot as u32;
                died += 1;
                continue;
            }
            for axis in 0..3 {
                particle.translate[axis] += particle.velocity[axis] * delta_time;
            }
            let age = particle.current_time / particle.lifetime.max(f32::EPSILON);
            particle.color[3] = (1.0 - age).clamp(0.0, 1.0);
        }
        died
    }

    /// The number of slots.
    pub fn capacity(&self) -> u32 {
        self.particles.len() as u32
    }

    /// Slots currently live.
    pub fn live_count(&self) -> u32 {
        self.particles.iter().filter(|p| p.alive != 0).count() as u32
    }

    /// Slots currently on the free list.
    pub fn free_count(&self) -> u32 {
        (self.free_list_index + 1) as u32
    }

    /// The particle slots, as uploaded to the GPU pool buffer.
    pub fn particles(&self) -> &[GpuParticle] {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter(count: u32, seed: u32) -> EmitterConstants {
        EmitterConstants {
            count,
            emit: 1,
            seed,
            lifetime_min: 0.5,
            lifetime_max: 2.0,
            speed: 1.0,
            scale: 1.0,
            color: [1.0; 4],
            ..EmitterConstants::default()
        }
    }

    #[test]
    fn test_initialize_fills_the_free_list() {
        let pool = ParticlePool::new(16);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_count(), 16);
    }

    #[test]
    fn test_emit_stops_when_the_pool_is_full() {
        let mut pool = ParticlePool::new(8);
        assert_eq!(pool.emit(&emitter(5, 1)), 5);
        assert_eq!(pool.emit(&emitter(5, 2)), 3);
        assert_eq!(pool.live_count(), 8);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_live_plus_free_is_conserved() {
        const CAPACITY: u32 = 64;
        let mut pool = ParticlePool::new(CAPACITY);
        for frame in 0..400u32 {
            pool.emit(&emitter(frame % 11, frame));
            pool.update(0.1 + (frame % 3) as f32 * 0.05);
            assert_eq!(pool.live_count() + pool.free_count(), CAPACITY);
        }

        let mut seen = vec![false; CAPACITY as usize];
        for &slot in &pool.free_list[..pool.free_count() as usize] {
            assert!(!seen[slot as usize], "slot {slot} is on the free list twice");
            assert_eq!(pool.particles[slot as usize].alive, 0);
            seen[slot as usize] = true;
        }
    }

    #[test]
    fn test_dead_particles_collapse() {
        let mut pool = ParticlePool::new(4);
        pool.emit(&emitter(4, 9));
        pool.update(10.0);
        assert_eq!(pool.live_count(), 0);
        assert!(pool.particles().iter().all(|p| p.scale == [0.0; 3]));
    }
}
