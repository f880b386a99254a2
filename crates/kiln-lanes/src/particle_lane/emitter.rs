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

use super::types::EmitterConstants;
use kiln_core::math::{LinearRgba, Vec3};

/// Authoring-time description of where, how often and what to emit.
///
/// Emitters are plain data. The manager keeps the burst timer of each one
/// and packs its parameters for the emit stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitter {
    /// Emission center.
    pub translate: Vec3,
    /// Emission sphere radius.
    pub radius: f32,
    /// Particles per burst.
    pub count: u32,
    /// Seconds between bursts.
    pub frequency: f32,
    /// Lifetime range in seconds.
    pub lifetime: (f32, f32),
    /// Initial speed.
    pub speed: f32,
    /// Initial scale.
    pub scale: f32,
    /// Initial color.
    pub color: LinearRgba,
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            radius: 1.0,
            count: 10,
            frequency: 0.5,
            lifetime: (1.0, 3.0),
            speed: 1.0,
            scale: 0.5,
            color: LinearRgba::WHITE,
        }
    }
}

/// Time accumulated towards an emitter's next burst.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct BurstTimer {
    elapsed: f32,
}

impl BurstTimer {
    /// Advances by `delta_time`. Returns `true` when a burst of `emitter` is due.
    pub(crate) fn tick(&mut self, emitter: &ParticleEmitter, delta_time: f32) -> bool {
        self.elapsed += delta_time;
        if self.elapsed >= emitter.frequency {
            self.elapsed -= emitter.frequency.max(f32::EPSILON);
            true
        } else {
            false
        }
    }
}

impl ParticleEmitter {
    /// Packs the emitter for the emit stage.
    pub fn constants(&self, emit: bool, seed: u32) -> EmitterConstants {
        EmitterConstants {
            translate: self.translate.to_array(),
            radius: self.radius,
            count: self.count,
            emit: emit as u32,
            seed,
            lifetime_min: self.lifetime.0.min(self.lifetime.1),
            lifetime_max: self.lifetime.0.max(self.lifetime.1),
            speed: self.speed,
            scale: self.scale,
            _pad: 0.0,
            color: self.color.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_fires_once_per_period() {
        let emitter = ParticleEmitter {
            frequency: 0.5,
            ..ParticleEmitter::default()
        };
        let mut timer = BurstTimer::default();
        let fired = (0..8).filter(|_| timer.tick(&emitter, 0.25)).count();
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_moving_an_emitter_keeps_its_timer() {
        let mut emitter = ParticleEmitter::default();
        let mut timer = BurstTimer::default();
        assert!(!timer.tick(&emitter, 0.3));
        emitter.translate = Vec3::new(1.0, 2.0, 3.0);
        assert!(timer.tick(&emitter, 0.3));
    }

    #[test]
    fn test_constants_order_the_lifetime_range() {
        let emitter = ParticleEmitter {
            lifetime: (4.0, 2.0),
            ..ParticleEmitter::default()
        };
        let constants = emitter.constants(true, 3);
        assert_eq!(constants.lifetime_min, 2.0);
        assert_eq!(constants.lifetime_max, 4.0);
        assert_eq!(constants.emit, 1);
    }
}
