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

//! The demo scene: a spinning model over a floor, a particle fountain and a
//! trail circling above them.

use anyhow::{Context, Result};
use kiln_core::gpu::{BlendMode, ConstantBuffer, DepthWrite};
use kiln_core::math::{LinearRgba, Mat4, Vec3};
use kiln_core::renderer::api::{GpuDescriptorHandle, GpuVirtualAddress};
use kiln_core::renderer::ResourceError;
use kiln_core::GraphicsCore;
use kiln_lanes::asset_lane::{ModelManager, TextureManager};
use kiln_lanes::particle_lane::{
    EmitterKey, ParticleEmitter, ParticleGroupDesc, ParticleGroupKey, ParticleManager,
};
use kiln_lanes::render_lane::{
    CameraConstants, DirectionalLight, DrawPass, MaterialConstants, Renderer, ShadowObject,
    WorldTransformConstants,
};
use kiln_lanes::trail_lane::{TrailKey, TrailRenderer, TrailSettings};
use std::f32::consts::{FRAC_PI_4, TAU};
use std::path::Path;

const CAMERA_EYE: Vec3 = Vec3::new(0.0, 3.0, -7.0);
const FLOOR_SCALE: Vec3 = Vec3::new(8.0, 0.1, 8.0);
const FLOOR_HEIGHT: f32 = -1.5;
const SPIN_SPEED: f32 = 0.8;
const TRAIL_RADIUS: f32 = 2.5;
const TRAIL_SPEED: f32 = 1.5;

/// One drawn instance of a model.
#[derive(Debug)]
struct Prop {
    material: ConstantBuffer<MaterialConstants>,
    world: ConstantBuffer<WorldTransformConstants>,
}

impl Prop {
    fn new(
        core: &GraphicsCore,
        label: &str,
        color: LinearRgba,
        world: Mat4,
    ) -> Result<Self, ResourceError> {
        let material = MaterialConstants {
            color,
            ..MaterialConstants::default()
        };
        Ok(Self {
            material: ConstantBuffer::create(
                &core.device,
                &format!("{label} material"),
                &material,
            )?,
            world: ConstantBuffer::create(
                &core.device,
                &format!("{label} world"),
                &WorldTransformConstants { world },
            )?,
        })
    }
}

/// The objects the runtime draws every frame.
#[derive(Debug)]
pub struct DemoScene {
    model: String,
    texture: GpuDescriptorHandle,
    camera: ConstantBuffer<CameraConstants>,
    spinner: Prop,
    floor: Prop,
    particles: ParticleGroupKey,
    emitter: EmitterKey,
    trail: TrailKey,
    light: DirectionalLight,
    elapsed: f32,
}

impl DemoScene {
    /// Loads the model and its texture and registers the particle group and trail.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: &mut GraphicsCore,
        renderer: &mut Renderer,
        models: &mut ModelManager,
        textures: &mut TextureManager,
        particles: &mut ParticleManager,
        trails: &mut TrailRenderer,
        models_dir: &Path,
        model: &str,
    ) -> Result<Self> {
        let diffuse = models
            .load(models_dir, model)
            .with_context(|| format!("Failed to load the demo model '{model}'"))?
            .diffuse_texture()
            .map(Path::to_path_buf);
        let texture = match diffuse {
            Some(path) => match textures.load(&mut core.descriptors.cbv_srv_uav, &path) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("{e}; drawing '{model}' untextured");
                    textures.white()
                }
            },
            None => textures.white(),
        };

        let (width, height) = core.display.size();
        let camera = ConstantBuffer::create(
            &core.device,
            "demo camera",
            &Self::camera_constants(width, height),
        )?;
        let spinner = Prop::new(core, "spinner", LinearRgba::WHITE, Mat4::IDENTITY)?;
        let floor = Prop::new(
            core,
            "floor",
            LinearRgba::rgb(0.6, 0.6, 0.6),
            Mat4::from_srt(FLOOR_SCALE, Vec3::ZERO, Vec3::new(0.0, FLOOR_HEIGHT, 0.0)),
        )?;

        let group = particles.create_group(
            core,
            ParticleGroupDesc {
                max_instances: 1024,
                blend: BlendMode::Add,
                depth_write: DepthWrite::Disabled,
                texture: textures.white(),
            },
        )?;
        let emitter = particles
            .add_emitter(
                group,
                ParticleEmitter {
                    translate: Vec3::new(0.0, FLOOR_HEIGHT + 0.2, 0.0),
                    radius: 0.5,
                    count: 16,
                    frequency: 0.1,
                    speed: 1.5,
                    scale: 0.1,
                    color: LinearRgba::rgb(1.0, 0.6, 0.2),
                    ..ParticleEmitter::default()
                },
            )?
            .context("The particle group vanished while it was being set up")?;

        let trail = trails.create_trail(
            TrailSettings {
                lifetime: 0.5,
                color: LinearRgba::rgb(0.3, 0.8, 1.0),
                ..TrailSettings::default()
            },
            BlendMode::Add,
            textures.white(),
        )?;

        let light = DirectionalLight::default();
        renderer.set_light(&light)?;
        log::info!("Demo scene ready with model '{model}'");

        Ok(Self {
            model: model.to_string(),
            texture,
            camera,
            spinner,
            floor,
            particles: group,
            emitter,
            trail,
            light,
            elapsed: 0.0,
        })
    }

    fn camera_constants(width: u32, height: u32) -> CameraConstants {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        CameraConstants::look_at(CAMERA_EYE, Vec3::ZERO, FRAC_PI_4, aspect, 0.1, 100.0)
    }

    /// The camera every object of the scene carries.
    pub fn camera_address(&self) -> GpuVirtualAddress {
        self.camera.gpu_virtual_address()
    }

    /// The light the renderer was given.
    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    /// Seconds the scene has advanced.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Rebuilds the projection for a new surface size.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.camera.update(&Self::camera_constants(width, height))
    }

    /// Advances the animation by `delta_time` seconds.
    pub fn update(
        &mut self,
        delta_time: f32,
        particles: &mut ParticleManager,
        trails: &mut TrailRenderer,
    ) -> Result<(), ResourceError> {
        self.elapsed += delta_time;
        let t = self.elapsed;

        let spin = Mat4::from_srt(
            Vec3::ONE,
            Vec3::new(t * SPIN_SPEED * 0.5, t * SPIN_SPEED, 0.0),
            Vec3::ZERO,
        );
        self.spinner
            .world
            .update(&WorldTransformConstants { world: spin })?;

        // Slow figure eight.
        if let Some(emitter) = particles.emitter_mut(self.particles, self.emitter) {
            emitter.translate = Vec3::new((t * 0.5).sin() * 2.0, FLOOR_HEIGHT + 0.2, t.sin());
        }

        let angle = (t * TRAIL_SPEED) % TAU;
        let head = Vec3::new(angle.cos() * TRAIL_RADIUS, 1.5, angle.sin() * TRAIL_RADIUS);
        let front = Vec3::new(head.x, 1.2, head.z);
        trails.update_trail(self.trail, delta_time, head, front)?;
        Ok(())
    }

    /// Submits this frame's draws. Nothing carries over from the last frame.
    pub fn submit(&self, renderer: &mut Renderer, models: &ModelManager) {
        let Some(model) = models.get(&self.model) else {
            return;
        };
        for prop in [&self.spinner, &self.floor] {
            renderer.add_object(
                model.vertex_buffer_view(),
                model.index_buffer_view(),
                prop.material.gpu_virtual_address(),
                prop.world.gpu_virtual_address(),
                self.camera.gpu_virtual_address(),
                self.texture,
                self.texture,
                model.index_count(),
                DrawPass::Opaque,
            );
            renderer.add_shadow_object(ShadowObject {
                vertex_buffer: model.vertex_buffer_view(),
                index_buffer: model.index_buffer_view(),
                world_transform: prop.world.gpu_virtual_address(),
                index_count: model.index_count(),
            });
        }
    }
}
