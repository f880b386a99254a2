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

//! The top-level [`Engine`]: every service of a running instance and the
//! frame that drives them.

use crate::config::EngineConfig;
use crate::scene::DemoScene;
use anyhow::Result;
use kiln_core::gpu::FrameStats;
use kiln_core::renderer::RenderError;
use kiln_core::GraphicsCore;
use kiln_lanes::asset_lane::{ModelManager, TextureManager};
use kiln_lanes::particle_lane::ParticleManager;
use kiln_lanes::post_lane::{PostEffectKind, PostProcessChain};
use kiln_lanes::render_lane::Renderer;
use kiln_lanes::trail_lane::TrailRenderer;

/// Longest step the simulation takes, so a stall does not fling particles.
const MAX_DELTA_TIME: f32 = 0.1;

/// Owns the frame core and every lane built on it.
///
/// There are no process-wide singletons: everything a frame touches is a
/// field here and is handed to the lanes by reference.
#[derive(Debug)]
pub struct Engine {
    core: GraphicsCore,
    renderer: Renderer,
    post: PostProcessChain,
    particles: ParticleManager,
    trails: TrailRenderer,
    textures: TextureManager,
    models: ModelManager,
    scene: DemoScene,
    frame_index: u64,
}

impl Engine {
    /// Builds every service around `core` and loads the demo scene.
    pub fn new(mut core: GraphicsCore, config: &EngineConfig) -> Result<Self> {
        let size = core.display.size();
        log::info!("Starting engine at {}x{}", size.0, size.1);

        let mut renderer = Renderer::new(&mut core, config.graphics.renderer_settings(size))?;
        let mut post = PostProcessChain::new(&mut core, size)?;
        configure_post(&mut post, config)?;
        let mut particles = ParticleManager::new(&mut core)?;
        let mut trails = TrailRenderer::new(&mut core)?;
        let mut textures =
            TextureManager::new(core.device.clone(), &mut core.descriptors.cbv_srv_uav)?;
        let mut models = ModelManager::new(core.device.clone());
        if !particles.simulates_on_gpu() {
            log::warn!("Compute shaders are unavailable, particles simulate on the CPU");
        }

        let scene = DemoScene::new(
            &mut core,
            &mut renderer,
            &mut models,
            &mut textures,
            &mut particles,
            &mut trails,
            &config.assets.models_dir,
            &config.assets.demo_model,
        )?;

        Ok(Self {
            core,
            renderer,
            post,
            particles,
            trails,
            textures,
            models,
            scene,
            frame_index: 0,
        })
    }

    /// Records, submits and presents one frame advanced by `delta_time` seconds.
    ///
    /// Returns `None` when the surface was lost and the frame was skipped;
    /// the swap chain has been rebuilt by then and the next frame proceeds.
    pub fn frame(&mut self, delta_time: f32) -> Result<Option<FrameStats>, RenderError> {
        match self.core.begin_frame() {
            Ok(()) => {}
            Err(RenderError::SurfaceLost) => {
                self.recover_surface()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let dt = delta_time.clamp(0.0, MAX_DELTA_TIME);

        self.scene.update(dt, &mut self.particles, &mut self.trails)?;
        self.particles.update(&mut self.core.context, dt)?;

        self.scene.submit(&mut self.renderer, &self.models);
        let ctx = &mut self.core.context;
        self.renderer.render(ctx)?;

        let camera = self.scene.camera_address();
        let color = self.renderer.scene_color();
        let depth = self.renderer.scene_depth();
        self.particles.draw(ctx, camera, color, depth)?;
        self.trails.draw(ctx, camera, color, depth);

        let output = self.post.apply(ctx, color, depth)?;
        self.post.composite_to_back_buffer(ctx, &output, &self.core.display);

        let stats = ctx.stats();
        match self.core.end_frame() {
            Ok(()) => {}
            Err(RenderError::SurfaceLost) => {
                self.recover_surface()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        self.frame_index += 1;
        log::trace!("Frame {} recorded: {stats:?}", self.frame_index);
        Ok(Some(stats))
    }

    /// Resizes the swap chain and every size-dependent target.
    ///
    /// A zero-sized surface (a minimized window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.core.resize(width, height)?;
        self.renderer.resize(width, height)?;
        self.post.resize(width, height)?;
        self.scene.set_viewport(width, height)?;
        log::info!("Resized to {width}x{height}");
        Ok(())
    }

    fn recover_surface(&mut self) -> Result<(), RenderError> {
        let (width, height) = self.core.display.size();
        log::warn!("Surface lost, rebuilding the swap chain at {width}x{height}");
        self.core.recover_surface()
    }

    /// Frames presented so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The frame core.
    pub fn core(&self) -> &GraphicsCore {
        &self.core
    }

    /// The scene renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The post-process chain, e.g. to toggle effects at run time.
    pub fn post_mut(&mut self) -> &mut PostProcessChain {
        &mut self.post
    }

    /// The particle groups.
    pub fn particles(&self) -> &ParticleManager {
        &self.particles
    }

    /// The trails.
    pub fn trails(&self) -> &TrailRenderer {
        &self.trails
    }

    /// The texture cache.
    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// The model cache.
    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    /// The demo scene.
    pub fn scene(&self) -> &DemoScene {
        &self.scene
    }
}

fn configure_post(post: &mut PostProcessChain, config: &EngineConfig) -> Result<(), RenderError> {
    let c = &config.post;
    post.configure(&c.outline)?;
    post.configure(&c.gray_scale)?;
    post.configure(&c.lens_distortion)?;
    post.configure(&c.depth_of_field)?;
    post.configure(&c.bloom)?;
    post.configure(&c.radial_blur)?;
    post.configure(&c.fog)?;
    post.configure(&c.vignette)?;
    post.configure(&c.hsv)?;
    for kind in PostEffectKind::ORDER {
        post.set_enabled(kind, c.is_enabled(kind));
    }
    log::debug!("{} post effects enabled", post.enabled_count());
    Ok(())
}
