use kiln_core::mock::{MockCommand, MockDevice, MockSwapChain};
use kiln_core::GraphicsCore;
use kiln_lanes::post_lane::PostEffectKind;
use kiln_runtime::config::{AssetConfig, EngineConfig, PostConfig};
use kiln_runtime::Engine;
use std::path::PathBuf;
use std::sync::Arc;

fn assets_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets"))
}

fn test_config() -> EngineConfig {
    EngineConfig {
        assets: AssetConfig {
            shader_dir: assets_dir().join("shaders"),
            models_dir: assets_dir().join("models"),
            demo_model: "cube.obj".to_string(),
        },
        ..EngineConfig::default()
    }
}

fn engine_on(mock: &MockDevice, config: &EngineConfig) -> anyhow::Result<Engine> {
    let core = GraphicsCore::new(
        Arc::new(mock.clone()),
        Box::new(mock.create_queue()),
        Box::new(MockSwapChain::new(mock, 64, 64)?),
        config.graphics.core_settings(&config.assets.shader_dir),
    )?;
    Engine::new(core, config)
}

/// Indexed draws of the 36-index demo model, i.e. the spinner and the floor.
fn model_draws(mock: &MockDevice) -> usize {
    mock.state()
        .executed
        .iter()
        .filter(|c| matches!(c, MockCommand::DrawIndexedInstanced { index_count: 36, .. }))
        .count()
}

#[test]
fn test_frame_submits_scene_and_presents() {
    let mock = MockDevice::new();
    let mut engine = engine_on(&mock, &test_config()).unwrap();

    let stats = engine.frame(1.0 / 60.0).unwrap().unwrap();
    assert_eq!(engine.frame_index(), 1);
    assert_eq!(mock.state().executed_lists, 1);
    // Two props, each drawn in the shadow pass and the geometry pass.
    assert_eq!(model_draws(&mock), 4);
    assert!(stats.draw_calls >= 4);
    assert!(engine.scene().elapsed() > 0.0);
}

#[test]
fn test_objects_are_resubmitted_every_frame() {
    let mock = MockDevice::new();
    let mut engine = engine_on(&mock, &test_config()).unwrap();

    for _ in 0..3 {
        engine.frame(1.0 / 60.0).unwrap();
    }
    assert_eq!(engine.frame_index(), 3);
    assert_eq!(mock.state().executed_lists, 3);
    assert_eq!(model_draws(&mock), 12);
}

#[test]
fn test_long_stalls_are_clamped() {
    let mock = MockDevice::new();
    let mut engine = engine_on(&mock, &test_config()).unwrap();

    engine.frame(5.0).unwrap();
    assert!(engine.scene().elapsed() <= 0.1 + f32::EPSILON);
}

#[test]
fn test_lost_surface_is_rebuilt_and_rendering_resumes() {
    let mock = MockDevice::new();
    let config = test_config();
    let swap_chain = MockSwapChain::new(&mock, 64, 64).unwrap().with_lost_surface();
    let core = GraphicsCore::new(
        Arc::new(mock.clone()),
        Box::new(mock.create_queue()),
        Box::new(swap_chain),
        config.graphics.core_settings(&config.assets.shader_dir),
    )
    .unwrap();
    let mut engine = Engine::new(core, &config).unwrap();

    let presented: Vec<bool> = (0..5)
        .map(|_| engine.frame(1.0 / 60.0).unwrap().is_some())
        .collect();
    assert_eq!(presented, vec![false, true, true, true, true]);
    assert_eq!(engine.frame_index(), 4);
    assert_eq!(engine.core().display.size(), (64, 64));
}

#[test]
fn test_resize_rebuilds_targets() {
    let mock = MockDevice::new();
    let mut engine = engine_on(&mock, &test_config()).unwrap();

    engine.resize(0, 0).unwrap();
    assert_eq!(engine.core().display.size(), (64, 64));

    engine.resize(128, 96).unwrap();
    assert_eq!(engine.core().display.size(), (128, 96));
    assert_eq!(engine.renderer().scene_color().size(), (128, 96));
    engine.frame(1.0 / 60.0).unwrap();
}

#[test]
fn test_post_effects_follow_config() {
    let mock = MockDevice::new();
    let config = EngineConfig {
        post: PostConfig {
            enabled: Vec::new(),
            ..PostConfig::default()
        },
        ..test_config()
    };
    let mut engine = engine_on(&mock, &config).unwrap();
    assert!(PostEffectKind::ORDER
        .iter()
        .all(|kind| !engine.post_mut().is_enabled(*kind)));

    let mock = MockDevice::new();
    let mut engine = engine_on(&mock, &test_config()).unwrap();
    assert!(engine.post_mut().is_enabled(PostEffectKind::Bloom));
    assert!(engine.post_mut().is_enabled(PostEffectKind::Vignette));
    assert!(!engine.post_mut().is_enabled(PostEffectKind::Fog));
}

#[test]
fn test_particles_fall_back_to_cpu() {
    let mock = MockDevice::without_compute();
    let mut engine = engine_on(&mock, &test_config()).unwrap();
    assert!(!engine.particles().simulates_on_gpu());

    engine.frame(1.0 / 60.0).unwrap();
    let dispatches = mock
        .state()
        .executed
        .iter()
        .filter(|c| matches!(c, MockCommand::Dispatch(..)))
        .count();
    assert_eq!(dispatches, 0);
}

#[test]
fn test_missing_model_fails_startup() {
    let mock = MockDevice::new();
    let mut config = test_config();
    config.assets.demo_model = "missing.obj".to_string();
    let error = engine_on(&mock, &config).unwrap_err();
    assert!(format!("{error:#}").contains("missing.obj"));
}

#[test]
fn test_model_texture_is_cached() {
    let mock = MockDevice::new();
    let engine = engine_on(&mock, &test_config()).unwrap();
    assert_eq!(engine.models().len(), 1);
    let checker = assets_dir().join("models").join("checker.png");
    assert_ne!(engine.textures().get(&checker), engine.textures().white());
    assert_eq!(engine.trails().len(), 1);
    assert_eq!(engine.particles().group_count(), 1);
}
