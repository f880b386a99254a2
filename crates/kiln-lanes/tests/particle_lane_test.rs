mod common;

use common::{camera, mock_core, scene_targets};
use kiln_core::gpu::{BlendMode, DepthWrite, Texture};
use kiln_core::mock::{recorded_commands, MockCommand, MockDevice};
use kiln_lanes::particle_lane::{ParticleEmitter, ParticleGroupDesc, ParticleManager};

fn desc(core: &mut kiln_core::GraphicsCore, max_instances: u32) -> (ParticleGroupDesc, Texture) {
    let texture = Texture::white(&core.device, &mut core.descriptors.cbv_srv_uav).unwrap();
    let desc = ParticleGroupDesc {
        max_instances,
        blend: BlendMode::Add,
        depth_write: DepthWrite::Disabled,
        texture: texture.srv_table().unwrap(),
    };
    (desc, texture)
}

fn emitter() -> ParticleEmitter {
    ParticleEmitter {
        count: 16,
        frequency: 0.25,
        lifetime: (0.5, 1.0),
        ..ParticleEmitter::default()
    }
}

#[test]
fn test_gpu_groups_initialize_once() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut particles = ParticleManager::new(&mut core).unwrap();
    assert!(particles.simulates_on_gpu());

    let (desc, _texture) = desc(&mut core, 1024);
    let group = particles.create_group(&mut core, desc).unwrap();
    particles.add_emitter(group, emitter()).unwrap().unwrap();

    core.begin_frame().unwrap();
    // Initialize, emit, update.
    let before = core.context.stats();
    particles.update(&mut core.context, 0.25).unwrap();
    assert_eq!(core.context.stats().since(before).dispatches, 3);
    assert!(particles.group(group).unwrap().is_initialized());

    // Emit and update only.
    let before = core.context.stats();
    particles.update(&mut core.context, 0.25).unwrap();
    assert_eq!(core.context.stats().since(before).dispatches, 2);

    let commands = recorded_commands(core.context.native_mut());
    let emits = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::Dispatch(1, 1, 1)))
        .count();
    assert_eq!(emits, 2);
    assert!(commands
        .iter()
        .any(|c| matches!(c, MockCommand::Dispatch(4, 1, 1))));
}

#[test]
fn test_groups_draw_every_slot() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let (color, depth) = scene_targets(&mut core);
    let camera = camera(&core);
    let mut particles = ParticleManager::new(&mut core).unwrap();
    let (desc, _texture) = desc(&mut core, 100);
    particles.create_group(&mut core, desc).unwrap();

    core.begin_frame().unwrap();
    particles.update(&mut core.context, 0.016).unwrap();
    particles
        .draw(&mut core.context, camera.gpu_virtual_address(), &color, &depth)
        .unwrap();
    let commands = recorded_commands(core.context.native_mut());
    assert!(commands.iter().any(|c| matches!(
        c,
        MockCommand::DrawInstanced {
            vertex_count: 6,
            instance_count: 100
        }
    )));
}

#[test]
fn test_cpu_fallback_conserves_the_pool() {
    let mock = MockDevice::without_compute();
    let mut core = mock_core(&mock);
    let mut particles = ParticleManager::new(&mut core).unwrap();
    assert!(!particles.simulates_on_gpu());

    let (desc, _texture) = desc(&mut core, 64);
    let group = particles.create_group(&mut core, desc).unwrap();
    particles.add_emitter(group, emitter()).unwrap().unwrap();

    core.begin_frame().unwrap();
    let before = core.context.stats();
    for _ in 0..40 {
        particles.update(&mut core.context, 0.125).unwrap();
        let pool = particles.group(group).unwrap().cpu_pool().unwrap();
        assert_eq!(pool.live_count() + pool.free_count(), pool.capacity());
    }
    assert_eq!(core.context.stats().since(before).dispatches, 0);
    assert!(particles.group(group).unwrap().cpu_pool().unwrap().live_count() > 0);
}

#[test]
fn test_emitters_of_removed_groups_are_rejected() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut particles = ParticleManager::new(&mut core).unwrap();
    let (desc, _texture) = desc(&mut core, 8);
    let group = particles.create_group(&mut core, desc).unwrap();
    assert!(particles.remove_group(group));
    assert!(particles.add_emitter(group, emitter()).unwrap().is_none());
    assert_eq!(particles.group_count(), 0);
}
