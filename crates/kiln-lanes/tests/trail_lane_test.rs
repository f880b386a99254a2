mod common;

use common::{camera, mock_core, scene_targets};
use kiln_core::gpu::{BlendMode, Texture};
use kiln_core::math::Vec3;
use kiln_core::mock::{recorded_commands, MockCommand, MockDevice};
use kiln_lanes::trail_lane::{TrailRenderer, TrailSettings};

#[test]
fn test_trail_draws_once_it_has_a_segment() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let (color, depth) = scene_targets(&mut core);
    let camera = camera(&core);
    let texture = Texture::white(&core.device, &mut core.descriptors.cbv_srv_uav).unwrap();
    let mut trails = TrailRenderer::new(&mut core).unwrap();
    let settings = TrailSettings {
        subdivisions: 4,
        ..TrailSettings::default()
    };
    let key = trails
        .create_trail(settings, BlendMode::Add, texture.srv_table().unwrap())
        .unwrap();

    core.begin_frame().unwrap();
    trails.update_trail(key, 0.01, Vec3::ZERO, Vec3::Y).unwrap();
    let before = core.context.stats();
    trails.draw(&mut core.context, camera.gpu_virtual_address(), &color, &depth);
    assert_eq!(core.context.stats().since(before).draw_calls, 0);

    for step in 1..4 {
        let x = step as f32;
        assert!(trails
            .update_trail(key, 0.01, Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 0.0))
            .unwrap());
    }
    let vertex_count = trails.trail(key).unwrap().vertex_count();
    // Four control points, three segments of four samples, two vertices each.
    assert_eq!(vertex_count, (3 * 4 + 1) * 2);

    trails.draw(&mut core.context, camera.gpu_virtual_address(), &color, &depth);
    let commands = recorded_commands(core.context.native_mut());
    assert!(commands.iter().any(|c| matches!(
        c,
        MockCommand::DrawInstanced { vertex_count: v, instance_count: 1 } if *v == vertex_count
    )));

    assert!(trails.remove_trail(key));
    assert!(!trails.update_trail(key, 0.01, Vec3::ZERO, Vec3::Y).unwrap());
}
