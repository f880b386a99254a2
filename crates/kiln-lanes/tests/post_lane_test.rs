mod common;

use common::{mock_core, scene_targets};
use kiln_core::gpu::AsResource;
use kiln_core::mock::{recorded_commands, MockCommand, MockDevice};
use kiln_lanes::post_lane::{PostEffectKind, PostProcessChain, VignetteSettings};

#[test]
fn test_disabled_chain_returns_the_scene_untouched() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let (color, depth) = scene_targets(&mut core);
    let chain = PostProcessChain::new(&mut core, (64, 64)).unwrap();
    assert_eq!(chain.enabled_count(), 0);

    core.begin_frame().unwrap();
    let before = core.context.stats();
    let output = chain.apply(&mut core.context, &color, &depth).unwrap();
    assert_eq!(core.context.stats().since(before).draw_calls, 0);
    assert_eq!(output.srv, color.srv_table().unwrap());
    assert_eq!(output.resource, color.resource_handle());
}

#[test]
fn test_enabled_effects_run_in_order() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let (color, depth) = scene_targets(&mut core);
    let mut chain = PostProcessChain::new(&mut core, (64, 64)).unwrap();
    // Enabled out of order on purpose.
    chain.set_enabled(PostEffectKind::Vignette, true);
    chain.set_enabled(PostEffectKind::GrayScale, true);
    chain
        .configure(&VignetteSettings {
            scale: 8.0,
            ..VignetteSettings::default()
        })
        .unwrap();

    core.begin_frame().unwrap();
    let recorded = recorded_commands(core.context.native_mut()).len();
    let before = core.context.stats();
    let output = chain.apply(&mut core.context, &color, &depth).unwrap();
    assert_eq!(core.context.stats().since(before).draw_calls, 2);
    assert_eq!(
        output.resource,
        chain.target(PostEffectKind::Vignette).resource_handle()
    );

    let commands = recorded_commands(core.context.native_mut());
    let targets: Vec<_> = commands[recorded..]
        .iter()
        .filter_map(|c| match c {
            MockCommand::SetRenderTargets(rtvs, None) => rtvs.first().copied(),
            _ => None,
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            chain.target(PostEffectKind::GrayScale).rtv(),
            chain.target(PostEffectKind::Vignette).rtv(),
        ]
    );
}

#[test]
fn test_composite_draws_onto_the_back_buffer() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let (color, depth) = scene_targets(&mut core);
    let chain = PostProcessChain::new(&mut core, (64, 64)).unwrap();

    core.begin_frame().unwrap();
    let output = chain.apply(&mut core.context, &color, &depth).unwrap();
    let before = core.context.stats();
    chain.composite_to_back_buffer(&mut core.context, &output, &core.display);
    assert_eq!(core.context.stats().since(before).draw_calls, 1);
    core.end_frame().unwrap();
}
