mod common;

use common::{mock_core, TestMesh};
use kiln_core::gpu::{AsResource, ConstantBuffer, ReadWriteBuffer, StructuredBuffer, UploadBuffer};
use kiln_core::math::LinearRgba;
use kiln_core::mock::{recorded_commands, MockCommand, MockDevice};
use kiln_core::renderer::api::{PrimitiveTopology, ResourceBarrier, ResourceState};
use kiln_core::renderer::RenderError;
use kiln_core::GraphicsCore;
use kiln_lanes::render_lane::{
    Bone, DrawPass, LineVertex, Renderer, RendererSettings, ShadowObject, SkinningInformation,
    SkinningMatrix, SkinningObject, Vertex, VertexInfluence,
};

fn renderer(core: &mut kiln_core::GraphicsCore) -> Renderer {
    Renderer::new(
        core,
        RendererSettings {
            size: (64, 64),
            shadow_map_size: 128,
            ..RendererSettings::default()
        },
    )
    .unwrap()
}

fn indexed_draws(commands: &[MockCommand]) -> Vec<u32> {
    commands
        .iter()
        .filter_map(|c| match c {
            MockCommand::DrawIndexedInstanced { index_count, .. } => Some(*index_count),
            _ => None,
        })
        .collect()
}

#[test]
fn test_render_empties_every_queue() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut renderer = renderer(&mut core);
    let mesh = TestMesh::new(&mut core);

    core.begin_frame().unwrap();
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 3));
    renderer.add_shadow_object(ShadowObject {
        vertex_buffer: mesh.sort_object(DrawPass::Opaque, 3).vertex_buffer,
        index_buffer: mesh.sort_object(DrawPass::Opaque, 3).index_buffer,
        world_transform: mesh.world.gpu_virtual_address(),
        index_count: 3,
    });
    assert!(!renderer.is_empty());

    let stats = renderer.render(&mut core.context).unwrap();
    assert!(renderer.is_empty());
    assert_eq!(stats.draw_calls, 2);

    // Nothing was resubmitted, so the next frame draws nothing.
    let stats = renderer.render(&mut core.context).unwrap();
    assert_eq!(stats.draw_calls, 0);
    core.end_frame().unwrap();
}

#[test]
fn test_opaque_objects_draw_before_transparent_ones() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut renderer = renderer(&mut core);
    let mesh = TestMesh::new(&mut core);

    core.begin_frame().unwrap();
    renderer.submit(mesh.sort_object(DrawPass::Transparent, 6));
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 3));
    renderer.submit(mesh.sort_object(DrawPass::Transparent, 6));
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 3));
    let stats = renderer.render(&mut core.context).unwrap();

    // One switch into the opaque pipeline and one into the transparent one.
    assert_eq!(stats.pipeline_switches, 2);
    let commands = recorded_commands(core.context.native_mut());
    assert_eq!(indexed_draws(&commands), vec![3, 3, 6, 6]);
}

#[test]
fn test_empty_frame_still_clears_the_targets() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut renderer = renderer(&mut core);

    core.begin_frame().unwrap();
    let stats = renderer.render(&mut core.context).unwrap();
    assert_eq!(stats.draw_calls, 0);

    let commands = recorded_commands(core.context.native_mut());
    let depth_clears = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::ClearDepthStencil(..)))
        .count();
    // Shadow map and scene depth.
    assert_eq!(depth_clears, 2);
    assert!(commands
        .iter()
        .any(|c| matches!(c, MockCommand::ClearRenderTarget(h, _) if *h == renderer.scene_color().rtv())));
}

fn position(commands: &[MockCommand], predicate: impl Fn(&MockCommand) -> bool) -> usize {
    commands.iter().position(predicate).unwrap()
}

/// Buffers of a three-vertex skinned mesh.
struct SkinnedMesh {
    palette: StructuredBuffer,
    bind_pose: StructuredBuffer,
    influences: StructuredBuffer,
    posed: ReadWriteBuffer,
    information: ConstantBuffer<SkinningInformation>,
}

impl SkinnedMesh {
    fn new(core: &mut GraphicsCore) -> Self {
        let device = core.device.clone();
        let heap = &mut core.descriptors.cbv_srv_uav;
        Self {
            palette: StructuredBuffer::create(
                &device,
                heap,
                "palette",
                std::mem::size_of::<SkinningMatrix>() as u32,
                1,
                None,
            )
            .unwrap(),
            bind_pose: StructuredBuffer::create(&device, heap, "bind pose", Vertex::STRIDE, 3, None)
                .unwrap(),
            influences: StructuredBuffer::create(
                &device,
                heap,
                "influences",
                std::mem::size_of::<VertexInfluence>() as u32,
                3,
                None,
            )
            .unwrap(),
            posed: ReadWriteBuffer::create(&device, heap, "posed", Vertex::STRIDE, 3).unwrap(),
            information: ConstantBuffer::create(
                &device,
                "skinning information",
                &SkinningInformation {
                    vertex_count: 3,
                    _pad: [0; 3],
                },
            )
            .unwrap(),
        }
    }

    fn skinning_object(&self) -> SkinningObject {
        SkinningObject {
            palette: self.palette.srv_table().unwrap(),
            input_vertices: self.bind_pose.srv_table().unwrap(),
            influences: self.influences.srv_table().unwrap(),
            output_vertices: self.posed.uav_table().unwrap(),
            output_resource: self.posed.resource_handle(),
            skinning_information: self.information.gpu_virtual_address(),
            vertex_count: 3,
        }
    }
}

#[test]
fn test_passes_run_skinning_shadow_geometry_then_bones() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut renderer = renderer(&mut core);
    let mesh = TestMesh::new(&mut core);
    let skinned = SkinnedMesh::new(&mut core);
    let line = [
        LineVertex {
            position: [0.0, 0.0, 0.0, 1.0],
            color: LinearRgba::WHITE,
        },
        LineVertex {
            position: [0.0, 1.0, 0.0, 1.0],
            color: LinearRgba::WHITE,
        },
    ];
    let line_buffer =
        UploadBuffer::with_data(&core.device, "bone lines", bytemuck::cast_slice(&line)).unwrap();

    core.begin_frame().unwrap();
    renderer.add_skinning_object(skinned.skinning_object());
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 3));
    renderer.add_bone(Bone {
        vertex_buffer: line_buffer.vertex_buffer_view(LineVertex::STRIDE, 2 * LineVertex::STRIDE),
        world_transform: mesh.world.gpu_virtual_address(),
        camera: mesh.camera.gpu_virtual_address(),
        vertex_count: 2,
    });
    let stats = renderer.render(&mut core.context).unwrap();
    assert!(renderer.is_empty());
    assert_eq!(stats.dispatches, 1);

    let commands = recorded_commands(core.context.native_mut());
    let posed = skinned.posed.resource_handle().id;
    let shadow_dsv = renderer.shadow_map().dsv();

    let dispatch = position(&commands, |c| matches!(c, MockCommand::Dispatch(1, 1, 1)));
    let to_unordered = position(&commands, |c| {
        *c == MockCommand::Barrier(ResourceBarrier::Transition {
            resource: posed,
            before: ResourceState::Common,
            after: ResourceState::UnorderedAccess,
        })
    });
    assert!(to_unordered < dispatch);
    assert_eq!(
        commands[dispatch + 1],
        MockCommand::Barrier(ResourceBarrier::Transition {
            resource: posed,
            before: ResourceState::UnorderedAccess,
            after: ResourceState::VertexAndConstantBuffer,
        })
    );

    let shadow_clear =
        position(&commands, |c| matches!(c, MockCommand::ClearDepthStencil(h, _) if *h == shadow_dsv));
    assert!(dispatch < shadow_clear);

    let mesh_draw = position(&commands, |c| matches!(c, MockCommand::DrawIndexedInstanced { .. }));
    let bone_draw = position(&commands, |c| {
        matches!(
            c,
            MockCommand::DrawInstanced {
                vertex_count: 2,
                instance_count: 1
            }
        )
    });
    assert!(shadow_clear < mesh_draw);
    assert!(mesh_draw < bone_draw);
    let topology = commands[..bone_draw]
        .iter()
        .rev()
        .find_map(|c| match c {
            MockCommand::SetPrimitiveTopology(t) => Some(*t),
            _ => None,
        });
    assert_eq!(topology, Some(PrimitiveTopology::LineList));
}

#[test]
fn test_rejected_frame_is_not_replayed() {
    let mock = MockDevice::new();
    let mut core = mock_core(&mock);
    let mut renderer = renderer(&mut core);
    let mesh = TestMesh::new(&mut core);

    core.begin_frame().unwrap();
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 3));
    // Six indices fit in the buffer, seven do not.
    renderer.submit(mesh.sort_object(DrawPass::Opaque, 7));
    renderer.add_bone(Bone {
        vertex_buffer: mesh.sort_object(DrawPass::Opaque, 3).vertex_buffer,
        world_transform: mesh.world.gpu_virtual_address(),
        camera: mesh.camera.gpu_virtual_address(),
        vertex_count: 2,
    });
    assert!(matches!(
        renderer.render(&mut core.context),
        Err(RenderError::Submission(_))
    ));
    assert!(renderer.is_empty());

    let stats = renderer.render(&mut core.context).unwrap();
    assert_eq!(stats.draw_calls, 0);
    core.end_frame().unwrap();
}
