#![allow(dead_code)]

use kiln_core::gpu::{ColorBuffer, ConstantBuffer, DepthBuffer, GraphicsSettings, Texture, UploadBuffer};
use kiln_core::math::{LinearRgba, Vec3};
use kiln_core::mock::{MockDevice, MockSwapChain};
use kiln_core::renderer::api::{Format, IndexFormat};
use kiln_core::GraphicsCore;
use kiln_lanes::render_lane::{
    CameraConstants, DrawPass, MaterialConstants, SortObject, Vertex, WorldTransformConstants,
};
use std::path::PathBuf;
use std::sync::Arc;

pub fn shader_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/shaders"))
}

pub fn mock_core(mock: &MockDevice) -> GraphicsCore {
    let settings = GraphicsSettings {
        shader_dir: shader_dir(),
        ..GraphicsSettings::default()
    };
    GraphicsCore::new(
        Arc::new(mock.clone()),
        Box::new(mock.create_queue()),
        Box::new(MockSwapChain::new(mock, 64, 64).unwrap()),
        settings,
    )
    .unwrap()
}

pub fn scene_targets(core: &mut GraphicsCore) -> (ColorBuffer, DepthBuffer) {
    let device = core.device.clone();
    let color = ColorBuffer::create(
        &device,
        &mut core.descriptors.rtv,
        &mut core.descriptors.cbv_srv_uav,
        "test color",
        (64, 64),
        Format::Rgba16Float,
        LinearRgba::BLACK,
    )
    .unwrap();
    let depth = DepthBuffer::create(
        &device,
        &mut core.descriptors.dsv,
        Some(&mut core.descriptors.cbv_srv_uav),
        "test depth",
        (64, 64),
    )
    .unwrap();
    (color, depth)
}

pub fn camera(core: &GraphicsCore) -> ConstantBuffer<CameraConstants> {
    let constants = CameraConstants::look_at(
        Vec3::new(0.0, 2.0, -5.0),
        Vec3::ZERO,
        std::f32::consts::FRAC_PI_4,
        1.0,
        0.1,
        100.0,
    );
    ConstantBuffer::create(&core.device, "test camera", &constants).unwrap()
}

/// A triangle, indexed from both sides, with everything a geometry-pass
/// draw references.
pub struct TestMesh {
    pub vertices: UploadBuffer,
    pub indices: UploadBuffer,
    pub material: ConstantBuffer<MaterialConstants>,
    pub world: ConstantBuffer<WorldTransformConstants>,
    pub camera: ConstantBuffer<CameraConstants>,
    pub texture: Texture,
}

impl TestMesh {
    pub fn new(core: &mut GraphicsCore) -> Self {
        let device = core.device.clone();
        let vertices = [
            Vertex::new([0.0, 1.0, 0.0], [0.5, 0.0], [0.0, 0.0, -1.0]),
            Vertex::new([1.0, -1.0, 0.0], [1.0, 1.0], [0.0, 0.0, -1.0]),
            Vertex::new([-1.0, -1.0, 0.0], [0.0, 1.0], [0.0, 0.0, -1.0]),
        ];
        let indices: [u32; 6] = [0, 1, 2, 2, 1, 0];
        Self {
            vertices: UploadBuffer::with_data(&device, "vertices", bytemuck::cast_slice(&vertices))
                .unwrap(),
            indices: UploadBuffer::with_data(&device, "indices", bytemuck::cast_slice(&indices))
                .unwrap(),
            material: ConstantBuffer::create(&device, "material", &MaterialConstants::default())
                .unwrap(),
            world: ConstantBuffer::create(&device, "world", &WorldTransformConstants::default())
                .unwrap(),
            camera: camera(core),
            texture: Texture::white(&device, &mut core.descriptors.cbv_srv_uav).unwrap(),
        }
    }

    pub fn sort_object(&self, draw_pass: DrawPass, index_count: u32) -> SortObject {
        let table = self.texture.srv_table().unwrap();
        SortObject {
            vertex_buffer: self.vertices.vertex_buffer_view(Vertex::STRIDE, 3 * Vertex::STRIDE),
            index_buffer: self.indices.index_buffer_view(IndexFormat::Uint32, 24),
            material: self.material.gpu_virtual_address(),
            world_transform: self.world.gpu_virtual_address(),
            camera: self.camera.gpu_virtual_address(),
            texture: table,
            mask_texture: table,
            index_count,
            draw_pass,
        }
    }
}
