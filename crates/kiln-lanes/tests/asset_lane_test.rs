use kiln_core::gpu::DescriptorAllocator;
use kiln_core::mock::MockDevice;
use kiln_core::renderer::api::DescriptorHeapKind;
use kiln_core::renderer::GraphicsDevice;
use kiln_lanes::asset_lane::{AssetError, ModelManager, TextureManager};
use std::path::PathBuf;
use std::sync::Arc;

fn models_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/models"))
}

#[test]
fn test_bundled_cube_loads_with_its_texture() {
    let mock = MockDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock.clone());
    let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapKind::CbvSrvUav, 8);
    let mut models = ModelManager::new(device.clone());
    let mut textures = TextureManager::new(device, &mut allocator).unwrap();

    let cube = models.load(models_dir(), "cube.obj").unwrap();
    // Six quads, two triangles each.
    assert_eq!(cube.index_count(), 36);
    let texture = cube.diffuse_texture().unwrap().to_path_buf();
    assert_eq!(texture, models_dir().join("checker.png"));

    let table = textures.load(&mut allocator, &texture).unwrap();
    assert_eq!(textures.get(&texture), table);
    assert_eq!(textures.size(&texture), Some((64, 64)));
}

#[test]
fn test_missing_model_is_an_io_error() {
    let mock = MockDevice::new();
    let mut models = ModelManager::new(Arc::new(mock));
    assert!(matches!(
        models.load(models_dir(), "missing.obj"),
        Err(AssetError::Io { .. })
    ));
    assert!(models.is_empty());
}
