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

//! GPU-side data layouts shared by the render lanes and their shaders.
//!
//! Every struct here is `#[repr(C)]` and `Pod` so it can be copied verbatim
//! into an upload buffer; field order matches the WGSL declarations.

use bytemuck::{Pod, Zeroable};
use kiln_core::math::{LinearRgba, Mat4, Vec3};

/// One mesh vertex as consumed by `object3d.wgsl`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position, `w = 1`.
    pub position: [f32; 4],
    /// Texture coordinate.
    pub texcoord: [f32; 2],
    /// Padding to 16 bytes.
    pub _pad0: [f32; 2],
    /// Normal.
    pub normal: [f32; 3],
    /// Padding to 16 bytes.
    pub _pad1: f32,
}

impl Vertex {
    /// The size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Creates a vertex.
    pub fn new(position: [f32; 3], texcoord: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            texcoord,
            _pad0: [0.0; 2],
            normal,
            _pad1: 0.0,
        }
    }
}

/// Per-view constants.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CameraConstants {
    /// `projection * view`.
    pub view_projection: Mat4,
    /// World to view.
    pub view: Mat4,
    /// View to clip.
    pub projection: Mat4,
    /// The camera rotation, used to face billboards toward the viewer.
    pub billboard: Mat4,
    /// World-space camera position, `w = 1`.
    pub position: [f32; 4],
}

impl CameraConstants {
    /// Builds the constants of a camera at `eye` looking at `target`.
    ///
    /// Falls back to an identity view when `eye` and `target` coincide.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_lh(eye, target, Vec3::Y).unwrap_or(Mat4::IDENTITY);
        let projection = Mat4::perspective_lh(fov_y, aspect, near, far);
        let mut billboard = view.transpose();
        billboard.cols[3] = kiln_core::math::Vec4::W;
        billboard.cols[0].w = 0.0;
        billboard.cols[1].w = 0.0;
        billboard.cols[2].w = 0.0;
        Self {
            view_projection: projection * view,
            view,
            projection,
            billboard,
            position: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

/// Per-object transform.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct WorldTransformConstants {
    /// Object to world.
    pub world: Mat4,
}

impl Default for WorldTransformConstants {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
        }
    }
}

/// Per-material surface parameters.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialConstants {
    /// Albedo multiplier.
    pub color: LinearRgba,
    /// Texture coordinate transform.
    pub uv_transform: Mat4,
    /// Non-zero to apply lighting.
    pub enable_lighting: u32,
    /// Specular exponent.
    pub shininess: f32,
    /// Fragments whose mask value is below this are discarded.
    pub dissolve_threshold: f32,
    /// Padding.
    pub _pad: f32,
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            color: LinearRgba::WHITE,
            uv_transform: Mat4::IDENTITY,
            enable_lighting: 1,
            shininess: 32.0,
            dissolve_threshold: 0.0,
            _pad: 0.0,
        }
    }
}

/// The directional light and the matrix of its shadow camera.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LightConstants {
    /// World to light clip space.
    pub light_view_projection: Mat4,
    /// Direction the light travels, `w = 0`.
    pub direction: [f32; 4],
    /// Light color, `a` holds the intensity.
    pub color: LinearRgba,
    /// Depth bias applied when comparing against the shadow map.
    pub shadow_bias: f32,
    /// Size of the shadow map in texels.
    pub shadow_map_size: f32,
    /// Padding.
    pub _pad: [f32; 2],
}

/// A directional light casting shadows over an orthographic volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels.
    pub direction: Vec3,
    /// Color.
    pub color: LinearRgba,
    /// Intensity.
    pub intensity: f32,
    /// The point the shadow camera looks at.
    pub focus: Vec3,
    /// Extent of the shadow volume.
    pub shadow_extent: f32,
    /// Depth bias.
    pub shadow_bias: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.3, -1.0, 0.5).normalize(),
            color: LinearRgba::WHITE,
            intensity: 1.0,
            focus: Vec3::ZERO,
            shadow_extent: 40.0,
            shadow_bias: 0.002,
        }
    }
}

impl DirectionalLight {
    /// Packs the light for `object3d.wgsl` and `shadow.wgsl`.
    pub fn constants(&self, shadow_map_size: u32) -> LightConstants {
        let direction = self.direction.normalize();
        let distance = self.shadow_extent;
        let eye = self.focus - direction * distance;
        let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_lh(eye, self.focus, up).unwrap_or(Mat4::IDENTITY);
        let projection = Mat4::orthographic_lh(
            self.shadow_extent,
            self.shadow_extent,
            0.1,
            distance * 2.0,
        );
        LightConstants {
            light_view_projection: projection * view,
            direction: [direction.x, direction.y, direction.z, 0.0],
            color: self.color.with_alpha(self.intensity),
            shadow_bias: self.shadow_bias,
            shadow_map_size: shadow_map_size as f32,
            _pad: [0.0; 2],
        }
    }
}

/// A line vertex for debug overlays.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LineVertex {
    /// Position, `w = 1`.
    pub position: [f32; 4],
    /// Color.
    pub color: LinearRgba,
}

impl LineVertex {
    /// The size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<LineVertex>() as u32;
}

/// One joint of a skinning palette.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SkinningMatrix {
    /// Bind pose to animated pose, in skeleton space.
    pub skeleton_space: Mat4,
}

/// Up to four joint influences of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VertexInfluence {
    /// Weights, summing to one.
    pub weights: [f32; 4],
    /// Joint indices into the palette.
    pub indices: [u32; 4],
}

/// Constants of one skinning dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SkinningInformation {
    /// Number of vertices to skin.
    pub vertex_count: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_match_shader_declarations() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        assert_eq!(std::mem::size_of::<LineVertex>(), 32);
        assert_eq!(std::mem::size_of::<VertexInfluence>(), 32);
        assert_eq!(std::mem::size_of::<CameraConstants>(), 272);
        assert_eq!(std::mem::size_of::<MaterialConstants>(), 96);
        assert_eq!(std::mem::size_of::<LightConstants>(), 112);
    }

    #[test]
    fn test_light_looks_along_its_direction() {
        let light = DirectionalLight::default();
        let constants = light.constants(2048);
        let clip = constants.light_view_projection * light.focus.extend(1.0);
        assert!(clip.z > 0.0 && clip.z < 1.0);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
    }
}
