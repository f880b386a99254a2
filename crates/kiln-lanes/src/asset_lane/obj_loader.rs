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

//! OBJ loading with conversion to the engine's left-handed convention.
//!
//! OBJ files are right-handed with counter-clockwise front faces and a
//! bottom-left texture origin. On load every position and normal has its Z
//! negated, every `v` becomes `1 - v` and every triangle is emitted in
//! reverse corner order, so front faces come out clockwise.

use super::error::AssetError;
use crate::render_lane::Vertex;
use kiln_core::math::Vec3;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Geometry of one OBJ file, ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjMesh {
    /// One vertex per triangle corner.
    pub vertices: Vec<Vertex>,
    /// Sequential triangle-list indices.
    pub indices: Vec<u32>,
    /// The `map_Kd` of the first model's material, resolved against the
    /// OBJ file's directory.
    pub diffuse_texture: Option<PathBuf>,
}

/// Loads an OBJ file and the material library it references.
pub fn load_obj(path: impl AsRef<Path>) -> Result<ObjMesh, AssetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let material_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mesh = load_obj_from_reader(&mut BufReader::new(file), material_dir)?;
    if mesh.vertices.is_empty() {
        return Err(AssetError::NoModels(path.display().to_string()));
    }
    log::debug!(
        "Loaded '{}': {} triangles",
        path.display(),
        mesh.indices.len() / 3
    );
    Ok(mesh)
}

/// Parses OBJ text. `mtllib` references are resolved against `material_dir`.
pub fn load_obj_from_reader<R: BufRead>(
    reader: &mut R,
    material_dir: &Path,
) -> Result<ObjMesh, AssetError> {
    let (models, materials) = tobj::load_obj_buf(
        reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| tobj::load_mtl(material_dir.join(p)),
    )?;
    let materials = materials.unwrap_or_else(|e| {
        log::warn!("Ignoring material library: {e}");
        Vec::new()
    });

    let mut mesh = ObjMesh::default();
    for model in &models {
        append_model(&mut mesh, &model.mesh);
    }
    mesh.diffuse_texture = models
        .first()
        .and_then(|m| m.mesh.material_id)
        .and_then(|id| materials.get(id))
        .and_then(|m| m.diffuse_texture.as_ref())
        .map(|texture| material_dir.join(texture));
    Ok(mesh)
}

fn append_model(out: &mut ObjMesh, mesh: &tobj::Mesh) {
    let position = |i: usize| {
        let p = &mesh.positions[i * 3..i * 3 + 3];
        [p[0], p[1], -p[2]]
    };
    let texcoord = |i: usize| match mesh.texcoords.get(i * 2..i * 2 + 2) {
        Some(t) => [t[0], 1.0 - t[1]],
        None => [0.0, 0.0],
    };
    let normal = |i: usize| {
        mesh.normals
            .get(i * 3..i * 3 + 3)
            .map(|n| [n[0], n[1], -n[2]])
    };

    for triangle in mesh.indices.chunks_exact(3) {
        let corners = [
            triangle[2] as usize,
            triangle[1] as usize,
            triangle[0] as usize,
        ];
        let face_normal = {
            let [a, b, c] = corners.map(|i| {
                let [x, y, z] = position(i);
                Vec3::new(x, y, z)
            });
            (b - a).cross(c - a).normalize().to_array()
        };
        for i in corners {
            out.indices.push(out.vertices.len() as u32);
            out.vertices.push(Vertex::new(
                position(i),
                texcoord(i),
                normal(i).unwrap_or(face_normal),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
";

    #[test]
    fn test_single_triangle_is_converted() {
        let mesh = load_obj_from_reader(&mut Cursor::new(TRIANGLE), Path::new(".")).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);

        // Corners come out as 3, 2, 1.
        let positions: Vec<_> = mesh.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [0.0, 1.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 1.0],
            ]
        );
        let texcoords: Vec<_> = mesh.vertices.iter().map(|v| v.texcoord).collect();
        assert_eq!(texcoords, vec![[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
        assert!(mesh.diffuse_texture.is_none());
    }

    #[test]
    fn test_depth_is_negated() {
        let tilted = "\
v 0 0 0.5
v 1 0 0
v 0 1 1
vt 0 0
vt 1 0
vt 0 0.25
f 1/1 2/2 3/3
";
        let mesh = load_obj_from_reader(&mut Cursor::new(tilted), Path::new(".")).unwrap();
        let first = mesh.vertices[0];
        assert_eq!(first.position, [0.0, 1.0, -1.0, 1.0]);
        assert_relative_eq!(first.texcoord[1], 0.75);
        assert_eq!(mesh.vertices[2].position, [0.0, 0.0, -0.5, 1.0]);
        // Without normals in the file the face normal of the converted triangle is used.
        let n = first.normal;
        assert_relative_eq!((n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_quads_are_triangulated() {
        let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = load_obj_from_reader(&mut Cursor::new(quad), Path::new(".")).unwrap();
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.vertices.len(), 6);
    }
}
