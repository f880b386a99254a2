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

use bytemuck::{Pod, Zeroable};
use kiln_core::gpu::UploadBuffer;
use kiln_core::math::{LinearRgba, Vec3};
use kiln_core::renderer::api::VertexBufferView;
use kiln_core::renderer::{GraphicsDevice, ResourceError};
use std::collections::VecDeque;
use std::sync::Arc;

/// One ribbon vertex as consumed by `trail.wgsl`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TrailVertex {
    /// Position, `w = 1`.
    pub position: [f32; 4],
    /// Color; alpha fades toward the tail.
    pub color: [f32; 4],
    /// `u` runs from head (0) to tail (1), `v` is 0 on the head edge.
    pub texcoord: [f32; 2],
    /// Padding.
    pub _pad: [f32; 2],
}

impl TrailVertex {
    /// The size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<TrailVertex>() as u32;
}

/// Shape and lifetime of a trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSettings {
    /// Seconds a control point survives.
    pub lifetime: f32,
    /// Interpolated points per control segment.
    pub subdivisions: u32,
    /// Control points kept at most.
    pub max_points: usize,
    /// Color at the head.
    pub color: LinearRgba,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            lifetime: 0.3,
            subdivisions: 8,
            max_points: 32,
            color: LinearRgba::WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ControlPoint {
    head: Vec3,
    front: Vec3,
    remaining: f32,
}

/// Resamples a polyline through its points with Catmull-Rom splines.
///
/// End segments reuse the end points as their outer control points. The
/// result has `(n - 1) * subdivisions + 1` points for `n >= 2`.
pub fn catmull_rom_resample(points: &[Vec3], subdivisions: u32) -> Vec<Vec3> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let subdivisions = subdivisions.max(1);
    let last = points.len() - 1;
    let mut out = Vec::with_capacity(last * subdivisions as usize + 1);
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];
        for step in 0..subdivisions {
            let t = step as f32 / subdivisions as f32;
            out.push(Vec3::catmull_rom(p0, p1, p2, p3, t));
        }
    }
    out.push(points[last]);
    out
}

/// A sword-swing style ribbon between two tracked points.
///
/// Each update records where the head and front ends are, ages the older
/// control points and rebuilds the strip in its own upload buffer.
#[derive(Debug)]
pub struct Trail {
    settings: TrailSettings,
    points: VecDeque<ControlPoint>,
    buffer: UploadBuffer,
    vertex_count: u32,
}

impl Trail {
    /// Allocates the vertex buffer for the longest strip `settings` allow.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        settings: TrailSettings,
    ) -> Result<Self, ResourceError> {
        let max_points = settings.max_points.max(2);
        let max_vertices = ((max_points - 1) * settings.subdivisions.max(1) as usize + 1) * 2;
        let buffer = UploadBuffer::create(
            device,
            "trail",
            (max_vertices * TrailVertex::STRIDE as usize) as u64,
        )?;
        Ok(Self {
            settings: TrailSettings {
                max_points,
                ..settings
            },
            points: VecDeque::with_capacity(max_points),
            buffer,
            vertex_count: 0,
        })
    }

    /// Records the current ends, drops expired points and rewrites the strip.
    pub fn update(
        &mut self,
        delta_time: f32,
        head: Vec3,
        front: Vec3,
    ) -> Result<(), ResourceError> {
        for point in &mut self.points {
            point.remaining -= delta_time;
        }
        while self.points.back().is_some_and(|p| p.remaining <= 0.0) {
            self.points.pop_back();
        }
        self.points.push_front(ControlPoint {
            head,
            front,
            remaining: self.settings.lifetime,
        });
        self.points.truncate(self.settings.max_points);
        self.rebuild()
    }

    /// Forgets every control point.
    pub fn clear(&mut self) {
        self.points.clear();
        self.vertex_count = 0;
    }

    fn rebuild(&mut self) -> Result<(), ResourceError> {
        let vertices = self.build_vertices();
        self.vertex_count = vertices.len() as u32;
        if !vertices.is_empty() {
            self.buffer.write(0, bytemuck::cast_slice(&vertices))?;
        }
        Ok(())
    }

    fn build_vertices(&self) -> Vec<TrailVertex> {
        if self.points.len() < 2 {
            return Vec::new();
        }
        let heads: Vec<Vec3> = self.points.iter().map(|p| p.head).collect();
        let fronts: Vec<Vec3> = self.points.iter().map(|p| p.front).collect();
        let heads = catmull_rom_resample(&heads, self.settings.subdivisions);
        let fronts = catmull_rom_resample(&fronts, self.settings.subdivisions);

        let span = (heads.len() - 1).max(1) as f32;
        let color = self.settings.color;
        let mut vertices = Vec::with_capacity(heads.len() * 2);
        for (i, (head, front)) in heads.iter().zip(&fronts).enumerate() {
            let u = i as f32 / span;
            let tint = color.with_alpha(color.a * (1.0 - u)).to_array();
            vertices.push(TrailVertex {
                position: bytemuck::cast(head.extend(1.0)),
                color: tint,
                texcoord: [u, 0.0],
                _pad: [0.0; 2],
            });
            vertices.push(TrailVertex {
                position: bytemuck::cast(front.extend(1.0)),
                color: tint,
                texcoord: [u, 1.0],
                _pad: [0.0; 2],
            });
        }
        vertices
    }

    /// The strip written by the last update.
    pub fn vertex_buffer_view(&self) -> VertexBufferView {
        self.buffer
            .vertex_buffer_view(TrailVertex::STRIDE, self.vertex_count * TrailVertex::STRIDE)
    }

    /// Vertices in the strip.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Live control points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// The settings.
    pub fn settings(&self) -> &TrailSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kiln_core::mock::MockDevice;

    #[test]
    fn test_resample_count_and_endpoints() {
        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(3.0, 1.0, 1.0),
        ];
        let curve = catmull_rom_resample(&points, 4);
        assert_eq!(curve.len(), 3 * 4 + 1);
        assert_eq!(curve[0], points[0]);
        assert_eq!(curve[4], points[1]);
        assert_eq!(curve[12], points[3]);
    }

    #[test]
    fn test_resample_keeps_collinear_points_on_the_line() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        for p in catmull_rom_resample(&points, 5) {
            assert_relative_eq!(p.y, 0.0);
            assert_relative_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn test_expired_points_are_dropped() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let settings = TrailSettings {
            lifetime: 0.25,
            subdivisions: 2,
            ..TrailSettings::default()
        };
        let mut trail = Trail::new(&device, settings).unwrap();
        for i in 0..10 {
            let x = i as f32;
            trail
                .update(0.1, Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 0.0))
                .unwrap();
        }
        assert_eq!(trail.point_count(), 3);
        assert_eq!(trail.vertex_count(), ((3 - 1) * 2 + 1) * 2);
    }

    #[test]
    fn test_single_point_draws_nothing() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(MockDevice::new());
        let mut trail = Trail::new(&device, TrailSettings::default()).unwrap();
        trail.update(0.016, Vec3::ZERO, Vec3::Y).unwrap();
        assert_eq!(trail.vertex_count(), 0);
    }
}
