//! CPU geometry: attribute arrays plus triangle indices.
//!
//! Primitive generators live in [`primitives`]. Each emits its vertices grid row by grid
//! row, so vertex counts and face order are predictable. Uvs are stored with
//! `v` pointing up; the flip to wgpu's texture space happens in [`Geometry::to_vertices`].
//!
//! [`points`] holds the particle cloud used by the points pipeline.

use std::collections::HashSet;

use cgmath::InnerSpace;

use crate::data_structures::model::ModelVertex;

pub mod points;
pub mod primitives;

pub use points::{ParticleRaw, PointCloud};
pub use primitives::{box_geometry, cone, cylinder, plane, sphere, torus};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub(crate) fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) {
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
    }

    /// Interleaved vertices with tangent frames for normal mapping.
    ///
    /// Tangents are accumulated per triangle and averaged per vertex. Triangles whose uvs
    /// are degenerate (the poles of a sphere, the tip of a cone) are skipped so they
    /// cannot poison their neighbours with infinities.
    pub fn to_vertices(&self) -> Vec<ModelVertex> {
        let mut vertices = (0..self.positions.len())
            .map(|i| {
                let uv = self.uvs.get(i).copied().unwrap_or([0.0, 0.0]);
                ModelVertex {
                    position: self.positions[i],
                    tex_coords: [uv[0], 1.0 - uv[1]],
                    normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                }
            })
            .collect::<Vec<_>>();
        let mut triangles_included = vec![0u32; vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
            let pos0: cgmath::Vector3<f32> = vertices[i0].position.into();
            let pos1: cgmath::Vector3<f32> = vertices[i1].position.into();
            let pos2: cgmath::Vector3<f32> = vertices[i2].position.into();

            let uv0: cgmath::Vector2<f32> = vertices[i0].tex_coords.into();
            let uv1: cgmath::Vector2<f32> = vertices[i1].tex_coords.into();
            let uv2: cgmath::Vector2<f32> = vertices[i2].tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for wgpu's top-left texture origin
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for i in [i0, i1, i2] {
                let v = &mut vertices[i];
                v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
                v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
                triangles_included[i] += 1;
            }
        }

        for (v, n) in vertices.iter_mut().zip(triangles_included) {
            if n == 0 {
                continue;
            }
            let denom = 1.0 / n as f32;
            v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
        }
        vertices
    }

    /// Line-list indices with every triangle edge exactly once.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(self.indices.len() * 2);
        for c in self.indices.chunks_exact(3) {
            for (a, b) in [(c[0], c[1]), (c[1], c[2]), (c[2], c[0])] {
                let key = (a.min(b), a.max(b));
                if seen.insert(key) {
                    lines.push(a);
                    lines.push(b);
                }
            }
        }
        lines
    }

    /// Axis-aligned bounds of all positions, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(min, max), p| {
            (
                [min[0].min(p[0]), min[1].min(p[1]), min[2].min(p[2])],
                [max[0].max(p[0]), max[1].max(p[1]), max[2].max(p[2])],
            )
        }))
    }

    pub(crate) fn normalized(v: [f32; 3]) -> [f32; 3] {
        let v = cgmath::Vector3::from(v);
        if v.magnitude2() > 0.0 {
            v.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn wireframe_shares_edges_between_triangles() {
        let quad = plane(1.0, 1.0, 1, 1);
        // two triangles share the diagonal
        assert_eq!(quad.wireframe_indices().len(), 5 * 2);
    }

    #[test]
    fn plane_tangent_follows_u() {
        let quad = plane(2.0, 2.0, 1, 1);
        for v in quad.to_vertices() {
            let t = cgmath::Vector3::from(v.tangent).normalize();
            assert_relative_eq!(t.x, 1.0, epsilon = 1e-5);
            let b = cgmath::Vector3::from(v.bitangent).normalize();
            assert_relative_eq!(b.y, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_uvs_keep_tangents_finite() {
        let ball = sphere(1.0, 8, 6);
        assert!(
            ball.to_vertices()
                .iter()
                .all(|v| v.tangent.iter().chain(v.bitangent.iter()).all(|c| c.is_finite()))
        );
    }

    #[test]
    fn uvs_are_flipped_for_upload() {
        let quad = plane(1.0, 1.0, 1, 1);
        let vertices = quad.to_vertices();
        // first vertex is the top left corner with v = 1
        assert_eq!(quad.uvs[0], [0.0, 1.0]);
        assert_eq!(vertices[0].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn bounds_cover_box() {
        let (min, max) = box_geometry(4.0, 2.5, 4.0).bounds().unwrap();
        assert_eq!(min, [-2.0, -1.25, -2.0]);
        assert_eq!(max, [2.0, 1.25, 2.0]);
        assert!(Geometry::default().bounds().is_none());
    }
}
