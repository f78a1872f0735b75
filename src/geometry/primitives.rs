use std::f32::consts::{PI, TAU};

use super::Geometry;

/// Box centred on the origin, one segment per face.
pub fn box_geometry(width: f32, height: f32, depth: f32) -> Geometry {
    box_segmented(width, height, depth, [1, 1, 1])
}

/// Builds the six faces in the order +x, -x, +y, -y, +z, -z. Each face gets its own
/// vertices so normals and uvs stay sharp at the edges.
pub fn box_segmented(width: f32, height: f32, depth: f32, segments: [u32; 3]) -> Geometry {
    let [ws, hs, ds] = segments.map(|s| s.max(1));
    let mut geometry = Geometry::default();
    // (u axis, v axis, w axis, u dir, v dir, extent u, extent v, extent w, grid x, grid y)
    let faces = [
        (2, 1, 0, -1.0, -1.0, depth, height, width, ds, hs),
        (2, 1, 0, 1.0, -1.0, depth, height, -width, ds, hs),
        (0, 2, 1, 1.0, 1.0, width, depth, height, ws, ds),
        (0, 2, 1, 1.0, -1.0, width, depth, -height, ws, ds),
        (0, 1, 2, 1.0, -1.0, width, height, depth, ws, hs),
        (0, 1, 2, -1.0, -1.0, width, height, -depth, ws, hs),
    ];
    for (u, v, w, udir, vdir, fw, fh, fd, grid_x, grid_y) in faces {
        build_face(&mut geometry, [u, v, w], udir, vdir, fw, fh, fd, grid_x, grid_y);
    }
    geometry
}

#[allow(clippy::too_many_arguments)]
fn build_face(
    geometry: &mut Geometry,
    [u, v, w]: [usize; 3],
    udir: f32,
    vdir: f32,
    width: f32,
    height: f32,
    depth: f32,
    grid_x: u32,
    grid_y: u32,
) {
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;
    let width_half = width / 2.0;
    let height_half = height / 2.0;
    let depth_half = depth / 2.0;
    let grid_x1 = grid_x + 1;
    let grid_y1 = grid_y + 1;
    let offset = geometry.vertex_count() as u32;

    for iy in 0..grid_y1 {
        let y = iy as f32 * segment_height - height_half;
        for ix in 0..grid_x1 {
            let x = ix as f32 * segment_width - width_half;
            let mut position = [0.0; 3];
            position[u] = x * udir;
            position[v] = y * vdir;
            position[w] = depth_half;
            let mut normal = [0.0; 3];
            normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };
            let uv = [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32];
            geometry.push_vertex(position, normal, uv);
        }
    }

    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = offset + ix + grid_x1 * iy;
            let b = offset + ix + grid_x1 * (iy + 1);
            let c = offset + (ix + 1) + grid_x1 * (iy + 1);
            let d = offset + (ix + 1) + grid_x1 * iy;
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}

/// Plane in the xy plane facing +z.
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let grid_x1 = grid_x + 1;
    let grid_y1 = grid_y + 1;
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;
    let width_half = width / 2.0;
    let height_half = height / 2.0;

    let mut geometry = Geometry::default();
    for iy in 0..grid_y1 {
        let y = iy as f32 * segment_height - height_half;
        for ix in 0..grid_x1 {
            let x = ix as f32 * segment_width - width_half;
            geometry.push_vertex(
                [x, -y, 0.0],
                [0.0, 0.0, 1.0],
                [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32],
            );
        }
    }
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iy;
            let b = ix + grid_x1 * (iy + 1);
            let c = (ix + 1) + grid_x1 * (iy + 1);
            let d = (ix + 1) + grid_x1 * iy;
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    geometry
}

/// Uv sphere. The pole rows only emit one triangle per segment.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut geometry = Geometry::default();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);
    let mut index = 0;

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;
            let theta = v * PI;
            let position = [
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            ];
            geometry.push_vertex(
                position,
                Geometry::normalized(position),
                [u + u_offset, 1.0 - v],
            );
            row.push(index);
            index += 1;
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                geometry.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                geometry.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    geometry
}

/// Torus around the z axis. `radius` is the ring, `tube` the thickness.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Geometry {
    let radial = radial_segments.max(2);
    let tubular = tubular_segments.max(3);
    let mut geometry = Geometry::default();

    for j in 0..=radial {
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let v = j as f32 / radial as f32 * TAU;
            let position = [
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            ];
            let center = [radius * u.cos(), radius * u.sin(), 0.0];
            let normal = Geometry::normalized([
                position[0] - center[0],
                position[1] - center[1],
                position[2] - center[2],
            ]);
            geometry.push_vertex(
                position,
                normal,
                [i as f32 / tubular as f32, j as f32 / radial as f32],
            );
        }
    }

    for j in 1..=radial {
        for i in 1..=tubular {
            let a = (tubular + 1) * j + i - 1;
            let b = (tubular + 1) * (j - 1) + i - 1;
            let c = (tubular + 1) * (j - 1) + i;
            let d = (tubular + 1) * j + i;
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    geometry
}

/// Closed cylinder along y. A zero radius drops that end's cap and its torso triangles.
pub fn cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
    height_segments: u32,
) -> Geometry {
    let radial = radial_segments.max(3);
    let rows = height_segments.max(1);
    let half_height = height / 2.0;
    let slope = (radius_bottom - radius_top) / height;
    let mut geometry = Geometry::default();
    let mut grid = Vec::with_capacity(rows as usize + 1);
    let mut index = 0;

    for y in 0..=rows {
        let v = y as f32 / rows as f32;
        let radius = v * (radius_bottom - radius_top) + radius_top;
        let mut row = Vec::with_capacity(radial as usize + 1);
        for x in 0..=radial {
            let u = x as f32 / radial as f32;
            let theta = u * TAU;
            let (sin, cos) = theta.sin_cos();
            geometry.push_vertex(
                [radius * sin, -v * height + half_height, radius * cos],
                Geometry::normalized([sin, slope, cos]),
                [u, 1.0 - v],
            );
            row.push(index);
            index += 1;
        }
        grid.push(row);
    }

    for x in 0..radial as usize {
        for y in 0..rows as usize {
            let a = grid[y][x];
            let b = grid[y + 1][x];
            let c = grid[y + 1][x + 1];
            let d = grid[y][x + 1];
            if radius_top > 0.0 || y != 0 {
                geometry.indices.extend_from_slice(&[a, b, d]);
            }
            if radius_bottom > 0.0 || y != rows as usize - 1 {
                geometry.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    if radius_top > 0.0 {
        build_cap(&mut geometry, true, radius_top, half_height, radial);
    }
    if radius_bottom > 0.0 {
        build_cap(&mut geometry, false, radius_bottom, half_height, radial);
    }
    geometry
}

fn build_cap(geometry: &mut Geometry, top: bool, radius: f32, half_height: f32, radial: u32) {
    let sign = if top { 1.0 } else { -1.0 };
    let center_start = geometry.vertex_count() as u32;
    for _ in 1..=radial {
        geometry.push_vertex(
            [0.0, half_height * sign, 0.0],
            [0.0, sign, 0.0],
            [0.5, 0.5],
        );
    }
    let center_end = geometry.vertex_count() as u32;
    for x in 0..=radial {
        let theta = x as f32 / radial as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        geometry.push_vertex(
            [radius * sin, half_height * sign, radius * cos],
            [0.0, sign, 0.0],
            [cos * 0.5 + 0.5, sin * 0.5 * sign + 0.5],
        );
    }
    for x in 0..radial {
        let c = center_start + x;
        let i = center_end + x;
        if top {
            geometry.indices.extend_from_slice(&[i, i + 1, c]);
        } else {
            geometry.indices.extend_from_slice(&[i + 1, i, c]);
        }
    }
}

/// Cone with its tip at `+height / 2`.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Geometry {
    cylinder(0.0, radius, height, radial_segments, 1)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    use super::*;

    fn assert_valid(geometry: &Geometry) {
        let count = geometry.vertex_count();
        assert_eq!(geometry.normals.len(), count);
        assert_eq!(geometry.uvs.len(), count);
        assert_eq!(geometry.indices.len() % 3, 0);
        assert!(geometry.indices.iter().all(|&i| (i as usize) < count));
        for n in &geometry.normals {
            assert_relative_eq!(cgmath::Vector3::from(*n).magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn unit_box_has_four_vertices_per_face() {
        let cube = box_geometry(1.0, 1.0, 1.0);
        assert_valid(&cube);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
        // +x face first
        assert_eq!(cube.normals[0], [1.0, 0.0, 0.0]);
        assert_eq!(cube.normals[23], [0.0, 0.0, -1.0]);
    }

    #[test]
    fn box_faces_wind_outwards() {
        let cube = box_geometry(1.0, 1.0, 1.0);
        for tri in cube.indices.chunks_exact(3) {
            let p = |i: u32| cgmath::Vector3::from(cube.positions[i as usize]);
            let face_normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            let n = cgmath::Vector3::from(cube.normals[tri[0] as usize]);
            assert!(face_normal.dot(n) > 0.0);
        }
    }

    #[test]
    fn segmented_plane_counts() {
        let door = plane(2.2, 2.2, 100, 100);
        assert_valid(&door);
        assert_eq!(door.vertex_count(), 101 * 101);
        assert_eq!(door.triangle_count(), 100 * 100 * 2);
    }

    #[test]
    fn sphere_counts_skip_pole_triangles() {
        let ball = sphere(0.5, 64, 64);
        assert_valid(&ball);
        assert_eq!(ball.vertex_count(), 65 * 65);
        assert_eq!(ball.indices.len(), 6 * 64 * 63);
        assert_relative_eq!(ball.positions[0][1], 0.5);
    }

    #[test]
    fn sphere_clamps_segments() {
        let ball = sphere(1.0, 1, 1);
        assert_eq!(ball.vertex_count(), 4 * 3);
    }

    #[test]
    fn torus_counts_and_extent() {
        let ring = torus(0.3, 0.2, 64, 128);
        assert_valid(&ring);
        assert_eq!(ring.vertex_count(), 65 * 129);
        assert_eq!(ring.indices.len(), 64 * 128 * 6);
        let (min, max) = ring.bounds().unwrap();
        assert_relative_eq!(max[0], 0.5, epsilon = 1e-5);
        assert_relative_eq!(min[2], -0.2, epsilon = 1e-5);
    }

    #[test]
    fn cone_has_bottom_cap_only() {
        let roof = cone(3.5, 1.0, 4);
        assert_valid(&roof);
        // torso 5 * 2, cap centres 4, cap rim 5
        assert_eq!(roof.vertex_count(), 19);
        assert_eq!(roof.triangle_count(), 8);
        let (min, max) = roof.bounds().unwrap();
        assert_relative_eq!(max[1], 0.5);
        assert_relative_eq!(min[1], -0.5);
    }

    #[test]
    fn cylinder_with_both_caps() {
        let tube = cylinder(1.0, 1.0, 2.0, 8, 1);
        assert_valid(&tube);
        assert_eq!(tube.triangle_count(), 8 * 2 + 8 * 2);
    }
}
