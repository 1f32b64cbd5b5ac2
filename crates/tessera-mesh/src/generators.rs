//! Deterministic meshes for tests, benchmarks and the CLI

use std::f32::consts::{PI, TAU};

use tessera_core::math::{Vec2, Vec3};

use crate::mesh::Mesh;

/// One counter-clockwise triangle in the XY plane
pub fn triangle() -> Mesh {
    Mesh::from_buffers(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]])
}

/// Closed, outward-wound cube spanning `[-1, 1]` on every axis.
/// 8 shared corners, 12 triangles, no attributes.
pub fn cube() -> Mesh {
    let positions = vec![
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ];
    let triangles = vec![
        [0, 1, 2],
        [0, 2, 3],
        [7, 4, 0],
        [7, 0, 3],
        [4, 5, 1],
        [4, 1, 0],
        [5, 6, 2],
        [5, 2, 1],
        [3, 2, 6],
        [3, 6, 7],
        [6, 5, 4],
        [6, 4, 7],
    ];
    Mesh::from_buffers(positions, triangles)
}

/// Flat grid of `cols x rows` cells in the XY plane facing +Z, with its
/// lower-left corner at the origin. Carries +Z normals and `[0, 1]` UVs.
///
/// Vertex `(i, j)` has id `j * (cols + 1) + i`.
pub fn quad_grid(cols: u32, rows: u32, width: f32, height: f32) -> Mesh {
    let (cols, rows) = (cols.max(1), rows.max(1));
    let stride = cols + 1;

    let mut positions = Vec::with_capacity(((cols + 1) * (rows + 1)) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());
    for j in 0..=rows {
        for i in 0..=cols {
            let uv = Vec2::new(i as f32 / cols as f32, j as f32 / rows as f32);
            positions.push(Vec3::new(uv.x * width, uv.y * height, 0.0));
            uvs.push(uv);
        }
    }

    let mut triangles = Vec::with_capacity((cols * rows * 2) as usize);
    for j in 0..rows {
        for i in 0..cols {
            let v00 = j * stride + i;
            let v10 = v00 + 1;
            let v01 = v00 + stride;
            let v11 = v01 + 1;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    let vertex_count = positions.len();
    Mesh {
        positions,
        normals: vec![Vec3::Z; vertex_count],
        uvs,
        triangles,
        ..Mesh::default()
    }
}

/// Latitude/longitude sphere centred on the origin with outward normals and
/// UVs.
///
/// The seam column and both poles are duplicated per segment, so co-located
/// vertices with distinct ids exist by construction. Duplicates carry
/// bit-identical positions.
pub fn uv_sphere(segments: u32, rings: u32, radius: f32) -> Mesh {
    let (segments, rings) = (segments.max(3), rings.max(2));
    let stride = segments + 1;

    let mut positions = Vec::with_capacity((stride * (rings + 1)) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());
    for r in 0..=rings {
        let theta = PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let phi = TAU * (s % segments) as f32 / segments as f32;
            let dir = if r == 0 {
                Vec3::Y
            } else if r == rings {
                Vec3::NEG_Y
            } else {
                Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
            };
            positions.push(dir * radius);
            normals.push(dir);
            uvs.push(Vec2::new(s as f32 / segments as f32, r as f32 / rings as f32));
        }
    }

    let mut triangles = Vec::with_capacity((segments * rings * 2) as usize);
    for r in 0..rings {
        for s in 0..segments {
            let top_left = r * stride + s;
            let top_right = top_left + 1;
            let bottom_left = top_left + stride;
            let bottom_right = bottom_left + 1;

            // One triangle per cell next to a pole
            if r != 0 {
                triangles.push([top_left, top_right, bottom_left]);
            }
            if r != rings - 1 {
                triangles.push([top_right, bottom_right, bottom_left]);
            }
        }
    }

    Mesh {
        positions,
        normals,
        uvs,
        triangles,
        ..Mesh::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let mesh = cube();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_cube_faces_outward() {
        let mesh = cube();
        for &[a, b, c] in mesh.triangles() {
            let (pa, pb, pc) = (mesh.position(a as usize), mesh.position(b as usize), mesh.position(c as usize));
            let normal = (pb - pa).cross(pc - pa);
            let center = (pa + pb + pc) / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }

    #[test]
    fn test_quad_grid_layout() {
        let mesh = quad_grid(3, 2, 3.0, 1.0);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.has_normals());
        assert!(mesh.has_uvs());
        assert!((mesh.position(5) - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-6);
        for &[a, b, c] in mesh.triangles() {
            let (pa, pb, pc) = (mesh.position(a as usize), mesh.position(b as usize), mesh.position(c as usize));
            assert!((pb - pa).cross(pc - pa).z > 0.0);
        }
    }

    #[test]
    fn test_uv_sphere_faces_outward() {
        let mesh = uv_sphere(8, 6, 2.0);
        assert_eq!(mesh.vertex_count(), 9 * 7);
        // Two triangles per cell except one per polar cell
        assert_eq!(mesh.triangle_count(), 8 * 6 * 2 - 2 * 8);
        assert!(mesh.validate().is_ok());

        for &[a, b, c] in mesh.triangles() {
            let (pa, pb, pc) = (mesh.position(a as usize), mesh.position(b as usize), mesh.position(c as usize));
            let normal = (pb - pa).cross(pc - pa);
            assert!(normal.length() > 0.0);
            assert!(normal.dot((pa + pb + pc) / 3.0) > 0.0);
        }
        // Seam and pole copies coincide exactly
        assert_eq!(mesh.position(9), mesh.position(17));
        assert_eq!(mesh.position(0), mesh.position(5));
        assert_eq!(mesh.position(6 * 9), Vec3::new(0.0, -2.0, 0.0));

        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            assert!((p.length() - 2.0).abs() < 1e-5);
            assert!((*p / 2.0 - *n).length() < 1e-5);
        }
    }
}
