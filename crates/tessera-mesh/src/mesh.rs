//! Indexed triangle mesh storage
//!
//! A [`Mesh`] owns one position per vertex, optional per-vertex attributes
//! and a list of counter-clockwise triangles. An attribute is present exactly
//! when its array has one entry per vertex; there is no separate flag, so
//! replacing the positions with a buffer of another length silently turns the
//! stale attributes into "absent" ones.

use std::borrow::Cow;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tessera_core::Dirty;
use tessera_core::math::{Aabb, BoundingSphere, DVec3, Vec2, Vec3};

use crate::{GeometryError, GeometryResult};

bitflags! {
    /// Optional arrays currently present on a mesh
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attributes: u8 {
        const NORMALS = 0b0_0001;
        const COLORS = 0b0_0010;
        const UVS = 0b0_0100;
        const MESH_IDS = 0b0_1000;
        const MATERIALS = 0b1_0000;
    }
}

/// How [`Mesh::bounding_sphere`] picks its center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SphereCenter {
    /// Triangle centroids weighted by triangle area
    #[default]
    AreaWeighted,
    /// Plain mean of all vertex positions
    PointCloud,
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mesh {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) colors: Vec<Vec3>,
    pub(crate) uvs: Vec<Vec2>,
    /// Per-vertex submesh id
    pub(crate) mesh_ids: Vec<i32>,
    pub(crate) triangles: Vec<[u32; 3]>,
    /// Per-triangle index into `material_names`
    pub(crate) material_ids: Vec<u32>,
    pub(crate) material_names: Vec<String>,
    pub(crate) max_mesh_id: i32,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from positions and triangles, without attributes
    pub fn from_buffers(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
            ..Self::default()
        }
    }

    /// Create a mesh from flat `[x0, y0, z0, x1, ...]` and `[a0, b0, c0, ...]`
    /// buffers. Trailing values that do not form a whole vertex or triangle
    /// are ignored.
    pub fn from_flat(positions: &[f32], triangles: &[u32]) -> Self {
        if positions.len() % 3 != 0 || triangles.len() % 3 != 0 {
            log::warn!(
                "Ignoring trailing values in flat buffers ({} floats, {} indices)",
                positions.len(),
                triangles.len()
            );
        }
        let positions = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();
        let triangles = triangles
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        Self::from_buffers(positions, triangles)
    }

    // --- Sizes ---------------------------------------------------------------

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    // --- Read access ---------------------------------------------------------

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn mesh_ids(&self) -> &[i32] {
        &self.mesh_ids
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn material_ids(&self) -> &[u32] {
        &self.material_ids
    }

    pub fn material_names(&self) -> &[String] {
        &self.material_names
    }

    /// Largest submesh id handed out so far, never below a stored id
    pub fn max_mesh_id(&self) -> i32 {
        if self.has_mesh_ids() {
            self.mesh_ids.iter().copied().fold(self.max_mesh_id, i32::max)
        } else {
            self.max_mesh_id
        }
    }

    /// Returns the position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    /// Returns the three vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        self.triangles[t]
    }

    // --- Presence ------------------------------------------------------------

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() == self.positions.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.positions.len()
    }

    pub fn has_mesh_ids(&self) -> bool {
        !self.mesh_ids.is_empty() && self.mesh_ids.len() == self.positions.len()
    }

    pub fn has_material_ids(&self) -> bool {
        !self.material_ids.is_empty() && self.material_ids.len() == self.triangles.len()
    }

    /// Every optional array currently present
    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::empty();
        attributes.set(Attributes::NORMALS, self.has_normals());
        attributes.set(Attributes::COLORS, self.has_colors());
        attributes.set(Attributes::UVS, self.has_uvs());
        attributes.set(Attributes::MESH_IDS, self.has_mesh_ids());
        attributes.set(Attributes::MATERIALS, self.has_material_ids());
        attributes
    }

    // --- Write access --------------------------------------------------------

    /// Replace the vertex positions
    pub fn set_positions(&mut self, positions: Vec<Vec3>) -> Dirty {
        self.positions = positions;
        Dirty::CHANGED
    }

    pub fn set_normals(&mut self, normals: Vec<Vec3>) -> Dirty {
        self.normals = normals;
        Dirty::CHANGED
    }

    pub fn set_colors(&mut self, colors: Vec<Vec3>) -> Dirty {
        self.colors = colors;
        Dirty::CHANGED
    }

    pub fn set_uvs(&mut self, uvs: Vec<Vec2>) -> Dirty {
        self.uvs = uvs;
        Dirty::CHANGED
    }

    /// Replace the per-vertex submesh ids; `max_mesh_id` follows the new data
    pub fn set_mesh_ids(&mut self, mesh_ids: Vec<i32>) -> Dirty {
        self.max_mesh_id = mesh_ids.iter().copied().max().unwrap_or(0);
        self.mesh_ids = mesh_ids;
        Dirty::CHANGED
    }

    /// Replace the triangle list. Material ids no longer matching the new
    /// triangle count become absent.
    pub fn set_triangles(&mut self, triangles: Vec<[u32; 3]>) -> Dirty {
        self.triangles = triangles;
        Dirty::CHANGED
    }

    /// Replace per-triangle material ids and the id → name table
    pub fn set_materials(&mut self, material_ids: Vec<u32>, names: Vec<String>) -> Dirty {
        self.material_ids = material_ids;
        self.material_names = names;
        Dirty::CHANGED
    }

    // --- Validation ----------------------------------------------------------

    /// Check array lengths and triangle indices
    pub fn validate(&self) -> GeometryResult<()> {
        let n = self.vertex_count();
        let attributes = [
            ("normals", self.normals.len()),
            ("colors", self.colors.len()),
            ("uvs", self.uvs.len()),
            ("mesh_ids", self.mesh_ids.len()),
        ];
        for (attribute, len) in attributes {
            if len != 0 && len != n {
                return Err(GeometryError::AttributeLength {
                    attribute,
                    len,
                    vertex_count: n,
                });
            }
        }

        if !self.material_ids.is_empty() && self.material_ids.len() != self.triangles.len() {
            return Err(GeometryError::MaterialLength {
                len: self.material_ids.len(),
                triangle_count: self.triangles.len(),
            });
        }

        for (t, &tri) in self.triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(GeometryError::IndexOutOfRange {
                    triangle: t,
                    index,
                    vertex_count: n,
                });
            }
            if is_degenerate(tri) {
                return Err(GeometryError::DegenerateTriangle {
                    triangle: t,
                    indices: tri,
                });
            }
        }

        Ok(())
    }

    /// Drop triangles with out-of-range or repeated indices, together with
    /// their material ids.
    pub fn sanitize(&mut self) -> Dirty {
        let keep: Vec<bool> = self
            .triangles
            .iter()
            .map(|&tri| self.is_usable(tri))
            .collect();
        let dropped = keep.iter().filter(|&&k| !k).count();
        if dropped == 0 {
            return Dirty::CLEAN;
        }
        report_dropped("sanitize", dropped);

        if self.has_material_ids() {
            let mut flags = keep.iter();
            self.material_ids.retain(|_| flags.next().copied().unwrap_or(false));
        }
        let mut flags = keep.iter();
        self.triangles.retain(|_| flags.next().copied().unwrap_or(false));
        Dirty::CHANGED
    }

    /// Triangle fits the vertex buffer and has three distinct corners
    #[inline]
    pub(crate) fn is_usable(&self, tri: [u32; 3]) -> bool {
        let n = self.positions.len();
        tri.iter().all(|&i| (i as usize) < n) && !is_degenerate(tri)
    }

    /// The triangle list with malformed entries filtered out. Borrows when
    /// every triangle is usable.
    pub(crate) fn usable_triangles(&self, op: &str) -> Cow<'_, [[u32; 3]]> {
        if self.triangles.iter().all(|&tri| self.is_usable(tri)) {
            return Cow::Borrowed(&self.triangles);
        }
        let usable: Vec<[u32; 3]> = self
            .triangles
            .iter()
            .copied()
            .filter(|&tri| self.is_usable(tri))
            .collect();
        report_dropped(op, self.triangles.len() - usable.len());
        Cow::Owned(usable)
    }

    /// Debug-build check that every optional array is absent or full length
    pub(crate) fn debug_assert_attributes(&self) {
        let n = self.positions.len();
        debug_assert!(self.normals.is_empty() || self.normals.len() == n, "normal count mismatch");
        debug_assert!(self.colors.is_empty() || self.colors.len() == n, "color count mismatch");
        debug_assert!(self.uvs.is_empty() || self.uvs.len() == n, "uv count mismatch");
        debug_assert!(self.mesh_ids.is_empty() || self.mesh_ids.len() == n, "mesh id count mismatch");
    }

    /// Fill every absent attribute with zeros (material 0 named "default")
    pub fn make_whole(&mut self) -> Dirty {
        let n = self.vertex_count();
        let mut changed = false;
        if !self.has_normals() {
            self.normals = vec![Vec3::ZERO; n];
            changed = true;
        }
        if !self.has_colors() {
            self.colors = vec![Vec3::ZERO; n];
            changed = true;
        }
        if !self.has_uvs() {
            self.uvs = vec![Vec2::ZERO; n];
            changed = true;
        }
        if !self.has_mesh_ids() {
            self.mesh_ids = vec![0; n];
            self.max_mesh_id = 0;
            changed = true;
        }
        if !self.has_material_ids() {
            self.material_ids = vec![0; self.triangle_count()];
            if self.material_names.is_empty() {
                self.material_names.push("default".to_string());
            }
            changed = true;
        }
        Dirty::from_changed(changed)
    }

    /// Encode `material_id + 1` into 8-bit RGB channels and write it as the
    /// vertex colors. Vertices shared by several materials take the last one.
    pub fn fill_colors_with_material_ids(&mut self) -> Dirty {
        if !self.has_material_ids() {
            log::debug!("No material ids to encode as colors");
            return Dirty::CLEAN;
        }
        let mut colors = vec![Vec3::ZERO; self.vertex_count()];
        for (t, &tri) in self.triangles.iter().enumerate() {
            if !self.is_usable(tri) {
                continue;
            }
            let id = self.material_ids[t] + 1;
            let encoded = Vec3::new(
                (id & 0xff) as f32,
                ((id >> 8) & 0xff) as f32,
                ((id >> 16) & 0xff) as f32,
            ) / 255.0;
            for &v in &tri {
                colors[v as usize] = encoded;
            }
        }
        self.colors = colors;
        Dirty::CHANGED
    }

    // --- Spatial queries -----------------------------------------------------

    /// Axis-aligned box around every vertex
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Mean vertex position, accumulated in double precision
    pub fn centroid(&self) -> Vec3 {
        if self.positions.is_empty() {
            return Vec3::ZERO;
        }
        let sum: DVec3 = self.positions.iter().map(|p| p.as_dvec3()).sum();
        (sum / self.positions.len() as f64).as_vec3()
    }

    /// Sphere enclosing the mesh.
    ///
    /// With `referenced_only` the radius only considers vertices used by a
    /// triangle. The area-weighted center falls back to the centroid when the
    /// mesh has no triangle area.
    pub fn bounding_sphere(&self, center: SphereCenter, referenced_only: bool) -> BoundingSphere {
        let triangles = self.usable_triangles("bounding_sphere");
        let center = match center {
            SphereCenter::PointCloud => self.centroid(),
            SphereCenter::AreaWeighted => {
                let mut total_area = 0.0f64;
                let mut weighted = DVec3::ZERO;
                for &[a, b, c] in triangles.iter() {
                    let (pa, pb, pc) = (
                        self.positions[a as usize],
                        self.positions[b as usize],
                        self.positions[c as usize],
                    );
                    let area = ((pb - pa).cross(pc - pa).length() * 0.5) as f64;
                    total_area += area;
                    weighted += ((pa + pb + pc) / 3.0).as_dvec3() * area;
                }
                if total_area > 0.0 {
                    (weighted / total_area).as_vec3()
                } else {
                    log::warn!("No triangle area to weight the sphere center, using the centroid");
                    self.centroid()
                }
            }
        };

        if referenced_only {
            let points = triangles
                .iter()
                .flat_map(|tri| tri.iter().map(|&v| self.positions[v as usize]));
            BoundingSphere::enclosing(center, points)
        } else {
            BoundingSphere::enclosing(center, self.positions.iter().copied())
        }
    }

    /// Average edge length over all triangles, `None` without triangles
    pub fn mean_edge_length(&self) -> Option<f32> {
        let triangles = self.usable_triangles("mean_edge_length");
        if triangles.is_empty() {
            return None;
        }
        let sum: f64 = triangles
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                );
                (pa.distance(pb) + pb.distance(pc) + pc.distance(pa)) as f64
            })
            .sum();
        Some((sum / (3 * triangles.len()) as f64) as f32)
    }
}

/// Two corners share a vertex id
#[inline]
pub(crate) fn is_degenerate([a, b, c]: [u32; 3]) -> bool {
    a == b || b == c || a == c
}

/// One warning per operation for the triangles it had to skip
pub(crate) fn report_dropped(op: &str, count: usize) {
    if count > 0 {
        log::warn!("{op}: dropped {count} malformed triangle(s)");
    }
}
