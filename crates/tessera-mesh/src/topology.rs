//! Whole-mesh topology edits
//!
//! Operations that build a new index space: double-sided copies, submesh
//! extraction, merging and triangle erasure. Results own fresh arrays; every
//! present attribute is carried through the same old → new vertex remap.

use tessera_core::Dirty;

use crate::mesh::{Mesh, report_dropped};

/// Submesh plus the vertices of the triangles that did not survive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub mesh: Mesh,
    /// Old ids of every vertex of every dropped triangle, ascending
    pub complementary_vertices: Vec<u32>,
}

/// Meaning of the id list given to [`Mesh::extract_vertices`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSelection {
    /// Keep only the listed vertices
    Keep,
    /// Keep everything but the listed vertices
    Remove,
}

impl Mesh {
    /// Usable triangles with their material ids (empty without materials)
    fn usable_with_materials(&self, op: &str) -> (Vec<[u32; 3]>, Vec<u32>) {
        let with_materials = self.has_material_ids();
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let mut material_ids = Vec::new();
        for (t, &tri) in self.triangles.iter().enumerate() {
            if self.is_usable(tri) {
                triangles.push(tri);
                if with_materials {
                    material_ids.push(self.material_ids[t]);
                }
            }
        }
        report_dropped(op, self.triangle_count() - triangles.len());
        (triangles, material_ids)
    }

    /// New mesh made of the vertices `order` (new id `i` is old id
    /// `order[i]`) and already remapped triangles
    fn gather(&self, order: &[u32], triangles: Vec<[u32; 3]>, material_ids: Vec<u32>) -> Mesh {
        fn pick<T: Copy>(source: &[T], present: bool, order: &[u32]) -> Vec<T> {
            if present {
                order.iter().map(|&v| source[v as usize]).collect()
            } else {
                Vec::new()
            }
        }

        Mesh {
            positions: pick(&self.positions, true, order),
            normals: pick(&self.normals, self.has_normals(), order),
            colors: pick(&self.colors, self.has_colors(), order),
            uvs: pick(&self.uvs, self.has_uvs(), order),
            mesh_ids: pick(&self.mesh_ids, self.has_mesh_ids(), order),
            triangles,
            material_ids,
            material_names: self.material_names.clone(),
            max_mesh_id: self.max_mesh_id,
        }
    }

    /// Mesh of the listed triangles with vertices renumbered in first-touch
    /// order
    fn compact(&self, triangles: &[[u32; 3]], material_ids: Vec<u32>) -> (Mesh, Vec<u32>) {
        let mut remap: Vec<Option<u32>> = vec![None; self.vertex_count()];
        let mut order = Vec::new();
        let remapped = triangles
            .iter()
            .map(|tri| {
                tri.map(|v| {
                    *remap[v as usize].get_or_insert_with(|| {
                        order.push(v);
                        (order.len() - 1) as u32
                    })
                })
            })
            .collect();
        (self.gather(&order, remapped, material_ids), order)
    }

    /// Copy with both faces of every triangle.
    ///
    /// The vertex buffer is duplicated with negated normals on the copy. The
    /// original triangles come first, then every `(b, a, c)` shifted onto the
    /// copy. Material ids and submesh ids are duplicated alongside.
    pub fn double_sided(&self) -> Mesh {
        let (triangles, material_ids) = self.usable_with_materials("double_sided");
        let n = self.vertex_count() as u32;

        let normals = if self.has_normals() {
            self.normals.iter().copied().chain(self.normals.iter().map(|&n| -n)).collect()
        } else {
            Vec::new()
        };
        let mut all_triangles = triangles.clone();
        all_triangles.extend(triangles.iter().map(|&[a, b, c]| [b + n, a + n, c + n]));

        Mesh {
            positions: doubled(&self.positions, true),
            normals,
            colors: doubled(&self.colors, self.has_colors()),
            uvs: doubled(&self.uvs, self.has_uvs()),
            mesh_ids: doubled(&self.mesh_ids, self.has_mesh_ids()),
            triangles: all_triangles,
            material_ids: doubled(&material_ids, true),
            material_names: self.material_names.clone(),
            max_mesh_id: self.max_mesh_id,
        }
    }

    /// Copy with every triangle's winding flipped; normals are kept as is
    pub fn inverted_faces(&self) -> Mesh {
        let mut inverted = self.clone();
        for tri in &mut inverted.triangles {
            tri.swap(0, 1);
        }
        inverted
    }

    /// Keep the vertices accepted by `keep`, in their original order, and the
    /// triangles whose three corners are all kept.
    pub fn extract_submesh(&self, keep: impl Fn(u32) -> bool) -> SubMesh {
        let n = self.vertex_count();
        let mut remap: Vec<Option<u32>> = vec![None; n];
        let mut order = Vec::new();
        for v in 0..n as u32 {
            if keep(v) {
                remap[v as usize] = Some(order.len() as u32);
                order.push(v);
            }
        }

        let (triangles, material_ids) = self.usable_with_materials("extract_submesh");
        let with_materials = !material_ids.is_empty();
        let mut kept_triangles = Vec::with_capacity(triangles.len());
        let mut kept_materials = Vec::new();
        let mut in_dropped = vec![false; n];

        for (t, tri) in triangles.iter().enumerate() {
            match tri.map(|v| remap[v as usize]) {
                [Some(a), Some(b), Some(c)] => {
                    kept_triangles.push([a, b, c]);
                    if with_materials {
                        kept_materials.push(material_ids[t]);
                    }
                }
                _ => {
                    for &v in tri {
                        in_dropped[v as usize] = true;
                    }
                }
            }
        }

        let complementary_vertices = (0..n as u32).filter(|&v| in_dropped[v as usize]).collect();
        SubMesh {
            mesh: self.gather(&order, kept_triangles, kept_materials),
            complementary_vertices,
        }
    }

    /// [`Mesh::extract_submesh`] driven by an explicit id list. Ids past the
    /// end of the vertex buffer are ignored.
    pub fn extract_vertices(&self, ids: &[u32], selection: VertexSelection) -> SubMesh {
        let mut listed = vec![false; self.vertex_count()];
        for &id in ids {
            if let Some(flag) = listed.get_mut(id as usize) {
                *flag = true;
            }
        }
        let keep_listed = selection == VertexSelection::Keep;
        self.extract_submesh(|v| listed[v as usize] == keep_listed)
    }

    /// Append `other`.
    ///
    /// Merging into an empty mesh copies `other`. Otherwise its usable
    /// triangles are shifted past this mesh's vertices and malformed ones are
    /// dropped. An attribute survives only when both meshes carry it,
    /// materials are matched by name and submesh ids are kept apart.
    pub fn merge(&mut self, other: &Mesh) -> Dirty {
        if self.is_empty() {
            *self = other.clone();
            let _ = self.sanitize();
            return Dirty::CHANGED;
        }
        if other.is_empty() && other.triangles.is_empty() {
            return Dirty::CLEAN;
        }
        let (other_triangles, other_material_ids) = other.usable_with_materials("merge");

        let offset = self.vertex_count() as u32;
        let own_materials = self.has_material_ids();
        let other_materials = other.has_material_ids();

        if self.has_normals() && other.has_normals() {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }
        if self.has_colors() && other.has_colors() {
            self.colors.extend_from_slice(&other.colors);
        } else {
            self.colors.clear();
        }
        if self.has_uvs() && other.has_uvs() {
            self.uvs.extend_from_slice(&other.uvs);
        } else {
            self.uvs.clear();
        }
        self.merge_mesh_ids(other);

        if own_materials || other_materials {
            if !own_materials {
                let default = material_slot(&mut self.material_names, "default");
                self.material_ids = vec![default; self.triangle_count()];
            }
            if other_materials {
                let remap: Vec<u32> = (0..other.material_names.len())
                    .map(|id| material_slot(&mut self.material_names, &other.material_names[id]))
                    .collect();
                for &id in &other_material_ids {
                    let new_id = match remap.get(id as usize) {
                        Some(&new_id) => new_id,
                        None => material_slot(&mut self.material_names, "default"),
                    };
                    self.material_ids.push(new_id);
                }
            } else {
                let default = material_slot(&mut self.material_names, "default");
                self.material_ids
                    .extend(std::iter::repeat_n(default, other_triangles.len()));
            }
        }

        self.positions.extend_from_slice(&other.positions);
        self.triangles
            .extend(other_triangles.iter().map(|tri| tri.map(|v| v + offset)));
        self.debug_assert_attributes();
        Dirty::CHANGED
    }

    /// Submesh id bookkeeping for [`Mesh::merge`]; runs before the positions
    /// are appended.
    fn merge_mesh_ids(&mut self, other: &Mesh) {
        match (self.has_mesh_ids(), other.has_mesh_ids()) {
            (true, true) => {
                let shift = self.max_mesh_id() + 1;
                self.mesh_ids.extend(other.mesh_ids.iter().map(|&id| id + shift));
                self.max_mesh_id = shift + other.max_mesh_id();
            }
            (true, false) => {
                self.max_mesh_id = self.max_mesh_id() + 1;
                let id = self.max_mesh_id;
                self.mesh_ids.extend(std::iter::repeat_n(id, other.vertex_count()));
            }
            (false, true) => {
                let id = other.max_mesh_id() + 1;
                self.mesh_ids = vec![id; self.vertex_count()];
                self.mesh_ids.extend_from_slice(&other.mesh_ids);
                self.max_mesh_id = id;
            }
            (false, false) => self.mesh_ids.clear(),
        }
    }

    /// Remove the listed triangles and every vertex no longer used.
    /// Surviving vertices are renumbered in first-touch order; ids past the
    /// end of the triangle list are ignored.
    pub fn erase_triangles(&mut self, ids: &[u32]) -> Dirty {
        let mut erase = vec![false; self.triangle_count()];
        for &id in ids {
            if let Some(flag) = erase.get_mut(id as usize) {
                *flag = true;
            }
        }

        let with_materials = self.has_material_ids();
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let mut material_ids = Vec::new();
        let mut dropped = 0;
        for (t, &tri) in self.triangles.iter().enumerate() {
            if erase[t] {
                continue;
            }
            if !self.is_usable(tri) {
                dropped += 1;
                continue;
            }
            triangles.push(tri);
            if with_materials {
                material_ids.push(self.material_ids[t]);
            }
        }
        report_dropped("erase_triangles", dropped);

        let (compacted, order) = self.compact(&triangles, material_ids);
        let identity = order.len() == self.vertex_count()
            && order.iter().enumerate().all(|(i, &v)| i as u32 == v);
        let changed = triangles.len() != self.triangle_count() || !identity;

        if changed {
            *self = compacted;
        }
        Dirty::from_changed(changed)
    }

    /// Triangles using `material_id`, with their vertices renumbered in
    /// first-touch order. Empty when the mesh carries no material ids.
    pub fn sub_material_mesh(&self, material_id: u32) -> Mesh {
        if !self.has_material_ids() {
            log::debug!("No material ids, material {material_id} is empty");
            return Mesh::new();
        }
        let (triangles, material_ids) = self.usable_with_materials("sub_material_mesh");
        let selected: Vec<[u32; 3]> = triangles
            .iter()
            .zip(&material_ids)
            .filter(|&(_, &id)| id == material_id)
            .map(|(&tri, _)| tri)
            .collect();
        let count = selected.len();
        self.compact(&selected, vec![material_id; count]).0
    }

    /// One submesh per material used by at least one triangle, with its name
    pub fn sub_material_meshes(&self) -> Vec<(String, Mesh)> {
        let Some(&max_id) = self.material_ids.iter().max().filter(|_| self.has_material_ids()) else {
            return Vec::new();
        };
        (0..=max_id)
            .filter_map(|id| {
                let mesh = self.sub_material_mesh(id);
                if mesh.triangles.is_empty() {
                    return None;
                }
                let name = self
                    .material_names
                    .get(id as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("material_{id}"));
                Some((name, mesh))
            })
            .collect()
    }

    /// The connected component with the most vertices (the first one on
    /// ties)
    pub fn largest_component(&self) -> Mesh {
        let components = self.components();
        let Some(largest) = components
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(id, _)| id)
        else {
            return self.clone();
        };

        let mut keep = vec![false; self.vertex_count()];
        for &v in &components[largest] {
            keep[v as usize] = true;
        }
        self.extract_submesh(|v| keep[v as usize]).mesh
    }

    /// Drop every connected component with fewer than `min_vertices`
    /// vertices
    pub fn remove_small_components(&self, min_vertices: usize) -> Mesh {
        let mut keep = vec![false; self.vertex_count()];
        let mut removed = 0;
        for component in self.components() {
            if component.len() >= min_vertices {
                for v in component {
                    keep[v as usize] = true;
                }
            } else {
                removed += 1;
            }
        }
        log::debug!("Removing {removed} component(s) under {min_vertices} vertices");
        self.extract_submesh(|v| keep[v as usize]).mesh
    }
}

/// `values` twice in a row, or nothing when absent
fn doubled<T: Copy>(values: &[T], present: bool) -> Vec<T> {
    if present {
        values.iter().chain(values).copied().collect()
    } else {
        Vec::new()
    }
}

/// Index of `name` in the material table, appending it when missing
fn material_slot(names: &mut Vec<String>, name: &str) -> u32 {
    match names.iter().position(|n| n == name) {
        Some(id) => id as u32,
        None => {
            names.push(name.to_string());
            (names.len() - 1) as u32
        }
    }
}
