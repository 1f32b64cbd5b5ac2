//! Mesh adjacency
//!
//! Derived structures rebuilt from the triangle list on demand:
//! - [`EdgeMap`] - directed edge → opposite vertex, used for GPU adjacency
//!   index buffers (6 indices per triangle, for silhouette shaders)
//! - [`VertexTriangles`] - vertex → incident triangles
//! - [`VertexNeighbors`] - vertex → distinct 1-ring vertices
//!
//! The vertex-keyed tables use a compressed layout (one offsets array plus
//! one flat payload) so per-vertex loops can run in parallel over slices.

use std::ops::Range;

use ahash::AHashMap;
use smallvec::SmallVec;
use tessera_core::AdjacencyPolicy;

use crate::mesh::Mesh;
use crate::{GeometryError, GeometryResult};

/// Directed edge → vertex opposite to it in the triangle that owns it
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    opposite: AHashMap<(u32, u32), u32>,
    /// Directed edges seen more than once; the first owner wins
    duplicates: Vec<(u32, u32)>,
}

impl EdgeMap {
    /// Build from the usable triangles of `mesh`
    pub fn build(mesh: &Mesh) -> Self {
        Self::from_triangles(&mesh.usable_triangles("edge_map"))
    }

    /// Build from a triangle list whose indices are already validated
    pub fn from_triangles(triangles: &[[u32; 3]]) -> Self {
        let mut opposite = AHashMap::with_capacity(triangles.len() * 3);
        let mut duplicates = Vec::new();

        for &[a, b, c] in triangles {
            for (edge, far) in [((a, b), c), ((b, c), a), ((c, a), b)] {
                if opposite.contains_key(&edge) {
                    duplicates.push(edge);
                } else {
                    opposite.insert(edge, far);
                }
            }
        }

        if !duplicates.is_empty() {
            log::debug!("Edge map: {} duplicated directed edge(s)", duplicates.len());
        }

        Self { opposite, duplicates }
    }

    /// Vertex opposite to the directed edge `(a, b)`, if a triangle owns it
    #[inline]
    pub fn opposite(&self, a: u32, b: u32) -> Option<u32> {
        self.opposite.get(&(a, b)).copied()
    }

    /// Number of distinct directed edges
    pub fn len(&self) -> usize {
        self.opposite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opposite.is_empty()
    }

    /// Directed edges claimed by more than one triangle
    pub fn duplicate_edges(&self) -> &[(u32, u32)] {
        &self.duplicates
    }

    /// Directed edges whose reverse is missing, sorted
    pub fn boundary_edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = self
            .opposite
            .keys()
            .filter(|&&(a, b)| !self.opposite.contains_key(&(b, a)))
            .copied()
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Every directed edge has its reverse
    pub fn is_closed(&self) -> bool {
        self.opposite
            .keys()
            .all(|&(a, b)| self.opposite.contains_key(&(b, a)))
    }

    /// Closed, and no directed edge is shared by two triangles
    pub fn is_manifold(&self) -> bool {
        self.duplicates.is_empty() && self.is_closed()
    }

    /// Six indices per triangle: `[a, n(b,a), b, n(c,b), c, n(a,c)]`, where
    /// `n(x,y)` is the vertex opposite to the reversed edge in the
    /// neighbouring triangle.
    ///
    /// [`AdjacencyPolicy::Strict`] fails on the first boundary or duplicated
    /// edge. [`AdjacencyPolicy::Sentinel`] substitutes the triangle's own
    /// opposite vertex for a missing neighbour.
    pub fn adjacency_indices(
        &self,
        triangles: &[[u32; 3]],
        policy: AdjacencyPolicy,
    ) -> GeometryResult<Vec<u32>> {
        if policy == AdjacencyPolicy::Strict {
            if let Some(&(a, b)) = self.duplicates.first() {
                return Err(GeometryError::NonManifoldEdge(a, b));
            }
        }

        let neighbour = |a: u32, b: u32, own: u32| -> GeometryResult<u32> {
            match (self.opposite(b, a), policy) {
                (Some(v), _) => Ok(v),
                (None, AdjacencyPolicy::Sentinel) => Ok(own),
                (None, AdjacencyPolicy::Strict) => Err(GeometryError::BoundaryEdge(a, b)),
            }
        };

        let mut indices = Vec::with_capacity(triangles.len() * 6);
        for &[a, b, c] in triangles {
            indices.extend_from_slice(&[
                a,
                neighbour(a, b, c)?,
                b,
                neighbour(b, c, a)?,
                c,
                neighbour(c, a, b)?,
            ]);
        }
        Ok(indices)
    }
}

/// Flat `u32` index buffer for the uploader: three indices per triangle, or
/// six with adjacency when a policy is given. Malformed triangles are skipped.
pub fn index_buffer(mesh: &Mesh, adjacency: Option<AdjacencyPolicy>) -> GeometryResult<Vec<u32>> {
    let triangles = mesh.usable_triangles("index_buffer");
    match adjacency {
        None => Ok(triangles.iter().flatten().copied().collect()),
        Some(policy) => EdgeMap::from_triangles(&triangles).adjacency_indices(&triangles, policy),
    }
}

/// Vertex → incident triangle ids
#[derive(Debug, Clone, Default)]
pub struct VertexTriangles {
    offsets: Vec<usize>,
    triangles: Vec<u32>,
}

impl VertexTriangles {
    /// Build from validated triangles. A triangle index listed here is its
    /// position in `triangles`.
    pub fn build(vertex_count: usize, triangles: &[[u32; 3]]) -> Self {
        let mut counts = vec![0usize; vertex_count + 1];
        for tri in triangles {
            for &v in tri {
                counts[v as usize + 1] += 1;
            }
        }
        for i in 0..vertex_count {
            counts[i + 1] += counts[i];
        }
        let offsets = counts;

        let mut cursor = offsets.clone();
        let mut incident = vec![0u32; offsets[vertex_count]];
        for (t, tri) in triangles.iter().enumerate() {
            for &v in tri {
                incident[cursor[v as usize]] = t as u32;
                cursor[v as usize] += 1;
            }
        }

        Self {
            offsets,
            triangles: incident,
        }
    }

    /// Triangles touching vertex `v`, in triangle order
    #[inline]
    pub fn of(&self, v: usize) -> &[u32] {
        &self.triangles[self.offsets[v]..self.offsets[v + 1]]
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Vertex → distinct neighbouring vertices, ascending
#[derive(Debug, Clone, Default)]
pub struct VertexNeighbors {
    offsets: Vec<usize>,
    neighbors: Vec<u32>,
}

impl VertexNeighbors {
    /// Build from validated triangles
    pub fn build(vertex_count: usize, triangles: &[[u32; 3]]) -> Self {
        let mut rings: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); vertex_count];
        for &[a, b, c] in triangles {
            rings[a as usize].extend_from_slice(&[b, c]);
            rings[b as usize].extend_from_slice(&[a, c]);
            rings[c as usize].extend_from_slice(&[a, b]);
        }

        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut neighbors = Vec::new();
        offsets.push(0);
        for mut ring in rings {
            ring.sort_unstable();
            ring.dedup();
            neighbors.extend_from_slice(&ring);
            offsets.push(neighbors.len());
        }

        Self { offsets, neighbors }
    }

    /// 1-ring of vertex `v`
    #[inline]
    pub fn of(&self, v: usize) -> &[u32] {
        &self.neighbors[self.range(v)]
    }

    /// Position of `v`'s ring inside the flat neighbour array, for payloads
    /// stored alongside it
    #[inline]
    pub fn range(&self, v: usize) -> Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    /// Total number of (vertex, neighbour) pairs
    pub fn pair_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Flags vertices lying on an undirected edge used by exactly one triangle
pub fn boundary_vertices(vertex_count: usize, triangles: &[[u32; 3]]) -> Vec<bool> {
    let mut uses: AHashMap<(u32, u32), u32> = AHashMap::with_capacity(triangles.len() * 3);
    for &[a, b, c] in triangles {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *uses.entry((u.min(v), u.max(v))).or_insert(0) += 1;
        }
    }

    let mut boundary = vec![false; vertex_count];
    for (&(u, v), &count) in &uses {
        if count == 1 {
            boundary[u as usize] = true;
            boundary[v as usize] = true;
        }
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{cube, quad_grid};
    use tessera_core::math::Vec3;

    fn single_triangle() -> Mesh {
        Mesh::from_buffers(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]])
    }

    #[test]
    fn test_edge_map_entries() {
        let map = EdgeMap::build(&single_triangle());
        assert_eq!(map.len(), 3);
        assert_eq!(map.opposite(0, 1), Some(2));
        assert_eq!(map.opposite(1, 2), Some(0));
        assert_eq!(map.opposite(2, 0), Some(1));
        assert_eq!(map.opposite(1, 0), None);
        assert!(!map.is_closed());
        assert_eq!(map.boundary_edges(), vec![(0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn test_cube_is_closed() {
        let map = EdgeMap::build(&cube());
        assert_eq!(map.len(), 36);
        assert!(map.is_closed());
        assert!(map.is_manifold());
        assert!(map.boundary_edges().is_empty());
    }

    #[test]
    fn test_cube_adjacency_buffer() {
        let mesh = cube();
        let indices = index_buffer(&mesh, Some(AdjacencyPolicy::Strict)).unwrap();
        assert_eq!(indices.len(), mesh.triangle_count() * 6);

        let map = EdgeMap::build(&mesh);
        for (t, &[a, b, c]) in mesh.triangles().iter().enumerate() {
            let chunk = &indices[t * 6..t * 6 + 6];
            assert_eq!([chunk[0], chunk[2], chunk[4]], [a, b, c]);

            // Each neighbour vertex lies off the shared edge and its
            // triangle really uses the reversed edge.
            for (edge, n) in [((a, b), chunk[1]), ((b, c), chunk[3]), ((c, a), chunk[5])] {
                assert!((n as usize) < mesh.vertex_count());
                assert_ne!(n, edge.0);
                assert_ne!(n, edge.1);
                assert_eq!(map.opposite(edge.1, edge.0), Some(n));
            }
        }
    }

    #[test]
    fn test_strict_rejects_boundary() {
        let result = index_buffer(&single_triangle(), Some(AdjacencyPolicy::Strict));
        assert_eq!(result, Err(GeometryError::BoundaryEdge(0, 1)));
    }

    #[test]
    fn test_sentinel_reuses_own_vertex() {
        let indices = index_buffer(&single_triangle(), Some(AdjacencyPolicy::Sentinel)).unwrap();
        assert_eq!(indices, vec![0, 2, 1, 0, 2, 1]);
    }

    #[test]
    fn test_strict_rejects_duplicate_directed_edge() {
        // Two triangles wound the same way across edge (0, 1)
        let mesh = Mesh::from_buffers(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::NEG_Y],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        let map = EdgeMap::build(&mesh);
        assert_eq!(map.duplicate_edges(), &[(0, 1)]);
        assert!(!map.is_manifold());
        assert_eq!(
            index_buffer(&mesh, Some(AdjacencyPolicy::Strict)),
            Err(GeometryError::NonManifoldEdge(0, 1))
        );
    }

    #[test]
    fn test_plain_index_buffer_skips_malformed() {
        let mut mesh = single_triangle();
        let _ = mesh.set_triangles(vec![[0, 1, 2], [0, 0, 2], [0, 1, 9]]);
        assert_eq!(index_buffer(&mesh, None).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_vertex_triangles() {
        let mesh = quad_grid(1, 1, 1.0, 1.0);
        let incidence = VertexTriangles::build(mesh.vertex_count(), mesh.triangles());
        assert_eq!(incidence.vertex_count(), 4);
        let total: usize = (0..4).map(|v| incidence.of(v).len()).sum();
        assert_eq!(total, 6);
        for v in 0..4 {
            for &t in incidence.of(v) {
                assert!(mesh.triangle(t as usize).contains(&(v as u32)));
            }
        }
    }

    #[test]
    fn test_vertex_neighbors_are_distinct() {
        let mesh = cube();
        let rings = VertexNeighbors::build(mesh.vertex_count(), mesh.triangles());
        for v in 0..mesh.vertex_count() {
            let ring = rings.of(v);
            assert!(ring.windows(2).all(|w| w[0] < w[1]));
            assert!(!ring.contains(&(v as u32)));
        }
        // Each undirected edge is seen from both of its ends.
        let map = EdgeMap::build(&mesh);
        assert_eq!(rings.pair_count(), map.len());
    }

    #[test]
    fn test_boundary_vertices() {
        let grid = quad_grid(2, 2, 1.0, 1.0);
        let boundary = boundary_vertices(grid.vertex_count(), grid.triangles());
        // Only the center of a 3x3 vertex grid is interior.
        assert_eq!(boundary.iter().filter(|&&b| !b).count(), 1);
        assert!(!boundary[4]);

        let closed = cube();
        assert!(boundary_vertices(closed.vertex_count(), closed.triangles()).iter().all(|&b| !b));
    }
}
