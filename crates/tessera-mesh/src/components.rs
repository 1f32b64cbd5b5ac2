//! Connected components
//!
//! Flood fill over the vertex/triangle incidence graph with an explicit
//! stack, so deep meshes cannot overflow the call stack.

use crate::adjacency::VertexTriangles;
use crate::mesh::Mesh;

impl Mesh {
    /// Vertex sets connected through shared triangles.
    ///
    /// Seeds are taken in vertex id order, so components come out ordered by
    /// their smallest vertex id. Members of each component are sorted.
    /// Vertices used by no triangle form singleton components.
    pub fn components(&self) -> Vec<Vec<u32>> {
        let triangles = self.usable_triangles("components");
        let vertex_count = self.vertex_count();
        let incidence = VertexTriangles::build(vertex_count, &triangles);

        let mut visited = vec![false; vertex_count];
        let mut stack = Vec::new();
        let mut components = Vec::new();

        for seed in 0..vertex_count {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            stack.push(seed as u32);

            let mut members = Vec::new();
            while let Some(v) = stack.pop() {
                members.push(v);
                for &t in incidence.of(v as usize) {
                    for &u in &triangles[t as usize] {
                        if !visited[u as usize] {
                            visited[u as usize] = true;
                            stack.push(u);
                        }
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        log::debug!("Found {} connected component(s)", components.len());
        components
    }

    /// Component id per vertex, numbered as in [`Mesh::components`]
    pub fn component_labels(&self) -> Vec<u32> {
        let mut labels = vec![0; self.vertex_count()];
        for (id, members) in self.components().iter().enumerate() {
            for &v in members {
                labels[v as usize] = id as u32;
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{cube, quad_grid, triangle};
    use tessera_core::math::Vec3;

    #[test]
    fn test_single_island() {
        let components = cube().components();
        assert_eq!(components, vec![(0..8).collect::<Vec<u32>>()]);
    }

    #[test]
    fn test_two_islands_partition_vertices() {
        let mesh = Mesh::from_buffers(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(5.0, 0.0, 0.0),
                Vec3::new(6.0, 0.0, 0.0),
                Vec3::new(5.0, 1.0, 0.0),
            ],
            vec![[3, 4, 5], [0, 1, 2]],
        );
        let components = mesh.components();
        assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4, 5]]);

        let mut all: Vec<u32> = components.concat();
        all.sort_unstable();
        assert_eq!(all, (0..6).collect::<Vec<u32>>());
        assert_eq!(mesh.component_labels(), vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_isolated_vertices_are_singletons() {
        let mut mesh = triangle();
        let mut positions = mesh.positions().to_vec();
        positions.insert(0, Vec3::splat(9.0));
        positions.push(Vec3::splat(-9.0));
        let _ = mesh.set_positions(positions);
        let _ = mesh.set_triangles(vec![[1, 2, 3]]);

        assert_eq!(mesh.components(), vec![vec![0], vec![1, 2, 3], vec![4]]);
    }

    #[test]
    fn test_malformed_triangles_do_not_connect() {
        let mut mesh = quad_grid(1, 1, 1.0, 1.0);
        // The second triangle points past the vertex buffer.
        let _ = mesh.set_triangles(vec![[0, 1, 3], [2, 3, 7]]);
        assert_eq!(mesh.components(), vec![vec![0, 1, 3], vec![2]]);
    }

    #[test]
    fn test_large_strip_does_not_recurse() {
        let mesh = quad_grid(2000, 1, 2000.0, 1.0);
        assert_eq!(mesh.components().len(), 1);
    }
}
