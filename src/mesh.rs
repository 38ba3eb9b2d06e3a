use glam::Vec3;

use crate::error::ValidationError;
use crate::vertex::Vertex;

/// Indexed triangle list in the [`Vertex`] layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Unit cube centred on the origin with per-face normals.
    pub fn cube(color: Vec3) -> Self {
        let vertices = CUBE_FACES
            .iter()
            .flat_map(|&(normal, corners)| {
                corners.map(|corner| Vertex::new(Vec3::from(corner), color, Vec3::from(normal)))
            })
            .collect();
        Self {
            vertices,
            indices: CUBE_INDICES.to_vec(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Divides every position by the spread between the smallest and the
    /// largest coordinate found on any axis.
    ///
    /// A mesh whose coordinates are all equal is left unchanged.
    pub fn normalize_extent(&mut self) {
        let (min, max) = self
            .vertices
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), vertex| {
                let position = vertex.position();
                (
                    min.min(position.min_element()),
                    max.max(position.max_element()),
                )
            });
        let extent = max - min;
        if !(extent > f32::EPSILON) || !extent.is_finite() {
            return;
        }
        for vertex in &mut self.vertices {
            vertex.position = (vertex.position() / extent).into();
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, vertex) in self.vertices.iter().enumerate() {
            vertex
                .validate()
                .map_err(|err| ValidationError::InvalidVertex {
                    vertex: index,
                    source: Box::new(err),
                })?;
        }
        if self.indices.len() % 3 != 0 {
            return Err(ValidationError::IncompleteTriangle(self.indices.len()));
        }
        if self.indices.is_empty() {
            return Err(ValidationError::NoTriangles);
        }
        let vertex_count = self.vertices.len();
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, index)| **index as usize >= vertex_count)
        {
            return Err(ValidationError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }
        Ok(())
    }
}

type Face = ([f32; 3], [[f32; 3]; 4]);

const CUBE_FACES: [Face; 6] = [
    // front
    (
        [0.0, 0.0, 1.0],
        [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
    ),
    // back
    (
        [0.0, 0.0, -1.0],
        [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]],
    ),
    // left
    (
        [-1.0, 0.0, 0.0],
        [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]],
    ),
    // right
    (
        [1.0, 0.0, 0.0],
        [[0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]],
    ),
    // bottom
    (
        [0.0, -1.0, 0.0],
        [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]],
    ),
    // top
    (
        [0.0, 1.0, 0.0],
        [[-0.5, 0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
    ),
];

const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 0, 2, 3, // front
    4, 6, 5, 4, 7, 6, // back
    8, 9, 10, 8, 10, 11, // left
    12, 14, 13, 12, 15, 14, // right
    16, 17, 18, 16, 18, 19, // bottom
    20, 22, 21, 20, 23, 22, // top
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_valid_and_colored() {
        let cube = Mesh::cube(Vec3::new(0.2, 0.4, 0.6));
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.validate().is_ok());
        assert!(cube
            .vertices
            .iter()
            .all(|v| v.color() == Vec3::new(0.2, 0.4, 0.6)));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = Mesh::cube(Vec3::ONE);
        for triangle in cube.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| cube.vertices[triangle[i] as usize]);
            let geometric = (b.position() - a.position()).cross(c.position() - a.position());
            assert!(geometric.dot(a.normal()) > 0.0, "triangle {triangle:?}");
        }
    }

    #[test]
    fn normalize_extent_divides_by_coordinate_spread() {
        let mut mesh = Mesh {
            vertices: vec![
                Vertex::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::ONE, Vec3::Z),
                Vertex::new(Vec3::new(3.0, 1.0, 0.0), Vec3::ONE, Vec3::Z),
            ],
            indices: vec![],
        };
        mesh.normalize_extent();
        // spread = 3 - (-1) = 4
        assert_eq!(mesh.vertices[0].position(), Vec3::new(-0.25, 0.0, 0.5));
        assert_eq!(mesh.vertices[1].position(), Vec3::new(0.75, 0.25, 0.0));
    }

    #[test]
    fn normalize_extent_ignores_flat_meshes() {
        let mut mesh = Mesh {
            vertices: vec![Vertex::new(Vec3::splat(2.0), Vec3::ONE, Vec3::Z)],
            indices: vec![],
        };
        mesh.normalize_extent();
        assert_eq!(mesh.vertices[0].position(), Vec3::splat(2.0));

        let mut empty = Mesh::default();
        empty.normalize_extent();
        assert!(empty.vertices.is_empty());
    }

    #[test]
    fn validate_reports_bad_indices_and_vertices() {
        let mut mesh = Mesh::cube(Vec3::ONE);
        mesh.indices.push(0);
        assert_eq!(
            mesh.validate(),
            Err(ValidationError::IncompleteTriangle(37))
        );

        let mut mesh = Mesh::cube(Vec3::ONE);
        mesh.indices[5] = 99;
        assert_eq!(
            mesh.validate(),
            Err(ValidationError::IndexOutOfRange {
                position: 5,
                index: 99,
                vertex_count: 24,
            })
        );

        let mut mesh = Mesh::cube(Vec3::ONE);
        mesh.indices.clear();
        assert_eq!(mesh.validate(), Err(ValidationError::NoTriangles));

        let mut mesh = Mesh::cube(Vec3::ONE);
        mesh.vertices[3].normal = [0.0; 3];
        assert!(matches!(
            mesh.validate(),
            Err(ValidationError::InvalidVertex { vertex: 3, .. })
        ));
    }
}
