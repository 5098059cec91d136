//! Primitives: vertex data plus optional indices

use glam::{Vec2, Vec3};

use crate::backend::types::{PrimitiveTopology, Vertex};
use crate::resources::buffer::BufferObject;

/// Geometry data drawn by a single draw call
#[derive(Debug, Clone)]
pub struct Primitive {
    pub name: String,
    pub topology: PrimitiveTopology,
    vertex_buffer: BufferObject,
    index_buffer: Option<BufferObject>,
}

impl Primitive {
    pub fn new(
        name: &str,
        topology: PrimitiveTopology,
        vertices: &[Vertex],
        indices: Option<&[u32]>,
    ) -> Self {
        Self {
            name: name.to_string(),
            topology,
            vertex_buffer: BufferObject::vertices(vertices),
            index_buffer: indices.map(BufferObject::indices),
        }
    }

    pub fn vertex_buffer(&self) -> &BufferObject {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<&BufferObject> {
        self.index_buffer.as_ref()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_buffer.count()
    }

    pub fn index_count(&self) -> u32 {
        self.index_buffer.as_ref().map_or(0, BufferObject::count)
    }

    /// Calculate triangle count
    pub fn triangle_count(&self) -> u32 {
        match self.topology {
            PrimitiveTopology::TriangleList => match &self.index_buffer {
                Some(indices) => indices.count() / 3,
                None => self.vertex_count() / 3,
            },
            PrimitiveTopology::TriangleStrip => self.vertex_count().saturating_sub(2),
            _ => 0,
        }
    }

    /// Full screen quad in clip space, drawn as a 4 vertex strip
    pub fn screen_quad() -> Self {
        let vertices = [
            Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::Z, Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec3::Z, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::Z, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z, Vec2::new(1.0, 0.0)),
        ];
        Self::new("screen_quad", PrimitiveTopology::TriangleStrip, &vertices, None)
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let faces = [
            // Front face
            (Vec3::new(-0.5, -0.5, 0.5), Vec3::new(0.5, -0.5, 0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::new(-0.5, 0.5, 0.5), Vec3::Z),
            // Back face
            (Vec3::new(0.5, -0.5, -0.5), Vec3::new(-0.5, -0.5, -0.5), Vec3::new(-0.5, 0.5, -0.5), Vec3::new(0.5, 0.5, -0.5), -Vec3::Z),
            // Right face
            (Vec3::new(0.5, -0.5, 0.5), Vec3::new(0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, -0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::X),
            // Left face
            (Vec3::new(-0.5, -0.5, -0.5), Vec3::new(-0.5, -0.5, 0.5), Vec3::new(-0.5, 0.5, 0.5), Vec3::new(-0.5, 0.5, -0.5), -Vec3::X),
            // Top face
            (Vec3::new(-0.5, 0.5, 0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.5, 0.5, -0.5), Vec3::new(-0.5, 0.5, -0.5), Vec3::Y),
            // Bottom face
            (Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, -0.5, -0.5), Vec3::new(0.5, -0.5, 0.5), Vec3::new(-0.5, -0.5, 0.5), -Vec3::Y),
        ];
        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (a, b, c, d, normal)) in faces.into_iter().enumerate() {
            for (position, uv) in [a, b, c, d].into_iter().zip(uvs) {
                vertices.push(Vertex::new(position, normal, uv));
            }

            // Two triangles per face
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new("cube", PrimitiveTopology::TriangleList, &vertices, Some(&indices))
    }

    /// Create a UV sphere
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segment_angle = 2.0 * std::f32::consts::PI / segments as f32;
        let ring_angle = std::f32::consts::PI / rings as f32;

        let mut vertices = Vec::new();
        for ring in 0..=rings {
            let phi = ring as f32 * ring_angle;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                let theta = segment as f32 * segment_angle;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                vertices.push(Vertex::new(
                    Vec3::new(x * 0.5, y * 0.5, z * 0.5),
                    Vec3::new(x, y, z).normalize_or_zero(),
                    Vec2::new(segment as f32 / segments as f32, ring as f32 / rings as f32),
                ));
            }
        }

        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;

                indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        Self::new("sphere", PrimitiveTopology::TriangleList, &vertices, Some(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let cube = Primitive::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_screen_quad_is_non_indexed_strip() {
        let quad = Primitive::screen_quad();
        assert!(quad.index_buffer().is_none());
        assert_eq!(quad.topology, PrimitiveTopology::TriangleStrip);
        assert_eq!(quad.triangle_count(), 2);
    }

    #[test]
    fn test_sphere_indices_in_range() {
        let sphere = Primitive::sphere(8, 4);
        assert_eq!(sphere.vertex_count(), 9 * 5);
        assert_eq!(sphere.index_count(), 8 * 4 * 6);
    }
}
