use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3};

use crate::math::{hex_to_rgb, AABB};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Immutable vertex data shared between nodes through `Rc`
///
/// `normals`, `uvs` and `colors` are either empty or one entry per position.
/// An empty `indices` list means the positions are drawn in order.
#[derive(Debug, Clone)]
pub struct Geometry {
    id: u64,
    pub topology: Topology,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(topology: Topology, positions: Vec<Vec3>) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            topology,
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec3>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn bounds(&self) -> AABB {
        self.positions.iter().fold(AABB::empty(), |mut bounds, p| {
            bounds.expand_point(*p);
            bounds
        })
    }

    /// Axis-aligned box centred on the origin, one colour per face in +x, -x, +y, -y, +z, -z order
    pub fn cuboid(width: f32, height: f32, depth: f32, face_colors: Option<[Vec3; 6]>) -> Self {
        let half = Vec3::new(width, height, depth) * 0.5;
        // (normal, u, v) with u x v == normal
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut colors = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, u, v)) in faces.iter().enumerate() {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((*normal + *u * su + *v * sv) * half);
                normals.push(*normal);
                uvs.push(Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5));
                if let Some(face_colors) = &face_colors {
                    colors.push(face_colors[face]);
                }
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(Topology::Triangles, positions)
            .with_normals(normals)
            .with_uvs(uvs)
            .with_colors(colors)
            .with_indices(indices)
    }

    /// Horizontal plane on y = 0 facing +y
    pub fn ground_plane(width: f32, depth: f32) -> Self {
        let (hw, hd) = (width * 0.5, depth * 0.5);
        let positions = vec![
            Vec3::new(-hw, 0.0, -hd),
            Vec3::new(hw, 0.0, -hd),
            Vec3::new(hw, 0.0, hd),
            Vec3::new(-hw, 0.0, hd),
        ];
        let uvs = vec![
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];
        Self::new(Topology::Triangles, positions)
            .with_normals(vec![Vec3::Y; 4])
            .with_uvs(uvs)
            .with_indices(vec![0, 2, 1, 0, 3, 2])
    }

    /// Square line grid on y = 0 with the centre lines highlighted
    pub fn grid(size: f32, divisions: u32) -> Self {
        let center_color = hex_to_rgb(0x444444);
        let line_color = hex_to_rgb(0x888888);
        let half = size * 0.5;
        let step = size / divisions as f32;
        let center = divisions / 2;

        let mut positions = Vec::new();
        let mut colors = Vec::new();
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i == center { center_color } else { line_color };
            positions.extend_from_slice(&[
                Vec3::new(-half, 0.0, k),
                Vec3::new(half, 0.0, k),
                Vec3::new(k, 0.0, -half),
                Vec3::new(k, 0.0, half),
            ]);
            colors.extend_from_slice(&[color; 4]);
        }
        Self::new(Topology::Lines, positions).with_colors(colors)
    }

    /// Red, green and blue lines along +x, +y and +z
    pub fn axes(size: f32) -> Self {
        let positions = vec![
            Vec3::ZERO,
            Vec3::X * size,
            Vec3::ZERO,
            Vec3::Y * size,
            Vec3::ZERO,
            Vec3::Z * size,
        ];
        let colors = vec![
            Vec3::X,
            Vec3::new(1.0, 0.6, 0.0),
            Vec3::Y,
            Vec3::new(0.6, 1.0, 0.0),
            Vec3::Z,
            Vec3::new(0.0, 0.6, 1.0),
        ];
        Self::new(Topology::Lines, positions).with_colors(colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(g: &Geometry, t: usize) -> Vec3 {
        let i = &g.indices[t * 3..t * 3 + 3];
        let (a, b, c) = (
            g.positions[i[0] as usize],
            g.positions[i[1] as usize],
            g.positions[i[2] as usize],
        );
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn cuboid_has_outward_facing_triangles() {
        let cube = Geometry::cuboid(1.0, 1.0, 1.0, None);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
        for t in 0..12 {
            let face_normal = cube.normals[cube.indices[t * 3] as usize];
            assert!((triangle_normal(&cube, t) - face_normal).length() < 1e-5);
        }
    }

    #[test]
    fn cuboid_bounds_match_extent() {
        let cube = Geometry::cuboid(2.0, 4.0, 6.0, None);
        let bounds = cube.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn cuboid_face_colors_follow_faces() {
        let colors = [Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE, Vec3::ZERO, Vec3::splat(0.5)];
        let cube = Geometry::cuboid(1.0, 1.0, 1.0, Some(colors));
        assert_eq!(cube.colors.len(), 24);
        assert_eq!(cube.colors[0], Vec3::X);
        assert_eq!(cube.colors[23], Vec3::splat(0.5));
    }

    #[test]
    fn ground_plane_faces_up() {
        let plane = Geometry::ground_plane(20.0, 20.0);
        assert!((triangle_normal(&plane, 0) - Vec3::Y).length() < 1e-5);
        assert!((triangle_normal(&plane, 1) - Vec3::Y).length() < 1e-5);
        assert_eq!(plane.bounds().size(), Vec3::new(20.0, 0.0, 20.0));
    }

    #[test]
    fn grid_line_count() {
        let grid = Geometry::grid(10.0, 10);
        assert_eq!(grid.topology, Topology::Lines);
        assert_eq!(grid.vertex_count(), 44);
        assert_eq!(grid.colors.len(), 44);
    }
}
