//! Triangle mesh shape
//!
//! Meshes usually describe static level geometry. They take ownership of
//! the caller's buffers; the narrow phase tests them triangle by triangle.

use super::mass::{self, MassData};
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::bounds::AABB;
use crate::foundation::math::Vec3;
use crate::physics::collision::primitives::Triangle;

/// Indexed triangle soup
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    bounds: AABB,
}

impl TriangleMesh {
    /// Take ownership of a vertex buffer and a flat index buffer
    ///
    /// Every three indices form one triangle. Fails with `InvalidGeometry`
    /// for empty buffers, a partial triangle, out-of-range indices,
    /// non-finite vertices, or a mesh whose triangles all have zero area.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> PhysicsResult<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::geometry(format!(
                "mesh needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if indices.is_empty() || indices.len() % 3 != 0 {
            return Err(PhysicsError::geometry(format!(
                "mesh index count must be a non-zero multiple of 3, got {}",
                indices.len()
            )));
        }
        if vertices.iter().any(|v| v.iter().any(|c| !c.is_finite())) {
            return Err(PhysicsError::geometry("mesh vertices must be finite"));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(PhysicsError::geometry(format!(
                "mesh index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let mut triangles = Vec::new();
        triangles.try_reserve_exact(indices.len() / 3)?;
        triangles.extend(indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]));

        let mesh = Self {
            bounds: AABB::from_points(&vertices).unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros())),
            vertices,
            triangles,
        };
        if (0..mesh.triangle_count()).all(|i| mesh.triangle(i).is_degenerate()) {
            return Err(PhysicsError::geometry("every mesh triangle has zero area"));
        }
        Ok(mesh)
    }

    /// Copy interleaved `xyz` floats and indices into a new mesh
    pub fn from_raw(positions: &[f32], indices: &[u32]) -> PhysicsResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(PhysicsError::geometry("vertex buffer length must be a multiple of 3"));
        }
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(positions.len() / 3)?;
        vertices.extend(positions.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])));

        let mut owned_indices = Vec::new();
        owned_indices.try_reserve_exact(indices.len())?;
        owned_indices.extend_from_slice(indices);

        Self::new(vertices, owned_indices)
    }

    /// Vertex buffer
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index triples
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangle `index` in the mesh frame
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Local bounding box
    pub const fn local_bounds(&self) -> AABB {
        self.bounds
    }

    /// Push every triangle whose bounds overlap `region` (mesh frame)
    pub fn triangles_in(&self, region: &AABB, out: &mut Vec<Triangle>) {
        if !self.bounds.intersects(region) {
            return;
        }
        out.extend(
            (0..self.triangles.len())
                .map(|i| self.triangle(i))
                .filter(|t| !t.is_degenerate() && t.aabb().intersects(region)),
        );
    }

    /// Farthest vertex along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        self.vertices
            .iter()
            .copied()
            .max_by(|a, b| a.dot(dir).total_cmp(&b.dot(dir)))
            .unwrap_or_else(Vec3::zeros)
    }

    /// Mass of the enclosed volume; open meshes have none
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::polyhedron(&self.vertices, &self.triangles, density)
    }

    /// Nearest triangle hit; the normal faces back along the segment
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let segment = AABB::new(origin.inf(&(origin + dir * max_t)), origin.sup(&(origin + dir * max_t)));
        if !self.bounds.intersects(&segment) {
            return None;
        }
        nearest_triangle_hit(
            (0..self.triangles.len()).map(|i| self.triangle(i)),
            origin,
            dir,
            max_t,
        )
    }
}

/// Nearest segment hit among `triangles`, normal flipped to face the segment
pub(crate) fn nearest_triangle_hit<I>(triangles: I, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)>
where
    I: IntoIterator<Item = Triangle>,
{
    let mut best: Option<(f32, Vec3)> = None;
    for tri in triangles {
        let limit = best.map_or(max_t, |(t, _)| t);
        if let Some(t) = tri.intersect_segment(origin, dir, limit) {
            let n = tri.normal();
            let n = if n.dot(dir) > 0.0 { -n } else { n };
            best = Some((t, n));
        }
    }
    best
}
