//! Collision shapes
//!
//! A [`Shape`] pairs immutable, shareable geometry with the mutable state a
//! collider needs: an offset pose, a density and an enabled flag. Shapes are
//! plain values until they are added to a collider, at which point the world
//! takes ownership and hands back a [`ShapeHandle`](crate::ShapeHandle).

pub mod convex;
pub mod mass;
pub mod mesh;
pub mod primitives;
pub mod terrain;

pub use convex::ConvexHull;
pub use mass::MassData;
pub use mesh::TriangleMesh;
pub use primitives::{Capsule, Cuboid, Cylinder, Sphere};
pub use terrain::Terrain;

use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::bounds::AABB;
use crate::foundation::math::{Pose, Vec3};
use std::sync::Arc;

/// Discriminant of a shape's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    /// Sphere
    Sphere,
    /// Box
    Box,
    /// Capsule along local Z
    Capsule,
    /// Cylinder along local Z
    Cylinder,
    /// Convex hull
    Convex,
    /// Triangle mesh
    Mesh,
    /// Heightfield terrain
    Terrain,
}

/// Geometry of a shape, in the shape's own frame
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Sphere
    Sphere(Sphere),
    /// Box
    Box(Cuboid),
    /// Capsule along local Z
    Capsule(Capsule),
    /// Cylinder along local Z
    Cylinder(Cylinder),
    /// Convex hull
    Convex(ConvexHull),
    /// Triangle mesh
    Mesh(TriangleMesh),
    /// Heightfield terrain
    Terrain(Terrain),
}

impl ShapeGeometry {
    /// Variant discriminant
    pub const fn shape_type(&self) -> ShapeType {
        match self {
            Self::Sphere(_) => ShapeType::Sphere,
            Self::Box(_) => ShapeType::Box,
            Self::Capsule(_) => ShapeType::Capsule,
            Self::Cylinder(_) => ShapeType::Cylinder,
            Self::Convex(_) => ShapeType::Convex,
            Self::Mesh(_) => ShapeType::Mesh,
            Self::Terrain(_) => ShapeType::Terrain,
        }
    }

    /// Whether the narrow phase can treat this geometry as one convex solid
    pub const fn is_convex(&self) -> bool {
        !matches!(self, Self::Mesh(_) | Self::Terrain(_))
    }

    /// Mass properties at `density`, in the shape frame
    pub fn mass_data(&self, density: f32) -> MassData {
        match self {
            Self::Sphere(s) => s.mass_data(density),
            Self::Box(b) => b.mass_data(density),
            Self::Capsule(c) => c.mass_data(density),
            Self::Cylinder(c) => c.mass_data(density),
            Self::Convex(h) => h.mass_data(density),
            Self::Mesh(m) => m.mass_data(density),
            Self::Terrain(_) => MassData::zero(),
        }
    }

    /// Bounding box in the shape frame
    pub fn local_bounds(&self) -> AABB {
        match self {
            Self::Sphere(s) => AABB::from_center_extents(Vec3::zeros(), s.half_extents()),
            Self::Box(b) => AABB::from_center_extents(Vec3::zeros(), b.half_extents),
            Self::Capsule(c) => AABB::from_center_extents(Vec3::zeros(), c.half_extents()),
            Self::Cylinder(c) => AABB::from_center_extents(Vec3::zeros(), c.half_extents()),
            Self::Convex(h) => h.local_bounds(),
            Self::Mesh(m) => m.local_bounds(),
            Self::Terrain(t) => t.local_bounds(),
        }
    }

    /// World-space bounding box when the shape frame sits at `pose`
    pub fn aabb(&self, pose: &Pose) -> AABB {
        match self {
            Self::Sphere(s) => AABB::from_center_extents(pose.position, s.half_extents()),
            Self::Capsule(c) => {
                let (a, b) = c.segment();
                let a = pose.transform_point(&a);
                let b = pose.transform_point(&b);
                AABB::new(a.inf(&b), a.sup(&b)).expanded(c.radius)
            }
            Self::Cylinder(c) => {
                let axis = pose.transform_vector(&Vec3::z());
                let half = 0.5 * c.length;
                // sin of the angle to world axis i, from the other two components
                let extents = Vec3::from_fn(|i, _| {
                    let (j, k) = ((i + 1) % 3, (i + 2) % 3);
                    axis[i].abs() * half + c.radius * axis[j].hypot(axis[k])
                });
                AABB::from_center_extents(pose.position, extents)
            }
            _ => {
                // Oriented local box re-bounded in world axes
                let local = self.local_bounds();
                let rotation = pose.rotation.to_rotation_matrix().into_inner().abs();
                let center = pose.transform_point(&local.center());
                AABB::from_center_extents(center, rotation * local.extents())
            }
        }
    }

    /// Farthest point along `dir`, in the shape frame
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        match self {
            Self::Sphere(s) => s.support(dir),
            Self::Box(b) => b.support(dir),
            Self::Capsule(c) => c.support(dir),
            Self::Cylinder(c) => c.support(dir),
            Self::Convex(h) => h.support(dir),
            Self::Mesh(m) => m.support(dir),
            Self::Terrain(t) => t.support(dir),
        }
    }

    /// Whether a shape-frame point lies within `tolerance` of a convex solid
    ///
    /// Meshes and terrain have no inside and always report `false`.
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        match self {
            Self::Sphere(s) => s.contains(p, tolerance),
            Self::Box(b) => b.contains(p, tolerance),
            Self::Capsule(c) => c.contains(p, tolerance),
            Self::Cylinder(c) => c.contains(p, tolerance),
            Self::Convex(h) => h.contains(p, tolerance),
            Self::Mesh(_) | Self::Terrain(_) => false,
        }
    }

    /// Candidate contact features facing `dir`, in the shape frame
    pub fn feature_points(&self, dir: &Vec3, out: &mut Vec<Vec3>) {
        match self {
            Self::Sphere(s) => out.push(s.support(dir)),
            Self::Box(b) => out.extend_from_slice(&b.corners()),
            Self::Capsule(c) => {
                let (a, b) = c.segment();
                let offset = crate::foundation::math::utils::normalize_or(dir, Vec3::z()) * c.radius;
                out.push(a + offset);
                out.push(b + offset);
            }
            Self::Cylinder(c) => out.extend_from_slice(&c.rim_points()),
            Self::Convex(h) => out.extend_from_slice(h.points()),
            Self::Mesh(_) | Self::Terrain(_) => {}
        }
    }

    /// Segment cast in the shape frame: `(fraction, outward normal)`
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        match self {
            Self::Sphere(s) => s.ray_cast(origin, dir, max_t),
            Self::Box(b) => b.ray_cast(origin, dir, max_t),
            Self::Capsule(c) => c.ray_cast(origin, dir, max_t),
            Self::Cylinder(c) => c.ray_cast(origin, dir, max_t),
            Self::Convex(h) => h.ray_cast(origin, dir, max_t),
            Self::Mesh(m) => m.ray_cast(origin, dir, max_t),
            Self::Terrain(t) => t.ray_cast(origin, dir, max_t),
        }
    }
}

/// Result of casting a segment against one posed shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeRayHit {
    /// Fraction of the segment at the hit, in `[0, 1]`
    pub fraction: f32,
    /// World-space hit position
    pub position: Vec3,
    /// World-space outward surface normal
    pub normal: Vec3,
}

/// Geometry plus offset, density and enabled flag
#[derive(Debug, Clone)]
pub struct Shape {
    geometry: Arc<ShapeGeometry>,
    offset: Pose,
    density: f32,
    enabled: bool,
}

impl Shape {
    /// Wrap existing geometry; geometry may be shared between shapes
    pub fn from_geometry(geometry: impl Into<Arc<ShapeGeometry>>) -> Self {
        Self {
            geometry: geometry.into(),
            offset: Pose::identity(),
            density: 1.0,
            enabled: true,
        }
    }

    /// Sphere of `radius`
    pub fn sphere(radius: f32) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Sphere(Sphere::new(radius)?)))
    }

    /// Box from half extents
    pub fn cuboid(half_extents: Vec3) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Box(Cuboid::new(half_extents)?)))
    }

    /// Box from full side lengths
    pub fn box_from_size(width: f32, height: f32, depth: f32) -> PhysicsResult<Self> {
        Self::cuboid(Vec3::new(width, height, depth) * 0.5)
    }

    /// Capsule along local Z; `length` excludes the caps
    pub fn capsule(radius: f32, length: f32) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Capsule(Capsule::new(radius, length)?)))
    }

    /// Cylinder along local Z
    pub fn cylinder(radius: f32, length: f32) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Cylinder(Cylinder::new(radius, length)?)))
    }

    /// Convex hull of a point cloud (points are copied)
    pub fn convex(points: &[Vec3]) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Convex(ConvexHull::new(points)?)))
    }

    /// Triangle mesh; takes ownership of both buffers
    pub fn mesh(vertices: Vec<Vec3>, indices: Vec<u32>) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Mesh(TriangleMesh::new(vertices, indices)?)))
    }

    /// Heightfield terrain; takes ownership of the height grid
    pub fn terrain(heights: Vec<f32>, samples: usize, horizontal_scale: f32, vertical_scale: f32) -> PhysicsResult<Self> {
        Ok(Self::from_geometry(ShapeGeometry::Terrain(Terrain::new(
            heights,
            samples,
            horizontal_scale,
            vertical_scale,
        )?)))
    }

    /// Geometry
    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    /// Shared geometry handle
    pub fn shared_geometry(&self) -> Arc<ShapeGeometry> {
        Arc::clone(&self.geometry)
    }

    /// Variant discriminant
    pub fn shape_type(&self) -> ShapeType {
        self.geometry.shape_type()
    }

    /// Pose relative to the owning collider
    pub const fn offset(&self) -> Pose {
        self.offset
    }

    /// Set the pose relative to the owning collider
    pub fn set_offset(&mut self, offset: Pose) {
        self.offset = offset;
    }

    /// Builder form of [`set_offset`](Self::set_offset)
    #[must_use]
    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.offset = offset;
        self
    }

    /// Density in kg/m^3 used for automatic mass
    pub const fn density(&self) -> f32 {
        self.density
    }

    /// Set the density; must be finite and non-negative
    pub fn set_density(&mut self, density: f32) -> PhysicsResult<()> {
        if !density.is_finite() || density < 0.0 {
            return Err(PhysicsError::geometry(format!("density must be finite and non-negative, got {density}")));
        }
        self.density = density;
        Ok(())
    }

    /// Builder form of [`set_density`](Self::set_density)
    pub fn with_density(mut self, density: f32) -> PhysicsResult<Self> {
        self.set_density(density)?;
        Ok(self)
    }

    /// Whether the shape takes part in collision and queries
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable collision for this shape
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Mass properties at `density`, in the shape's own frame
    pub fn mass_data(&self, density: f32) -> MassData {
        self.geometry.mass_data(density)
    }

    /// Mass properties at the shape's density, in the collider frame
    pub fn collider_mass_data(&self) -> MassData {
        self.geometry.mass_data(self.density).transformed(&self.offset)
    }

    /// World pose given the owning collider's pose
    pub fn world_pose(&self, collider_pose: &Pose) -> Pose {
        collider_pose.combine(&self.offset)
    }

    /// World-space bounds given the owning collider's pose
    pub fn aabb(&self, collider_pose: &Pose) -> AABB {
        self.geometry.aabb(&self.world_pose(collider_pose))
    }

    /// Cast the world segment `start -> end` against this shape
    pub fn ray_cast(&self, collider_pose: &Pose, start: &Vec3, end: &Vec3) -> Option<ShapeRayHit> {
        let pose = self.world_pose(collider_pose);
        let origin = pose.inverse_transform_point(start);
        let dir = pose.inverse_transform_vector(&(end - start));
        let (fraction, normal) = self.geometry.ray_cast(&origin, &dir, 1.0)?;
        Some(ShapeRayHit {
            fraction,
            position: start + (end - start) * fraction,
            normal: pose.transform_vector(&normal).normalize(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants::PI, Quat};
    use approx::assert_relative_eq;

    #[test]
    fn test_box_aabb_follows_collider_pose() {
        let shape = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0)).expect("valid");
        let pose = Pose::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0),
        );
        let aabb = shape.aabb(&pose);
        assert_relative_eq!(aabb.center(), Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(aabb.extents(), Vec3::new(3.0, 2.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_offset_moves_aabb() {
        let shape = Shape::sphere(0.5)
            .expect("valid")
            .with_offset(Pose::from_position(Vec3::new(0.0, 2.0, 0.0)));
        let aabb = shape.aabb(&Pose::from_position(Vec3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(aabb.center(), Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_cylinder_aabb_tilted() {
        let shape = Shape::cylinder(1.0, 4.0).expect("valid");
        let upright = shape.aabb(&Pose::new(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::x_axis(), PI / 2.0),
        ));
        assert_relative_eq!(upright.extents(), Vec3::new(1.0, 2.0, 1.0), epsilon = 1e-5);

        let diagonal = shape.aabb(&Pose::new(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::x_axis(), PI / 4.0),
        ));
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(diagonal.extents(), Vec3::new(1.0, 2.0 * s + s, 2.0 * s + s), epsilon = 1e-5);
    }

    #[test]
    fn test_world_ray_cast() {
        let shape = Shape::sphere(1.0).expect("valid");
        let hit = shape
            .ray_cast(
                &Pose::from_position(Vec3::new(0.0, 0.0, 5.0)),
                &Vec3::new(0.0, 0.0, 0.0),
                &Vec3::new(0.0, 0.0, 10.0),
            )
            .expect("hit");
        assert_relative_eq!(hit.fraction, 0.4, epsilon = 1e-5);
        assert_relative_eq!(hit.position, Vec3::new(0.0, 0.0, 4.0), epsilon = 1e-5);
        assert_relative_eq!(hit.normal, -Vec3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_density_validation() {
        let mut shape = Shape::sphere(1.0).expect("valid");
        assert!(shape.set_density(-1.0).is_err());
        assert!(shape.set_density(f32::NAN).is_err());
        assert!(shape.set_density(2.0).is_ok());
        assert_relative_eq!(shape.collider_mass_data().mass, 2.0 * 4.0 / 3.0 * PI, epsilon = 1e-4);
    }

    #[test]
    fn test_terrain_and_mesh_are_not_convex() {
        let terrain = Shape::terrain(vec![0.0; 4], 2, 1.0, 1.0).expect("valid");
        assert!(!terrain.geometry().is_convex());
        assert_eq!(terrain.mass_data(1.0).mass, 0.0);
        assert!(Shape::sphere(1.0).expect("valid").geometry().is_convex());
    }
}
