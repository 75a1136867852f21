//! Narrow-phase collision detection
//!
//! Shapes are stored in their own local frame and only posed on demand: a
//! [`PosedConvex`] borrows geometry and pairs it with a world pose for the
//! duration of one test.
//!
//! # Module Organization
//!
//! - [`primitives`] - triangles and segment helpers
//! - [`gjk`] - GJK intersection and EPA penetration depth
//! - [`contact_gen`] - contact manifolds for shape pairs
//! - [`sweep`] - linear shape casts

pub mod contact_gen;
pub mod gjk;
pub mod primitives;
pub mod sweep;

pub use contact_gen::{collide, ContactPoint, Manifold, MAX_CONTACT_POINTS};
pub use gjk::SupportMap;
pub use primitives::Triangle;
pub use sweep::{sweep, SweepHit};

use crate::foundation::bounds::AABB;
use crate::foundation::math::{Pose, Vec3};
use crate::physics::shape::ShapeGeometry;

/// A single convex piece: a convex shape or one triangle of a concave one
#[derive(Debug, Clone, Copy)]
pub enum ConvexProxy<'a> {
    /// Convex shape geometry
    Geometry(&'a ShapeGeometry),
    /// Triangle of a mesh or terrain, in that shape's frame
    Triangle(Triangle),
}

/// Convex piece placed in the world
#[derive(Debug, Clone, Copy)]
pub struct PosedConvex<'a> {
    /// Geometry in its local frame
    pub proxy: ConvexProxy<'a>,
    /// World pose of the local frame
    pub pose: Pose,
}

impl<'a> PosedConvex<'a> {
    /// Pose convex shape geometry
    pub const fn new(geometry: &'a ShapeGeometry, pose: Pose) -> Self {
        Self {
            proxy: ConvexProxy::Geometry(geometry),
            pose,
        }
    }

    /// Pose one triangle of a concave shape
    pub const fn triangle(triangle: Triangle, pose: Pose) -> Self {
        Self {
            proxy: ConvexProxy::Triangle(triangle),
            pose,
        }
    }

    /// Whether a world point lies within `tolerance` of the solid
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        let local = self.pose.inverse_transform_point(p);
        match self.proxy {
            ConvexProxy::Geometry(g) => g.contains(&local, tolerance),
            ConvexProxy::Triangle(t) => (t.closest_point(&local) - local).norm() <= tolerance,
        }
    }

    /// World-space contact features facing `dir`
    pub fn feature_points(&self, dir: &Vec3, out: &mut Vec<Vec3>) {
        let start = out.len();
        match self.proxy {
            ConvexProxy::Geometry(g) => g.feature_points(&self.pose.inverse_transform_vector(dir), out),
            ConvexProxy::Triangle(t) => out.extend_from_slice(&t.vertices()),
        }
        for p in &mut out[start..] {
            *p = self.pose.transform_point(p);
        }
    }
}

impl SupportMap for PosedConvex<'_> {
    fn support(&self, dir: &Vec3) -> Vec3 {
        let local_dir = self.pose.inverse_transform_vector(dir);
        let local = match self.proxy {
            ConvexProxy::Geometry(g) => g.support(&local_dir),
            ConvexProxy::Triangle(t) => t.support(&local_dir),
        };
        self.pose.transform_point(&local)
    }
}

/// Bounds of a world-space box as seen from the frame at `pose`
pub(crate) fn region_in_frame(world: &AABB, pose: &Pose) -> AABB {
    let center = pose.inverse_transform_point(&world.center());
    let rotation = pose.rotation.to_rotation_matrix().into_inner().transpose().abs();
    AABB::from_center_extents(center, rotation * world.extents())
}

/// Triangles of a concave shape overlapping `region` (shape frame)
pub(crate) fn concave_triangles(geometry: &ShapeGeometry, region: &AABB, out: &mut Vec<Triangle>) {
    match geometry {
        ShapeGeometry::Mesh(m) => m.triangles_in(region, out),
        ShapeGeometry::Terrain(t) => t.triangles_in(region, out),
        _ => {}
    }
}

/// Exact overlap test between two posed shapes
///
/// Concave shapes are tested triangle by triangle; two concave shapes never
/// report an overlap.
pub fn overlaps(a: &ShapeGeometry, pose_a: &Pose, b: &ShapeGeometry, pose_b: &Pose) -> bool {
    match (a.is_convex(), b.is_convex()) {
        (true, true) => gjk::intersects(&PosedConvex::new(a, *pose_a), &PosedConvex::new(b, *pose_b)),
        (true, false) => convex_overlaps_concave(a, pose_a, b, pose_b),
        (false, true) => convex_overlaps_concave(b, pose_b, a, pose_a),
        (false, false) => false,
    }
}

fn convex_overlaps_concave(convex: &ShapeGeometry, pose_c: &Pose, concave: &ShapeGeometry, pose_k: &Pose) -> bool {
    let region = region_in_frame(&convex.aabb(pose_c), pose_k);
    let mut triangles = Vec::new();
    concave_triangles(concave, &region, &mut triangles);
    let posed = PosedConvex::new(convex, *pose_c);
    triangles
        .into_iter()
        .any(|t| gjk::intersects(&posed, &PosedConvex::triangle(t, *pose_k)))
}
