//! Contact manifold generation
//!
//! Sphere and capsule pairs and sphere-box are solved analytically. Every
//! other convex pair runs GJK/EPA on the first shape grown by the contact
//! margin, then collects candidate points from both shapes' features facing
//! the contact plane. Concave shapes (mesh, terrain) are split into the
//! triangles near the convex shape and produce one manifold per triangle.
//!
//! Manifold normals always point from the first shape towards the second.
//! A positive separation is a speculative contact: the shapes are apart but
//! within the margin.

use super::gjk::{self, Inflated, SupportMap};
use super::primitives::{closest_points_segments, Triangle};
use super::{concave_triangles, region_in_frame, PosedConvex};
use crate::foundation::math::{utils, Pose, Vec3};
use crate::physics::shape::ShapeGeometry;

/// Maximum points kept per manifold
pub const MAX_CONTACT_POINTS: usize = 4;

const CONTAINMENT_TOLERANCE: f32 = 0.005;
const MERGE_DISTANCE: f32 = 0.01;
const FEATURE_TOLERANCE: f32 = 0.02;

/// One contact point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactPoint {
    /// World position, halfway between the two surfaces
    pub position: Vec3,
    /// Signed gap along the normal; negative when penetrating
    pub separation: f32,
}

/// Contact points of one shape pair sharing a normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// Unit normal from the first shape towards the second
    pub normal: Vec3,
    points: [ContactPoint; MAX_CONTACT_POINTS],
    len: usize,
}

impl Manifold {
    /// Empty manifold with the given normal
    pub fn new(normal: Vec3) -> Self {
        Self {
            normal,
            points: [ContactPoint::default(); MAX_CONTACT_POINTS],
            len: 0,
        }
    }

    /// Add a point; ignored once the manifold is full
    pub fn push(&mut self, point: ContactPoint) {
        if self.len < MAX_CONTACT_POINTS {
            self.points[self.len] = point;
            self.len += 1;
        }
    }

    /// Contact points
    pub fn points(&self) -> &[ContactPoint] {
        &self.points[..self.len]
    }

    /// Mutable contact points
    pub fn points_mut(&mut self) -> &mut [ContactPoint] {
        &mut self.points[..self.len]
    }

    /// Number of points
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no points
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deepest penetration, zero for speculative manifolds
    pub fn depth(&self) -> f32 {
        self.points()
            .iter()
            .map(|p| -p.separation)
            .fold(0.0, f32::max)
    }

    /// Same contact seen from the other shape
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    /// Merge near-duplicate candidates and keep at most four spread-out points
    fn from_candidates(normal: Vec3, candidates: &mut Vec<ContactPoint>) -> Option<Self> {
        candidates.sort_by(|a, b| a.separation.total_cmp(&b.separation));
        let mut unique: Vec<ContactPoint> = Vec::with_capacity(candidates.len());
        for c in candidates.drain(..) {
            if unique
                .iter()
                .all(|u| (u.position - c.position).norm() > MERGE_DISTANCE)
            {
                unique.push(c);
            }
        }
        if unique.is_empty() {
            return None;
        }

        let mut manifold = Self::new(normal);
        if unique.len() <= MAX_CONTACT_POINTS {
            unique.into_iter().for_each(|p| manifold.push(p));
            return Some(manifold);
        }

        // Deepest first, then the point farthest from it
        let first = unique.swap_remove(0);
        let far = farthest_index(&unique, |p| (p.position - first.position).norm_squared())?;
        let second = unique.swap_remove(far);

        // Largest triangle with the first two
        let edge = second.position - first.position;
        let third_index = farthest_index(&unique, |p| {
            edge.cross(&(p.position - first.position)).norm_squared()
        })?;
        let third = unique.swap_remove(third_index);

        // Point farthest from all three
        let fourth_index = farthest_index(&unique, |p| {
            [first, second, third]
                .iter()
                .map(|q| (q.position - p.position).norm_squared())
                .fold(f32::INFINITY, f32::min)
        })?;
        let fourth = unique[fourth_index];

        for p in [first, second, third, fourth] {
            manifold.push(p);
        }
        Some(manifold)
    }
}

fn farthest_index<F>(points: &[ContactPoint], mut score: F) -> Option<usize>
where
    F: FnMut(&ContactPoint) -> f32,
{
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, score(p)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Contact manifolds between two posed shapes
///
/// Appends zero or more manifolds to `out`. `margin` is the speculative
/// distance: shapes closer than this produce contacts with a positive
/// separation. Two concave shapes never produce contacts.
pub fn collide(a: &ShapeGeometry, pose_a: &Pose, b: &ShapeGeometry, pose_b: &Pose, margin: f32, out: &mut Vec<Manifold>) {
    use ShapeGeometry as G;

    let manifold = match (a, b) {
        (G::Mesh(_) | G::Terrain(_), G::Mesh(_) | G::Terrain(_)) => None,
        (_, G::Mesh(_) | G::Terrain(_)) => {
            convex_concave(a, pose_a, b, pose_b, margin, out, false);
            None
        }
        (G::Mesh(_) | G::Terrain(_), _) => {
            convex_concave(b, pose_b, a, pose_a, margin, out, true);
            None
        }
        (G::Sphere(_) | G::Capsule(_), G::Sphere(_) | G::Capsule(_)) => rounded_segments(a, pose_a, b, pose_b, margin),
        (G::Sphere(s), G::Box(c)) => sphere_box(pose_a, s.radius, pose_b, &c.half_extents, margin),
        (G::Box(c), G::Sphere(s)) => sphere_box(pose_b, s.radius, pose_a, &c.half_extents, margin).map(Manifold::flipped),
        _ => convex_convex(&PosedConvex::new(a, *pose_a), &PosedConvex::new(b, *pose_b), margin),
    };
    out.extend(manifold);
}

// Core segment and radius of a sphere or capsule in world space
fn rounded_core(geometry: &ShapeGeometry, pose: &Pose) -> Option<(Vec3, Vec3, f32)> {
    match geometry {
        ShapeGeometry::Sphere(s) => Some((pose.position, pose.position, s.radius)),
        ShapeGeometry::Capsule(c) => {
            let (p, q) = c.segment();
            Some((pose.transform_point(&p), pose.transform_point(&q), c.radius))
        }
        _ => None,
    }
}

fn rounded_segments(a: &ShapeGeometry, pose_a: &Pose, b: &ShapeGeometry, pose_b: &Pose, margin: f32) -> Option<Manifold> {
    let (p1, q1, ra) = rounded_core(a, pose_a)?;
    let (p2, q2, rb) = rounded_core(b, pose_b)?;

    let (ca, cb) = closest_points_segments(&p1, &q1, &p2, &q2);
    let delta = cb - ca;
    let distance = delta.norm();
    let separation = distance - ra - rb;
    if separation > margin {
        return None;
    }
    let fallback = utils::normalize_or(&(pose_b.position - pose_a.position), Vec3::y());
    let normal = utils::normalize_or(&delta, fallback);

    // Endpoint pairs catch the second point of parallel capsules
    let pairs = [
        (ca, cb),
        (p1, super::primitives::closest_point_segment(&p2, &q2, &p1)),
        (q1, super::primitives::closest_point_segment(&p2, &q2, &q1)),
        (super::primitives::closest_point_segment(&p1, &q1, &p2), p2),
        (super::primitives::closest_point_segment(&p1, &q1, &q2), q2),
    ];
    let mut candidates: Vec<ContactPoint> = pairs
        .iter()
        .filter_map(|(pa, pb)| {
            let s = (pb - pa).dot(&normal) - ra - rb;
            (s <= separation.max(0.0) + FEATURE_TOLERANCE && (pb - pa - normal * (pb - pa).dot(&normal)).norm() < FEATURE_TOLERANCE)
                .then(|| ContactPoint {
                    position: (pa + normal * ra + pb - normal * rb) * 0.5,
                    separation: s,
                })
        })
        .collect();
    if candidates.is_empty() {
        candidates.push(ContactPoint {
            position: (ca + normal * ra + cb - normal * rb) * 0.5,
            separation,
        });
    }
    Manifold::from_candidates(normal, &mut candidates)
}

fn sphere_box(sphere_pose: &Pose, radius: f32, box_pose: &Pose, half: &Vec3, margin: f32) -> Option<Manifold> {
    let center = box_pose.inverse_transform_point(&sphere_pose.position);
    let clamped = center.zip_map(half, |c, h| c.clamp(-h, h));

    let (local_normal, surface, separation) = if clamped == center {
        // Center inside the box: push out through the nearest face
        let (axis, gap) = (0..3)
            .map(|i| (i, half[i] - center[i].abs()))
            .min_by(|x, y| x.1.total_cmp(&y.1))?;
        let sign = if center[axis] >= 0.0 { 1.0 } else { -1.0 };
        let mut n = Vec3::zeros();
        n[axis] = sign;
        let mut surface = center;
        surface[axis] = sign * half[axis];
        (n, surface, -gap - radius)
    } else {
        let delta = center - clamped;
        let distance = delta.norm();
        (delta / distance, clamped, distance - radius)
    };
    if separation > margin {
        return None;
    }

    // Normal from the sphere towards the box
    let box_normal = box_pose.transform_vector(&local_normal);
    let on_box = box_pose.transform_point(&surface);
    let on_sphere = sphere_pose.position - box_normal * radius;
    let mut manifold = Manifold::new(-box_normal);
    manifold.push(ContactPoint {
        position: (on_box + on_sphere) * 0.5,
        separation,
    });
    Some(manifold)
}

fn sphere_triangle(center: &Vec3, radius: f32, triangle: &Triangle, margin: f32) -> Option<Manifold> {
    let closest = triangle.closest_point(center);
    let delta = center - closest;
    let distance = delta.norm();
    let separation = distance - radius;
    if separation > margin {
        return None;
    }
    let face = triangle.normal();
    let face = if face.dot(&delta) < 0.0 { -face } else { face };
    let towards_sphere = utils::normalize_or(&delta, face);
    let mut manifold = Manifold::new(-towards_sphere);
    manifold.push(ContactPoint {
        position: (closest + center - towards_sphere * radius) * 0.5,
        separation,
    });
    Some(manifold)
}

/// Convex shape against the triangles of a mesh or terrain
///
/// Normals point from the convex shape to the concave one, or the reverse
/// when `concave_first` is set.
fn convex_concave(
    convex: &ShapeGeometry,
    pose_c: &Pose,
    concave: &ShapeGeometry,
    pose_k: &Pose,
    margin: f32,
    out: &mut Vec<Manifold>,
    concave_first: bool,
) {
    let region = region_in_frame(&convex.aabb(pose_c).expanded(margin), pose_k);
    let mut triangles = Vec::new();
    concave_triangles(concave, &region, &mut triangles);

    let posed = PosedConvex::new(convex, *pose_c);
    for local in triangles {
        let manifold = match convex {
            ShapeGeometry::Sphere(s) => {
                let world = Triangle::new(
                    pose_k.transform_point(&local.v0),
                    pose_k.transform_point(&local.v1),
                    pose_k.transform_point(&local.v2),
                );
                sphere_triangle(&pose_c.position, s.radius, &world, margin)
            }
            _ => convex_convex(&posed, &PosedConvex::triangle(local, *pose_k), margin),
        };
        out.extend(manifold.map(|m| if concave_first { m.flipped() } else { m }));
    }
}

/// General convex pair through GJK/EPA plus feature clipping
fn convex_convex(a: &PosedConvex<'_>, b: &PosedConvex<'_>, margin: f32) -> Option<Manifold> {
    let inflated = Inflated { inner: a, margin };
    let simplex = gjk::gjk(&inflated, b)?;
    let penetration = gjk::epa(&inflated, b, &simplex)?;
    let normal = penetration.normal;
    if !utils::is_finite(&normal) {
        return None;
    }
    let separation = margin - penetration.depth;
    let cutoff = separation.max(0.0) + FEATURE_TOLERANCE;

    let mut candidates = Vec::new();
    let mut features = Vec::new();

    // Features of A projected onto B's supporting plane
    let plane_b = b.support(&-normal).dot(&normal);
    a.feature_points(&normal, &mut features);
    for p in features.drain(..) {
        let s = plane_b - p.dot(&normal);
        let q = p + normal * s;
        if s <= cutoff && b.contains(&q, CONTAINMENT_TOLERANCE) {
            candidates.push(ContactPoint {
                position: (p + q) * 0.5,
                separation: s,
            });
        }
    }

    // Features of B projected onto A's supporting plane
    let plane_a = a.support(&normal).dot(&normal);
    b.feature_points(&-normal, &mut features);
    for p in features.drain(..) {
        let s = p.dot(&normal) - plane_a;
        let q = p - normal * s;
        if s <= cutoff && a.contains(&q, CONTAINMENT_TOLERANCE) {
            candidates.push(ContactPoint {
                position: (p + q) * 0.5,
                separation: s,
            });
        }
    }

    if candidates.is_empty() {
        let on_a = penetration.point_a - normal * margin;
        candidates.push(ContactPoint {
            position: (on_a + penetration.point_b) * 0.5,
            separation,
        });
    }
    Manifold::from_candidates(normal, &mut candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants::PI, Quat};
    use crate::physics::shape::{Capsule, ConvexHull, Cuboid, Cylinder, Sphere, Terrain};
    use approx::assert_relative_eq;

    fn ground() -> (ShapeGeometry, Pose) {
        (
            ShapeGeometry::Box(Cuboid::new(Vec3::new(50.0, 1.0, 50.0)).expect("valid")),
            Pose::from_position(Vec3::new(0.0, -1.0, 0.0)),
        )
    }

    fn contacts(a: &ShapeGeometry, pa: Pose, b: &ShapeGeometry, pb: Pose, margin: f32) -> Vec<Manifold> {
        let mut out = Vec::new();
        collide(a, &pa, b, &pb, margin, &mut out);
        out
    }

    #[test]
    fn test_sphere_on_ground_box() {
        let (g, gp) = ground();
        let ball = ShapeGeometry::Sphere(Sphere::new(1.0).expect("valid"));
        let out = contacts(&ball, Pose::from_position(Vec3::new(0.0, 0.9, 0.0)), &g, gp, 0.02);
        assert_eq!(out.len(), 1);
        let m = &out[0];
        assert_relative_eq!(m.normal, -Vec3::y(), epsilon = 1e-5);
        assert_relative_eq!(m.points()[0].separation, -0.1, epsilon = 1e-5);
        assert_relative_eq!(m.depth(), 0.1, epsilon = 1e-5);

        // Reversed order flips the normal
        let out = contacts(&g, gp, &ball, Pose::from_position(Vec3::new(0.0, 0.9, 0.0)), 0.02);
        assert_relative_eq!(out[0].normal, Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_speculative_margin() {
        let (g, gp) = ground();
        let ball = ShapeGeometry::Sphere(Sphere::new(1.0).expect("valid"));
        assert!(contacts(&ball, Pose::from_position(Vec3::new(0.0, 1.05, 0.0)), &g, gp, 0.02).is_empty());
        let out = contacts(&ball, Pose::from_position(Vec3::new(0.0, 1.01, 0.0)), &g, gp, 0.02);
        assert_relative_eq!(out[0].points()[0].separation, 0.01, epsilon = 1e-5);
    }

    #[test]
    fn test_box_face_contact_has_four_points() {
        let (g, gp) = ground();
        let block = ShapeGeometry::Box(Cuboid::new(Vec3::repeat(0.5)).expect("valid"));
        let out = contacts(&block, Pose::from_position(Vec3::new(2.0, 0.49, 1.0)), &g, gp, 0.02);
        assert_eq!(out.len(), 1);
        let m = &out[0];
        assert_eq!(m.len(), 4);
        assert_relative_eq!(m.normal, -Vec3::y(), epsilon = 1e-3);
        for p in m.points() {
            assert_relative_eq!(p.separation, -0.01, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_parallel_capsules_two_points() {
        let capsule = ShapeGeometry::Capsule(Capsule::new(0.5, 2.0).expect("valid"));
        let out = contacts(
            &capsule,
            Pose::identity(),
            &capsule,
            Pose::from_position(Vec3::new(0.0, 0.95, 0.0)),
            0.02,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 2);
        assert_relative_eq!(out[0].normal, Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_lying_cylinder_on_ground() {
        let (g, gp) = ground();
        let cylinder = ShapeGeometry::Cylinder(Cylinder::new(0.5, 2.0).expect("valid"));
        let pose = Pose::new(
            Vec3::new(0.0, 0.49, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0),
        );
        let out = contacts(&cylinder, pose, &g, gp, 0.02);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 2);
    }

    #[test]
    fn test_hull_against_sphere() {
        let hull = ShapeGeometry::Convex(
            ConvexHull::new(&[
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
            ])
            .expect("valid"),
        );
        let ball = ShapeGeometry::Sphere(Sphere::new(0.5).expect("valid"));
        let out = contacts(&hull, Pose::identity(), &ball, Pose::from_position(Vec3::new(0.0, 1.4, 0.0)), 0.02);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::y(), epsilon = 1e-2);
        assert_relative_eq!(out[0].depth(), 0.1, epsilon = 1e-2);
    }

    #[test]
    fn test_box_on_terrain() {
        let terrain = ShapeGeometry::Terrain(Terrain::new(vec![0.0; 9], 3, 8.0, 1.0).expect("valid"));
        let block = ShapeGeometry::Box(Cuboid::new(Vec3::repeat(0.5)).expect("valid"));
        let out = contacts(&block, Pose::from_position(Vec3::new(1.0, 0.49, 1.0)), &terrain, Pose::identity(), 0.02);
        assert!(!out.is_empty());
        for m in &out {
            assert_relative_eq!(m.normal, -Vec3::y(), epsilon = 1e-2);
        }

        let out = contacts(&terrain, Pose::identity(), &block, Pose::from_position(Vec3::new(1.0, 0.49, 1.0)), 0.02);
        assert!(out.iter().all(|m| m.normal.y > 0.99));
    }

    #[test]
    fn test_concave_pair_has_no_contacts() {
        let terrain = ShapeGeometry::Terrain(Terrain::new(vec![0.0; 4], 2, 2.0, 1.0).expect("valid"));
        assert!(contacts(&terrain, Pose::identity(), &terrain, Pose::identity(), 0.02).is_empty());
    }

    #[test]
    fn test_reduction_keeps_four() {
        let mut candidates: Vec<ContactPoint> = (0..10)
            .map(|i| ContactPoint {
                position: Vec3::new((i % 5) as f32, 0.0, (i / 5) as f32),
                separation: -0.01 * i as f32,
            })
            .collect();
        let m = Manifold::from_candidates(Vec3::y(), &mut candidates).expect("points");
        assert_eq!(m.len(), 4);
        assert_relative_eq!(m.depth(), 0.09, epsilon = 1e-6);
    }
}
