//! Primitive convex shapes in their local frame
//!
//! Capsules and cylinders are aligned with local Z. All ray routines take a
//! segment `origin + t * dir` with `t` in `[0, max_t]` and report the entry
//! parameter and outward normal; rays starting inside a shape do not hit it.

use super::mass::{self, MassData};
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::math::{utils, Vec3};
use serde::{Deserialize, Serialize};

fn check_dimension(name: &str, value: f32) -> PhysicsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::geometry(format!("{name} must be positive and finite, got {value}")))
    }
}

/// Solid sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Validate and create
    pub fn new(radius: f32) -> PhysicsResult<Self> {
        check_dimension("sphere radius", radius)?;
        Ok(Self { radius })
    }

    /// Farthest point along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        utils::normalize_or(dir, Vec3::x()) * self.radius
    }

    /// Local half extents of the bounding box
    pub fn half_extents(&self) -> Vec3 {
        Vec3::repeat(self.radius)
    }

    /// Mass properties at `density`
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::sphere(self.radius, density)
    }

    /// Whether `p` lies within `tolerance` of the sphere
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        p.norm() <= self.radius + tolerance
    }

    /// Segment cast
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        ray_sphere(&Vec3::zeros(), self.radius, origin, dir, max_t)
    }
}

/// Solid box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    /// Half extents along each local axis
    pub half_extents: Vec3,
}

impl Cuboid {
    /// Validate and create from half extents
    pub fn new(half_extents: Vec3) -> PhysicsResult<Self> {
        check_dimension("box half extent x", half_extents.x)?;
        check_dimension("box half extent y", half_extents.y)?;
        check_dimension("box half extent z", half_extents.z)?;
        Ok(Self { half_extents })
    }

    /// Farthest point along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        let h = &self.half_extents;
        Vec3::new(
            if dir.x >= 0.0 { h.x } else { -h.x },
            if dir.y >= 0.0 { h.y } else { -h.y },
            if dir.z >= 0.0 { h.z } else { -h.z },
        )
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let h = &self.half_extents;
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            )
        })
    }

    /// Mass properties at `density`
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::cuboid(&self.half_extents, density)
    }

    /// Whether `p` lies within `tolerance` of the box
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        (0..3).all(|i| p[i].abs() <= self.half_extents[i] + tolerance)
    }

    /// Segment cast (slab method, tracking the entry face)
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let h = &self.half_extents;
        if (0..3).all(|i| origin[i].abs() < h[i]) {
            return None;
        }

        let mut t_enter = 0.0_f32;
        let mut t_exit = max_t;
        let mut normal = Vec3::zeros();
        for axis in 0..3 {
            if dir[axis].abs() < 1.0e-12 {
                if origin[axis].abs() > h[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t1 = (-h[axis] - origin[axis]) * inv;
            let mut t2 = (h[axis] - origin[axis]) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }
            if t1 > t_enter {
                t_enter = t1;
                normal = Vec3::zeros();
                normal[axis] = sign;
            }
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }
        (normal != Vec3::zeros()).then_some((t_enter, normal))
    }
}

/// Capsule along Z: a segment of `length` swept by `radius`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    /// Radius of the swept sphere
    pub radius: f32,
    /// Length of the core segment, excluding the caps
    pub length: f32,
}

impl Capsule {
    /// Validate and create
    pub fn new(radius: f32, length: f32) -> PhysicsResult<Self> {
        check_dimension("capsule radius", radius)?;
        check_dimension("capsule length", length)?;
        Ok(Self { radius, length })
    }

    /// Core segment endpoints
    pub fn segment(&self) -> (Vec3, Vec3) {
        let half = 0.5 * self.length;
        (Vec3::new(0.0, 0.0, -half), Vec3::new(0.0, 0.0, half))
    }

    /// Farthest point along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        let (a, b) = self.segment();
        let tip = if dir.z >= 0.0 { b } else { a };
        tip + utils::normalize_or(dir, Vec3::x()) * self.radius
    }

    /// Local half extents of the bounding box
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.radius, self.radius, self.radius + 0.5 * self.length)
    }

    /// Mass properties at `density`
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::capsule(self.radius, self.length, density)
    }

    /// Whether `p` lies within `tolerance` of the capsule
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        let half = 0.5 * self.length;
        let core = Vec3::new(0.0, 0.0, p.z.clamp(-half, half));
        (p - core).norm() <= self.radius + tolerance
    }

    /// Segment cast against the side and both caps
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        if self.contains(origin, 0.0) {
            return None;
        }
        let half = 0.5 * self.length;
        let side = ray_infinite_cylinder(self.radius, origin, dir, max_t)
            .filter(|(t, _)| (origin.z + dir.z * t).abs() <= half);
        let (a, b) = self.segment();
        [
            side,
            ray_sphere(&a, self.radius, origin, dir, max_t),
            ray_sphere(&b, self.radius, origin, dir, max_t),
        ]
        .into_iter()
        .flatten()
        .min_by(|x, y| x.0.total_cmp(&y.0))
    }
}

/// Solid cylinder along Z
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    /// Radius
    pub radius: f32,
    /// Full length along Z
    pub length: f32,
}

impl Cylinder {
    /// Validate and create
    pub fn new(radius: f32, length: f32) -> PhysicsResult<Self> {
        check_dimension("cylinder radius", radius)?;
        check_dimension("cylinder length", length)?;
        Ok(Self { radius, length })
    }

    /// Farthest point along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        let radial = Vec3::new(dir.x, dir.y, 0.0);
        let rim = if radial.norm_squared() > 1.0e-12 {
            radial.normalize() * self.radius
        } else {
            Vec3::zeros()
        };
        let z = if dir.z >= 0.0 { 0.5 * self.length } else { -0.5 * self.length };
        Vec3::new(rim.x, rim.y, z)
    }

    /// Rim sample points on both caps, used as manifold candidates
    pub fn rim_points(&self) -> [Vec3; 16] {
        let half = 0.5 * self.length;
        std::array::from_fn(|i| {
            let angle = (i % 8) as f32 * std::f32::consts::FRAC_PI_4;
            let z = if i < 8 { -half } else { half };
            Vec3::new(self.radius * angle.cos(), self.radius * angle.sin(), z)
        })
    }

    /// Local half extents of the bounding box
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.radius, self.radius, 0.5 * self.length)
    }

    /// Mass properties at `density`
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::cylinder(self.radius, self.length, density)
    }

    /// Whether `p` lies within `tolerance` of the cylinder
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        p.z.abs() <= 0.5 * self.length + tolerance
            && (p.x * p.x + p.y * p.y).sqrt() <= self.radius + tolerance
    }

    /// Segment cast against the side and both end disks
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        if self.contains(origin, 0.0) {
            return None;
        }
        let half = 0.5 * self.length;
        let side = ray_infinite_cylinder(self.radius, origin, dir, max_t)
            .filter(|(t, _)| (origin.z + dir.z * t).abs() <= half);

        let mut caps = None;
        if dir.z.abs() > 1.0e-12 {
            for (z, nz) in [(half, 1.0), (-half, -1.0)] {
                // Only the cap facing the ray can be entered
                if dir.z * nz >= 0.0 {
                    continue;
                }
                let t = (z - origin.z) / dir.z;
                if !(0.0..=max_t).contains(&t) {
                    continue;
                }
                let p = origin + dir * t;
                if p.x * p.x + p.y * p.y <= self.radius * self.radius {
                    caps = Some((t, Vec3::new(0.0, 0.0, nz)));
                }
            }
        }

        [side, caps]
            .into_iter()
            .flatten()
            .min_by(|x, y| x.0.total_cmp(&y.0))
    }
}

/// Segment against a sphere at `center`
pub fn ray_sphere(center: &Vec3, radius: f32, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
    let oc = origin - center;
    let a = dir.norm_squared();
    if a < 1.0e-12 {
        return None;
    }
    let b = oc.dot(dir);
    let c = oc.norm_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / a;
    if !(0.0..=max_t).contains(&t) {
        return None;
    }
    let normal = (oc + dir * t) / radius;
    Some((t, normal))
}

/// Segment against the infinite cylinder `x^2 + y^2 = r^2`
fn ray_infinite_cylinder(radius: f32, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
    let a = dir.x * dir.x + dir.y * dir.y;
    if a < 1.0e-12 {
        return None;
    }
    let b = origin.x * dir.x + origin.y * dir.y;
    let c = origin.x * origin.x + origin.y * origin.y - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / a;
    if !(0.0..=max_t).contains(&t) {
        return None;
    }
    let p = origin + dir * t;
    Some((t, Vec3::new(p.x, p.y, 0.0) / radius))
}
