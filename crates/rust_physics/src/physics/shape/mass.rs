//! Mass properties of shapes and compound bodies
//!
//! Primitive shapes use closed-form expressions with the long axis of
//! capsules and cylinders along local Z. Closed polyhedra are integrated
//! tetrahedron by tetrahedron.

use crate::foundation::math::{constants::PI, utils, Mat3, Pose, Vec3};
use serde::{Deserialize, Serialize};

/// Mass, center of mass and inertia tensor about the center of mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassData {
    /// Center of mass in the owner's local frame
    pub center_of_mass: Vec3,
    /// Total mass in kilograms
    pub mass: f32,
    /// Inertia tensor about `center_of_mass`, in the owner's local axes
    pub inertia: Mat3,
}

impl Default for MassData {
    fn default() -> Self {
        Self::zero()
    }
}

impl MassData {
    /// Massless placeholder
    pub fn zero() -> Self {
        Self {
            center_of_mass: Vec3::zeros(),
            mass: 0.0,
            inertia: Mat3::zeros(),
        }
    }

    /// Build from the six independent inertia terms `[xx, yy, zz, xy, xz, yz]`
    pub fn from_components(center_of_mass: Vec3, mass: f32, inertia: [f32; 6]) -> Self {
        let [xx, yy, zz, xy, xz, yz] = inertia;
        Self {
            center_of_mass,
            mass,
            inertia: Mat3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz),
        }
    }

    /// The six independent inertia terms `[xx, yy, zz, xy, xz, yz]`
    pub fn inertia_components(&self) -> [f32; 6] {
        let i = &self.inertia;
        [i[(0, 0)], i[(1, 1)], i[(2, 2)], i[(0, 1)], i[(0, 2)], i[(1, 2)]]
    }

    /// Express these properties in a parent frame given this frame's pose in it
    pub fn transformed(&self, pose: &Pose) -> Self {
        Self {
            center_of_mass: pose.transform_point(&self.center_of_mass),
            mass: self.mass,
            inertia: utils::rotate_tensor(&pose.rotation, &self.inertia),
        }
    }

    /// Uniformly rescale to a new total mass, keeping the mass distribution
    pub fn with_mass(&self, mass: f32) -> Self {
        let scale = if self.mass > 0.0 { mass / self.mass } else { 0.0 };
        Self {
            center_of_mass: self.center_of_mass,
            mass,
            inertia: self.inertia * scale,
        }
    }

    /// Combine parts that are already expressed in a common frame
    ///
    /// Inertia is shifted to the combined center of mass with the
    /// parallel-axis theorem.
    pub fn combine<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let parts: Vec<Self> = parts.into_iter().filter(|p| p.mass > 0.0).collect();
        let mass: f32 = parts.iter().map(|p| p.mass).sum();
        if mass <= 0.0 {
            return Self::zero();
        }

        let center = parts
            .iter()
            .fold(Vec3::zeros(), |acc, p| acc + p.center_of_mass * p.mass)
            / mass;

        let inertia = parts.iter().fold(Mat3::zeros(), |acc, p| {
            acc + p.inertia + parallel_axis(p.mass, &(p.center_of_mass - center))
        });

        Self {
            center_of_mass: center,
            mass,
            inertia,
        }
    }

    /// Whether every value is finite and the mass is non-negative
    pub fn is_valid(&self) -> bool {
        self.mass.is_finite()
            && self.mass >= 0.0
            && utils::is_finite(&self.center_of_mass)
            && self.inertia.iter().all(|v| v.is_finite())
    }
}

/// Inertia contribution of a point mass at offset `d`: `m (|d|^2 E - d d^T)`
pub fn parallel_axis(mass: f32, d: &Vec3) -> Mat3 {
    (Mat3::identity() * d.norm_squared() - d * d.transpose()) * mass
}

/// Solid sphere
pub fn sphere(radius: f32, density: f32) -> MassData {
    let mass = density * 4.0 / 3.0 * PI * radius.powi(3);
    let i = 0.4 * mass * radius * radius;
    MassData {
        center_of_mass: Vec3::zeros(),
        mass,
        inertia: Mat3::from_diagonal_element(i),
    }
}

/// Solid box from half extents
pub fn cuboid(half_extents: &Vec3, density: f32) -> MassData {
    let h = half_extents;
    let mass = density * 8.0 * h.x * h.y * h.z;
    let sq = h.component_mul(h);
    MassData {
        center_of_mass: Vec3::zeros(),
        mass,
        inertia: Mat3::from_diagonal(&Vec3::new(
            mass / 3.0 * (sq.y + sq.z),
            mass / 3.0 * (sq.x + sq.z),
            mass / 3.0 * (sq.x + sq.y),
        )),
    }
}

/// Solid cylinder along Z
pub fn cylinder(radius: f32, length: f32, density: f32) -> MassData {
    let mass = density * PI * radius * radius * length;
    let side = mass * (3.0 * radius * radius + length * length) / 12.0;
    MassData {
        center_of_mass: Vec3::zeros(),
        mass,
        inertia: Mat3::from_diagonal(&Vec3::new(side, side, 0.5 * mass * radius * radius)),
    }
}

/// Capsule along Z; `length` is the cylindrical part only
pub fn capsule(radius: f32, length: f32, density: f32) -> MassData {
    let r2 = radius * radius;
    let m_cyl = density * PI * r2 * length;
    let m_caps = density * 4.0 / 3.0 * PI * r2 * radius;
    let side = m_cyl * (0.25 * r2 + length * length / 12.0)
        + m_caps * (0.4 * r2 + 0.375 * radius * length + 0.25 * length * length);
    let axial = (m_cyl * 0.5 + m_caps * 0.4) * r2;
    MassData {
        center_of_mass: Vec3::zeros(),
        mass: m_cyl + m_caps,
        inertia: Mat3::from_diagonal(&Vec3::new(side, side, axial)),
    }
}

/// Closed triangle surface, integrated as tetrahedra against a reference point
///
/// Winding may be either orientation; an open or flat surface yields zero mass.
pub fn polyhedron(vertices: &[Vec3], triangles: &[[u32; 3]], density: f32) -> MassData {
    if vertices.is_empty() || triangles.is_empty() {
        return MassData::zero();
    }

    // Integrate relative to the vertex centroid to limit cancellation
    let reference = vertices.iter().sum::<Vec3>() / vertices.len() as f32;
    let canonical = Mat3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0) / 120.0;

    let mut volume = 0.0_f32;
    let mut first_moment = Vec3::zeros();
    let mut covariance = Mat3::zeros();

    for tri in triangles {
        let a = vertices[tri[0] as usize] - reference;
        let b = vertices[tri[1] as usize] - reference;
        let c = vertices[tri[2] as usize] - reference;
        let det = a.dot(&b.cross(&c));
        let basis = Mat3::from_columns(&[a, b, c]);

        volume += det / 6.0;
        first_moment += (a + b + c) * (det / 24.0);
        covariance += basis * canonical * basis.transpose() * det;
    }

    if volume.abs() < 1.0e-9 {
        return MassData::zero();
    }
    if volume < 0.0 {
        volume = -volume;
        first_moment = -first_moment;
        covariance = -covariance;
    }

    let mass = density * volume;
    let local_center = first_moment / volume;
    // Covariance about the center of mass, then I = tr(C) E - C
    let covariance = covariance * density - local_center * local_center.transpose() * mass;
    let inertia = Mat3::identity() * covariance.trace() - covariance;

    MassData {
        center_of_mass: local_center + reference,
        mass,
        inertia,
    }
}
