//! Math utilities and types
//!
//! Provides the fundamental math types used by the simulation: vectors,
//! matrices, rotations and rigid poses.

pub use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid transform: position plus orientation, no scale
///
/// Every collider and shape offset in the simulation is a `Pose`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Pose {
    /// Create a pose from position and rotation
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create a new identity pose
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a pose with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Apply this pose to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    /// Apply this pose's rotation to a vector
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Map a world-space point into this pose's local frame
    pub fn inverse_transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&(point - self.position))
    }

    /// Map a world-space vector into this pose's local frame
    pub fn inverse_transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(vector)
    }

    /// Combine this pose with a child pose expressed in this pose's frame
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Get the inverse pose
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * (-self.position),
            rotation,
        }
    }

    /// Whether both position and rotation are finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Lengths below this are treated as zero
    pub const EPSILON: f32 = 1.0e-6;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat3, Quat, Quaternion, Vec3};

    /// Two unit vectors perpendicular to `n` and to each other
    pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
        // Pick the axis least aligned with n to avoid a degenerate cross product
        let helper = if n.x.abs() < 0.57 {
            Vec3::x()
        } else if n.y.abs() < 0.57 {
            Vec3::y()
        } else {
            Vec3::z()
        };
        let t1 = n.cross(&helper).normalize();
        let t2 = n.cross(&t1);
        (t1, t2)
    }

    /// Normalize `v`, or return `fallback` when it is too short
    pub fn normalize_or(v: &Vec3, fallback: Vec3) -> Vec3 {
        let len = v.norm();
        if len > constants::EPSILON {
            v / len
        } else {
            fallback
        }
    }

    /// Wrap an angle into `[-PI, PI]`
    pub fn wrap_angle(angle: f32) -> f32 {
        let mut a = angle % constants::TAU;
        if a > constants::PI {
            a -= constants::TAU;
        } else if a < -constants::PI {
            a += constants::TAU;
        }
        a
    }

    /// Integrate an angular velocity into a rotation over `dt`
    pub fn integrate_rotation(rotation: &Quat, angular: &Vec3, dt: f32) -> Quat {
        let w = Quaternion::new(0.0, angular.x, angular.y, angular.z);
        let q = rotation.into_inner();
        let dq = w * q * (0.5 * dt);
        Quat::new_normalize(q + dq)
    }

    /// Rotate a symmetric tensor into a new frame: `R * I * R^T`
    pub fn rotate_tensor(rotation: &Quat, tensor: &Mat3) -> Mat3 {
        let r = rotation.to_rotation_matrix().into_inner();
        r * tensor * r.transpose()
    }

    /// Whether every component of `v` is finite
    pub fn is_finite(v: &Vec3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}
