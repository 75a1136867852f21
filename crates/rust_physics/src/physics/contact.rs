//! Contacts produced by one step
//!
//! A [`Contact`] wraps the narrow-phase manifold of one shape pair together
//! with the handles involved and the response settings the contact callback
//! may override.

use crate::foundation::collections::{ColliderHandle, ColliderKey, ShapeHandle};
use crate::foundation::math::Vec3;
use crate::physics::collision::{ContactPoint, Manifold};
use crate::physics::solver::LINEAR_SLOP;

/// Ordered collider pair used to track overlaps between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Lower key
    pub a: ColliderKey,
    /// Higher key
    pub b: ColliderKey,
}

impl CollisionPair {
    /// Create a pair with consistent ordering
    pub fn new(a: ColliderKey, b: ColliderKey) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// One shape pair in contact during the last step
#[derive(Debug, Clone)]
pub struct Contact {
    pub(crate) collider_a: ColliderHandle,
    pub(crate) collider_b: ColliderHandle,
    pub(crate) shape_a: ShapeHandle,
    pub(crate) shape_b: ShapeHandle,
    pub(crate) manifold: Manifold,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) enabled: bool,
    pub(crate) surface_velocity: Vec3,
    pub(crate) sensor: bool,
}

impl Contact {
    /// Mix the two bodies' materials: geometric mean friction, max restitution
    pub(crate) fn new(
        colliders: (ColliderHandle, ColliderHandle),
        shapes: (ShapeHandle, ShapeHandle),
        manifold: Manifold,
        materials: ((f32, f32), (f32, f32)),
        sensor: bool,
    ) -> Self {
        let ((friction_a, restitution_a), (friction_b, restitution_b)) = materials;
        Self {
            collider_a: colliders.0,
            collider_b: colliders.1,
            shape_a: shapes.0,
            shape_b: shapes.1,
            manifold,
            friction: (friction_a * friction_b).sqrt(),
            restitution: restitution_a.max(restitution_b),
            enabled: true,
            surface_velocity: Vec3::zeros(),
            sensor,
        }
    }

    /// The two colliders; the normal points from the first to the second
    pub const fn colliders(&self) -> (ColliderHandle, ColliderHandle) {
        (self.collider_a, self.collider_b)
    }

    /// The two shapes, in the same order as [`colliders`](Self::colliders)
    pub const fn shapes(&self) -> (ShapeHandle, ShapeHandle) {
        (self.shape_a, self.shape_b)
    }

    /// Unit normal from the first collider towards the second
    pub const fn normal(&self) -> Vec3 {
        self.manifold.normal
    }

    /// Deepest penetration; zero for speculative contacts
    pub fn depth(&self) -> f32 {
        self.manifold.depth()
    }

    /// Contact points
    pub fn points(&self) -> &[ContactPoint] {
        self.manifold.points()
    }

    /// Whether any point is touching, within the solver's linear slop
    pub fn is_touching(&self) -> bool {
        self.points().iter().any(|p| p.separation <= LINEAR_SLOP)
    }

    /// Underlying manifold
    pub const fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Whether one side is a sensor
    pub const fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Mixed friction
    pub const fn friction(&self) -> f32 {
        self.friction
    }

    /// Override friction for this step
    pub fn set_friction(&mut self, friction: f32) {
        if friction.is_finite() {
            self.friction = friction.max(0.0);
        }
    }

    /// Mixed restitution
    pub const fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Override restitution for this step
    pub fn set_restitution(&mut self, restitution: f32) {
        if restitution.is_finite() {
            self.restitution = restitution.clamp(0.0, 1.0);
        }
    }

    /// Whether the solver responds to this contact
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disable the response for this step only
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tangential velocity of the second surface relative to the first
    pub const fn surface_velocity(&self) -> Vec3 {
        self.surface_velocity
    }

    /// Make the contact act like a conveyor belt
    pub fn set_surface_velocity(&mut self, velocity: Vec3) {
        if velocity.iter().all(|c| c.is_finite()) {
            self.surface_velocity = velocity;
        }
    }
}
