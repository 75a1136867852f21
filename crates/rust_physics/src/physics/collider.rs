//! Rigid bodies
//!
//! A [`Collider`] is one rigid body inside a [`World`](super::World). Its
//! pose is the body origin; mass properties are expressed in that frame with
//! the inertia tensor taken about the center of mass. Colliders are reached
//! through the world with a [`ColliderHandle`](crate::ColliderHandle); the
//! world owns the shapes and joints attached to them.

use crate::foundation::collections::{JointKey, ShapeKey};
use crate::foundation::math::{utils, Mat3, Pose, Quat, Vec3};
use crate::physics::shape::MassData;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// How a body responds to forces and contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Moved by forces, gravity, contacts and joints
    #[default]
    Dynamic,
    /// Moved only by its user-set velocity; pushes dynamic bodies
    Kinematic,
    /// Never moves
    Static,
}

/// Default friction coefficient for new colliders
pub const DEFAULT_FRICTION: f32 = 0.5;

bitflags! {
    /// World axes along and about which a dynamic body may move
    ///
    /// A cleared bit removes that component from the body's velocity,
    /// forces and impulses. Locks are in world axes, not body axes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EnabledAxes: u8 {
        /// Translation along world x
        const TRANSLATION_X = 1 << 0;
        /// Translation along world y
        const TRANSLATION_Y = 1 << 1;
        /// Translation along world z
        const TRANSLATION_Z = 1 << 2;
        /// Rotation about world x
        const ROTATION_X = 1 << 3;
        /// Rotation about world y
        const ROTATION_Y = 1 << 4;
        /// Rotation about world z
        const ROTATION_Z = 1 << 5;
        /// All translation
        const TRANSLATION = Self::TRANSLATION_X.bits() | Self::TRANSLATION_Y.bits() | Self::TRANSLATION_Z.bits();
        /// All rotation
        const ROTATION = Self::ROTATION_X.bits() | Self::ROTATION_Y.bits() | Self::ROTATION_Z.bits();
    }
}

impl Default for EnabledAxes {
    fn default() -> Self {
        Self::all()
    }
}

impl EnabledAxes {
    /// Build from per-axis switches, `true` meaning free
    pub fn from_axes(translation: [bool; 3], rotation: [bool; 3]) -> Self {
        let mut axes = Self::empty();
        for i in 0..3 {
            axes.set(Self::from_bits_retain(1 << i), translation[i]);
            axes.set(Self::from_bits_retain(1 << (i + 3)), rotation[i]);
        }
        axes
    }

    /// 1 per free translation axis, 0 per locked one
    pub fn translation_mask(self) -> Vec3 {
        Vec3::from_fn(|i, _| if self.bits() & (1 << i) != 0 { 1.0 } else { 0.0 })
    }

    /// 1 per free rotation axis, 0 per locked one
    pub fn rotation_mask(self) -> Vec3 {
        Vec3::from_fn(|i, _| if self.bits() & (1 << (i + 3)) != 0 { 1.0 } else { 0.0 })
    }
}

/// A rigid body
#[derive(Debug, Clone)]
pub struct Collider {
    pub(crate) pose: Pose,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    pub(crate) force: Vec3,
    pub(crate) torque: Vec3,
    pub(crate) mass_data: MassData,
    pub(crate) inv_mass: f32,
    pub(crate) inv_inertia: Mat3,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) tag: Option<usize>,
    pub(crate) kind: BodyKind,
    pub(crate) sensor: bool,
    pub(crate) continuous: bool,
    pub(crate) enabled_axes: EnabledAxes,
    pub(crate) enabled: bool,
    pub(crate) sleeping_allowed: bool,
    pub(crate) awake: bool,
    pub(crate) sleep_timer: f32,
    pub(crate) automatic_mass: bool,
    pub(crate) user_data: u64,
    pub(crate) shapes: Vec<ShapeKey>,
    pub(crate) joints: Vec<JointKey>,
}

impl Collider {
    pub(crate) fn new(pose: Pose, linear_damping: f32, angular_damping: f32, sleeping_allowed: bool) -> Self {
        Self {
            pose,
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            mass_data: MassData::zero(),
            inv_mass: 0.0,
            inv_inertia: Mat3::zeros(),
            linear_damping,
            angular_damping,
            gravity_scale: 1.0,
            friction: DEFAULT_FRICTION,
            restitution: 0.0,
            tag: None,
            kind: BodyKind::Dynamic,
            sensor: false,
            continuous: false,
            enabled_axes: EnabledAxes::all(),
            enabled: true,
            sleeping_allowed,
            awake: true,
            sleep_timer: 0.0,
            automatic_mass: true,
            user_data: 0,
            shapes: Vec::new(),
            joints: Vec::new(),
        }
    }

    // ---- pose ------------------------------------------------------------

    /// Pose of the body origin
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    /// Position of the body origin
    pub const fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Orientation
    pub const fn rotation(&self) -> Quat {
        self.pose.rotation
    }

    /// Teleport the body; wakes dynamic bodies
    pub fn set_pose(&mut self, pose: Pose) {
        if !pose.is_finite() {
            return;
        }
        self.pose = pose;
        self.wake_if_dynamic();
    }

    /// Move the body origin; wakes dynamic bodies
    pub fn set_position(&mut self, position: Vec3) {
        self.set_pose(Pose::new(position, self.pose.rotation));
    }

    /// Rotate the body about its origin; wakes dynamic bodies
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.set_pose(Pose::new(self.pose.position, rotation));
    }

    // ---- velocity --------------------------------------------------------

    /// Linear velocity of the center of mass
    pub const fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Set the linear velocity; ignored on static bodies
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        if self.kind == BodyKind::Static || !utils::is_finite(&velocity) {
            return;
        }
        self.linear_velocity = velocity;
        self.wake_if_dynamic();
    }

    /// Angular velocity in world axes
    pub const fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Set the angular velocity; ignored on static bodies
    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.kind == BodyKind::Static || !utils::is_finite(&velocity) {
            return;
        }
        self.angular_velocity = velocity;
        self.wake_if_dynamic();
    }

    /// Velocity of a world-space point rigidly attached to the body
    pub fn velocity_at_world_point(&self, point: &Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.world_center_of_mass()))
    }

    /// Velocity of a body-local point
    pub fn velocity_at_local_point(&self, point: &Vec3) -> Vec3 {
        self.velocity_at_world_point(&self.pose.transform_point(point))
    }

    // ---- forces ----------------------------------------------------------

    fn accepts_forces(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Accumulate a force at the center of mass until the next step
    pub fn apply_force(&mut self, force: Vec3) {
        if self.accepts_forces() && utils::is_finite(&force) {
            self.force += force;
            self.wake();
        }
    }

    /// Accumulate a force applied at a world-space point
    pub fn apply_force_at_position(&mut self, force: Vec3, point: Vec3) {
        if self.accepts_forces() && utils::is_finite(&force) && utils::is_finite(&point) {
            self.force += force;
            self.torque += (point - self.world_center_of_mass()).cross(&force);
            self.wake();
        }
    }

    /// Accumulate a torque until the next step
    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.accepts_forces() && utils::is_finite(&torque) {
            self.torque += torque;
            self.wake();
        }
    }

    /// Change momentum at the center of mass immediately
    pub fn apply_linear_impulse(&mut self, impulse: Vec3) {
        if self.accepts_forces() && utils::is_finite(&impulse) {
            self.linear_velocity += self.free_translation(impulse) * self.inv_mass;
            self.wake();
        }
    }

    /// Apply an impulse at a world-space point
    pub fn apply_linear_impulse_at_position(&mut self, impulse: Vec3, point: Vec3) {
        if self.accepts_forces() && utils::is_finite(&impulse) && utils::is_finite(&point) {
            self.linear_velocity += self.free_translation(impulse) * self.inv_mass;
            let arm = point - self.world_center_of_mass();
            self.angular_velocity += self.world_inverse_inertia() * arm.cross(&impulse);
            self.wake();
        }
    }

    /// Change angular momentum immediately
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if self.accepts_forces() && utils::is_finite(&impulse) {
            self.angular_velocity += self.world_inverse_inertia() * impulse;
            self.wake();
        }
    }

    /// Accumulated force for the next step
    pub const fn accumulated_force(&self) -> Vec3 {
        self.force
    }

    /// Accumulated torque for the next step
    pub const fn accumulated_torque(&self) -> Vec3 {
        self.torque
    }

    // ---- mass ------------------------------------------------------------

    /// Total mass
    pub const fn mass(&self) -> f32 {
        self.mass_data.mass
    }

    /// Mass properties in the body frame
    pub const fn mass_data(&self) -> MassData {
        self.mass_data
    }

    /// Center of mass in the body frame
    pub const fn local_center_of_mass(&self) -> Vec3 {
        self.mass_data.center_of_mass
    }

    /// Center of mass in world space
    pub fn world_center_of_mass(&self) -> Vec3 {
        self.pose.transform_point(&self.mass_data.center_of_mass)
    }

    /// Inverse mass used by the solver; zero for non-dynamic or massless bodies
    pub const fn inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Inverse inertia tensor in world axes, with locked rotation axes removed
    pub fn world_inverse_inertia(&self) -> Mat3 {
        let tensor = utils::rotate_tensor(&self.pose.rotation, &self.inv_inertia);
        if self.enabled_axes.contains(EnabledAxes::ROTATION) {
            return tensor;
        }
        let mask = Mat3::from_diagonal(&self.enabled_axes.rotation_mask());
        mask * tensor * mask
    }

    /// Replace the mass properties and disable automatic mass
    ///
    /// Invalid data (negative or non-finite) is ignored.
    pub fn set_mass_data(&mut self, mass_data: MassData) {
        if !mass_data.is_valid() {
            return;
        }
        self.automatic_mass = false;
        self.apply_mass_data(mass_data);
    }

    /// Rescale to a new total mass keeping the distribution
    ///
    /// A massless body gets the inertia of a unit sphere of that mass.
    pub fn set_mass(&mut self, mass: f32) {
        if !mass.is_finite() || mass < 0.0 {
            return;
        }
        let data = if self.mass_data.mass > 0.0 {
            self.mass_data.with_mass(mass)
        } else {
            MassData {
                center_of_mass: self.mass_data.center_of_mass,
                mass,
                inertia: Mat3::identity() * (0.4 * mass),
            }
        };
        self.set_mass_data(data);
    }

    /// Whether mass follows the attached shapes
    pub const fn automatic_mass(&self) -> bool {
        self.automatic_mass
    }

    pub(crate) fn apply_mass_data(&mut self, mass_data: MassData) {
        self.mass_data = mass_data;
        self.update_inverse_mass();
    }

    pub(crate) fn update_inverse_mass(&mut self) {
        if self.kind != BodyKind::Dynamic || self.mass_data.mass <= 0.0 {
            self.inv_mass = 0.0;
            self.inv_inertia = Mat3::zeros();
            return;
        }
        self.inv_mass = 1.0 / self.mass_data.mass;
        let inertia = self.mass_data.inertia;
        self.inv_inertia = inertia.try_inverse().unwrap_or_else(|| {
            // Singular tensors (flat or point-like bodies) invert per axis
            Mat3::from_diagonal(&inertia.diagonal().map(|d| if d > 0.0 { 1.0 / d } else { 0.0 }))
        });
    }

    // ---- material and response --------------------------------------------

    /// Friction coefficient
    pub const fn friction(&self) -> f32 {
        self.friction
    }

    /// Set the friction coefficient (clamped to be non-negative)
    pub fn set_friction(&mut self, friction: f32) {
        if friction.is_finite() {
            self.friction = friction.max(0.0);
        }
    }

    /// Restitution (bounciness)
    pub const fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Set restitution, clamped to `[0, 1]`
    pub fn set_restitution(&mut self, restitution: f32) {
        if restitution.is_finite() {
            self.restitution = restitution.clamp(0.0, 1.0);
        }
    }

    /// Linear damping
    pub const fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Angular damping
    pub const fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Set linear and angular damping (non-negative)
    pub fn set_damping(&mut self, linear: f32, angular: f32) {
        if linear.is_finite() && angular.is_finite() {
            self.linear_damping = linear.max(0.0);
            self.angular_damping = angular.max(0.0);
        }
    }

    /// Multiplier on world gravity
    pub const fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Set the gravity multiplier
    pub fn set_gravity_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.gravity_scale = scale;
            self.wake_if_dynamic();
        }
    }

    // ---- axes and continuous collision ---------------------------------------

    /// Axes the body may move along and about
    pub const fn enabled_axes(&self) -> EnabledAxes {
        self.enabled_axes
    }

    /// Lock or free axes; velocity along newly locked axes is dropped
    pub fn set_enabled_axes(&mut self, axes: EnabledAxes) {
        self.enabled_axes = axes;
        if self.kind == BodyKind::Dynamic {
            self.linear_velocity = self.free_translation(self.linear_velocity);
            self.angular_velocity = self.angular_velocity.component_mul(&axes.rotation_mask());
            self.wake();
        }
    }

    pub(crate) fn free_translation(&self, v: Vec3) -> Vec3 {
        if self.enabled_axes.contains(EnabledAxes::TRANSLATION) {
            v
        } else {
            v.component_mul(&self.enabled_axes.translation_mask())
        }
    }

    /// Whether fast motion is swept against other shapes each step
    pub const fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Enable swept collision so the body cannot tunnel through thin shapes
    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    // ---- classification ----------------------------------------------------

    /// Tag index, `None` when untagged
    pub const fn tag(&self) -> Option<usize> {
        self.tag
    }

    /// Body kind
    pub const fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Change the body kind; inverse mass is recomputed
    ///
    /// Public callers go through `World::set_body_kind`, which checks shape rules.
    pub(crate) fn set_kind(&mut self, kind: BodyKind) {
        if self.kind == kind {
            return;
        }
        self.kind = kind;
        if kind == BodyKind::Static {
            self.linear_velocity = Vec3::zeros();
            self.angular_velocity = Vec3::zeros();
        }
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
        self.update_inverse_mass();
        self.wake();
    }

    /// Whether the body is kinematic
    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// Whether this is a dynamic body
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Whether the body only reports overlaps
    pub const fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Make the body a sensor (overlap events, no contact response)
    pub fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    /// Whether the body takes part in simulation and queries
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the body without destroying it
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            if enabled {
                self.wake();
            }
        }
    }

    /// Opaque value for the embedding application
    pub const fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Store an opaque value
    pub fn set_user_data(&mut self, data: u64) {
        self.user_data = data;
    }

    // ---- sleep -------------------------------------------------------------

    /// Whether the body is awake
    pub const fn is_awake(&self) -> bool {
        self.awake
    }

    /// Wake the body and reset its sleep timer
    pub fn wake(&mut self) {
        self.awake = true;
        self.sleep_timer = 0.0;
    }

    fn wake_if_dynamic(&mut self) {
        if self.kind == BodyKind::Dynamic {
            self.wake();
        }
    }

    /// Force the sleep state; putting a body to sleep clears its motion
    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            self.wake();
        } else {
            self.sleep();
        }
    }

    pub(crate) fn sleep(&mut self) {
        self.awake = false;
        self.sleep_timer = 0.0;
        self.linear_velocity = Vec3::zeros();
        self.angular_velocity = Vec3::zeros();
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }

    /// Whether the body may fall asleep
    pub const fn is_sleeping_allowed(&self) -> bool {
        self.sleeping_allowed
    }

    /// Allow or forbid sleeping; forbidding wakes the body
    pub fn set_sleeping_allowed(&mut self, allowed: bool) {
        self.sleeping_allowed = allowed;
        if !allowed {
            self.wake();
        }
    }

    /// Whether the body moves this step: awake dynamic, or kinematic
    pub(crate) fn is_active(&self) -> bool {
        self.enabled
            && match self.kind {
                BodyKind::Dynamic => self.awake,
                BodyKind::Kinematic => true,
                BodyKind::Static => false,
            }
    }

    // ---- frames ------------------------------------------------------------

    /// Body-local point to world space
    pub fn local_to_world_point(&self, point: &Vec3) -> Vec3 {
        self.pose.transform_point(point)
    }

    /// World point to body-local space
    pub fn world_to_local_point(&self, point: &Vec3) -> Vec3 {
        self.pose.inverse_transform_point(point)
    }

    /// Body-local direction to world space
    pub fn local_to_world_vector(&self, vector: &Vec3) -> Vec3 {
        self.pose.transform_vector(vector)
    }

    /// World direction to body-local space
    pub fn world_to_local_vector(&self, vector: &Vec3) -> Vec3 {
        self.pose.inverse_transform_vector(vector)
    }

    /// Number of attached shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of joints attached to this body
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}
