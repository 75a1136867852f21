//! Joints
//!
//! A joint constrains the relative motion of two colliders. Anchors and axes
//! are given in world space at creation and stored in each body's frame, so
//! the joint follows the bodies afterwards. Limits, motors and springs are
//! solved, never reported as errors.

use crate::foundation::collections::ColliderKey;
use crate::foundation::math::{utils, Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Default motor position-servo frequency in Hz
pub const DEFAULT_MOTOR_FREQUENCY: f32 = 2.0;

/// Spring parameters of a soft constraint
///
/// A zero frequency means the constraint is rigid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spring {
    /// Oscillation frequency in Hz
    pub frequency: f32,
    /// Damping ratio; 1 is critically damped
    pub damping_ratio: f32,
}

impl Spring {
    /// No spring
    pub const RIGID: Self = Self::new(0.0, 0.0);

    /// Spring with the given frequency and damping ratio
    pub const fn new(frequency: f32, damping_ratio: f32) -> Self {
        Self {
            frequency,
            damping_ratio,
        }
    }

    /// Whether the constraint stays rigid
    pub fn is_rigid(&self) -> bool {
        self.frequency <= 0.0
    }

    // Non-finite input is rejected, negative input clamps to zero
    fn checked(frequency: f32, damping_ratio: f32) -> Option<Self> {
        (frequency.is_finite() && damping_ratio.is_finite())
            .then(|| Self::new(frequency.max(0.0), damping_ratio.max(0.0)))
    }
}

/// Joint variant discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Point-to-point
    Ball,
    /// Distance between two anchors
    Distance,
    /// Rotation about one axis
    Hinge,
    /// Translation along one axis
    Slider,
    /// Fully locked
    Weld,
    /// Ball with a swing limit
    Cone,
}

/// World-space description of a new joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointDesc {
    /// Both bodies share `anchor`
    Ball {
        /// World anchor
        anchor: Vec3,
    },
    /// Keeps the anchors at their current distance
    Distance {
        /// World anchor on the first body
        anchor_a: Vec3,
        /// World anchor on the second body
        anchor_b: Vec3,
    },
    /// Rotation about `axis` through `anchor`
    Hinge {
        /// World anchor
        anchor: Vec3,
        /// World hinge axis
        axis: Vec3,
    },
    /// Translation along `axis`, rotation locked
    Slider {
        /// World slide axis
        axis: Vec3,
    },
    /// Locks the current relative pose
    Weld {
        /// World anchor
        anchor: Vec3,
    },
    /// Ball joint whose twist axis may swing at most `max_angle` from `axis`
    Cone {
        /// World anchor
        anchor: Vec3,
        /// World cone axis
        axis: Vec3,
        /// Half-angle of the cone in radians
        max_angle: f32,
    },
}

/// What a motor drives towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetType {
    /// Motor off
    #[default]
    None,
    /// Target relative velocity (rad/s or m/s)
    Velocity,
    /// Target angle or position
    Position,
}

/// Joint motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motor {
    /// Target kind
    pub target_type: TargetType,
    /// Target value
    pub target: f32,
    /// Largest force (or torque) driving in the positive direction
    pub max_force_positive: f32,
    /// Largest force (or torque) driving in the negative direction
    pub max_force_negative: f32,
    /// Servo spring used for position targets; rigid reaches the target in one step
    pub spring: Spring,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            target_type: TargetType::None,
            target: 0.0,
            max_force_positive: f32::MAX,
            max_force_negative: f32::MAX,
            spring: Spring::new(DEFAULT_MOTOR_FREQUENCY, 1.0),
        }
    }
}

impl Motor {
    /// How far the coordinate is past a position target
    ///
    /// Angular coordinates wrap so the servo takes the short way round.
    pub(crate) fn position_error(&self, current: f32, angular: bool) -> Option<f32> {
        if self.target_type != TargetType::Position {
            return None;
        }
        Some(if angular {
            utils::wrap_angle(current - self.target)
        } else {
            current - self.target
        })
    }
}

/// Distance joint settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceJoint {
    /// Shortest allowed distance
    pub min_distance: f32,
    /// Longest allowed distance
    pub max_distance: f32,
    /// Spring pulling towards the creation length; rigid by default
    pub spring: Spring,
    pub(crate) rest_length: f32,
}

/// Hinge or slider settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisJoint {
    /// Lower and upper angle (hinge) or position (slider) limits
    pub limits: Option<(f32, f32)>,
    /// Friction torque (hinge) or force (slider) resisting motion
    pub friction: f32,
    /// Motor
    pub motor: Motor,
    /// Softens the limits; rigid by default
    pub limit_spring: Spring,
}

/// Variant payloads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// Point-to-point
    Ball,
    /// Distance between anchors
    Distance(DistanceJoint),
    /// Single rotational axis
    Hinge(AxisJoint),
    /// Single translational axis
    Slider(AxisJoint),
    /// Fully locked
    Weld,
    /// Swing limit half-angle in radians
    Cone {
        /// Largest angle between the bodies' cone axes
        max_angle: f32,
    },
}

/// A constraint between two colliders
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) a: ColliderKey,
    pub(crate) b: ColliderKey,
    pub(crate) kind: JointKind,
    pub(crate) local_anchor_a: Vec3,
    pub(crate) local_anchor_b: Vec3,
    pub(crate) local_axis_a: Vec3,
    pub(crate) local_axis_b: Vec3,
    // Orientation of B relative to A at creation
    pub(crate) rest_rotation: Quat,
    pub(crate) enabled: bool,
    pub(crate) collide_connected: bool,
    pub(crate) force: f32,
    pub(crate) torque: f32,
    pub(crate) motor_force: f32,
}

impl Joint {
    pub(crate) fn new(a: ColliderKey, b: ColliderKey, desc: &JointDesc, pose_a: &Pose, pose_b: &Pose) -> Self {
        let (anchor_a, anchor_b, axis, kind) = match *desc {
            JointDesc::Ball { anchor } => (anchor, anchor, Vec3::x(), JointKind::Ball),
            JointDesc::Distance { anchor_a, anchor_b } => {
                let length = (anchor_b - anchor_a).norm();
                (
                    anchor_a,
                    anchor_b,
                    Vec3::x(),
                    JointKind::Distance(DistanceJoint {
                        min_distance: length,
                        max_distance: length,
                        spring: Spring::RIGID,
                        rest_length: length,
                    }),
                )
            }
            JointDesc::Hinge { anchor, axis } => (anchor, anchor, axis, JointKind::Hinge(AxisJoint::default())),
            JointDesc::Slider { axis } => {
                let anchor = pose_b.position;
                (anchor, anchor, axis, JointKind::Slider(AxisJoint::default()))
            }
            JointDesc::Weld { anchor } => (anchor, anchor, Vec3::x(), JointKind::Weld),
            JointDesc::Cone { anchor, axis, max_angle } => (
                anchor,
                anchor,
                axis,
                JointKind::Cone {
                    max_angle: max_angle.abs(),
                },
            ),
        };
        let axis = utils::normalize_or(&axis, Vec3::x());
        Self {
            a,
            b,
            kind,
            local_anchor_a: pose_a.inverse_transform_point(&anchor_a),
            local_anchor_b: pose_b.inverse_transform_point(&anchor_b),
            local_axis_a: pose_a.inverse_transform_vector(&axis),
            local_axis_b: pose_b.inverse_transform_vector(&axis),
            rest_rotation: pose_a.rotation.inverse() * pose_b.rotation,
            enabled: true,
            collide_connected: false,
            force: 0.0,
            torque: 0.0,
            motor_force: 0.0,
        }
    }

    /// Variant discriminant
    pub const fn joint_type(&self) -> JointType {
        match self.kind {
            JointKind::Ball => JointType::Ball,
            JointKind::Distance(_) => JointType::Distance,
            JointKind::Hinge(_) => JointType::Hinge,
            JointKind::Slider(_) => JointType::Slider,
            JointKind::Weld => JointType::Weld,
            JointKind::Cone { .. } => JointType::Cone,
        }
    }

    /// Variant payload
    pub const fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Whether the solver includes this joint
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Include or exclude the joint from the solver
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.force = 0.0;
            self.torque = 0.0;
            self.motor_force = 0.0;
        }
    }

    /// Whether the connected bodies still collide with each other
    pub const fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// Let the connected bodies collide with each other
    pub fn set_collide_connected(&mut self, collide: bool) {
        self.collide_connected = collide;
    }

    /// Anchor on the first body, in its local frame
    pub const fn local_anchor_a(&self) -> Vec3 {
        self.local_anchor_a
    }

    /// Anchor on the second body, in its local frame
    pub const fn local_anchor_b(&self) -> Vec3 {
        self.local_anchor_b
    }

    /// Constraint force magnitude from the last step
    pub const fn force(&self) -> f32 {
        self.force
    }

    /// Constraint torque magnitude from the last step
    pub const fn torque(&self) -> f32 {
        self.torque
    }

    /// Signed force (slider) or torque (hinge) the motor applied last step
    ///
    /// `None` for joints without a motor; zero while the motor is off.
    pub fn motor_force(&self) -> Option<f32> {
        self.axis_settings().map(|_| self.motor_force)
    }

    fn axis_settings(&self) -> Option<&AxisJoint> {
        match &self.kind {
            JointKind::Hinge(s) | JointKind::Slider(s) => Some(s),
            _ => None,
        }
    }

    fn axis_settings_mut(&mut self) -> Option<&mut AxisJoint> {
        match &mut self.kind {
            JointKind::Hinge(s) | JointKind::Slider(s) => Some(s),
            _ => None,
        }
    }

    /// Hinge/slider limits, or distance min/max
    pub fn limits(&self) -> Option<(f32, f32)> {
        match &self.kind {
            JointKind::Distance(d) => Some((d.min_distance, d.max_distance)),
            JointKind::Hinge(s) | JointKind::Slider(s) => s.limits,
            _ => None,
        }
    }

    /// Set limits; bounds are reordered if given backwards
    ///
    /// Ignored on joints without limits.
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        if !lower.is_finite() || !upper.is_finite() {
            return;
        }
        let (lower, upper) = (lower.min(upper), lower.max(upper));
        match &mut self.kind {
            JointKind::Distance(d) => {
                d.min_distance = lower.max(0.0);
                d.max_distance = upper.max(0.0);
            }
            JointKind::Hinge(s) | JointKind::Slider(s) => s.limits = Some((lower, upper)),
            _ => {}
        }
    }

    /// Remove hinge/slider limits
    pub fn clear_limits(&mut self) {
        if let Some(s) = self.axis_settings_mut() {
            s.limits = None;
        }
    }

    /// Motor target of a hinge or slider
    pub fn motor_target(&self) -> Option<(TargetType, f32)> {
        self.axis_settings().map(|s| (s.motor.target_type, s.motor.target))
    }

    /// Set the motor target of a hinge or slider
    pub fn set_motor_target(&mut self, target_type: TargetType, target: f32) {
        if !target.is_finite() {
            return;
        }
        if let Some(s) = self.axis_settings_mut() {
            s.motor.target_type = target_type;
            s.motor.target = target;
        }
    }

    /// Largest positive and negative motor force of a hinge or slider
    pub fn max_motor_force(&self) -> Option<(f32, f32)> {
        self.axis_settings()
            .map(|s| (s.motor.max_force_positive, s.motor.max_force_negative))
    }

    /// Bound the motor force in each direction; negative values clamp to zero
    pub fn set_max_motor_force(&mut self, positive: f32, negative: f32) {
        if positive.is_nan() || negative.is_nan() {
            return;
        }
        if let Some(s) = self.axis_settings_mut() {
            s.motor.max_force_positive = positive.max(0.0);
            s.motor.max_force_negative = negative.max(0.0);
        }
    }

    /// Position servo spring of a hinge or slider motor
    pub fn motor_spring(&self) -> Option<Spring> {
        self.axis_settings().map(|s| s.motor.spring)
    }

    /// Set the position servo spring; zero frequency snaps to the target
    pub fn set_motor_spring(&mut self, frequency: f32, damping_ratio: f32) {
        if let (Some(spring), Some(s)) = (Spring::checked(frequency, damping_ratio), self.axis_settings_mut()) {
            s.motor.spring = spring;
        }
    }

    /// Friction of a hinge or slider
    pub fn friction(&self) -> Option<f32> {
        self.axis_settings().map(|s| s.friction)
    }

    /// Set hinge or slider friction
    pub fn set_friction(&mut self, friction: f32) {
        if friction.is_finite() {
            if let Some(s) = self.axis_settings_mut() {
                s.friction = friction.max(0.0);
            }
        }
    }

    /// Distance spring, or the hinge/slider limit spring
    pub fn spring(&self) -> Option<Spring> {
        match &self.kind {
            JointKind::Distance(d) => Some(d.spring),
            JointKind::Hinge(s) | JointKind::Slider(s) => Some(s.limit_spring),
            _ => None,
        }
    }

    /// Soften a distance joint or hinge/slider limits; zero frequency makes them rigid
    pub fn set_spring(&mut self, frequency: f32, damping_ratio: f32) {
        let Some(spring) = Spring::checked(frequency, damping_ratio) else {
            return;
        };
        match &mut self.kind {
            JointKind::Distance(d) => d.spring = spring,
            JointKind::Hinge(s) | JointKind::Slider(s) => s.limit_spring = spring,
            _ => {}
        }
    }

    /// Set the cone half-angle
    pub fn set_cone_angle(&mut self, max_angle: f32) {
        if let JointKind::Cone { max_angle: current } = &mut self.kind {
            if max_angle.is_finite() {
                *current = max_angle.abs();
            }
        }
    }

    // ---- geometry at given poses -------------------------------------------

    /// World anchors for the given body poses
    pub fn world_anchors(&self, pose_a: &Pose, pose_b: &Pose) -> (Vec3, Vec3) {
        (
            pose_a.transform_point(&self.local_anchor_a),
            pose_b.transform_point(&self.local_anchor_b),
        )
    }

    /// Joint axis in world space, carried by the first body
    pub fn world_axis(&self, pose_a: &Pose) -> Vec3 {
        pose_a.transform_vector(&self.local_axis_a)
    }

    /// Rotation of B relative to A beyond the rest orientation, in A's frame
    pub(crate) fn relative_rotation(&self, pose_a: &Pose, pose_b: &Pose) -> Quat {
        pose_a.rotation.inverse() * pose_b.rotation * self.rest_rotation.inverse()
    }

    /// Hinge angle about the axis, in `[-PI, PI]`
    pub fn angle(&self, pose_a: &Pose, pose_b: &Pose) -> f32 {
        let q = self.relative_rotation(pose_a, pose_b);
        let twist = q.imag().dot(&self.local_axis_a);
        utils::wrap_angle(2.0 * twist.atan2(q.scalar()))
    }

    /// Slider offset of B's anchor from A's along the axis
    pub fn position(&self, pose_a: &Pose, pose_b: &Pose) -> f32 {
        let (pa, pb) = self.world_anchors(pose_a, pose_b);
        (pb - pa).dot(&self.world_axis(pose_a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;
    use crate::foundation::math::constants::PI;
    use approx::assert_relative_eq;

    fn keys() -> (ColliderKey, ColliderKey) {
        let mut arena: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        (arena.insert(()), arena.insert(()))
    }

    fn hinge() -> (Joint, Pose, Pose) {
        let (a, b) = keys();
        let pose_a = Pose::identity();
        let pose_b = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let joint = Joint::new(
            a,
            b,
            &JointDesc::Hinge {
                anchor: Vec3::zeros(),
                axis: Vec3::y(),
            },
            &pose_a,
            &pose_b,
        );
        (joint, pose_a, pose_b)
    }

    #[test]
    fn test_hinge_angle_follows_rotation() {
        let (joint, pose_a, pose_b) = hinge();
        assert_relative_eq!(joint.angle(&pose_a, &pose_b), 0.0, epsilon = 1e-6);

        let turned = Pose::new(pose_b.position, Quat::from_axis_angle(&Vec3::y_axis(), 0.3));
        assert_relative_eq!(joint.angle(&pose_a, &turned), 0.3, epsilon = 1e-5);

        let back = Pose::new(pose_b.position, Quat::from_axis_angle(&Vec3::y_axis(), -PI * 0.75));
        assert_relative_eq!(joint.angle(&pose_a, &back), -PI * 0.75, epsilon = 1e-5);
    }

    #[test]
    fn test_anchor_stored_per_body() {
        let (joint, pose_a, pose_b) = hinge();
        assert_relative_eq!(joint.local_anchor_b(), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-6);
        let (wa, wb) = joint.world_anchors(&pose_a, &pose_b);
        assert_relative_eq!(wa, wb, epsilon = 1e-6);
    }

    #[test]
    fn test_limits_and_motor_settings() {
        let (mut joint, _, _) = hinge();
        joint.set_limits(0.5, -0.5);
        assert_eq!(joint.limits(), Some((-0.5, 0.5)));
        assert_eq!(joint.max_motor_force(), Some((f32::MAX, f32::MAX)));
        joint.set_motor_target(TargetType::Velocity, 2.0);
        joint.set_max_motor_force(10.0, -3.0);
        assert_eq!(joint.motor_target(), Some((TargetType::Velocity, 2.0)));
        assert_eq!(joint.max_motor_force(), Some((10.0, 0.0)));
    }

    #[test]
    fn test_ball_has_no_motor() {
        let (a, b) = keys();
        let mut joint = Joint::new(
            a,
            b,
            &JointDesc::Ball { anchor: Vec3::zeros() },
            &Pose::identity(),
            &Pose::identity(),
        );
        joint.set_motor_target(TargetType::Velocity, 1.0);
        assert_eq!(joint.motor_target(), None);
        assert_eq!(joint.limits(), None);
        assert_eq!(joint.joint_type(), JointType::Ball);
    }

    #[test]
    fn test_slider_position() {
        let (a, b) = keys();
        let pose_b = Pose::from_position(Vec3::new(0.0, 2.0, 0.0));
        let joint = Joint::new(a, b, &JointDesc::Slider { axis: Vec3::y() }, &Pose::identity(), &pose_b);
        assert_relative_eq!(joint.position(&Pose::identity(), &pose_b), 0.0, epsilon = 1e-6);
        let moved = Pose::from_position(Vec3::new(0.0, 2.5, 0.0));
        assert_relative_eq!(joint.position(&Pose::identity(), &moved), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_position_motor_wraps() {
        let motor = Motor {
            target_type: TargetType::Position,
            target: PI - 0.1,
            ..Motor::default()
        };
        let error = motor.position_error(-PI + 0.1, true).expect("active");
        // Short way round: the coordinate is 0.2 past the target
        assert_relative_eq!(error, 0.2, epsilon = 1e-5);
        assert_eq!(Motor::default().position_error(1.0, true), None);
    }

    #[test]
    fn test_springs_per_joint_type() {
        let (mut joint, _, _) = hinge();
        assert_eq!(joint.spring(), Some(Spring::RIGID));
        assert_eq!(joint.motor_spring(), Some(Spring::new(DEFAULT_MOTOR_FREQUENCY, 1.0)));
        assert_eq!(joint.motor_force(), Some(0.0));

        joint.set_spring(4.0, -1.0);
        assert_eq!(joint.spring(), Some(Spring::new(4.0, 0.0)));
        joint.set_motor_spring(0.0, 0.5);
        assert!(joint.motor_spring().expect("hinge").is_rigid());
        joint.set_motor_spring(f32::NAN, 0.5);
        assert_eq!(joint.motor_spring(), Some(Spring::new(0.0, 0.5)));

        let (a, b) = keys();
        let mut weld = Joint::new(a, b, &JointDesc::Weld { anchor: Vec3::zeros() }, &Pose::identity(), &Pose::identity());
        weld.set_spring(1.0, 1.0);
        assert_eq!(weld.spring(), None);
        assert_eq!(weld.motor_force(), None);
    }
}
