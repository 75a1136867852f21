//! Sequential-impulse constraint solver
//!
//! Contacts and joints are lowered to one-dimensional rows
//! `J * v = target` with accumulated impulses clamped to `[lo, hi]`. Velocity
//! passes solve the rows against real velocities; position passes solve the
//! rows that carry a position error against separate pseudo velocities,
//! which the integrator adds for one step only, so error correction never
//! feeds energy back into the motion.
//!
//! Two world settings shape every row: tightness scales the position
//! correction, and response time adds compliance (a constraint force mixing
//! term) that lets rows give a little under load.

use crate::foundation::collections::JointKey;
use crate::foundation::math::{utils, Mat3, Pose, Vec3};
use crate::physics::collider::Collider;
use crate::physics::contact::Contact;
use crate::physics::joint::{AxisJoint, DistanceJoint, Joint, JointKind, Spring, TargetType};
use std::f32::consts::TAU;
use std::ops::Range;

/// Default fraction of the position error removed per step
pub const BAUMGARTE: f32 = 0.2;
/// Penetration tolerated without correction
pub const LINEAR_SLOP: f32 = 0.005;
/// Largest position correction per step
pub const MAX_CORRECTION: f32 = 0.2;
/// Approach speed below which contacts do not bounce
pub const RESTITUTION_THRESHOLD: f32 = 1.0;

/// Body state seen by the solver
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolverBody {
    pub pose: Pose,
    pub com: Vec3,
    pub v: Vec3,
    pub w: Vec3,
    pub pseudo_v: Vec3,
    pub pseudo_w: Vec3,
    pub inv_mass: f32,
    // 1 per free world axis, 0 per locked one
    pub linear_mask: Vec3,
    pub inv_inertia: Mat3,
}

impl SolverBody {
    /// Snapshot a collider; only awake dynamic bodies respond to impulses
    pub fn from_collider(collider: &Collider) -> Self {
        let responds = collider.is_dynamic() && collider.is_awake() && collider.is_enabled();
        let moves = collider.is_active();
        let axes = collider.enabled_axes();
        let (linear_mask, angular_mask) = if collider.is_dynamic() {
            (axes.translation_mask(), axes.rotation_mask())
        } else {
            (Vec3::repeat(1.0), Vec3::repeat(1.0))
        };
        Self {
            pose: collider.pose(),
            com: collider.world_center_of_mass(),
            v: if moves { collider.linear_velocity().component_mul(&linear_mask) } else { Vec3::zeros() },
            w: if moves { collider.angular_velocity().component_mul(&angular_mask) } else { Vec3::zeros() },
            pseudo_v: Vec3::zeros(),
            pseudo_w: Vec3::zeros(),
            inv_mass: if responds { collider.inverse_mass() } else { 0.0 },
            linear_mask,
            inv_inertia: if responds { collider.world_inverse_inertia() } else { Mat3::zeros() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feedback {
    Force,
    Torque,
}

#[derive(Debug, Clone, Copy)]
struct PositionTerm {
    error: f32,
    lo: f32,
    hi: f32,
}

#[derive(Debug, Clone, Copy)]
struct Row {
    a: usize,
    b: usize,
    lin_a: Vec3,
    ang_a: Vec3,
    lin_b: Vec3,
    ang_b: Vec3,
    target: f32,
    softness: f32,
    lo: f32,
    hi: f32,
    // (normal row, coefficient): bounds follow the normal impulse
    friction_of: Option<(usize, f32)>,
    position: Option<PositionTerm>,
    eff_mass: f32,
    impulse: f32,
    pseudo_impulse: f32,
    feedback: Feedback,
}

impl Row {
    // J * v = dir . (v_b + w_b x r_b - v_a - w_a x r_a)
    fn linear(a: usize, b: usize, dir: Vec3, ra: Vec3, rb: Vec3) -> Self {
        Self::with_jacobian(a, b, (-dir, -ra.cross(&dir), dir, rb.cross(&dir)), Feedback::Force)
    }

    // J * v = axis . (w_b - w_a)
    fn angular(a: usize, b: usize, axis: Vec3) -> Self {
        Self::with_jacobian(a, b, (Vec3::zeros(), -axis, Vec3::zeros(), axis), Feedback::Torque)
    }

    fn with_jacobian(a: usize, b: usize, jacobian: (Vec3, Vec3, Vec3, Vec3), feedback: Feedback) -> Self {
        Self {
            a,
            b,
            lin_a: jacobian.0,
            ang_a: jacobian.1,
            lin_b: jacobian.2,
            ang_b: jacobian.3,
            target: 0.0,
            softness: 0.0,
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
            friction_of: None,
            position: None,
            eff_mass: 0.0,
            impulse: 0.0,
            pseudo_impulse: 0.0,
            feedback,
        }
    }

    fn negated(mut self) -> Self {
        self.lin_a = -self.lin_a;
        self.ang_a = -self.ang_a;
        self.lin_b = -self.lin_b;
        self.ang_b = -self.ang_b;
        self
    }

    /// Hold the coordinate at its current value
    fn equality(mut self, error: f32) -> Self {
        self.position = Some(PositionTerm {
            error,
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
        });
        self
    }

    /// Keep `gap >= 0`, approaching at most as fast as closes it this step
    fn inequality(mut self, gap: f32, inv_dt: f32) -> Self {
        self.lo = 0.0;
        self.hi = f32::INFINITY;
        self.target = if gap > 0.0 { -gap * inv_dt } else { 0.0 };
        self.position = Some(PositionTerm {
            error: gap.min(0.0),
            lo: 0.0,
            hi: f32::INFINITY,
        });
        self
    }

    fn velocity(&self, bodies: &[SolverBody]) -> f32 {
        let (a, b) = (&bodies[self.a], &bodies[self.b]);
        self.lin_a.dot(&a.v) + self.ang_a.dot(&a.w) + self.lin_b.dot(&b.v) + self.ang_b.dot(&b.w)
    }

    fn pseudo_velocity(&self, bodies: &[SolverBody]) -> f32 {
        let (a, b) = (&bodies[self.a], &bodies[self.b]);
        self.lin_a.dot(&a.pseudo_v) + self.ang_a.dot(&a.pseudo_w) + self.lin_b.dot(&b.pseudo_v) + self.ang_b.dot(&b.pseudo_w)
    }

    fn inverse_effective_mass(&self, bodies: &[SolverBody]) -> f32 {
        let (a, b) = (&bodies[self.a], &bodies[self.b]);
        a.inv_mass * self.lin_a.component_mul(&a.linear_mask).dot(&self.lin_a)
            + self.ang_a.dot(&(a.inv_inertia * self.ang_a))
            + b.inv_mass * self.lin_b.component_mul(&b.linear_mask).dot(&self.lin_b)
            + self.ang_b.dot(&(b.inv_inertia * self.ang_b))
    }

    fn apply(&self, bodies: &mut [SolverBody], lambda: f32, pseudo: bool) {
        for (index, lin, ang) in [(self.a, self.lin_a, self.ang_a), (self.b, self.lin_b, self.ang_b)] {
            let body = &mut bodies[index];
            let dv = lin.component_mul(&body.linear_mask) * (body.inv_mass * lambda);
            let dw = body.inv_inertia * (ang * lambda);
            if pseudo {
                body.pseudo_v += dv;
                body.pseudo_w += dw;
            } else {
                body.v += dv;
                body.w += dw;
            }
        }
    }
}

/// Which coordinate an axis joint's limits, motor and friction act on
#[derive(Debug, Clone, Copy)]
enum AxisCoordinate {
    Angle { axis: Vec3 },
    Offset { axis: Vec3, ra: Vec3, rb: Vec3 },
}

/// Rows one joint produced, and which of them is its motor
#[derive(Debug)]
struct JointRows {
    key: JointKey,
    rows: Range<usize>,
    motor: Option<usize>,
}

/// Constraint output of one joint after the velocity passes
#[derive(Debug, Clone, Copy)]
pub(crate) struct JointFeedback {
    pub key: JointKey,
    pub force: f32,
    pub torque: f32,
    pub motor_force: f32,
}

/// One step's worth of constraint rows
#[derive(Debug)]
pub(crate) struct Solver {
    pub bodies: Vec<SolverBody>,
    rows: Vec<Row>,
    joints: Vec<JointRows>,
    dt: f32,
    inv_dt: f32,
    tightness: f32,
    // Compliance added to every row
    cfm: f32,
}

impl Solver {
    /// `tightness` scales position correction; `response_time` softens every row
    pub fn new(dt: f32, tightness: f32, response_time: f32) -> Self {
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        Self {
            bodies: Vec::new(),
            rows: Vec::new(),
            joints: Vec::new(),
            dt,
            inv_dt,
            tightness,
            cfm: response_time * inv_dt,
        }
    }

    pub fn add_body(&mut self, body: SolverBody) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn push(&mut self, mut row: Row) -> usize {
        row.softness += self.cfm;
        let k = row.inverse_effective_mass(&self.bodies) + row.softness;
        row.eff_mass = if k > f32::EPSILON { 1.0 / k } else { 0.0 };
        self.rows.push(row);
        self.rows.len() - 1
    }

    // ---- contacts ----------------------------------------------------------

    /// Normal and friction rows for every point of an enabled, solid contact
    pub fn add_contact(&mut self, a: usize, b: usize, contact: &Contact) {
        let normal = contact.normal();
        let (t1, t2) = utils::orthonormal_basis(&normal);
        for point in contact.points() {
            let ra = point.position - self.bodies[a].com;
            let rb = point.position - self.bodies[b].com;
            let separation = point.separation;

            let mut row = Row::linear(a, b, normal, ra, rb).inequality(separation + LINEAR_SLOP, self.inv_dt);
            let approach = row.velocity(&self.bodies);
            let bounce = if approach < -RESTITUTION_THRESHOLD {
                -contact.restitution() * approach
            } else {
                0.0
            };
            row.target = if separation > 0.0 {
                let speculative = -separation * self.inv_dt;
                if bounce > 0.0 && approach * self.dt < -separation {
                    bounce.max(speculative)
                } else {
                    speculative
                }
            } else {
                bounce
            };
            let normal_row = self.push(row);

            for tangent in [t1, t2] {
                let mut friction = Row::linear(a, b, tangent, ra, rb);
                friction.target = contact.surface_velocity().dot(&tangent);
                friction.friction_of = Some((normal_row, contact.friction()));
                self.push(friction);
            }
        }
    }

    // ---- joints ------------------------------------------------------------

    /// Softness and error-to-velocity gain that make `row` act as `spring`
    ///
    /// `None` when the spring is rigid or the row moves nothing.
    fn spring_terms(&self, row: &Row, spring: Spring) -> Option<(f32, f32)> {
        if spring.is_rigid() || self.dt <= 0.0 {
            return None;
        }
        let k = row.inverse_effective_mass(&self.bodies);
        if k <= f32::EPSILON {
            return None;
        }
        let mass = 1.0 / k;
        let omega = TAU * spring.frequency;
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * spring.damping_ratio * omega;
        let gamma = 1.0 / (self.dt * (damping + self.dt * stiffness));
        Some((gamma, self.dt * stiffness * gamma))
    }

    /// Rows for one enabled joint between bodies `a` and `b`
    pub fn add_joint(&mut self, key: JointKey, a: usize, b: usize, joint: &Joint) {
        let start = self.rows.len();
        let mut motor = None;
        let pose_a = self.bodies[a].pose;
        let pose_b = self.bodies[b].pose;
        let (pa, pb) = joint.world_anchors(&pose_a, &pose_b);
        let ra = pa - self.bodies[a].com;
        let rb = pb - self.bodies[b].com;

        match joint.kind {
            JointKind::Ball => self.point_rows(a, b, ra, rb, pb - pa),
            JointKind::Weld => {
                self.point_rows(a, b, ra, rb, pb - pa);
                self.lock_rotation(a, b, joint, &pose_a, &pose_b);
            }
            JointKind::Hinge(settings) => {
                self.point_rows(a, b, ra, rb, pb - pa);
                let axis = joint.world_axis(&pose_a);
                let axis_b = pose_b.transform_vector(&joint.local_axis_b);
                let drift = axis.cross(&axis_b);
                let (t1, t2) = utils::orthonormal_basis(&axis);
                for t in [t1, t2] {
                    self.push(Row::angular(a, b, t).equality(drift.dot(&t)));
                }
                let angle = joint.angle(&pose_a, &pose_b);
                motor = self.axis_rows(a, b, AxisCoordinate::Angle { axis }, angle, &settings);
            }
            JointKind::Slider(settings) => {
                self.lock_rotation(a, b, joint, &pose_a, &pose_b);
                let axis = joint.world_axis(&pose_a);
                let offset = pb - pa;
                // Measure on A at B's anchor so the rows see the full lever arm
                let ra = pb - self.bodies[a].com;
                let (t1, t2) = utils::orthonormal_basis(&axis);
                for t in [t1, t2] {
                    self.push(Row::linear(a, b, t, ra, rb).equality(offset.dot(&t)));
                }
                let position = offset.dot(&axis);
                motor = self.axis_rows(a, b, AxisCoordinate::Offset { axis, ra, rb }, position, &settings);
            }
            JointKind::Distance(settings) => self.distance_rows(a, b, ra, rb, pb - pa, &settings),
            JointKind::Cone { max_angle } => {
                self.point_rows(a, b, ra, rb, pb - pa);
                let axis_a = joint.world_axis(&pose_a);
                let axis_b = pose_b.transform_vector(&joint.local_axis_b);
                let cross = axis_a.cross(&axis_b);
                let sin = cross.norm();
                if sin > 1.0e-6 {
                    let swing = sin.atan2(axis_a.dot(&axis_b));
                    // Swing grows with rotation about a x b; the gap is max - swing
                    let row = Row::angular(a, b, cross / sin).negated();
                    self.push(row.inequality(max_angle - swing, self.inv_dt));
                }
            }
        }
        self.joints.push(JointRows {
            key,
            rows: start..self.rows.len(),
            motor,
        });
    }

    fn point_rows(&mut self, a: usize, b: usize, ra: Vec3, rb: Vec3, error: Vec3) {
        for (k, axis) in [Vec3::x(), Vec3::y(), Vec3::z()].into_iter().enumerate() {
            self.push(Row::linear(a, b, axis, ra, rb).equality(error[k]));
        }
    }

    fn lock_rotation(&mut self, a: usize, b: usize, joint: &Joint, pose_a: &Pose, pose_b: &Pose) {
        let target = pose_a.rotation * joint.rest_rotation;
        let error = (pose_b.rotation * target.inverse()).scaled_axis();
        for (k, axis) in [Vec3::x(), Vec3::y(), Vec3::z()].into_iter().enumerate() {
            self.push(Row::angular(a, b, axis).equality(error[k]));
        }
    }

    /// Motor or friction row, then limit rows; returns the motor row
    fn axis_rows(
        &mut self,
        a: usize,
        b: usize,
        coordinate: AxisCoordinate,
        value: f32,
        settings: &AxisJoint,
    ) -> Option<usize> {
        let (base, angular) = match coordinate {
            AxisCoordinate::Angle { axis } => (Row::angular(a, b, axis), true),
            AxisCoordinate::Offset { axis, ra, rb } => (Row::linear(a, b, axis, ra, rb), false),
        };

        let motor = &settings.motor;
        let motor_row = if motor.target_type == TargetType::None {
            if settings.friction > 0.0 {
                let mut friction = base;
                friction.lo = -settings.friction * self.dt;
                friction.hi = settings.friction * self.dt;
                self.push(friction);
            }
            None
        } else {
            let mut row = base;
            match motor.position_error(value, angular) {
                Some(error) => match self.spring_terms(&row, motor.spring) {
                    Some((gamma, gain)) => {
                        row.softness = gamma;
                        row.target = -error * gain;
                    }
                    None => row.target = -error * self.inv_dt,
                },
                None => row.target = motor.target,
            }
            row.lo = -motor.max_force_negative * self.dt;
            row.hi = motor.max_force_positive * self.dt;
            Some(self.push(row))
        };

        // Limits go last so they win over the motor
        if let Some((lower, upper)) = settings.limits {
            for (row, gap) in [(base, value - lower), (base.negated(), upper - value)] {
                match self.spring_terms(&row, settings.limit_spring) {
                    // A soft limit only pushes back once crossed
                    Some(_) if gap > 0.0 => {}
                    Some((gamma, gain)) => {
                        let mut soft = row;
                        soft.lo = 0.0;
                        soft.softness = gamma;
                        soft.target = -gap * gain;
                        self.push(soft);
                    }
                    None => {
                        self.push(row.inequality(gap, self.inv_dt));
                    }
                }
            }
        }
        motor_row
    }

    fn distance_rows(&mut self, a: usize, b: usize, ra: Vec3, rb: Vec3, delta: Vec3, settings: &DistanceJoint) {
        let length = delta.norm();
        let dir = utils::normalize_or(&delta, Vec3::y());
        let base = Row::linear(a, b, dir, ra, rb);

        if !settings.spring.is_rigid() {
            if let Some((gamma, gain)) = self.spring_terms(&base, settings.spring) {
                let rest = settings.rest_length.clamp(settings.min_distance, settings.max_distance);
                let mut spring = base;
                spring.softness = gamma;
                spring.target = -(length - rest) * gain;
                self.push(spring);
            }
            if settings.max_distance - settings.min_distance <= LINEAR_SLOP {
                return;
            }
        } else if (settings.max_distance - settings.min_distance).abs() <= LINEAR_SLOP {
            self.push(base.equality(length - settings.min_distance));
            return;
        }

        self.push(base.inequality(length - settings.min_distance, self.inv_dt));
        self.push(base.negated().inequality(settings.max_distance - length, self.inv_dt));
    }

    // ---- solving -----------------------------------------------------------

    /// Run the velocity passes, then the position passes
    pub fn solve(&mut self, velocity_iterations: u32, position_iterations: u32) {
        for _ in 0..velocity_iterations {
            for i in 0..self.rows.len() {
                self.solve_velocity_row(i);
            }
        }
        for _ in 0..position_iterations {
            for i in 0..self.rows.len() {
                self.solve_position_row(i);
            }
        }
    }

    fn solve_velocity_row(&mut self, i: usize) {
        let (lo, hi) = match self.rows[i].friction_of {
            Some((normal, coefficient)) => {
                let limit = coefficient * self.rows[normal].impulse;
                (-limit, limit)
            }
            None => (self.rows[i].lo, self.rows[i].hi),
        };
        let row = &mut self.rows[i];
        let jv = row.velocity(&self.bodies);
        let old = row.impulse;
        row.impulse = (old - row.eff_mass * (jv - row.target + row.softness * old)).clamp(lo, hi);
        let lambda = row.impulse - old;
        row.apply(&mut self.bodies, lambda, false);
    }

    fn solve_position_row(&mut self, i: usize) {
        let row = &mut self.rows[i];
        let Some(term) = row.position else {
            return;
        };
        let limit = MAX_CORRECTION * self.inv_dt;
        let target = (-self.tightness * term.error * self.inv_dt).clamp(-limit, limit);
        let jv = row.pseudo_velocity(&self.bodies);
        let old = row.pseudo_impulse;
        row.pseudo_impulse = (old - row.eff_mass * (jv - target)).clamp(term.lo, term.hi);
        let lambda = row.pseudo_impulse - old;
        row.apply(&mut self.bodies, lambda, true);
    }

    /// Constraint force and torque magnitudes per joint from the velocity passes
    pub fn joint_feedback(&self) -> impl Iterator<Item = JointFeedback> + '_ {
        self.joints.iter().map(|joint| {
            let mut force = Vec3::zeros();
            let mut torque = Vec3::zeros();
            for row in &self.rows[joint.rows.clone()] {
                match row.feedback {
                    Feedback::Force => force += row.lin_b * row.impulse,
                    Feedback::Torque => torque += row.ang_b * row.impulse,
                }
            }
            JointFeedback {
                key: joint.key,
                force: force.norm() * self.inv_dt,
                torque: torque.norm() * self.inv_dt,
                motor_force: joint.motor.map_or(0.0, |i| self.rows[i].impulse * self.inv_dt),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::{ColliderHandle, ColliderKey, ShapeHandle, ShapeKey, SlotMap, WorldId};
    use crate::physics::collision::{ContactPoint, Manifold};
    use approx::assert_relative_eq;

    fn body(position: Vec3, velocity: Vec3, inv_mass: f32) -> SolverBody {
        SolverBody {
            pose: Pose::from_position(position),
            com: position,
            v: velocity,
            w: Vec3::zeros(),
            pseudo_v: Vec3::zeros(),
            pseudo_w: Vec3::zeros(),
            inv_mass,
            linear_mask: Vec3::repeat(1.0),
            inv_inertia: Mat3::identity() * inv_mass * 2.5,
        }
    }

    fn contact(point: Vec3, separation: f32, friction: f32, restitution: f32) -> Contact {
        let world = WorldId::next();
        let mut colliders: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let mut shapes: SlotMap<ShapeKey, ()> = SlotMap::with_key();
        let mut manifold = Manifold::new(Vec3::y());
        manifold.push(ContactPoint {
            position: point,
            separation,
        });
        Contact::new(
            (
                ColliderHandle::new(world, colliders.insert(())),
                ColliderHandle::new(world, colliders.insert(())),
            ),
            (
                ShapeHandle::new(world, shapes.insert(())),
                ShapeHandle::new(world, shapes.insert(())),
            ),
            manifold,
            ((friction, restitution), (friction, restitution)),
            false,
        )
    }

    #[test]
    fn test_resting_contact_stops_approach() {
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -0.5, 0.0), 1.0));
        solver.add_contact(ground, ball, &contact(Vec3::zeros(), -0.001, 0.5, 0.0));
        solver.solve(10, 2);
        assert_relative_eq!(solver.bodies[ball].v.y, 0.0, epsilon = 1e-4);
        assert_eq!(solver.bodies[ground].v, Vec3::zeros());
    }

    #[test]
    fn test_speculative_contact_allows_closing_the_gap() {
        let dt = 1.0 / 60.0;
        let mut solver = Solver::new(dt, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -6.0, 0.0), 1.0));
        solver.add_contact(ground, ball, &contact(Vec3::zeros(), 0.05, 0.0, 0.0));
        solver.solve(10, 2);
        // Arrives exactly at the surface this step
        assert_relative_eq!(solver.bodies[ball].v.y, -0.05 / dt, epsilon = 1e-3);
    }

    #[test]
    fn test_restitution_bounces() {
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -4.0, 0.0), 1.0));
        solver.add_contact(ground, ball, &contact(Vec3::zeros(), -0.001, 0.0, 0.5));
        solver.solve(10, 0);
        assert_relative_eq!(solver.bodies[ball].v.y, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_friction_is_bounded() {
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let mut sliding = body(Vec3::zeros(), Vec3::new(5.0, -1.0, 0.0), 1.0);
        // Contact at the center of mass so friction cannot spin the body
        sliding.inv_inertia = Mat3::zeros();
        let ball = solver.add_body(sliding);
        solver.add_contact(ground, ball, &contact(Vec3::zeros(), -0.001, 0.5, 0.0));
        solver.solve(20, 0);
        let v = solver.bodies[ball].v;
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-3);
        // Normal impulse 1 limits the friction impulse to 0.5
        assert_relative_eq!(v.x, 4.5, epsilon = 1e-3);
    }

    #[test]
    fn test_response_time_softens_rows() {
        // cfm = 0.05 * 60 = 3 against an inverse effective mass of 1
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.05);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -0.5, 0.0), 1.0));
        solver.add_contact(ground, ball, &contact(Vec3::zeros(), -0.001, 0.0, 0.0));
        solver.solve(10, 0);
        // Impulse settles at 0.5 / (1 + 3)
        assert_relative_eq!(solver.bodies[ball].v.y, -0.375, epsilon = 1e-4);
    }

    #[test]
    fn test_tightness_scales_position_correction() {
        let correction = |tightness: f32| {
            let mut solver = Solver::new(1.0 / 60.0, tightness, 0.0);
            let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
            let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::zeros(), 1.0));
            solver.add_contact(ground, ball, &contact(Vec3::new(0.0, 1.0, 0.0), -0.1, 0.0, 0.0));
            solver.solve(1, 4);
            solver.bodies[ball].pseudo_v.y
        };
        // Error beyond the slop is 0.095
        assert_relative_eq!(correction(0.2), 0.2 * 0.095 * 60.0, epsilon = 1e-3);
        assert_relative_eq!(correction(0.4), 2.0 * correction(0.2), epsilon = 1e-3);
        assert_eq!(correction(0.0), 0.0);
    }

    #[test]
    fn test_locked_translation_ignores_impulses() {
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let mut pinned = body(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -2.0, 0.0), 1.0);
        pinned.linear_mask = Vec3::new(1.0, 0.0, 1.0);
        pinned.inv_inertia = Mat3::zeros();
        let ball = solver.add_body(pinned);
        solver.add_contact(ground, ball, &contact(Vec3::new(0.0, 1.0, 0.0), -0.001, 0.0, 0.0));
        solver.solve(10, 2);
        // No response along the locked axis, so the row cannot push
        assert_eq!(solver.bodies[ball].v.y, -2.0);
        assert_eq!(solver.bodies[ball].pseudo_v, Vec3::zeros());
    }

    #[test]
    fn test_penetration_uses_pseudo_velocity() {
        let mut solver = Solver::new(1.0 / 60.0, BAUMGARTE, 0.0);
        let ground = solver.add_body(body(Vec3::zeros(), Vec3::zeros(), 0.0));
        let ball = solver.add_body(body(Vec3::new(0.0, 1.0, 0.0), Vec3::zeros(), 1.0));
        solver.add_contact(ground, ball, &contact(Vec3::new(0.0, 1.0, 0.0), -0.1, 0.5, 0.0));
        solver.solve(10, 4);
        assert_relative_eq!(solver.bodies[ball].v.y, 0.0, epsilon = 1e-5);
        assert!(solver.bodies[ball].pseudo_v.y > 0.0);
    }
}
