//! Fixed-step simulation pipeline
//!
//! One `update` runs, in order: force integration, broad phase, pair
//! filtering, narrow phase, enter/exit events, contact callbacks, the
//! constraint solver, pose integration and the sleep update. The broad phase
//! is refit to the final poses so queries between steps see current bounds.
//!
//! Continuous bodies are swept against the shapes they were paired with after
//! integration and pulled back to their first hit, so a fast body cannot
//! pass through a thin one in a single step.

use crate::error::PhysicsResult;
use crate::foundation::collections::{ColliderKey, SecondaryMap, ShapeKey, SlotMap};
use crate::foundation::logging::{debug, trace, warn};
use crate::foundation::math::{utils, Pose, Vec3};
use crate::physics::backend::Proxy;
use crate::physics::callbacks::WorldCallbacks;
use crate::physics::collider::{BodyKind, Collider, EnabledAxes};
use crate::physics::collision::sweep;
use crate::physics::contact::{CollisionPair, Contact};
use crate::physics::solver::{Solver, SolverBody, LINEAR_SLOP};
use crate::physics::world::World;
use std::collections::{HashMap, HashSet};

/// Distance ahead of touching at which contacts are generated
pub const SPECULATIVE_MARGIN: f32 = 0.02;

/// Continuous bodies are swept once a step moves them this fraction of their smallest extent
pub const CONTINUOUS_THRESHOLD: f32 = 0.5;

/// A shape of a continuous body and a shape it may hit this step
#[derive(Debug, Clone, Copy)]
struct SweepTarget {
    collider: ColliderKey,
    shape: ShapeKey,
    other: ShapeKey,
}

/// Whether a body can wake the bodies it touches
fn is_disturbing(collider: &Collider) -> bool {
    collider.enabled
        && match collider.kind {
            BodyKind::Dynamic => collider.awake,
            BodyKind::Kinematic => {
                collider.linear_velocity != Vec3::zeros() || collider.angular_velocity != Vec3::zeros()
            }
            BodyKind::Static => false,
        }
}

fn solver_index(
    index: &mut SecondaryMap<ColliderKey, usize>,
    solver: &mut Solver,
    colliders: &SlotMap<ColliderKey, Collider>,
    key: ColliderKey,
) -> Option<usize> {
    if let Some(&i) = index.get(key) {
        return Some(i);
    }
    let collider = colliders.get(key)?;
    let i = solver.add_body(SolverBody::from_collider(collider));
    index.insert(key, i);
    Some(i)
}

impl World {
    /// Advance the simulation by exactly `dt` seconds in one step
    ///
    /// A non-finite or non-positive `dt` still runs collision detection and
    /// callbacks but moves nothing.
    pub fn update(&mut self, dt: f32) -> PhysicsResult<()> {
        let integrate = dt.is_finite() && dt > 0.0;
        if !integrate {
            debug!("{}: dt {} skips integration", self.id, dt);
        }
        let dt = if integrate { dt } else { 0.0 };

        if integrate {
            self.integrate_forces(dt);
        }

        let proxies = self.collect_proxies(dt)?;
        self.backend.rebuild(&proxies)?;
        let mut pairs = Vec::new();
        self.backend.candidate_pairs(&mut pairs);
        if self.config.deterministic {
            let proxies = self.backend.proxies();
            pairs.sort_unstable_by_key(|&(i, j)| (proxies[i].shape, proxies[j].shape));
        }

        // Callbacks see the world read-only with last step's contacts detached
        let mut callbacks = std::mem::take(&mut self.callbacks);
        self.contacts.clear();
        let (mut contacts, mut sweep_targets) = self.narrow_phase(&pairs, dt, &mut callbacks);
        self.dispatch_enter_exit(&contacts, &mut callbacks);
        if let Some(on_contact) = callbacks.contact.as_mut() {
            for contact in contacts.iter_mut().filter(|c| !c.sensor) {
                on_contact(self, contact.collider_a, contact.collider_b, contact);
            }
        }
        self.callbacks = callbacks;

        // Contacts switched off by the callback are not swept either
        let disabled: HashSet<(ShapeKey, ShapeKey)> = contacts
            .iter()
            .filter(|c| !c.enabled)
            .flat_map(|c| [(c.shape_a.key(), c.shape_b.key()), (c.shape_b.key(), c.shape_a.key())])
            .collect();
        sweep_targets.retain(|t| !disabled.contains(&(t.shape, t.other)));

        self.wake_touching(&contacts);
        if integrate {
            self.solve_and_integrate(&contacts, &sweep_targets, dt);
        }
        self.contacts = contacts;
        if integrate {
            self.update_sleep(dt);
        }

        self.refit_broad_phase()?;
        self.step_count += 1;
        trace!(
            "{}: step {} - {} candidate pairs, {} contacts",
            self.id,
            self.step_count,
            pairs.len(),
            self.contacts.len()
        );
        Ok(())
    }

    /// Run as many fixed steps of `1 / tick_rate` as fit in the elapsed time
    ///
    /// At most `max_substeps` steps run per call; leftover backlog beyond
    /// that is dropped. Returns the number of steps taken.
    pub fn advance(&mut self, elapsed: f32) -> PhysicsResult<u32> {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }
        let dt = self.config.fixed_dt();
        let mut steps = 0;
        while self.accumulator >= dt && steps < self.config.max_substeps {
            self.update(dt)?;
            self.accumulator -= dt;
            steps += 1;
        }
        if self.accumulator >= dt {
            debug!("{}: dropping {:.3}s of simulation backlog", self.id, self.accumulator);
            self.accumulator %= dt;
        }
        Ok(steps)
    }

    // ---- pipeline stages -----------------------------------------------------

    fn integrate_forces(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for collider in self.colliders.values_mut() {
            if collider.kind == BodyKind::Dynamic && collider.awake && collider.enabled && collider.inv_mass > 0.0 {
                let inv_inertia = collider.world_inverse_inertia();
                let acceleration = gravity * collider.gravity_scale + collider.force * collider.inv_mass;
                collider.linear_velocity += collider.free_translation(acceleration) * dt;
                collider.angular_velocity += inv_inertia * collider.torque * dt;
                collider.linear_velocity /= 1.0 + dt * collider.linear_damping;
                collider.angular_velocity /= 1.0 + dt * collider.angular_damping;
            }
            collider.force = Vec3::zeros();
            collider.torque = Vec3::zeros();
        }
    }

    fn collect_proxies(&self, dt: f32) -> PhysicsResult<Vec<Proxy>> {
        let mut proxies = Vec::new();
        proxies.try_reserve(self.shapes.len())?;
        for (shape_key, slot) in &self.shapes {
            let Some(collider) = self.colliders.get(slot.collider) else {
                continue;
            };
            if !collider.enabled || !slot.shape.is_enabled() {
                continue;
            }
            let active = collider.is_active();
            let aabb = slot.shape.aabb(&collider.pose);
            let sweep = if active {
                let spin = collider.angular_velocity.norm() * aabb.extents().norm();
                (collider.linear_velocity.norm() + spin) * dt
            } else {
                0.0
            };
            proxies.push(Proxy {
                shape: shape_key,
                collider: slot.collider,
                aabb: aabb.expanded(SPECULATIVE_MARGIN + sweep),
                active,
            });
        }
        Ok(proxies)
    }

    fn refit_broad_phase(&mut self) -> PhysicsResult<()> {
        let proxies = self.collect_proxies(0.0)?;
        self.backend.rebuild(&proxies)?;
        self.proxies_stale = false;
        Ok(())
    }

    /// Filter order: liveness, body kinds, joints, tags, then the user filter
    fn pair_allowed(&self, pair: CollisionPair, callbacks: &mut WorldCallbacks) -> bool {
        let (Some(a), Some(b)) = (self.colliders.get(pair.a), self.colliders.get(pair.b)) else {
            return false;
        };
        if !a.enabled || !b.enabled {
            return false;
        }
        if !a.is_dynamic() && !b.is_dynamic() {
            return false;
        }
        let jointed = a
            .joints
            .iter()
            .filter_map(|&j| self.joints.get(j))
            .any(|j| j.enabled && !j.collide_connected && CollisionPair::new(j.a, j.b) == pair);
        if jointed {
            return false;
        }
        if !self.tags.should_collide(a.tag, b.tag) {
            return false;
        }
        match callbacks.filter.as_mut() {
            Some(filter) => filter(self, self.collider_handle(pair.a), self.collider_handle(pair.b)),
            None => true,
        }
    }

    fn narrow_phase(
        &self,
        pairs: &[(usize, usize)],
        dt: f32,
        callbacks: &mut WorldCallbacks,
    ) -> (Vec<Contact>, Vec<SweepTarget>) {
        let proxies = self.backend.proxies();
        let mut verdicts: HashMap<CollisionPair, bool> = HashMap::new();
        let mut manifolds = Vec::new();
        let mut contacts = Vec::new();
        let mut sweep_targets = Vec::new();

        for &(i, j) in pairs {
            let pair = CollisionPair::new(proxies[i].collider, proxies[j].collider);
            let allowed = *verdicts
                .entry(pair)
                .or_insert_with(|| self.pair_allowed(pair, callbacks));
            if !allowed {
                continue;
            }

            // The lower collider key is always side A
            let (pa, pb) = if proxies[i].collider == pair.a {
                (&proxies[i], &proxies[j])
            } else {
                (&proxies[j], &proxies[i])
            };
            let (Some(slot_a), Some(slot_b)) = (self.shapes.get(pa.shape), self.shapes.get(pb.shape)) else {
                continue;
            };
            let a = &self.colliders[pair.a];
            let b = &self.colliders[pair.b];
            let pose_a = slot_a.shape.world_pose(&a.pose);
            let pose_b = slot_b.shape.world_pose(&b.pose);
            let closing = (b.linear_velocity - a.linear_velocity).norm();
            let margin = SPECULATIVE_MARGIN + closing * dt;

            manifolds.clear();
            self.backend
                .collide(slot_a.shape.geometry(), &pose_a, slot_b.shape.geometry(), &pose_b, margin, &mut manifolds);

            let sensor = a.sensor || b.sensor;
            if !sensor {
                for (body, own, own_slot, other) in [(a, pa, slot_a, pb), (b, pb, slot_b, pa)] {
                    if body.continuous && body.is_dynamic() && own_slot.shape.geometry().is_convex() {
                        sweep_targets.push(SweepTarget {
                            collider: own.collider,
                            shape: own.shape,
                            other: other.shape,
                        });
                    }
                }
            }
            for manifold in manifolds.drain(..).filter(|m| !m.is_empty()) {
                contacts.push(Contact::new(
                    (self.collider_handle(pair.a), self.collider_handle(pair.b)),
                    (self.shape_handle(pa.shape), self.shape_handle(pb.shape)),
                    manifold,
                    ((a.friction, a.restitution), (b.friction, b.restitution)),
                    sensor,
                ));
            }
        }

        if self.config.deterministic {
            contacts.sort_by_key(|c| (c.shape_a.key(), c.shape_b.key()));
        }
        (contacts, sweep_targets)
    }

    fn dispatch_enter_exit(&mut self, contacts: &[Contact], callbacks: &mut WorldCallbacks) {
        let mut current: HashSet<CollisionPair> = contacts
            .iter()
            .filter(|c| c.is_touching())
            .map(|c| CollisionPair::new(c.collider_a.key(), c.collider_b.key()))
            .collect();

        // Pairs whose bodies are all at rest were not regenerated
        for pair in &self.previous_pairs {
            let resting = |key: ColliderKey| self.colliders.get(key).is_some_and(|c| c.enabled && !c.is_active());
            if resting(pair.a) && resting(pair.b) {
                current.insert(*pair);
            }
        }

        let mut exited: Vec<CollisionPair> = self.previous_pairs.difference(&current).copied().collect();
        let mut entered: Vec<CollisionPair> = current.difference(&self.previous_pairs).copied().collect();
        exited.sort_unstable();
        entered.sort_unstable();

        if let Some(on_exit) = callbacks.exit.as_mut() {
            for pair in &exited {
                on_exit(self, self.collider_handle(pair.a), self.collider_handle(pair.b));
            }
        }
        if let Some(on_enter) = callbacks.enter.as_mut() {
            for pair in &entered {
                on_enter(self, self.collider_handle(pair.a), self.collider_handle(pair.b));
            }
        }
        if !entered.is_empty() || !exited.is_empty() {
            trace!("{}: {} pairs entered, {} exited", self.id, entered.len(), exited.len());
        }
        self.previous_pairs = current;
    }

    fn wake_touching(&mut self, contacts: &[Contact]) {
        let links = contacts
            .iter()
            .filter(|c| c.enabled && !c.sensor)
            .map(|c| (c.collider_a.key(), c.collider_b.key()))
            .chain(self.joints.values().filter(|j| j.enabled).map(|j| (j.a, j.b)))
            .collect::<Vec<_>>();

        for (a, b) in links {
            let disturbs = |key| self.colliders.get(key).is_some_and(is_disturbing);
            let (wake_b, wake_a) = (disturbs(a), disturbs(b));
            for (key, wake) in [(a, wake_a), (b, wake_b)] {
                if let Some(collider) = self.colliders.get_mut(key) {
                    if wake && collider.is_dynamic() && !collider.awake {
                        collider.wake();
                    }
                }
            }
        }
    }

    fn solve_and_integrate(&mut self, contacts: &[Contact], sweep_targets: &[SweepTarget], dt: f32) {
        let mut solver = Solver::new(dt, self.config.tightness, self.config.response_time);
        let mut index: SecondaryMap<ColliderKey, usize> = SecondaryMap::new();

        for contact in contacts.iter().filter(|c| c.enabled && !c.sensor) {
            let a = solver_index(&mut index, &mut solver, &self.colliders, contact.collider_a.key());
            let b = solver_index(&mut index, &mut solver, &self.colliders, contact.collider_b.key());
            if let (Some(a), Some(b)) = (a, b) {
                solver.add_contact(a, b, contact);
            }
        }
        for (key, joint) in &self.joints {
            let endpoints_enabled = [joint.a, joint.b]
                .iter()
                .all(|&k| self.colliders.get(k).is_some_and(|c| c.enabled));
            if !joint.enabled || !endpoints_enabled {
                continue;
            }
            let a = solver_index(&mut index, &mut solver, &self.colliders, joint.a);
            let b = solver_index(&mut index, &mut solver, &self.colliders, joint.b);
            if let (Some(a), Some(b)) = (a, b) {
                solver.add_joint(key, a, b, joint);
            }
        }

        solver.solve(self.config.velocity_iterations, self.config.position_iterations);
        for feedback in solver.joint_feedback() {
            if let Some(joint) = self.joints.get_mut(feedback.key) {
                joint.force = feedback.force;
                joint.torque = feedback.torque;
                joint.motor_force = feedback.motor_force;
            }
        }
        trace!("{}: solved {} rows over {} bodies", self.id, solver.row_count(), solver.bodies.len());

        let starts: HashMap<ColliderKey, Pose> = sweep_targets
            .iter()
            .filter_map(|t| self.colliders.get(t.collider).map(|c| (t.collider, c.pose)))
            .collect();

        for (key, collider) in &mut self.colliders {
            if !collider.is_active() {
                continue;
            }
            let (mut v, mut w, mut pseudo_v, mut pseudo_w) = match index.get(key) {
                Some(&i) if collider.is_dynamic() => {
                    let body = &solver.bodies[i];
                    (body.v, body.w, body.pseudo_v, body.pseudo_w)
                }
                _ => (collider.linear_velocity, collider.angular_velocity, Vec3::zeros(), Vec3::zeros()),
            };
            if collider.is_dynamic() && collider.enabled_axes != EnabledAxes::all() {
                let rotation_mask = collider.enabled_axes.rotation_mask();
                v = collider.free_translation(v);
                pseudo_v = collider.free_translation(pseudo_v);
                w = w.component_mul(&rotation_mask);
                pseudo_w = pseudo_w.component_mul(&rotation_mask);
            }
            if ![v, w, pseudo_v, pseudo_w].iter().all(utils::is_finite) {
                warn!("{}: non-finite velocity on collider {:?}; zeroed", self.id, key);
                v = Vec3::zeros();
                w = Vec3::zeros();
                pseudo_v = Vec3::zeros();
                pseudo_w = Vec3::zeros();
            }
            collider.linear_velocity = v;
            collider.angular_velocity = w;
            if [v, w, pseudo_v, pseudo_w].iter().all(|x| *x == Vec3::zeros()) {
                continue;
            }

            let com = collider.world_center_of_mass() + (v + pseudo_v) * dt;
            let rotation = utils::integrate_rotation(&collider.pose.rotation, &(w + pseudo_w), dt);
            collider.pose = Pose::new(com - rotation * collider.mass_data.center_of_mass, rotation);
        }

        if !sweep_targets.is_empty() {
            self.clamp_continuous(sweep_targets, &starts);
        }
    }

    /// Pull continuous bodies back along this step's translation to just before their first hit
    ///
    /// Velocity is left alone; the next step's contacts resolve the impact.
    fn clamp_continuous(&mut self, sweep_targets: &[SweepTarget], starts: &HashMap<ColliderKey, Pose>) {
        let mut earliest: HashMap<ColliderKey, f32> = HashMap::new();
        for target in sweep_targets {
            let (Some(start), Some(collider)) = (starts.get(&target.collider), self.colliders.get(target.collider)) else {
                continue;
            };
            let (Some(own), Some(other)) = (self.shapes.get(target.shape), self.shapes.get(target.other)) else {
                continue;
            };
            let Some(owner) = self.colliders.get(other.collider) else {
                continue;
            };
            let translation = collider.pose.position - start.position;
            let distance = translation.norm();
            let extent = own.shape.geometry().local_bounds().extents().min();
            if distance <= CONTINUOUS_THRESHOLD * extent {
                continue;
            }

            let from = own.shape.world_pose(&Pose::new(start.position, collider.pose.rotation));
            let target_pose = other.shape.world_pose(&owner.pose);
            let Some(hit) = sweep(own.shape.geometry(), &from, &translation, other.shape.geometry(), &target_pose) else {
                continue;
            };
            // Already touching at the start, or moving away from the surface
            if hit.fraction <= 0.0 || hit.normal.dot(&translation) >= 0.0 {
                continue;
            }
            let fraction = (hit.fraction - LINEAR_SLOP / distance).max(0.0);
            let entry = earliest.entry(target.collider).or_insert(1.0);
            *entry = entry.min(fraction);
        }

        for (key, fraction) in earliest {
            let (Some(collider), Some(start)) = (self.colliders.get_mut(key), starts.get(&key)) else {
                continue;
            };
            let translation = collider.pose.position - start.position;
            collider.pose.position = start.position + translation * fraction;
            trace!("{}: continuous collider {:?} stopped at {:.3} of its motion", self.id, key, fraction);
        }
    }

    fn update_sleep(&mut self, dt: f32) {
        if !self.config.allow_sleep {
            return;
        }
        let thresholds = self.config.sleep;
        let mut ready: HashSet<ColliderKey> = HashSet::new();
        for (key, collider) in &mut self.colliders {
            if !collider.is_dynamic() || !collider.awake || !collider.enabled {
                continue;
            }
            let resting = collider.sleeping_allowed
                && collider.linear_velocity.norm() <= thresholds.linear_threshold
                && collider.angular_velocity.norm() <= thresholds.angular_threshold;
            if !resting {
                collider.sleep_timer = 0.0;
                continue;
            }
            collider.sleep_timer += dt;
            if collider.sleep_timer >= thresholds.time_to_sleep {
                ready.insert(key);
            }
        }
        if ready.is_empty() {
            return;
        }

        // A body only sleeps together with everything it touches or is jointed to
        let links: Vec<(ColliderKey, ColliderKey)> = self
            .contacts
            .iter()
            .filter(|c| c.enabled && !c.sensor)
            .map(|c| (c.collider_a.key(), c.collider_b.key()))
            .chain(self.joints.values().filter(|j| j.enabled).map(|j| (j.a, j.b)))
            .collect();
        loop {
            let before = ready.len();
            for &(a, b) in &links {
                for (x, y) in [(a, b), (b, a)] {
                    if ready.contains(&x)
                        && !ready.contains(&y)
                        && self.colliders.get(y).is_some_and(is_disturbing)
                    {
                        ready.remove(&x);
                    }
                }
            }
            if ready.len() == before {
                break;
            }
        }

        for key in &ready {
            if let Some(collider) = self.colliders.get_mut(*key) {
                collider.sleep();
            }
        }
        if !ready.is_empty() {
            debug!("{}: {} bodies fell asleep", self.id, ready.len());
        }
    }
}
