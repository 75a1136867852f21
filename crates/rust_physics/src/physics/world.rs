//! The simulation world
//!
//! A [`World`] owns every collider, shape and joint in slotmap arenas and
//! hands out handles stamped with its id. Handles from another world, or to
//! destroyed objects, resolve to nothing: lookups return `None`, mutators do
//! nothing, and factories report [`PhysicsError::InvalidHandle`].
//!
//! Stepping lives in `step.rs` and spatial queries in `query.rs`.

use crate::config::{ConfigError, WorldConfig};
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::bounds::AABB;
use crate::foundation::collections::{
    ColliderHandle, ColliderKey, JointHandle, JointKey, ShapeHandle, ShapeKey, SlotMap, WorldId,
};
use crate::foundation::logging::{debug, info};
use crate::foundation::math::{utils, Pose, Vec3};
use crate::physics::backend::{self, CollisionBackend, RuntimeGuard};
use crate::physics::callbacks::WorldCallbacks;
use crate::physics::collider::{BodyKind, Collider};
use crate::physics::contact::{CollisionPair, Contact};
use crate::physics::joint::{Joint, JointDesc, JointKind};
use crate::physics::shape::{MassData, Shape};
use crate::physics::tags::TagTable;
use std::collections::HashSet;
use std::fmt;

/// A shape living in the world arena
#[derive(Debug, Clone)]
pub(crate) struct ShapeSlot {
    pub shape: Shape,
    pub collider: ColliderKey,
}

/// Owns and simulates colliders, shapes and joints
pub struct World {
    pub(crate) id: WorldId,
    pub(crate) config: WorldConfig,
    pub(crate) tags: TagTable,
    pub(crate) colliders: SlotMap<ColliderKey, Collider>,
    pub(crate) shapes: SlotMap<ShapeKey, ShapeSlot>,
    pub(crate) joints: SlotMap<JointKey, Joint>,
    pub(crate) backend: Box<dyn CollisionBackend>,
    pub(crate) callbacks: WorldCallbacks,
    pub(crate) contacts: Vec<Contact>,
    pub(crate) previous_pairs: HashSet<CollisionPair>,
    pub(crate) accumulator: f32,
    // Backend proxies no longer match the arenas; queries scan linearly
    pub(crate) proxies_stale: bool,
    pub(crate) step_count: u64,
    _runtime: RuntimeGuard,
}

impl World {
    /// Create a world with the backend named in its configuration
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        config.validate()?;
        let backend = backend::create_backend(config.backend);
        Self::with_backend(config, backend)
    }

    /// Create a world with a caller-supplied backend
    pub fn with_backend(config: WorldConfig, backend: Box<dyn CollisionBackend>) -> PhysicsResult<Self> {
        config.validate()?;
        let tags = TagTable::new(&config.tags)?;
        let runtime = RuntimeGuard::acquire();
        let id = WorldId::next();
        info!(
            "Created {} ({} backend, {} tags, tick rate {} Hz)",
            id,
            backend.name(),
            tags.len(),
            config.tick_rate
        );
        Ok(Self {
            id,
            config,
            tags,
            colliders: SlotMap::with_key(),
            shapes: SlotMap::with_key(),
            joints: SlotMap::with_key(),
            backend,
            callbacks: WorldCallbacks::default(),
            contacts: Vec::new(),
            previous_pairs: HashSet::new(),
            accumulator: 0.0,
            proxies_stale: true,
            step_count: 0,
            _runtime: runtime,
        })
    }

    /// Destroy the world and everything it owns
    pub fn destroy(self) {
        drop(self);
    }

    /// Id stamped into every handle this world issues
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// Configuration the world was created with, including later setting changes
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Name of the collision backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of completed `update` calls
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    // ---- handle resolution -------------------------------------------------

    pub(crate) fn collider_key(&self, handle: ColliderHandle) -> Option<ColliderKey> {
        (handle.world() == self.id && self.colliders.contains_key(handle.key())).then(|| handle.key())
    }

    pub(crate) fn shape_key(&self, handle: ShapeHandle) -> Option<ShapeKey> {
        (handle.world() == self.id && self.shapes.contains_key(handle.key())).then(|| handle.key())
    }

    pub(crate) fn joint_key(&self, handle: JointHandle) -> Option<JointKey> {
        (handle.world() == self.id && self.joints.contains_key(handle.key())).then(|| handle.key())
    }

    pub(crate) fn collider_handle(&self, key: ColliderKey) -> ColliderHandle {
        ColliderHandle::new(self.id, key)
    }

    pub(crate) fn shape_handle(&self, key: ShapeKey) -> ShapeHandle {
        ShapeHandle::new(self.id, key)
    }

    // ---- colliders ---------------------------------------------------------

    /// Create a dynamic, awake, untagged, massless collider
    pub fn create_collider(&mut self, position: Vec3) -> ColliderHandle {
        self.create_collider_with_pose(Pose::from_position(position))
    }

    /// Create a collider at a full pose; a non-finite pose falls back to identity
    pub fn create_collider_with_pose(&mut self, pose: Pose) -> ColliderHandle {
        let pose = if pose.is_finite() { pose } else { Pose::identity() };
        let collider = Collider::new(
            pose,
            self.config.linear_damping,
            self.config.angular_damping,
            self.config.allow_sleep,
        );
        let key = self.colliders.insert(collider);
        self.proxies_stale = true;
        debug!("{}: created collider {:?}", self.id, key);
        self.collider_handle(key)
    }

    /// Destroy a collider with its shapes and joints; `false` for stale handles
    pub fn destroy_collider(&mut self, handle: ColliderHandle) -> bool {
        let Some(key) = self.collider_key(handle) else {
            return false;
        };
        let Some(collider) = self.colliders.remove(key) else {
            return false;
        };
        for shape in &collider.shapes {
            self.shapes.remove(*shape);
        }
        for joint in &collider.joints {
            self.remove_joint(*joint);
        }
        self.previous_pairs.retain(|pair| pair.a != key && pair.b != key);
        self.contacts
            .retain(|c| c.collider_a.key() != key && c.collider_b.key() != key);
        self.proxies_stale = true;
        debug!(
            "{}: destroyed collider {:?} ({} shapes, {} joints)",
            self.id,
            key,
            collider.shapes.len(),
            collider.joints.len()
        );
        true
    }

    /// Read access to a collider
    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_key(handle).and_then(|key| self.colliders.get(key))
    }

    /// Write access to a collider
    pub fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        let key = self.collider_key(handle)?;
        // Poses may change behind the broad phase's back
        self.proxies_stale = true;
        self.colliders.get_mut(key)
    }

    /// Number of colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Iterate colliders with their handles
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> + '_ {
        self.colliders
            .iter()
            .map(move |(key, collider)| (self.collider_handle(key), collider))
    }

    /// Handles of the shapes attached to a collider, in attachment order
    pub fn collider_shapes(&self, handle: ColliderHandle) -> Vec<ShapeHandle> {
        self.collider(handle)
            .map(|c| c.shapes.iter().map(|&key| self.shape_handle(key)).collect())
            .unwrap_or_default()
    }

    /// Handles of the joints attached to a collider
    pub fn collider_joints(&self, handle: ColliderHandle) -> Vec<JointHandle> {
        self.collider(handle)
            .map(|c| c.joints.iter().map(|&key| JointHandle::new(self.id, key)).collect())
            .unwrap_or_default()
    }

    /// Union of the world bounds of a collider's enabled shapes
    pub fn collider_aabb(&self, handle: ColliderHandle) -> Option<AABB> {
        let collider = self.collider(handle)?;
        collider
            .shapes
            .iter()
            .filter_map(|&key| self.shapes.get(key))
            .filter(|slot| slot.shape.is_enabled())
            .map(|slot| slot.shape.aabb(&collider.pose))
            .reduce(|a, b| a.merged(&b))
    }

    /// Assign a tag by name, or clear it with `None`; `false` for unknown names
    pub fn set_collider_tag(&mut self, handle: ColliderHandle, tag: Option<&str>) -> bool {
        let index = match tag {
            Some(name) => match self.tags.index_of(name) {
                Some(index) => Some(index),
                None => return false,
            },
            None => None,
        };
        match self.collider_key(handle).and_then(|key| self.colliders.get_mut(key)) {
            Some(collider) => {
                collider.tag = index;
                collider.wake();
                true
            }
            None => false,
        }
    }

    /// Tag name of a collider
    pub fn collider_tag(&self, handle: ColliderHandle) -> Option<&str> {
        self.collider(handle)?.tag.and_then(|i| self.tags.name(i))
    }

    /// Switch a collider between dynamic, kinematic and static
    ///
    /// Making a body with mesh or terrain shapes dynamic requires automatic
    /// mass to be off.
    pub fn set_body_kind(&mut self, handle: ColliderHandle, kind: BodyKind) -> PhysicsResult<()> {
        let key = self.collider_key(handle).ok_or(PhysicsError::InvalidHandle)?;
        if kind == BodyKind::Dynamic && self.colliders[key].automatic_mass && self.has_concave_shape(key) {
            return Err(PhysicsError::MassRequired);
        }
        self.colliders[key].set_kind(kind);
        self.proxies_stale = true;
        Ok(())
    }

    /// Toggle between kinematic and dynamic
    pub fn set_kinematic(&mut self, handle: ColliderHandle, kinematic: bool) -> PhysicsResult<()> {
        self.set_body_kind(handle, if kinematic { BodyKind::Kinematic } else { BodyKind::Dynamic })
    }

    /// Turn automatic mass on or off; turning it on recomputes from the shapes
    pub fn set_automatic_mass(&mut self, handle: ColliderHandle, automatic: bool) -> PhysicsResult<()> {
        let key = self.collider_key(handle).ok_or(PhysicsError::InvalidHandle)?;
        let collider = &self.colliders[key];
        if automatic && collider.is_dynamic() && self.has_concave_shape(key) {
            return Err(PhysicsError::MassRequired);
        }
        self.colliders[key].automatic_mass = automatic;
        self.recompute_mass(key);
        Ok(())
    }

    /// Recompute mass from the attached shapes and re-enable automatic mass
    pub fn reset_mass_data(&mut self, handle: ColliderHandle) -> PhysicsResult<()> {
        self.set_automatic_mass(handle, true)
    }

    fn has_concave_shape(&self, key: ColliderKey) -> bool {
        self.colliders[key]
            .shapes
            .iter()
            .filter_map(|&s| self.shapes.get(s))
            .any(|slot| !slot.shape.geometry().is_convex())
    }

    pub(crate) fn recompute_mass(&mut self, key: ColliderKey) {
        let Some(collider) = self.colliders.get(key) else {
            return;
        };
        if !collider.automatic_mass {
            return;
        }
        let backend = &self.backend;
        let mass_data = MassData::combine(collider.shapes.iter().filter_map(|&s| self.shapes.get(s)).map(|slot| {
            backend
                .mass_data(slot.shape.geometry(), slot.shape.density())
                .transformed(&slot.shape.offset())
        }));
        if let Some(collider) = self.colliders.get_mut(key) {
            collider.apply_mass_data(mass_data);
            collider.wake();
        }
    }

    // ---- shapes ------------------------------------------------------------

    /// Attach a shape to a collider, taking ownership of it
    pub fn add_shape(&mut self, collider: ColliderHandle, shape: Shape) -> PhysicsResult<ShapeHandle> {
        let key = self.collider_key(collider).ok_or(PhysicsError::InvalidHandle)?;
        let owner = &self.colliders[key];
        if !shape.geometry().is_convex() && owner.is_dynamic() && owner.automatic_mass {
            return Err(PhysicsError::MassRequired);
        }
        let shape_type = shape.shape_type();
        let shape_key = self.shapes.insert(ShapeSlot { shape, collider: key });
        self.colliders[key].shapes.push(shape_key);
        self.recompute_mass(key);
        self.proxies_stale = true;
        debug!("{}: attached {:?} shape to {:?}", self.id, shape_type, key);
        Ok(self.shape_handle(shape_key))
    }

    /// Detach a shape and hand it back
    pub fn remove_shape(&mut self, handle: ShapeHandle) -> Option<Shape> {
        let key = self.shape_key(handle)?;
        let slot = self.shapes.remove(key)?;
        if let Some(owner) = self.colliders.get_mut(slot.collider) {
            owner.shapes.retain(|&s| s != key);
            owner.wake();
        }
        self.recompute_mass(slot.collider);
        self.contacts
            .retain(|c| c.shape_a.key() != key && c.shape_b.key() != key);
        self.proxies_stale = true;
        Some(slot.shape)
    }

    /// Move an attached shape to another collider of this world
    pub fn attach_shape(&mut self, handle: ShapeHandle, collider: ColliderHandle) -> PhysicsResult<()> {
        let shape_key = self.shape_key(handle).ok_or(PhysicsError::InvalidHandle)?;
        let new_owner = self.collider_key(collider).ok_or(PhysicsError::InvalidHandle)?;
        let old_owner = self.shapes[shape_key].collider;
        if old_owner == new_owner {
            return Ok(());
        }
        let target = &self.colliders[new_owner];
        if !self.shapes[shape_key].shape.geometry().is_convex() && target.is_dynamic() && target.automatic_mass {
            return Err(PhysicsError::MassRequired);
        }
        if let Some(owner) = self.colliders.get_mut(old_owner) {
            owner.shapes.retain(|&s| s != shape_key);
            owner.wake();
        }
        self.colliders[new_owner].shapes.push(shape_key);
        self.colliders[new_owner].wake();
        self.shapes[shape_key].collider = new_owner;
        self.recompute_mass(old_owner);
        self.recompute_mass(new_owner);
        self.proxies_stale = true;
        Ok(())
    }

    /// Read access to an attached shape
    pub fn shape(&self, handle: ShapeHandle) -> Option<&Shape> {
        self.shape_key(handle).map(|key| &self.shapes[key].shape)
    }

    /// Collider owning a shape
    pub fn shape_collider(&self, handle: ShapeHandle) -> Option<ColliderHandle> {
        self.shape_key(handle)
            .map(|key| self.collider_handle(self.shapes[key].collider))
    }

    /// World bounds of a shape at its collider's current pose
    pub fn shape_aabb(&self, handle: ShapeHandle) -> Option<AABB> {
        let slot = &self.shapes[self.shape_key(handle)?];
        let collider = self.colliders.get(slot.collider)?;
        Some(slot.shape.aabb(&collider.pose))
    }

    /// Move a shape within its collider; mass follows
    pub fn set_shape_offset(&mut self, handle: ShapeHandle, offset: Pose) -> bool {
        let Some(key) = self.shape_key(handle) else {
            return false;
        };
        if !offset.is_finite() {
            return false;
        }
        self.shapes[key].shape.set_offset(offset);
        let owner = self.shapes[key].collider;
        self.recompute_mass(owner);
        self.proxies_stale = true;
        true
    }

    /// Change a shape's density; mass follows
    pub fn set_shape_density(&mut self, handle: ShapeHandle, density: f32) -> PhysicsResult<()> {
        let key = self.shape_key(handle).ok_or(PhysicsError::InvalidHandle)?;
        self.shapes[key].shape.set_density(density)?;
        let owner = self.shapes[key].collider;
        self.recompute_mass(owner);
        Ok(())
    }

    /// Enable or disable collision and queries for one shape
    pub fn set_shape_enabled(&mut self, handle: ShapeHandle, enabled: bool) -> bool {
        let Some(key) = self.shape_key(handle) else {
            return false;
        };
        self.shapes[key].shape.set_enabled(enabled);
        let owner = self.shapes[key].collider;
        if let Some(collider) = self.colliders.get_mut(owner) {
            collider.wake();
        }
        self.proxies_stale = true;
        true
    }

    /// Number of attached shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    // ---- joints ------------------------------------------------------------

    /// Connect two colliders of this world
    ///
    /// Fails with [`PhysicsError::CrossWorldJoint`] before touching any state
    /// when either handle was issued by another world.
    pub fn create_joint(&mut self, a: ColliderHandle, b: ColliderHandle, desc: JointDesc) -> PhysicsResult<JointHandle> {
        if a.world() != self.id || b.world() != self.id {
            return Err(PhysicsError::CrossWorldJoint);
        }
        let key_a = self.collider_key(a).ok_or(PhysicsError::InvalidHandle)?;
        let key_b = self.collider_key(b).ok_or(PhysicsError::InvalidHandle)?;
        if key_a == key_b {
            return Err(PhysicsError::InvalidHandle);
        }
        validate_joint_desc(&desc)?;

        let joint = Joint::new(key_a, key_b, &desc, &self.colliders[key_a].pose, &self.colliders[key_b].pose);
        let joint_type = joint.joint_type();
        let key = self.joints.insert(joint);
        for body in [key_a, key_b] {
            let collider = &mut self.colliders[body];
            collider.joints.push(key);
            collider.wake();
        }
        debug!("{}: created {:?} joint {:?}", self.id, joint_type, key);
        Ok(JointHandle::new(self.id, key))
    }

    /// Remove a joint; `false` for stale handles
    pub fn destroy_joint(&mut self, handle: JointHandle) -> bool {
        match self.joint_key(handle) {
            Some(key) => {
                self.remove_joint(key);
                true
            }
            None => false,
        }
    }

    fn remove_joint(&mut self, key: JointKey) {
        if let Some(joint) = self.joints.remove(key) {
            for body in [joint.a, joint.b] {
                if let Some(collider) = self.colliders.get_mut(body) {
                    collider.joints.retain(|&j| j != key);
                    collider.wake();
                }
            }
        }
    }

    /// Read access to a joint
    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joint_key(handle).map(|key| &self.joints[key])
    }

    /// Write access to a joint; wakes both bodies
    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        let key = self.joint_key(handle)?;
        let (a, b) = (self.joints[key].a, self.joints[key].b);
        for body in [a, b] {
            if let Some(collider) = self.colliders.get_mut(body) {
                collider.wake();
            }
        }
        self.joints.get_mut(key)
    }

    /// The two colliders a joint connects
    pub fn joint_colliders(&self, handle: JointHandle) -> Option<(ColliderHandle, ColliderHandle)> {
        self.joint(handle)
            .map(|j| (self.collider_handle(j.a), self.collider_handle(j.b)))
    }

    fn joint_poses(&self, handle: JointHandle) -> Option<(&Joint, Pose, Pose)> {
        let joint = self.joint(handle)?;
        let a = self.colliders.get(joint.a)?;
        let b = self.colliders.get(joint.b)?;
        Some((joint, a.pose, b.pose))
    }

    /// World anchors on both bodies at their current poses
    pub fn joint_anchors(&self, handle: JointHandle) -> Option<(Vec3, Vec3)> {
        let (joint, pose_a, pose_b) = self.joint_poses(handle)?;
        Some(joint.world_anchors(&pose_a, &pose_b))
    }

    /// Current hinge angle in radians; `None` for other joint types
    pub fn joint_angle(&self, handle: JointHandle) -> Option<f32> {
        let (joint, pose_a, pose_b) = self.joint_poses(handle)?;
        matches!(joint.kind, JointKind::Hinge(_)).then(|| joint.angle(&pose_a, &pose_b))
    }

    /// Current slider offset; `None` for other joint types
    pub fn joint_position(&self, handle: JointHandle) -> Option<f32> {
        let (joint, pose_a, pose_b) = self.joint_poses(handle)?;
        matches!(joint.kind, JointKind::Slider(_)).then(|| joint.position(&pose_a, &pose_b))
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Iterate joints with their handles
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> + '_ {
        self.joints
            .iter()
            .map(move |(key, joint)| (JointHandle::new(self.id, key), joint))
    }

    // ---- tags --------------------------------------------------------------

    /// Let two tags collide; `false` if either name is unknown
    pub fn enable_collision(&mut self, a: &str, b: &str) -> bool {
        let changed = self.tags.enable(a, b);
        if changed {
            self.wake_all();
        }
        changed
    }

    /// Stop two tags from colliding; `false` if either name is unknown
    pub fn disable_collision(&mut self, a: &str, b: &str) -> bool {
        if !self.tags.disable(a, b) {
            return false;
        }
        // Resting pairs are only re-examined once a body is awake
        let affected = [self.tags.index_of(a), self.tags.index_of(b)];
        for collider in self.colliders.values_mut() {
            if collider.is_dynamic() && collider.tag().is_some() && affected.contains(&collider.tag()) {
                collider.wake();
            }
        }
        true
    }

    /// Whether two tags collide; `None` if either name is unknown
    pub fn is_collision_enabled(&self, a: &str, b: &str) -> Option<bool> {
        self.tags.is_enabled(a, b)
    }

    /// Name of a tag index
    pub fn tag_name(&self, index: usize) -> Option<&str> {
        self.tags.name(index)
    }

    /// The tag table
    pub const fn tags(&self) -> &TagTable {
        &self.tags
    }

    // ---- settings ----------------------------------------------------------

    /// Global gravity
    pub const fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Change gravity and wake every body
    pub fn set_gravity(&mut self, gravity: Vec3) {
        if utils::is_finite(&gravity) {
            self.config.gravity = gravity;
            self.wake_all();
        }
    }

    /// Linear and angular damping given to new colliders
    pub const fn default_damping(&self) -> (f32, f32) {
        (self.config.linear_damping, self.config.angular_damping)
    }

    /// Set damping for colliders created from now on
    pub fn set_default_damping(&mut self, linear: f32, angular: f32) {
        if linear.is_finite() && angular.is_finite() {
            self.config.linear_damping = linear.max(0.0);
            self.config.angular_damping = angular.max(0.0);
        }
    }

    /// Fraction of joint and contact error corrected per step
    pub const fn tightness(&self) -> f32 {
        self.config.tightness
    }

    /// Set the error correction fraction, in `[0, 1]`
    pub fn set_tightness(&mut self, tightness: f32) -> PhysicsResult<()> {
        if !(0.0..=1.0).contains(&tightness) {
            return Err(ConfigError::InvalidParameter {
                name: "tightness",
                value: tightness,
            }
            .into());
        }
        self.config.tightness = tightness;
        Ok(())
    }

    /// Constraint compliance in seconds
    pub const fn response_time(&self) -> f32 {
        self.config.response_time
    }

    /// Soften every constraint; zero keeps them rigid
    pub fn set_response_time(&mut self, response_time: f32) -> PhysicsResult<()> {
        if !response_time.is_finite() || response_time < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "response_time",
                value: response_time,
            }
            .into());
        }
        self.config.response_time = response_time;
        self.wake_all();
        Ok(())
    }

    /// Whether any body may sleep
    pub const fn allow_sleep(&self) -> bool {
        self.config.allow_sleep
    }

    /// Allow or forbid sleeping world-wide; forbidding wakes everything
    pub fn set_allow_sleep(&mut self, allow: bool) {
        self.config.allow_sleep = allow;
        if !allow {
            self.wake_all();
        }
    }

    /// Wake every dynamic body
    pub fn wake_all(&mut self) {
        for collider in self.colliders.values_mut() {
            if collider.is_dynamic() {
                collider.wake();
            }
        }
    }

    // ---- results and callbacks ----------------------------------------------

    /// Contacts from the last step
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Replace all callbacks
    pub fn set_callbacks(&mut self, callbacks: WorldCallbacks) {
        self.callbacks = callbacks;
    }

    /// Remove and return the registered callbacks
    pub fn take_callbacks(&mut self) -> WorldCallbacks {
        std::mem::take(&mut self.callbacks)
    }
}

fn validate_joint_desc(desc: &JointDesc) -> PhysicsResult<()> {
    let vectors = match *desc {
        JointDesc::Ball { anchor } | JointDesc::Weld { anchor } => vec![anchor],
        JointDesc::Distance { anchor_a, anchor_b } => vec![anchor_a, anchor_b],
        JointDesc::Hinge { anchor, axis } => vec![anchor, axis],
        JointDesc::Slider { axis } => vec![axis],
        JointDesc::Cone { anchor, axis, max_angle } => {
            if !max_angle.is_finite() {
                return Err(PhysicsError::geometry("cone angle must be finite"));
            }
            vec![anchor, axis]
        }
    };
    if vectors.iter().all(utils::is_finite) {
        Ok(())
    } else {
        Err(PhysicsError::geometry("joint anchors and axes must be finite"))
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("colliders", &self.colliders.len())
            .field("shapes", &self.shapes.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.len())
            .finish_non_exhaustive()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        info!(
            "Destroyed {} ({} colliders, {} joints)",
            self.id,
            self.colliders.len(),
            self.joints.len()
        );
    }
}
