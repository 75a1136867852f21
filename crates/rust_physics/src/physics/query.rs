//! Spatial queries against the current world state
//!
//! Candidates come from the broad phase built by the last step; every
//! candidate is then tested exactly at its current pose. When colliders or
//! shapes changed since the last step the broad phase may be out of date, so
//! queries fall back to scanning all shapes until the next step.

use crate::foundation::bounds::AABB;
use crate::foundation::collections::{ColliderHandle, ShapeHandle, ShapeKey};
use crate::foundation::math::{utils, Pose, Vec3};
use crate::physics::collision::{overlaps, sweep};
use crate::physics::shape::Shape;
use crate::physics::tags::TagMask;
use crate::physics::world::World;
use std::collections::HashSet;

/// A segment hit from [`World::raycast`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Collider that was hit
    pub collider: ColliderHandle,
    /// Shape that was hit
    pub shape: ShapeHandle,
    /// World-space hit position
    pub position: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Fraction of the segment at the hit, in `[0, 1]`
    pub fraction: f32,
}

/// A sweep hit from [`World::shapecast`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapecastHit {
    /// Collider that was hit
    pub collider: ColliderHandle,
    /// Shape that was hit
    pub shape: ShapeHandle,
    /// World-space contact position
    pub position: Vec3,
    /// Surface normal of the hit shape, facing the swept shape
    pub normal: Vec3,
    /// Fraction of the translation travelled at impact, in `[0, 1]`
    pub fraction: f32,
}

impl World {
    /// Shapes whose bounds overlap `region`, filtered by mask and enabled state
    fn shapes_in_region(&self, region: &AABB, mask: TagMask) -> Vec<ShapeKey> {
        let mut keys = Vec::new();
        if self.proxies_stale {
            for (key, slot) in &self.shapes {
                if let Some(collider) = self.colliders.get(slot.collider) {
                    if slot.shape.aabb(&collider.pose).intersects(region) {
                        keys.push(key);
                    }
                }
            }
        } else {
            let mut indices = Vec::new();
            self.backend.query_aabb(region, &mut indices);
            let proxies = self.backend.proxies();
            keys.extend(indices.into_iter().map(|i| proxies[i].shape));
        }
        keys.retain(|&key| self.is_queryable(key, mask));
        keys
    }

    fn is_queryable(&self, key: ShapeKey, mask: TagMask) -> bool {
        let Some(slot) = self.shapes.get(key) else {
            return false;
        };
        slot.shape.is_enabled()
            && self
                .colliders
                .get(slot.collider)
                .is_some_and(|c| c.enabled && mask.selects(c.tag))
    }

    /// Cast the segment `start -> end`; `callback` returns `false` to stop
    pub fn raycast<F>(&self, start: Vec3, end: Vec3, mask: TagMask, mut callback: F)
    where
        F: FnMut(&RaycastHit) -> bool,
    {
        if !utils::is_finite(&start) || !utils::is_finite(&end) {
            return;
        }
        let dir = end - start;
        let keys = if self.proxies_stale {
            AABB::from_points(&[start, end]).map_or_else(Vec::new, |region| self.shapes_in_region(&region, mask))
        } else {
            let mut indices = Vec::new();
            self.backend.query_ray(&start, &dir, 1.0, &mut indices);
            let proxies = self.backend.proxies();
            let mut keys: Vec<ShapeKey> = indices.into_iter().map(|i| proxies[i].shape).collect();
            keys.retain(|&key| self.is_queryable(key, mask));
            keys
        };

        for key in keys {
            let slot = &self.shapes[key];
            let pose = self.colliders[slot.collider].pose;
            if let Some(hit) = slot.shape.ray_cast(&pose, &start, &end) {
                let hit = RaycastHit {
                    collider: self.collider_handle(slot.collider),
                    shape: self.shape_handle(key),
                    position: hit.position,
                    normal: hit.normal,
                    fraction: hit.fraction,
                };
                if !callback(&hit) {
                    return;
                }
            }
        }
    }

    /// Nearest hit along the segment, if any
    pub fn raycast_closest(&self, start: Vec3, end: Vec3, mask: TagMask) -> Option<RaycastHit> {
        let mut closest: Option<RaycastHit> = None;
        self.raycast(start, end, mask, |hit| {
            if closest.map_or(true, |c| hit.fraction < c.fraction) {
                closest = Some(*hit);
            }
            true
        });
        closest
    }

    /// Sweep a standalone shape from `start` along `translation`
    ///
    /// The shape's own offset is applied on top of `start`. A shape already
    /// overlapping something reports that hit at fraction 0.
    pub fn shapecast<F>(&self, shape: &Shape, start: Pose, translation: Vec3, mask: TagMask, mut callback: F)
    where
        F: FnMut(&ShapecastHit) -> bool,
    {
        if !start.is_finite() || !utils::is_finite(&translation) {
            return;
        }
        let pose = shape.world_pose(&start);
        let end = Pose::new(start.position + translation, start.rotation);
        let region = shape.aabb(&start).merged(&shape.aabb(&end));

        for key in self.shapes_in_region(&region, mask) {
            let slot = &self.shapes[key];
            let target_pose = slot.shape.world_pose(&self.colliders[slot.collider].pose);
            let Some(hit) = sweep(shape.geometry(), &pose, &translation, slot.shape.geometry(), &target_pose) else {
                continue;
            };
            let hit = ShapecastHit {
                collider: self.collider_handle(slot.collider),
                shape: self.shape_handle(key),
                position: hit.position,
                normal: hit.normal,
                fraction: hit.fraction,
            };
            if !callback(&hit) {
                return;
            }
        }
    }

    /// Earliest sweep hit, if any
    pub fn shapecast_closest(&self, shape: &Shape, start: Pose, translation: Vec3, mask: TagMask) -> Option<ShapecastHit> {
        let mut closest: Option<ShapecastHit> = None;
        self.shapecast(shape, start, translation, mask, |hit| {
            if closest.map_or(true, |c| hit.fraction < c.fraction) {
                closest = Some(*hit);
            }
            true
        });
        closest
    }

    /// Colliders overlapping a shape placed at `pose`, each reported once
    pub fn query_shape<F>(&self, shape: &Shape, pose: Pose, mask: TagMask, mut callback: F)
    where
        F: FnMut(ColliderHandle) -> bool,
    {
        if !pose.is_finite() {
            return;
        }
        let world_pose = shape.world_pose(&pose);
        let mut reported = HashSet::new();
        for key in self.shapes_in_region(&shape.aabb(&pose), mask) {
            let slot = &self.shapes[key];
            if reported.contains(&slot.collider) {
                continue;
            }
            let target_pose = slot.shape.world_pose(&self.colliders[slot.collider].pose);
            if overlaps(shape.geometry(), &world_pose, slot.shape.geometry(), &target_pose) {
                reported.insert(slot.collider);
                if !callback(self.collider_handle(slot.collider)) {
                    return;
                }
            }
        }
    }

    /// Colliders overlapping an axis-aligned box
    pub fn query_box<F>(&self, center: Vec3, half_extents: Vec3, mask: TagMask, callback: F)
    where
        F: FnMut(ColliderHandle) -> bool,
    {
        if let Ok(shape) = Shape::cuboid(half_extents) {
            self.query_shape(&shape, Pose::from_position(center), mask, callback);
        }
    }

    /// Colliders overlapping a sphere
    pub fn query_sphere<F>(&self, center: Vec3, radius: f32, mask: TagMask, callback: F)
    where
        F: FnMut(ColliderHandle) -> bool,
    {
        if let Ok(shape) = Shape::sphere(radius) {
            self.query_shape(&shape, Pose::from_position(center), mask, callback);
        }
    }
}
