//! # Collision Backends
//!
//! A collision backend owns the broad phase of one world: it is handed the
//! bounds of every enabled shape once per step and answers pair and region
//! queries until the next rebuild. Narrow-phase collision and mass
//! computation come from trait default methods, so a backend only overrides
//! them when it has something better.
//!
//! ## Organization
//!
//! - **Octree**: loose octree, each proxy stored in the deepest node that fully contains it
//! - **Sweep and prune**: proxies sorted along X, swept for overlaps
//! - **Runtime**: process-wide reference-counted backend state
//!
//! The backend is chosen once, when the world is created.

pub mod octree;
pub mod runtime;
pub mod sweep_prune;

pub use octree::{OctreeBackend, OctreeConfig};
pub use runtime::RuntimeGuard;
pub use sweep_prune::SweepAndPruneBackend;

use crate::config::BackendKind;
use crate::error::PhysicsResult;
use crate::foundation::bounds::AABB;
use crate::foundation::collections::{ColliderKey, ShapeKey};
use crate::foundation::math::{Pose, Vec3};
use crate::physics::collision::{self, Manifold};
use crate::physics::shape::{MassData, ShapeGeometry};

/// Broad-phase entry for one enabled shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    /// Shape the bounds belong to
    pub shape: ShapeKey,
    /// Collider owning the shape
    pub collider: ColliderKey,
    /// World bounds, grown by the contact margin and the step's motion
    pub aabb: AABB,
    /// Whether the owner moves this step (awake dynamic or kinematic)
    pub active: bool,
}

/// Broad phase plus narrow-phase and mass kernels behind one interface
pub trait CollisionBackend: Send {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Replace the stored proxies
    fn rebuild(&mut self, proxies: &[Proxy]) -> PhysicsResult<()>;

    /// Proxies from the last rebuild; pair and query indices refer to this slice
    fn proxies(&self) -> &[Proxy];

    /// Overlapping proxy pairs from different colliders with at least one active side
    ///
    /// Each pair is reported once as `(lower index, higher index)`.
    fn candidate_pairs(&self, out: &mut Vec<(usize, usize)>);

    /// Proxies whose bounds overlap `region`
    fn query_aabb(&self, region: &AABB, out: &mut Vec<usize>);

    /// Proxies whose bounds are crossed by `origin + t * dir`, `t` in `[0, max_t]`
    fn query_ray(&self, origin: &Vec3, dir: &Vec3, max_t: f32, out: &mut Vec<usize>);

    /// Contact manifolds between two posed shapes
    fn collide(&self, a: &ShapeGeometry, pose_a: &Pose, b: &ShapeGeometry, pose_b: &Pose, margin: f32, out: &mut Vec<Manifold>) {
        collision::collide(a, pose_a, b, pose_b, margin, out);
    }

    /// Mass properties of a shape at `density`
    fn mass_data(&self, geometry: &ShapeGeometry, density: f32) -> MassData {
        geometry.mass_data(density)
    }
}

/// Construct the backend selected in a world configuration
pub fn create_backend(kind: BackendKind) -> Box<dyn CollisionBackend> {
    match kind {
        BackendKind::Octree => Box::new(OctreeBackend::new(OctreeConfig::default())),
        BackendKind::SweepAndPrune => Box::new(SweepAndPruneBackend::new()),
    }
}

/// Whether a pair of proxies should be reported by a broad phase
pub(crate) fn is_candidate(a: &Proxy, b: &Proxy) -> bool {
    a.collider != b.collider && (a.active || b.active) && a.aabb.intersects(&b.aabb)
}

/// Copy proxies into a backend-owned buffer with a fallible reservation
pub(crate) fn copy_proxies(target: &mut Vec<Proxy>, proxies: &[Proxy]) -> PhysicsResult<()> {
    target.clear();
    target.try_reserve(proxies.len())?;
    target.extend_from_slice(proxies);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::foundation::collections::SlotMap;

    /// Proxies over a set of boxes, one collider each
    pub fn proxies(boxes: &[(Vec3, Vec3, bool)]) -> Vec<Proxy> {
        let mut colliders: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let mut shapes: SlotMap<ShapeKey, ()> = SlotMap::with_key();
        boxes
            .iter()
            .map(|&(center, extents, active)| Proxy {
                shape: shapes.insert(()),
                collider: colliders.insert(()),
                aabb: AABB::from_center_extents(center, extents),
                active,
            })
            .collect()
    }

    /// Brute-force reference pair set
    pub fn brute_force_pairs(proxies: &[Proxy]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..proxies.len() {
            for j in (i + 1)..proxies.len() {
                if is_candidate(&proxies[i], &proxies[j]) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Run the shared broad-phase checks against a backend
    pub fn check_backend(backend: &mut dyn CollisionBackend) {
        let mut boxes = vec![
            (Vec3::new(0.0, -1.0, 0.0), Vec3::new(50.0, 1.0, 50.0), false),
            (Vec3::new(0.0, 0.9, 0.0), Vec3::repeat(1.0), true),
            (Vec3::new(3.0, 0.5, 0.0), Vec3::repeat(0.5), false),
            (Vec3::new(20.0, 5.0, 20.0), Vec3::repeat(0.5), true),
        ];
        // A crowd to force subdivision
        for i in 0..40 {
            let x = (i % 8) as f32 * 3.0 - 12.0;
            let z = (i / 8) as f32 * 3.0 - 7.5;
            boxes.push((Vec3::new(x, 10.0, z), Vec3::repeat(0.6), i % 2 == 0));
        }
        let proxies = proxies(&boxes);
        backend.rebuild(&proxies).expect("rebuild");
        assert_eq!(backend.proxies().len(), proxies.len());

        let mut pairs = Vec::new();
        backend.candidate_pairs(&mut pairs);
        let mut pairs: Vec<(usize, usize)> = pairs
            .into_iter()
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, brute_force_pairs(&proxies));
        // Ground against the resting ball; two sleepers never pair
        assert!(pairs.contains(&(0, 1)));
        assert!(!pairs.contains(&(0, 2)));

        let mut hits = Vec::new();
        backend.query_aabb(&AABB::from_center_extents(Vec3::new(20.0, 5.0, 20.0), Vec3::repeat(0.1)), &mut hits);
        assert_eq!(hits, vec![3]);

        hits.clear();
        backend.query_ray(&Vec3::new(3.0, 20.0, 0.0), &Vec3::new(0.0, -40.0, 0.0), 1.0, &mut hits);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 2]);
    }
}
