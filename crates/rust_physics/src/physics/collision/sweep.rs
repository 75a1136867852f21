//! Linear shape casts
//!
//! Conservative sampling along the sweep finds the first overlapping step,
//! then bisection narrows the time of impact. Step length is a fraction of
//! the swept shape's smallest extent so thin shapes are not skipped.

use super::contact_gen::collide;
use super::overlaps;
use crate::foundation::math::{utils, Pose, Vec3};
use crate::physics::shape::ShapeGeometry;

const MAX_SAMPLES: usize = 512;
const BISECTION_STEPS: usize = 12;

/// First contact of a swept shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the translation travelled at impact, in `[0, 1]`
    pub fraction: f32,
    /// World-space contact position
    pub position: Vec3,
    /// Surface normal of the hit shape, facing the swept shape
    pub normal: Vec3,
}

/// Sweep `moving` from `start` along `translation` against a static shape
///
/// A shape that already overlaps at the start reports a hit at fraction 0
/// with the normal opposing the motion.
pub fn sweep(
    moving: &ShapeGeometry,
    start: &Pose,
    translation: &Vec3,
    target: &ShapeGeometry,
    target_pose: &Pose,
) -> Option<SweepHit> {
    let pose_at = |t: f32| Pose::new(start.position + translation * t, start.rotation);
    let backwards = -utils::normalize_or(translation, Vec3::y());

    if overlaps(moving, start, target, target_pose) {
        return Some(SweepHit {
            fraction: 0.0,
            position: start.position,
            normal: backwards,
        });
    }

    let length = translation.norm();
    if length < 1.0e-9 {
        return None;
    }
    let extents = moving.local_bounds().extents();
    let step = (0.5 * extents.min()).max(1.0e-3);
    let samples = ((length / step).ceil() as usize).clamp(1, MAX_SAMPLES);

    let mut previous = 0.0_f32;
    for i in 1..=samples {
        let t = i as f32 / samples as f32;
        if !overlaps(moving, &pose_at(t), target, target_pose) {
            previous = t;
            continue;
        }

        let (mut lo, mut hi) = (previous, t);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if overlaps(moving, &pose_at(mid), target, target_pose) {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let mut manifolds = Vec::new();
        collide(moving, &pose_at(hi), target, target_pose, 1.0e-3, &mut manifolds);
        let (normal, position) = manifolds
            .iter()
            .filter_map(|m| m.points().first().map(|p| (-m.normal, p.position)))
            .next()
            .unwrap_or((backwards, pose_at(hi).position));
        return Some(SweepHit {
            fraction: hi,
            position,
            normal,
        });
    }

    None
}
