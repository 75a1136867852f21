//! Sweep-and-prune broad phase
//!
//! Proxies are sorted by the minimum X of their bounds; a single sweep keeps
//! the set of intervals still open along X and tests only those.

use super::{copy_proxies, is_candidate, CollisionBackend, Proxy};
use crate::error::PhysicsResult;
use crate::foundation::bounds::AABB;
use crate::foundation::logging::trace;
use crate::foundation::math::Vec3;

/// Single-axis sweep and prune
#[derive(Debug, Clone, Default)]
pub struct SweepAndPruneBackend {
    proxies: Vec<Proxy>,
    // Proxy indices sorted by aabb.min.x
    order: Vec<usize>,
}

impl SweepAndPruneBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    // Sorted positions whose min.x does not exceed `max_x`
    fn prefix_until(&self, max_x: f32) -> &[usize] {
        let end = self
            .order
            .partition_point(|&i| self.proxies[i].aabb.min.x <= max_x);
        &self.order[..end]
    }
}

impl CollisionBackend for SweepAndPruneBackend {
    fn name(&self) -> &'static str {
        "sweep-and-prune"
    }

    fn rebuild(&mut self, proxies: &[Proxy]) -> PhysicsResult<()> {
        copy_proxies(&mut self.proxies, proxies)?;
        self.order.clear();
        self.order.try_reserve(proxies.len())?;
        self.order.extend(0..proxies.len());
        let all = &self.proxies;
        // Stable sort keeps equal keys in insertion order
        self.order
            .sort_by(|&a, &b| all[a].aabb.min.x.total_cmp(&all[b].aabb.min.x));
        trace!("sweep-and-prune rebuilt: {} proxies", self.proxies.len());
        Ok(())
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn candidate_pairs(&self, out: &mut Vec<(usize, usize)>) {
        let mut open: Vec<usize> = Vec::new();
        for &index in &self.order {
            let proxy = &self.proxies[index];
            open.retain(|&other| self.proxies[other].aabb.max.x >= proxy.aabb.min.x);
            for &other in &open {
                if is_candidate(proxy, &self.proxies[other]) {
                    out.push((index.min(other), index.max(other)));
                }
            }
            open.push(index);
        }
    }

    fn query_aabb(&self, region: &AABB, out: &mut Vec<usize>) {
        out.extend(
            self.prefix_until(region.max.x)
                .iter()
                .copied()
                .filter(|&i| self.proxies[i].aabb.intersects(region)),
        );
    }

    fn query_ray(&self, origin: &Vec3, dir: &Vec3, max_t: f32, out: &mut Vec<usize>) {
        let end = origin + dir * max_t;
        out.extend(
            self.prefix_until(origin.x.max(end.x))
                .iter()
                .copied()
                .filter(|&i| self.proxies[i].aabb.intersect_ray(*origin, *dir, max_t).is_some()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::backend::test_support;

    #[test]
    fn test_sweep_matches_brute_force() {
        let mut backend = SweepAndPruneBackend::new();
        test_support::check_backend(&mut backend);
    }

    #[test]
    fn test_touching_intervals_pair() {
        let mut backend = SweepAndPruneBackend::new();
        let proxies = test_support::proxies(&[
            (Vec3::new(0.0, 0.0, 0.0), Vec3::repeat(1.0), true),
            (Vec3::new(2.0, 0.0, 0.0), Vec3::repeat(1.0), false),
            (Vec3::new(4.5, 0.0, 0.0), Vec3::repeat(1.0), true),
        ]);
        backend.rebuild(&proxies).expect("rebuild");
        let mut pairs = Vec::new();
        backend.candidate_pairs(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }
}
