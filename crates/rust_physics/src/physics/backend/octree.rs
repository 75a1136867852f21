//! Octree broad phase
//!
//! Divides space into a hierarchy of octants rebuilt every step. Each proxy
//! is stored in the deepest node whose bounds fully contain its AABB, so a
//! proxy can only overlap proxies in its own node, its ancestors, or its
//! descendants. Nodes subdivide when their proxy count exceeds a threshold.

use super::{copy_proxies, is_candidate, CollisionBackend, Proxy};
use crate::error::PhysicsResult;
use crate::foundation::bounds::AABB;
use crate::foundation::logging::trace;
use crate::foundation::math::Vec3;

/// Configuration for octree behavior
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// Maximum proxies per node before subdivision
    pub max_proxies_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node half size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_proxies_per_node: 8,
            max_depth: 8,
            min_node_size: 0.5,
        }
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Indices of proxies stored at this node
    pub proxies: Vec<usize>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            proxies: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn child_bounds(&self, octant: usize) -> AABB {
        // Octant bit 0 selects +X, bit 1 +Y, bit 2 +Z
        let center = self.bounds.center();
        let quarter = self.bounds.extents() * 0.5;
        let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
        let child_center = center + Vec3::new(quarter.x * sign(1), quarter.y * sign(2), quarter.z * sign(4));
        AABB::from_center_extents(child_center, quarter)
    }

    fn fitting_child(&self, aabb: &AABB) -> Option<usize> {
        let children = self.children.as_ref()?;
        children.iter().position(|child| child.bounds.contains(aabb))
    }

    /// Subdivide this node into 8 children and push down every proxy that fits
    fn subdivide(&mut self, all: &[Proxy]) {
        if self.children.is_some() {
            return;
        }
        let depth = self.depth + 1;
        self.children = Some(Box::new(std::array::from_fn(|octant| {
            OctreeNode::new(self.child_bounds(octant), depth)
        })));

        let stored = std::mem::take(&mut self.proxies);
        for index in stored {
            match self.fitting_child(&all[index].aabb) {
                Some(octant) => {
                    if let Some(children) = self.children.as_mut() {
                        children[octant].proxies.push(index);
                    }
                }
                None => self.proxies.push(index),
            }
        }
    }

    /// Insert a proxy into this node or the deepest child containing it
    pub fn insert(&mut self, index: usize, all: &[Proxy], config: &OctreeConfig) {
        let aabb = all[index].aabb;

        if self.is_leaf() {
            let should_subdivide = self.proxies.len() >= config.max_proxies_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().min() > config.min_node_size;
            if !should_subdivide {
                self.proxies.push(index);
                return;
            }
            self.subdivide(all);
        }

        match (self.fitting_child(&aabb), self.children.as_mut()) {
            (Some(octant), Some(children)) => children[octant].insert(index, all, config),
            _ => self.proxies.push(index),
        }
    }

    /// Report pairs among this subtree and against proxies held by ancestors
    fn collect_pairs(&self, all: &[Proxy], ancestors: &mut Vec<usize>, out: &mut Vec<(usize, usize)>) {
        for (i, &a) in self.proxies.iter().enumerate() {
            for &b in ancestors.iter().chain(&self.proxies[i + 1..]) {
                if is_candidate(&all[a], &all[b]) {
                    out.push((a.min(b), a.max(b)));
                }
            }
        }

        if let Some(children) = &self.children {
            let depth = ancestors.len();
            ancestors.extend_from_slice(&self.proxies);
            for child in children.iter() {
                child.collect_pairs(all, ancestors, out);
            }
            ancestors.truncate(depth);
        }
    }

    /// Query all proxies overlapping a region
    pub fn query_aabb(&self, region: &AABB, all: &[Proxy], results: &mut Vec<usize>) {
        if !self.bounds.intersects(region) {
            return;
        }
        results.extend(self.proxies.iter().copied().filter(|&i| all[i].aabb.intersects(region)));
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_aabb(region, all, results);
            }
        }
    }

    /// Query all proxies whose bounds a segment passes through
    pub fn query_ray(&self, origin: &Vec3, dir: &Vec3, max_t: f32, all: &[Proxy], results: &mut Vec<usize>) {
        // Node bounds fully contain their proxies, so a missed node culls the whole subtree
        if self.bounds.intersect_ray(*origin, *dir, max_t).is_none() {
            return;
        }
        results.extend(
            self.proxies
                .iter()
                .copied()
                .filter(|&i| all[i].aabb.intersect_ray(*origin, *dir, max_t).is_some()),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_ray(origin, dir, max_t, all, results);
            }
        }
    }

    /// Count proxies in this node and all children
    pub fn count_proxies(&self) -> usize {
        self.proxies.len()
            + self
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(OctreeNode::count_proxies).sum())
    }

    /// Deepest level in this subtree
    pub fn max_depth(&self) -> u32 {
        self.children
            .as_ref()
            .map_or(self.depth, |children| children.iter().map(OctreeNode::max_depth).max().unwrap_or(self.depth))
    }
}

/// Octree broad phase, rebuilt from scratch every step
#[derive(Debug, Clone)]
pub struct OctreeBackend {
    root: OctreeNode,
    config: OctreeConfig,
    proxies: Vec<Proxy>,
}

impl OctreeBackend {
    /// Create an empty octree backend
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(AABB::new(Vec3::zeros(), Vec3::zeros()), 0),
            config,
            proxies: Vec::new(),
        }
    }

    /// Root node of the current tree
    pub const fn root(&self) -> &OctreeNode {
        &self.root
    }
}

impl Default for OctreeBackend {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl CollisionBackend for OctreeBackend {
    fn name(&self) -> &'static str {
        "octree"
    }

    fn rebuild(&mut self, proxies: &[Proxy]) -> PhysicsResult<()> {
        copy_proxies(&mut self.proxies, proxies)?;

        // Cubic root bounds around everything, so every proxy fits somewhere
        let bounds = self
            .proxies
            .iter()
            .map(|p| p.aabb)
            .reduce(|a, b| a.merged(&b))
            .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));
        let half = bounds.extents().max() * 1.01 + 1.0e-3;
        self.root = OctreeNode::new(AABB::from_center_extents(bounds.center(), Vec3::repeat(half)), 0);

        for index in 0..self.proxies.len() {
            self.root.insert(index, &self.proxies, &self.config);
        }
        trace!(
            "octree rebuilt: {} proxies, depth {}",
            self.proxies.len(),
            self.root.max_depth()
        );
        Ok(())
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn candidate_pairs(&self, out: &mut Vec<(usize, usize)>) {
        let mut ancestors = Vec::new();
        self.root.collect_pairs(&self.proxies, &mut ancestors, out);
    }

    fn query_aabb(&self, region: &AABB, out: &mut Vec<usize>) {
        self.root.query_aabb(region, &self.proxies, out);
    }

    fn query_ray(&self, origin: &Vec3, dir: &Vec3, max_t: f32, out: &mut Vec<usize>) {
        self.root.query_ray(origin, dir, max_t, &self.proxies, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::backend::test_support;

    #[test]
    fn test_octree_matches_brute_force() {
        let mut backend = OctreeBackend::default();
        test_support::check_backend(&mut backend);
        assert!(backend.root().children.is_some());
    }

    #[test]
    fn test_octree_subdivision_keeps_every_proxy() {
        let config = OctreeConfig {
            max_proxies_per_node: 2,
            max_depth: 4,
            min_node_size: 0.1,
        };
        let mut backend = OctreeBackend::new(config);
        let boxes: Vec<_> = (0..30)
            .map(|i| (Vec3::new(i as f32 * 2.0, (i % 3) as f32, 0.0), Vec3::repeat(0.4), true))
            .collect();
        let proxies = test_support::proxies(&boxes);
        backend.rebuild(&proxies).expect("rebuild");
        assert_eq!(backend.root().count_proxies(), 30);
        assert!(backend.root().max_depth() > 0);
    }

    #[test]
    fn test_empty_rebuild() {
        let mut backend = OctreeBackend::default();
        backend.rebuild(&[]).expect("rebuild");
        let mut pairs = Vec::new();
        backend.candidate_pairs(&mut pairs);
        assert!(pairs.is_empty());
        let mut hits = Vec::new();
        backend.query_ray(&Vec3::zeros(), &Vec3::x(), 1.0, &mut hits);
        assert!(hits.is_empty());
    }
}
