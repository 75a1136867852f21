//! Heightfield terrain shape
//!
//! A square grid of `samples x samples` heights centered on the local
//! origin. `horizontal_scale` is the full width of the grid along X and Z;
//! heights are multiplied by `vertical_scale`. Sample `(ix, iz)` lives at
//! index `iz * samples + ix`. Terrain is static geometry and has no mass.

use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::bounds::AABB;
use crate::foundation::math::Vec3;
use crate::physics::collision::primitives::Triangle;

use super::mesh::nearest_triangle_hit;

/// Heightfield terrain
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    heights: Vec<f32>,
    samples: usize,
    horizontal_scale: f32,
    vertical_scale: f32,
    bounds: AABB,
}

impl Terrain {
    /// Take ownership of a square height grid
    pub fn new(heights: Vec<f32>, samples: usize, horizontal_scale: f32, vertical_scale: f32) -> PhysicsResult<Self> {
        if samples < 2 {
            return Err(PhysicsError::geometry(format!(
                "terrain needs at least 2x2 samples, got {samples}"
            )));
        }
        let expected = samples
            .checked_mul(samples)
            .ok_or_else(|| PhysicsError::geometry("terrain sample count overflows"))?;
        if heights.len() != expected {
            return Err(PhysicsError::geometry(format!(
                "terrain expects {expected} heights, got {}",
                heights.len()
            )));
        }
        for (name, value) in [("horizontal scale", horizontal_scale), ("vertical scale", vertical_scale)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PhysicsError::geometry(format!(
                    "terrain {name} must be positive and finite, got {value}"
                )));
            }
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(PhysicsError::geometry("terrain heights must be finite"));
        }

        let (lo, hi) = heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        let half = 0.5 * horizontal_scale;
        let bounds = AABB::new(
            Vec3::new(-half, lo * vertical_scale, -half),
            Vec3::new(half, hi * vertical_scale, half),
        );

        Ok(Self {
            heights,
            samples,
            horizontal_scale,
            vertical_scale,
            bounds,
        })
    }

    /// Sample `height(x, z)` in local units on a grid
    pub fn from_fn<F>(samples: usize, horizontal_scale: f32, vertical_scale: f32, mut height: F) -> PhysicsResult<Self>
    where
        F: FnMut(f32, f32) -> f32,
    {
        let count = samples
            .checked_mul(samples)
            .ok_or_else(|| PhysicsError::geometry("terrain sample count overflows"))?;
        let mut heights = Vec::new();
        heights.try_reserve_exact(count)?;
        let step = horizontal_scale / (samples.max(2) - 1) as f32;
        let half = 0.5 * horizontal_scale;
        for iz in 0..samples {
            for ix in 0..samples {
                heights.push(height(-half + ix as f32 * step, -half + iz as f32 * step));
            }
        }
        Self::new(heights, samples, horizontal_scale, vertical_scale)
    }

    /// Samples per side
    pub const fn samples(&self) -> usize {
        self.samples
    }

    /// Full width along X and Z
    pub const fn horizontal_scale(&self) -> f32 {
        self.horizontal_scale
    }

    /// Height multiplier
    pub const fn vertical_scale(&self) -> f32 {
        self.vertical_scale
    }

    /// Raw height samples
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Local bounding box
    pub const fn local_bounds(&self) -> AABB {
        self.bounds
    }

    fn cell_size(&self) -> f32 {
        self.horizontal_scale / (self.samples - 1) as f32
    }

    fn vertex(&self, ix: usize, iz: usize) -> Vec3 {
        let half = 0.5 * self.horizontal_scale;
        let cell = self.cell_size();
        Vec3::new(
            -half + ix as f32 * cell,
            self.heights[iz * self.samples + ix] * self.vertical_scale,
            -half + iz as f32 * cell,
        )
    }

    /// The two upward-facing triangles of cell `(ix, iz)`
    pub fn cell_triangles(&self, ix: usize, iz: usize) -> [Triangle; 2] {
        let a = self.vertex(ix, iz);
        let b = self.vertex(ix + 1, iz);
        let c = self.vertex(ix, iz + 1);
        let d = self.vertex(ix + 1, iz + 1);
        [Triangle::new(a, c, b), Triangle::new(b, c, d)]
    }

    // Inclusive cell index range covering [lo, hi] along one horizontal axis
    fn cell_range(&self, lo: f32, hi: f32) -> Option<(usize, usize)> {
        let half = 0.5 * self.horizontal_scale;
        let cells = self.samples - 1;
        if hi < -half || lo > half {
            return None;
        }
        let cell = self.cell_size();
        let to_index = |v: f32| (((v + half) / cell).floor().max(0.0) as usize).min(cells - 1);
        Some((to_index(lo), to_index(hi)))
    }

    /// Push the triangles of every cell overlapping `region` (terrain frame)
    pub fn triangles_in(&self, region: &AABB, out: &mut Vec<Triangle>) {
        if !self.bounds.intersects(region) {
            return;
        }
        let (Some((x0, x1)), Some((z0, z1))) = (
            self.cell_range(region.min.x, region.max.x),
            self.cell_range(region.min.z, region.max.z),
        ) else {
            return;
        };
        for iz in z0..=z1 {
            for ix in x0..=x1 {
                for tri in self.cell_triangles(ix, iz) {
                    if tri.aabb().intersects(region) {
                        out.push(tri);
                    }
                }
            }
        }
    }

    /// Interpolated surface height at local `(x, z)`, `None` off the grid
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let half = 0.5 * self.horizontal_scale;
        if !(-half..=half).contains(&x) || !(-half..=half).contains(&z) {
            return None;
        }
        let (ix, _) = self.cell_range(x, x)?;
        let (iz, _) = self.cell_range(z, z)?;
        let cell = self.cell_size();
        let fx = (x + half) / cell - ix as f32;
        let fz = (z + half) / cell - iz as f32;
        let h = |dx: usize, dz: usize| self.heights[(iz + dz) * self.samples + ix + dx] * self.vertical_scale;
        let y = if fx + fz <= 1.0 {
            h(0, 0) + (h(1, 0) - h(0, 0)) * fx + (h(0, 1) - h(0, 0)) * fz
        } else {
            h(1, 1) + (h(0, 1) - h(1, 1)) * (1.0 - fx) + (h(1, 0) - h(1, 1)) * (1.0 - fz)
        };
        Some(y)
    }

    /// Farthest bounding-box corner along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        let b = &self.bounds;
        Vec3::new(
            if dir.x >= 0.0 { b.max.x } else { b.min.x },
            if dir.y >= 0.0 { b.max.y } else { b.min.y },
            if dir.z >= 0.0 { b.max.z } else { b.min.z },
        )
    }

    /// Nearest surface hit along the segment
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let end = origin + dir * max_t;
        let region = AABB::new(origin.inf(&end), origin.sup(&end));
        let mut tris = Vec::new();
        self.triangles_in(&region, &mut tris);
        nearest_triangle_hit(tris, origin, dir, max_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert!(Terrain::new(vec![0.0; 4], 1, 1.0, 1.0).is_err());
        assert!(Terrain::new(vec![0.0; 5], 2, 1.0, 1.0).is_err());
        assert!(Terrain::new(vec![0.0; 4], 2, 0.0, 1.0).is_err());
        assert!(Terrain::new(vec![0.0, f32::NAN, 0.0, 0.0], 2, 1.0, 1.0).is_err());
        assert!(Terrain::new(vec![0.0; 4], 2, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_slope_height() {
        // Height rises with x: h = x + 5 on a 10 m grid
        let terrain = Terrain::from_fn(11, 10.0, 1.0, |x, _| x + 5.0).expect("valid");
        assert_relative_eq!(terrain.height_at(0.0, 0.0).expect("on grid"), 5.0, epsilon = 1e-4);
        assert_relative_eq!(terrain.height_at(2.5, -1.3).expect("on grid"), 7.5, epsilon = 1e-4);
        assert!(terrain.height_at(6.0, 0.0).is_none());
        assert_relative_eq!(terrain.local_bounds().max.y, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_from_above() {
        let terrain = Terrain::new(vec![1.0; 9], 3, 4.0, 2.0).expect("valid");
        let (t, n) = terrain
            .ray_cast(&Vec3::new(0.5, 10.0, -0.5), &Vec3::new(0.0, -20.0, 0.0), 1.0)
            .expect("hit");
        assert_relative_eq!(10.0 - 20.0 * t, 2.0, epsilon = 1e-5);
        assert_relative_eq!(n, Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_cell_triangles_face_up() {
        let terrain = Terrain::new(vec![0.0; 4], 2, 2.0, 1.0).expect("valid");
        for tri in terrain.cell_triangles(0, 0) {
            assert_relative_eq!(tri.normal(), Vec3::y(), epsilon = 1e-6);
        }
    }
}
