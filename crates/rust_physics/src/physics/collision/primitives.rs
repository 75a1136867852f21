//! Triangle primitive shared by meshes, terrain and the narrow phase
//!
//! Provides the closest-point and segment intersection routines the mesh
//! and heightfield shapes are built on.

use crate::foundation::bounds::AABB;
use crate::foundation::math::Vec3;

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Vertices as an array
    pub const fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Unnormalized normal (right-hand rule); its length is twice the area
    pub fn scaled_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Calculates the normal of the triangle (right-hand rule)
    ///
    /// Degenerate triangles report +Y.
    pub fn normal(&self) -> Vec3 {
        let n = self.scaled_normal();
        let len = n.norm();
        if len > 1.0e-12 {
            n / len
        } else {
            Vec3::y()
        }
    }

    /// Whether the triangle has (numerically) zero area
    pub fn is_degenerate(&self) -> bool {
        self.scaled_normal().norm_squared() < 1.0e-20
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Bounding box of the three vertices
    pub fn aabb(&self) -> AABB {
        AABB::new(
            self.v0.inf(&self.v1).inf(&self.v2),
            self.v0.sup(&self.v1).sup(&self.v2),
        )
    }

    /// Farthest vertex along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        let d0 = self.v0.dot(dir);
        let d1 = self.v1.dot(dir);
        let d2 = self.v2.dot(dir);
        if d0 >= d1 && d0 >= d2 {
            self.v0
        } else if d1 >= d2 {
            self.v1
        } else {
            self.v2
        }
    }

    /// Möller-Trumbore segment intersection, double sided
    ///
    /// Tests `origin + t * dir` for `t` in `[0, max_t]` and returns `t`.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_segment(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<f32> {
        const EPSILON: f32 = 1.0e-9;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = dir.cross(&edge2);
        let a = edge1.dot(&h);

        // Segment parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * dir.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (0.0..=max_t).contains(&t).then_some(t)
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);

        // Vertex region outside v0
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.v0;
        }

        // Vertex region outside v1
        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.v1;
        }

        // Vertex region outside v2
        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.v2;
        }

        // Edge regions
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v_val = d1 / (d1 - d3);
            return self.v0 + edge1 * v_val;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.v0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.v1 + (self.v2 - self.v1) * w;
        }

        // Inside the face
        let denom = 1.0 / (va + vb + vc);
        let v_val = vb * denom;
        let w = vc * denom;
        self.v0 + edge1 * v_val + edge2 * w
    }

    /// Signed distance from a point to the triangle plane
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal().dot(&(point - self.v0))
    }
}

/// Closest points between segments `p1-q1` and `p2-q2`
///
/// Returns the pair `(on_first, on_second)`.
pub fn closest_points_segments(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (Vec3, Vec3) {
    const EPSILON: f32 = 1.0e-9;
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// Closest point on segment `a-b` to `p`
pub fn closest_point_segment(a: &Vec3, b: &Vec3, p: &Vec3) -> Vec3 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1.0e-12 {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}
