//! GJK intersection test and EPA penetration depth
//!
//! Both work on support mappings of the Minkowski difference `A - B`. Every
//! simplex and polytope vertex keeps the pair of support points it came from,
//! so EPA can report witness points on both shapes.

use crate::foundation::math::{utils, Vec3};

/// Anything with a support function in world space
pub trait SupportMap {
    /// Farthest point of the shape along `dir`
    fn support(&self, dir: &Vec3) -> Vec3;
}

impl<T: SupportMap + ?Sized> SupportMap for &T {
    fn support(&self, dir: &Vec3) -> Vec3 {
        (**self).support(dir)
    }
}

/// A support map grown by a uniform margin (Minkowski sum with a ball)
#[derive(Debug, Clone, Copy)]
pub struct Inflated<S> {
    /// Wrapped shape
    pub inner: S,
    /// Radius of the added ball
    pub margin: f32,
}

impl<S: SupportMap> SupportMap for Inflated<S> {
    fn support(&self, dir: &Vec3) -> Vec3 {
        self.inner.support(dir) + utils::normalize_or(dir, Vec3::zeros()) * self.margin
    }
}

/// Vertex of the Minkowski difference with its originating support points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    /// `a - b`
    pub v: Vec3,
    /// Support point on A
    pub a: Vec3,
    /// Support point on B
    pub b: Vec3,
}

fn minkowski_support<A: SupportMap, B: SupportMap>(a: &A, b: &B, dir: &Vec3) -> SupportPoint {
    let pa = a.support(dir);
    let pb = b.support(&-dir);
    SupportPoint { v: pa - pb, a: pa, b: pb }
}

/// GJK simplex, newest point first
#[derive(Debug, Clone)]
pub struct Simplex {
    points: [SupportPoint; 4],
    size: usize,
}

impl Simplex {
    fn new() -> Self {
        let zero = SupportPoint {
            v: Vec3::zeros(),
            a: Vec3::zeros(),
            b: Vec3::zeros(),
        };
        Self {
            points: [zero; 4],
            size: 0,
        }
    }

    fn push(&mut self, point: SupportPoint) {
        for i in (1..4).rev() {
            self.points[i] = self.points[i - 1];
        }
        self.points[0] = point;
        self.size = (self.size + 1).min(4);
    }

    fn set(&mut self, points: &[SupportPoint]) {
        for (slot, p) in self.points.iter_mut().zip(points) {
            *slot = *p;
        }
        self.size = points.len().min(4);
    }

    /// Current vertices
    pub fn points(&self) -> &[SupportPoint] {
        &self.points[..self.size]
    }
}

/// Boolean GJK: returns the enclosing simplex when A and B intersect
pub fn gjk<A: SupportMap, B: SupportMap>(a: &A, b: &B) -> Option<Simplex> {
    const MAX_ITERATIONS: usize = 64;

    let mut simplex = Simplex::new();
    let first = minkowski_support(a, b, &Vec3::x());
    simplex.push(first);
    let mut direction = -first.v;

    for _ in 0..MAX_ITERATIONS {
        if direction.norm_squared() < 1.0e-12 {
            // Origin lies on the simplex
            return Some(simplex);
        }

        let point = minkowski_support(a, b, &direction);
        if point.v.dot(&direction) < 0.0 {
            return None;
        }

        simplex.push(point);
        if do_simplex(&mut simplex, &mut direction) {
            return Some(simplex);
        }
    }

    None
}

/// Whether two support maps overlap
pub fn intersects<A: SupportMap, B: SupportMap>(a: &A, b: &B) -> bool {
    gjk(a, b).is_some()
}

fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.size {
        2 => do_simplex_line(simplex, direction),
        3 => do_simplex_triangle(simplex, direction),
        4 => do_simplex_tetrahedron(simplex, direction),
        _ => false,
    }
}

fn do_simplex_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [a, b, ..] = simplex.points;
    let ab = b.v - a.v;
    let ao = -a.v;

    if ab.dot(&ao) > 0.0 {
        *direction = ab.cross(&ao).cross(&ab);
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }
    false
}

fn do_simplex_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [a, b, c, _] = simplex.points;
    let ab = b.v - a.v;
    let ac = c.v - a.v;
    let ao = -a.v;
    let abc = ab.cross(&ac);

    if abc.cross(&ac).dot(&ao) > 0.0 {
        if ac.dot(&ao) > 0.0 {
            simplex.set(&[a, c]);
            *direction = ac.cross(&ao).cross(&ac);
        } else {
            simplex.set(&[a, b]);
            return do_simplex_line(simplex, direction);
        }
    } else if ab.cross(&abc).dot(&ao) > 0.0 {
        simplex.set(&[a, b]);
        return do_simplex_line(simplex, direction);
    } else if abc.dot(&ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.set(&[a, c, b]);
        *direction = -abc;
    }
    false
}

fn do_simplex_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let [a, b, c, d] = simplex.points;
    let ab = b.v - a.v;
    let ac = c.v - a.v;
    let ad = d.v - a.v;
    let ao = -a.v;

    if ab.cross(&ac).dot(&ao) > 0.0 {
        simplex.set(&[a, b, c]);
        return do_simplex_triangle(simplex, direction);
    }
    if ac.cross(&ad).dot(&ao) > 0.0 {
        simplex.set(&[a, c, d]);
        return do_simplex_triangle(simplex, direction);
    }
    if ad.cross(&ab).dot(&ao) > 0.0 {
        simplex.set(&[a, d, b]);
        return do_simplex_triangle(simplex, direction);
    }
    true
}

/// Penetration of A into B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from A towards B
    pub normal: Vec3,
    /// Overlap distance along the normal
    pub depth: f32,
    /// Deepest point of A inside B
    pub point_a: Vec3,
    /// Deepest point of B inside A
    pub point_b: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct EpaFace {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

fn make_face(vertices: &[SupportPoint], [i, j, k]: [usize; 3], interior: &Vec3) -> Option<EpaFace> {
    let a = vertices[i].v;
    let n = (vertices[j].v - a).cross(&(vertices[k].v - a));
    let len = n.norm();
    if len < 1.0e-12 {
        return None;
    }
    let mut normal = n / len;
    let mut indices = [i, j, k];
    if normal.dot(&(a - interior)) < 0.0 {
        normal = -normal;
        indices = [i, k, j];
    }
    Some(EpaFace {
        indices,
        normal,
        distance: normal.dot(&a).max(0.0),
    })
}

// Grow a lower-dimensional GJK simplex into a tetrahedron with volume
fn complete_tetrahedron<A: SupportMap, B: SupportMap>(a: &A, b: &B, simplex: &Simplex) -> Option<Vec<SupportPoint>> {
    const SEPARATION: f32 = 1.0e-6;

    let mut vertices: Vec<SupportPoint> = simplex.points().to_vec();

    if vertices.len() == 1 {
        let origin = vertices[0].v;
        let axes = [Vec3::x(), -Vec3::x(), Vec3::y(), -Vec3::y(), Vec3::z(), -Vec3::z()];
        let p = axes
            .iter()
            .map(|dir| minkowski_support(a, b, dir))
            .find(|p| (p.v - origin).norm() > SEPARATION)?;
        vertices.push(p);
    }

    if vertices.len() == 2 {
        let base = vertices[0].v;
        let line = utils::normalize_or(&(vertices[1].v - base), Vec3::x());
        let (t1, t2) = utils::orthonormal_basis(&line);
        let p = [t1, -t1, t2, -t2]
            .iter()
            .map(|dir| minkowski_support(a, b, dir))
            .find(|p| {
                let rel = p.v - base;
                (rel - line * rel.dot(&line)).norm() > SEPARATION
            })?;
        vertices.push(p);
    }

    if vertices.len() == 3 {
        let base = vertices[0].v;
        let n = (vertices[1].v - base).cross(&(vertices[2].v - base));
        let n = utils::normalize_or(&n, Vec3::y());
        let p = [n, -n]
            .iter()
            .map(|dir| minkowski_support(a, b, dir))
            .find(|p| (p.v - base).dot(&n).abs() > SEPARATION)?;
        vertices.push(p);
    }

    Some(vertices)
}

/// Expanding polytope: penetration depth and witness points of an overlap
///
/// `simplex` must come from a successful [`gjk`] call on the same pair.
pub fn epa<A: SupportMap, B: SupportMap>(a: &A, b: &B, simplex: &Simplex) -> Option<Penetration> {
    const MAX_ITERATIONS: usize = 64;
    const TOLERANCE: f32 = 1.0e-4;

    let mut vertices = complete_tetrahedron(a, b, simplex)?;
    let interior = vertices.iter().map(|p| p.v).sum::<Vec3>() / vertices.len() as f32;

    let mut faces: Vec<EpaFace> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .into_iter()
        .filter_map(|idx| make_face(&vertices, idx, &interior))
        .collect();
    if faces.len() < 4 {
        return None;
    }

    let mut closest = faces[0];
    for _ in 0..MAX_ITERATIONS {
        closest = *faces
            .iter()
            .min_by(|x, y| x.distance.total_cmp(&y.distance))?;

        let support = minkowski_support(a, b, &closest.normal);
        let distance = support.v.dot(&closest.normal);
        if distance - closest.distance < TOLERANCE {
            break;
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        faces.retain(|face| {
            let visible = face.normal.dot(&(support.v - vertices[face.indices[0]].v)) > 0.0;
            if visible {
                for i in 0..3 {
                    let edge = (face.indices[i], face.indices[(i + 1) % 3]);
                    if let Some(pos) = edges.iter().position(|&e| e == (edge.1, edge.0)) {
                        edges.swap_remove(pos);
                    } else {
                        edges.push(edge);
                    }
                }
            }
            !visible
        });
        if edges.is_empty() {
            break;
        }

        let new_index = vertices.len();
        vertices.push(support);
        faces.extend(
            edges
                .into_iter()
                .filter_map(|(i, j)| make_face(&vertices, [i, j, new_index], &interior)),
        );
        if faces.is_empty() {
            break;
        }
    }

    let [i, j, k] = closest.indices;
    let (u, v, w) = barycentric(
        &(closest.normal * closest.distance),
        &vertices[i].v,
        &vertices[j].v,
        &vertices[k].v,
    );
    Some(Penetration {
        normal: closest.normal,
        depth: closest.distance,
        point_a: vertices[i].a * u + vertices[j].a * v + vertices[k].a * w,
        point_b: vertices[i].b * u + vertices[j].b * v + vertices[k].b * w,
    })
}

fn barycentric(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1.0e-12 {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Ball {
        center: Vec3,
        radius: f32,
    }

    impl SupportMap for Ball {
        fn support(&self, dir: &Vec3) -> Vec3 {
            self.center + utils::normalize_or(dir, Vec3::x()) * self.radius
        }
    }

    struct Block {
        center: Vec3,
        half: Vec3,
    }

    impl SupportMap for Block {
        fn support(&self, dir: &Vec3) -> Vec3 {
            self.center + Vec3::from_fn(|i, _| self.half[i].copysign(dir[i]))
        }
    }

    #[test]
    fn test_separated_balls() {
        let a = Ball { center: Vec3::zeros(), radius: 1.0 };
        let b = Ball { center: Vec3::new(3.0, 0.0, 0.0), radius: 1.0 };
        assert!(!intersects(&a, &b));
    }

    #[test]
    fn test_overlapping_balls_depth() {
        let a = Ball { center: Vec3::zeros(), radius: 1.0 };
        let b = Ball { center: Vec3::new(1.5, 0.0, 0.0), radius: 1.0 };
        let simplex = gjk(&a, &b).expect("overlap");
        let pen = epa(&a, &b, &simplex).expect("penetration");
        assert_relative_eq!(pen.depth, 0.5, epsilon = 1e-2);
        assert_relative_eq!(pen.normal, Vec3::x(), epsilon = 1e-2);
    }

    #[test]
    fn test_box_resting_penetration() {
        let ground = Block { center: Vec3::new(0.0, -1.0, 0.0), half: Vec3::new(10.0, 1.0, 10.0) };
        let crate_box = Block { center: Vec3::new(0.3, 0.4, -0.2), half: Vec3::new(0.5, 0.5, 0.5) };
        let simplex = gjk(&crate_box, &ground).expect("overlap");
        let pen = epa(&crate_box, &ground, &simplex).expect("penetration");
        assert_relative_eq!(pen.depth, 0.1, epsilon = 1e-3);
        assert_relative_eq!(pen.normal, -Vec3::y(), epsilon = 1e-3);
    }

    #[test]
    fn test_inflated_margin_detects_near_contact() {
        let a = Block { center: Vec3::new(0.0, 1.01, 0.0), half: Vec3::repeat(1.0) };
        let b = Block { center: Vec3::new(0.0, -1.0, 0.0), half: Vec3::new(5.0, 1.0, 5.0) };
        assert!(!intersects(&a, &b));
        let inflated = Inflated { inner: &a, margin: 0.02 };
        let simplex = gjk(&inflated, &b).expect("overlap within margin");
        let pen = epa(&inflated, &b, &simplex).expect("penetration");
        assert_relative_eq!(0.02 - pen.depth, 0.01, epsilon = 1e-3);
    }
}
