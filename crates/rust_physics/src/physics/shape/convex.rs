//! Convex hull shape
//!
//! The hull is built incrementally: start from a tetrahedron spanning the
//! point cloud, then insert each remaining point, replacing the faces it can
//! see with a fan to the horizon. Faces keep a consistent outward winding.

use super::mass::{self, MassData};
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::bounds::AABB;
use crate::foundation::math::Vec3;

/// Convex polyhedron with outward-wound triangular faces
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    // Unit outward normal and plane offset per face
    planes: Vec<(Vec3, f32)>,
    bounds: AABB,
}

impl ConvexHull {
    /// Build the hull of a point cloud
    ///
    /// Fails with `InvalidGeometry` for fewer than four points, non-finite
    /// coordinates, or a cloud with no volume.
    pub fn new(points: &[Vec3]) -> PhysicsResult<Self> {
        if points.len() < 4 {
            return Err(PhysicsError::geometry(format!(
                "convex hull needs at least 4 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(PhysicsError::geometry("convex hull points must be finite"));
        }

        let mut source = Vec::new();
        source.try_reserve_exact(points.len())?;
        source.extend_from_slice(points);

        let (verts, faces) = build_hull(&source)?;
        Ok(Self::from_parts(verts, faces))
    }

    fn from_parts(verts: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Self {
        // Keep only vertices referenced by a face
        let mut remap = vec![u32::MAX; verts.len()];
        let mut points = Vec::new();
        let mut compact = Vec::with_capacity(faces.len());
        for face in &faces {
            let mut out = [0_u32; 3];
            for (slot, &index) in out.iter_mut().zip(face) {
                if remap[index] == u32::MAX {
                    remap[index] = points.len() as u32;
                    points.push(verts[index]);
                }
                *slot = remap[index];
            }
            compact.push(out);
        }

        let planes = compact
            .iter()
            .map(|f| {
                let a = points[f[0] as usize];
                let n = (points[f[1] as usize] - a)
                    .cross(&(points[f[2] as usize] - a))
                    .normalize();
                (n, n.dot(&a))
            })
            .collect();
        let bounds = AABB::from_points(&points).unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));

        Self {
            points,
            faces: compact,
            planes,
            bounds,
        }
    }

    /// Hull vertices
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Hull faces as vertex index triples
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Local bounding box
    pub const fn local_bounds(&self) -> AABB {
        self.bounds
    }

    /// Farthest vertex along `dir`
    pub fn support(&self, dir: &Vec3) -> Vec3 {
        self.points
            .iter()
            .copied()
            .max_by(|a, b| a.dot(dir).total_cmp(&b.dot(dir)))
            .unwrap_or_else(Vec3::zeros)
    }

    /// Mass properties at `density`
    pub fn mass_data(&self, density: f32) -> MassData {
        mass::polyhedron(&self.points, &self.faces, density)
    }

    /// Whether `p` lies within `tolerance` of every face plane
    pub fn contains(&self, p: &Vec3, tolerance: f32) -> bool {
        self.planes.iter().all(|(n, d)| n.dot(p) - d <= tolerance)
    }

    /// Segment cast by clipping against every face plane
    pub fn ray_cast(&self, origin: &Vec3, dir: &Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let mut t_enter = 0.0_f32;
        let mut t_exit = max_t;
        let mut normal = None;
        for (n, d) in &self.planes {
            let dist = n.dot(origin) - d;
            let denom = n.dot(dir);
            if denom.abs() < 1.0e-12 {
                if dist > 0.0 {
                    return None;
                }
                continue;
            }
            let t = -dist / denom;
            if denom < 0.0 {
                if t > t_enter {
                    t_enter = t;
                    normal = Some(*n);
                }
            } else {
                t_exit = t_exit.min(t);
            }
            if t_enter > t_exit {
                return None;
            }
        }
        normal.map(|n| (t_enter, n))
    }
}

fn build_hull(points: &[Vec3]) -> PhysicsResult<(Vec<Vec3>, Vec<[usize; 3]>)> {
    let [i0, i1, i2, i3] = initial_tetrahedron(points)?;

    let mut verts = vec![points[i0], points[i1], points[i2], points[i3]];
    let interior = (verts[0] + verts[1] + verts[2] + verts[3]) * 0.25;
    let scale = AABB::from_points(points)
        .map_or(1.0, |b| b.extents().norm())
        .max(1.0e-6);
    let epsilon = scale * 1.0e-5;

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(32);
    for face in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
        faces.push(orient(&verts, face, &interior));
    }

    for (i, &point) in points.iter().enumerate() {
        if i == i0 || i == i1 || i == i2 || i == i3 {
            continue;
        }
        insert_point(&mut verts, &mut faces, point, &interior, epsilon);
    }

    Ok((verts, faces))
}

/// Wind a face so its normal points away from `interior`
fn orient(verts: &[Vec3], face: [usize; 3], interior: &Vec3) -> [usize; 3] {
    let a = verts[face[0]];
    let n = (verts[face[1]] - a).cross(&(verts[face[2]] - a));
    if n.dot(&(interior - a)) > 0.0 {
        [face[0], face[2], face[1]]
    } else {
        face
    }
}

fn initial_tetrahedron(points: &[Vec3]) -> PhysicsResult<[usize; 4]> {
    let degenerate = || PhysicsError::geometry("convex hull points are coplanar or coincident");

    // Extreme points along the axis of greatest spread
    let bounds = AABB::from_points(points).ok_or_else(degenerate)?;
    let spread = bounds.max - bounds.min;
    let axis = spread.imax();
    let (mut i0, mut i1) = (0, 0);
    for (i, p) in points.iter().enumerate() {
        if p[axis] < points[i0][axis] {
            i0 = i;
        }
        if p[axis] > points[i1][axis] {
            i1 = i;
        }
    }
    let scale = spread.norm();
    if scale < 1.0e-6 || i0 == i1 {
        return Err(degenerate());
    }

    // Farthest from the line
    let line = points[i1] - points[i0];
    let i2 = (0..points.len())
        .max_by(|&a, &b| {
            let da = line.cross(&(points[a] - points[i0])).norm_squared();
            let db = line.cross(&(points[b] - points[i0])).norm_squared();
            da.total_cmp(&db)
        })
        .ok_or_else(degenerate)?;
    let normal = line.cross(&(points[i2] - points[i0]));
    if normal.norm() < 1.0e-6 * scale * scale {
        return Err(degenerate());
    }

    // Farthest from the plane
    let i3 = (0..points.len())
        .max_by(|&a, &b| {
            let da = normal.dot(&(points[a] - points[i0])).abs();
            let db = normal.dot(&(points[b] - points[i0])).abs();
            da.total_cmp(&db)
        })
        .ok_or_else(degenerate)?;
    let height = normal.normalize().dot(&(points[i3] - points[i0])).abs();
    if height < 1.0e-5 * scale {
        return Err(degenerate());
    }

    Ok([i0, i1, i2, i3])
}

fn insert_point(verts: &mut Vec<Vec3>, faces: &mut Vec<[usize; 3]>, point: Vec3, interior: &Vec3, epsilon: f32) {
    let visible: Vec<bool> = faces
        .iter()
        .map(|f| {
            let a = verts[f[0]];
            let n = (verts[f[1]] - a).cross(&(verts[f[2]] - a));
            let len = n.norm();
            len > 0.0 && n.dot(&(point - a)) / len > epsilon
        })
        .collect();

    if !visible.iter().any(|&v| v) {
        return;
    }

    // Horizon: edges of visible faces whose twin belongs to a hidden face
    let mut horizon = Vec::new();
    for (face, _) in faces.iter().zip(&visible).filter(|(_, seen)| **seen) {
        for k in 0..3 {
            let (e0, e1) = (face[k], face[(k + 1) % 3]);
            let twin_visible = faces.iter().zip(&visible).any(|(other, seen)| {
                *seen && (0..3).any(|m| other[m] == e1 && other[(m + 1) % 3] == e0)
            });
            if !twin_visible {
                horizon.push((e0, e1));
            }
        }
    }

    let mut keep = visible.iter().map(|v| !v);
    faces.retain(|_| keep.next().unwrap_or(true));

    let new_index = verts.len();
    verts.push(point);
    for (e0, e1) in horizon {
        faces.push(orient(verts, [e0, e1, new_index], interior));
    }
}
