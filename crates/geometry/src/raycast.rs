//! Ray-triangle intersection.
//!
//! Uses the Moller-Trumbore algorithm, with an optional tolerance that widens
//! the barycentric acceptance region so rays grazing a shared edge are not
//! lost between two triangles.

use glam::Vec3;

/// Epsilon for the parallel-ray and behind-origin rejections
const EPSILON: f32 = 1e-6;

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Moller-Trumbore ray-triangle intersection.
///
/// # Arguments
/// * `ray_origin` - Origin point of the ray
/// * `ray_dir` - Direction of the ray (t is in units of its length)
/// * `v0`, `v1`, `v2` - Triangle vertices
/// * `tolerance` - Slack applied to the barycentric bounds
///
/// # Returns
/// `Some(TriangleHit)` for a hit strictly in front of the origin, `None` otherwise
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    tolerance: f32,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray_dir.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in the triangle plane or the triangle is degenerate
    if det.abs() < EPSILON * EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray_origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if u < -tolerance || u > 1.0 + tolerance {
        return None;
    }

    let qvec = tvec.cross(edge1);

    let v = ray_dir.dot(qvec) * inv_det;
    if v < -tolerance || u + v > 1.0 + tolerance {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}
