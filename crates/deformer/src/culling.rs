//! Bounding-box culling.

use geometry::Aabb;
use glam::Vec3;

/// Whether a world-space point may touch the collider that owns `bounds`.
///
/// Runs before any ray or closest-point query. Inclusive: a point on the box
/// boundary may intersect.
pub fn may_intersect(point: Vec3, bounds: &Aabb) -> bool {
    bounds.contains_point(point)
}
