//! Vertex displacement stages.
//!
//! Each stage reads the positions produced by the previous one and returns a
//! fresh vertex buffer; the input buffer is never written. The only shared
//! mutable state is the [`CollisionSet`], which stages may grow but never
//! shrink.

use geometry::{Aabb, GeometryQuery, GeometryQueryError, MeshReader};
use glam::Vec3;
use pushback_config::{RAY_TOLERANCE, SMOOTH_FACTOR};
use tracing::trace;

use crate::culling::may_intersect;
use crate::falloff::FalloffCurveSource;
use crate::types::{CollisionSet, DeformableVertex, MeshSpace};

/// A collider as seen by one stage pass.
#[derive(Clone, Copy)]
pub struct ColliderPass<'a> {
    pub collider: &'a dyn GeometryQuery,
    pub bounds: Aabb,
}

/// Output of the penetration resolver for one collider.
#[derive(Debug, Default)]
pub struct ResolveResult {
    pub vertices: Vec<DeformableVertex>,
    /// Deepest penetration found against this collider, 0 if none
    pub max_penetration_depth: f32,
    /// Vertices moved out of the collider
    pub resolved: usize,
    /// Weighted vertices rejected by the bounding box
    pub culled: usize,
}

/// Output of the bulge stage for one collider.
#[derive(Debug, Default)]
pub struct BulgeResult {
    pub vertices: Vec<DeformableVertex>,
    /// Vertices displaced outward
    pub bulged: usize,
}

/// Parameters for the bulge stage.
#[derive(Debug, Clone, Copy)]
pub struct BulgeParams {
    /// Falloff distance in world units
    pub distance: f32,
    pub strength: f32,
    /// Deepest penetration found so far in this invocation
    pub max_penetration_depth: f32,
}

impl BulgeParams {
    /// Bulge runs only when something penetrated and both knobs are nonzero.
    pub fn is_active(&self) -> bool {
        self.max_penetration_depth != 0.0 && self.distance != 0.0 && self.strength != 0.0
    }
}

/// Push penetrating vertices back onto the collider surface.
///
/// A vertex is tested only if it has weight and lies in the collider's box.
/// A ray along its normal decides whether it is near or behind the surface;
/// the closest surface point and normal then decide the side. Vertices on
/// the inner side move toward the closest point by `weight * envelope`.
pub fn apply_resolver(
    vertices: &[DeformableVertex],
    pass: ColliderPass<'_>,
    space: &MeshSpace,
    envelope: f32,
    collisions: &mut CollisionSet,
) -> Result<ResolveResult, GeometryQueryError> {
    let mut result = ResolveResult {
        vertices: vertices.to_vec(),
        ..Default::default()
    };

    for (slot, vertex) in vertices.iter().enumerate() {
        if vertex.weight == 0.0 {
            continue;
        }

        let world = space.to_world(vertex.position);
        if !may_intersect(world, &pass.bounds) {
            result.culled += 1;
            continue;
        }

        if !pass
            .collider
            .ray_intersects_any(world, vertex.normal, RAY_TOLERANCE)?
        {
            continue;
        }

        let surface = pass.collider.closest_point(world)?;
        let delta = world - surface.position;
        if delta.dot(surface.normal) >= 0.0 {
            // Outside; the ray only hit a fold or the far side
            continue;
        }

        let distance = delta.length();
        result.max_penetration_depth = result.max_penetration_depth.max(distance);

        let resolved = world - delta * vertex.weight * envelope;
        result.vertices[slot].position = space.to_local(resolved);
        collisions.insert(vertex.index);
        result.resolved += 1;

        trace!(
            "resolve: vertex {} depth {:.5} -> {:?}",
            vertex.index, distance, resolved
        );
    }

    Ok(result)
}

/// Displace vertices near, but not inside, the collider along their own
/// normals to fake soft-tissue push-back.
///
/// Vertices already in `collisions` are left alone, as are vertices farther
/// than the bulge distance from the collider's box. The falloff curve is
/// sampled at the normalized surface distance.
pub fn apply_bulge<F: FalloffCurveSource + ?Sized>(
    vertices: &[DeformableVertex],
    pass: ColliderPass<'_>,
    params: &BulgeParams,
    falloff: &F,
    space: &MeshSpace,
    envelope: f32,
    collisions: &mut CollisionSet,
) -> Result<BulgeResult, GeometryQueryError> {
    let mut result = BulgeResult {
        vertices: vertices.to_vec(),
        ..Default::default()
    };
    if !params.is_active() {
        return Ok(result);
    }

    // Vertices within bulge reach may sit outside the collider's own box
    let reach = pass.bounds.expanded(params.distance);

    for (slot, vertex) in vertices.iter().enumerate() {
        if vertex.weight == 0.0 || collisions.contains(vertex.index) {
            continue;
        }

        let world = space.to_world(vertex.position);
        if !may_intersect(world, &reach) {
            continue;
        }

        let closest = pass.collider.closest_point_only(world)?;
        let distance = world.distance(closest);
        if distance >= params.distance {
            continue;
        }

        let t = distance / params.distance;
        let magnitude = params.max_penetration_depth
            * (1.0 - t)
            * falloff.evaluate(t)
            * params.strength
            * vertex.weight
            * envelope;
        if magnitude == 0.0 {
            continue;
        }

        let bulged = world + vertex.normal * magnitude;
        result.vertices[slot].position = space.to_local(bulged);
        collisions.insert(vertex.index);
        result.bulged += 1;

        trace!("bulge: vertex {} t {:.4} magnitude {:.5}", vertex.index, t, magnitude);
    }

    Ok(result)
}

/// Damp collision-set vertices toward the average of their rest-pose
/// neighbors.
///
/// The neighbor average is taken from `rest` (the undeformed input), so it is
/// the same target on every pass; each pass removes half of the remaining
/// offset (scaled by `envelope`). Vertices outside the set are copied
/// unchanged. Isolated vertices stay where they are.
pub fn apply_smoother<M: MeshReader + ?Sized>(
    vertices: &[DeformableVertex],
    rest: &M,
    collisions: &CollisionSet,
    iterations: u32,
    envelope: f32,
) -> Vec<DeformableVertex> {
    let mut current = vertices.to_vec();
    if iterations == 0 || collisions.is_empty() {
        return current;
    }

    let rest_positions = rest.positions();
    // Baseline per vertex, computed once
    let targets: Vec<Option<Vec3>> = current
        .iter()
        .map(|vertex| {
            collisions
                .contains(vertex.index)
                .then(|| neighbor_average(rest, rest_positions, vertex.index))
                .flatten()
        })
        .collect();

    for _ in 0..iterations {
        current = current
            .iter()
            .zip(&targets)
            .map(|(vertex, target)| match target {
                Some(average) => {
                    let offset = vertex.position - *average;
                    DeformableVertex {
                        position: vertex.position - offset * SMOOTH_FACTOR * envelope,
                        ..*vertex
                    }
                }
                None => *vertex,
            })
            .collect();
    }

    current
}

/// Mean rest position of a vertex's neighbors, `None` when it has none.
fn neighbor_average<M: MeshReader + ?Sized>(
    rest: &M,
    rest_positions: &[Vec3],
    index: usize,
) -> Option<Vec3> {
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for &neighbor in rest.adjacency(index) {
        if let Some(position) = rest_positions.get(neighbor) {
            sum += *position;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f32)
}
