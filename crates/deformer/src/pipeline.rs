//! Deformer pipeline orchestration.
//!
//! One invocation runs, in order:
//! 1. Envelope check (zero envelope passes the mesh through untouched)
//! 2. Per active collider, in registry order: cull → resolve → bulge
//! 3. Boundary smoothing over the collision set
//! 4. Commit of the final local-space positions
//!
//! Colliders are composed sequentially, so a later collider sees the
//! positions produced by the earlier ones and registry order is observable in
//! the result.

use geometry::MeshReader;
use glam::{Affine3A, Vec3};
use pushback_config::DeformerConfig;
use tracing::{debug, trace, warn};

use crate::deformation::{BulgeParams, ColliderPass, apply_bulge, apply_resolver, apply_smoother};
use crate::error::DeformError;
use crate::falloff::{FalloffCurve, FalloffCurveSource};
use crate::registry::ColliderRegistry;
use crate::types::{CollisionSet, DeformStats, DeformableVertex, MeshSpace};
use crate::weights::{WeightSource, sanitize};

/// Everything the host hands over for one invocation.
pub struct DeformInput<'a> {
    /// Deformable mesh in its rest pose (local space)
    pub mesh: &'a dyn MeshReader,
    pub weights: &'a dyn WeightSource,
    pub colliders: &'a ColliderRegistry<'a>,
    /// Transform of the deformable mesh, local to world
    pub local_to_world: Affine3A,
}

impl<'a> DeformInput<'a> {
    /// Input with an identity transform.
    pub fn new(
        mesh: &'a dyn MeshReader,
        weights: &'a dyn WeightSource,
        colliders: &'a ColliderRegistry<'a>,
    ) -> Self {
        Self {
            mesh,
            weights,
            colliders,
            local_to_world: Affine3A::IDENTITY,
        }
    }

    pub fn with_transform(mut self, local_to_world: Affine3A) -> Self {
        self.local_to_world = local_to_world;
        self
    }
}

/// Result of one invocation.
#[derive(Debug, Clone)]
pub struct DeformOutput {
    /// Final positions in local space, same length and order as the input
    pub positions: Vec<Vec3>,
    /// Vertices moved by the resolver or the bulge stage
    pub collision_set: CollisionSet,
    /// Transform the positions are expressed against, unchanged from input
    pub local_to_world: Affine3A,
    pub stats: DeformStats,
}

impl DeformOutput {
    fn passthrough(positions: &[Vec3], local_to_world: Affine3A) -> Self {
        Self {
            positions: positions.to_vec(),
            collision_set: CollisionSet::new(),
            local_to_world,
            stats: DeformStats::default(),
        }
    }
}

/// Collision deformer: pushes a mesh out of its colliders, bulges the
/// surrounding skin and smooths the boundary.
///
/// Holds no per-invocation state, so one deformer can be evaluated any number
/// of times. The falloff curve is fixed once the deformer exists.
#[derive(Debug, Clone)]
pub struct CollisionDeformer<F: FalloffCurveSource = FalloffCurve> {
    config: DeformerConfig,
    falloff: F,
}

impl CollisionDeformer<FalloffCurve> {
    /// Create a deformer with the default falloff curve.
    pub fn new(config: DeformerConfig) -> Self {
        Self::with_falloff(config, FalloffCurve::default())
    }
}

impl Default for CollisionDeformer<FalloffCurve> {
    fn default() -> Self {
        Self::new(DeformerConfig::default())
    }
}

impl<F: FalloffCurveSource> CollisionDeformer<F> {
    /// Create a deformer with an authored falloff curve.
    pub fn with_falloff(config: DeformerConfig, falloff: F) -> Self {
        Self { config, falloff }
    }

    pub fn config(&self) -> &DeformerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DeformerConfig) {
        self.config = config;
    }

    pub fn falloff(&self) -> &F {
        &self.falloff
    }

    /// Mutable access for re-authoring the curve between invocations.
    pub fn falloff_mut(&mut self) -> &mut F {
        &mut self.falloff
    }

    /// Run one invocation.
    ///
    /// Either every position is computed or an error is returned; no
    /// partially deformed buffer ever escapes.
    pub fn deform(&self, input: &DeformInput<'_>) -> Result<DeformOutput, DeformError> {
        let config = self.config.clamped();
        let rest_positions = input.mesh.positions();
        debug!(
            "deform: START vertices={} colliders={} envelope={}",
            rest_positions.len(),
            input.colliders.len(),
            config.envelope
        );

        if config.envelope == 0.0 {
            debug!("deform: envelope is zero, passing through");
            return Ok(DeformOutput::passthrough(rest_positions, input.local_to_world));
        }

        let passes: Vec<(usize, ColliderPass<'_>)> = input
            .colliders
            .active()
            .filter_map(|(index, entry)| {
                if entry.has_bounds() {
                    Some((
                        index,
                        ColliderPass {
                            collider: entry.collider(),
                            bounds: entry.bounds(),
                        },
                    ))
                } else {
                    warn!("deform: collider {} has no bounding box, skipping", index);
                    None
                }
            })
            .collect();

        if passes.is_empty() {
            debug!("deform: no usable colliders, passing through");
            return Ok(DeformOutput::passthrough(rest_positions, input.local_to_world));
        }

        let space = MeshSpace::new(input.local_to_world)?;
        let mut vertices = gather_vertices(input, &space)?;
        let mut collisions = CollisionSet::new();
        let mut stats = DeformStats::default();

        for (index, pass) in &passes {
            let index = *index;
            trace!("deform: collider {} bounds {:?}", index, pass.bounds);

            let resolved = apply_resolver(&vertices, *pass, &space, config.envelope, &mut collisions)
                .map_err(|source| DeformError::GeometryQuery {
                    collider: index,
                    source,
                })?;
            stats.max_penetration_depth = stats
                .max_penetration_depth
                .max(resolved.max_penetration_depth);
            stats.vertices_resolved += resolved.resolved;
            stats.vertices_culled += resolved.culled;
            vertices = resolved.vertices;

            let params = BulgeParams {
                distance: config.bulge_distance,
                strength: config.bulge_strength,
                max_penetration_depth: stats.max_penetration_depth,
            };
            let bulged = apply_bulge(
                &vertices,
                *pass,
                &params,
                &self.falloff,
                &space,
                config.envelope,
                &mut collisions,
            )
            .map_err(|source| DeformError::GeometryQuery {
                collider: index,
                source,
            })?;
            stats.vertices_bulged += bulged.bulged;
            vertices = bulged.vertices;

            stats.colliders_processed += 1;
        }

        if config.smooth_iterations > 0 {
            vertices = apply_smoother(
                &vertices,
                input.mesh,
                &collisions,
                config.smooth_iterations,
                config.envelope,
            );
            stats.vertices_smoothed = collisions.len();
        }

        debug!(
            "deform: END resolved={} bulged={} smoothed={} max_depth={:.5}",
            stats.vertices_resolved,
            stats.vertices_bulged,
            stats.vertices_smoothed,
            stats.max_penetration_depth
        );

        Ok(DeformOutput {
            positions: vertices.iter().map(|v| v.position).collect(),
            collision_set: collisions,
            local_to_world: input.local_to_world,
            stats,
        })
    }
}

/// Build the per-invocation vertex buffer from the host mesh.
fn gather_vertices(
    input: &DeformInput<'_>,
    space: &MeshSpace,
) -> Result<Vec<DeformableVertex>, DeformError> {
    let positions = input.mesh.positions();
    let normals = input.mesh.normals();
    if normals.len() != positions.len() {
        return Err(DeformError::NormalCountMismatch {
            positions: positions.len(),
            normals: normals.len(),
        });
    }

    Ok(positions
        .iter()
        .zip(normals)
        .enumerate()
        .map(|(index, (&position, &normal))| DeformableVertex {
            index,
            position,
            normal: space.normal_to_world(normal),
            weight: sanitize(input.weights.weight(index)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ColliderEntry;
    use crate::weights::UniformWeight;
    use geometry::{Aabb, GeometryQuery, GeometryQueryError, SurfacePoint, TriangleMesh};
    use std::cell::Cell;

    /// Quad spanning [-10, 10] in X and Y at height `z`, facing +Z
    fn create_plane(z: f32) -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Vec3::new(-10.0, -10.0, z),
                Vec3::new(10.0, -10.0, z),
                Vec3::new(10.0, 10.0, z),
                Vec3::new(-10.0, 10.0, z),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    /// Loose points with +Z normals and no connectivity
    fn create_points(positions: Vec<Vec3>) -> TriangleMesh {
        let normals = vec![Vec3::Z; positions.len()];
        TriangleMesh::with_normals(positions, normals, vec![]).unwrap()
    }

    /// Closed cube spanning [-1, 1] on every axis, faces pointing outward
    fn create_cube() -> TriangleMesh {
        let positions = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -1.0 } else { 1.0 },
                    if i & 2 == 0 { -1.0 } else { 1.0 },
                    if i & 4 == 0 { -1.0 } else { 1.0 },
                )
            })
            .collect();
        let indices = vec![
            4, 5, 7, 4, 7, 6, // +Z
            0, 2, 3, 0, 3, 1, // -Z
            1, 3, 7, 1, 7, 5, // +X
            0, 4, 6, 0, 6, 2, // -X
            2, 6, 7, 2, 7, 3, // +Y
            0, 1, 5, 0, 5, 4, // -Y
        ];
        TriangleMesh::new(positions, indices).unwrap()
    }

    fn wide_bounds() -> Aabb {
        Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0))
    }

    /// Collider wrapper counting every geometry query it answers
    struct CountingCollider {
        inner: TriangleMesh,
        queries: Cell<usize>,
    }

    impl CountingCollider {
        fn new(inner: TriangleMesh) -> Self {
            Self {
                inner,
                queries: Cell::new(0),
            }
        }
    }

    impl GeometryQuery for CountingCollider {
        fn ray_intersects_any(
            &self,
            origin: Vec3,
            direction: Vec3,
            tolerance: f32,
        ) -> Result<bool, GeometryQueryError> {
            self.queries.set(self.queries.get() + 1);
            self.inner.ray_intersects_any(origin, direction, tolerance)
        }

        fn closest_point(&self, point: Vec3) -> Result<SurfacePoint, GeometryQueryError> {
            self.queries.set(self.queries.get() + 1);
            self.inner.closest_point(point)
        }

        fn bounding_box(&self) -> Aabb {
            self.inner.bounding_box()
        }
    }

    fn assert_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.distance(expected) < 1e-5,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_penetrating_vertex_lands_on_surface() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        // The vertex sits on the lower face of the box
        registry.add_entry(
            ColliderEntry::new(&plane)
                .with_bounds(Aabb::new(Vec3::new(-1.0, -1.0, -2.0), Vec3::splat(1.0))),
        );
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -2.0)]);
        let weights = UniformWeight(1.0);

        let output = CollisionDeformer::default()
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_close(output.positions[0], Vec3::ZERO);
        assert!(output.collision_set.contains(0));
        assert_eq!(output.stats.vertices_resolved, 1);
        assert!((output.stats.max_penetration_depth - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_default_bounds_resolve_and_bulge() {
        let cube = create_cube();
        let mut registry = ColliderRegistry::new();
        registry.add(&cube);
        // Inside just under the top face, and hovering just above it
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, 0.8), Vec3::new(0.5, 0.0, 1.2)]);
        let weights = UniformWeight::default();
        let deformer = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 2.0));

        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        // depth 0.2, t = 0.2 / 0.5
        let magnitude = 0.2 * 0.6 * deformer.falloff().evaluate(0.4) * 2.0;
        assert_close(output.positions[0], Vec3::new(0.0, 0.0, 1.0));
        assert_close(output.positions[1], Vec3::new(0.5, 0.0, 1.2 + magnitude));
        assert!((magnitude - 0.19699).abs() < 1e-4);
        assert_eq!(output.stats.vertices_resolved, 1);
        assert_eq!(output.stats.vertices_bulged, 1);
        // The hovering vertex is outside the cube's own box
        assert_eq!(output.stats.vertices_culled, 1);
    }

    #[test]
    fn test_default_bounds_ignore_far_vertices() {
        let cube = CountingCollider::new(create_cube());
        let mut registry = ColliderRegistry::new();
        registry.add(&cube);
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, 0.8), Vec3::new(0.0, 0.0, 1.6)]);
        let weights = UniformWeight::default();

        let output = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 2.0))
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_close(output.positions[0], Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(output.positions[1], Vec3::new(0.0, 0.0, 1.6));
        // Ray and closest point for the inside vertex only
        assert_eq!(cube.queries.get(), 2);
    }

    #[test]
    fn test_small_scale_transform() {
        let cube = create_cube();
        let mut registry = ColliderRegistry::new();
        registry.add(&cube);
        // Millimeter mesh placed in a meter world
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, 800.0)]);
        let weights = UniformWeight::default();

        let output = CollisionDeformer::default()
            .deform(
                &DeformInput::new(&mesh, &weights, &registry)
                    .with_transform(Affine3A::from_scale(Vec3::splat(0.001))),
            )
            .unwrap();

        assert!(output.positions[0].distance(Vec3::new(0.0, 0.0, 1000.0)) < 1e-2);
        assert!(output.collision_set.contains(0));
    }

    #[test]
    fn test_zero_weight_vertex_unchanged() {
        let plane = CountingCollider::new(create_plane(0.0));
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -2.0), Vec3::new(1.0, 0.0, 0.2)]);
        let weights = vec![0.0, 0.0];
        let config = DeformerConfig {
            smooth_iterations: 3,
            ..DeformerConfig::with_bulge(0.5, 2.0)
        };

        let output = CollisionDeformer::new(config)
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_eq!(output.positions, mesh.positions().to_vec());
        assert!(output.collision_set.is_empty());
        assert_eq!(plane.queries.get(), 0);
    }

    #[test]
    fn test_vertex_outside_box_never_queried() {
        let plane = CountingCollider::new(create_plane(0.0));
        let mut registry = ColliderRegistry::new();
        registry.add_entry(
            ColliderEntry::new(&plane).with_bounds(Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))),
        );
        let mesh = create_points(vec![Vec3::splat(5.0)]);
        let weights = UniformWeight::default();

        let output = CollisionDeformer::new(DeformerConfig::with_bulge(10.0, 2.0))
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_eq!(output.positions, vec![Vec3::splat(5.0)]);
        assert_eq!(output.stats.vertices_culled, 1);
        assert_eq!(plane.queries.get(), 0);
    }

    #[test]
    fn test_bulge_follows_falloff_formula() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -1.0), Vec3::new(5.0, 0.0, 0.25)]);
        let weights = UniformWeight::default();
        let deformer = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 2.0));

        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        // depth 1.0, t = 0.25 / 0.5, (1 - t) * curve(t) * strength
        let magnitude = 1.0 * 0.5 * deformer.falloff().evaluate(0.5) * 2.0;
        assert_close(output.positions[0], Vec3::ZERO);
        assert_close(output.positions[1], Vec3::new(5.0, 0.0, 0.25 + magnitude));
        assert!(magnitude > 0.0);
        assert_eq!(output.stats.vertices_bulged, 1);
        assert_eq!(output.collision_set.iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_bulge_needs_penetration() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, 0.1), Vec3::new(2.0, 0.0, 0.25)]);
        let weights = UniformWeight::default();

        let output = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 2.0))
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_eq!(output.positions, mesh.positions().to_vec());
        assert_eq!(output.stats.vertices_bulged, 0);
        assert_eq!(output.stats.max_penetration_depth, 0.0);
    }

    #[test]
    fn test_smoothing_after_resolve() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        // Vertex 0 connected to two pinned neighbors one unit below the plane
        let mesh = TriangleMesh::with_normals(
            vec![
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            vec![Vec3::Z; 3],
            vec![0, 1, 2],
        )
        .unwrap();
        let weights = vec![1.0, 0.0, 0.0];
        let config = DeformerConfig {
            smooth_iterations: 2,
            ..DeformerConfig::default()
        };

        let output = CollisionDeformer::new(config)
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        // Resolved to z = 0, then halved twice toward the rest average z = -1
        assert_close(output.positions[0], Vec3::new(0.0, 0.0, -0.75));
        assert_eq!(output.positions[1], Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(output.positions[2], Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(output.stats.vertices_smoothed, 1);
    }

    #[test]
    fn test_zero_smooth_iterations_keeps_resolved_positions() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = TriangleMesh::with_normals(
            vec![
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            vec![Vec3::Z; 3],
            vec![0, 1, 2],
        )
        .unwrap();
        let weights = vec![1.0, 0.0, 0.0];

        let output = CollisionDeformer::default()
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_close(output.positions[0], Vec3::ZERO);
        assert_eq!(output.stats.vertices_smoothed, 0);
    }

    #[test]
    fn test_zero_envelope_passes_through() {
        let plane = create_plane(0.0);
        // A broken collider would fail if it were ever queried
        let broken = TriangleMesh::new(vec![Vec3::ZERO], vec![]).unwrap();
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        registry.add_entry(ColliderEntry::new(&broken).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 0.1)]);
        let weights = UniformWeight::default();
        let config = DeformerConfig {
            envelope: 0.0,
            smooth_iterations: 5,
            ..DeformerConfig::with_bulge(1.0, 10.0)
        };

        let output = CollisionDeformer::new(config)
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_eq!(output.positions, mesh.positions().to_vec());
        assert!(output.collision_set.is_empty());
        assert_eq!(output.stats, DeformStats::default());
    }

    #[test]
    fn test_half_envelope_scales_resolve() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -2.0)]);
        let weights = UniformWeight::default();
        let config = DeformerConfig {
            envelope: 0.5,
            ..DeformerConfig::default()
        };

        let output = CollisionDeformer::new(config)
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert_close(output.positions[0], Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_collider_order_matters() {
        let upper = create_plane(0.0);
        let lower = create_plane(-0.5);
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -2.0)]);
        let weights = UniformWeight(0.5);
        let deformer = CollisionDeformer::default();

        let mut upper_first = ColliderRegistry::new();
        upper_first.add_entry(ColliderEntry::new(&upper).with_bounds(wide_bounds()));
        upper_first.add_entry(ColliderEntry::new(&lower).with_bounds(wide_bounds()));
        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &upper_first))
            .unwrap();
        assert_close(output.positions[0], Vec3::new(0.0, 0.0, -0.75));

        let mut lower_first = ColliderRegistry::new();
        lower_first.add_entry(ColliderEntry::new(&lower).with_bounds(wide_bounds()));
        lower_first.add_entry(ColliderEntry::new(&upper).with_bounds(wide_bounds()));
        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &lower_first))
            .unwrap();
        assert_close(output.positions[0], Vec3::new(0.0, 0.0, -0.625));
        assert_eq!(output.stats.colliders_processed, 2);
    }

    #[test]
    fn test_collision_set_members_were_moved() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -0.3),
            Vec3::new(2.0, 0.0, 0.1),
            Vec3::new(3.0, 0.0, 0.4),
            Vec3::new(4.0, 0.0, 3.0),
        ]);
        let weights = vec![1.0, 0.5, 1.0, 0.25, 1.0];

        let output = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 1.0))
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();

        assert!(!output.collision_set.is_empty());
        for index in output.collision_set.iter() {
            assert_ne!(output.positions[index], mesh.positions()[index]);
        }
        // Far above the bulge range
        assert!(!output.collision_set.contains(4));
        assert_eq!(output.positions[4], Vec3::new(4.0, 0.0, 3.0));
    }

    #[test]
    fn test_inactive_and_unbounded_colliders_pass_through() {
        let plane = CountingCollider::new(create_plane(0.0));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -1.0)]);
        let weights = UniformWeight::default();
        let deformer = CollisionDeformer::default();

        let mut inactive = ColliderRegistry::new();
        inactive.add_entry(
            ColliderEntry::new(&plane)
                .with_bounds(wide_bounds())
                .with_active(false),
        );
        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &inactive))
            .unwrap();
        assert_eq!(output.positions, mesh.positions().to_vec());

        let mut unbounded = ColliderRegistry::new();
        unbounded.add_entry(ColliderEntry::new(&plane).with_bounds(Aabb::empty()));
        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &unbounded))
            .unwrap();
        assert_eq!(output.positions, mesh.positions().to_vec());
        assert_eq!(output.stats.colliders_processed, 0);

        let empty = ColliderRegistry::new();
        let output = deformer
            .deform(&DeformInput::new(&mesh, &weights, &empty))
            .unwrap();
        assert_eq!(output.positions, mesh.positions().to_vec());

        assert_eq!(plane.queries.get(), 0);
    }

    #[test]
    fn test_removed_collider_is_ignored() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        let slot = registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        registry.remove(slot);
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -1.0)]);
        let weights = UniformWeight::default();

        let output = CollisionDeformer::default()
            .deform(&DeformInput::new(&mesh, &weights, &registry))
            .unwrap();
        assert_eq!(output.positions, mesh.positions().to_vec());
    }

    #[test]
    fn test_query_error_names_collider() {
        let plane = create_plane(5.0);
        let broken = TriangleMesh::new(vec![Vec3::ZERO], vec![]).unwrap();
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        registry.add_entry(ColliderEntry::new(&broken).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::ZERO]);
        let weights = UniformWeight::default();

        let result = CollisionDeformer::default().deform(&DeformInput::new(&mesh, &weights, &registry));
        match result {
            Err(DeformError::GeometryQuery { collider, source }) => {
                assert_eq!(collider, 1);
                assert_eq!(source, GeometryQueryError::EmptyMesh);
            }
            other => panic!("expected geometry query error, got {other:?}"),
        }
    }

    #[test]
    fn test_singular_transform_rejected() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add(&plane);
        let mesh = create_points(vec![Vec3::ZERO]);
        let weights = UniformWeight::default();

        let input = DeformInput::new(&mesh, &weights, &registry)
            .with_transform(Affine3A::from_scale(Vec3::ZERO));
        assert!(matches!(
            CollisionDeformer::default().deform(&input),
            Err(DeformError::SingularTransform)
        ));
    }

    static MISMATCHED_POSITIONS: [Vec3; 2] = [Vec3::ZERO, Vec3::X];
    static MISMATCHED_NORMALS: [Vec3; 1] = [Vec3::Z];

    /// Mesh whose normal buffer is shorter than its position buffer
    struct MismatchedMesh;

    impl MeshReader for MismatchedMesh {
        fn positions(&self) -> &[Vec3] {
            &MISMATCHED_POSITIONS
        }

        fn normals(&self) -> &[Vec3] {
            &MISMATCHED_NORMALS
        }

        fn adjacency(&self, _vertex: usize) -> &[usize] {
            &[]
        }
    }

    #[test]
    fn test_normal_count_mismatch_rejected() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let weights = UniformWeight::default();

        let result =
            CollisionDeformer::default().deform(&DeformInput::new(&MismatchedMesh, &weights, &registry));
        assert!(matches!(
            result,
            Err(DeformError::NormalCountMismatch {
                positions: 2,
                normals: 1
            })
        ));
    }

    #[test]
    fn test_resolve_through_mesh_transform() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, 1.0)]);
        let weights = UniformWeight::default();
        let transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -3.0));

        let output = CollisionDeformer::default()
            .deform(&DeformInput::new(&mesh, &weights, &registry).with_transform(transform))
            .unwrap();

        // World z = -2 resolves to 0, which is local z = 3
        assert_close(output.positions[0], Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(output.local_to_world, transform);
    }

    #[test]
    fn test_repeated_invocations_do_not_share_state() {
        let plane = create_plane(0.0);
        let mut registry = ColliderRegistry::new();
        registry.add_entry(ColliderEntry::new(&plane).with_bounds(wide_bounds()));
        let mesh = create_points(vec![Vec3::new(0.0, 0.0, -1.0), Vec3::new(3.0, 0.0, 0.2)]);
        let weights = UniformWeight::default();
        let deformer = CollisionDeformer::new(DeformerConfig::with_bulge(0.5, 1.0));
        let input = DeformInput::new(&mesh, &weights, &registry);

        let first = deformer.deform(&input).unwrap();
        let second = deformer.deform(&input).unwrap();
        assert_eq!(first.positions, second.positions);
        assert_eq!(first.collision_set, second.collision_set);
        assert_eq!(first.stats, second.stats);
    }
}
