//! Core deformer types.
//!
//! Everything here lives for a single invocation: vertices are gathered from
//! the host mesh, mutated stage by stage, and dropped once the final
//! positions are handed back.

use std::collections::BTreeSet;

use glam::{Affine3A, Mat3, Vec3};

use crate::error::DeformError;

/// One vertex of the deformable mesh as seen by the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeformableVertex {
    /// Ordinal into the mesh's vertex buffer
    pub index: usize,
    /// Current position in the mesh's local space
    pub position: Vec3,
    /// Unit normal in world space
    pub normal: Vec3,
    /// Influence weight in [0, 1]
    pub weight: f32,
}

/// Conversion between the deformable mesh's local space and world space.
#[derive(Debug, Clone, Copy)]
pub struct MeshSpace {
    local_to_world: Affine3A,
    world_to_local: Affine3A,
    normal_matrix: Mat3,
}

impl MeshSpace {
    /// Build from the host's local-to-world transform.
    ///
    /// Fails if the transform cannot be inverted, since resolved positions
    /// have to be mapped back into local space.
    pub fn new(local_to_world: Affine3A) -> Result<Self, DeformError> {
        let linear = Mat3::from(local_to_world.matrix3);
        let determinant = linear.determinant();
        if !determinant.is_finite() || determinant == 0.0 {
            return Err(DeformError::SingularTransform);
        }

        // Tiny but nonzero scales are fine as long as the inverse is usable
        let world_to_local = local_to_world.inverse();
        let normal_matrix = linear.inverse().transpose();
        if !world_to_local.is_finite() || !normal_matrix.is_finite() {
            return Err(DeformError::SingularTransform);
        }

        Ok(Self {
            local_to_world,
            world_to_local,
            normal_matrix,
        })
    }

    pub fn local_to_world(&self) -> Affine3A {
        self.local_to_world
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.local_to_world.transform_point3(local)
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.world_to_local.transform_point3(world)
    }

    /// Map a local-space normal to a unit world-space normal.
    pub fn normal_to_world(&self, local_normal: Vec3) -> Vec3 {
        (self.normal_matrix * local_normal).normalize_or_zero()
    }
}

/// Vertices moved by the resolver or the bulge stage during one invocation.
///
/// Starts empty and only grows; there is no way to remove a
/// member. The smoother restricts itself to this set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionSet {
    members: BTreeSet<usize>,
}

impl CollisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Returns `true` if it was not already a member.
    pub fn insert(&mut self, index: usize) -> bool {
        self.members.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }
}

/// Counters describing what one invocation did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeformStats {
    /// Active colliders whose passes ran
    pub colliders_processed: usize,
    /// (vertex, collider) pairs rejected by the bounding-box test
    pub vertices_culled: usize,
    /// Vertex moves made by the penetration resolver
    pub vertices_resolved: usize,
    /// Vertex moves made by the bulge stage
    pub vertices_bulged: usize,
    /// Vertices the smoother touched (zero when smoothing is off)
    pub vertices_smoothed: usize,
    /// Deepest penetration seen across all colliders
    pub max_penetration_depth: f32,
}
