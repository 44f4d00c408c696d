//! Geometry queries a collider must answer for the deformer.

use glam::Vec3;
use thiserror::Error;

use crate::aabb::Aabb;

/// Errors raised by geometry queries or by building the geometry behind them
#[derive(Debug, Error, PartialEq)]
pub enum GeometryQueryError {
    #[error("Mesh has no usable triangles")]
    EmptyMesh,
    #[error("Index buffer length {0} is not a multiple of 3")]
    MalformedIndices(usize),
    #[error("Triangle index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
    #[error("Normal buffer has {normals} entries for {positions} positions")]
    NormalCountMismatch { positions: usize, normals: usize },
    #[error("Non-finite coordinate at vertex {0}")]
    NonFiniteVertex(usize),
    #[error("Non-finite query point {0}")]
    NonFinitePoint(Vec3),
}

/// A point on a collider surface with the surface normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    /// Unit outward normal
    pub normal: Vec3,
}

/// World-space queries against a read-only collider surface.
///
/// Implementations must not mutate the collider, so one collider can be
/// shared by any number of deformers.
pub trait GeometryQuery {
    /// Whether a ray from `origin` along `direction` hits the surface anywhere
    /// ahead of the origin. Every intersection counts, not only the nearest,
    /// and the ray has no length limit.
    fn ray_intersects_any(
        &self,
        origin: Vec3,
        direction: Vec3,
        tolerance: f32,
    ) -> Result<bool, GeometryQueryError>;

    /// Closest surface point to `point` and the surface normal there.
    fn closest_point(&self, point: Vec3) -> Result<SurfacePoint, GeometryQueryError>;

    /// Closest surface point to `point`, position only.
    fn closest_point_only(&self, point: Vec3) -> Result<Vec3, GeometryQueryError> {
        self.closest_point(point).map(|surface| surface.position)
    }

    /// World-space bounds of the surface.
    fn bounding_box(&self) -> Aabb;
}
