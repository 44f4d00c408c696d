use geometry::GeometryQueryError;
use thiserror::Error;

/// Failures that abort a deformer invocation.
///
/// Policy short-circuits (zero envelope, no colliders, zero weight, no ray
/// hit) are not errors. When an error is returned no positions are produced.
#[derive(Debug, Error)]
pub enum DeformError {
    #[error("Geometry query failed on collider {collider}: {source}")]
    GeometryQuery {
        collider: usize,
        #[source]
        source: GeometryQueryError,
    },
    #[error("Mesh has {positions} positions but {normals} normals")]
    NormalCountMismatch { positions: usize, normals: usize },
    #[error("Local-to-world transform is not invertible")]
    SingularTransform,
}
