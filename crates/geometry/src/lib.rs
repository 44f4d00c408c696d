//! Geometry primitives for the pushback collision deformer.
//!
//! This crate provides the mesh-level queries the deformer consumes:
//! - [`aabb`] - Axis-aligned bounding boxes for cheap culling
//! - [`raycast`] - Ray-triangle intersection (Moller-Trumbore)
//! - [`closest`] - Closest point on a triangle
//! - [`query`] - The [`GeometryQuery`] collaborator trait and its error type
//! - [`mesh`] - The [`MeshReader`] trait and [`TriangleMesh`], which serves
//!   both as a collider and as a deformable mesh

pub mod aabb;
pub mod closest;
pub mod mesh;
pub mod query;
pub mod raycast;

pub use aabb::Aabb;
pub use closest::closest_point_on_triangle;
pub use mesh::{MeshReader, TriangleMesh};
pub use query::{GeometryQuery, GeometryQueryError, SurfacePoint};
pub use raycast::{TriangleHit, ray_triangle_intersection};
