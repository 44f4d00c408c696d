//! Collision deformer for Pushback.
//!
//! Pushes the vertices of a deformable mesh out of one or more rigid
//! colliders, with:
//! - Bounding-box culling ahead of every collider query
//! - Penetration resolution by projecting onto the collider surface
//! - Soft-tissue bulging around the contact, shaped by an authored falloff curve
//! - Boundary smoothing restricted to the vertices that moved
//!
//! # Architecture
//!
//! Every invocation is self-contained: vertices are gathered from the host
//! mesh, each stage produces a new vertex buffer from the previous one, and
//! the result is handed back as a fresh position buffer. Nothing survives
//! between invocations except the deformer's configuration and curve.
//!
//! ## Key Components
//!
//! - **Types**: Per-invocation vertices, mesh space conversion, collision set
//! - **Falloff**: Ramp curve driving the bulge
//! - **Weights**: Per-vertex influence
//! - **Registry**: Ordered collider slots with activation flags
//! - **Culling**: Bounding-box rejection
//! - **Deformation**: Resolver, bulge and smoother stages
//! - **Pipeline**: Orchestrates envelope → colliders → smoothing → commit

pub mod culling;
pub mod deformation;
pub mod error;
pub mod falloff;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod weights;

pub use culling::may_intersect;
pub use deformation::{
    BulgeParams, BulgeResult, ColliderPass, ResolveResult, apply_bulge, apply_resolver,
    apply_smoother,
};
pub use error::DeformError;
pub use falloff::{FalloffCurve, FalloffCurveSource, RampInterpolation, RampKey};
pub use pipeline::{CollisionDeformer, DeformInput, DeformOutput};
pub use registry::{ColliderEntry, ColliderRegistry};
pub use types::{CollisionSet, DeformStats, DeformableVertex, MeshSpace};
pub use weights::{UniformWeight, WeightSource};
