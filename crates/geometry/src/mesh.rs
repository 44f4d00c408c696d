//! Indexed triangle meshes.
//!
//! [`TriangleMesh`] is the one concrete mesh type in the workspace. It reads
//! as a deformable mesh through [`MeshReader`] and answers collider queries
//! through [`GeometryQuery`]. Queries are brute force over all triangles.

use glam::{Affine3A, Mat3, Vec3};
use tracing::trace;

use crate::aabb::Aabb;
use crate::closest::closest_point_on_triangle;
use crate::query::{GeometryQuery, GeometryQueryError, SurfacePoint};
use crate::raycast::ray_triangle_intersection;

/// Relative squared-distance window within which triangles count as equally close
const TIE_TOLERANCE: f32 = 1e-5;

/// Read access to a deformable mesh in its local space.
pub trait MeshReader {
    /// Vertex positions, indexed by vertex ordinal
    fn positions(&self) -> &[Vec3];
    /// Vertex normals, same length and order as `positions`
    fn normals(&self) -> &[Vec3];
    /// Vertices sharing an edge with `vertex`. Empty for isolated vertices.
    fn adjacency(&self, vertex: usize) -> &[usize];
}

/// Indexed triangle mesh with cached normals, adjacency and bounds.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    /// Triangle indices (3 per triangle)
    indices: Vec<u32>,
    /// Unit face normals, zero for degenerate triangles
    face_normals: Vec<Vec3>,
    adjacency: Vec<Vec<usize>>,
    bounds: Aabb,
}

impl TriangleMesh {
    /// Build a mesh and derive vertex normals from its faces.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, GeometryQueryError> {
        validate(&positions, &indices)?;
        let face_normals = compute_face_normals(&positions, &indices);
        let normals = compute_vertex_normals(positions.len(), &indices, &face_normals);
        Ok(Self::assemble(positions, normals, indices, face_normals))
    }

    /// Build a mesh with explicit vertex normals.
    pub fn with_normals(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Result<Self, GeometryQueryError> {
        validate(&positions, &indices)?;
        if normals.len() != positions.len() {
            return Err(GeometryQueryError::NormalCountMismatch {
                positions: positions.len(),
                normals: normals.len(),
            });
        }
        let face_normals = compute_face_normals(&positions, &indices);
        let normals = normals.into_iter().map(Vec3::normalize_or_zero).collect();
        Ok(Self::assemble(positions, normals, indices, face_normals))
    }

    fn assemble(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u32>,
        face_normals: Vec<Vec3>,
    ) -> Self {
        let adjacency = compute_adjacency(positions.len(), &indices);
        let bounds = Aabb::from_points(positions.iter().copied());
        trace!(
            "TriangleMesh: {} vertices, {} triangles",
            positions.len(),
            indices.len() / 3
        );
        Self {
            positions,
            normals,
            indices,
            face_normals,
            adjacency,
            bounds,
        }
    }

    /// Copy of this mesh with every vertex mapped through `transform`.
    ///
    /// Used to bring a collider from its local space into world space.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let positions: Vec<Vec3> = self
            .positions
            .iter()
            .map(|&p| transform.transform_point3(p))
            .collect();
        let linear = Mat3::from(transform.matrix3);
        let normal_matrix = linear.inverse().transpose();
        let normals = self
            .normals
            .iter()
            .map(|&n| (normal_matrix * n).normalize_or_zero())
            .collect();
        let mut face_normals = compute_face_normals(&positions, &self.indices);
        // A mirroring transform reverses the winding
        if linear.determinant() < 0.0 {
            face_normals.iter_mut().for_each(|n| *n = -*n);
        }
        Self {
            bounds: Aabb::from_points(positions.iter().copied()),
            positions,
            normals,
            indices: self.indices.clone(),
            face_normals,
            adjacency: self.adjacency.clone(),
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the vertex positions for a triangle
    pub fn triangle_positions(&self, tri_index: usize) -> (Vec3, Vec3, Vec3) {
        let base = tri_index * 3;
        (
            self.positions[self.indices[base] as usize],
            self.positions[self.indices[base + 1] as usize],
            self.positions[self.indices[base + 2] as usize],
        )
    }

    /// Unit normal of a triangle, zero if it is degenerate
    pub fn face_normal(&self, tri_index: usize) -> Vec3 {
        self.face_normals[tri_index]
    }

    /// Indices of triangles with a usable (non-degenerate) normal.
    fn usable_triangles(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.triangle_count()).filter(|&tri| self.face_normals[tri] != Vec3::ZERO)
    }
}

impl MeshReader for TriangleMesh {
    fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    fn adjacency(&self, vertex: usize) -> &[usize] {
        self.adjacency.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl GeometryQuery for TriangleMesh {
    fn ray_intersects_any(
        &self,
        origin: Vec3,
        direction: Vec3,
        tolerance: f32,
    ) -> Result<bool, GeometryQueryError> {
        if !origin.is_finite() {
            return Err(GeometryQueryError::NonFinitePoint(origin));
        }
        if self.triangle_count() == 0 {
            return Err(GeometryQueryError::EmptyMesh);
        }

        let hit = self.usable_triangles().any(|tri| {
            let (v0, v1, v2) = self.triangle_positions(tri);
            ray_triangle_intersection(origin, direction, v0, v1, v2, tolerance).is_some()
        });
        Ok(hit)
    }

    /// The normal is the average of the faces tied at the minimum distance,
    /// so a point closest to a shared edge or corner gets the blended normal
    /// of the faces meeting there rather than whichever triangle came first.
    fn closest_point(&self, point: Vec3) -> Result<SurfacePoint, GeometryQueryError> {
        if !point.is_finite() {
            return Err(GeometryQueryError::NonFinitePoint(point));
        }

        let mut best: Option<(f32, Vec3, Vec3)> = None;
        let mut normal_sum = Vec3::ZERO;
        for tri in self.usable_triangles() {
            let (v0, v1, v2) = self.triangle_positions(tri);
            let candidate = closest_point_on_triangle(v0, v1, v2, point);
            let distance_sq = candidate.distance_squared(point);
            let face_normal = self.face_normals[tri];

            match best {
                Some((best_sq, _, _)) => {
                    let tolerance = TIE_TOLERANCE * best_sq.max(1.0);
                    if distance_sq < best_sq - tolerance {
                        best = Some((distance_sq, candidate, face_normal));
                        normal_sum = face_normal;
                    } else if distance_sq <= best_sq + tolerance {
                        normal_sum += face_normal;
                    }
                }
                None => {
                    best = Some((distance_sq, candidate, face_normal));
                    normal_sum = face_normal;
                }
            }
        }

        // Opposing faces can cancel out; fall back to the first face then
        best.map(|(_, position, first_normal)| SurfacePoint {
            position,
            normal: normal_sum.try_normalize().unwrap_or(first_normal),
        })
        .ok_or(GeometryQueryError::EmptyMesh)
    }

    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}

fn validate(positions: &[Vec3], indices: &[u32]) -> Result<(), GeometryQueryError> {
    if indices.len() % 3 != 0 {
        return Err(GeometryQueryError::MalformedIndices(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(GeometryQueryError::IndexOutOfBounds {
            index,
            vertex_count: positions.len(),
        });
    }
    if let Some(vertex) = positions.iter().position(|p| !p.is_finite()) {
        return Err(GeometryQueryError::NonFiniteVertex(vertex));
    }
    Ok(())
}

fn compute_face_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    indices
        .chunks_exact(3)
        .map(|tri| {
            let v0 = positions[tri[0] as usize];
            let v1 = positions[tri[1] as usize];
            let v2 = positions[tri[2] as usize];
            (v1 - v0).cross(v2 - v0).normalize_or_zero()
        })
        .collect()
}

/// Vertex normal = normalized average of adjacent face normals.
fn compute_vertex_normals(vertex_count: usize, indices: &[u32], face_normals: &[Vec3]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; vertex_count];
    for (tri, face_normal) in indices.chunks_exact(3).zip(face_normals) {
        for &index in tri {
            sums[index as usize] += *face_normal;
        }
    }
    sums.into_iter().map(Vec3::normalize_or_zero).collect()
}

fn compute_adjacency(vertex_count: usize, indices: &[u32]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); vertex_count];
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if a == b {
                continue;
            }
            adjacency[a as usize].push(b as usize);
            adjacency[b as usize].push(a as usize);
        }
    }
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }
    adjacency
}
