use super::{BBox, Point3, Transform, Vec3};

/// Indexed triangle mesh. Closed meshes are expected to be wound
/// counter-clockwise when seen from outside.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

impl GeomMesh {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite() || !p[2].is_finite())
    }

    /// Returns true if all vertex indices are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        Ok(())
    }

    /// Iterates the triangles as point triples. Out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.positions.get(tri[0] as usize)?;
            let b = self.positions.get(tri[1] as usize)?;
            let c = self.positions.get(tri[2] as usize)?;
            Some([Point3::from(*a), Point3::from(*b), Point3::from(*c)])
        })
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        let mut iter = self.positions.iter().copied().map(Point3::from);
        let first = iter.next()?;
        Some(iter.fold(BBox::new(first, first), BBox::expand_point))
    }

    /// Signed enclosed volume by the divergence theorem. Positive for an
    /// outward-wound closed mesh.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.to_vec3().dot(b.to_vec3().cross(c.to_vec3())) / 6.0)
            .sum()
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| 0.5 * (b - a).cross(c - a).length())
            .sum()
    }

    /// Same mesh with every triangle's winding reversed.
    #[must_use]
    pub fn flipped(&self) -> Self {
        let mut indices = Vec::with_capacity(self.indices.len());
        for tri in self.indices.chunks_exact(3) {
            indices.extend_from_slice(&[tri[0], tri[2], tri[1]]);
        }
        Self::new(self.positions.clone(), indices)
    }

    /// Applies `transform` to every vertex. Orientation-reversing transforms
    /// also reverse the winding so closed meshes stay outward-facing.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        let positions = self
            .positions
            .iter()
            .map(|p| transform.apply_point(Point3::from(*p)).to_array())
            .collect();
        let mesh = Self::new(positions, self.indices.clone());
        if transform.linear_determinant() < 0.0 {
            mesh.flipped()
        } else {
            mesh
        }
    }

    /// Appends `other`, re-basing its indices.
    pub fn append(&mut self, other: &Self) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Appends a single triangle with fresh vertices.
    pub fn push_triangle(&mut self, tri: [Point3; 3]) {
        let base = self.positions.len() as u32;
        self.positions.extend(tri.iter().map(|p| p.to_array()));
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
}

/// Unit normal of a triangle, `None` when degenerate.
#[must_use]
pub fn triangle_normal(tri: &[Point3; 3]) -> Option<Vec3> {
    (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalized()
}

#[must_use]
pub fn triangle_centroid(tri: &[Point3; 3]) -> Point3 {
    Point3::new(
        (tri[0].x + tri[1].x + tri[2].x) / 3.0,
        (tri[0].y + tri[1].y + tri[2].y) / 3.0,
        (tri[0].z + tri[1].z + tri[2].z) / 3.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tetrahedron() -> GeomMesh {
        GeomMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        )
    }

    #[test]
    fn tetrahedron_volume_is_positive_and_flip_negates() {
        let mesh = unit_tetrahedron();
        assert!((mesh.signed_volume() - 1.0 / 6.0).abs() < 1e-12);
        assert!((mesh.flipped().signed_volume() + 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn mirrored_mesh_keeps_outward_winding() {
        let mesh = unit_tetrahedron();
        let mirror = Transform::mirror(Vec3::Y).unwrap();
        let mirrored = mesh.transformed(&mirror);
        assert!((mirrored.signed_volume() - 1.0 / 6.0).abs() < 1e-12);
        assert!(mirrored.validate().is_ok());
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = unit_tetrahedron();
        let b = unit_tetrahedron().transformed(&Transform::translate(Vec3::new(5.0, 0.0, 0.0)));
        a.append(&b);
        assert!(a.has_valid_indices());
        assert_eq!(a.triangle_count(), 8);
        assert!((a.signed_volume() - 2.0 / 6.0).abs() < 1e-12);
    }
}
