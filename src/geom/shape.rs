//! Kernel-level shape representation handed across the engine boundary.

use std::sync::Arc;

use super::{BBox, GeomMesh, Point3, Transform};

/// Polyline cross section. Closed wires implicitly connect the last point
/// back to the first; a duplicated closing point is dropped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    points: Vec<Point3>,
    closed: bool,
}

impl Wire {
    #[must_use]
    pub fn open(points: Vec<Point3>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    #[must_use]
    pub fn closed(mut points: Vec<Point3>) -> Self {
        if points.len() > 2 {
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                if first.distance_to(*last) <= 1e-12 {
                    points.pop();
                }
            }
        }
        Self {
            points,
            closed: true,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            points: self.points.iter().map(|p| transform.apply_point(*p)).collect(),
            closed: self.closed,
        }
    }

    /// Arithmetic mean of the points.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let sum = self
            .points
            .iter()
            .fold(Point3::ORIGIN.to_vec3(), |acc, p| acc + p.to_vec3());
        Some(Point3::ORIGIN + sum / n)
    }

    /// Total polyline length including the closing edge of closed wires.
    #[must_use]
    pub fn length(&self) -> f64 {
        let open: f64 = self
            .points
            .windows(2)
            .map(|w| w[0].distance_to(w[1]))
            .sum();
        match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(first), Some(last)) => open + last.distance_to(*first),
            _ => open,
        }
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }
}

/// Result of a kernel operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Wire(Wire),
    /// Open surface.
    Shell(GeomMesh),
    /// Closed, outward-wound surface enclosing a volume.
    Solid(GeomMesh),
    Compound(Vec<Shape>),
}

/// Immutable handle shared between caches and callers.
pub type SharedShape = Arc<Shape>;

impl Shape {
    #[must_use]
    pub fn empty() -> Self {
        Self::Compound(Vec::new())
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Wire(_) => "wire",
            Self::Shell(_) => "shell",
            Self::Solid(_) => "solid",
            Self::Compound(_) => "compound",
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wire(w) => w.is_empty(),
            Self::Shell(m) | Self::Solid(m) => m.is_empty(),
            Self::Compound(children) => children.iter().all(Self::is_empty),
        }
    }

    /// Applies `transform` recursively.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        match self {
            Self::Wire(w) => Self::Wire(w.transformed(transform)),
            Self::Shell(m) => Self::Shell(m.transformed(transform)),
            Self::Solid(m) => Self::Solid(m.transformed(transform)),
            Self::Compound(children) => {
                Self::Compound(children.iter().map(|c| c.transformed(transform)).collect())
            }
        }
    }

    /// All triangles of shells and solids merged into one mesh.
    #[must_use]
    pub fn merged_mesh(&self) -> GeomMesh {
        let mut out = GeomMesh::default();
        self.collect_meshes(&mut out);
        out
    }

    fn collect_meshes(&self, out: &mut GeomMesh) {
        match self {
            Self::Wire(_) => {}
            Self::Shell(m) | Self::Solid(m) => out.append(m),
            Self::Compound(children) => {
                for child in children {
                    child.collect_meshes(out);
                }
            }
        }
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            Self::Wire(w) => w.bbox(),
            Self::Shell(m) | Self::Solid(m) => m.bbox(),
            Self::Compound(children) => children
                .iter()
                .filter_map(Self::bbox)
                .reduce(BBox::union),
        }
    }

    /// Number of leaf shapes (1 for anything but a compound).
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Compound(children) => children.iter().map(Self::leaf_count).sum(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_wire_drops_duplicate_endpoint() {
        let w = Wire::closed(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ]);
        assert_eq!(w.len(), 3);
        assert!((w.length() - (2.0 + 2.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn compound_bbox_spans_children() {
        let a = Shape::Wire(Wire::open(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)]));
        let b = Shape::Wire(Wire::open(vec![Point3::new(-2.0, 0.5, 0.0)]));
        let c = Shape::Compound(vec![a, Shape::Compound(vec![b])]);
        let bbox = c.bbox().unwrap();
        assert_eq!(bbox.min, Point3::new(-2.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(c.leaf_count(), 2);
    }
}
