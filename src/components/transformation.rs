//! Scale/rotate/translate composition shared by every geometric component.

use crate::error::{EngineError, EngineResult};
use crate::geom::{GeometryKernel, Point3, Shape, Transform, Vec3};
use crate::parse::DocumentBackend;

/// Affine transform given by its components. Rotation angles are in degrees
/// and applied about z first, then y, then x; scaling precedes rotation and
/// translation follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    translation: Vec3,
    rotation: Vec3,
    scaling: Vec3,
    matrix: Transform,
    inverse: Transform,
}

impl Default for Transformation {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scaling: Vec3::new(1.0, 1.0, 1.0),
            matrix: Transform::identity(),
            inverse: Transform::identity(),
        }
    }
}

impl Transformation {
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds a transformation with its matrix already computed.
    pub fn from_components(translation: Vec3, rotation: Vec3, scaling: Vec3) -> EngineResult<Self> {
        let mut t = Self::default();
        t.set_translation(translation)?;
        t.set_rotation(rotation)?;
        t.set_scaling(scaling)?;
        t.build_matrix();
        Ok(t)
    }

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    #[must_use]
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    #[must_use]
    pub fn scaling(&self) -> Vec3 {
        self.scaling
    }

    /// Forward matrix as of the last [`Self::build_matrix`].
    #[must_use]
    pub fn matrix(&self) -> Transform {
        self.matrix
    }

    #[must_use]
    pub fn inverse(&self) -> Transform {
        self.inverse
    }

    pub fn set_translation(&mut self, translation: Vec3) -> EngineResult<()> {
        if !translation.is_finite() {
            return Err(EngineError::NonFinite { what: "translation" });
        }
        self.translation = translation;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: Vec3) -> EngineResult<()> {
        if !rotation.is_finite() {
            return Err(EngineError::NonFinite { what: "rotation" });
        }
        self.rotation = rotation;
        Ok(())
    }

    /// Zero factors are rejected because they make the matrix singular.
    pub fn set_scaling(&mut self, scaling: Vec3) -> EngineResult<()> {
        if !scaling.is_finite() {
            return Err(EngineError::NonFinite { what: "scaling" });
        }
        if scaling.x == 0.0 || scaling.y == 0.0 || scaling.z == 0.0 {
            return Err(EngineError::configuration("scaling factors must be non-zero"));
        }
        self.scaling = scaling;
        Ok(())
    }

    /// Recomputes `T * Rx * Ry * Rz * S` and its inverse.
    pub fn build_matrix(&mut self) {
        let r = self.rotation;
        self.matrix = Transform::translate(self.translation)
            * Transform::rotate_x(r.x.to_radians())
            * Transform::rotate_y(r.y.to_radians())
            * Transform::rotate_z(r.z.to_radians())
            * Transform::scale(self.scaling.x, self.scaling.y, self.scaling.z);

        let s = self.scaling;
        self.inverse = Transform::scale(1.0 / s.x, 1.0 / s.y, 1.0 / s.z)
            * Transform::rotate_z(-r.z.to_radians())
            * Transform::rotate_y(-r.y.to_radians())
            * Transform::rotate_x(-r.x.to_radians())
            * Transform::translate(-self.translation);
    }

    #[must_use]
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.matrix.apply_point(point)
    }

    #[must_use]
    pub fn inverse_point(&self, point: Point3) -> Point3 {
        self.inverse.apply_point(point)
    }

    pub fn transform_shape(&self, kernel: &dyn GeometryKernel, shape: &Shape) -> EngineResult<Shape> {
        Ok(kernel.transform(shape, &self.matrix)?)
    }

    /// Reads an optional `transformation` element below `path`. Missing
    /// parts keep their identity value.
    pub fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let base = format!("{path}/transformation");
        let mut t = Self::default();
        if doc.check_element(&base) {
            if let Some(v) = read_optional_vec(doc, &format!("{base}/scaling"))? {
                t.set_scaling(v)?;
            }
            if let Some(v) = read_optional_vec(doc, &format!("{base}/rotation"))? {
                t.set_rotation(v)?;
            }
            if let Some(v) = read_optional_vec(doc, &format!("{base}/translation"))? {
                t.set_translation(v)?;
            }
        }
        t.build_matrix();
        Ok(t)
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        let base = format!("{path}/transformation");
        doc.set_point(&format!("{base}/scaling"), Point3::ORIGIN + self.scaling)?;
        doc.set_point(&format!("{base}/rotation"), Point3::ORIGIN + self.rotation)?;
        doc.set_point(&format!("{base}/translation"), Point3::ORIGIN + self.translation)?;
        Ok(())
    }
}

fn read_optional_vec(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Option<Vec3>> {
    if doc.check_element(path) {
        Ok(Some(doc.point(path)?.to_vec3()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Tolerance;
    use crate::parse::XmlDocument;

    #[test]
    fn forward_then_inverse_returns_the_point() {
        let t = Transformation::from_components(
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(10.0, -35.0, 80.0),
            Vec3::new(2.0, 0.5, 1.5),
        )
        .unwrap();
        let p = Point3::new(0.3, 4.0, -1.2);
        let back = t.inverse_point(t.transform_point(p));
        assert!(Tolerance::new(1e-10).approx_eq_point3(p, back));
        assert!((t.matrix() * t.inverse()).is_identity(1e-10));
    }

    #[test]
    fn scaling_applies_before_rotation() {
        let t = Transformation::from_components(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 90.0),
            Vec3::new(2.0, 1.0, 1.0),
        )
        .unwrap();
        let p = t.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(Tolerance::new(1e-12).approx_eq_point3(p, Point3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn setters_reject_non_finite_input() {
        let mut t = Transformation::identity();
        assert!(matches!(
            t.set_translation(Vec3::new(f64::NAN, 0.0, 0.0)),
            Err(EngineError::NonFinite { what: "translation" })
        ));
        assert!(t.set_rotation(Vec3::new(0.0, f64::INFINITY, 0.0)).is_err());
        assert!(t.set_scaling(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert_eq!(t, Transformation::identity());
    }

    #[test]
    fn matrix_is_stale_until_rebuilt() {
        let mut t = Transformation::identity();
        t.set_translation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(t.matrix().is_identity(0.0));
        t.build_matrix();
        assert_eq!(t.transform_point(Point3::ORIGIN), Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn reads_partial_transformation_and_writes_back() {
        let doc = XmlDocument::parse_str(
            "<root><transformation><translation><x>1</x><y>2</y><z>3</z></translation></transformation></root>",
        )
        .unwrap();
        let t = Transformation::read(&doc, "/root").unwrap();
        assert_eq!(t.translation(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scaling(), Vec3::new(1.0, 1.0, 1.0));

        let mut out = XmlDocument::with_root("root");
        t.write(&mut out, "/root").unwrap();
        assert_eq!(Transformation::read(&out, "/root").unwrap(), t);
    }
}
