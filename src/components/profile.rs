//! Cross-section profiles referenced by section elements.

use crate::config::{ComponentRef, ReadContext};
use crate::error::{EngineError, EngineResult};
use crate::geom::{Point3, Vec3, Wire};
use crate::parse::DocumentBackend;

/// Airfoil given by a closed point list running trailing edge, upper side,
/// leading edge, lower side, back to the trailing edge.
#[derive(Debug, Clone, PartialEq)]
pub struct WingProfile {
    uid: String,
    name: String,
    points: Vec<Point3>,
    le_index: usize,
}

impl WingProfile {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, points: Vec<Point3>) -> EngineResult<Self> {
        let uid = uid.into();
        validate_points(&uid, &points, 3)?;
        let le_index = points
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if p.x < points[best].x { i } else { best });
        if le_index == 0 || le_index == points.len() - 1 {
            return Err(EngineError::configuration(format!(
                "profile `{uid}` must start and end at the trailing edge"
            )));
        }
        Ok(Self {
            uid,
            name: name.into(),
            points,
            le_index,
        })
    }

    pub fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        let name = doc.optional_text(&format!("{path}/name")).unwrap_or_default();
        let points = read_point_list(doc, &format!("{path}/pointList"))?;
        let profile = Self::new(uid, name, points)?;
        ctx.registry.add_uid(&profile.uid, ComponentRef::WingProfile)?;
        Ok(profile)
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        write_point_list(doc, &format!("{path}/pointList"), &self.points)
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Point with the smallest x.
    #[must_use]
    pub fn leading_edge(&self) -> Point3 {
        self.points[self.le_index]
    }

    /// Midpoint of the first and last point.
    #[must_use]
    pub fn trailing_edge(&self) -> Point3 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        first.lerp(last, 0.5)
    }

    #[must_use]
    pub fn chord_point(&self, xsi: f64) -> Point3 {
        self.leading_edge().lerp(self.trailing_edge(), xsi)
    }

    #[must_use]
    pub fn wire(&self) -> Wire {
        Wire::closed(self.points.clone())
    }

    /// Trailing edge to leading edge over the upper side.
    #[must_use]
    pub fn upper_wire(&self) -> Wire {
        Wire::open(self.points[..=self.le_index].to_vec())
    }

    /// Leading edge to trailing edge over the lower side.
    #[must_use]
    pub fn lower_wire(&self) -> Wire {
        Wire::open(self.points[self.le_index..].to_vec())
    }

    /// Upper-side point whose projection on the chord line is at `xsi`.
    #[must_use]
    pub fn upper_point(&self, xsi: f64) -> Point3 {
        let side: Vec<Point3> = self.points[..=self.le_index].iter().rev().copied().collect();
        self.point_at_chord_fraction(&side, xsi)
    }

    /// Lower-side point whose projection on the chord line is at `xsi`.
    #[must_use]
    pub fn lower_point(&self, xsi: f64) -> Point3 {
        self.point_at_chord_fraction(&self.points[self.le_index..], xsi)
    }

    /// `side` runs from the leading edge towards the trailing edge.
    fn point_at_chord_fraction(&self, side: &[Point3], xsi: f64) -> Point3 {
        let le = self.leading_edge();
        let chord = self.trailing_edge() - le;
        let chord_sq = chord.length_squared();
        if chord_sq == 0.0 {
            return le;
        }
        let fraction = |p: Point3| (p - le).dot(chord) / chord_sq;

        for pair in side.windows(2) {
            let (a, b) = (fraction(pair[0]), fraction(pair[1]));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if xsi >= lo && xsi <= hi {
                let t = if hi > lo { (xsi - a) / (b - a) } else { 0.0 };
                return pair[0].lerp(pair[1], t);
            }
        }

        // Outside the sampled range: clamp to the nearer end.
        let first = side[0];
        let last = side[side.len() - 1];
        if (fraction(first) - xsi).abs() <= (fraction(last) - xsi).abs() {
            first
        } else {
            last
        }
    }
}

/// Closed fuselage cross section.
#[derive(Debug, Clone, PartialEq)]
pub struct FuselageProfile {
    uid: String,
    name: String,
    points: Vec<Point3>,
}

impl FuselageProfile {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, points: Vec<Point3>) -> EngineResult<Self> {
        let uid = uid.into();
        validate_points(&uid, &points, 3)?;
        Ok(Self {
            uid,
            name: name.into(),
            points,
        })
    }

    pub fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        let name = doc.optional_text(&format!("{path}/name")).unwrap_or_default();
        let points = read_point_list(doc, &format!("{path}/pointList"))?;
        let profile = Self::new(uid, name, points)?;
        ctx.registry.add_uid(&profile.uid, ComponentRef::FuselageProfile)?;
        Ok(profile)
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        write_point_list(doc, &format!("{path}/pointList"), &self.points)
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn wire(&self) -> Wire {
        Wire::closed(self.points.clone())
    }

    /// Point at normalized arc length `zeta` around the closed outline.
    #[must_use]
    pub fn point_at(&self, zeta: f64) -> Point3 {
        let wire = self.wire();
        let pts = wire.points();
        let total = wire.length();
        if total <= 0.0 {
            return pts[0];
        }
        let target = zeta.rem_euclid(1.0) * total;
        let mut walked = 0.0;
        for i in 0..pts.len() {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            let len = a.distance_to(b);
            if walked + len >= target && len > 0.0 {
                return a.lerp(b, (target - walked) / len);
            }
            walked += len;
        }
        pts[0]
    }
}

fn validate_points(uid: &str, points: &[Point3], min: usize) -> EngineResult<()> {
    if points.len() < min {
        return Err(EngineError::configuration(format!(
            "profile `{uid}` needs at least {min} points, has {}",
            points.len()
        )));
    }
    if points.iter().any(|p| !p.is_finite()) {
        return Err(EngineError::NonFinite { what: "profile point" });
    }
    Ok(())
}

/// Reads parallel `x`, `y` and `z` lists into points.
pub(crate) fn read_point_list(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Vec<Point3>> {
    let xs = doc.vector(&format!("{path}/x"))?;
    let ys = doc.vector(&format!("{path}/y"))?;
    let zs = doc.vector(&format!("{path}/z"))?;
    if xs.len() != ys.len() || xs.len() != zs.len() {
        return Err(EngineError::configuration(format!(
            "point list `{path}` has coordinate lists of different length ({}, {}, {})",
            xs.len(),
            ys.len(),
            zs.len()
        )));
    }
    Ok(xs
        .into_iter()
        .zip(ys)
        .zip(zs)
        .map(|((x, y), z)| Point3::new(x, y, z))
        .collect())
}

pub(crate) fn write_point_list(doc: &mut dyn DocumentBackend, path: &str, points: &[Point3]) -> EngineResult<()> {
    let coord = |f: fn(&Point3) -> f64| points.iter().map(f).collect::<Vec<f64>>();
    doc.set_vector(&format!("{path}/x"), &coord(|p| p.x))?;
    doc.set_vector(&format!("{path}/y"), &coord(|p| p.y))?;
    doc.set_vector(&format!("{path}/z"), &coord(|p| p.z))?;
    Ok(())
}

/// Vector from the leading to the trailing edge of `profile`.
#[must_use]
pub fn chord_vector(profile: &WingProfile) -> Vec3 {
    profile.trailing_edge() - profile.leading_edge()
}
