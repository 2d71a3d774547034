//! Positionings place sections relative to each other by length, sweep and
//! dihedral. Chains start at sections without an incoming positioning.

use std::collections::HashMap;

use crate::config::{ComponentRef, Owner, ReadContext};
use crate::error::{EngineError, EngineResult, check_index};
use crate::geom::{Transform, Vec3};
use crate::parse::DocumentBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct Positioning {
    uid: String,
    length: f64,
    sweep_angle: f64,
    dihedral_angle: f64,
    from_section_uid: Option<String>,
    to_section_uid: String,
}

impl Positioning {
    pub fn new(
        uid: impl Into<String>,
        length: f64,
        sweep_angle: f64,
        dihedral_angle: f64,
        from_section_uid: Option<String>,
        to_section_uid: impl Into<String>,
    ) -> EngineResult<Self> {
        let mut p = Self {
            uid: uid.into(),
            length: 0.0,
            sweep_angle: 0.0,
            dihedral_angle: 0.0,
            from_section_uid,
            to_section_uid: to_section_uid.into(),
        };
        p.set_length(length)?;
        p.set_sweep_angle(sweep_angle)?;
        p.set_dihedral_angle(dihedral_angle)?;
        Ok(p)
    }

    fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        Self::new(
            doc.attribute(path, "uID")?,
            doc.double(&format!("{path}/length"))?,
            doc.double(&format!("{path}/sweepAngle"))?,
            doc.double(&format!("{path}/dihedralAngle"))?,
            doc.optional_text(&format!("{path}/fromSectionUID")),
            doc.text(&format!("{path}/toSectionUID"))?,
        )
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_double(&format!("{path}/length"), self.length)?;
        doc.set_double(&format!("{path}/sweepAngle"), self.sweep_angle)?;
        doc.set_double(&format!("{path}/dihedralAngle"), self.dihedral_angle)?;
        if let Some(from) = &self.from_section_uid {
            doc.set_text(&format!("{path}/fromSectionUID"), from)?;
        }
        doc.set_text(&format!("{path}/toSectionUID"), &self.to_section_uid)?;
        Ok(())
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn sweep_angle(&self) -> f64 {
        self.sweep_angle
    }

    #[must_use]
    pub fn dihedral_angle(&self) -> f64 {
        self.dihedral_angle
    }

    #[must_use]
    pub fn from_section_uid(&self) -> Option<&str> {
        self.from_section_uid.as_deref()
    }

    #[must_use]
    pub fn to_section_uid(&self) -> &str {
        &self.to_section_uid
    }

    pub fn set_length(&mut self, length: f64) -> EngineResult<()> {
        if !length.is_finite() {
            return Err(EngineError::NonFinite { what: "positioning length" });
        }
        self.length = length;
        Ok(())
    }

    pub fn set_sweep_angle(&mut self, degrees: f64) -> EngineResult<()> {
        if !degrees.is_finite() {
            return Err(EngineError::NonFinite { what: "sweep angle" });
        }
        self.sweep_angle = degrees;
        Ok(())
    }

    pub fn set_dihedral_angle(&mut self, degrees: f64) -> EngineResult<()> {
        if !degrees.is_finite() {
            return Err(EngineError::NonFinite { what: "dihedral angle" });
        }
        self.dihedral_angle = degrees;
        Ok(())
    }

    /// Offset from the start to the end of this positioning.
    #[must_use]
    pub fn vector(&self) -> Vec3 {
        let sweep = self.sweep_angle.to_radians();
        let dihedral = self.dihedral_angle.to_radians();
        Vec3::new(
            self.length * sweep.sin(),
            self.length * dihedral.cos() * sweep.cos(),
            self.length * dihedral.sin() * sweep.cos(),
        )
    }
}

/// All positionings of one wing or fuselage plus the resolved section offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positionings {
    items: Vec<Positioning>,
    offsets: HashMap<String, Vec3>,
}

impl Positionings {
    pub fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend, path: &str, owner: Owner) -> EngineResult<Self> {
        let base = format!("{path}/positionings");
        let count = doc.named_child_count(&base, "positioning");
        let mut items = Vec::with_capacity(count);
        for i in 1..=count {
            let p = Positioning::read(doc, &format!("{base}/positioning[{i}]"))?;
            ctx.registry
                .add_uid(&p.uid, ComponentRef::Positioning { owner, index: i - 1 })?;
            items.push(p);
        }
        let mut positionings = Self {
            items,
            offsets: HashMap::new(),
        };
        positionings.update()?;
        Ok(positionings)
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        for (i, p) in self.items.iter().enumerate() {
            p.write(doc, &format!("{path}/positionings/positioning[{}]", i + 1))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> EngineResult<&Positioning> {
        let i = check_index("positioning", index, self.items.len())?;
        Ok(&self.items[i])
    }

    /// Offsets are stale until the next [`Self::update`].
    pub fn get_mut(&mut self, index: usize) -> EngineResult<&mut Positioning> {
        let i = check_index("positioning", index, self.items.len())?;
        Ok(&mut self.items[i])
    }

    pub fn push(&mut self, positioning: Positioning) {
        self.items.push(positioning);
    }

    /// Resolves the chained offset of every target section.
    pub fn update(&mut self) -> EngineResult<()> {
        let mut by_target: HashMap<&str, usize> = HashMap::with_capacity(self.items.len());
        for (i, p) in self.items.iter().enumerate() {
            if by_target.insert(p.to_section_uid.as_str(), i).is_some() {
                return Err(EngineError::configuration(format!(
                    "section `{}` is the target of more than one positioning",
                    p.to_section_uid
                )));
            }
        }

        let mut offsets: HashMap<String, Vec3> = HashMap::with_capacity(self.items.len());
        for p in &self.items {
            let mut chain = vec![p.to_section_uid.as_str()];
            let mut offset = Vec3::ZERO;
            let mut current = p;
            loop {
                offset = offset + current.vector();
                let Some(from) = current.from_section_uid.as_deref() else {
                    break;
                };
                if let Some(known) = offsets.get(from) {
                    offset = offset + *known;
                    break;
                }
                if chain.contains(&from) {
                    return Err(EngineError::configuration(format!(
                        "positioning chain through section `{from}` is cyclic"
                    )));
                }
                chain.push(from);
                match by_target.get(from) {
                    Some(&next) => current = &self.items[next],
                    None => break,
                }
            }
            offsets.insert(p.to_section_uid.clone(), offset);
        }

        self.offsets = offsets;
        Ok(())
    }

    /// Offset of `section_uid`; zero for sections no positioning targets.
    #[must_use]
    pub fn offset(&self, section_uid: &str) -> Vec3 {
        self.offsets.get(section_uid).copied().unwrap_or(Vec3::ZERO)
    }

    #[must_use]
    pub fn transform(&self, section_uid: &str) -> Transform {
        Transform::translate(self.offset(section_uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Positionings {
        let mut p = Positionings::default();
        p.push(Positioning::new("P1", 0.0, 0.0, 0.0, None, "S1").unwrap());
        p.push(Positioning::new("P2", 2.0, 0.0, 0.0, Some("S1".into()), "S2").unwrap());
        p.push(Positioning::new("P3", 3.0, 30.0, 10.0, Some("S2".into()), "S3").unwrap());
        p
    }

    #[test]
    fn positioning_vector_follows_sweep_and_dihedral() {
        let p = Positioning::new("P", 2.0, 30.0, 90.0, None, "S").unwrap();
        let v = p.vector();
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
        assert!((v.z - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn offsets_chain_from_the_root() {
        let mut p = chain();
        p.update().unwrap();
        assert_eq!(p.offset("S1"), Vec3::ZERO);
        assert_eq!(p.offset("S2"), Vec3::new(0.0, 2.0, 0.0));
        let expected = Vec3::new(0.0, 2.0, 0.0) + p.get(3).unwrap().vector();
        assert!((p.offset("S3") - expected).length() < 1e-12);
        assert_eq!(p.offset("unknown"), Vec3::ZERO);
    }

    #[test]
    fn cyclic_chain_is_a_configuration_error() {
        let mut p = Positionings::default();
        p.push(Positioning::new("P1", 1.0, 0.0, 0.0, Some("S2".into()), "S1").unwrap());
        p.push(Positioning::new("P2", 1.0, 0.0, 0.0, Some("S1".into()), "S2").unwrap());
        assert!(matches!(p.update(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn index_access_is_one_based() {
        let p = chain();
        assert_eq!(p.get(1).unwrap().uid(), "P1");
        assert!(matches!(
            p.get(0),
            Err(EngineError::IndexOutOfRange { index: 0, count: 3, .. })
        ));
        assert!(p.get(4).is_err());
    }
}
