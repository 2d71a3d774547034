//! Component segments span a run of wing segments and carry the control
//! surfaces. Their eta runs along the projected leading edge of the run.

use crate::config::{ComponentRef, ReadContext};
use crate::error::{EngineError, EngineResult, check_index};
use crate::geom::{Point3, Vec3};
use crate::parse::DocumentBackend;

use super::control_surface::TrailingEdgeDevice;
use super::wing_segment::WingSegment;

#[derive(Debug)]
pub struct ComponentSegment {
    uid: String,
    name: String,
    from_element_uid: String,
    to_element_uid: String,
    /// 0-based positions in the wing's segment list, inner to outer.
    segment_indices: Vec<usize>,
    devices: Vec<TrailingEdgeDevice>,
}

impl ComponentSegment {
    pub(crate) fn read(
        ctx: &mut ReadContext<'_>,
        doc: &dyn DocumentBackend,
        path: &str,
        wing: usize,
        index: usize,
        segments: &[WingSegment],
    ) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry
            .add_uid(&uid, ComponentRef::ComponentSegment { wing, index })?;
        let from_element_uid = doc.text(&format!("{path}/fromElementUID"))?;
        let to_element_uid = doc.text(&format!("{path}/toElementUID"))?;
        let segment_indices = segment_run(segments, &from_element_uid, &to_element_uid)
            .ok_or_else(|| {
                EngineError::configuration(format!(
                    "component segment `{uid}`: no segment chain from `{from_element_uid}` to `{to_element_uid}`"
                ))
            })?;

        let devices_path = format!("{path}/controlSurfaces/trailingEdgeDevices");
        let mut devices = Vec::new();
        for k in 1..=doc.named_child_count(&devices_path, "trailingEdgeDevice") {
            let device_path = format!("{devices_path}/trailingEdgeDevice[{k}]");
            let device = TrailingEdgeDevice::read(doc, &device_path)?;
            ctx.registry.add_uid(
                device.uid(),
                ComponentRef::TrailingEdgeDevice {
                    wing,
                    component_segment: index,
                    index: k - 1,
                },
            )?;
            devices.push(device);
        }

        log::debug!(
            "component segment `{uid}`: segments {segment_indices:?}, {} devices",
            devices.len()
        );
        Ok(Self {
            uid,
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            from_element_uid,
            to_element_uid,
            segment_indices,
            devices,
        })
    }

    pub(crate) fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        doc.set_text(&format!("{path}/fromElementUID"), &self.from_element_uid)?;
        doc.set_text(&format!("{path}/toElementUID"), &self.to_element_uid)?;
        for (k, device) in self.devices.iter().enumerate() {
            device.write(
                doc,
                &format!(
                    "{path}/controlSurfaces/trailingEdgeDevices/trailingEdgeDevice[{}]",
                    k + 1
                ),
            )?;
        }
        Ok(())
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
    pub fn segment_indices(&self) -> &[usize] {
        &self.segment_indices
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// 1-based device access.
    pub fn device(&self, index: usize) -> EngineResult<&TrailingEdgeDevice> {
        let i = check_index("trailing edge device", index, self.devices.len())?;
        Ok(&self.devices[i])
    }

    pub fn device_by_uid(&self, uid: &str) -> EngineResult<&TrailingEdgeDevice> {
        self.devices
            .iter()
            .find(|d| d.uid() == uid)
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    pub(crate) fn device_mut(&mut self, index: usize) -> EngineResult<&mut TrailingEdgeDevice> {
        let i = check_index("trailing edge device", index, self.devices.len())?;
        Ok(&mut self.devices[i])
    }

    #[must_use]
    pub fn devices(&self) -> &[TrailingEdgeDevice] {
        &self.devices
    }

    /// Maps component-segment eta to `(segment index, segment eta)`. The
    /// index is 0-based in the wing's segment list. Xsi is not remapped.
    #[must_use]
    pub fn segment_eta(&self, segments: &[WingSegment], eta: f64) -> (usize, f64) {
        let lengths: Vec<f64> = self
            .segment_indices
            .iter()
            .map(|&i| projected_span(&segments[i]))
            .collect();
        let total: f64 = lengths.iter().sum();
        let last = self.segment_indices.len() - 1;
        if total <= 0.0 {
            return (self.segment_indices[0], eta.clamp(0.0, 1.0));
        }

        let target = eta.clamp(0.0, 1.0) * total;
        let mut start = 0.0;
        for (k, &len) in lengths.iter().enumerate() {
            if target <= start + len || k == last {
                let local = if len > 0.0 { (target - start) / len } else { 0.0 };
                return (self.segment_indices[k], local.clamp(0.0, 1.0));
            }
            start += len;
        }
        (self.segment_indices[last], 1.0)
    }

    #[must_use]
    pub fn chord_point(&self, segments: &[WingSegment], eta: f64, xsi: f64) -> Point3 {
        let (s, local) = self.segment_eta(segments, eta);
        segments[s].chord_point(local, xsi)
    }

    #[must_use]
    pub fn upper_point(&self, segments: &[WingSegment], eta: f64, xsi: f64) -> Point3 {
        let (s, local) = self.segment_eta(segments, eta);
        segments[s].upper_point(local, xsi)
    }

    #[must_use]
    pub fn lower_point(&self, segments: &[WingSegment], eta: f64, xsi: f64) -> Point3 {
        let (s, local) = self.segment_eta(segments, eta);
        segments[s].lower_point(local, xsi)
    }

    #[must_use]
    pub fn chord_length(&self, segments: &[WingSegment], eta: f64) -> f64 {
        let (s, local) = self.segment_eta(segments, eta);
        segments[s].chord_length(local)
    }

    /// Unit normal of the chord surface at `eta`, pointing to the upper side
    /// for a right wing.
    #[must_use]
    pub fn normal(&self, segments: &[WingSegment], eta: f64) -> Vec3 {
        let (s, local) = self.segment_eta(segments, eta);
        let segment = &segments[s];
        let chord = segment.chord_point(local, 1.0) - segment.chord_point(local, 0.0);
        let span = segment.chord_point(1.0, 0.0) - segment.chord_point(0.0, 0.0);
        chord.cross(span).normalized().unwrap_or(Vec3::Z)
    }
}

/// Leading-edge length of `segment` projected onto the y-z plane.
fn projected_span(segment: &WingSegment) -> f64 {
    let inner = segment.chord_point(0.0, 0.0);
    let outer = segment.chord_point(1.0, 0.0);
    Vec3::new(0.0, outer.y - inner.y, outer.z - inner.z).length()
}

/// Follows segments from the one starting at `from` until one ends at `to`.
fn segment_run(segments: &[WingSegment], from: &str, to: &str) -> Option<Vec<usize>> {
    let mut run = Vec::new();
    let mut current = from;
    while run.len() < segments.len() {
        let next = segments
            .iter()
            .position(|s| s.inner_connection().element_uid() == current)?;
        run.push(next);
        current = segments[next].outer_connection().element_uid();
        if current == to {
            return Some(run);
        }
    }
    None
}
