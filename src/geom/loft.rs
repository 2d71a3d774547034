//! Lofting through ordered wire sections.
//!
//! Sections are matched point-by-point. When point counts differ every
//! section is resampled by arc length to the largest count. Ruled lofts
//! connect consecutive sections with straight rulings; smooth lofts insert
//! Catmull-Rom interpolated rows between sections.

use super::{GeomMesh, Point3, Shape, Wire};

/// Options for [`loft_wires`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoftOptions {
    /// Cap the ends and orient the result as a closed solid.
    pub solid: bool,
    /// Straight rulings between sections.
    pub ruled: bool,
    /// Interpolated rows inserted between sections of a smooth loft.
    pub span_subdivisions: usize,
}

impl Default for LoftOptions {
    fn default() -> Self {
        Self {
            solid: true,
            ruled: true,
            span_subdivisions: 4,
        }
    }
}

impl LoftOptions {
    #[must_use]
    pub const fn ruled_solid() -> Self {
        Self {
            solid: true,
            ruled: true,
            span_subdivisions: 0,
        }
    }

    #[must_use]
    pub const fn ruled_shell() -> Self {
        Self {
            solid: false,
            ruled: true,
            span_subdivisions: 0,
        }
    }
}

/// Errors that can occur during loft operations.
#[derive(Debug, thiserror::Error)]
pub enum LoftError {
    #[error("loft requires at least 2 sections, got {count}")]
    NotEnoughSections { count: usize },
    #[error("section {index} has too few points (has {point_count})")]
    SectionTooShort { index: usize, point_count: usize },
    #[error("section {index} contains non-finite coordinates at point {point_index}")]
    NonFinitePoint { index: usize, point_index: usize },
    #[error("sections have mixed closed/open states: section {first_closed_idx} is closed, section {first_open_idx} is open")]
    MixedClosedOpen {
        first_closed_idx: usize,
        first_open_idx: usize,
    },
    #[error("solid loft requires closed sections")]
    SolidRequiresClosedSections,
    #[error("degenerate section {index} (zero length)")]
    DegenerateSection { index: usize },
}

pub type LoftResult<T> = Result<T, LoftError>;

/// Lofts `sections` in order. Produces a [`Shape::Solid`] when
/// `options.solid` is set, a [`Shape::Shell`] otherwise.
pub fn loft_wires(sections: &[Wire], options: &LoftOptions) -> LoftResult<Shape> {
    validate_sections(sections)?;
    let closed = sections[0].is_closed();
    if options.solid && !closed {
        return Err(LoftError::SolidRequiresClosedSections);
    }

    let rows = matched_rows(sections)?;
    let rows = if options.ruled || rows.len() < 3 || options.span_subdivisions == 0 {
        rows
    } else {
        interpolate_rows(&rows, options.span_subdivisions)
    };

    log::trace!(
        "loft: {} sections -> {} rows x {} points (solid={}, ruled={})",
        sections.len(),
        rows.len(),
        rows[0].len(),
        options.solid,
        options.ruled
    );

    let mut mesh = side_mesh(&rows, closed);
    if options.solid {
        add_caps(&mut mesh, &rows);
        if mesh.signed_volume() < 0.0 {
            mesh = mesh.flipped();
        }
        Ok(Shape::Solid(mesh))
    } else {
        Ok(Shape::Shell(mesh))
    }
}

/// Wire at parameter `t` between `a` (t = 0) and `b` (t = 1). Both wires are
/// brought to a common point count first.
pub fn blend_wires(a: &Wire, b: &Wire, t: f64) -> LoftResult<Wire> {
    let pair = [a.clone(), b.clone()];
    validate_sections(&pair)?;
    let rows = matched_rows(&pair)?;
    let points = rows[0]
        .iter()
        .zip(&rows[1])
        .map(|(p, q)| p.lerp(*q, t))
        .collect();
    Ok(if a.is_closed() {
        Wire::closed(points)
    } else {
        Wire::open(points)
    })
}

fn validate_sections(sections: &[Wire]) -> LoftResult<()> {
    if sections.len() < 2 {
        return Err(LoftError::NotEnoughSections {
            count: sections.len(),
        });
    }

    let mut first_closed = None;
    let mut first_open = None;
    for (index, wire) in sections.iter().enumerate() {
        let min_points = if wire.is_closed() { 3 } else { 2 };
        if wire.len() < min_points {
            return Err(LoftError::SectionTooShort {
                index,
                point_count: wire.len(),
            });
        }
        if let Some(point_index) = wire.points().iter().position(|p| !p.is_finite()) {
            return Err(LoftError::NonFinitePoint { index, point_index });
        }
        if wire.is_closed() {
            first_closed.get_or_insert(index);
        } else {
            first_open.get_or_insert(index);
        }
    }

    if let (Some(first_closed_idx), Some(first_open_idx)) = (first_closed, first_open) {
        return Err(LoftError::MixedClosedOpen {
            first_closed_idx,
            first_open_idx,
        });
    }
    Ok(())
}

fn matched_rows(sections: &[Wire]) -> LoftResult<Vec<Vec<Point3>>> {
    let target = sections.iter().map(Wire::len).max().unwrap_or(0);
    sections
        .iter()
        .enumerate()
        .map(|(index, wire)| {
            if wire.len() == target {
                Ok(wire.points().to_vec())
            } else {
                resample(wire, target).ok_or(LoftError::DegenerateSection { index })
            }
        })
        .collect()
}

/// Resamples `wire` to `count` points spaced evenly by arc length,
/// starting at the first point.
fn resample(wire: &Wire, count: usize) -> Option<Vec<Point3>> {
    let mut pts = wire.points().to_vec();
    if wire.is_closed() {
        pts.push(*pts.first()?);
    }
    let total = wire.length();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let steps = if wire.is_closed() { count } else { count - 1 };
    let step = total / steps as f64;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0usize;
    let mut seg_start = 0.0;
    for k in 0..count {
        let s = step * k as f64;
        while seg + 2 < pts.len() && seg_start + pts[seg].distance_to(pts[seg + 1]) < s {
            seg_start += pts[seg].distance_to(pts[seg + 1]);
            seg += 1;
        }
        let seg_len = pts[seg].distance_to(pts[seg + 1]);
        let t = if seg_len > 0.0 {
            ((s - seg_start) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(pts[seg].lerp(pts[seg + 1], t));
    }
    Some(out)
}

fn interpolate_rows(rows: &[Vec<Point3>], subdivisions: usize) -> Vec<Vec<Point3>> {
    let last = rows.len() - 1;
    let mut out = Vec::with_capacity(rows.len() + last * subdivisions);
    for i in 0..last {
        out.push(rows[i].clone());
        let p0 = &rows[i.saturating_sub(1)];
        let p1 = &rows[i];
        let p2 = &rows[i + 1];
        let p3 = &rows[(i + 2).min(last)];
        for s in 1..=subdivisions {
            let t = s as f64 / (subdivisions + 1) as f64;
            let row = (0..p1.len())
                .map(|j| catmull_rom(p0[j], p1[j], p2[j], p3[j], t))
                .collect();
            out.push(row);
        }
    }
    out.push(rows[last].clone());
    out
}

fn catmull_rom(p0: Point3, p1: Point3, p2: Point3, p3: Point3, t: f64) -> Point3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let f = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Point3::new(
        f(p0.x, p1.x, p2.x, p3.x),
        f(p0.y, p1.y, p2.y, p3.y),
        f(p0.z, p1.z, p2.z, p3.z),
    )
}

fn side_mesh(rows: &[Vec<Point3>], closed: bool) -> GeomMesh {
    let n = rows[0].len();
    let positions: Vec<[f64; 3]> = rows.iter().flatten().map(|p| p.to_array()).collect();
    let mut indices = Vec::new();
    let edges = if closed { n } else { n - 1 };

    for r in 0..rows.len() - 1 {
        for j in 0..edges {
            let jn = (j + 1) % n;
            let a = (r * n + j) as u32;
            let b = (r * n + jn) as u32;
            let c = ((r + 1) * n + jn) as u32;
            let d = ((r + 1) * n + j) as u32;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    GeomMesh::new(positions, indices)
}

/// Fans both end rows from their centroids, wound against the side quads.
fn add_caps(mesh: &mut GeomMesh, rows: &[Vec<Point3>]) {
    let n = rows[0].len();
    let last = rows.len() - 1;

    for (row_index, reversed) in [(0usize, true), (last, false)] {
        let row = &rows[row_index];
        let sum = row.iter().fold(Point3::ORIGIN.to_vec3(), |acc, p| acc + p.to_vec3());
        let centroid = Point3::ORIGIN + sum / n as f64;
        let c = mesh.positions.len() as u32;
        mesh.positions.push(centroid.to_array());
        let base = (row_index * n) as u32;
        for j in 0..n {
            let a = base + j as u32;
            let b = base + ((j + 1) % n) as u32;
            if reversed {
                mesh.indices.extend_from_slice(&[c, b, a]);
            } else {
                mesh.indices.extend_from_slice(&[c, a, b]);
            }
        }
    }
}
