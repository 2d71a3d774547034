//! Approximate mesh booleans by triangle-centroid classification.
//!
//! Triangles are not split along the intersection curve; each triangle of one
//! operand is kept or dropped depending on whether its centroid lies inside
//! the other operand. The partition is exact in one respect: every triangle
//! of `a` ends up in exactly one of `cut(a, b)` and `common(a, b)`, and the
//! borrowed triangles of `b` appear in both with opposite winding, so the two
//! volumes always add up to the volume of `a`.

use super::mesh::triangle_centroid;
use super::{BBox, GeomMesh, Point3, Tolerance, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Cut,
    Common,
    Fuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointContainment {
    Inside,
    Outside,
    OnSurface,
    Indeterminate,
}

#[derive(Debug, thiserror::Error)]
pub enum BooleanError {
    #[error("mesh is empty")]
    EmptyMesh,
    #[error("mesh contains invalid geometry: {0}")]
    InvalidGeometry(String),
}

pub type BooleanResult<T> = Result<T, BooleanError>;

/// Combines two closed meshes.
pub fn boolean_meshes(a: &GeomMesh, b: &GeomMesh, op: BooleanOp, tol: Tolerance) -> BooleanResult<GeomMesh> {
    for mesh in [a, b] {
        if mesh.is_empty() {
            return Err(BooleanError::EmptyMesh);
        }
        mesh.validate().map_err(BooleanError::InvalidGeometry)?;
    }

    let a_in_b: Vec<([Point3; 3], PointContainment)> = a
        .triangles()
        .map(|tri| {
            let c = classify_point_in_mesh(triangle_centroid(&tri), b, tol);
            (tri, c)
        })
        .collect();
    let b_in_a: Vec<([Point3; 3], PointContainment)> = b
        .triangles()
        .map(|tri| {
            let c = classify_point_in_mesh(triangle_centroid(&tri), a, tol);
            (tri, c)
        })
        .collect();

    let mut out = GeomMesh::default();
    match op {
        BooleanOp::Cut => {
            for (tri, c) in &a_in_b {
                if *c != PointContainment::Inside {
                    out.push_triangle(*tri);
                }
            }
            for (tri, c) in &b_in_a {
                if *c == PointContainment::Inside {
                    out.push_triangle([tri[0], tri[2], tri[1]]);
                }
            }
        }
        BooleanOp::Common => {
            for (tri, c) in &a_in_b {
                if *c == PointContainment::Inside {
                    out.push_triangle(*tri);
                }
            }
            for (tri, c) in &b_in_a {
                if *c == PointContainment::Inside {
                    out.push_triangle(*tri);
                }
            }
        }
        BooleanOp::Fuse => {
            for (tri, c) in &a_in_b {
                if *c != PointContainment::Inside {
                    out.push_triangle(*tri);
                }
            }
            for (tri, c) in &b_in_a {
                if matches!(c, PointContainment::Outside | PointContainment::Indeterminate) {
                    out.push_triangle(*tri);
                }
            }
        }
    }

    log::trace!(
        "boolean {:?}: {} + {} triangles -> {}",
        op,
        a.triangle_count(),
        b.triangle_count(),
        out.triangle_count()
    );
    Ok(out)
}

/// Classify a point against a closed triangle mesh (inside/outside).
///
/// Casts three skewed rays and takes the majority of the unambiguous
/// parity votes.
#[must_use]
pub fn classify_point_in_mesh(point: Point3, mesh: &GeomMesh, tol: Tolerance) -> PointContainment {
    let Some(bbox) = mesh.bbox() else {
        return PointContainment::Indeterminate;
    };
    if !bbox.expand_by(tol.eps).contains_point(point) {
        return PointContainment::Outside;
    }

    let dirs = [
        Vec3::new(1.0, 0.234_567_89, 0.345_678_91),
        Vec3::new(0.345_678_91, 1.0, 0.234_567_89),
        Vec3::new(0.234_567_89, 0.345_678_91, 1.0),
    ];

    let mut inside = 0usize;
    let mut outside = 0usize;
    for dir in dirs {
        let dir = dir.normalized().unwrap_or(Vec3::X);
        match ray_cast_containment(point, mesh, dir, tol) {
            RayVote::Certain(PointContainment::OnSurface) => return PointContainment::OnSurface,
            RayVote::Certain(PointContainment::Inside) => inside += 1,
            RayVote::Certain(_) => outside += 1,
            RayVote::Ambiguous => {}
        }
    }

    match inside.cmp(&outside) {
        std::cmp::Ordering::Greater => PointContainment::Inside,
        std::cmp::Ordering::Less => PointContainment::Outside,
        std::cmp::Ordering::Equal => PointContainment::Indeterminate,
    }
}

enum RayVote {
    Certain(PointContainment),
    Ambiguous,
}

fn ray_cast_containment(point: Point3, mesh: &GeomMesh, dir: Vec3, tol: Tolerance) -> RayVote {
    let mut intersections = 0usize;
    let mut ambiguous = false;

    for tri in mesh.triangles() {
        if point_on_triangle(point, &tri, tol) {
            return RayVote::Certain(PointContainment::OnSurface);
        }

        let Some(hit) = ray_triangle_intersection(point, dir, &tri, tol) else {
            continue;
        };

        if hit.t <= tol.eps {
            continue;
        }

        let edge_eps = tol.eps * 10.0;
        let w = 1.0 - hit.u - hit.v;
        if hit.u.abs() <= edge_eps || hit.v.abs() <= edge_eps || w.abs() <= edge_eps {
            ambiguous = true;
            continue;
        }

        intersections += 1;
    }

    if ambiguous {
        return RayVote::Ambiguous;
    }

    RayVote::Certain(if intersections % 2 == 1 {
        PointContainment::Inside
    } else {
        PointContainment::Outside
    })
}

struct RayHit {
    t: f64,
    u: f64,
    v: f64,
}

fn ray_triangle_intersection(origin: Point3, dir: Vec3, tri: &[Point3; 3], tol: Tolerance) -> Option<RayHit> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = dir.cross(edge2);
    let det = edge1.dot(h);
    let det_eps = tol.eps * edge1.length() * h.length();
    if !det.is_finite() || det.abs() <= det_eps {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - tri[0];
    let u = inv_det * s.dot(h);
    if u < -tol.eps || u > 1.0 + tol.eps {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * dir.dot(q);
    if v < -tol.eps || u + v > 1.0 + tol.eps {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    if !t.is_finite() || t < -tol.eps {
        return None;
    }
    Some(RayHit { t, u, v })
}

fn point_on_triangle(point: Point3, tri: &[Point3; 3], tol: Tolerance) -> bool {
    let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
    let n_len = n.length();
    if !n_len.is_finite() || n_len <= tol.eps {
        return false;
    }
    let signed = n.dot(point - tri[0]);
    if !signed.is_finite() || signed.abs() > tol.eps * n_len {
        return false;
    }

    // Barycentric test in-plane.
    let v0 = tri[1] - tri[0];
    let v1 = tri[2] - tri[0];
    let v2 = point - tri[0];

    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot11 = v1.dot(v1);
    let dot02 = v0.dot(v2);
    let dot12 = v1.dot(v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if !denom.is_finite() || denom.abs() <= tol.eps * tol.eps {
        return false;
    }

    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    u >= -tol.eps && v >= -tol.eps && u + v <= 1.0 + tol.eps
}

/// Bounding box of both operands, used to reject disjoint inputs early.
#[must_use]
pub fn operands_overlap(a: &GeomMesh, b: &GeomMesh) -> bool {
    match (a.bbox(), b.bbox()) {
        (Some(x), Some(y)) => BBox::intersects(x, y),
        _ => false,
    }
}
