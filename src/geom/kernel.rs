//! The geometry kernel boundary and its triangle-mesh implementation.

use std::fmt;

use serde::Deserialize;

use super::boolean::{BooleanError, BooleanOp, boolean_meshes, operands_overlap};
use super::loft::{LoftError, LoftOptions, loft_wires};
use super::{BBox, Shape, Tolerance, Transform, Wire};

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("loft failed: {0}")]
    Loft(#[from] LoftError),
    #[error("boolean operation failed: {0}")]
    Boolean(#[from] BooleanError),
    #[error("{op} requires a non-empty shape")]
    EmptyShape { op: &'static str },
    #[error("expected a {expected}, found a {found}")]
    UnexpectedShapeType {
        expected: &'static str,
        found: &'static str,
    },
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Primitive shape operations the engine is built on. Implementations never
/// see components or documents, only wires and shapes.
pub trait GeometryKernel: fmt::Debug + Send + Sync {
    fn transform(&self, shape: &Shape, transform: &Transform) -> KernelResult<Shape>;

    /// Lofts through `sections` in order.
    fn loft(&self, sections: &[Wire], options: &LoftOptions) -> KernelResult<Shape>;

    /// `shape` minus `tool`.
    fn cut(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape>;

    /// Intersection of `shape` and `tool`.
    fn common(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape>;

    fn fuse(&self, a: &Shape, b: &Shape) -> KernelResult<Shape>;

    fn bounding_box(&self, shape: &Shape) -> KernelResult<BBox>;

    fn volume(&self, shape: &Shape) -> KernelResult<f64>;

    fn area(&self, shape: &Shape) -> KernelResult<f64>;
}

/// Tuning knobs of [`MeshKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KernelSettings {
    /// Distance below which points are considered coincident.
    pub tolerance: f64,
    /// Interpolated rows per span of a smooth loft that does not set its own.
    pub smooth_span_subdivisions: usize,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            smooth_span_subdivisions: 4,
        }
    }
}

/// Triangle-mesh reference kernel.
#[derive(Debug, Clone, Default)]
pub struct MeshKernel {
    settings: KernelSettings,
}

impl MeshKernel {
    #[must_use]
    pub fn new(settings: KernelSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.settings.tolerance)
    }

    fn boolean(&self, a: &Shape, b: &Shape, op: BooleanOp) -> KernelResult<Shape> {
        let a_mesh = a.merged_mesh();
        let b_mesh = b.merged_mesh();
        if a_mesh.is_empty() {
            return Err(KernelError::EmptyShape { op: "boolean" });
        }
        if b_mesh.is_empty() {
            return Err(KernelError::EmptyShape { op: "boolean" });
        }

        if !operands_overlap(&a_mesh, &b_mesh) {
            return Ok(match op {
                BooleanOp::Cut => a.clone(),
                BooleanOp::Common => Shape::empty(),
                BooleanOp::Fuse => Shape::Compound(vec![a.clone(), b.clone()]),
            });
        }

        let mesh = boolean_meshes(&a_mesh, &b_mesh, op, self.tolerance())?;
        Ok(if mesh.is_empty() {
            Shape::empty()
        } else {
            Shape::Solid(mesh)
        })
    }
}

impl GeometryKernel for MeshKernel {
    fn transform(&self, shape: &Shape, transform: &Transform) -> KernelResult<Shape> {
        Ok(shape.transformed(transform))
    }

    fn loft(&self, sections: &[Wire], options: &LoftOptions) -> KernelResult<Shape> {
        let mut options = *options;
        if !options.ruled && options.span_subdivisions == 0 {
            options.span_subdivisions = self.settings.smooth_span_subdivisions;
        }
        Ok(loft_wires(sections, &options)?)
    }

    fn cut(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        self.boolean(shape, tool, BooleanOp::Cut)
    }

    fn common(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        self.boolean(shape, tool, BooleanOp::Common)
    }

    fn fuse(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        self.boolean(a, b, BooleanOp::Fuse)
    }

    fn bounding_box(&self, shape: &Shape) -> KernelResult<BBox> {
        shape.bbox().ok_or(KernelError::EmptyShape { op: "bounding box" })
    }

    fn volume(&self, shape: &Shape) -> KernelResult<f64> {
        Ok(match shape {
            Shape::Solid(mesh) => mesh.signed_volume(),
            Shape::Wire(_) | Shape::Shell(_) => 0.0,
            Shape::Compound(children) => {
                let mut total = 0.0;
                for child in children {
                    total += self.volume(child)?;
                }
                total
            }
        })
    }

    fn area(&self, shape: &Shape) -> KernelResult<f64> {
        Ok(shape.merged_mesh().area())
    }
}
