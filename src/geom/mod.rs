mod boolean;
mod cache;
mod core;
mod kernel;
mod loft;
mod mesh;
mod metrics;
mod shape;

pub use boolean::{
    BooleanError, BooleanOp, BooleanResult, PointContainment, boolean_meshes,
    classify_point_in_mesh,
};
pub use cache::{CacheStats, KeyedMemo, Memo};
pub use core::{BBox, Point3, Tolerance, Transform, Vec3};
pub use kernel::{GeometryKernel, KernelError, KernelResult, KernelSettings, MeshKernel};
pub use loft::{LoftError, LoftOptions, LoftResult, blend_wires, loft_wires};
pub use mesh::{GeomMesh, triangle_centroid, triangle_normal};
pub use metrics::{InstrumentedKernel, KernelOp, KernelTimingReport};
pub use shape::{Shape, SharedShape, Wire};

#[cfg(test)]
mod tests;
