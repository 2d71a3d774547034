//! Call counting and opt-in timing for geometry kernels.
//!
//! [`InstrumentedKernel`] wraps any [`GeometryKernel`] and counts the calls
//! made through it. Timing is only collected when the `kernel_metrics`
//! feature is enabled; otherwise [`InstrumentedKernel::timing_report`]
//! returns `None` and no clock is read.

use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "kernel_metrics")]
use std::sync::atomic::AtomicU64;

use super::kernel::{GeometryKernel, KernelResult};
use super::loft::LoftOptions;
use super::{BBox, Shape, Transform, Wire};

/// Kernel primitive being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelOp {
    Transform,
    Loft,
    Cut,
    Common,
    Fuse,
    BoundingBox,
    Volume,
    Area,
}

impl KernelOp {
    pub const ALL: [Self; 8] = [
        Self::Transform,
        Self::Loft,
        Self::Cut,
        Self::Common,
        Self::Fuse,
        Self::BoundingBox,
        Self::Volume,
        Self::Area,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Transform => 0,
            Self::Loft => 1,
            Self::Cut => 2,
            Self::Common => 3,
            Self::Fuse => 4,
            Self::BoundingBox => 5,
            Self::Volume => 6,
            Self::Area => 7,
        }
    }
}

/// Cumulative time per primitive in nanoseconds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KernelTimingReport {
    pub transform_ns: u64,
    pub loft_ns: u64,
    pub cut_ns: u64,
    pub common_ns: u64,
    pub fuse_ns: u64,
    pub bounding_box_ns: u64,
    pub volume_ns: u64,
    pub area_ns: u64,
}

/// Counting decorator around a kernel.
#[derive(Debug)]
pub struct InstrumentedKernel<K> {
    inner: K,
    calls: [AtomicUsize; 8],
    last_loft_sections: AtomicUsize,
    #[cfg(feature = "kernel_metrics")]
    nanos: [AtomicU64; 8],
}

impl<K: GeometryKernel> InstrumentedKernel<K> {
    #[must_use]
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            calls: Default::default(),
            last_loft_sections: AtomicUsize::new(0),
            #[cfg(feature = "kernel_metrics")]
            nanos: Default::default(),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &K {
        &self.inner
    }

    /// Number of calls of `op` since construction or the last [`Self::reset`].
    #[must_use]
    pub fn count(&self, op: KernelOp) -> usize {
        self.calls[op.index()].load(Ordering::Relaxed)
    }

    /// Section count passed to the most recent loft call.
    #[must_use]
    pub fn last_loft_sections(&self) -> usize {
        self.last_loft_sections.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        for counter in &self.calls {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_loft_sections.store(0, Ordering::Relaxed);
        #[cfg(feature = "kernel_metrics")]
        for counter in &self.nanos {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// `None` unless built with the `kernel_metrics` feature.
    #[must_use]
    pub fn timing_report(&self) -> Option<KernelTimingReport> {
        #[cfg(feature = "kernel_metrics")]
        {
            let ns = |op: KernelOp| self.nanos[op.index()].load(Ordering::Relaxed);
            Some(KernelTimingReport {
                transform_ns: ns(KernelOp::Transform),
                loft_ns: ns(KernelOp::Loft),
                cut_ns: ns(KernelOp::Cut),
                common_ns: ns(KernelOp::Common),
                fuse_ns: ns(KernelOp::Fuse),
                bounding_box_ns: ns(KernelOp::BoundingBox),
                volume_ns: ns(KernelOp::Volume),
                area_ns: ns(KernelOp::Area),
            })
        }

        #[cfg(not(feature = "kernel_metrics"))]
        {
            None
        }
    }

    fn record<T>(&self, op: KernelOp, f: impl FnOnce() -> T) -> T {
        self.calls[op.index()].fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "kernel_metrics")]
        {
            let start = std::time::Instant::now();
            let out = f();
            let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
            self.nanos[op.index()].fetch_add(elapsed, Ordering::Relaxed);
            out
        }

        #[cfg(not(feature = "kernel_metrics"))]
        {
            f()
        }
    }
}

impl<K: GeometryKernel> GeometryKernel for InstrumentedKernel<K> {
    fn transform(&self, shape: &Shape, transform: &Transform) -> KernelResult<Shape> {
        self.record(KernelOp::Transform, || self.inner.transform(shape, transform))
    }

    fn loft(&self, sections: &[Wire], options: &LoftOptions) -> KernelResult<Shape> {
        self.last_loft_sections.store(sections.len(), Ordering::Relaxed);
        self.record(KernelOp::Loft, || self.inner.loft(sections, options))
    }

    fn cut(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        self.record(KernelOp::Cut, || self.inner.cut(shape, tool))
    }

    fn common(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        self.record(KernelOp::Common, || self.inner.common(shape, tool))
    }

    fn fuse(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        self.record(KernelOp::Fuse, || self.inner.fuse(a, b))
    }

    fn bounding_box(&self, shape: &Shape) -> KernelResult<BBox> {
        self.record(KernelOp::BoundingBox, || self.inner.bounding_box(shape))
    }

    fn volume(&self, shape: &Shape) -> KernelResult<f64> {
        self.record(KernelOp::Volume, || self.inner.volume(shape))
    }

    fn area(&self, shape: &Shape) -> KernelResult<f64> {
        self.record(KernelOp::Area, || self.inner.area(shape))
    }
}
