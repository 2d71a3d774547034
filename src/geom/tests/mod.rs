mod test_boolean_basic;
mod test_kernel_basic;
mod test_loft_basic;

use crate::geom::{Point3, Wire};

/// Axis-aligned square in the plane `y = y`, spanning `[x0, x0 + size]` and `[z0, z0 + size]`.
pub(crate) fn square_section(x0: f64, y: f64, z0: f64, size: f64) -> Wire {
    Wire::closed(vec![
        Point3::new(x0, y, z0),
        Point3::new(x0 + size, y, z0),
        Point3::new(x0 + size, y, z0 + size),
        Point3::new(x0, y, z0 + size),
    ])
}
