//! Resolved triangle used for per-face geometry.

use nalgebra::{Point3, Vector3};

/// A triangle with concrete vertex positions, in face winding order.
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(3.0, 0.0, 0.0),
///     Point3::new(0.0, 4.0, 0.0),
/// );
/// assert!((tri.area() - 6.0).abs() < 1e-12);
/// assert!(tri.normal().is_some_and(|n| (n.z - 1.0).abs() < 1e-12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First corner.
    pub v0: Point3<f64>,
    /// Second corner.
    pub v1: Point3<f64>,
    /// Third corner.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a triangle from three corners.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`.
    ///
    /// Points along the right-hand-rule normal and has length equal to
    /// twice the area, which makes it the natural area weight.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` when the triangle has no area.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON * f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Area (half the cross-product magnitude).
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Signed volume of the tetrahedron formed with the origin.
    ///
    /// Summed over a closed, outward-wound surface this gives the enclosed
    /// volume by the divergence theorem.
    #[inline]
    #[must_use]
    pub fn signed_volume_from_origin(&self) -> f64 {
        let (a, b, c) = (&self.v0, &self.v1, &self.v2);
        let cross = Vector3::new(
            b.y.mul_add(c.z, -(b.z * c.y)),
            b.z.mul_add(c.x, -(b.x * c.z)),
            b.x.mul_add(c.y, -(b.y * c.x)),
        );
        a.z.mul_add(cross.z, a.x.mul_add(cross.x, a.y * cross.y)) / 6.0
    }
}
