//! Quadric error metric.
//!
//! A quadric measures the sum of squared distances from a point to a set of
//! planes. Each vertex accumulates the planes of its incident faces; the
//! quadric of a collapsed edge is the sum of its endpoints' quadrics.

use std::ops::{Add, AddAssign};

use mesh_types::{Point3, Vector3};

/// Symmetric 4x4 quadric matrix stored as its upper triangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    // [a b c d]
    // [  e f g]
    // [    h i]
    // [      j]
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
    i: f64,
    j: f64,
}

impl Quadric {
    /// Quadric of the plane `n · p + d = 0`.
    ///
    /// `normal` should be unit length so the metric is a squared distance.
    #[must_use]
    pub fn from_plane(normal: &Vector3<f64>, d: f64) -> Self {
        let (a, b, c) = (normal.x, normal.y, normal.z);
        Self {
            a: a * a,
            b: a * b,
            c: a * c,
            d: a * d,
            e: b * b,
            f: b * c,
            g: b * d,
            h: c * c,
            i: c * d,
            j: d * d,
        }
    }

    /// Quadric of the plane through `point` with unit `normal`.
    #[must_use]
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        Self::from_plane(normal, -normal.dot(&point.coords))
    }

    /// Sum of squared distances from `p` to the accumulated planes.
    #[must_use]
    pub fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        // v^T * Q * v where v = [x, y, z, 1]
        x.mul_add(
            x.mul_add(self.a, 2.0 * y.mul_add(self.b, z.mul_add(self.c, self.d))),
            y.mul_add(
                y.mul_add(self.e, 2.0 * z.mul_add(self.f, self.g)),
                z.mul_add(z.mul_add(self.h, 2.0 * self.i), self.j),
            ),
        )
    }

    /// Point minimizing the error.
    ///
    /// Returns `None` when the 3x3 system is singular, i.e. its determinant
    /// is below `singular_epsilon` in magnitude, or the solution is not
    /// finite.
    #[must_use]
    pub fn optimal_point(&self, singular_epsilon: f64) -> Option<Point3<f64>> {
        // [a b c] [x]   [-d]
        // [b e f] [y] = [-g]
        // [c f h] [z]   [-i]
        let det = self.a.mul_add(
            self.f.mul_add(-self.f, self.e * self.h),
            self.b.mul_add(
                self.c.mul_add(self.f, -self.b * self.h),
                self.c * self.e.mul_add(-self.c, self.b * self.f),
            ),
        );

        if det.is_nan() || det.abs() < singular_epsilon {
            return None;
        }

        let inv_det = 1.0 / det;

        let m00 = self.f.mul_add(-self.f, self.e * self.h) * inv_det;
        let m01 = self.c.mul_add(self.f, -self.b * self.h) * inv_det;
        let m02 = self.c.mul_add(-self.e, self.b * self.f) * inv_det;
        let m11 = self.c.mul_add(-self.c, self.a * self.h) * inv_det;
        let m12 = self.b.mul_add(self.c, -self.a * self.f) * inv_det;
        let m22 = self.b.mul_add(-self.b, self.a * self.e) * inv_det;

        let p = Point3::new(
            m00.mul_add(-self.d, m01.mul_add(-self.g, m02 * -self.i)),
            m01.mul_add(-self.d, m11.mul_add(-self.g, m12 * -self.i)),
            m02.mul_add(-self.d, m12.mul_add(-self.g, m22 * -self.i)),
        );
        p.iter().all(|c| c.is_finite()).then_some(p)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Self) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
        self.d += other.d;
        self.e += other.e;
        self.f += other.f;
        self.g += other.g;
        self.h += other.h;
        self.i += other.i;
        self.j += other.j;
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
