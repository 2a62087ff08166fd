//! Axis-aligned bounding box.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box, stored as per-axis min/max corners.
///
/// # Example
///
/// ```
/// use mesh_types::{Aabb, Point3};
///
/// let points = [Point3::new(1.0, -2.0, 0.0), Point3::new(-1.0, 4.0, 2.0)];
/// let aabb = Aabb::from_points(points.iter());
///
/// assert_eq!(aabb.min, Point3::new(-1.0, -2.0, 0.0));
/// assert_eq!(aabb.max, Point3::new(1.0, 4.0, 2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Componentwise minimum corner.
    pub min: Point3<f64>,
    /// Componentwise maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two corners, sorting each axis so `min <= max`.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// An inverted box that contains nothing.
    ///
    /// Expanding it by any point yields a zero-size box at that point.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box enclosing every point. Empty for an empty iterator.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        points.fold(Self::empty(), |mut aabb, p| {
            aabb.expand_to_include(p);
            aabb
        })
    }

    /// True when `min > max` on any axis.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extent along each axis.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Midpoint of the box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the min-to-max diagonal. Zero for an empty box.
    ///
    /// Used as the scale reference for relative tolerances.
    #[inline]
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.size().norm()
        }
    }

    /// Grow the box in place to contain `point`.
    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// True if `point` lies inside or on the boundary.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_has_zero_diagonal() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert_eq!(aabb.diagonal(), 0.0);
    }

    #[test]
    fn new_sorts_corners() {
        let aabb = Aabb::new(Point3::new(2.0, 0.0, 5.0), Point3::new(0.0, 3.0, 1.0));
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.max, Point3::new(2.0, 3.0, 5.0));
    }

    #[test]
    fn diagonal_of_unit_box() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!((aabb.diagonal() - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn union_ignores_empty_side() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(a.union(&Aabb::empty()), a);
        assert_eq!(Aabb::empty().union(&a), a);

        let b = Aabb::new(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 2.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn contains_boundary_points() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(aabb.contains(&Point3::new(1.0, 0.0, 0.5)));
        assert!(!aabb.contains(&Point3::new(1.0, 0.0, 1.5)));
    }
}
