use std::ops::{Add, Div, Mul, Sub};

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Coordinate axis of a 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// x coordinate
    X,
    /// y coordinate
    Y,
    /// z coordinate
    Z,
}

impl Axis {
    /// All axes in storage order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// A marker position in 3D space, double precision.
///
/// Serialized as a plain `[x, y, z]` array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point3 {
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
    /// z coordinate
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a new point from its coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Get a single coordinate.
    #[inline]
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Return a copy of the point with one coordinate replaced.
    #[inline]
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point3) -> f64 {
        euclidean_distance(self, other)
    }

    /// Linear interpolation towards `other`, `t = 0` gives `self` and `t = 1` gives `other`.
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        DVec3::from(*self).lerp(DVec3::from(*other), t).into()
    }

    /// Arithmetic mean of a set of points, summed in the given order.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(points: &[Point3]) -> Option<Point3> {
        if points.is_empty() {
            return None;
        }
        let sum = points.iter().fold(Point3::ZERO, |acc, p| acc + *p);
        Some(sum / points.len() as f64)
    }

    /// Check that all the coordinates are finite.
    pub fn is_finite(&self) -> bool {
        DVec3::from(*self).is_finite()
    }
}

/// Utility function to compute the Euclidean distance between two points.
///
/// d(a, b) = sqrt((x_b - x_a)^2 + (y_b - y_a)^2 + (z_b - z_a)^2)
///
/// Example:
/// ```
/// use remocap_core::{euclidean_distance, Point3};
///
/// let a = Point3::new(0.0, 0.0, 0.0);
/// let b = Point3::new(3.0, 4.0, 0.0);
/// assert_eq!(euclidean_distance(&a, &b), 5.0);
/// ```
pub fn euclidean_distance(a: &Point3, b: &Point3) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

impl From<[f64; 3]> for Point3 {
    fn from(array: [f64; 3]) -> Self {
        Self::new(array[0], array[1], array[2])
    }
}

impl From<Point3> for [f64; 3] {
    fn from(point: Point3) -> Self {
        [point.x, point.y, point.z]
    }
}

impl From<DVec3> for Point3 {
    fn from(vec: DVec3) -> Self {
        Self::new(vec.x, vec.y, vec.z)
    }
}

impl From<Point3> for DVec3 {
    fn from(point: Point3) -> Self {
        DVec3::new(point.x, point.y, point.z)
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        (DVec3::from(self) + DVec3::from(rhs)).into()
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        (DVec3::from(self) - DVec3::from(rhs)).into()
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        (DVec3::from(self) * rhs).into()
    }
}

impl Div<f64> for Point3 {
    type Output = Point3;

    fn div(self, rhs: f64) -> Point3 {
        (DVec3::from(self) / rhs).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 6.0, 3.0);
        assert_relative_eq!(euclidean_distance(&a, &b), 5.0);
        assert_eq!(euclidean_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_euclidean_distance_symmetric() {
        for _ in 0..100 {
            let a = Point3::new(
                rand::random::<f64>() * 1000.0 - 500.0,
                rand::random::<f64>() * 1000.0 - 500.0,
                rand::random::<f64>() * 1000.0 - 500.0,
            );
            let b = Point3::new(
                rand::random::<f64>() * 1000.0 - 500.0,
                rand::random::<f64>() * 1000.0 - 500.0,
                rand::random::<f64>() * 1000.0 - 500.0,
            );
            assert_eq!(a.distance(&b), b.distance(&a));
        }
    }

    #[test]
    fn test_mean() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 8.0),
        ];
        assert_eq!(Point3::mean(&points), Some(Point3::new(1.0, 2.0, 2.0)));
        assert_eq!(Point3::mean(&[]), None);
    }

    #[test]
    fn test_lerp_and_axes() {
        let a = Point3::new(0.0, 10.0, -4.0);
        let b = Point3::new(10.0, 20.0, 4.0);
        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.x, 5.0);
        assert_relative_eq!(mid.y, 15.0);
        assert_relative_eq!(mid.z, 0.0);

        let moved = a.with(Axis::Y, 1.5);
        assert_eq!(moved.get(Axis::X), 0.0);
        assert_eq!(moved.get(Axis::Y), 1.5);
        assert_eq!(moved.get(Axis::Z), -4.0);
    }

    #[test]
    fn test_serde_array() -> Result<(), Box<dyn std::error::Error>> {
        let point: Point3 = serde_json::from_str("[1.0, 2.5, -3.0]")?;
        assert_eq!(point, Point3::new(1.0, 2.5, -3.0));
        assert_eq!(serde_json::to_string(&point)?, "[1.0,2.5,-3.0]");
        Ok(())
    }
}
