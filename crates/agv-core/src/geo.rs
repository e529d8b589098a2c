//! Planar geometry: map positions in metres and distances along paths.

use serde::{Deserialize, Serialize};

/// A 2-D position on the factory floor, in metres.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other` in metres.
    #[inline]
    pub fn dist(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle of the vector from `self` to `other`, in radians.
    #[inline]
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Total length of the polyline through `points`, in metres.
///
/// Returns 0.0 for fewer than two points.
pub fn polyline_len(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| w[0].dist(w[1]))
        .sum()
}
