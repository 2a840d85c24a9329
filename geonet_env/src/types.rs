//! Common types for the GeoNet environment abstraction.

use crate::error::GeoNetError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Sub};
use uuid::Uuid;

/// Stable name of a sensor within a graph.
///
/// Random ids come from [`SensorId::new`]; simulations that must replay
/// exactly use [`SensorId::from_seed`], whose ids sort in seed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorId(pub Uuid);

/// Spreads consecutive seeds over the low half of a seeded id.
const SEED_SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

impl SensorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Seed in the high half (big-endian, so ordering follows the seed),
    /// a scrambled copy in the low half.
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&seed.to_be_bytes());
        bytes[8..].copy_from_slice(&(seed ^ SEED_SPREAD).wrapping_mul(SEED_SPREAD).to_be_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tail bytes only; seeded ids share their leading ones
        let b = self.0.as_bytes();
        write!(f, "{:02x}{:02x}{:02x}{:02x}", b[12], b[13], b[14], b[15])
    }
}

/// An immutable point on the 2D field.
///
/// Equality and hashing are by value. Validated entry points
/// ([`Coordinate::try_new`], sensor setters) reject non-finite components,
/// so the `Eq`/`Hash` contract holds for every coordinate the system stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Creates a coordinate without validation.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a coordinate, rejecting NaN and infinite components.
    pub fn try_new(x: f64, y: f64) -> Result<Self, GeoNetError> {
        let coord = Self { x, y };
        coord.validate()?;
        Ok(coord)
    }

    /// Fails with `InvalidValue` if either component is not finite.
    pub fn validate(&self) -> Result<(), GeoNetError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(())
        } else {
            Err(GeoNetError::invalid(format!(
                "coordinate components must be finite, got ({}, {})",
                self.x, self.y
            )))
        }
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        nalgebra::distance(&self.to_point(), &other.to_point())
    }

    /// Midpoint of the segment between this coordinate and another.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        nalgebra::center(&self.to_point(), &other.to_point()).into()
    }

    /// Converts to an nalgebra point.
    pub fn to_point(self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Returns the coordinate as an `(x, y)` tuple.
    pub fn to_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Canonical bit pattern used for equality and hashing (+0.0 == -0.0).
    fn key(&self) -> (u64, u64) {
        let norm = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        (norm(self.x), norm(self.y))
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<Point2<f64>> for Coordinate {
    fn from(p: Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Coordinate {
    type Output = Coordinate;

    fn mul(self, scalar: f64) -> Coordinate {
        Coordinate::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<f64> for Coordinate {
    type Output = Coordinate;

    fn div(self, scalar: f64) -> Coordinate {
        Coordinate::new(self.x / scalar, self.y / scalar)
    }
}

/// Rectangular extent of a field, in cells, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Creates bounds of `width x height` cells.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Creates square bounds.
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Returns true if the coordinate lies in `[0, width) x [0, height)`.
    pub fn contains(&self, at: Coordinate) -> bool {
        at.x.is_finite()
            && at.y.is_finite()
            && at.x >= 0.0
            && at.y >= 0.0
            && at.x < self.width as f64
            && at.y < self.height as f64
    }

    /// Fails with `Placement` if the coordinate is outside the bounds.
    pub fn check(&self, at: Coordinate) -> Result<(), GeoNetError> {
        if self.contains(at) {
            Ok(())
        } else {
            Err(GeoNetError::Placement {
                x: at.x,
                y: at.y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Maps a coordinate to its `(column, row)` cell.
    pub fn cell(&self, at: Coordinate) -> Result<(u32, u32), GeoNetError> {
        self.check(at)?;
        Ok((at.x.floor() as u32, at.y.floor() as u32))
    }

    /// Number of cells.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[test]
    fn test_sensor_id_from_seed_is_stable() {
        assert_eq!(SensorId::from_seed(3), SensorId::from_seed(3));
        assert_ne!(SensorId::from_seed(3), SensorId::from_seed(4));
        assert_ne!(SensorId::new(), SensorId::new());
    }

    #[test]
    fn test_seeded_ids_sort_by_seed() {
        let ids: Vec<SensorId> = [0u64, 1, 255, 256, 70_000, u64::MAX].iter().map(|s| SensorId::from_seed(*s)).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_ne!(SensorId::from_seed(1).to_string(), SensorId::from_seed(2).to_string());
        assert_eq!(SensorId::from_seed(1).to_string().len(), 8);
    }

    #[test]
    fn test_distance_and_midpoint() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(3.0, 4.0);

        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(b.distance(&a), 5.0);
        assert_eq!(a.midpoint(&b), Coordinate::new(1.5, 2.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = Coordinate::new(1.0, 2.0);
        let b = Coordinate::new(3.0, 5.0);

        assert_eq!(a + b, Coordinate::new(4.0, 7.0));
        assert_eq!(b - a, Coordinate::new(2.0, 3.0));
        assert_eq!(a * 2.0, Coordinate::new(2.0, 4.0));
        assert_eq!(b / 2.0, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_value_equality_and_hash() {
        let mut set = HashSet::new();
        set.insert(Coordinate::new(0.0, 1.0));
        set.insert(Coordinate::new(-0.0, 1.0));
        set.insert(Coordinate::from((0, 1)));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_try_new_rejects_non_finite() {
        assert!(Coordinate::try_new(1.0, 2.0).is_ok());
        assert!(matches!(
            Coordinate::try_new(f64::NAN, 0.0),
            Err(GeoNetError::InvalidValue(_))
        ));
        assert!(Coordinate::try_new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_bounds_check() {
        let bounds = Bounds::square(55);

        assert!(bounds.contains(Coordinate::new(0.0, 0.0)));
        assert!(bounds.contains(Coordinate::new(54.9, 54.0)));
        assert!(!bounds.contains(Coordinate::new(55.0, 0.0)));
        assert!(!bounds.contains(Coordinate::new(-0.5, 3.0)));

        assert!(matches!(
            bounds.check(Coordinate::new(3.0, 60.0)),
            Err(GeoNetError::Placement { width: 55, height: 55, .. })
        ));
        assert_eq!(bounds.cell(Coordinate::new(3.7, 2.2)).unwrap(), (3, 2));
        assert_eq!(bounds.area(), 55 * 55);
    }
}
