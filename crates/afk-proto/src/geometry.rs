//! World positions and the little horizontal geometry the agent needs.

use serde::{Deserialize, Serialize};

/// A point in the game world. `y` is elevation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance ignoring elevation.
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.z - other.z)
    }

    /// Full 3D distance.
    pub fn distance(&self, other: &Position) -> f64 {
        let dy = self.y - other.y;
        (self.horizontal_distance(other).powi(2) + dy * dy).sqrt()
    }

    /// The point `distance` units away along the horizontal heading `angle`
    /// (radians), at the same elevation.
    pub fn offset(&self, angle: f64, distance: f64) -> Position {
        Position {
            x: self.x + distance * angle.cos(),
            y: self.y,
            z: self.z + distance * angle.sin(),
        }
    }

    /// The point `distance` units directly away from `threat`, measured
    /// horizontally and keeping the current elevation.
    ///
    /// When both points share the same column there is no meaningful
    /// heading, so the agent moves along +x.
    pub fn away_from(&self, threat: &Position, distance: f64) -> Position {
        let dx = self.x - threat.x;
        let dz = self.z - threat.z;
        let len = dx.hypot(dz);
        if len < f64::EPSILON {
            return self.offset(0.0, distance);
        }
        Position {
            x: self.x + dx / len * distance,
            y: self.y,
            z: self.z + dz / len * distance,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_distance_ignores_elevation() {
        let a = Position::new(0.0, 10.0, 0.0);
        let b = Position::new(3.0, 90.0, 4.0);
        assert!((a.horizontal_distance(&b) - 5.0).abs() < 1e-9);
        assert!(a.distance(&b) > 80.0);
    }

    #[test]
    fn test_offset_keeps_elevation_and_distance() {
        let origin = Position::new(100.0, 64.0, -20.0);
        let target = origin.offset(1.234, 1000.0);
        assert!((target.y - 64.0).abs() < f64::EPSILON);
        assert!((origin.horizontal_distance(&target) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_away_from_moves_directly_away() {
        let me = Position::new(0.0, 70.0, 0.0);
        let zombie = Position::new(-5.0, 68.0, 0.0);
        let flee = me.away_from(&zombie, 20.0);
        assert!((flee.x - 20.0).abs() < 1e-9);
        assert!(flee.z.abs() < 1e-9);
        assert!((flee.y - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_away_from_same_column() {
        let me = Position::new(1.0, 70.0, 1.0);
        let above = Position::new(1.0, 75.0, 1.0);
        let flee = me.away_from(&above, 20.0);
        assert!((me.horizontal_distance(&flee) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_two_decimals() {
        let p = Position::new(1.0, 2.5, -3.125);
        assert_eq!(p.to_string(), "(1.00, 2.50, -3.13)");
    }
}
