//! Planar geometry for the clock board.
//!
//! Coordinates are stored the way KiCad stores them internally: integer
//! nanometres, y growing downwards. Math is done in `f64` millimetres and
//! converted back with [`Point::from_mm`].

pub mod ring;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use ring::{
    angle_from_ring_position, arc_segments, degrees_from_ring_position, point_on_circle,
    ray_polygon_intersection, ring_intersection_at_position, ArcSegments, RING_SLOTS,
};

/// Nanometres per millimetre.
pub const NM_PER_MM: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("degenerate geometry in {operation}: {detail}")]
    Degenerate {
        operation: &'static str,
        detail: String,
    },
}

impl GeometryError {
    pub(crate) fn degenerate(operation: &'static str, detail: impl Into<String>) -> Self {
        GeometryError::Degenerate {
            operation,
            detail: detail.into(),
        }
    }
}

/// Immutable 2D coordinate in nanometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Round a millimetre coordinate pair to the nanometre grid.
    pub fn from_mm(x: f64, y: f64) -> Self {
        Self {
            x: mm_to_nm(x),
            y: mm_to_nm(y),
        }
    }

    pub fn x_mm(&self) -> f64 {
        self.x as f64 / NM_PER_MM
    }

    pub fn y_mm(&self) -> f64 {
        self.y as f64 / NM_PER_MM
    }

    /// Same point moved by a millimetre offset.
    pub fn offset_mm(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + mm_to_nm(dx),
            y: self.y + mm_to_nm(dy),
        }
    }

    /// Distance from the board origin in millimetres.
    pub fn norm_mm(&self) -> f64 {
        self.x_mm().hypot(self.y_mm())
    }

    /// Euclidean distance in millimetres.
    pub fn distance_mm(&self, other: &Point) -> f64 {
        (self.x_mm() - other.x_mm()).hypot(self.y_mm() - other.y_mm())
    }

    /// Slope `y / x` of the ray from the origin through this point.
    pub fn slope_from_origin(&self) -> Result<f64, GeometryError> {
        if self.x == 0 {
            return Err(GeometryError::degenerate(
                "slope_from_origin",
                format!("point {} lies on the vertical axis", self),
            ));
        }
        Ok(self.y as f64 / self.x as f64)
    }

    /// Rotate a local offset by a KiCad orientation (tenths of a degree).
    pub fn rotated(&self, tenths: f64) -> Self {
        if tenths == 0.0 {
            return *self;
        }
        let angle = (tenths / 10.0).to_radians();
        let (sin, cos) = angle.sin_cos();
        let x = self.x as f64;
        let y = self.y as f64;
        Self {
            x: (y * sin + x * cos).round() as i64,
            y: (y * cos - x * sin).round() as i64,
        }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x_mm(), self.y_mm())
    }
}

pub fn mm_to_nm(value: f64) -> i64 {
    (value * NM_PER_MM).round() as i64
}

/// Which of the two intersections of a line through the origin to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Side of the vertical axis a coordinate lies on.
    pub fn of(x: i64) -> Result<Side, GeometryError> {
        match x.signum() {
            1 => Ok(Side::Right),
            -1 => Ok(Side::Left),
            _ => Err(GeometryError::degenerate(
                "Side::of",
                "coordinate on the vertical axis has no side",
            )),
        }
    }
}
