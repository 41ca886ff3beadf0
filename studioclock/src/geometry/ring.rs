//! Ring positions on a regular 60-gon.
//!
//! A ring position is a real number in a 60-unit modulus, one unit per
//! minute on a clock face. Position 0 is at the top and positions advance
//! clockwise. Rings are drawn as 60-sided polygons, so "on the ring" means
//! on a polygon edge, not on the ideal circle.

use std::f64::consts::PI;

use super::{GeometryError, Point, Side};

/// Number of polygon vertices (and ring positions) per revolution.
pub const RING_SLOTS: f64 = 60.0;

/// Half of the angle subtended by one polygon edge.
const HALF_EDGE: f64 = PI / RING_SLOTS;

/// Rotation angle in radians for a ring position.
pub fn angle_from_ring_position(position: f64) -> f64 {
    -PI / 30.0 * position.rem_euclid(RING_SLOTS) - PI
}

/// Same angle in degrees.
pub fn degrees_from_ring_position(position: f64) -> f64 {
    angle_from_ring_position(position).to_degrees()
}

/// Exact point on the circle of `radius` (mm) at a ring position.
///
/// For integral positions this is a polygon vertex.
pub fn point_on_circle(radius: f64, position: f64) -> Result<Point, GeometryError> {
    check_radius("point_on_circle", radius)?;
    Ok(vertex(radius, position))
}

/// Intersection of a line through the origin with the polygon of `radius`.
///
/// `slope` is passed through `tan` once more before it is used as an
/// angle. Every coordinate on the board depends on this, keep it.
pub fn ray_polygon_intersection(
    radius: f64,
    slope: f64,
    side: Side,
) -> Result<Point, GeometryError> {
    check_radius("ray_polygon_intersection", radius)?;
    let theta = slope.tan();
    if !theta.is_finite() {
        return Err(GeometryError::degenerate(
            "ray_polygon_intersection",
            format!("slope {} has no finite angle", slope),
        ));
    }
    Ok(polygon_point(radius, theta, side))
}

/// Ray intersection at a (possibly fractional) ring position, right side.
pub fn ring_intersection_at_position(radius: f64, position: f64) -> Result<Point, GeometryError> {
    check_radius("ring_intersection_at_position", radius)?;
    Ok(intersection(radius, position))
}

/// Polygon edges between two ring positions.
///
/// Walks forward when `stop > start`, backward otherwise. A fractional
/// endpoint contributes a partial chord from the exact ray intersection to
/// the nearest vertex in the walking direction.
pub fn arc_segments(radius: f64, start: f64, stop: f64) -> Result<ArcSegments, GeometryError> {
    check_radius("arc_segments", radius)?;
    if !start.is_finite() || !stop.is_finite() {
        return Err(GeometryError::degenerate(
            "arc_segments",
            format!("non-finite span {} -> {}", start, stop),
        ));
    }

    let mut arc = ArcSegments {
        radius,
        chord: None,
        lead: None,
        next: 0,
        last: 0,
        step: 1,
        trail: None,
    };
    if start == stop {
        return Ok(arc);
    }

    let (first, last, step) = if stop > start {
        (start.ceil() as i64, stop.floor() as i64, 1)
    } else {
        (start.floor() as i64, stop.ceil() as i64, -1)
    };

    if (last - first) * step < 0 {
        // no vertex inside the span
        arc.chord = Some((start, stop));
        return Ok(arc);
    }

    arc.next = first;
    arc.last = last;
    arc.step = step;
    arc.lead = (start.fract() != 0.0).then_some(start);
    arc.trail = (stop.fract() != 0.0).then_some(stop);
    Ok(arc)
}

/// Lazy, restartable (`Clone`) sequence of polygon edges.
#[derive(Debug, Clone)]
pub struct ArcSegments {
    radius: f64,
    chord: Option<(f64, f64)>,
    lead: Option<f64>,
    next: i64,
    last: i64,
    step: i64,
    trail: Option<f64>,
}

impl Iterator for ArcSegments {
    type Item = (Point, Point);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((start, stop)) = self.chord.take() {
            return Some((
                intersection(self.radius, start),
                intersection(self.radius, stop),
            ));
        }
        if let Some(start) = self.lead.take() {
            return Some((
                intersection(self.radius, start),
                vertex(self.radius, self.next as f64),
            ));
        }
        if self.next != self.last {
            let from = self.next;
            self.next += self.step;
            return Some((
                vertex(self.radius, from as f64),
                vertex(self.radius, self.next as f64),
            ));
        }
        if let Some(stop) = self.trail.take() {
            return Some((
                vertex(self.radius, self.last as f64),
                intersection(self.radius, stop),
            ));
        }
        None
    }
}

fn check_radius(operation: &'static str, radius: f64) -> Result<(), GeometryError> {
    if radius == 0.0 || !radius.is_finite() {
        return Err(GeometryError::degenerate(
            operation,
            format!("invalid ring radius {}", radius),
        ));
    }
    Ok(())
}

fn vertex(radius: f64, position: f64) -> Point {
    let angle = angle_from_ring_position(position);
    Point::from_mm(angle.sin() * radius, angle.cos() * radius)
}

fn intersection(radius: f64, position: f64) -> Point {
    let slope = (position * PI / 30.0 - PI / 2.0).atan();
    polygon_point(radius, slope.tan(), Side::Right)
}

fn polygon_point(radius: f64, theta: f64, side: Side) -> Point {
    let epsilon = theta.rem_euclid(HALF_EDGE * 2.0);
    let apothem = HALF_EDGE.cos() * radius;
    let distance = apothem / (HALF_EDGE - epsilon).cos();
    Point::from_mm(
        theta.cos() * distance * side.sign(),
        theta.sin() * distance * side.sign(),
    )
}
