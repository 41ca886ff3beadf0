//! Path synthesis: tracks and vias for every clock net.
//!
//! Each net is routed on its own from its member list and its number;
//! nets never share tracks or vias. [`PathWriter`] holds the routing
//! primitives every template is built from.

pub mod sink;
pub mod source;

use thiserror::Error;

use crate::board::{Board, Element, Layer, LayerMap, Track, Via};
use crate::catalog::Member;
use crate::config::ClockParams;
use crate::geometry::{
    arc_segments, mm_to_nm, ray_polygon_intersection, GeometryError, Point, Side,
};

pub use sink::{digit_bus_offset, route_digit_bus, route_sink_ring, DigitBus, DIGIT_BUS_OFFSETS};
pub use source::route_source_net;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("net {net} matches no routing template: {reason}")]
    UnroutedNet { net: String, reason: &'static str },
    #[error("net {net} has no {role}")]
    MissingMember { net: String, role: &'static str },
    #[error("paired pads are on different nets: {first} and {second}")]
    NetMismatch { first: String, second: String },
    #[error("pad '{pad}' of {element} has no integer name")]
    InvalidPadName { element: String, pad: String },
}

/// Read-only view of the placed board shared by all templates.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub board: &'a Board,
    pub params: &'a ClockParams,
    pub layers: LayerMap,
}

impl<'a> RouteContext<'a> {
    pub fn new(board: &'a Board, params: &'a ClockParams, layers: LayerMap) -> Self {
        Self {
            board,
            params,
            layers,
        }
    }

    pub fn element(&self, member: &Member) -> &'a Element {
        &self.board.elements[member.element]
    }

    /// Absolute position of a member pad on the placed board.
    pub fn position(&self, member: &Member) -> Point {
        let element = self.element(member);
        element.position + element.pads[member.pad].offset.rotated(element.rotation)
    }

    /// Integer name of a member pad.
    pub fn pad_number(&self, member: &Member) -> Result<u32, RoutingError> {
        let element = self.element(member);
        let pad = &element.pads[member.pad];
        pad.number().ok_or_else(|| RoutingError::InvalidPadName {
            element: element.reference.clone(),
            pad: pad.name.clone(),
        })
    }

    pub fn writer(&self, net: &str) -> PathWriter {
        PathWriter::new(net, self.params, self.layers)
    }
}

/// Tracks and vias emitted for one net, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetRoute {
    pub net: String,
    pub tracks: Vec<Track>,
    pub vias: Vec<Via>,
}

impl NetRoute {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.vias.is_empty()
    }

    pub fn tracks_on(&self, layer: u32) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.layer == layer)
    }
}

/// Emits the tracks and vias of one net.
#[derive(Debug, Clone)]
pub struct PathWriter {
    layers: LayerMap,
    track_width: i64,
    via_size: i64,
    via_drill: i64,
    route: NetRoute,
}

impl PathWriter {
    pub fn new(net: &str, params: &ClockParams, layers: LayerMap) -> Self {
        Self {
            layers,
            track_width: mm_to_nm(params.track_width),
            via_size: mm_to_nm(params.via_size),
            via_drill: mm_to_nm(params.via_drill),
            route: NetRoute {
                net: net.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn net(&self) -> &str {
        &self.route.net
    }

    /// Straight segment; returns its end.
    pub fn track(&mut self, start: Point, end: Point, layer: Layer) -> Point {
        self.route.tracks.push(Track {
            uuid: String::new(),
            start,
            end,
            width: self.track_width,
            layer: self.layers.id(layer),
            net: self.route.net.clone(),
        });
        end
    }

    pub fn via(&mut self, at: Point) -> Point {
        self.route.vias.push(Via {
            uuid: String::new(),
            position: at,
            size: self.via_size,
            drill: self.via_drill,
            net: self.route.net.clone(),
        });
        at
    }

    /// Staple from `a` to `b`: front legs of `offset` mm, back run between
    /// the two vias. Returns both vias, `a` side first.
    pub fn jog_pair(&mut self, a: Point, b: Point, offset: f64) -> (Point, Point) {
        let via_a = a.offset_mm(0.0, offset);
        let via_b = b.offset_mm(0.0, offset);
        self.track(a, via_a, Layer::Front);
        self.via(via_a);
        self.track(via_a, via_b, Layer::Back);
        self.via(via_b);
        self.track(via_b, b, Layer::Front);
        (via_a, via_b)
    }

    /// [`jog_pair`](Self::jog_pair), keeping the via farther from x = 0.
    pub fn jog(&mut self, a: Point, b: Point, offset: f64) -> Point {
        let (via_a, via_b) = self.jog_pair(a, b, offset);
        farther_from_axis(via_a, via_b)
    }

    /// Front segment from `from` onto the ring of `radius`, plus a via.
    pub fn radial_handoff(
        &mut self,
        from: Point,
        radius: f64,
        slope: f64,
        side: Side,
    ) -> Result<Point, RoutingError> {
        let target = ray_polygon_intersection(radius, slope, side)?;
        self.track(from, target, Layer::Front);
        Ok(self.via(target))
    }

    /// Follow the ray through `ring_point` to the vertical line through the
    /// anchor, change layer, and finish on the back side.
    pub fn connect_to_anchor(&mut self, ring_point: Point, anchor: Point) -> Result<(), RoutingError> {
        let slope = ring_point.slope_from_origin()?;
        let turn = Point::new(anchor.x, (anchor.x as f64 * slope).round() as i64);
        self.track(ring_point, turn, Layer::Front);
        self.via(turn);
        self.track(turn, anchor, Layer::Back);
        Ok(())
    }

    /// Polygon arc between two ring positions; returns the start of the
    /// first and the end of the last edge.
    pub fn arc(
        &mut self,
        radius: f64,
        start: f64,
        stop: f64,
        layer: Layer,
    ) -> Result<Option<(Point, Point)>, RoutingError> {
        let mut ends: Option<(Point, Point)> = None;
        for (from, to) in arc_segments(radius, start, stop)? {
            self.track(from, to, layer);
            ends = Some(match ends {
                Some((first, _)) => (first, to),
                None => (from, to),
            });
        }
        Ok(ends)
    }

    /// Closed ring: positions 0 through 61, the last edge doubling the first.
    pub fn ring(&mut self, radius: f64, layer: Layer) -> Result<(), RoutingError> {
        self.arc(radius, 0.0, 61.0, layer)?;
        Ok(())
    }

    pub fn finish(self) -> NetRoute {
        self.route
    }
}

/// The point farther from the vertical centre line; ties go to `b`.
pub fn farther_from_axis(a: Point, b: Point) -> Point {
    if a.x.abs() <= b.x.abs() {
        b
    } else {
        a
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::board::{Element, LayerTable, Pad};

    pub const LAYERS: LayerMap = LayerMap {
        front: 0,
        back: 31,
        outline: 44,
    };

    pub fn board() -> Board {
        Board::new(
            [(0, "F.Cu"), (31, "B.Cu"), (44, "Edge.Cuts")]
                .into_iter()
                .collect::<LayerTable>(),
        )
    }

    /// Element with one pad per `(name, x, y, net)` at absolute mm offsets.
    pub fn element(reference: &str, pads: &[(&str, f64, f64, &str)]) -> Element {
        Element::new(
            reference,
            Point::ORIGIN,
            pads.iter()
                .map(|(name, x, y, net)| Pad::new(*name, Point::from_mm(*x, *y), Some(*net)))
                .collect(),
        )
    }
}
