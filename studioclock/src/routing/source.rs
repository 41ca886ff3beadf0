//! Source net templates, picked by net number.
//!
//! | number          | template                                  |
//! |-----------------|-------------------------------------------|
//! | 0 to 3          | quadrant: chain its seconds LEDs, exit    |
//! | 4               | hour ring on its own radius               |
//! | 50, 51, 60, 61  | bridge between a digit pair and connector |
//! | 11, 21          | dogleg from separator to connector        |

use super::{NetRoute, PathWriter, RouteContext, RoutingError};
use crate::board::Layer;
use crate::catalog::{Category, Member, Net, NetKind};
use crate::geometry::{point_on_circle, ring_intersection_at_position, GeometryError, Point};

/// Where a quadrant leaves its LED ring.
#[derive(Debug, Clone, Copy, PartialEq)]
enum QuadrantExit {
    /// Back side arc on the outermost sink ring between two positions.
    Arc { start: f64, stop: f64 },
    /// Straight off the LED ring at a position.
    Direct { position: f64 },
}

const QUADRANT_EXITS: [QuadrantExit; 4] = [
    QuadrantExit::Arc {
        start: 13.5,
        stop: 26.5,
    },
    QuadrantExit::Direct { position: 28.5 },
    QuadrantExit::Direct { position: 31.5 },
    QuadrantExit::Arc {
        start: 46.5,
        stop: 33.5,
    },
];

/// Sink ring whose radius the quadrant exit arcs follow.
const QUADRANT_ARC_RING: i32 = 15;

/// Hour ring: drop to the inner ring at this position...
const HOUR_RING_DROP: f64 = 29.5;
/// ...and serve the connector along this back side arc.
const HOUR_RING_ARC: (f64, f64) = (36.0, 24.0);
/// Ring number of the inner hour ring.
const HOUR_RING_INNER: i32 = -2;

pub fn route_source_net(ctx: &RouteContext<'_>, net: &Net) -> Result<NetRoute, RoutingError> {
    let NetKind::Source(number) = net.kind else {
        return Err(RoutingError::UnroutedNet {
            net: net.name.clone(),
            reason: "not a source net",
        });
    };
    tracing::debug!("Routing source net {} ({} members)", net.name, net.members.len());

    let mut writer = ctx.writer(&net.name);
    match number {
        0..=3 => route_quadrant(ctx, &mut writer, net, number as usize)?,
        4 => route_hour_ring(ctx, &mut writer, net)?,
        50 | 51 | 60 | 61 => route_bridge(ctx, &mut writer, net)?,
        11 | 21 => route_dogleg(ctx, &mut writer, net)?,
        _ => {
            return Err(RoutingError::UnroutedNet {
                net: net.name.clone(),
                reason: "no template for this source number",
            })
        }
    }
    Ok(writer.finish())
}

fn required<'n>(
    net: &'n Net,
    category: Category,
    role: &'static str,
) -> Result<&'n Member, RoutingError> {
    net.members_in(category)
        .next()
        .ok_or_else(|| RoutingError::MissingMember {
            net: net.name.clone(),
            role,
        })
}

fn route_quadrant(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    net: &Net,
    quadrant: usize,
) -> Result<(), RoutingError> {
    let leds: Vec<Point> = net.ring_members().map(|m| ctx.position(m)).collect();
    let Some(first) = leds.first() else {
        return Err(RoutingError::MissingMember {
            net: net.name.clone(),
            role: "ring LED",
        });
    };
    let anchor = ctx.position(required(net, Category::Connector, "connector pin")?);
    let radius = first.norm_mm();

    for pair in leds.windows(2) {
        writer.track(pair[0], pair[1], Layer::Front);
    }

    let exit = match QUADRANT_EXITS[quadrant] {
        QuadrantExit::Direct { position } => ring_intersection_at_position(radius, position)?,
        QuadrantExit::Arc { start, stop } => {
            let arc_radius = ctx.params.ring_radius_for_number(QUADRANT_ARC_RING);
            let (arc_start, arc_end) = writer
                .arc(arc_radius, start, stop, Layer::Back)?
                .ok_or_else(|| GeometryError::degenerate("quadrant exit", "empty arc"))?;
            let drop = writer.track(
                ring_intersection_at_position(radius, start)?,
                arc_start,
                Layer::Front,
            );
            writer.via(drop);
            writer.via(arc_end)
        }
    };
    writer.connect_to_anchor(exit, anchor)
}

fn route_hour_ring(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    net: &Net,
) -> Result<(), RoutingError> {
    let Some(first) = net.ring_members().next() else {
        return Err(RoutingError::MissingMember {
            net: net.name.clone(),
            role: "hour LED",
        });
    };
    let connectors: Vec<Point> = net
        .members_in(Category::Connector)
        .map(|m| ctx.position(m))
        .collect();
    if connectors.is_empty() {
        return Err(RoutingError::MissingMember {
            net: net.name.clone(),
            role: "connector pin",
        });
    }

    let radius = ctx.position(first).norm_mm();
    let inner = ctx.params.ring_radius_for_number(HOUR_RING_INNER);
    writer.ring(radius, Layer::Front)?;

    let drop = writer.track(
        ring_intersection_at_position(radius, HOUR_RING_DROP)?,
        point_on_circle(inner, HOUR_RING_DROP)?,
        Layer::Front,
    );
    writer.via(drop);

    let (start, stop) = HOUR_RING_ARC;
    let (arc_start, arc_end) = writer
        .arc(inner, start, stop, Layer::Back)?
        .ok_or_else(|| GeometryError::degenerate("hour ring", "empty arc"))?;

    for anchor in connectors {
        let tap = if anchor.distance_mm(&arc_start) < anchor.distance_mm(&arc_end) {
            arc_start
        } else {
            arc_end
        };
        writer.via(tap);
        writer.connect_to_anchor(tap, anchor)?;
    }
    Ok(())
}

fn route_bridge(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    net: &Net,
) -> Result<(), RoutingError> {
    let connector = required(net, Category::Connector, "connector pin")?;
    let digits: Vec<Point> = net
        .members
        .iter()
        .filter(|m| !std::ptr::eq(*m, connector))
        .map(|m| ctx.position(m))
        .collect();
    let [first, second, ..] = digits[..] else {
        return Err(RoutingError::MissingMember {
            net: net.name.clone(),
            role: "pair of digit pads",
        });
    };

    writer.track(first, second, Layer::Front);

    let lower = if first.y >= second.y { first } else { second };
    let via = writer.via(lower.offset_mm(0.0, -ctx.params.bridge_via_drop));
    let pin = ctx.position(connector);
    let bend = Point::new(pin.x, via.y + (pin.x - via.x).abs());
    writer.track(via, bend, Layer::Back);
    writer.track(bend, pin, Layer::Back);
    Ok(())
}

fn route_dogleg(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    net: &Net,
) -> Result<(), RoutingError> {
    let [ref from, ref to, ..] = net.members[..] else {
        return Err(RoutingError::MissingMember {
            net: net.name.clone(),
            role: "pair of pads",
        });
    };
    let from = ctx.position(from);
    let to = ctx.position(to);
    let corner = writer.track(from, Point::new(to.x, from.y), Layer::Front);
    writer.via(corner);
    writer.track(corner, to, Layer::Back);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::board::Board;
    use crate::catalog::NetGroups;
    use crate::config::ClockParams;

    fn route(board: &Board, name: &str) -> Result<NetRoute, RoutingError> {
        let params = ClockParams::default();
        let nets = NetGroups::discover(board, &params);
        let ctx = RouteContext::new(board, &params, LAYERS);
        route_source_net(&ctx, nets.source(name).unwrap())
    }

    #[test]
    fn test_dogleg_corner() {
        let mut board = board();
        board.elements.push(element("D73", &[("2", 10.0, 5.0, "a11")]));
        board.elements.push(element("J1", &[("17", 20.0, 5.0, "a11")]));

        let route = route(&board, "a11").unwrap();
        assert_eq!(route.tracks.len(), 2);
        assert_eq!(route.vias.len(), 1);
        assert_eq!(route.vias[0].position, Point::from_mm(20.0, 5.0));
        assert_eq!(route.tracks[0].layer, LAYERS.front);
        assert_eq!(route.tracks[1].layer, LAYERS.back);
    }

    #[test]
    fn test_unknown_source_number() {
        let mut board = board();
        board.elements.push(element("J2", &[("1", 0.0, 0.0, "a7")]));
        let err = route(&board, "a7").unwrap_err();
        assert!(matches!(err, RoutingError::UnroutedNet { ref net, .. } if net == "a7"));
    }

    #[test]
    fn test_bridge_drops_from_lower_digit() {
        let mut board = board();
        board.elements.push(element("U1", &[("3", -21.0, -3.0, "a50")]));
        board.elements.push(element("U2", &[("3", -8.0, 3.0, "a50")]));
        board.elements.push(element("J2", &[("5", 2.0, 15.0, "a50")]));

        let route = route(&board, "a50").unwrap();
        assert_eq!(route.tracks.len(), 3);
        assert_eq!(route.vias.len(), 1);
        let via = route.vias[0].position;
        assert_eq!(via, Point::from_mm(-8.0, 0.0));
        // 45 degree leg on the back side, then straight to the pin
        assert_eq!(route.tracks[1].end, Point::from_mm(2.0, 10.0));
        assert_eq!(route.tracks[2].end, Point::from_mm(2.0, 15.0));
    }

    #[test]
    fn test_bridge_drops_from_larger_y_on_one_side() {
        let mut board = board();
        board.elements.push(element("U3", &[("3", 8.0, 2.0, "a60")]));
        board.elements.push(element("U4", &[("3", 21.0, 5.0, "a60")]));
        board.elements.push(element("J2", &[("8", 1.0, 15.0, "a60")]));

        let route = route(&board, "a60").unwrap();
        assert_eq!(route.vias[0].position, Point::from_mm(21.0, 2.0));
        assert_eq!(route.tracks[1].end, Point::from_mm(1.0, 22.0));
    }

    #[test]
    fn test_bridge_without_connector() {
        let mut board = board();
        board.elements.push(element("U1", &[("3", -21.0, -3.0, "a60")]));
        board.elements.push(element("U2", &[("3", -8.0, 3.0, "a60")]));
        let err = route(&board, "a60").unwrap_err();
        assert!(matches!(err, RoutingError::MissingMember { role: "connector pin", .. }));
    }

    #[test]
    fn test_direct_quadrant_exit() {
        let mut board = board();
        let led = point_on_circle(42.0, 30.0).unwrap();
        board
            .elements
            .push(element("D31", &[("2", led.x_mm(), led.y_mm(), "a2")]));
        let next = point_on_circle(42.0, 31.0).unwrap();
        board
            .elements
            .push(element("D32", &[("2", next.x_mm(), next.y_mm(), "a2")]));
        board.elements.push(element("J2", &[("3", -2.54, 15.0, "a2")]));

        let route = route(&board, "a2").unwrap();
        // chain, ray to the anchor column, back side to the pin
        assert_eq!(route.tracks.len(), 3);
        assert_eq!(route.vias.len(), 1);
        let exit = ring_intersection_at_position(led.norm_mm(), 31.5).unwrap();
        assert_eq!(route.tracks[1].start, exit);
        assert_eq!(route.vias[0].position.x, Point::from_mm(-2.54, 0.0).x);
        assert_eq!(route.tracks[2].end, Point::from_mm(-2.54, 15.0));
    }

    #[test]
    fn test_arc_quadrant_exit() {
        let params = ClockParams::default();
        let mut board = board();
        let led = point_on_circle(42.0, 0.0).unwrap();
        board
            .elements
            .push(element("D1", &[("2", led.x_mm(), led.y_mm(), "a0")]));
        board.elements.push(element("J2", &[("1", 2.54, 15.0, "a0")]));

        let route = route(&board, "a0").unwrap();
        let arc_radius = params.ring_radius_for_number(15);
        let arc: Vec<_> = route.tracks_on(LAYERS.back).collect();
        // lead chord, 12 edges, trail chord, then the anchor leg
        assert_eq!(arc.len(), 15);
        assert_eq!(arc[0].start, ring_intersection_at_position(arc_radius, 13.5).unwrap());
        assert_eq!(arc[13].end, ring_intersection_at_position(arc_radius, 26.5).unwrap());
        assert_eq!(route.vias.len(), 3);
        assert_eq!(route.vias[0].position, arc[0].start);
        assert_eq!(route.vias[1].position, arc[13].end);
    }

    #[test]
    fn test_hour_ring_taps_nearest_arc_end() {
        let params = ClockParams::default();
        let mut board = board();
        let led = point_on_circle(params.hours_radius(), 0.0).unwrap();
        board
            .elements
            .push(element("D61", &[("2", led.x_mm(), led.y_mm(), "a4")]));
        board.elements.push(element("J2", &[("9", -2.54, 15.0, "a4")]));

        let route = route(&board, "a4").unwrap();
        let inner = params.ring_radius_for_number(-2);
        // ring, drop, 12 arc edges, anchor leg pair
        assert_eq!(route.tracks.len(), 61 + 1 + 12 + 2);
        let tap = route.vias[1].position;
        assert_eq!(tap, point_on_circle(inner, 36.0).unwrap());
        assert_eq!(route.vias.len(), 3);
    }
}
