//! Sink net templates: the digit bus and the per-net routing rings.
//!
//! Digit strips are wired in two mirrored branches, U1 to U2 on the left
//! and U3 to U4 on the right. Every sink net then leaves the bus on its
//! own ring, which also collects the seconds LEDs, the hour LEDs and the
//! connector pins of that net.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use super::{farther_from_axis, NetRoute, PathWriter, RouteContext, RoutingError};
use crate::board::Layer;
use crate::catalog::{Catalogs, Category, Member, Net, NetGroups, NetKind, HOURS_WITHOUT_RING_VIA};
use crate::geometry::{
    mm_to_nm, point_on_circle, ring_intersection_at_position, GeometryError, Point, Side,
};
use crate::placement::ring_position;

/// Jog offsets of the digit bus, in units of `jog_scale` millimetres.
///
/// Neighbouring segments alternate above and below the strip so that no
/// two back side runs share a row.
pub const DIGIT_BUS_OFFSETS: &[(&str, f64)] = &[
    ("k0", -3.0),
    ("k1", 3.0),
    ("k2", -4.0),
    ("k3", 4.0),
    ("k4", -5.0),
    ("k5", 5.0),
    ("k6", -6.0),
    ("k7", 6.0),
    ("k8", -3.0),
    ("k9", -4.0),
    ("k10", 4.0),
    ("k11", -5.0),
    ("k12", 5.0),
    ("k13", -6.0),
    ("k14", 6.0),
    ("k15", 3.0),
];

pub fn digit_bus_offset(net: &str) -> Option<f64> {
    DIGIT_BUS_OFFSETS
        .iter()
        .find(|(name, _)| *name == net)
        .map(|(_, offset)| *offset)
}

/// Ring position offset of the hour LED escape, past the LED slot.
const HOUR_ESCAPE_POSITION: f64 = 2.5;
/// Ring span covered by the hour LED front side arc.
const HOUR_ARC_SPAN: f64 = 2.0;
/// Pin number of the connector pin pointing straight down.
const CONNECTOR_CENTRE_PIN: f64 = 8.5;

#[derive(Debug)]
struct BusNet {
    number: i32,
    has_ring: bool,
    writer: PathWriter,
    /// Jog vias in emission order.
    jogs: Vec<(Point, Point)>,
    /// Outermost via reached so far.
    exit: Point,
}

/// Digit bus under construction.
///
/// Only nets that also own a ring (a seconds, hour or connector member)
/// are handed off from the bus line; the others end at their jogs.
///
/// Call [`route_left`](Self::route_left) and
/// [`route_right`](Self::route_right), then [`finish`](Self::finish).
pub struct DigitBus<'c> {
    ctx: &'c RouteContext<'c>,
    nets: &'c NetGroups,
    strips: Vec<usize>,
    order: Vec<String>,
    routes: BTreeMap<String, BusNet>,
}

impl<'c> DigitBus<'c> {
    pub fn new(
        ctx: &'c RouteContext<'c>,
        catalogs: &Catalogs,
        nets: &'c NetGroups,
    ) -> Result<Self, RoutingError> {
        if catalogs.digits.len() < 4 {
            return Err(RoutingError::MissingMember {
                net: "digit bus".to_string(),
                role: "set of four digit strips",
            });
        }
        Ok(Self {
            ctx,
            nets,
            strips: catalogs.digits.clone(),
            order: Vec::new(),
            routes: BTreeMap::new(),
        })
    }

    /// Jog every segment pad of U1 to the matching pad of U2.
    pub fn route_left(&mut self) -> Result<(), RoutingError> {
        self.route_pair(self.strips[0], self.strips[1])
    }

    /// Jog every segment pad of U3 to the matching pad of U4.
    pub fn route_right(&mut self) -> Result<(), RoutingError> {
        self.route_pair(self.strips[2], self.strips[3])
    }

    fn route_pair(&mut self, first: usize, second: usize) -> Result<(), RoutingError> {
        let board = self.ctx.board;
        let nets = self.nets;
        let partner = self.segment_pads(second)?;
        for (number, pad_index) in self.segment_pads(first)? {
            let element = &board.elements[first];
            let Some(&partner_index) = partner.get(&number) else {
                return Err(RoutingError::MissingMember {
                    net: element.pads[pad_index].net.clone().unwrap_or_default(),
                    role: "partner pad on the paired digit",
                });
            };
            let net_a = element.pads[pad_index].net.as_deref().unwrap_or_default();
            let net_b = board.elements[second].pads[partner_index]
                .net
                .as_deref()
                .unwrap_or_default();
            if net_a != net_b {
                return Err(RoutingError::NetMismatch {
                    first: net_a.to_string(),
                    second: net_b.to_string(),
                });
            }
            if net_a.is_empty() {
                continue;
            }

            let net = nets.sink(net_a).ok_or_else(|| RoutingError::UnroutedNet {
                net: net_a.to_string(),
                reason: "digit pad outside the sink nets",
            })?;
            let offset = digit_bus_offset(net_a).ok_or_else(|| RoutingError::UnroutedNet {
                net: net_a.to_string(),
                reason: "no digit bus offset",
            })? * self.ctx.params.jog_scale;

            let a = board.elements[first]
                .pad_position(pad_index)
                .unwrap_or(board.elements[first].position);
            let b = board.elements[second]
                .pad_position(partner_index)
                .unwrap_or(board.elements[second].position);

            let bus = self.bus_net(net);
            let (via_a, via_b) = bus.writer.jog_pair(a, b, offset);
            bus.jogs.push((via_a, via_b));
            bus.exit = farther_from_axis(via_a, via_b);
        }
        Ok(())
    }

    fn bus_net(&mut self, net: &Net) -> &mut BusNet {
        if !self.routes.contains_key(&net.name) {
            self.order.push(net.name.clone());
        }
        let ctx = self.ctx;
        self.routes.entry(net.name.clone()).or_insert_with(|| BusNet {
            number: net.kind.number(),
            has_ring: net.has_ring(),
            writer: ctx.writer(&net.name),
            jogs: Vec::new(),
            exit: Point::ORIGIN,
        })
    }

    /// Segment pads of a digit keyed by pad number, common pads excluded.
    fn segment_pads(&self, element_index: usize) -> Result<BTreeMap<u32, usize>, RoutingError> {
        let element = &self.ctx.board.elements[element_index];
        let mut pads = BTreeMap::new();
        for (index, pad) in element.pads.iter().enumerate() {
            let number = pad.number().ok_or_else(|| RoutingError::InvalidPadName {
                element: element.reference.clone(),
                pad: pad.name.clone(),
            })?;
            if self.ctx.params.strip_common_pads.contains(&number) {
                continue;
            }
            pads.insert(number, index);
        }
        Ok(pads)
    }

    /// Bring every ring net out to the common bus line and hand it over to
    /// its ring.
    pub fn route_handoffs(&mut self) -> Result<(), RoutingError> {
        let outer = self.routes.values().map(|bus| bus.exit.x).max().unwrap_or(0);
        if outer <= 0 {
            if self.routes.is_empty() {
                return Ok(());
            }
            return Err(GeometryError::degenerate(
                "digit bus",
                format!("bus line at x = {} is not right of the origin", outer),
            )
            .into());
        }

        for name in &self.order {
            let Some(bus) = self.routes.get_mut(name) else {
                continue;
            };
            if !bus.has_ring {
                continue;
            }
            let side = Side::of(bus.exit.x)?;
            let mut exit = bus.exit;
            if exit.x.abs() < outer {
                let aligned = Point::new(outer * side.sign() as i64, exit.y);
                bus.writer.track(exit, aligned, Layer::Back);
                exit = bus.writer.via(aligned);
            }
            let slope = exit.y as f64 / outer as f64 * side.sign();
            let radius = self.ctx.params.ring_radius_for_number(bus.number);
            bus.writer.radial_handoff(exit, radius, slope, side)?;
            tracing::debug!("Bus handoff: {} at {} onto r {:.2}", name, exit, radius);
        }
        Ok(())
    }

    /// Feed the separator LEDs from the sentinel's innermost jog.
    pub fn route_sentinel(&mut self) -> Result<(), RoutingError> {
        let Some(net) = self
            .nets
            .sink
            .iter()
            .find(|n| n.kind == NetKind::Sink(NetKind::SENTINEL))
        else {
            return Ok(());
        };
        let ctx = self.ctx;
        let separators: Vec<Point> = net
            .members_in(Category::Separator)
            .map(|m| ctx.position(m))
            .collect();
        let Some(bottom) = separators.iter().map(|p| p.y).max() else {
            tracing::warn!("Sentinel {} reaches no separator", net.name);
            return Ok(());
        };
        let Some(bus) = self.routes.get_mut(&net.name) else {
            return Err(RoutingError::MissingMember {
                net: net.name.clone(),
                role: "digit bus jog",
            });
        };
        let Some(&(via_a, via_b)) = bus.jogs.first() else {
            return Err(RoutingError::MissingMember {
                net: net.name.clone(),
                role: "digit bus jog",
            });
        };

        let start = if via_a.x <= via_b.x { via_a } else { via_b };
        let bus_x = mm_to_nm(ctx.params.separator_bus_x);
        let top = bus.writer.track(start, Point::new(bus_x, start.y), Layer::Back);
        bus.writer.track(top, Point::new(bus_x, bottom), Layer::Back);
        for pad in separators {
            let tap = bus.writer.via(Point::new(bus_x, pad.y));
            bus.writer.track(pad, tap, Layer::Front);
        }
        Ok(())
    }

    /// Routes in first-jog order.
    pub fn finish(mut self) -> Vec<NetRoute> {
        self.order
            .iter()
            .filter_map(|name| self.routes.remove(name))
            .map(|bus| bus.writer.finish())
            .collect()
    }
}

/// Route the whole digit bus: both branches, the handoffs and the
/// separator feed.
pub fn route_digit_bus(
    ctx: &RouteContext<'_>,
    catalogs: &Catalogs,
    nets: &NetGroups,
) -> Result<Vec<NetRoute>, RoutingError> {
    let mut bus = DigitBus::new(ctx, catalogs, nets)?;
    bus.route_left()?;
    bus.route_right()?;
    bus.route_handoffs()?;
    bus.route_sentinel()?;
    Ok(bus.finish())
}

/// Ring of one sink net plus the escapes of its ring members.
///
/// Nets with no seconds, hours or connector member get no ring.
pub fn route_sink_ring(ctx: &RouteContext<'_>, net: &Net) -> Result<NetRoute, RoutingError> {
    let mut writer = ctx.writer(&net.name);
    if !net.has_ring() {
        tracing::debug!("Net {} has no ring members", net.name);
        return Ok(writer.finish());
    }

    let radius = ctx.params.ring_radius_for_number(net.kind.number());
    tracing::info!("Adding Net: {} with radius {:.2}", net.name, radius);
    writer.ring(radius, Layer::Back)?;

    for member in &net.members {
        match member.category {
            Some(Category::Seconds) => seconds_drop(ctx, &mut writer, member, radius)?,
            Some(Category::Hours) => hour_escape(ctx, &mut writer, member, radius)?,
            Some(Category::Connector) => connector_escape(ctx, &mut writer, member, radius)?,
            _ => {}
        }
    }
    Ok(writer.finish())
}

/// Seconds LED pad straight in to the ring vertex on its own slot.
fn seconds_drop(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    member: &Member,
    radius: f64,
) -> Result<(), RoutingError> {
    let Some(slot) = member
        .reference
        .as_ref()
        .and_then(|id| ring_position(Category::Seconds, id))
    else {
        return Ok(());
    };
    let corner = point_on_circle(radius, slot)?;
    writer.track(ctx.position(member), corner, Layer::Front);
    writer.via(corner);
    Ok(())
}

/// Hour LED: short arc along the LED ring, then out to the net ring.
fn hour_escape(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    member: &Member,
    radius: f64,
) -> Result<(), RoutingError> {
    let Some(id) = member.reference.as_ref() else {
        return Ok(());
    };
    let Some(slot) = ring_position(Category::Hours, id) else {
        return Ok(());
    };
    let led_radius = ctx.position(member).norm_mm();
    let escape = slot + HOUR_ESCAPE_POSITION;

    let Some((_, arc_end)) = writer.arc(led_radius, slot, slot + HOUR_ARC_SPAN, Layer::Front)?
    else {
        return Ok(());
    };
    let outer = ring_intersection_at_position(led_radius, escape)?;
    let inner =
        ring_intersection_at_position(led_radius - ctx.params.hour_escape_depth, escape)?;
    let target = ring_intersection_at_position(radius, escape)?;

    writer.track(outer, inner, Layer::Back);
    writer.track(inner, target, Layer::Front);
    writer.track(arc_end, outer, Layer::Front);
    writer.via(outer);
    writer.via(inner);
    if !HOURS_WITHOUT_RING_VIA.contains(&id.index) {
        writer.via(target);
    }
    Ok(())
}

/// Connector pin: up on the back side, then fanned out along its pin angle.
fn connector_escape(
    ctx: &RouteContext<'_>,
    writer: &mut PathWriter,
    member: &Member,
    radius: f64,
) -> Result<(), RoutingError> {
    let pin = ctx.pad_number(member)? as f64;
    let pad = ctx.position(member);
    let element = ctx.element(member);

    let escape = Point::new(pad.x, element.position.y - mm_to_nm(ctx.params.connector_escape_drop));
    writer.track(pad, escape, Layer::Back);
    writer.via(escape);

    let angle = (pin - CONNECTOR_CENTRE_PIN) / 30.0 * PI - PI / 2.0;
    let bend = Point::from_mm(pad.x_mm(), pad.x_mm() * angle.tan());
    writer.track(escape, bend, Layer::Front);

    let reach = radius * (PI / 60.0).cos();
    let on_ring = writer.track(
        bend,
        Point::from_mm(angle.cos() * reach, angle.sin() * reach),
        Layer::Front,
    );
    writer.via(on_ring);
    Ok(())
}
