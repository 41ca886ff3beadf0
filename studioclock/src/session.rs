//! Layout session: clear, place, route, commit.
//!
//! A session works on a scratch copy of the board and only swaps it in
//! once every net has been routed, so a failing run leaves the caller's
//! board untouched.

use serde::Serialize;
use thiserror::Error;

use crate::board::{Board, LayerMap, LayerTable};
use crate::catalog::{Catalogs, NetGroups};
use crate::config::ClockParams;
use crate::geometry::GeometryError;
use crate::placement::Placement;
use crate::routing::{
    route_digit_bus, route_sink_ring, route_source_net, NetRoute, RouteContext, RoutingError,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("missing element {0}")]
    MissingElement(String),
    #[error("layer {0} is not declared by the document")]
    MissingLayer(String),
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),
    #[error("placement failed: {0}")]
    Geometry(#[from] GeometryError),
}

/// What a session removed and produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub cleared_tracks: usize,
    pub cleared_vias: usize,
    pub cleared_drawings: usize,
    pub placed_elements: usize,
    pub sink_nets: usize,
    pub source_nets: usize,
    pub tracks: usize,
    pub vias: usize,
    pub drawings: usize,
}

/// Resolve the three layers a session writes to.
pub fn resolve_layers(table: &LayerTable) -> Result<LayerMap, SessionError> {
    let lookup = |name: &str| {
        table
            .id(name)
            .ok_or_else(|| SessionError::MissingLayer(name.to_string()))
    };
    Ok(LayerMap {
        front: lookup(LayerMap::FRONT_NAME)?,
        back: lookup(LayerMap::BACK_NAME)?,
        outline: lookup(LayerMap::OUTLINE_NAME)?,
    })
}

pub struct LayoutSession {
    params: ClockParams,
    layers: LayerMap,
}

impl LayoutSession {
    /// Queries the layer table once; the session never looks at it again.
    pub fn new(params: ClockParams, layers: &LayerTable) -> Result<Self, SessionError> {
        let layers = resolve_layers(layers)?;
        tracing::debug!(
            "Layers: front {} back {} outline {}",
            layers.front,
            layers.back,
            layers.outline
        );
        Ok(Self { params, layers })
    }

    pub fn params(&self) -> &ClockParams {
        &self.params
    }

    pub fn layers(&self) -> LayerMap {
        self.layers
    }

    /// Run the full layout against `board`.
    pub fn run(&self, board: &mut Board) -> Result<SessionReport, SessionError> {
        let mut work = board.clone();
        let mut report = SessionReport::default();

        let cleared = work.clear_artifacts(self.layers.outline);
        report.cleared_tracks = cleared.tracks;
        report.cleared_vias = cleared.vias;
        report.cleared_drawings = cleared.drawings;
        tracing::info!(
            "Cleared {} tracks, {} vias, {} outline lines",
            cleared.tracks,
            cleared.vias,
            cleared.drawings
        );

        let catalogs = Catalogs::discover(&work)?;
        let placement = Placement::new(&self.params);
        report.placed_elements = placement.place_all(&mut work, &catalogs)?;
        tracing::info!("Placed {} elements", report.placed_elements);

        let nets = NetGroups::discover(&work, &self.params);
        report.sink_nets = nets.sink.len();
        report.source_nets = nets.source.len();
        tracing::info!(
            "Found {} sink nets and {} source nets",
            report.sink_nets,
            report.source_nets
        );

        let routes = self.route(&work, &catalogs, &nets)?;

        for drawing in placement.outline(self.layers.outline) {
            work.add_drawing(drawing);
        }
        report.drawings = work.drawings.len();

        for route in routes {
            if route.is_empty() {
                continue;
            }
            work.ensure_net(&route.net);
            report.tracks += route.tracks.len();
            report.vias += route.vias.len();
            for track in route.tracks {
                work.add_track(track);
            }
            for via in route.vias {
                work.add_via(via);
            }
        }
        tracing::info!("Routed {} tracks and {} vias", report.tracks, report.vias);

        *board = work;
        Ok(report)
    }

    /// Digit bus first, then every sink ring, then every source net.
    fn route(
        &self,
        board: &Board,
        catalogs: &Catalogs,
        nets: &NetGroups,
    ) -> Result<Vec<NetRoute>, SessionError> {
        let ctx = RouteContext::new(board, &self.params, self.layers);
        let mut routes = route_digit_bus(&ctx, catalogs, nets)?;
        for net in &nets.sink {
            routes.push(route_sink_ring(&ctx, net)?);
        }
        for net in &nets.source {
            routes.push(route_source_net(&ctx, net)?);
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_layer_is_reported() {
        let table: LayerTable = [(0, "F.Cu"), (44, "Edge.Cuts")].into_iter().collect();
        let err = LayoutSession::new(ClockParams::default(), &table).err().unwrap();
        assert_eq!(err, SessionError::MissingLayer("B.Cu".to_string()));
    }

    #[test]
    fn test_failed_run_leaves_board_untouched() {
        let table: LayerTable = [(0, "F.Cu"), (31, "B.Cu"), (44, "Edge.Cuts")]
            .into_iter()
            .collect();
        let mut board = Board::new(table.clone());
        board.elements.push(crate::board::Element::new(
            "D1",
            crate::geometry::Point::from_mm(1.0, 1.0),
            vec![],
        ));
        let before = board.clone();

        let session = LayoutSession::new(ClockParams::default(), &table).unwrap();
        let err = session.run(&mut board).unwrap_err();
        assert_eq!(err, SessionError::MissingElement("D2".to_string()));
        assert_eq!(board, before);
    }
}
