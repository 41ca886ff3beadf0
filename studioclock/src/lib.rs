//! StudioClock - placement and two-layer routing for a KiCad LED clock
//!
//! The board carries 60 seconds LEDs on an outer ring, 12 hour LEDs on a
//! second ring, four seven-segment digits in a row, two separator LEDs and
//! two connectors. This library places all of them and synthesizes every
//! track and via from the net names alone.
//!
//! # Quick Start
//!
//! ```no_run
//! use studioclock::{LayoutOptions, StudioClockCore};
//! use std::path::Path;
//!
//! let result = StudioClockCore::layout_pcb(
//!     Path::new("clock.kicad_pcb"),
//!     &LayoutOptions::default(),
//! ).unwrap();
//!
//! println!("{} tracks, {} vias", result.report.tracks, result.report.vias);
//! ```
//!
//! # Layers of the crate
//!
//! - **geometry**: ring positions on a 60-sided polygon
//! - **placement**: positions and rotations per catalog
//! - **routing**: per-net path templates
//! - **session**: clear, place, route, commit
//! - **parser**: `.kicad_pcb` load and save

pub mod board;
pub mod catalog;
pub mod config;
pub mod core;
pub mod geometry;
pub mod parser;
pub mod placement;
pub mod routing;
pub mod session;

// Re-export main types
pub use board::{Board, Element, Layer, LayerMap, LayerTable, Pad, RefId, Track, Via};
pub use catalog::{Catalogs, Category, Net, NetGroups, NetKind};
pub use config::ClockParams;
pub use crate::core::{LayoutOptions, LayoutResult, StudioClockCore, StudioClockError};
pub use geometry::{GeometryError, Point, Side};
pub use parser::{KicadDocument, PcbParser};
pub use routing::{NetRoute, RoutingError};
pub use session::{LayoutSession, SessionError, SessionReport};

/// Load a board from a `.kicad_pcb` file (convenience wrapper).
pub fn load_board(path: &std::path::Path) -> Result<Board, StudioClockError> {
    PcbParser::parse_board(path).map_err(StudioClockError::from)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Board, ClockParams, KicadDocument, LayoutOptions, LayoutSession, SessionReport,
        StudioClockCore, StudioClockError,
    };
}
