//! KiCad PCB loader
//!
//! Reads the parts of a `.kicad_pcb` file a layout session works on:
//! - the layer table `(layers (0 F.Cu signal) ...)`
//! - net declarations `(net 3 "k0")`
//! - footprints, both `(module ...)` (KiCad 5) and `(footprint ...)`
//!   (KiCad 6+), with their pads
//! - existing `segment`, `via` and `gr_line` records
//!
//! Coordinates are millimetres in the file and nanometres on the board.

use std::path::Path;
use thiserror::Error;

use crate::board::{Board, Drawing, Element, LayerId, LayerTable, NetDecl, Pad, Track, Via};
use crate::geometry::Point;
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Item tags a session regenerates.
pub const ARTIFACT_TAGS: [&str; 3] = ["segment", "via", "gr_line"];

pub struct PcbParser;

impl PcbParser {
    pub fn parse_board(path: &Path) -> Result<Board, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_board_str(&content)
    }

    pub fn parse_board_str(content: &str) -> Result<Board, PcbParseError> {
        let root = Self::parse_root(content)?;
        Self::board_from_root(&root)
    }

    /// Parse and check the `(kicad_pcb ...)` root.
    pub fn parse_root(content: &str) -> Result<SExp, PcbParseError> {
        let root = SExpParser::new(content).parse()?;
        match root.tag() {
            Some("kicad_pcb") => Ok(root),
            Some(other) => Err(PcbParseError::InvalidFormat(format!(
                "Expected kicad_pcb, found {}",
                other
            ))),
            None => Err(PcbParseError::InvalidFormat(
                "Expected kicad_pcb root".to_string(),
            )),
        }
    }

    pub fn board_from_root(root: &SExp) -> Result<Board, PcbParseError> {
        let layers = root
            .child("layers")
            .map(Self::parse_layers)
            .unwrap_or_default();
        let mut board = Board::new(layers);

        for item in root.as_list().unwrap_or_default().iter().skip(1) {
            match item.tag() {
                Some("net") => board.nets.push(Self::parse_net(item)?),
                Some("module" | "footprint") => {
                    let element = Self::parse_footprint(item, &board.nets)?;
                    board.elements.push(element);
                }
                Some("segment") => {
                    let track = Self::parse_track(item, &board)?;
                    board.tracks.push(track);
                }
                Some("via") => {
                    let via = Self::parse_via(item, &board.nets)?;
                    board.vias.push(via);
                }
                Some("gr_line") => {
                    let drawing = Self::parse_drawing(item, &board.layers)?;
                    board.drawings.push(drawing);
                }
                _ => {}
            }
        }

        tracing::debug!(
            "Loaded board: {} layers, {} nets, {} elements, {} tracks, {} vias",
            board.layers.len(),
            board.nets.len(),
            board.elements.len(),
            board.tracks.len(),
            board.vias.len()
        );
        Ok(board)
    }

    fn parse_layers(sexp: &SExp) -> LayerTable {
        let mut table = LayerTable::new();
        for layer in sexp.as_list().unwrap_or_default().iter().skip(1) {
            let ordinal = layer.atom_at(0).and_then(|s| s.parse::<LayerId>().ok());
            if let (Some(ordinal), Some(name)) = (ordinal, layer.atom_at(1)) {
                table.insert(ordinal, name);
            }
        }
        table
    }

    fn parse_net(sexp: &SExp) -> Result<NetDecl, PcbParseError> {
        let code = sexp
            .atom_at(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PcbParseError::MissingField("net id".to_string()))?;
        let name = sexp.atom_at(2).unwrap_or("").to_string();
        Ok(NetDecl { code, name })
    }

    fn parse_footprint(sexp: &SExp, nets: &[NetDecl]) -> Result<Element, PcbParseError> {
        let (position, rotation) = Self::parse_at(sexp)?;

        let reference = sexp
            .children("fp_text")
            .find(|t| t.atom_at(1) == Some("reference"))
            .and_then(|t| t.atom_at(2))
            .or_else(|| {
                sexp.children("property")
                    .find(|p| p.atom_at(1) == Some("Reference"))
                    .and_then(|p| p.atom_at(2))
            })
            .unwrap_or("");

        let pads = sexp
            .children("pad")
            .map(|pad| Self::parse_pad(pad, rotation, nets))
            .collect::<Result<Vec<_>, _>>()?;

        let mut element = Element::new(reference, position, pads);
        element.rotation = rotation;
        Ok(element)
    }

    /// Pad angles are absolute in the file and relative on the board.
    fn parse_pad(sexp: &SExp, element_rotation: f64, nets: &[NetDecl]) -> Result<Pad, PcbParseError> {
        let name = sexp
            .atom_at(1)
            .ok_or_else(|| PcbParseError::MissingField("pad number".to_string()))?;
        let (offset, angle) = Self::parse_at(sexp)?;
        let net = sexp.child("net").and_then(|net| {
            net.atom_at(2).map(str::to_string).or_else(|| {
                let code: u32 = net.atom_at(1)?.parse().ok()?;
                Self::net_name(nets, code)
            })
        });

        let mut pad = Pad::new(name, offset, None);
        pad.net = net.filter(|n| !n.is_empty());
        pad.orientation = if angle == 0.0 { 0.0 } else { angle - element_rotation };
        Ok(pad)
    }

    fn parse_track(sexp: &SExp, board: &Board) -> Result<Track, PcbParseError> {
        let layer_name = sexp
            .value("layer")
            .ok_or_else(|| PcbParseError::MissingField("segment layer".to_string()))?;
        let layer = board
            .layers
            .id(layer_name)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("unknown layer {}", layer_name)))?;
        Ok(Track {
            uuid: Self::record_uuid(sexp),
            start: Self::parse_xy(sexp, "start")?,
            end: Self::parse_xy(sexp, "end")?,
            width: Self::parse_length(sexp, "width")?,
            layer,
            net: Self::record_net(sexp, &board.nets),
        })
    }

    fn parse_via(sexp: &SExp, nets: &[NetDecl]) -> Result<Via, PcbParseError> {
        let (position, _) = Self::parse_at(sexp)?;
        Ok(Via {
            uuid: Self::record_uuid(sexp),
            position,
            size: Self::parse_length(sexp, "size")?,
            drill: Self::parse_length(sexp, "drill")?,
            net: Self::record_net(sexp, nets),
        })
    }

    fn parse_drawing(sexp: &SExp, layers: &LayerTable) -> Result<Drawing, PcbParseError> {
        let layer_name = sexp
            .value("layer")
            .ok_or_else(|| PcbParseError::MissingField("gr_line layer".to_string()))?;
        let layer = layers
            .id(layer_name)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("unknown layer {}", layer_name)))?;
        // KiCad 7 moved the width into (stroke (width w) ...)
        let width = match sexp.child("stroke") {
            Some(stroke) if sexp.child("width").is_none() => Self::parse_length(stroke, "width")?,
            _ => Self::parse_length(sexp, "width")?,
        };
        Ok(Drawing {
            uuid: Self::record_uuid(sexp),
            start: Self::parse_xy(sexp, "start")?,
            end: Self::parse_xy(sexp, "end")?,
            width,
            layer,
        })
    }

    fn net_name(nets: &[NetDecl], code: u32) -> Option<String> {
        nets.iter().find(|n| n.code == code).map(|n| n.name.clone())
    }

    fn record_net(sexp: &SExp, nets: &[NetDecl]) -> String {
        sexp.value("net")
            .and_then(|s| s.parse().ok())
            .and_then(|code| Self::net_name(nets, code))
            .unwrap_or_default()
    }

    fn record_uuid(sexp: &SExp) -> String {
        sexp.value("uuid")
            .or_else(|| sexp.value("tstamp"))
            .unwrap_or("")
            .to_string()
    }

    fn parse_number(value: Option<&str>, field: &str) -> Result<f64, PcbParseError> {
        let value = value.ok_or_else(|| PcbParseError::MissingField(field.to_string()))?;
        value
            .parse()
            .map_err(|_| PcbParseError::InvalidFormat(format!("{} is not a number: {}", field, value)))
    }

    fn parse_length(sexp: &SExp, key: &str) -> Result<i64, PcbParseError> {
        let mm = Self::parse_number(sexp.value(key), key)?;
        Ok(crate::geometry::mm_to_nm(mm))
    }

    fn parse_xy(sexp: &SExp, key: &str) -> Result<Point, PcbParseError> {
        let list = sexp
            .child(key)
            .ok_or_else(|| PcbParseError::MissingField(key.to_string()))?;
        let x = Self::parse_number(list.atom_at(1), key)?;
        let y = Self::parse_number(list.atom_at(2), key)?;
        Ok(Point::from_mm(x, y))
    }

    /// `(at x y [angle])`; the angle is returned in tenths of a degree.
    fn parse_at(sexp: &SExp) -> Result<(Point, f64), PcbParseError> {
        let position = Self::parse_xy(sexp, "at")?;
        let angle = match sexp.child("at").and_then(|at| at.atom_at(3)) {
            Some(value) => Self::parse_number(Some(value), "at angle")? * 10.0,
            None => 0.0,
        };
        Ok((position, angle))
    }
}
