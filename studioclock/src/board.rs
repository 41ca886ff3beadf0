//! Layout surface data model.
//!
//! The [`Board`] owns every element, track, via and outline line of one
//! design. Elements and their pads come from the host document; tracks,
//! vias and outline lines are produced by a layout session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::geometry::Point;

/// Host layer identifier (KiCad layer ordinal).
pub type LayerId = u32;

/// One of the two conductive planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Front,
    Back,
}

/// Layer name to identifier lookup, as declared by the host document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerTable {
    by_name: BTreeMap<String, LayerId>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: LayerId, name: impl Into<String>) {
        self.by_name.insert(name.into(), id);
    }

    pub fn id(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: LayerId) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, &layer)| layer == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<(LayerId, &'static str)> for LayerTable {
    fn from_iter<I: IntoIterator<Item = (LayerId, &'static str)>>(iter: I) -> Self {
        let mut table = LayerTable::new();
        for (id, name) in iter {
            table.insert(id, name);
        }
        table
    }
}

/// Layer identifiers a session writes to, resolved once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMap {
    pub front: LayerId,
    pub back: LayerId,
    pub outline: LayerId,
}

impl LayerMap {
    pub const FRONT_NAME: &'static str = "F.Cu";
    pub const BACK_NAME: &'static str = "B.Cu";
    pub const OUTLINE_NAME: &'static str = "Edge.Cuts";

    pub fn id(&self, layer: Layer) -> LayerId {
        match layer {
            Layer::Front => self.front,
            Layer::Back => self.back,
        }
    }
}

/// Typed reference designator: alphabetic code plus 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefId {
    pub code: String,
    pub index: u32,
}

impl RefId {
    pub fn new(code: impl Into<String>, index: u32) -> Self {
        Self {
            code: code.into(),
            index,
        }
    }
}

impl FromStr for RefId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| format!("reference '{}' has no index", s))?;
        let (code, digits) = s.split_at(split);
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic() || c == '/') {
            return Err(format!("reference '{}' has no alphabetic code", s));
        }
        let index = digits
            .parse()
            .map_err(|_| format!("reference '{}' has a malformed index", s))?;
        Ok(RefId::new(code, index))
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.code, self.index)
    }
}

/// Connection point of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub name: String,
    /// Offset from the element origin, unrotated.
    pub offset: Point,
    /// Pad orientation relative to its element, tenths of a degree.
    pub orientation: f64,
    pub net: Option<String>,
}

impl Pad {
    pub fn new(name: impl Into<String>, offset: Point, net: Option<&str>) -> Self {
        Self {
            name: name.into(),
            offset,
            orientation: 0.0,
            net: net.map(str::to_string),
        }
    }

    /// Integer pad name, when it has one.
    pub fn number(&self) -> Option<u32> {
        self.name.parse().ok()
    }
}

/// Placed object on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub reference: String,
    /// Parsed reference, `None` for designators like `REF**`.
    pub id: Option<RefId>,
    pub position: Point,
    /// Tenths of a degree.
    pub rotation: f64,
    pub pads: Vec<Pad>,
}

impl Element {
    pub fn new(reference: impl Into<String>, position: Point, pads: Vec<Pad>) -> Self {
        let reference = reference.into();
        let id = reference.parse().ok();
        Self {
            reference,
            id,
            position,
            rotation: 0.0,
            pads,
        }
    }

    /// Absolute position of pad `index`.
    pub fn pad_position(&self, index: usize) -> Option<Point> {
        self.pads
            .get(index)
            .map(|pad| self.position + pad.offset.rotated(self.rotation))
    }

    pub fn place(&mut self, position: Point, rotation: f64) {
        self.position = position;
        self.rotation = rotation;
    }
}

/// Net declaration of the host document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDecl {
    pub code: u32,
    pub name: String,
}

/// Straight conductor segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub uuid: String,
    pub start: Point,
    pub end: Point,
    /// Nanometres.
    pub width: i64,
    pub layer: LayerId,
    pub net: String,
}

/// Through via between the two conductive planes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub uuid: String,
    pub position: Point,
    /// Nanometres.
    pub size: i64,
    /// Nanometres.
    pub drill: i64,
    pub net: String,
}

/// Graphic line on a non-conductive layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub uuid: String,
    pub start: Point,
    pub end: Point,
    pub width: i64,
    pub layer: LayerId,
}

/// Counts of records removed by [`Board::clear_artifacts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleared {
    pub tracks: usize,
    pub vias: usize,
    pub drawings: usize,
}

/// Layout surface of one design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub layers: LayerTable,
    pub nets: Vec<NetDecl>,
    pub elements: Vec<Element>,
    pub tracks: Vec<Track>,
    pub vias: Vec<Via>,
    pub drawings: Vec<Drawing>,
}

impl Board {
    pub fn new(layers: LayerTable) -> Self {
        Self {
            layers,
            ..Default::default()
        }
    }

    pub fn element(&self, reference: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.reference == reference)
    }

    pub fn net_code(&self, name: &str) -> Option<u32> {
        self.nets.iter().find(|n| n.name == name).map(|n| n.code)
    }

    /// Declare a net if the document does not know it yet.
    pub fn ensure_net(&mut self, name: &str) -> u32 {
        if let Some(code) = self.net_code(name) {
            return code;
        }
        let code = self.nets.iter().map(|n| n.code).max().unwrap_or(0) + 1;
        self.nets.push(NetDecl {
            code,
            name: name.to_string(),
        });
        code
    }

    /// Remove prior tracks, vias and outline lines. Elements are untouched.
    pub fn clear_artifacts(&mut self, outline: LayerId) -> Cleared {
        let drawings_before = self.drawings.len();
        self.drawings.retain(|d| d.layer != outline);
        let cleared = Cleared {
            tracks: self.tracks.len(),
            vias: self.vias.len(),
            drawings: drawings_before - self.drawings.len(),
        };
        self.tracks.clear();
        self.vias.clear();
        cleared
    }

    pub fn add_track(&mut self, mut track: Track) {
        if track.uuid.is_empty() {
            track.uuid = artifact_uuid("segment", self.tracks.len());
        }
        self.tracks.push(track);
    }

    pub fn add_via(&mut self, mut via: Via) {
        if via.uuid.is_empty() {
            via.uuid = artifact_uuid("via", self.vias.len());
        }
        self.vias.push(via);
    }

    pub fn add_drawing(&mut self, mut drawing: Drawing) {
        if drawing.uuid.is_empty() {
            drawing.uuid = artifact_uuid("gr_line", self.drawings.len());
        }
        self.drawings.push(drawing);
    }
}

/// Name-based UUID so identical runs produce identical documents.
fn artifact_uuid(kind: &str, index: usize) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("studioclock/{}/{}", kind, index).as_bytes())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let id: RefId = "D37".parse().unwrap();
        assert_eq!(id, RefId::new("D", 37));
        assert!("REF**".parse::<RefId>().is_err());
        assert!("12".parse::<RefId>().is_err());
        assert_eq!(RefId::new("U", 4).to_string(), "U4");
    }

    #[test]
    fn test_pad_follows_element_rotation() {
        let mut element = Element::new(
            "D1",
            Point::from_mm(10.0, 0.0),
            vec![Pad::new("1", Point::from_mm(1.0, 0.0), Some("k0"))],
        );
        assert_eq!(element.pad_position(0), Some(Point::from_mm(11.0, 0.0)));
        element.place(Point::from_mm(0.0, 5.0), 900.0);
        assert_eq!(element.pad_position(0), Some(Point::from_mm(0.0, 4.0)));
        assert_eq!(element.pad_position(1), None);
    }

    #[test]
    fn test_clear_keeps_elements_and_other_drawings() {
        let mut board = Board::new([(0, "F.Cu"), (31, "B.Cu"), (44, "Edge.Cuts"), (40, "Dwgs.User")]
            .into_iter()
            .collect());
        board.elements.push(Element::new("D1", Point::ORIGIN, vec![]));
        board.add_track(Track {
            uuid: String::new(),
            start: Point::ORIGIN,
            end: Point::from_mm(1.0, 0.0),
            width: 300_000,
            layer: 0,
            net: "k0".to_string(),
        });
        for layer in [44, 40] {
            board.add_drawing(Drawing {
                uuid: String::new(),
                start: Point::ORIGIN,
                end: Point::from_mm(0.0, 1.0),
                width: 150_000,
                layer,
            });
        }

        let cleared = board.clear_artifacts(44);
        assert_eq!(cleared, Cleared { tracks: 1, vias: 0, drawings: 1 });
        assert_eq!(board.elements.len(), 1);
        assert_eq!(board.drawings.len(), 1);
        assert_eq!(board.drawings[0].layer, 40);
    }

    #[test]
    fn test_generated_uuids_are_stable() {
        assert_eq!(artifact_uuid("via", 3), artifact_uuid("via", 3));
        assert_ne!(artifact_uuid("via", 3), artifact_uuid("segment", 3));
    }

    #[test]
    fn test_layer_table_lookup() {
        let table: LayerTable = [(0, "F.Cu"), (31, "B.Cu")].into_iter().collect();
        assert_eq!(table.id("B.Cu"), Some(31));
        assert_eq!(table.name(0), Some("F.Cu"));
        assert_eq!(table.id("In1.Cu"), None);
    }
}
