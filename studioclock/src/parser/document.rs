//! Round trip between a `.kicad_pcb` file and a [`Board`].
//!
//! The document keeps the parsed tree so that everything the board does
//! not model (setup, zones, texts, footprint graphics) is written back
//! untouched.

use std::path::Path;

use crate::board::{Board, Element};
use crate::geometry::{Point, NM_PER_MM};
use crate::parser::pcb::{PcbParseError, PcbParser, ARTIFACT_TAGS};
use crate::parser::sexp::SExp;

#[derive(Debug, Clone)]
pub struct KicadDocument {
    root: SExp,
    board: Board,
}

impl KicadDocument {
    pub fn load(path: &Path) -> Result<Self, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::parse_str(&content)?;
        tracing::info!("Loaded {}", path.display());
        Ok(document)
    }

    pub fn parse_str(content: &str) -> Result<Self, PcbParseError> {
        let root = PcbParser::parse_root(content)?;
        let board = PcbParser::board_from_root(&root)?;
        Ok(Self { root, board })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Current board rendered into the original tree.
    pub fn to_sexp(&self) -> SExp {
        let mut root = self.root.clone();
        let Some(items) = root.as_list_mut() else {
            return root;
        };

        items.retain(|item| !item.tag().is_some_and(|tag| ARTIFACT_TAGS.contains(&tag)));

        let known: Vec<u32> = items
            .iter()
            .filter(|item| item.tag() == Some("net"))
            .filter_map(|item| item.atom_at(1).and_then(|c| c.parse().ok()))
            .collect();
        let mut insert_at = items
            .iter()
            .rposition(|item| item.tag() == Some("net"))
            .map(|i| i + 1)
            .unwrap_or(items.len());
        for net in self.board.nets.iter().filter(|n| !known.contains(&n.code)) {
            items.insert(
                insert_at,
                SExp::list("net", [SExp::atom(net.code.to_string()), SExp::atom(net.name.as_str())]),
            );
            insert_at += 1;
        }

        let footprints = items
            .iter_mut()
            .filter(|item| matches!(item.tag(), Some("module" | "footprint")));
        for (item, element) in footprints.zip(&self.board.elements) {
            update_footprint(item, element);
        }

        for drawing in &self.board.drawings {
            items.push(record(
                "gr_line",
                vec![
                    xy("start", drawing.start),
                    xy("end", drawing.end),
                    SExp::list("layer", [SExp::atom(self.layer_name(drawing.layer))]),
                    SExp::list("width", [SExp::atom(format_nm(drawing.width))]),
                ],
                &drawing.uuid,
            ));
        }
        for track in &self.board.tracks {
            items.push(record(
                "segment",
                vec![
                    xy("start", track.start),
                    xy("end", track.end),
                    SExp::list("width", [SExp::atom(format_nm(track.width))]),
                    SExp::list("layer", [SExp::atom(self.layer_name(track.layer))]),
                    SExp::list("net", [SExp::atom(self.net_code(&track.net))]),
                ],
                &track.uuid,
            ));
        }
        for via in &self.board.vias {
            let layers = [
                crate::board::LayerMap::FRONT_NAME,
                crate::board::LayerMap::BACK_NAME,
            ];
            items.push(record(
                "via",
                vec![
                    xy("at", via.position),
                    SExp::list("size", [SExp::atom(format_nm(via.size))]),
                    SExp::list("drill", [SExp::atom(format_nm(via.drill))]),
                    SExp::list("layers", layers.map(SExp::atom)),
                    SExp::list("net", [SExp::atom(self.net_code(&via.net))]),
                ],
                &via.uuid,
            ));
        }
        root
    }

    pub fn to_string_pretty(&self) -> String {
        let mut text = self.to_sexp().to_pretty();
        text.push('\n');
        text
    }

    pub fn save(&self, path: &Path) -> Result<(), PcbParseError> {
        std::fs::write(path, self.to_string_pretty())?;
        tracing::info!("Saved {}", path.display());
        Ok(())
    }

    fn layer_name(&self, layer: u32) -> String {
        self.board
            .layers
            .name(layer)
            .map(str::to_string)
            .unwrap_or_else(|| layer.to_string())
    }

    fn net_code(&self, net: &str) -> String {
        self.board.net_code(net).unwrap_or(0).to_string()
    }
}

fn update_footprint(item: &mut SExp, element: &Element) {
    let Some(children) = item.as_list_mut() else {
        return;
    };
    for child in children.iter_mut() {
        if child.tag() == Some("at") {
            *child = at(element.position, element.rotation);
        }
    }
    let pads = children.iter_mut().filter(|c| c.tag() == Some("pad"));
    for (pad_item, pad) in pads.zip(&element.pads) {
        let angle = if pad.orientation == 0.0 && element.rotation == 0.0 {
            0.0
        } else {
            pad.orientation + element.rotation
        };
        if let Some(slot) = pad_item.child_mut("at") {
            *slot = at(pad.offset, angle);
        }
    }
}

fn xy(tag: &str, point: Point) -> SExp {
    SExp::list(tag, [SExp::atom(format_nm(point.x)), SExp::atom(format_nm(point.y))])
}

fn at(point: Point, tenths: f64) -> SExp {
    let mut node = xy("at", point);
    if tenths != 0.0 {
        if let Some(items) = node.as_list_mut() {
            items.push(SExp::atom(format_angle(tenths)));
        }
    }
    node
}

fn record(tag: &str, mut fields: Vec<SExp>, uuid: &str) -> SExp {
    if !uuid.is_empty() {
        fields.push(SExp::list("tstamp", [SExp::atom(uuid)]));
    }
    SExp::list(tag, fields)
}

/// Millimetre text for a nanometre value, without trailing zeros.
pub fn format_nm(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let nm_per_mm = NM_PER_MM as u64;
    let whole = abs / nm_per_mm;
    let fraction = abs % nm_per_mm;
    if fraction == 0 {
        return format!("{}{}", sign, whole);
    }
    let digits = format!("{:06}", fraction);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

/// Degrees text for an angle in tenths of a degree.
pub fn format_angle(tenths: f64) -> String {
    let text = format!("{:.4}", tenths / 10.0);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb (version 20171130)
  (layers (0 F.Cu signal) (31 B.Cu signal) (44 Edge.Cuts user))
  (net 0 "")
  (net 1 k0)
  (module LED (layer F.Cu) (at 1 1)
    (fp_text reference D1 (at 0 -1.5) (layer F.SilkS))
    (pad 1 smd rect (at -0.8 0) (size 0.8 0.8) (layers F.Cu) (net 1 k0)))
  (gr_text Clock (at 0 0) (layer F.SilkS))
  (segment (start 1 2) (end 3 4) (width 0.25) (layer B.Cu) (net 1))
)"#;

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_nm(1_270_000), "1.27");
        assert_eq!(format_nm(-42_000_000), "-42");
        assert_eq!(format_nm(-500), "-0.0005");
        assert_eq!(format_nm(0), "0");
        assert_eq!(format_angle(-2700.0), "-270");
        assert_eq!(format_angle(15.0), "1.5");
        assert_eq!(format_angle(-0.00001), "0");
    }

    #[test]
    fn test_write_back_replaces_artifacts() {
        let mut document = KicadDocument::parse_str(BOARD).unwrap();
        {
            let board = document.board_mut();
            board.tracks.clear();
            board.elements[0].place(Point::from_mm(0.0, -42.0), -2700.0);
            board.ensure_net("a0");
        }
        let text = document.to_sexp().to_string();

        assert!(!text.contains("(segment"));
        assert!(text.contains("(gr_text Clock"));
        assert!(text.contains("(at 0 -42 -270)"));
        assert!(text.contains("(pad 1 smd rect (at -0.8 0 -270)"));
        assert!(text.contains("(net 1 k0) (net 2 a0)"));
    }

    #[test]
    fn test_round_trip_keeps_board() {
        let document = KicadDocument::parse_str(BOARD).unwrap();
        let reloaded = KicadDocument::parse_str(&document.to_string_pretty()).unwrap();
        assert_eq!(reloaded.board().elements, document.board().elements);
        assert_eq!(reloaded.board().tracks.len(), 1);
        assert_eq!(reloaded.board().tracks[0].start, Point::from_mm(1.0, 2.0));
        assert_eq!(reloaded.board().nets, document.board().nets);
    }
}
