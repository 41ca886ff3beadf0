//! Element catalogs and net discovery.
//!
//! Which reference designators belong to which catalog is data: see
//! [`CATALOG`]. Net kinds are decided once from the net name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::board::{Board, RefId};
use crate::config::ClockParams;
use crate::session::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// 60 LEDs, one per minute.
    Seconds,
    /// 12 LEDs, one per hour.
    Hours,
    /// 4 seven-segment digits in a row.
    Digit,
    /// 2 separator LEDs between the digit pairs.
    Separator,
    /// 2 connectors on the vertical axis.
    Connector,
}

impl Category {
    pub fn is_ring(self) -> bool {
        matches!(self, Category::Seconds | Category::Hours)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Seconds => "seconds",
            Category::Hours => "hours",
            Category::Digit => "digit",
            Category::Separator => "separator",
            Category::Connector => "connector",
        };
        f.write_str(name)
    }
}

/// Contiguous band of reference indices forming one catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogRange {
    pub category: Category,
    pub code: &'static str,
    pub first: u32,
    pub last: u32,
}

impl CatalogRange {
    pub fn contains(&self, id: &RefId) -> bool {
        id.code == self.code && (self.first..=self.last).contains(&id.index)
    }

    /// 0-based slot of `id` within this catalog.
    pub fn slot(&self, id: &RefId) -> u32 {
        id.index - self.first
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

pub const CATALOG: &[CatalogRange] = &[
    CatalogRange { category: Category::Seconds, code: "D", first: 1, last: 60 },
    CatalogRange { category: Category::Hours, code: "D", first: 61, last: 72 },
    CatalogRange { category: Category::Digit, code: "U", first: 1, last: 4 },
    CatalogRange { category: Category::Separator, code: "D", first: 73, last: 74 },
    CatalogRange { category: Category::Connector, code: "J", first: 1, last: 2 },
];

/// Ring slot spacing of the hours catalog.
pub const HOUR_SLOT_STRIDE: u32 = 5;

/// Hour LEDs whose escape ends without a via on the net ring.
pub const HOURS_WITHOUT_RING_VIA: &[u32] = &[61, 71, 72];

pub fn catalog_range(category: Category) -> &'static CatalogRange {
    CATALOG
        .iter()
        .find(|range| range.category == category)
        .unwrap_or(&CATALOG[0])
}

pub fn category_of(id: &RefId) -> Option<Category> {
    CATALOG
        .iter()
        .find(|range| range.contains(id))
        .map(|range| range.category)
}

/// Element indices into [`Board::elements`], grouped per catalog in
/// catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    pub seconds: Vec<usize>,
    pub hours: Vec<usize>,
    pub digits: Vec<usize>,
    pub separators: Vec<usize>,
    pub connectors: Vec<usize>,
}

impl Catalogs {
    /// Collect every catalog; each member must be present on the board.
    pub fn discover(board: &Board) -> Result<Self, SessionError> {
        let catalogs = Self::collect(board);
        for range in CATALOG {
            let found = catalogs.get(range.category);
            if found.len() == range.len() {
                continue;
            }
            let missing = (range.first..=range.last)
                .map(|index| RefId::new(range.code, index))
                .find(|id| {
                    !found
                        .iter()
                        .any(|&e| board.elements[e].id.as_ref() == Some(id))
                });
            return Err(SessionError::MissingElement(
                missing.map(|id| id.to_string()).unwrap_or_else(|| range.code.to_string()),
            ));
        }
        Ok(catalogs)
    }

    /// Collect whatever catalog members the board has.
    pub fn collect(board: &Board) -> Self {
        let mut catalogs = Catalogs::default();
        let mut ordered: Vec<(&RefId, usize)> = board
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.id.as_ref().map(|id| (id, i)))
            .collect();
        ordered.sort();
        for (id, index) in ordered {
            if let Some(category) = category_of(id) {
                catalogs.get_mut(category).push(index);
            }
        }
        catalogs
    }

    pub fn get(&self, category: Category) -> &[usize] {
        match category {
            Category::Seconds => &self.seconds,
            Category::Hours => &self.hours,
            Category::Digit => &self.digits,
            Category::Separator => &self.separators,
            Category::Connector => &self.connectors,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<usize> {
        match category {
            Category::Seconds => &mut self.seconds,
            Category::Hours => &mut self.hours,
            Category::Digit => &mut self.digits,
            Category::Separator => &mut self.separators,
            Category::Connector => &mut self.connectors,
        }
    }

    pub fn len(&self) -> usize {
        CATALOG.iter().map(|r| self.get(r.category).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Electrical role of a net, decided from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetKind {
    /// `k`-prefixed. `-1` is the sentinel.
    Sink(i32),
    /// `a`-prefixed.
    Source(i32),
}

impl NetKind {
    pub const SENTINEL: i32 = -1;

    /// Classify a net name; `None` for nets this engine does not route.
    pub fn classify(name: &str, sentinel: &str) -> Option<NetKind> {
        if name == sentinel {
            return Some(NetKind::Sink(Self::SENTINEL));
        }
        let (prefix, digits) = name.split_at(name.char_indices().nth(1)?.0);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;
        match prefix {
            "k" => Some(NetKind::Sink(number)),
            "a" => Some(NetKind::Source(number)),
            _ => None,
        }
    }

    pub fn number(self) -> i32 {
        match self {
            NetKind::Sink(n) | NetKind::Source(n) => n,
        }
    }
}

/// One connection point of a net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Index into [`Board::elements`].
    pub element: usize,
    /// Index into the element's pads.
    pub pad: usize,
    pub category: Option<Category>,
    pub reference: Option<RefId>,
}

/// Named electrical group with members in element discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    pub kind: NetKind,
    pub members: Vec<Member>,
}

impl Net {
    pub fn members_in(&self, category: Category) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(move |m| m.category == Some(category))
    }

    pub fn ring_members(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.category.is_some_and(Category::is_ring))
    }

    /// Sink nets get a routing ring only when something lands on it.
    pub fn has_ring(&self) -> bool {
        self.members.iter().any(|m| {
            matches!(
                m.category,
                Some(Category::Seconds | Category::Hours | Category::Connector)
            )
        })
    }
}

/// Sink and source nets, each sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetGroups {
    pub sink: Vec<Net>,
    pub source: Vec<Net>,
}

impl NetGroups {
    /// Group every pad of every element by net name.
    ///
    /// Elements are scanned in reference order, pads in document order.
    pub fn discover(board: &Board, params: &ClockParams) -> Self {
        let mut order: Vec<usize> = (0..board.elements.len()).collect();
        order.sort_by(|&a, &b| {
            let ea = &board.elements[a];
            let eb = &board.elements[b];
            ea.id
                .cmp(&eb.id)
                .then_with(|| ea.reference.cmp(&eb.reference))
        });

        let mut grouped: BTreeMap<&str, Vec<Member>> = BTreeMap::new();
        for element_index in order {
            let element = &board.elements[element_index];
            for (pad_index, pad) in element.pads.iter().enumerate() {
                let Some(net) = pad.net.as_deref().filter(|n| !n.is_empty()) else {
                    continue;
                };
                grouped.entry(net).or_default().push(Member {
                    element: element_index,
                    pad: pad_index,
                    category: element.id.as_ref().and_then(category_of),
                    reference: element.id.clone(),
                });
            }
        }

        let mut groups = NetGroups::default();
        for (name, members) in grouped {
            match NetKind::classify(name, &params.sentinel_net) {
                Some(kind @ NetKind::Sink(_)) => groups.sink.push(Net {
                    name: name.to_string(),
                    kind,
                    members,
                }),
                Some(kind @ NetKind::Source(_)) => groups.source.push(Net {
                    name: name.to_string(),
                    kind,
                    members,
                }),
                None => tracing::debug!("Net {} is not a clock net, skipping", name),
            }
        }
        groups
    }

    pub fn sink(&self, name: &str) -> Option<&Net> {
        self.sink.iter().find(|n| n.name == name)
    }

    pub fn source(&self, name: &str) -> Option<&Net> {
        self.source.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Element, Pad};
    use crate::geometry::Point;

    #[test]
    fn test_category_table() {
        assert_eq!(category_of(&RefId::new("D", 1)), Some(Category::Seconds));
        assert_eq!(category_of(&RefId::new("D", 60)), Some(Category::Seconds));
        assert_eq!(category_of(&RefId::new("D", 61)), Some(Category::Hours));
        assert_eq!(category_of(&RefId::new("D", 74)), Some(Category::Separator));
        assert_eq!(category_of(&RefId::new("D", 75)), None);
        assert_eq!(category_of(&RefId::new("U", 4)), Some(Category::Digit));
        assert_eq!(category_of(&RefId::new("J", 2)), Some(Category::Connector));
        assert_eq!(category_of(&RefId::new("R", 1)), None);
    }

    #[test]
    fn test_classify_net_names() {
        assert_eq!(NetKind::classify("k3", "k15"), Some(NetKind::Sink(3)));
        assert_eq!(NetKind::classify("k15", "k15"), Some(NetKind::Sink(-1)));
        assert_eq!(NetKind::classify("a61", "k15"), Some(NetKind::Source(61)));
        assert_eq!(NetKind::classify("GND", "k15"), None);
        assert_eq!(NetKind::classify("k", "k15"), None);
        assert_eq!(NetKind::classify("a1b", "k15"), None);
        assert_eq!(NetKind::classify("", "k15"), None);
    }

    #[test]
    fn test_discover_reports_first_missing_member() {
        let mut board = Board::default();
        board.elements.push(Element::new("D1", Point::ORIGIN, vec![]));
        let err = Catalogs::discover(&board).unwrap_err();
        assert!(matches!(err, SessionError::MissingElement(ref r) if r == "D2"));
    }

    #[test]
    fn test_nets_follow_reference_order() {
        let mut board = Board::default();
        for reference in ["J1", "D10", "D2"] {
            board.elements.push(Element::new(
                reference,
                Point::ORIGIN,
                vec![
                    Pad::new("1", Point::ORIGIN, Some("k0")),
                    Pad::new("2", Point::ORIGIN, Some("GND")),
                    Pad::new("3", Point::ORIGIN, None),
                ],
            ));
        }
        let groups = NetGroups::discover(&board, &ClockParams::default());
        assert!(groups.source.is_empty());
        let k0 = groups.sink("k0").unwrap();
        let refs: Vec<String> = k0
            .members
            .iter()
            .map(|m| m.reference.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(refs, ["D2", "D10", "J1"]);
        assert!(k0.has_ring());
        assert_eq!(k0.members_in(Category::Connector).count(), 1);
    }
}
