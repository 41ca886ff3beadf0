//! Board parameters.
//!
//! All lengths are millimetres, orientations are tenths of a degree.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::StudioClockError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockParams {
    /// Radius of the seconds ring.
    pub radius: f64,
    /// Hours ring radius as a multiple of `radius`.
    pub hours_radius_factor: f64,
    /// Side length of the square board outline.
    pub board_size: f64,

    pub digit_space: f64,
    pub digit_width: f64,
    pub digit_height: f64,
    /// `None` leaves the digit orientation untouched.
    pub digit_orientation: Option<f64>,
    /// Orientation of separators and connectors.
    pub fixed_orientation: f64,
    /// Separator distance from the origin, in digit heights.
    pub separator_offset: f64,
    /// Connector distance from the origin, in digit heights.
    pub connector_offset: f64,

    pub track_width: f64,
    pub via_size: f64,
    pub via_drill: f64,
    pub outline_width: f64,

    /// Multiplier applied to the per-net jog offsets.
    pub jog_scale: f64,
    /// x coordinate of the bus feeding the separator LEDs.
    pub separator_bus_x: f64,
    /// Distance of the bridge via above its digit pad.
    pub bridge_via_drop: f64,
    /// Distance of the connector escape via above the connector origin.
    pub connector_escape_drop: f64,
    /// Radial depth of the hour LED escape.
    pub hour_escape_depth: f64,

    /// Sink net routed as the sentinel (`Sink(-1)`).
    pub sentinel_net: String,
    /// Digit pads shared by all segments, left out of the digit bus.
    pub strip_common_pads: Vec<u32>,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            radius: 42.0,
            hours_radius_factor: 1.1,
            board_size: 100.0,
            digit_space: 3.0,
            digit_width: 10.0,
            digit_height: 10.0,
            digit_orientation: Some(2700.0),
            fixed_orientation: 2700.0,
            separator_offset: 0.4,
            connector_offset: 1.5,
            track_width: 0.3,
            via_size: 0.3,
            via_drill: 0.2,
            outline_width: 0.15,
            jog_scale: 1.4,
            separator_bus_x: 1.27,
            bridge_via_drop: 3.0,
            connector_escape_drop: 4.0,
            hour_escape_depth: 4.0,
            sentinel_net: "k15".to_string(),
            strip_common_pads: vec![3, 8],
        }
    }
}

impl ClockParams {
    /// Load parameters from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, StudioClockError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, StudioClockError> {
        serde_json::from_str(content).map_err(|e| StudioClockError::Config(e.to_string()))
    }

    pub fn seconds_radius(&self) -> f64 {
        self.radius
    }

    pub fn hours_radius(&self) -> f64 {
        self.radius * self.hours_radius_factor
    }

    /// Radius of the routing ring that carries sink net `number`.
    pub fn ring_radius_for_number(&self, number: i32) -> f64 {
        self.radius - 1.2 - (16 - number) as f64 * 0.75
    }

    /// Horizontal digit slot offsets in digit widths, left to right.
    pub fn digit_slots(&self) -> [f64; 4] {
        let gap = self.digit_space / self.digit_width;
        [-1.5 - gap * 2.0, -0.5 - gap, 0.5 + gap, 1.5 + gap * 2.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_radius_table() {
        let params = ClockParams::default();
        assert!((params.ring_radius_for_number(15) - 40.05).abs() < 1e-9);
        assert!((params.ring_radius_for_number(-1) - 28.05).abs() < 1e-9);
        assert!((params.ring_radius_for_number(-2) - 27.3).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params = ClockParams::from_json_str(r#"{ "radius": 40.0, "sentinel_net": "k7" }"#)
            .unwrap();
        assert_eq!(params.radius, 40.0);
        assert_eq!(params.sentinel_net, "k7");
        assert_eq!(params.board_size, 100.0);
        assert!((params.hours_radius() - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ClockParams::from_json_str("{ radius: }").unwrap_err();
        assert!(matches!(err, StudioClockError::Config(_)));
    }

    #[test]
    fn test_digit_slots_are_symmetric() {
        let slots = ClockParams::default().digit_slots();
        assert!((slots[0] + slots[3]).abs() < 1e-12);
        assert!((slots[1] + slots[2]).abs() < 1e-12);
        assert!((slots[0] + 2.1).abs() < 1e-12);
    }
}
