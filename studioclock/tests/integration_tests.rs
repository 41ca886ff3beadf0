//! Integration tests for a full layout session on the clock board

use std::path::PathBuf;

use studioclock::prelude::*;
use studioclock::{LayerMap, Point};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn laid_out() -> (KicadDocument, SessionReport) {
    let mut document =
        KicadDocument::load(&fixture_path("studio_clock.kicad_pcb")).expect("fixture should parse");
    let report = StudioClockCore::layout_document(&mut document, &ClockParams::default())
        .expect("layout should succeed");
    (document, report)
}

#[test]
fn test_layout_report() {
    let (_, report) = laid_out();

    assert_eq!(report.cleared_tracks, 2);
    assert_eq!(report.cleared_vias, 1);
    assert_eq!(report.cleared_drawings, 4, "only Edge.Cuts lines are cleared");
    assert_eq!(report.placed_elements, 80);
    assert_eq!(report.sink_nets, 16);
    assert_eq!(report.source_nets, 11);
    // four outline lines plus the untouched drawing on Dwgs.User
    assert_eq!(report.drawings, 5);
    assert!(report.tracks > 0);
    assert!(report.vias > 0);
}

#[test]
fn test_layout_places_catalogs() {
    let (document, _) = laid_out();
    let board = document.board();

    let position = |reference: &str| board.element(reference).map(|e| e.position);
    assert_eq!(position("D1"), Some(Point::from_mm(0.0, -42.0)));
    assert_eq!(position("D16"), Some(Point::from_mm(42.0, 0.0)));
    assert_eq!(position("D31"), Some(Point::from_mm(0.0, 42.0)));
    assert_eq!(position("U1"), Some(Point::from_mm(-21.0, 0.0)));
    assert_eq!(position("U4"), Some(Point::from_mm(21.0, 0.0)));
    assert_eq!(position("D73"), Some(Point::from_mm(0.0, -4.0)));
    assert_eq!(position("J2"), Some(Point::from_mm(0.0, 15.0)));

    let d61 = board.element("D61").expect("hour LED");
    assert!((d61.position.norm_mm() - 46.2).abs() < 1e-5);
    assert_eq!(board.element("U2").map(|e| e.rotation), Some(2700.0));
}

#[test]
fn test_layout_artifacts_are_consistent() {
    let (document, report) = laid_out();
    let board = document.board();
    let layers = [
        board.layers.id(LayerMap::FRONT_NAME),
        board.layers.id(LayerMap::BACK_NAME),
    ];

    assert_eq!(board.tracks.len(), report.tracks);
    assert_eq!(board.vias.len(), report.vias);
    for track in &board.tracks {
        assert!(layers.contains(&Some(track.layer)), "track on layer {}", track.layer);
        assert!(board.net_code(&track.net).is_some(), "undeclared net {}", track.net);
        assert_eq!(track.width, 300_000);
        assert!(!track.uuid.is_empty());
    }
    for via in &board.vias {
        assert!(board.net_code(&via.net).is_some(), "undeclared net {}", via.net);
        assert_eq!((via.size, via.drill), (300_000, 200_000));
    }
    // every net is already declared by the fixture
    assert_eq!(board.nets.len(), 28);
}

#[test]
fn test_layout_small_templates() {
    let (document, _) = laid_out();
    let board = document.board();
    let count = |net: &str| {
        (
            board.tracks.iter().filter(|t| t.net == net).count(),
            board.vias.iter().filter(|v| v.net == net).count(),
        )
    };

    assert_eq!(count("a11"), (2, 1), "dogleg");
    assert_eq!(count("a21"), (2, 1), "dogleg");
    assert_eq!(count("a50"), (3, 1), "bridge");
    assert_eq!(count("a61"), (3, 1), "bridge");
}

#[test]
fn test_every_sink_net_gets_a_ring() {
    let (document, _) = laid_out();
    let board = document.board();
    let back = board.layers.id(LayerMap::BACK_NAME);

    for number in 0..16 {
        let net = format!("k{}", number);
        let back_tracks = board
            .tracks
            .iter()
            .filter(|t| t.net == net && Some(t.layer) == back)
            .count();
        assert!(back_tracks >= 61, "{} has {} back tracks", net, back_tracks);
    }
}

#[test]
fn test_seconds_leds_drop_onto_their_own_slot() {
    let (document, _) = laid_out();
    let board = document.board();
    let params = ClockParams::default();

    for index in 1..=60u32 {
        let number = ((index - 1) % 15) as i32;
        let net = format!("k{}", number);
        let radius = params.ring_radius_for_number(number);
        let corner =
            studioclock::geometry::point_on_circle(radius, (index - 1) as f64).unwrap();
        assert!(
            board.vias.iter().any(|v| v.net == net && v.position == corner),
            "D{} has no via at {} on {}",
            index,
            corner,
            net
        );
    }
}

#[test]
fn test_layout_is_deterministic() {
    let (first, first_report) = laid_out();
    let (second, second_report) = laid_out();

    assert_eq!(first_report, second_report);
    assert_eq!(first.to_string_pretty(), second.to_string_pretty());
}

#[test]
fn test_second_run_reproduces_the_first() {
    let (first, first_report) = laid_out();

    let mut again = KicadDocument::parse_str(&first.to_string_pretty()).expect("output should parse");
    let report = StudioClockCore::layout_document(&mut again, &ClockParams::default())
        .expect("second layout should succeed");

    assert_eq!(report.cleared_tracks, first_report.tracks);
    assert_eq!(report.cleared_vias, first_report.vias);
    assert_eq!(report.tracks, first_report.tracks);
    assert_eq!(again.board().tracks, first.board().tracks);
    assert_eq!(again.board().vias, first.board().vias);
}

#[test]
fn test_failed_layout_keeps_document() {
    let path = fixture_path("studio_clock.kicad_pcb");
    let mut document = KicadDocument::load(&path).expect("fixture should parse");
    let before = document.board().clone();

    let params = ClockParams {
        strip_common_pads: vec![],
        ..ClockParams::default()
    };
    let err = StudioClockCore::layout_document(&mut document, &params).unwrap_err();

    assert!(matches!(err, StudioClockError::Session(_)), "got {:?}", err);
    assert_eq!(document.board(), &before);
}

#[test]
fn test_layout_pcb_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("routed.kicad_pcb");
    let options = LayoutOptions {
        output: Some(output.clone()),
        ..LayoutOptions::default()
    };

    let result =
        StudioClockCore::layout_pcb(&fixture_path("studio_clock.kicad_pcb"), &options).unwrap();
    assert_eq!(result.output.as_deref(), Some(output.as_path()));

    let saved = std::fs::read_to_string(&output).unwrap();
    assert!(saved.starts_with("(kicad_pcb"));
    assert!(saved.contains("(layer Dwgs.User)"));
    assert_eq!(saved.matches("(segment ").count(), result.report.tracks);
    assert_eq!(saved.matches("(via ").count(), result.report.vias);

    let reloaded = studioclock::load_board(&output).unwrap();
    assert_eq!(reloaded.tracks.len(), result.report.tracks);
}

#[test]
fn test_dry_run_does_not_save() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clock.kicad_pcb");
    std::fs::copy(fixture_path("studio_clock.kicad_pcb"), &input).unwrap();
    let original = std::fs::read_to_string(&input).unwrap();

    let options = LayoutOptions {
        dry_run: true,
        ..LayoutOptions::default()
    };
    let result = StudioClockCore::layout_pcb(&input, &options).unwrap();

    assert!(result.output.is_none());
    assert_eq!(std::fs::read_to_string(&input).unwrap(), original);
}
