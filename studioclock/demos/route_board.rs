//! Route a board and print what each net received.

use std::collections::BTreeMap;
use std::path::Path;

use studioclock::prelude::*;

fn main() -> Result<(), StudioClockError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/studio_clock.kicad_pcb".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example route_board [path/to/file.kicad_pcb]");
        std::process::exit(1);
    }

    let mut document = KicadDocument::load(path)?;
    let report = StudioClockCore::layout_document(&mut document, &ClockParams::default())?;

    println!("Layout of: {}", path.display());
    println!(
        "{} elements placed, {} tracks and {} vias routed",
        report.placed_elements, report.tracks, report.vias
    );
    println!();

    let mut per_net: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    let board = document.board();
    for track in &board.tracks {
        per_net.entry(track.net.as_str()).or_default().0 += 1;
    }
    for via in &board.vias {
        per_net.entry(via.net.as_str()).or_default().1 += 1;
    }
    for (net, (tracks, vias)) in per_net {
        println!("  {:<4} {:>4} tracks {:>3} vias", net, tracks, vias);
    }

    Ok(())
}
