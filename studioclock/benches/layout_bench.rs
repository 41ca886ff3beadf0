use criterion::{black_box, criterion_group, criterion_main, Criterion};
use studioclock::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_layout_session(c: &mut Criterion) {
    let document = KicadDocument::load(&fixture_path("studio_clock.kicad_pcb"))
        .expect("fixture should parse");
    let params = ClockParams::default();

    c.bench_function("layout_session", |b| {
        b.iter(|| {
            let mut document = document.clone();
            StudioClockCore::layout_document(black_box(&mut document), black_box(&params))
        });
    });
}

fn bench_parse_pcb(c: &mut Criterion) {
    c.bench_function("parse_pcb", |b| {
        b.iter(|| studioclock::load_board(black_box(&fixture_path("studio_clock.kicad_pcb"))));
    });
}

criterion_group!(benches, bench_layout_session, bench_parse_pcb);
criterion_main!(benches);
