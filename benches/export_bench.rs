use criterion::{black_box, criterion_group, criterion_main, Criterion};

use markpress::markup::{render_markup, Extensions};
use markpress::sink::MemorySink;
use markpress::theme::MemoryThemeStore;
use markpress::{pdf, Rasterizer, Renderable, Workspace, WorkspaceConfig};

const SAMPLE: &str = "# Bench\n\nSome **bold** and *italic* text with `code`.\n\n\
- [x] one\n- [ ] two\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```\nfn main() {}\n```\n";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
}

fn bench_render_markup(c: &mut Criterion) {
    c.bench_function("render_markup", |b| {
        b.iter(|| render_markup(black_box(SAMPLE), Extensions::gfm()))
    });
}

fn bench_capture(c: &mut Criterion) {
    let rt = runtime();
    let mut ws = Workspace::new(WorkspaceConfig::default(), Box::new(MemoryThemeStore::new()), None);
    ws.edit(SAMPLE);
    let rasterizer = Rasterizer::new();

    c.bench_function("capture", |b| {
        b.iter(|| {
            // force a fresh layout each round
            ws.edit(SAMPLE);
            rt.block_on(rasterizer.capture(&ws.surface().capture_region_handle(), "#ffffff"))
                .unwrap()
        })
    });

    let snapshot = rt
        .block_on(rasterizer.capture(&ws.surface().capture_region_handle(), "#ffffff"))
        .unwrap();
    c.bench_function("assemble", |b| b.iter(|| pdf::assemble(black_box(&snapshot)).unwrap()));
}

fn bench_export(c: &mut Criterion) {
    let rt = runtime();
    let mut ws = Workspace::new(WorkspaceConfig::default(), Box::new(MemoryThemeStore::new()), None);
    ws.edit(SAMPLE);

    c.bench_function("export_end_to_end", |b| {
        b.iter(|| {
            let sink = MemorySink::new();
            rt.block_on(ws.export(&sink)).unwrap()
        })
    });
}

criterion_group!(benches, bench_render_markup, bench_capture, bench_export);
criterion_main!(benches);
