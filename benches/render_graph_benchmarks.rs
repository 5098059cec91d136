use criterion::{black_box, criterion_group, criterion_main, Criterion};

use render_graph_engine::backend::HeadlessBackend;
use render_graph_engine::pipeline::{build_deferred_graph, build_forward_graph, BlendPass, PostEffect};
use render_graph_engine::render_graph::AttachmentHints;
use render_graph_engine::render_queue::RenderQueue;
use render_graph_engine::resources::Assets;
use render_graph_engine::{CatalogRenderer, GraphDescription, RenderGraph};

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn bench_compile_forward(c: &mut Criterion) {
    let mut graph = build_forward_graph(&[PostEffect::tonemap(), PostEffect::vignette()]).unwrap();
    c.bench_function("compile_forward", |b| {
        b.iter(|| {
            graph.invalidate();
            black_box(graph.compile().unwrap().pass_count())
        });
    });
}

fn bench_compile_deferred(c: &mut Criterion) {
    let mut graph = build_deferred_graph(&[PostEffect::tonemap()]).unwrap();
    c.bench_function("compile_deferred", |b| {
        b.iter(|| {
            graph.invalidate();
            black_box(graph.compile().unwrap().pass_count())
        });
    });
}

/// Chain of blend passes, declared last to first
fn reversed_chain(length: usize) -> RenderGraph {
    let mut graph = RenderGraph::new();
    let attachments: Vec<_> = (0..=length)
        .map(|i| graph.create_attachment(&format!("chain {}", i), AttachmentHints::FORMAT_RGBA))
        .collect();
    for i in (0..length).rev() {
        graph
            .add_pass(BlendPass::new(&[attachments[i]], attachments[i + 1]))
            .unwrap();
    }
    graph.add_pass(BlendPass::new(&[], attachments[0])).unwrap();
    graph
}

fn bench_compile_chain(c: &mut Criterion) {
    let mut graph = reversed_chain(256);
    c.bench_function("compile_chain_256", |b| {
        b.iter(|| {
            graph.invalidate();
            black_box(graph.compile().unwrap().storage_slot_count())
        });
    });
}

// ---------------------------------------------------------------------------
// Construction and execution
// ---------------------------------------------------------------------------

fn bench_build_from_ron(c: &mut Criterion) {
    let source = include_str!("../demos/graphs/forward.ron");
    c.bench_function("build_forward_from_ron", |b| {
        b.iter(|| {
            let description = GraphDescription::from_ron(black_box(source)).unwrap();
            black_box(description.build().unwrap().pass_count())
        });
    });
}

fn bench_execute_forward_empty(c: &mut Criterion) {
    let mut graph = build_forward_graph(&[]).unwrap();
    let mut renderer = CatalogRenderer::new(HeadlessBackend::new(1280, 720).without_recording());
    let queue = RenderQueue::new();
    let assets = Assets::with_builtins();
    c.bench_function("execute_forward_empty", |b| {
        b.iter(|| graph.execute(&mut renderer, &queue, &assets).unwrap());
    });
}

criterion_group!(
    compile,
    bench_compile_forward,
    bench_compile_deferred,
    bench_compile_chain,
);

criterion_group!(execution, bench_build_from_ron, bench_execute_forward_empty);

criterion_main!(compile, execution);
