//! Integration tests for graph scheduling, render queue bucketing and
//! catalog identity management.

mod common;

use rstest::rstest;

use common::{config, engine, populate_scene, ExecutionLog, RecordingPass};
use glam::{Mat4, Vec3};
use render_graph_engine::backend::{AlphaState, HeadlessBackend, ResourceKind};
use render_graph_engine::pipeline::ScreenPass;
use render_graph_engine::render_graph::{AttachmentHints, GraphDescription, GraphError};
use render_graph_engine::render_queue::Renderable;
use render_graph_engine::resources::{
    Assets, GraphicsResource, Material, MaterialId, Primitive, PrimitiveId, ShaderProgram,
};
use render_graph_engine::scene::GeometryId;
use render_graph_engine::{
    CatalogRenderer, RenderGraph, RenderPreset, RenderQueue, RenderableType, Renderer,
};

// ============================================================================
// Scheduling
// ============================================================================

#[rstest]
#[case::producer_first(false)]
#[case::consumer_first(true)]
fn test_producer_runs_before_consumer(#[case] consumer_first: bool) {
    let log = ExecutionLog::default();
    let mut graph = RenderGraph::new();
    let shared = graph.create_attachment("shared", AttachmentHints::FORMAT_RGBA);
    let result = graph.create_attachment("result", AttachmentHints::FORMAT_RGBA);

    let p1 = RecordingPass::new("p1", &[], &[shared], &log);
    let p2 = RecordingPass::new("p2", &[shared], &[result], &log);
    if consumer_first {
        graph.add_pass(p2).unwrap();
        graph.add_pass(p1).unwrap();
    } else {
        graph.add_pass(p1).unwrap();
        graph.add_pass(p2).unwrap();
    }

    let mut engine = engine(config(RenderPreset::Forward));
    engine.set_graph(graph).unwrap();
    engine.render_frame().unwrap();

    assert_eq!(*log.lock(), vec!["p1".to_string(), "p2".to_string()]);
}

#[test]
fn test_reciprocal_write_fails_compilation() {
    let log = ExecutionLog::default();
    let mut graph = RenderGraph::new();
    let a = graph.create_attachment("a", AttachmentHints::FORMAT_RGBA);
    let b = graph.create_attachment("b", AttachmentHints::FORMAT_RGBA);
    graph.add_pass(RecordingPass::new("p1", &[], &[a], &log)).unwrap();
    graph.add_pass(RecordingPass::new("p2", &[a], &[b], &log)).unwrap();
    assert!(graph.compile().is_ok());

    // p2 now also writes what p1 reads
    let c = graph.create_attachment("c", AttachmentHints::FORMAT_RGBA);
    graph.add_pass(RecordingPass::new("p1 feedback", &[c], &[a], &log)).unwrap();
    graph.add_pass(RecordingPass::new("p2 feedback", &[b], &[c], &log)).unwrap();

    match graph.compile() {
        Err(GraphError::CyclicDependency { passes }) => {
            assert!(passes.contains(&"p1 feedback".to_string()));
            assert!(passes.contains(&"p2 feedback".to_string()));
        }
        other => panic!("expected a cycle, got {:?}", other.map(|c| c.pass_count())),
    }
}

#[test]
fn test_failing_pass_stops_later_passes() {
    let log = ExecutionLog::default();
    let mut graph = RenderGraph::new();
    let a = graph.create_attachment("a", AttachmentHints::FORMAT_RGBA);
    let b = graph.create_attachment("b", AttachmentHints::FORMAT_RGBA);
    let c = graph.create_attachment("c", AttachmentHints::FORMAT_RGBA);
    graph.add_pass(RecordingPass::new("first", &[], &[a], &log)).unwrap();
    graph.add_pass(RecordingPass::new("broken", &[a], &[b], &log).failing()).unwrap();
    graph.add_pass(RecordingPass::new("last", &[b], &[c], &log)).unwrap();

    let mut engine = engine(config(RenderPreset::Forward));
    engine.set_graph(graph).unwrap();

    let err = engine.render_frame().unwrap_err();
    assert_eq!(err.failed_pass(), Some("broken"));
    assert_eq!(*log.lock(), vec!["first".to_string(), "broken".to_string()]);

    // Same plan is retried on the next frame
    log.lock().clear();
    assert!(engine.render_frame().is_err());
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_screen_pass_writes_one_frame_buffer() {
    let mut graph = RenderGraph::new();
    let depth = graph.create_attachment("Depth", AttachmentHints::FORMAT_DEPTH);
    let color = graph.create_attachment("Color", AttachmentHints::FORMAT_RGBA);
    let pass = graph.add_pass(ScreenPass::new(depth, color)).unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.frame_buffer_count(), 1);
    assert_eq!(compiled.frame_buffer_of(pass), Some(0));
    assert_eq!(compiled.frame_buffers()[0].attachments, vec![depth, color]);

    let mut renderer = CatalogRenderer::new(HeadlessBackend::new(64, 64));
    let queue = RenderQueue::new();
    let assets = Assets::with_builtins();
    graph.execute(&mut renderer, &queue, &assets).unwrap();

    let fbo = graph.frame_buffer(pass).unwrap();
    assert!(fbo.depth().is_some());
    assert_eq!(fbo.colors().len(), 1);
    assert_eq!(renderer.backend().live_count(ResourceKind::FrameBuffer), 1);
}

#[test]
fn test_description_graph_renders() {
    let source = include_str!("../demos/graphs/forward.ron");
    let graph = GraphDescription::from_ron(source).unwrap().build().unwrap();

    let mut engine = engine(config(RenderPreset::Deferred));
    populate_scene(&mut engine);
    engine.set_graph(graph).unwrap();
    let stats = engine.render_frame().unwrap();

    assert_eq!(stats.passes, 6);
    // opaque, translucent, screen, blend 2 inputs, vignette, present
    assert_eq!(engine.renderer().backend().draw_count(), 7);
}

// ============================================================================
// Render queue
// ============================================================================

struct QueueFixture {
    assets: Assets,
    queue: RenderQueue,
    plain: Material,
    blended: Material,
}

fn queue_fixture() -> QueueFixture {
    QueueFixture {
        assets: Assets::new(),
        queue: RenderQueue::new(),
        plain: Material::plastic(Vec3::ONE),
        blended: Material::glass(),
    }
}

fn renderable(material: MaterialId, primitive: PrimitiveId, geometry: u32) -> Renderable {
    Renderable {
        material,
        primitive,
        geometry: GeometryId(geometry),
        world: Mat4::from_translation(Vec3::new(geometry as f32, 0.0, 0.0)),
    }
}

#[rstest]
#[case::one(1)]
#[case::many(5)]
fn test_screen_pushes_only_fill_screen_bucket(#[case] pushes: u32) {
    let QueueFixture { mut assets, mut queue, plain, blended } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let plain = assets.add_material(plain);
    let blended = assets.add_material(blended);

    for geometry in 0..pushes {
        let material = if geometry % 2 == 0 { plain } else { blended };
        queue.push(&assets, renderable(material, primitive, geometry), true);
    }

    assert_eq!(queue.count(RenderableType::Screen), pushes as usize);
    assert_eq!(queue.count(RenderableType::Opaque), 0);
    assert_eq!(queue.count(RenderableType::Translucent), 0);
}

#[test]
fn test_blended_material_is_never_opaque() {
    let QueueFixture { mut assets, mut queue, blended, .. } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let custom = assets.add_program(ShaderProgram::new("custom", "vs", "fs"));
    let blended = assets.add_material(blended);
    let programmed = assets.add_material(Material::new("custom").with_program(custom));
    assert!(Material::new("m").with_alpha_state(AlphaState::ENABLED).is_translucent());

    assert_eq!(
        queue.push(&assets, renderable(blended, primitive, 0), false),
        Some(RenderableType::Translucent)
    );
    assert_eq!(
        queue.push(&assets, renderable(programmed, primitive, 1), false),
        Some(RenderableType::Translucent)
    );
    assert_eq!(queue.count(RenderableType::Opaque), 0);
}

#[test]
fn test_buckets_keep_their_geometry() {
    let QueueFixture { mut assets, mut queue, plain, blended } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let plain = assets.add_material(plain);
    let blended = assets.add_material(blended);

    queue.push(&assets, renderable(plain, primitive, 1), false);
    queue.push(&assets, renderable(blended, primitive, 2), false);

    let mut opaque = Vec::new();
    queue.each_renderable(RenderableType::Opaque, |r| opaque.push(r.geometry));
    let mut translucent = Vec::new();
    queue.each_renderable(RenderableType::Translucent, |r| translucent.push(r.geometry));

    assert_eq!(opaque, vec![GeometryId(1)]);
    assert_eq!(translucent, vec![GeometryId(2)]);
}

#[test]
fn test_reset_empties_every_bucket() {
    let QueueFixture { mut assets, mut queue, plain, blended } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let plain = assets.add_material(plain);
    let blended = assets.add_material(blended);
    queue.push(&assets, renderable(plain, primitive, 0), false);
    queue.push(&assets, renderable(blended, primitive, 1), false);
    queue.push(&assets, renderable(plain, primitive, 2), true);

    queue.reset();

    let mut visited = 0;
    for kind in RenderableType::ALL {
        queue.each(kind, |_, _| visited += 1);
    }
    assert_eq!(visited, 0);
    assert_eq!(queue.view_matrix(), Mat4::IDENTITY);
}

#[test]
fn test_duplicate_pushes_are_kept() {
    let QueueFixture { mut assets, mut queue, plain, .. } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let material = assets.add_material(plain);

    queue.push(&assets, renderable(material, primitive, 7), false);
    queue.push(&assets, renderable(material, primitive, 7), false);

    assert_eq!(queue.count(RenderableType::Opaque), 2);
    assert_eq!(queue.renderables(RenderableType::Opaque).len(), 1);
}

#[test]
fn test_each_mut_iterates_a_snapshot() {
    let QueueFixture { mut assets, mut queue, plain, .. } = queue_fixture();
    let primitive = assets.add_primitive(Primitive::cube());
    let first = assets.add_material(plain.clone());
    let second = assets.add_material(plain);
    queue.push(&assets, renderable(first, primitive, 0), false);

    let mut visited = 0;
    queue.each_mut(RenderableType::Opaque, |live, _, _| {
        visited += 1;
        live.push(&assets, renderable(second, primitive, 1), false);
    });

    assert_eq!(visited, 1);
    assert_eq!(queue.count(RenderableType::Opaque), 2);
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_bind_allocates_one_identity() {
    let mut renderer = CatalogRenderer::new(HeadlessBackend::new(64, 64));
    let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();

    renderer.bind_program(Some(&program)).unwrap();
    renderer.bind_program(Some(&program)).unwrap();
    renderer.unbind_program(Some(&program));
    renderer.bind_program(Some(&program)).unwrap();

    let stats = renderer.catalog_stats(ResourceKind::Program);
    assert_eq!(stats.allocated_total, 1);
    assert_eq!(stats.resident, 1);
    assert_eq!(renderer.backend().live_count(ResourceKind::Program), 1);
}

#[test]
fn test_unload_then_cleanup_deletes_identity() {
    let mut renderer = CatalogRenderer::new(HeadlessBackend::new(64, 64));
    let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();
    renderer.bind_program(Some(&program)).unwrap();
    let id = renderer
        .catalogs()
        .get(ResourceKind::Program)
        .catalog_id(&program)
        .unwrap();

    renderer.unbind_program(Some(&program));
    renderer.unload_program(Some(&program));
    assert_eq!(renderer.catalog_stats(ResourceKind::Program).pending_deletion, 1);
    assert!(renderer.backend().is_live(ResourceKind::Program, id));

    renderer.cleanup();
    assert_eq!(renderer.catalog_stats(ResourceKind::Program).pending_deletion, 0);
    assert!(!renderer.backend().is_live(ResourceKind::Program, id));

    // The program survives and gets a fresh identity
    renderer.bind_program(Some(&program)).unwrap();
    let rebound = renderer
        .catalogs()
        .get(ResourceKind::Program)
        .catalog_id(&program)
        .unwrap();
    assert_ne!(rebound, id);
    assert_eq!(renderer.state().program, Some(program.key()));
}

#[test]
fn test_none_resources_are_ignored() {
    let mut renderer = CatalogRenderer::new(HeadlessBackend::new(64, 64));
    renderer.bind_program(None).unwrap();
    renderer.bind_frame_buffer(None).unwrap();
    renderer.unload_texture(None);
    renderer.unload_primitive(None);
    renderer.cleanup();

    assert!(renderer.backend().commands().is_empty());
}
