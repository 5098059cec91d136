//! Shared fixtures for the engine integration tests.
//!
//! Every engine here draws through a [`HeadlessBackend`], so tests can
//! inspect the recorded command stream and inject backend failures.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use parking_lot::Mutex;
use render_graph_engine::backend::HeadlessBackend;
use render_graph_engine::render_graph::{
    AttachmentId, PassContext, PassSetup, RenderGraphPass,
};
use render_graph_engine::resources::{Material, Primitive};
use render_graph_engine::scene::{Camera, GeometryNode, Light, PointLight, Transform};
use render_graph_engine::{CatalogRenderer, Engine, EngineConfig, RenderPreset, RenderResult};

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 240;

pub type TestEngine = Engine<CatalogRenderer<HeadlessBackend>>;

// ============================================================================
// Engine construction
// ============================================================================

pub fn config(preset: RenderPreset) -> EngineConfig {
    EngineConfig {
        width: WIDTH,
        height: HEIGHT,
        preset,
        ..Default::default()
    }
}

pub fn engine(config: EngineConfig) -> TestEngine {
    let backend = HeadlessBackend::new(config.width, config.height);
    Engine::with_backend(backend, config).unwrap()
}

/// Content added by [`populate_scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneCounts {
    pub opaque: usize,
    pub translucent: usize,
    pub screen: usize,
    pub lights: usize,
}

/// One lit cube, one glass sphere, one HUD quad and two point lights
pub fn populate_scene(engine: &mut TestEngine) -> SceneCounts {
    let assets = engine.assets_mut();
    let cube = assets.add_primitive(Primitive::cube());
    let sphere = assets.add_primitive(Primitive::sphere(8, 4));
    let plastic = assets.add_material(Material::plastic(Vec3::new(0.2, 0.6, 0.2)));
    let glass = assets.add_material(Material::glass());
    let hud = assets.add_material(Material::new("hud").with_diffuse(Vec4::ONE));

    let scene = engine.scene_mut();
    scene.add_camera(Camera::new(Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO));
    for x in [-2.0, 2.0] {
        scene.add_light(Light::Point(PointLight {
            position: Vec3::new(x, 3.0, 0.0),
            ..Default::default()
        }));
    }
    scene.add_geometry(GeometryNode::new("cube", cube, plastic));
    scene.add_geometry(
        GeometryNode::new("sphere", sphere, glass)
            .with_transform(Transform::from_position(Vec3::new(1.5, 0.0, 0.0))),
    );
    scene.add_geometry(GeometryNode::new("hud", cube, hud).on_screen());

    SceneCounts {
        opaque: 1,
        translucent: 1,
        screen: 1,
        lights: 2,
    }
}

// ============================================================================
// Recording passes
// ============================================================================

/// Shared log of executed pass names
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// Pass that only declares attachments and records when it runs
pub struct RecordingPass {
    pub name: String,
    pub reads: Vec<AttachmentId>,
    pub writes: Vec<AttachmentId>,
    pub log: ExecutionLog,
    pub fail: bool,
}

impl RecordingPass {
    pub fn new(name: &str, reads: &[AttachmentId], writes: &[AttachmentId], log: &ExecutionLog) -> Self {
        Self {
            name: name.to_string(),
            reads: reads.to_vec(),
            writes: writes.to_vec(),
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl RenderGraphPass for RecordingPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read_all(&self.reads);
        setup.write_all(&self.writes);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        self.log.lock().push(self.name.clone());
        if self.fail {
            return Err(render_graph_engine::RenderError::MissingAsset(format!(
                "{} input",
                self.name
            )));
        }
        let fbo = ctx.frame_buffer();
        ctx.renderer.bind_frame_buffer(fbo)?;
        ctx.renderer.unbind_frame_buffer(fbo);
        Ok(())
    }
}
