//! # Headless Frame
//!
//! Renders a small scene through the headless backend and logs what each
//! frame did. Useful for checking a graph preset or a RON graph description
//! without a GPU.
//!
//! ```text
//! cargo run --example headless_frame -- --preset deferred --frames 3 render.tonemap=true
//! cargo run --example headless_frame -- --graph demos/graphs/forward.ron
//! ```

use std::path::PathBuf;

use clap::Parser;
use glam::{Vec3, Vec4};
use render_graph_engine::backend::{HeadlessBackend, ResourceKind};
use render_graph_engine::resources::{Material, Primitive};
use render_graph_engine::scene::{Camera, DirectionalLight, GeometryNode, Light, PointLight, Transform};
use render_graph_engine::{Engine, EngineConfig, GraphDescription, RenderPreset, Settings};

/// Graph preset selection for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliPreset {
    #[default]
    Forward,
    Deferred,
}

impl From<CliPreset> for RenderPreset {
    fn from(cli: CliPreset) -> Self {
        match cli {
            CliPreset::Forward => RenderPreset::Forward,
            CliPreset::Deferred => RenderPreset::Deferred,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "headless_frame", about = "Render frames through the headless backend")]
struct Args {
    /// Graph preset, ignored when --graph is given
    #[arg(long, value_enum)]
    preset: Option<CliPreset>,

    /// RON graph description to render with
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Number of frames to render
    #[arg(long, default_value_t = 2)]
    frames: u64,

    /// Resize to WIDTHxHEIGHT after the first frame
    #[arg(long)]
    resize: Option<String>,

    /// Extra `key=value` settings, e.g. video.width=640
    settings: Vec<String>,
}

fn parse_size(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn setup_scene(engine: &mut Engine<render_graph_engine::CatalogRenderer<HeadlessBackend>>) {
    log::info!("Setting up scene...");
    let (width, height) = (engine.config().width, engine.config().height);

    let assets = engine.assets_mut();
    let cube = assets.add_primitive(Primitive::cube());
    let sphere = assets.add_primitive(Primitive::sphere(16, 8));
    let red = assets.add_material(Material::plastic(Vec3::new(0.8, 0.1, 0.1)));
    let glass = assets.add_material(Material::glass());
    let hud = assets.add_material(Material::new("hud").with_diffuse(Vec4::new(1.0, 1.0, 1.0, 1.0)));

    let scene = engine.scene_mut();
    let mut camera = Camera::new(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO);
    camera.set_aspect(width as f32, height as f32);
    scene.add_camera(camera);

    scene.add_light(Light::Directional(DirectionalLight::default()));
    scene.add_light(Light::Point(PointLight {
        position: Vec3::new(2.0, 3.0, 1.0),
        color: Vec3::new(1.0, 0.9, 0.7),
        ..Default::default()
    }));

    scene.add_geometry(GeometryNode::new("cube", cube, red));
    scene.add_geometry(
        GeometryNode::new("glass sphere", sphere, glass)
            .with_transform(Transform::from_position(Vec3::new(2.0, 0.0, 0.0))),
    );
    scene.add_geometry(
        GeometryNode::new("crosshair", cube, hud)
            .with_transform(Transform::from_position_scale(Vec3::ZERO, Vec3::splat(0.05)))
            .on_screen(),
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    render_graph_engine::init_logging();
    let args = Args::parse();

    let settings = Settings::from_args(&args.settings);
    let mut config = EngineConfig::from_settings(&settings);
    if let Some(preset) = args.preset {
        config.preset = preset.into();
    }

    let backend = HeadlessBackend::new(config.width, config.height);
    let mut engine = Engine::with_backend(backend, config)?;

    if let Some(path) = &args.graph {
        let source = std::fs::read_to_string(path)?;
        let graph = GraphDescription::from_ron(&source)?.build()?;
        log::info!("Using graph from {}", path.display());
        engine.set_graph(graph)?;
    }

    setup_scene(&mut engine);

    let resize = args.resize.as_deref().and_then(parse_size);
    for frame in 0..args.frames {
        let stats = engine.render_frame()?;
        log::info!(
            "Frame {}: {} opaque, {} translucent, {} screen, {} lights, {} passes, {} released",
            stats.frame,
            stats.opaque,
            stats.translucent,
            stats.screen,
            stats.lights,
            stats.passes,
            stats.released
        );

        if frame == 0 {
            if let Some((width, height)) = resize {
                engine.resize(width, height);
            }
        }
    }

    let backend = engine.renderer().backend();
    log::info!("Draw calls issued: {}", backend.draw_count());
    for kind in ResourceKind::ALL {
        log::info!("Live {}: {}", kind.label(), backend.live_count(kind));
    }

    engine.shutdown();
    Ok(())
}
