//! Render Graph Engine - the rendering core of a small real-time engine
//!
//! Frames are described as a render graph: passes declare the attachments
//! they read and write, the graph orders them, groups attachments into frame
//! buffers and shares backing storage between attachments that are never
//! alive at the same time.
//!
//! # Features
//! - Resource catalogs mapping CPU-side resources to backend identities, with
//!   deferred deletion at a well-defined point between frames
//! - Per-frame render queue bucketing renderables into opaque, translucent
//!   and screen-space draws
//! - Forward and deferred graph presets with blend, post effect and present
//!   passes
//! - Graph descriptions loadable from RON
//! - A recording headless backend for tests and tooling

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod render_queue;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use backend::{GraphicsBackend, HeadlessBackend};
pub use config::{EngineConfig, RenderPreset, Settings};
pub use engine::{Engine, FrameStats, TaskQueue};
pub use error::{RenderError, RenderResult};
pub use render_graph::{GraphDescription, GraphError, RenderGraph, RenderGraphPass};
pub use render_queue::{RenderQueue, RenderableType};
pub use renderer::{CatalogRenderer, Renderer};

/// Install `env_logger`, reading `RUST_LOG` and defaulting to `info`.
///
/// Calling it more than once is harmless.
#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
