//! Main engine orchestrator
//!
//! One frame is: run deferred tasks, rebuild the render queue from the
//! scene, execute the render graph, then flush released GPU identities.
//! Everything runs on the calling thread; only task submission is shared.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::types::{ClearValue, ResourceKind};
use crate::backend::GraphicsBackend;
use crate::config::{EngineConfig, RenderPreset};
use crate::error::RenderResult;
use crate::pipeline::{build_deferred_graph, build_forward_graph};
use crate::render_graph::RenderGraph;
use crate::render_queue::{RenderQueue, RenderableType};
use crate::renderer::{CatalogRenderer, Renderer};
use crate::resources::Assets;
use crate::scene::Scene;

/// Work deferred to the start of the next frame
pub type FrameTask = Box<dyn FnOnce(&mut Scene, &mut Assets) + Send>;

/// Shared handle for queueing [`FrameTask`]s, possibly from other threads
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Arc<Mutex<Vec<FrameTask>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&self, task: F)
    where
        F: FnOnce(&mut Scene, &mut Assets) + Send + 'static,
    {
        self.tasks.lock().push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    fn drain(&self) -> Vec<FrameTask> {
        std::mem::take(&mut *self.tasks.lock())
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("pending", &self.len()).finish()
    }
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub tasks_run: usize,
    pub opaque: usize,
    pub translucent: usize,
    pub screen: usize,
    pub lights: usize,
    pub passes: usize,
    /// Identities deleted by the end of frame cleanup
    pub released: usize,
}

/// Owns everything needed to render frames with one renderer
pub struct Engine<R: Renderer> {
    renderer: R,
    graph: RenderGraph,
    queue: RenderQueue,
    assets: Assets,
    scene: Scene,
    config: EngineConfig,
    tasks: TaskQueue,
    frame: u64,
}

impl<B: GraphicsBackend> Engine<CatalogRenderer<B>> {
    /// Create an engine drawing through a [`CatalogRenderer`] over `backend`
    pub fn with_backend(backend: B, config: EngineConfig) -> RenderResult<Self> {
        let mut renderer = CatalogRenderer::new(backend);
        renderer.set_clear_value(ClearValue {
            color: config.clear_color,
            ..Default::default()
        });
        Self::new(renderer, config)
    }
}

impl<R: Renderer> Engine<R> {
    /// Create an engine with the graph preset named by `config`
    pub fn new(renderer: R, config: EngineConfig) -> RenderResult<Self> {
        let effects = config.post_effects();
        let graph = match config.preset {
            RenderPreset::Forward => build_forward_graph(&effects)?,
            RenderPreset::Deferred => build_deferred_graph(&effects)?,
        };
        Self::with_graph(renderer, config, graph)
    }

    /// Create an engine around an already built graph.
    ///
    /// The graph is compiled here, so configuration errors such as cycles
    /// surface before any frame runs.
    pub fn with_graph(mut renderer: R, config: EngineConfig, mut graph: RenderGraph) -> RenderResult<Self> {
        graph.compile()?;
        if renderer.screen_size() != (config.width, config.height) {
            renderer.resize(config.width, config.height);
        }
        log::info!(
            "Engine initialized: {} renderer, {}x{}, {:?} preset, {} passes",
            renderer.name(),
            config.width,
            config.height,
            config.preset,
            graph.pass_count()
        );

        Ok(Self {
            renderer,
            graph,
            queue: RenderQueue::new(),
            assets: Assets::with_builtins(),
            scene: Scene::new(),
            config,
            tasks: TaskQueue::new(),
            frame: 0,
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RenderGraph {
        &mut self.graph
    }

    /// Swap the render graph, releasing the storage of the old one.
    ///
    /// A graph that fails to compile is rejected and the current one stays.
    pub fn set_graph(&mut self, mut graph: RenderGraph) -> RenderResult<()> {
        graph.compile()?;
        self.graph.release(&mut self.renderer);
        self.graph = graph;
        Ok(())
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of frames rendered, failed ones included
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Handle for queueing frame tasks from elsewhere
    pub fn tasks(&self) -> TaskQueue {
        self.tasks.clone()
    }

    /// Run `task` at the start of the next frame
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce(&mut Scene, &mut Assets) + Send + 'static,
    {
        self.tasks.push(task);
    }

    /// Handle screen resize. The graph reallocates on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize to {}x{}", width, height);
            return;
        }
        if self.renderer.screen_size() == (width, height) {
            return;
        }

        self.renderer.resize(width, height);
        self.config.width = width;
        self.config.height = height;
        for camera in self.scene.cameras_mut() {
            camera.set_aspect(width as f32, height as f32);
        }
    }

    /// Render one frame.
    ///
    /// A failing pass aborts the rest of the frame and its error is
    /// returned. Released identities are cleaned up either way, so the next
    /// frame starts from a consistent state.
    pub fn render_frame(&mut self) -> RenderResult<FrameStats> {
        let tasks = self.tasks.drain();
        let tasks_run = tasks.len();
        for task in tasks {
            task(&mut self.scene, &mut self.assets);
        }

        self.queue.reset();
        self.scene
            .collect_render_queue(self.scene.main_camera(), &self.assets, &mut self.queue);

        let result = self
            .graph
            .execute(&mut self.renderer, &self.queue, &self.assets);

        let released = ResourceKind::ALL
            .iter()
            .map(|kind| self.renderer.catalog_stats(*kind).pending_deletion)
            .sum();
        self.renderer.cleanup();

        let stats = FrameStats {
            frame: self.frame,
            tasks_run,
            opaque: self.queue.count(RenderableType::Opaque),
            translucent: self.queue.count(RenderableType::Translucent),
            screen: self.queue.count(RenderableType::Screen),
            lights: self.queue.lights().len(),
            passes: self.graph.pass_count(),
            released,
        };
        self.frame += 1;

        result?;
        log::trace!("Frame {} rendered: {:?}", stats.frame, stats);
        Ok(stats)
    }

    /// Release graph storage and flush every pending deletion
    pub fn shutdown(&mut self) {
        self.graph.release(&mut self.renderer);
        self.renderer.cleanup();
        log::info!("Engine shut down after {} frames", self.frame);
    }
}
