//! Render graph definition and execution

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use crate::render_graph::attachment::*;
use crate::render_graph::compiler::{self, CompiledGraph, GraphError};
use crate::render_graph::pass::*;
use crate::render_queue::RenderQueue;
use crate::renderer::Renderer;
use crate::resources::{Assets, FrameBufferObject, Texture};

/// Lifecycle of a [`RenderGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Declarations changed since the last compilation
    Building,
    /// Compiled, not executed yet
    Compiled,
    /// Executed at least once with the current plan
    Executing,
}

/// Backing storage allocated for one compiled plan at one screen size
struct FrameResources {
    generation: u64,
    screen_size: (u32, u32),
    textures: Vec<Arc<Texture>>,
    frame_buffers: Vec<FrameBufferObject>,
}

/// The main render graph structure
///
/// Passes declare the attachments they read and write; the graph orders
/// them, allocates shared storage and runs them every frame. Any change
/// to the declarations or to the screen size recompiles the plan before
/// the next execution.
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderGraphPass>>,
    pass_nodes: Vec<PassNode>,
    attachments: Vec<Attachment>,
    output: Option<AttachmentId>,
    compiled: Option<CompiledGraph>,
    generation: u64,
    executed: bool,
    frame: Option<FrameResources>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            pass_nodes: Vec::new(),
            attachments: Vec::new(),
            output: None,
            compiled: None,
            generation: 0,
            executed: false,
            frame: None,
        }
    }

    /// Declare a screen sized attachment
    pub fn create_attachment(&mut self, name: &str, hints: AttachmentHints) -> AttachmentId {
        self.create_attachment_with_size(name, hints, SizePolicy::default())
    }

    pub fn create_attachment_with_size(
        &mut self,
        name: &str,
        hints: AttachmentHints,
        size: SizePolicy,
    ) -> AttachmentId {
        let id = AttachmentId(self.attachments.len() as u32);
        self.attachments.push(Attachment::new(id, name, hints, size));
        self.invalidate();
        id
    }

    /// Add a render pass to the graph, running its setup
    pub fn add_pass<P: RenderGraphPass + 'static>(&mut self, pass: P) -> Result<PassId, GraphError> {
        let id = PassId(self.passes.len() as u32);
        let name = pass.name().to_string();
        let mut boxed_pass = Box::new(pass);

        let mut setup = PassSetup::default();
        boxed_pass.setup(&mut setup);

        for attachment in setup.reads.iter().chain(setup.writes.iter()) {
            if attachment.index() >= self.attachments.len() {
                return Err(GraphError::UnknownAttachment(*attachment));
            }
        }
        if let Some(conflict) = setup.reads.iter().find(|a| setup.writes.contains(a)) {
            return Err(GraphError::ReadWriteConflict {
                pass: name,
                attachment: self.attachments[conflict.index()].name().to_string(),
            });
        }

        if let Some((first, rest)) = setup.writes.split_first() {
            let first = &self.attachments[first.index()];
            if let Some(other) = rest
                .iter()
                .map(|a| &self.attachments[a.index()])
                .find(|a| a.size() != first.size())
            {
                return Err(GraphError::MismatchedSizes {
                    pass: name,
                    first: first.name().to_string(),
                    other: other.name().to_string(),
                });
            }
        }

        for attachment in &setup.reads {
            self.attachments[attachment.index()].consumers.push(id);
        }
        for attachment in &setup.writes {
            self.attachments[attachment.index()].producers.push(id);
        }

        log::debug!(
            "Added pass '{}' ({} reads, {} writes)",
            name,
            setup.reads.len(),
            setup.writes.len()
        );

        self.passes.push(boxed_pass);
        self.pass_nodes.push(PassNode {
            id,
            name,
            reads: setup.reads,
            writes: setup.writes,
            presents: setup.presents,
        });
        self.invalidate();

        Ok(id)
    }

    /// Mark the attachment presenting passes read and which stays alive
    /// until the end of the frame
    pub fn set_output(&mut self, attachment: AttachmentId) -> Result<(), GraphError> {
        if attachment.index() >= self.attachments.len() {
            return Err(GraphError::UnknownAttachment(attachment));
        }
        self.output = Some(attachment);
        self.invalidate();
        Ok(())
    }

    pub fn output(&self) -> Option<AttachmentId> {
        self.output
    }

    pub fn attachment(&self, id: AttachmentId) -> Option<&Attachment> {
        self.attachments.get(id.index())
    }

    pub fn attachment_by_name(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name() == name)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Get pass nodes (metadata)
    pub fn pass_nodes(&self) -> &[PassNode] {
        &self.pass_nodes
    }

    pub fn pass_node(&self, id: PassId) -> Option<&PassNode> {
        self.pass_nodes.get(id.index())
    }

    pub fn pass_by_name(&self, name: &str) -> Option<PassId> {
        self.pass_nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn state(&self) -> GraphState {
        match (&self.compiled, self.executed) {
            (None, _) => GraphState::Building,
            (Some(_), false) => GraphState::Compiled,
            (Some(_), true) => GraphState::Executing,
        }
    }

    /// Compile the graph - topological sort and storage planning
    pub fn compile(&mut self) -> Result<&CompiledGraph, GraphError> {
        let compiled = self.build_plan()?;
        let compiled: &CompiledGraph = self.compiled.insert(compiled);
        Ok(compiled)
    }

    fn build_plan(&mut self) -> Result<CompiledGraph, GraphError> {
        let compiled = compiler::compile(&self.pass_nodes, &self.attachments, self.output)?;
        log::info!(
            "Compiled render graph: {} passes, {} frame buffers, {} storage slots",
            compiled.pass_count(),
            compiled.frame_buffer_count(),
            compiled.storage_slot_count()
        );
        self.generation += 1;
        self.executed = false;
        Ok(compiled)
    }

    pub fn compiled(&self) -> Option<&CompiledGraph> {
        self.compiled.as_ref()
    }

    /// Drop the compiled plan; the next execution recompiles
    pub fn invalidate(&mut self) {
        self.compiled = None;
        self.executed = false;
    }

    /// Backing texture of an attachment for the current plan
    pub fn texture(&self, attachment: AttachmentId) -> Option<&Arc<Texture>> {
        self.attachment(attachment)?.texture()
    }

    /// Frame buffer a pass renders into for the current plan
    pub fn frame_buffer(&self, pass: PassId) -> Option<&FrameBufferObject> {
        let index = self.compiled.as_ref()?.frame_buffer_of(pass)?;
        self.frame.as_ref()?.frame_buffers.get(index)
    }

    /// Run every pass once, in compiled order.
    ///
    /// Compiles on first use or after any change. A screen size different
    /// from the last execution recompiles and reallocates storage. The first
    /// failing pass aborts the frame; later passes don't run.
    pub fn execute(
        &mut self,
        renderer: &mut dyn Renderer,
        queue: &RenderQueue,
        assets: &Assets,
    ) -> RenderResult<()> {
        let screen_size = renderer.screen_size();
        if let Some(frame) = &self.frame {
            if frame.screen_size != screen_size && self.compiled.is_some() {
                log::info!(
                    "Screen resized from {:?} to {:?}, recompiling render graph",
                    frame.screen_size,
                    screen_size
                );
                self.invalidate();
            }
        }

        let compiled = match self.compiled.take() {
            Some(compiled) => compiled,
            None => self.build_plan()?,
        };

        self.prepare_storage(&compiled, renderer, screen_size);
        let result = self.run_passes(&compiled, renderer, queue, assets);

        self.compiled = Some(compiled);
        self.executed = true;
        result
    }

    fn prepare_storage(
        &mut self,
        compiled: &CompiledGraph,
        renderer: &mut dyn Renderer,
        screen_size: (u32, u32),
    ) {
        if let Some(frame) = &self.frame {
            if frame.generation == self.generation && frame.screen_size == screen_size {
                return;
            }
        }
        self.release_storage(renderer);

        let (width, height) = screen_size;
        let textures: Vec<Arc<Texture>> = compiled
            .storage_slots()
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let (w, h) = slot.size.resolve(width, height);
                let name = format!("render graph slot {}", index);
                Arc::new(Texture::render_target(&name, w, h, slot.format))
            })
            .collect();

        for (attachment, slot) in compiled.attachment_storage() {
            self.attachments[attachment.index()].texture = textures.get(slot).cloned();
        }

        let frame_buffers = compiled
            .frame_buffers()
            .iter()
            .map(|group| {
                let names: Vec<&str> = group
                    .attachments
                    .iter()
                    .map(|a| self.attachments[a.index()].name())
                    .collect();
                // Every attachment of a group shares one size policy
                let (w, h) = group
                    .attachments
                    .first()
                    .map(|a| self.attachments[a.index()].size().resolve(width, height))
                    .unwrap_or(screen_size);

                let mut fbo = FrameBufferObject::new(&names.join("+"), w, h);
                for attachment in &group.attachments {
                    if let Some(texture) = self.attachments[attachment.index()].texture() {
                        fbo.attach(texture.clone());
                    }
                }
                fbo
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Allocated {} textures and {} frame buffers at {}x{}",
            textures.len(),
            frame_buffers.len(),
            width,
            height
        );

        self.frame = Some(FrameResources {
            generation: self.generation,
            screen_size,
            textures,
            frame_buffers,
        });
    }

    fn run_passes(
        &mut self,
        compiled: &CompiledGraph,
        renderer: &mut dyn Renderer,
        queue: &RenderQueue,
        assets: &Assets,
    ) -> RenderResult<()> {
        let Self {
            passes,
            pass_nodes,
            attachments,
            output,
            frame,
            ..
        } = self;

        let frame = frame.as_ref();
        for pass_id in compiled.pass_order() {
            let index = pass_id.index();
            let frame_buffer = compiled
                .frame_buffer_of(*pass_id)
                .and_then(|i| frame?.frame_buffers.get(i));

            let mut ctx = PassContext {
                renderer: &mut *renderer,
                queue,
                assets,
                attachments: attachments.as_slice(),
                frame_buffer,
                output: *output,
            };

            log::trace!("Executing pass '{}'", pass_nodes[index].name);
            if let Err(err) = passes[index].execute(&mut ctx) {
                let pass = pass_nodes[index].name.clone();
                log::error!("Pass '{}' failed, aborting frame: {}", pass, err);
                return Err(RenderError::PassFailed {
                    pass,
                    source: Box::new(err),
                });
            }
        }

        Ok(())
    }

    /// Release every frame buffer and texture allocated for execution, and
    /// whatever the passes themselves loaded
    pub fn release(&mut self, renderer: &mut dyn Renderer) {
        self.release_storage(renderer);
        for pass in &mut self.passes {
            pass.release(renderer);
        }
    }

    fn release_storage(&mut self, renderer: &mut dyn Renderer) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        for fbo in &frame.frame_buffers {
            renderer.unload_frame_buffer(Some(fbo));
        }
        for texture in &frame.textures {
            renderer.unload_texture(Some(texture));
        }
        for attachment in &mut self.attachments {
            attachment.texture = None;
        }
        log::debug!("Released {} render graph textures", frame.textures.len());
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("passes", &self.pass_nodes)
            .field("attachments", &self.attachments)
            .field("output", &self.output)
            .field("state", &self.state())
            .finish()
    }
}
