//! Render pass definitions for the render graph

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use crate::render_graph::attachment::{Attachment, AttachmentId};
use crate::render_queue::RenderQueue;
use crate::renderer::Renderer;
use crate::resources::{Assets, FrameBufferObject, Texture};

/// Unique identifier for a render pass, an index into its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Dependency declarations collected from [`RenderGraphPass::setup`]
#[derive(Debug, Default)]
pub struct PassSetup {
    pub(crate) reads: Vec<AttachmentId>,
    pub(crate) writes: Vec<AttachmentId>,
    pub(crate) presents: bool,
}

impl PassSetup {
    /// Declare that this pass samples an attachment
    pub fn read(&mut self, attachment: AttachmentId) {
        if !self.reads.contains(&attachment) {
            self.reads.push(attachment);
        }
    }

    pub fn read_all(&mut self, attachments: &[AttachmentId]) {
        for attachment in attachments {
            self.read(*attachment);
        }
    }

    /// Declare that this pass renders into an attachment.
    ///
    /// Every attachment written by one pass ends up in the same frame buffer.
    pub fn write(&mut self, attachment: AttachmentId) {
        if !self.writes.contains(&attachment) {
            self.writes.push(attachment);
        }
    }

    pub fn write_all(&mut self, attachments: &[AttachmentId]) {
        for attachment in attachments {
            self.write(*attachment);
        }
    }

    /// Declare that this pass reads the graph output (set with
    /// [`RenderGraph::set_output`](crate::render_graph::RenderGraph::set_output))
    pub fn present(&mut self) {
        self.presents = true;
    }
}

/// Everything a pass may use while executing
pub struct PassContext<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub queue: &'a RenderQueue,
    pub assets: &'a Assets,
    pub(crate) attachments: &'a [Attachment],
    pub(crate) frame_buffer: Option<&'a FrameBufferObject>,
    pub(crate) output: Option<AttachmentId>,
}

impl<'a> PassContext<'a> {
    /// Frame buffer grouping every attachment this pass writes
    pub fn frame_buffer(&self) -> Option<&'a FrameBufferObject> {
        self.frame_buffer
    }

    pub fn attachment(&self, id: AttachmentId) -> Option<&'a Attachment> {
        self.attachments.get(id.index())
    }

    /// Backing texture of an attachment
    pub fn texture(&self, id: AttachmentId) -> RenderResult<&'a Arc<Texture>> {
        let attachment = self
            .attachment(id)
            .ok_or(crate::render_graph::GraphError::UnknownAttachment(id))?;
        attachment
            .texture()
            .ok_or_else(|| RenderError::MissingAttachmentStorage(attachment.name().to_string()))
    }

    /// Graph output attachment, if one was set
    pub fn output(&self) -> Option<AttachmentId> {
        self.output
    }

    pub fn screen_size(&self) -> (u32, u32) {
        self.renderer.screen_size()
    }
}

/// A unit of work in a render graph
///
/// `setup` runs once when the pass is added to a graph. `execute` runs every
/// frame in dependency order. A pass binds its own frame buffer and must
/// restore every renderer state it changes before returning.
pub trait RenderGraphPass: Send {
    /// Pass name for logging and error reports
    fn name(&self) -> &str;

    /// Declare read and write attachments
    fn setup(&mut self, setup: &mut PassSetup);

    /// Record draw calls
    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()>;

    /// Unload renderer resources the pass owns. Called when the graph is
    /// released.
    fn release(&mut self, _renderer: &mut dyn Renderer) {}
}

/// Metadata about a pass in the graph
#[derive(Debug, Clone)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub reads: Vec<AttachmentId>,
    pub writes: Vec<AttachmentId>,
    pub presents: bool,
}

impl PassNode {
    pub fn reads_attachment(&self, attachment: AttachmentId) -> bool {
        self.reads.contains(&attachment)
    }

    pub fn writes_attachment(&self, attachment: AttachmentId) -> bool {
        self.writes.contains(&attachment)
    }
}
