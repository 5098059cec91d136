//! Scene geometry passes

use crate::backend::types::DepthState;
use crate::error::RenderResult;
use crate::pipeline::{draw_bucket, with_frame_buffer, BucketView};
use crate::render_graph::{AttachmentId, PassContext, PassSetup, RenderGraphPass};
use crate::render_queue::RenderableType;
use crate::resources::ShaderProgram;

/// Draws the opaque bucket with the queue camera.
///
/// With a normal attachment the pass fills a G-buffer, falling back to
/// the G-buffer program instead of Phong.
pub struct OpaquePass {
    depth: AttachmentId,
    color: AttachmentId,
    normal: Option<AttachmentId>,
}

impl OpaquePass {
    pub const NAME: &'static str = "Opaque Pass";

    pub fn new(depth: AttachmentId, color: AttachmentId) -> Self {
        Self {
            depth,
            color,
            normal: None,
        }
    }

    pub fn with_normal(mut self, normal: AttachmentId) -> Self {
        self.normal = Some(normal);
        self
    }

    fn fallback(&self) -> &'static str {
        if self.normal.is_some() {
            ShaderProgram::GBUFFER
        } else {
            ShaderProgram::PHONG
        }
    }
}

impl RenderGraphPass for OpaquePass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.write_all(&[self.depth, self.color]);
        if let Some(normal) = self.normal {
            setup.write(normal);
        }
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let fbo = ctx.frame_buffer();
        let view = BucketView {
            view: ctx.queue.view_matrix(),
            projection: ctx.queue.projection_matrix(),
            depth: None,
            fallback: self.fallback(),
        };

        let drawn = with_frame_buffer(ctx, fbo, |ctx| draw_bucket(ctx, RenderableType::Opaque, view))?;
        log::trace!("{}: {} draws", Self::NAME, drawn);
        Ok(())
    }
}

/// Draws the translucent bucket over an existing depth buffer without
/// writing depth
pub struct TranslucentPass {
    depth: AttachmentId,
    color: AttachmentId,
}

impl TranslucentPass {
    pub const NAME: &'static str = "Translucent Pass";

    pub fn new(depth: AttachmentId, color: AttachmentId) -> Self {
        Self { depth, color }
    }
}

impl RenderGraphPass for TranslucentPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.write_all(&[self.depth, self.color]);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let fbo = ctx.frame_buffer();
        let view = BucketView {
            view: ctx.queue.view_matrix(),
            projection: ctx.queue.projection_matrix(),
            depth: Some(DepthState::READ_ONLY),
            fallback: ShaderProgram::UNLIT_DIFFUSE,
        };

        let drawn = with_frame_buffer(ctx, fbo, |ctx| draw_bucket(ctx, RenderableType::Translucent, view))?;
        log::trace!("{}: {} draws", Self::NAME, drawn);
        Ok(())
    }
}
