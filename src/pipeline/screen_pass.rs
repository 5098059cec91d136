//! Screen space pass

use glam::Mat4;

use crate::backend::types::DepthState;
use crate::error::RenderResult;
use crate::pipeline::{draw_bucket, with_frame_buffer, BucketView};
use crate::render_graph::{AttachmentId, PassContext, PassSetup, RenderGraphPass};
use crate::render_queue::RenderableType;
use crate::resources::ShaderProgram;

/// Draws screen space renderables (HUD, overlays) with an orthographic
/// camera and depth testing disabled
pub struct ScreenPass {
    depth: AttachmentId,
    color: AttachmentId,
}

impl ScreenPass {
    pub const NAME: &'static str = "Screen Pass";

    pub fn new(depth: AttachmentId, color: AttachmentId) -> Self {
        Self { depth, color }
    }

    pub fn color(&self) -> AttachmentId {
        self.color
    }

    /// Orthographic projection spanning `[-aspect, aspect] x [-1, 1]`
    pub fn projection(width: u32, height: u32) -> Mat4 {
        let aspect = width as f32 / height.max(1) as f32;
        Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, -100.0, 100.0)
    }
}

impl RenderGraphPass for ScreenPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.write_all(&[self.depth, self.color]);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let fbo = ctx.frame_buffer();
        let (width, height) = ctx.screen_size();
        let view = BucketView {
            view: Mat4::IDENTITY,
            projection: Self::projection(width, height),
            depth: Some(DepthState::DISABLED),
            fallback: ShaderProgram::UNLIT_DIFFUSE,
        };

        with_frame_buffer(ctx, fbo, |ctx| {
            if ctx.queue.count(RenderableType::Screen) > 0 {
                let drawn = draw_bucket(ctx, RenderableType::Screen, view)?;
                log::trace!("{}: {} draws", Self::NAME, drawn);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_uses_aspect() {
        let projection = ScreenPass::projection(200, 100);
        // x = aspect maps to the right edge
        let edge = projection.project_point3(glam::Vec3::new(2.0, 1.0, 0.0));
        assert!((edge.x - 1.0).abs() < 1e-5);
        assert!((edge.y - 1.0).abs() < 1e-5);
    }
}
