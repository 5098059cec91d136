//! Final copy to the screen buffer

use crate::backend::types::AlphaState;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{draw_textured_quad, named_program, with_full_screen_program};
use crate::render_graph::{PassContext, PassSetup, RenderGraphPass};
use crate::resources::{ShaderProgram, StandardLocation, Texture};

/// Copies the graph output attachment to the renderer's screen buffer
#[derive(Debug, Default)]
pub struct PresentPass;

impl PresentPass {
    pub const NAME: &'static str = "Present Pass";

    pub fn new() -> Self {
        Self
    }
}

impl RenderGraphPass for PresentPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.present();
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let output = ctx
            .output()
            .ok_or_else(|| RenderError::MissingAttachmentStorage("graph output".to_string()))?;
        let texture: &Texture = ctx.texture(output)?;
        let program = named_program(ctx.assets, ShaderProgram::SCREEN_TEXTURE)?;

        let screen = ctx.renderer.screen_buffer().clone();
        with_full_screen_program(ctx, Some(&screen), program, AlphaState::DISABLED, |ctx| {
            draw_textured_quad(ctx, program, &[(StandardLocation::ColorMap, texture)])
        })
    }
}
