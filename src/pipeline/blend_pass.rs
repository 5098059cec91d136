//! Attachment compositing

use crate::backend::types::AlphaState;
use crate::error::RenderResult;
use crate::pipeline::{draw_textured_quad, named_program, with_full_screen_program};
use crate::render_graph::{AttachmentId, PassContext, PassSetup, RenderGraphPass};
use crate::resources::{ShaderProgram, StandardLocation, Texture};

/// Blend two or more attachments into one output, in input order
pub struct BlendPass {
    inputs: Vec<AttachmentId>,
    output: AttachmentId,
    alpha_state: AlphaState,
}

impl BlendPass {
    pub const NAME: &'static str = "Blend Pass";

    /// Additive blend of `inputs`
    pub fn new(inputs: &[AttachmentId], output: AttachmentId) -> Self {
        Self::with_alpha_state(inputs, output, AlphaState::ENABLED_ADDITIVE_BLEND)
    }

    pub fn with_alpha_state(inputs: &[AttachmentId], output: AttachmentId, alpha_state: AlphaState) -> Self {
        Self {
            inputs: inputs.to_vec(),
            output,
            alpha_state,
        }
    }

    pub fn add_input(&mut self, input: AttachmentId) {
        self.inputs.push(input);
    }

    pub fn output(&self) -> AttachmentId {
        self.output
    }

    pub fn alpha_state(&self) -> AlphaState {
        self.alpha_state
    }
}

impl RenderGraphPass for BlendPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read_all(&self.inputs);
        setup.write(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let program = named_program(ctx.assets, ShaderProgram::SCREEN_TEXTURE)?;
        let fbo = ctx.frame_buffer();
        let inputs = &self.inputs;

        with_full_screen_program(ctx, fbo, program, self.alpha_state, |ctx| {
            for input in inputs {
                let texture: &Texture = ctx.texture(*input)?;
                draw_textured_quad(ctx, program, &[(StandardLocation::ColorMap, texture)])?;
            }
            Ok(())
        })
    }
}
