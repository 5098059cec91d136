//! Deferred lighting pass

use glam::Mat4;

use crate::backend::types::{AlphaState, UniformValue};
use crate::error::RenderResult;
use crate::pipeline::{named_program, screen_quad, with_full_screen_program};
use crate::render_graph::{AttachmentId, PassContext, PassSetup, RenderGraphPass};
use crate::render_queue::RenderQueue;
use crate::renderer::Renderer;
use crate::resources::{Primitive, ShaderProgram, StandardLocation, Texture};

/// Accumulates lighting from a G-buffer.
///
/// Draws one full-screen quad per queued light, in insertion order, with
/// additive blending.
pub struct DeferredLightingPass {
    depth: AttachmentId,
    normal: AttachmentId,
    albedo: AttachmentId,
    output: AttachmentId,
}

impl DeferredLightingPass {
    pub const NAME: &'static str = "Deferred Lighting Pass";

    pub fn new(
        depth: AttachmentId,
        normal: AttachmentId,
        albedo: AttachmentId,
        output: AttachmentId,
    ) -> Self {
        Self {
            depth,
            normal,
            albedo,
            output,
        }
    }
}

impl DeferredLightingPass {
    fn draw_lights(
        renderer: &mut dyn Renderer,
        queue: &RenderQueue,
        program: &ShaderProgram,
        quad: &Primitive,
        [albedo, normal, depth]: [&Texture; 3],
    ) -> RenderResult<()> {
        renderer.bind_texture(program, StandardLocation::ColorMap, 0, albedo)?;
        renderer.bind_texture(program, StandardLocation::NormalMap, 1, normal)?;
        renderer.bind_texture(program, StandardLocation::DepthMap, 2, depth)?;

        for light in queue.lights() {
            let data = light.uniform_data();
            renderer.bind_uniform(program, StandardLocation::LightPosition, UniformValue::Vec4(data.position));
            renderer.bind_uniform(program, StandardLocation::LightColor, UniformValue::Vec4(data.color_intensity));
            renderer.bind_uniform(program, StandardLocation::LightDirection, UniformValue::Vec4(data.direction_type));
            renderer.draw_primitive(program, quad, &Mat4::IDENTITY)?;
        }
        Ok(())
    }
}

impl RenderGraphPass for DeferredLightingPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read_all(&[self.depth, self.normal, self.albedo]);
        setup.write(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let assets = ctx.assets;
        let program = named_program(assets, ShaderProgram::DEFERRED_LIGHTING)?;
        let quad = screen_quad(assets)?;
        let albedo = ctx.texture(self.albedo)?;
        let normal = ctx.texture(self.normal)?;
        let depth = ctx.texture(self.depth)?;
        let fbo = ctx.frame_buffer();

        with_full_screen_program(ctx, fbo, program, AlphaState::ENABLED_ADDITIVE_BLEND, |ctx| {
            let renderer = &mut *ctx.renderer;
            renderer.bind_uniform(
                program,
                StandardLocation::ProjectionMatrix,
                UniformValue::Mat4(ctx.queue.projection_matrix()),
            );
            renderer.bind_uniform(
                program,
                StandardLocation::ViewMatrix,
                UniformValue::Mat4(ctx.queue.view_matrix()),
            );

            let textures: [&Texture; 3] = [albedo, normal, depth];
            let result = Self::draw_lights(&mut *renderer, ctx.queue, program, quad, textures);

            for texture in textures {
                renderer.unbind_texture(Some(texture));
            }
            log::trace!("{}: {} lights", Self::NAME, ctx.queue.lights().len());
            result
        })
    }
}
