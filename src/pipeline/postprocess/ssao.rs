//! Screen space ambient occlusion

use crate::backend::types::{AlphaState, UniformValue};
use crate::error::RenderResult;
use crate::pipeline::postprocess::PostEffect;
use crate::pipeline::{draw_textured_quad, named_program, with_full_screen_program};
use crate::render_graph::{AttachmentId, PassContext, PassSetup, RenderGraphPass};
use crate::renderer::Renderer;
use crate::resources::{ShaderProgram, StandardLocation, Texture};

/// Estimates ambient occlusion from scene depth into an occlusion
/// attachment. Samples are rotated per pixel by a tiled noise texture the
/// pass owns.
pub struct SsaoPass {
    effect: PostEffect,
    depth: AttachmentId,
    normal: Option<AttachmentId>,
    occlusion: AttachmentId,
    noise: Texture,
}

impl SsaoPass {
    pub const NAME: &'static str = "SSAO Pass";

    pub fn new(
        effect: PostEffect,
        depth: AttachmentId,
        normal: Option<AttachmentId>,
        occlusion: AttachmentId,
    ) -> Self {
        let noise_size = match effect {
            PostEffect::Ssao { noise_size, .. } => noise_size,
            _ => 4,
        };
        Self {
            effect,
            depth,
            normal,
            occlusion,
            noise: Texture::rotation_noise(noise_size),
        }
    }

    pub fn noise(&self) -> &Texture {
        &self.noise
    }
}

impl RenderGraphPass for SsaoPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read(self.depth);
        if let Some(normal) = self.normal {
            setup.read(normal);
        }
        setup.write(self.occlusion);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let program = named_program(ctx.assets, ShaderProgram::SSAO)?;
        let depth: &Texture = ctx.texture(self.depth)?;
        let normal: Option<&Texture> = match self.normal {
            Some(id) => Some(ctx.texture(id)?),
            None => None,
        };
        let fbo = ctx.frame_buffer();
        let effect = self.effect;
        let noise = &self.noise;

        with_full_screen_program(ctx, fbo, program, AlphaState::DISABLED, |ctx| {
            ctx.renderer.bind_uniform(
                program,
                StandardLocation::ProjectionMatrix,
                UniformValue::Mat4(ctx.queue.projection_matrix()),
            );
            for (name, value) in effect.parameters() {
                ctx.renderer
                    .bind_uniform_named(program, name, UniformValue::Float(value));
            }
            ctx.renderer
                .bind_uniform_named(program, "u_use_normal_map", UniformValue::Int(normal.is_some() as i32));

            let mut textures = vec![(StandardLocation::DepthMap, depth), (StandardLocation::NoiseMap, noise)];
            if let Some(normal) = normal {
                textures.push((StandardLocation::NormalMap, normal));
            }
            draw_textured_quad(ctx, program, &textures)
        })
    }

    fn release(&mut self, renderer: &mut dyn Renderer) {
        renderer.unload_texture(Some(&self.noise));
    }
}

/// Box blurs the occlusion attachment and multiplies it into the color
/// input
pub struct SsaoBlurPass {
    blur_size: u32,
    occlusion: AttachmentId,
    input: AttachmentId,
    output: AttachmentId,
}

impl SsaoBlurPass {
    pub const NAME: &'static str = "SSAO Blur Pass";

    pub fn new(blur_size: u32, occlusion: AttachmentId, input: AttachmentId, output: AttachmentId) -> Self {
        Self {
            blur_size,
            occlusion,
            input,
            output,
        }
    }
}

impl RenderGraphPass for SsaoBlurPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read_all(&[self.occlusion, self.input]);
        setup.write(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let program = named_program(ctx.assets, ShaderProgram::SSAO_BLUR)?;
        let color: &Texture = ctx.texture(self.input)?;
        let occlusion: &Texture = ctx.texture(self.occlusion)?;
        let fbo = ctx.frame_buffer();
        let blur_size = self.blur_size as i32;

        with_full_screen_program(ctx, fbo, program, AlphaState::DISABLED, |ctx| {
            ctx.renderer
                .bind_uniform_named(program, "u_blur_size", UniformValue::Int(blur_size));
            draw_textured_quad(
                ctx,
                program,
                &[(StandardLocation::ColorMap, color), (StandardLocation::OcclusionMap, occlusion)],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::postprocess::{add_post_effect, SceneTargets};
    use crate::render_graph::{AttachmentHints, GraphError, RenderGraph};

    fn targets(graph: &mut RenderGraph) -> (AttachmentId, AttachmentId, AttachmentId) {
        let depth = graph.create_attachment("depth", AttachmentHints::FORMAT_DEPTH);
        let color = graph.create_attachment("color", AttachmentHints::FORMAT_RGBA);
        let output = graph.create_attachment("output", AttachmentHints::FORMAT_RGBA);
        (depth, color, output)
    }

    #[test]
    fn test_ssao_adds_occlusion_and_blur_passes() {
        let mut graph = RenderGraph::new();
        let (depth, color, output) = targets(&mut graph);
        let scene = SceneTargets { depth, normal: None };

        add_post_effect(&mut graph, PostEffect::ssao(), color, output, Some(scene)).unwrap();
        assert_eq!(graph.pass_count(), 2);

        let ssao = graph.pass_node(graph.pass_by_name(SsaoPass::NAME).unwrap()).unwrap();
        let blur = graph.pass_node(graph.pass_by_name(SsaoBlurPass::NAME).unwrap()).unwrap();
        assert_eq!(ssao.reads, vec![depth]);
        assert_eq!(ssao.writes.len(), 1);

        // The occlusion attachment is private to the effect
        let occlusion = ssao.writes[0];
        assert!(![depth, color, output].contains(&occlusion));
        assert_eq!(blur.reads, vec![occlusion, color]);
        assert_eq!(blur.writes, vec![output]);
    }

    #[test]
    fn test_ssao_samples_normals_when_available() {
        let mut graph = RenderGraph::new();
        let (depth, color, output) = targets(&mut graph);
        let normal = graph.create_attachment("normal", AttachmentHints::FORMAT_RGBA_HDR);
        let scene = SceneTargets {
            depth,
            normal: Some(normal),
        };

        add_post_effect(&mut graph, PostEffect::ssao(), color, output, Some(scene)).unwrap();
        let ssao = graph.pass_node(graph.pass_by_name(SsaoPass::NAME).unwrap()).unwrap();
        assert_eq!(ssao.reads, vec![depth, normal]);
    }

    #[test]
    fn test_ssao_without_scene_depth() {
        let mut graph = RenderGraph::new();
        let (_, color, output) = targets(&mut graph);

        let err = add_post_effect(&mut graph, PostEffect::ssao(), color, output, None).unwrap_err();
        assert!(matches!(err, GraphError::MissingEffectInput { .. }));
        assert_eq!(graph.pass_count(), 0);
    }

    #[test]
    fn test_noise_texture_follows_settings() {
        let effect = PostEffect::Ssao {
            radius: 2.0,
            occluder_bias: 0.1,
            attenuation: (1.0, 2.0),
            noise_size: 8,
            blur_size: 8,
        };
        let pass = SsaoPass::new(effect, AttachmentId(0), None, AttachmentId(1));
        assert_eq!(pass.noise().width(), 8);
    }
}
