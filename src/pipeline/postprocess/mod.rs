//! Post-processing effects

mod ssao;

pub use ssao::*;

use serde::{Deserialize, Serialize};

use crate::backend::types::{AlphaState, UniformValue};
use crate::error::RenderResult;
use crate::pipeline::{draw_textured_quad, named_program, with_full_screen_program};
use crate::render_graph::{
    AttachmentHints, AttachmentId, GraphError, PassContext, PassSetup, RenderGraph, RenderGraphPass,
};
use crate::resources::{ShaderProgram, StandardLocation, Texture};

/// A full-screen image effect and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PostEffect {
    /// Darkens the image from `inner_cutoff` to `outer_cutoff`, measured as
    /// distance from the screen center
    Vignette { inner_cutoff: f32, outer_cutoff: f32 },
    /// Exposure based HDR to LDR mapping
    Tonemap { exposure: f32 },
    /// Visualizes a depth attachment as linear grayscale
    DebugDepth { near: f32, far: f32 },
    /// Screen space ambient occlusion from scene depth, and normals when
    /// available. Runs as an occlusion pass then a blur that darkens the
    /// input color, so it needs the scene targets of [`add_post_effect`].
    Ssao {
        /// Sample radius in pixels
        radius: f32,
        /// Minimum angle cosine before a sample occludes
        occluder_bias: f32,
        /// Constant and linear distance falloff
        attenuation: (f32, f32),
        /// Side of the tiled rotation noise texture
        noise_size: u32,
        /// Side of the square blur kernel
        blur_size: u32,
    },
}

impl PostEffect {
    pub fn vignette() -> Self {
        PostEffect::Vignette {
            inner_cutoff: 0.25,
            outer_cutoff: 0.75,
        }
    }

    pub fn tonemap() -> Self {
        PostEffect::Tonemap { exposure: 1.0 }
    }

    pub fn debug_depth() -> Self {
        PostEffect::DebugDepth {
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn ssao() -> Self {
        PostEffect::Ssao {
            radius: 4.0,
            occluder_bias: 0.05,
            attenuation: (1.0, 5.0),
            noise_size: 4,
            blur_size: 4,
        }
    }

    /// Whether the effect samples scene depth besides its color input
    pub fn needs_scene_depth(&self) -> bool {
        matches!(self, PostEffect::Ssao { .. })
    }

    /// Built-in program implementing the effect
    pub fn program_name(&self) -> &'static str {
        match self {
            PostEffect::Vignette { .. } => ShaderProgram::VIGNETTE,
            PostEffect::Tonemap { .. } => ShaderProgram::TONEMAP,
            PostEffect::DebugDepth { .. } => ShaderProgram::DEBUG_DEPTH,
            PostEffect::Ssao { .. } => ShaderProgram::SSAO,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostEffect::Vignette { .. } => "Vignette",
            PostEffect::Tonemap { .. } => "Tonemap",
            PostEffect::DebugDepth { .. } => "Debug Depth",
            PostEffect::Ssao { .. } => "SSAO",
        }
    }

    /// Sampler location of the effect input
    fn input_location(&self) -> StandardLocation {
        match self {
            PostEffect::DebugDepth { .. } | PostEffect::Ssao { .. } => StandardLocation::DepthMap,
            _ => StandardLocation::ColorMap,
        }
    }

    /// Named float uniforms
    fn parameters(&self) -> Vec<(&'static str, f32)> {
        match *self {
            PostEffect::Vignette {
                inner_cutoff,
                outer_cutoff,
            } => vec![("u_inner_cutoff", inner_cutoff), ("u_outer_cutoff", outer_cutoff)],
            PostEffect::Tonemap { exposure } => vec![("u_exposure", exposure)],
            PostEffect::DebugDepth { near, far } => vec![("u_near", near), ("u_far", far)],
            PostEffect::Ssao {
                radius,
                occluder_bias,
                attenuation,
                noise_size,
                ..
            } => vec![
                ("u_radius", radius),
                ("u_occluder_bias", occluder_bias),
                ("u_attenuation_constant", attenuation.0),
                ("u_attenuation_linear", attenuation.1),
                ("u_noise_size", noise_size as f32),
            ],
        }
    }
}

/// Scene attachments effects may sample besides their color input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTargets {
    pub depth: AttachmentId,
    pub normal: Option<AttachmentId>,
}

/// Add the passes implementing `effect`, reading `input` and writing
/// `output`.
///
/// Single pass effects become a [`PostEffectPass`]. SSAO adds an
/// [`SsaoPass`] rendering into its own occlusion attachment followed by an
/// [`SsaoBlurPass`], and fails without scene depth.
pub fn add_post_effect(
    graph: &mut RenderGraph,
    effect: PostEffect,
    input: AttachmentId,
    output: AttachmentId,
    scene: Option<SceneTargets>,
) -> Result<(), GraphError> {
    let PostEffect::Ssao { blur_size, .. } = effect else {
        graph.add_pass(PostEffectPass::new(effect, input, output))?;
        return Ok(());
    };
    let scene = scene.ok_or_else(|| GraphError::MissingEffectInput {
        effect: effect.label().to_string(),
        input: "scene depth".to_string(),
    })?;

    let name = format!("ssao occlusion {}", output.index());
    let occlusion = graph.create_attachment(&name, AttachmentHints::FORMAT_RGBA);
    graph.add_pass(SsaoPass::new(effect, scene.depth, scene.normal, occlusion))?;
    graph.add_pass(SsaoBlurPass::new(blur_size, occlusion, input, output))?;
    Ok(())
}

/// Applies one [`PostEffect`] to `input`, writing `output`
pub struct PostEffectPass {
    name: String,
    effect: PostEffect,
    input: AttachmentId,
    output: AttachmentId,
}

impl PostEffectPass {
    pub fn new(effect: PostEffect, input: AttachmentId, output: AttachmentId) -> Self {
        Self {
            name: format!("{} Pass", effect.label()),
            effect,
            input,
            output,
        }
    }

    pub fn effect(&self) -> PostEffect {
        self.effect
    }

    pub fn set_effect(&mut self, effect: PostEffect) {
        self.effect = effect;
    }
}

impl RenderGraphPass for PostEffectPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, setup: &mut PassSetup) {
        setup.read(self.input);
        setup.write(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> RenderResult<()> {
        let texture: &Texture = ctx.texture(self.input)?;
        let program = named_program(ctx.assets, self.effect.program_name())?;
        let fbo = ctx.frame_buffer();
        let effect = self.effect;

        with_full_screen_program(ctx, fbo, program, AlphaState::DISABLED, |ctx| {
            for (name, value) in effect.parameters() {
                ctx.renderer
                    .bind_uniform_named(program, name, UniformValue::Float(value));
            }
            draw_textured_quad(ctx, program, &[(effect.input_location(), texture)])
        })
    }
}
