//! Rendering pipeline passes and graph presets
//!
//! Every pass binds the frame buffer the graph assigned to its write set,
//! draws, then restores renderer state before returning.

mod blend_pass;
mod forward_pass;
mod lighting_pass;
pub mod postprocess;
mod present_pass;
mod screen_pass;

pub use blend_pass::*;
pub use forward_pass::*;
pub use lighting_pass::*;
pub use postprocess::{add_post_effect, PostEffect, PostEffectPass, SceneTargets, SsaoBlurPass, SsaoPass};
pub use present_pass::*;
pub use screen_pass::*;

use glam::{Mat4, Vec2};

use crate::backend::types::{AlphaState, DepthState, UniformValue};
use crate::error::{RenderError, RenderResult};
use crate::render_graph::{AttachmentHints, AttachmentId, GraphError, PassContext, RenderGraph};
use crate::render_queue::{PrimitiveMap, RenderableType};
use crate::renderer::Renderer;
use crate::resources::{
    Assets, FrameBufferObject, Material, MaterialId, Primitive, ShaderProgram, StandardLocation, Texture,
};

/// Built-in program looked up by name
pub(crate) fn named_program<'a>(assets: &'a Assets, name: &str) -> RenderResult<&'a ShaderProgram> {
    assets
        .program_by_name(name)
        .ok_or_else(|| RenderError::MissingAsset(name.to_string()))
}

pub(crate) fn screen_quad(assets: &Assets) -> RenderResult<&Primitive> {
    assets
        .primitive_by_name(Assets::SCREEN_QUAD)
        .ok_or_else(|| RenderError::MissingAsset(Assets::SCREEN_QUAD.to_string()))
}

/// Camera matrices shared by every draw of a bucket
#[derive(Debug, Clone, Copy)]
pub(crate) struct BucketView {
    pub view: Mat4,
    pub projection: Mat4,
    /// Depth state forced over the material's own
    pub depth: Option<DepthState>,
    /// Program for materials without program or color map
    pub fallback: &'static str,
}

/// Draw every renderable of a queue bucket. Returns the number of draws.
pub(crate) fn draw_bucket(
    ctx: &mut PassContext<'_>,
    kind: RenderableType,
    view: BucketView,
) -> RenderResult<usize> {
    let assets = ctx.assets;
    let renderer = &mut *ctx.renderer;
    let mut drawn = 0;
    let mut result = Ok(());

    ctx.queue.each(kind, |material, primitives| {
        if result.is_ok() {
            result = draw_material(&mut *renderer, assets, material, primitives, view)
                .map(|count| drawn += count);
        }
    });

    result.map(|_| drawn)
}

fn draw_material(
    renderer: &mut dyn Renderer,
    assets: &Assets,
    material_id: MaterialId,
    primitives: &PrimitiveMap,
    view: BucketView,
) -> RenderResult<usize> {
    let Some(material) = assets.material(material_id) else {
        log::warn!("Skipping queued material {:?}: not in assets", material_id);
        return Ok(0);
    };
    let program = assets
        .program_for_with_fallback(material, view.fallback)
        .ok_or_else(|| RenderError::MissingAsset(format!("program for material '{}'", material.name)))?;

    renderer.bind_program(Some(program))?;
    let result = draw_primitives(&mut *renderer, assets, program, material, primitives, view);
    renderer.unbind_material(program, material, assets);
    renderer.unbind_program(Some(program));
    result
}

fn draw_primitives(
    renderer: &mut dyn Renderer,
    assets: &Assets,
    program: &ShaderProgram,
    material: &Material,
    primitives: &PrimitiveMap,
    view: BucketView,
) -> RenderResult<usize> {
    renderer.bind_uniform(program, StandardLocation::ProjectionMatrix, UniformValue::Mat4(view.projection));
    renderer.bind_uniform(program, StandardLocation::ViewMatrix, UniformValue::Mat4(view.view));
    renderer.bind_material(program, material, assets)?;
    if let Some(depth) = view.depth {
        renderer.set_depth_state(depth);
    }

    let mut drawn = 0;
    for (primitive_id, geometries) in primitives {
        let Some(primitive) = assets.primitive(*primitive_id) else {
            log::warn!("Skipping queued primitive {:?}: not in assets", primitive_id);
            continue;
        };
        for (_, world) in geometries {
            renderer.draw_primitive(program, primitive, world)?;
            drawn += 1;
        }
    }
    Ok(drawn)
}

/// Run `body` with `fbo` bound. The frame buffer is unbound again whether
/// or not `body` succeeds.
pub(crate) fn with_frame_buffer<T>(
    ctx: &mut PassContext<'_>,
    fbo: Option<&FrameBufferObject>,
    body: impl FnOnce(&mut PassContext<'_>) -> RenderResult<T>,
) -> RenderResult<T> {
    ctx.renderer.bind_frame_buffer(fbo)?;
    let result = body(ctx);
    ctx.renderer.unbind_frame_buffer(fbo);
    result
}

/// Run `body` drawing full-screen quads with `program` into `fbo`.
///
/// Depth testing is off and blending follows `alpha` while `body` runs.
/// Program, depth, alpha and frame buffer are restored on every exit.
pub(crate) fn with_full_screen_program<T>(
    ctx: &mut PassContext<'_>,
    fbo: Option<&FrameBufferObject>,
    program: &ShaderProgram,
    alpha: AlphaState,
    body: impl FnOnce(&mut PassContext<'_>) -> RenderResult<T>,
) -> RenderResult<T> {
    with_frame_buffer(ctx, fbo, |ctx| {
        ctx.renderer.bind_program(Some(program))?;
        let previous = ctx.renderer.state();
        ctx.renderer.set_depth_state(DepthState::DISABLED);
        ctx.renderer.set_alpha_state(alpha);
        bind_screen_size(ctx, program);

        let result = body(ctx);

        ctx.renderer.set_alpha_state(previous.alpha);
        ctx.renderer.set_depth_state(previous.depth);
        ctx.renderer.unbind_program(Some(program));
        result
    })
}

/// Draw the screen quad with `textures` bound to consecutive units,
/// unbinding them afterwards
pub(crate) fn draw_textured_quad(
    ctx: &mut PassContext<'_>,
    program: &ShaderProgram,
    textures: &[(StandardLocation, &Texture)],
) -> RenderResult<()> {
    let quad = screen_quad(ctx.assets)?;
    let result = bind_and_draw(&mut *ctx.renderer, program, quad, textures);
    for (_, texture) in textures {
        ctx.renderer.unbind_texture(Some(texture));
    }
    result
}

fn bind_and_draw(
    renderer: &mut dyn Renderer,
    program: &ShaderProgram,
    quad: &Primitive,
    textures: &[(StandardLocation, &Texture)],
) -> RenderResult<()> {
    for (unit, (location, texture)) in textures.iter().enumerate() {
        renderer.bind_texture(program, *location, unit as u32, texture)?;
    }
    renderer.draw_primitive(program, quad, &Mat4::IDENTITY)
}

pub(crate) fn bind_screen_size(ctx: &mut PassContext<'_>, program: &ShaderProgram) {
    let (width, height) = ctx.screen_size();
    ctx.renderer.bind_uniform(
        program,
        StandardLocation::ScreenSize,
        UniformValue::Vec2(Vec2::new(width as f32, height as f32)),
    );
}

fn post_attachment(graph: &mut RenderGraph, index: usize) -> AttachmentId {
    graph.create_attachment(&format!("post {}", index), AttachmentHints::FORMAT_RGBA)
}

/// Append post effects after `input` and a present pass reading the last one
fn finish_graph(
    graph: &mut RenderGraph,
    mut input: AttachmentId,
    scene: SceneTargets,
    effects: &[PostEffect],
) -> Result<(), GraphError> {
    for (index, effect) in effects.iter().enumerate() {
        let output = post_attachment(graph, index);
        add_post_effect(graph, *effect, input, output, Some(scene))?;
        input = output;
    }
    graph.set_output(input)?;
    graph.add_pass(PresentPass::new())?;
    Ok(())
}

/// Forward preset: opaque and translucent geometry share one depth and
/// color target; screen space content is drawn separately and blended on top.
pub fn build_forward_graph(effects: &[PostEffect]) -> Result<RenderGraph, GraphError> {
    let mut graph = RenderGraph::new();
    let depth_only = AttachmentHints::FORMAT_DEPTH | AttachmentHints::RENDER_ONLY;
    let sampled_depth = effects.iter().any(PostEffect::needs_scene_depth);

    let scene_depth = graph.create_attachment(
        "scene depth",
        if sampled_depth { AttachmentHints::FORMAT_DEPTH } else { depth_only },
    );
    let scene_color = graph.create_attachment("scene color", AttachmentHints::FORMAT_RGBA);
    let screen_depth = graph.create_attachment("screen depth", depth_only);
    let screen_color = graph.create_attachment("screen color", AttachmentHints::FORMAT_RGBA);
    let composite = graph.create_attachment("composite", AttachmentHints::FORMAT_RGBA);

    graph.add_pass(OpaquePass::new(scene_depth, scene_color))?;
    graph.add_pass(TranslucentPass::new(scene_depth, scene_color))?;
    graph.add_pass(ScreenPass::new(screen_depth, screen_color))?;
    graph.add_pass(BlendPass::new(&[scene_color, screen_color], composite))?;
    let scene = SceneTargets {
        depth: scene_depth,
        normal: None,
    };
    finish_graph(&mut graph, composite, scene, effects)?;

    log::debug!("Built forward graph with {} passes", graph.pass_count());
    Ok(graph)
}

/// Deferred preset: opaque geometry fills a G-buffer that is lit once per
/// light. Translucent and screen space content get their own targets and
/// are blended over the lit result.
pub fn build_deferred_graph(effects: &[PostEffect]) -> Result<RenderGraph, GraphError> {
    let mut graph = RenderGraph::new();
    let depth_only = AttachmentHints::FORMAT_DEPTH | AttachmentHints::RENDER_ONLY;

    let depth = graph.create_attachment("gbuffer depth", AttachmentHints::FORMAT_DEPTH);
    let normal = graph.create_attachment("gbuffer normal", AttachmentHints::FORMAT_RGBA_HDR);
    let albedo = graph.create_attachment("gbuffer albedo", AttachmentHints::FORMAT_RGBA);
    let lit = graph.create_attachment("lit", AttachmentHints::FORMAT_RGBA_HDR);
    let translucent_depth = graph.create_attachment("translucent depth", depth_only);
    let translucent_color = graph.create_attachment("translucent color", AttachmentHints::FORMAT_RGBA_HDR);
    let screen_depth = graph.create_attachment("screen depth", depth_only);
    let screen_color = graph.create_attachment("screen color", AttachmentHints::FORMAT_RGBA_HDR);
    let composite = graph.create_attachment("composite", AttachmentHints::FORMAT_RGBA_HDR);

    graph.add_pass(OpaquePass::new(depth, albedo).with_normal(normal))?;
    graph.add_pass(DeferredLightingPass::new(depth, normal, albedo, lit))?;
    graph.add_pass(TranslucentPass::new(translucent_depth, translucent_color))?;
    graph.add_pass(ScreenPass::new(screen_depth, screen_color))?;
    graph.add_pass(BlendPass::new(&[lit, translucent_color, screen_color], composite))?;
    let scene = SceneTargets {
        depth,
        normal: Some(normal),
    };
    finish_graph(&mut graph, composite, scene, effects)?;

    log::debug!("Built deferred graph with {} passes", graph.pass_count());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_graph_order() {
        let mut graph = build_forward_graph(&[]).unwrap();
        let compiled = graph.compile().unwrap();

        let names: Vec<_> = compiled
            .pass_order()
            .iter()
            .map(|id| id.index())
            .collect();
        // opaque, translucent, screen, blend, present
        assert_eq!(names, vec![0, 1, 2, 3, 4]);
        // Opaque and translucent render into the same frame buffer
        assert_eq!(compiled.frame_buffer_count(), 3);
    }

    #[test]
    fn test_forward_graph_reuses_depth_storage() {
        let mut graph = build_forward_graph(&[]).unwrap();
        let scene_depth = graph.attachment_by_name("scene depth").map(|a| a.id()).unwrap();
        let screen_depth = graph.attachment_by_name("screen depth").map(|a| a.id()).unwrap();

        let compiled = graph.compile().unwrap();
        assert!(compiled.shares_storage(scene_depth, screen_depth));
    }

    #[test]
    fn test_deferred_graph_lights_before_blend() {
        let mut graph = build_deferred_graph(&[PostEffect::tonemap()]).unwrap();
        let lighting = graph.pass_by_name(DeferredLightingPass::NAME).unwrap();
        let blend = graph.pass_by_name(BlendPass::NAME).unwrap();
        let opaque = graph.pass_by_name(OpaquePass::NAME).unwrap();

        let compiled = graph.compile().unwrap();
        let step = |pass| compiled.step_of(pass).unwrap();
        assert!(step(opaque) < step(lighting));
        assert!(step(lighting) < step(blend));
        assert_eq!(compiled.pass_count(), 7);
    }

    #[test]
    fn test_forward_ssao_samples_scene_depth() {
        let mut graph = build_forward_graph(&[PostEffect::ssao()]).unwrap();
        let scene_depth = graph.attachment_by_name("scene depth").unwrap();
        assert!(!scene_depth.hints().contains(AttachmentHints::RENDER_ONLY));
        let scene_depth = scene_depth.id();
        let screen_depth = graph.attachment_by_name("screen depth").map(|a| a.id()).unwrap();

        let ssao = graph.pass_by_name(SsaoPass::NAME).unwrap();
        let blur = graph.pass_by_name(SsaoBlurPass::NAME).unwrap();
        let blend = graph.pass_by_name(BlendPass::NAME).unwrap();
        assert!(graph.pass_node(ssao).unwrap().reads_attachment(scene_depth));

        let compiled = graph.compile().unwrap();
        let step = |pass| compiled.step_of(pass).unwrap();
        assert!(step(blend) < step(blur));
        assert!(step(ssao) < step(blur));
        assert_eq!(compiled.pass_count(), 7);
        // Scene depth now outlives the screen pass
        assert!(!compiled.shares_storage(scene_depth, screen_depth));
    }

    #[test]
    fn test_deferred_ssao_reads_gbuffer_normals() {
        let graph = build_deferred_graph(&[PostEffect::ssao(), PostEffect::tonemap()]).unwrap();
        let normal = graph.attachment_by_name("gbuffer normal").map(|a| a.id()).unwrap();
        let ssao = graph.pass_by_name(SsaoPass::NAME).unwrap();
        assert!(graph.pass_node(ssao).unwrap().reads_attachment(normal));
        assert_eq!(graph.pass_count(), 9);
    }
}
