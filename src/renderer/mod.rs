//! Renderer abstraction
//!
//! [`Renderer`] is the only surface the render graph and its passes draw
//! through. [`CatalogRenderer`] implements it on top of any
//! [`GraphicsBackend`](crate::backend::GraphicsBackend), resolving resources
//! to backend identities through one [`Catalog`](crate::resources::Catalog)
//! per resource kind.

mod catalog_renderer;

pub use catalog_renderer::*;

use glam::Mat4;

use crate::backend::types::*;
use crate::error::RenderResult;
use crate::resources::{
    Assets, BufferObject, CatalogStats, FrameBufferObject, Material, Primitive, ResourceKey,
    ShaderProgram, StandardLocation, Texture,
};

/// Snapshot of the state a renderer currently has bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererState {
    pub frame_buffer: Option<ResourceKey>,
    pub program: Option<ResourceKey>,
    pub depth: DepthState,
    pub alpha: AlphaState,
}

impl Default for RendererState {
    fn default() -> Self {
        Self {
            frame_buffer: None,
            program: None,
            depth: DepthState::ENABLED,
            alpha: AlphaState::DISABLED,
        }
    }
}

/// Drawing interface used by render passes
///
/// Every `Option` argument follows the same policy: `None` is a no-op.
pub trait Renderer {
    /// Renderer name for logging
    fn name(&self) -> &str;

    /// Current screen size in pixels
    fn screen_size(&self) -> (u32, u32);

    /// Resize the screen buffer and the backend surface
    fn resize(&mut self, width: u32, height: u32);

    /// Frame buffer representing the presentation surface
    fn screen_buffer(&self) -> &FrameBufferObject;

    fn bind_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>) -> RenderResult<()>;
    fn unbind_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>);

    /// Compile the program if needed and make it current
    fn bind_program(&mut self, program: Option<&ShaderProgram>) -> RenderResult<()>;
    fn unbind_program(&mut self, program: Option<&ShaderProgram>);

    /// Feed material parameters and states to a bound program
    fn bind_material(
        &mut self,
        program: &ShaderProgram,
        material: &Material,
        assets: &Assets,
    ) -> RenderResult<()>;

    /// Undo [`Renderer::bind_material`], restoring default depth and alpha state
    fn unbind_material(&mut self, program: &ShaderProgram, material: &Material, assets: &Assets);

    /// Set a standard uniform; programs without that location ignore it
    fn bind_uniform(&mut self, program: &ShaderProgram, location: StandardLocation, value: UniformValue);

    /// Set a uniform by name
    fn bind_uniform_named(&mut self, program: &ShaderProgram, name: &str, value: UniformValue);

    /// Upload the texture if needed and bind it to a sampler location
    fn bind_texture(
        &mut self,
        program: &ShaderProgram,
        location: StandardLocation,
        unit: u32,
        texture: &Texture,
    ) -> RenderResult<()>;

    fn unbind_texture(&mut self, texture: Option<&Texture>);

    fn set_depth_state(&mut self, state: DepthState);
    fn set_alpha_state(&mut self, state: AlphaState);

    /// Draw a primitive with the given world transform
    fn draw_primitive(
        &mut self,
        program: &ShaderProgram,
        primitive: &Primitive,
        world: &Mat4,
    ) -> RenderResult<()>;

    /// Draw one copy of a primitive per world matrix stored in `instances`,
    /// a buffer built with [`BufferObject::instanced`]
    fn draw_primitive_instanced(
        &mut self,
        program: &ShaderProgram,
        primitive: &Primitive,
        instances: &BufferObject,
    ) -> RenderResult<()>;

    // Lifetime management

    fn unload_texture(&mut self, texture: Option<&Texture>);

    /// Release a frame buffer and every texture attached to it
    fn unload_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>);

    fn unload_primitive(&mut self, primitive: Option<&Primitive>);

    fn unload_program(&mut self, program: Option<&ShaderProgram>);

    fn unload_instances(&mut self, instances: Option<&BufferObject>);

    /// Delete every released identity. Only call between frames.
    fn cleanup(&mut self);

    fn state(&self) -> RendererState;

    fn catalog_stats(&self, kind: ResourceKind) -> CatalogStats;
}
