//! Core backend abstraction traits
//!
//! [`GraphicsBackend`] is the low-level contract a concrete GPU API (OpenGL,
//! wgpu, ...) implements. The renderer and its catalogs are the only callers.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to generate {kind} identity: {reason}")]
    IdentityGenerationFailed { kind: &'static str, reason: String },
    #[error("Failed to upload {kind} data: {reason}")]
    UploadFailed { kind: &'static str, reason: String },
    #[error("Failed to compile program: {0}")]
    ProgramCompilationFailed(String),
    #[error("Incomplete frame buffer: {0}")]
    IncompleteFrameBuffer(String),
    #[error("Draw call failed: {0}")]
    DrawFailed(String),
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Current surface size in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Resize the presentation surface
    fn resize(&mut self, width: u32, height: u32);

    // Identity management

    /// Generate a new backend identity for an object of the given kind
    fn generate_id(&mut self, kind: ResourceKind) -> BackendResult<GpuId>;

    /// Delete backend identities in one batch
    fn delete_ids(&mut self, kind: ResourceKind, ids: &[GpuId]);

    /// Make an object current for subsequent state/draw calls.
    ///
    /// For programs this selects the program used by draws.
    fn bind_object(&mut self, kind: ResourceKind, id: GpuId);

    /// Clear the current object of the given kind
    fn unbind_object(&mut self, kind: ResourceKind);

    // Storage

    /// Upload buffer contents
    fn upload_buffer(&mut self, kind: ResourceKind, id: GpuId, data: &[u8]) -> BackendResult<()>;

    /// Allocate texture storage, optionally initialised with pixel data
    fn upload_texture(
        &mut self,
        id: GpuId,
        desc: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> BackendResult<()>;

    /// Compile and link a program from its stage sources
    fn compile_program(&mut self, id: GpuId, vertex: &str, fragment: &str) -> BackendResult<()>;

    /// Attach render target textures to a frame buffer object
    fn attach_frame_buffer(
        &mut self,
        id: GpuId,
        colors: &[GpuId],
        depth: Option<GpuId>,
    ) -> BackendResult<()>;

    // Command recording

    /// Bind a frame buffer (`None` targets the screen) and clear it
    fn bind_frame_buffer(&mut self, id: Option<GpuId>, width: u32, height: u32, clear: ClearValue);

    /// Set a uniform on the given program
    fn set_uniform(&mut self, program: GpuId, name: &str, value: &UniformValue);

    /// Set depth test state
    fn set_depth_state(&mut self, state: DepthState);

    /// Set blending state
    fn set_alpha_state(&mut self, state: AlphaState);

    /// Draw the currently bound index buffer
    fn draw_indexed(&mut self, topology: PrimitiveTopology, index_count: u32) -> BackendResult<()>;

    /// Draw the currently bound vertex buffer without indices
    fn draw_arrays(&mut self, topology: PrimitiveTopology, vertex_count: u32) -> BackendResult<()>;

    /// Draw `instance_count` copies of the bound geometry, one per element
    /// of the bound instanced buffer. `count` is an index count when
    /// `indexed`, a vertex count otherwise.
    fn draw_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        indexed: bool,
        instance_count: u32,
    ) -> BackendResult<()>;
}
