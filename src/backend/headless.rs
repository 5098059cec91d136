//! Headless backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out
//! identities the way a GL driver would (per kind, starting at 1), keeps
//! track of which identities are alive, and records every command so the
//! sequence issued by the renderer can be inspected.

use std::collections::{BTreeSet, HashMap};

use crate::backend::traits::*;
use crate::backend::types::*;

/// Command recorded by the [`HeadlessBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Generate(ResourceKind, GpuId),
    Delete(ResourceKind, Vec<GpuId>),
    Bind(ResourceKind, GpuId),
    Unbind(ResourceKind),
    UploadBuffer { kind: ResourceKind, id: GpuId, size: usize },
    UploadTexture { id: GpuId, width: u32, height: u32, format: TextureFormat },
    CompileProgram(GpuId),
    AttachFrameBuffer { id: GpuId, colors: Vec<GpuId>, depth: Option<GpuId> },
    BindFrameBuffer { id: Option<GpuId>, width: u32, height: u32 },
    SetUniform { program: GpuId, name: String, value: UniformValue },
    SetDepthState(DepthState),
    SetAlphaState(AlphaState),
    DrawIndexed { topology: PrimitiveTopology, count: u32 },
    DrawArrays { topology: PrimitiveTopology, count: u32 },
    DrawInstanced { topology: PrimitiveTopology, count: u32, indexed: bool, instances: u32 },
}

/// Operation that can be made to fail once, for error-path testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Generate(ResourceKind),
    Upload(ResourceKind),
    Draw,
}

/// Headless backend.
#[derive(Debug)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    next_ids: HashMap<ResourceKind, u32>,
    live_ids: HashMap<ResourceKind, BTreeSet<GpuId>>,
    commands: Vec<BackendCommand>,
    pending_failures: Vec<FailurePoint>,
    recording: bool,
}

impl HeadlessBackend {
    /// Create a new headless backend with the given surface size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_ids: HashMap::new(),
            live_ids: HashMap::new(),
            commands: Vec::new(),
            pending_failures: Vec::new(),
            recording: true,
        }
    }

    /// Disable command recording (identity tracking stays on).
    pub fn without_recording(mut self) -> Self {
        self.recording = false;
        self
    }

    /// Make the next matching operation fail.
    pub fn inject_failure(&mut self, point: FailurePoint) {
        self.pending_failures.push(point);
    }

    /// Recorded commands, oldest first.
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Whether `id` is currently allocated for `kind`.
    pub fn is_live(&self, kind: ResourceKind, id: GpuId) -> bool {
        self.live_ids
            .get(&kind)
            .is_some_and(|ids| ids.contains(&id))
    }

    /// Number of identities currently allocated for `kind`.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live_ids.get(&kind).map_or(0, BTreeSet::len)
    }

    /// Number of draw commands recorded so far.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    BackendCommand::DrawIndexed { .. }
                        | BackendCommand::DrawArrays { .. }
                        | BackendCommand::DrawInstanced { .. }
                )
            })
            .count()
    }

    fn take_failure(&mut self, point: FailurePoint) -> bool {
        if let Some(index) = self.pending_failures.iter().position(|p| *p == point) {
            self.pending_failures.remove(index);
            true
        } else {
            false
        }
    }

    fn record(&mut self, command: BackendCommand) {
        log::trace!("HeadlessBackend: {:?}", command);
        if self.recording {
            self.commands.push(command);
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "Headless"
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn generate_id(&mut self, kind: ResourceKind) -> BackendResult<GpuId> {
        if self.take_failure(FailurePoint::Generate(kind)) {
            return Err(BackendError::IdentityGenerationFailed {
                kind: kind.label(),
                reason: "injected failure".into(),
            });
        }

        let next = self.next_ids.entry(kind).or_insert(1);
        let id = GpuId(*next);
        *next += 1;

        self.live_ids.entry(kind).or_default().insert(id);
        self.record(BackendCommand::Generate(kind, id));
        Ok(id)
    }

    fn delete_ids(&mut self, kind: ResourceKind, ids: &[GpuId]) {
        if let Some(live) = self.live_ids.get_mut(&kind) {
            for id in ids {
                live.remove(id);
            }
        }
        self.record(BackendCommand::Delete(kind, ids.to_vec()));
    }

    fn bind_object(&mut self, kind: ResourceKind, id: GpuId) {
        self.record(BackendCommand::Bind(kind, id));
    }

    fn unbind_object(&mut self, kind: ResourceKind) {
        self.record(BackendCommand::Unbind(kind));
    }

    fn upload_buffer(&mut self, kind: ResourceKind, id: GpuId, data: &[u8]) -> BackendResult<()> {
        if self.take_failure(FailurePoint::Upload(kind)) {
            return Err(BackendError::UploadFailed {
                kind: kind.label(),
                reason: "injected failure".into(),
            });
        }
        self.record(BackendCommand::UploadBuffer {
            kind,
            id,
            size: data.len(),
        });
        Ok(())
    }

    fn upload_texture(
        &mut self,
        id: GpuId,
        desc: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> BackendResult<()> {
        if self.take_failure(FailurePoint::Upload(ResourceKind::Texture)) {
            return Err(BackendError::UploadFailed {
                kind: ResourceKind::Texture.label(),
                reason: "injected failure".into(),
            });
        }
        if let Some(data) = data {
            if data.len() < desc.size_in_bytes() {
                return Err(BackendError::UploadFailed {
                    kind: ResourceKind::Texture.label(),
                    reason: format!(
                        "{:?}: expected {} bytes, got {}",
                        desc.label,
                        desc.size_in_bytes(),
                        data.len()
                    ),
                });
            }
        }
        self.record(BackendCommand::UploadTexture {
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        Ok(())
    }

    fn compile_program(&mut self, id: GpuId, vertex: &str, fragment: &str) -> BackendResult<()> {
        if vertex.trim().is_empty() || fragment.trim().is_empty() {
            return Err(BackendError::ProgramCompilationFailed(format!(
                "program {:?} has an empty stage",
                id
            )));
        }
        self.record(BackendCommand::CompileProgram(id));
        Ok(())
    }

    fn attach_frame_buffer(
        &mut self,
        id: GpuId,
        colors: &[GpuId],
        depth: Option<GpuId>,
    ) -> BackendResult<()> {
        if colors.is_empty() && depth.is_none() {
            return Err(BackendError::IncompleteFrameBuffer(format!(
                "frame buffer {:?} has no attachments",
                id
            )));
        }
        self.record(BackendCommand::AttachFrameBuffer {
            id,
            colors: colors.to_vec(),
            depth,
        });
        Ok(())
    }

    fn bind_frame_buffer(&mut self, id: Option<GpuId>, width: u32, height: u32, _clear: ClearValue) {
        self.record(BackendCommand::BindFrameBuffer { id, width, height });
    }

    fn set_uniform(&mut self, program: GpuId, name: &str, value: &UniformValue) {
        self.record(BackendCommand::SetUniform {
            program,
            name: name.to_string(),
            value: *value,
        });
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.record(BackendCommand::SetDepthState(state));
    }

    fn set_alpha_state(&mut self, state: AlphaState) {
        self.record(BackendCommand::SetAlphaState(state));
    }

    fn draw_indexed(&mut self, topology: PrimitiveTopology, index_count: u32) -> BackendResult<()> {
        if self.take_failure(FailurePoint::Draw) {
            return Err(BackendError::DrawFailed("injected failure".into()));
        }
        self.record(BackendCommand::DrawIndexed {
            topology,
            count: index_count,
        });
        Ok(())
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, vertex_count: u32) -> BackendResult<()> {
        if self.take_failure(FailurePoint::Draw) {
            return Err(BackendError::DrawFailed("injected failure".into()));
        }
        self.record(BackendCommand::DrawArrays {
            topology,
            count: vertex_count,
        });
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        indexed: bool,
        instance_count: u32,
    ) -> BackendResult<()> {
        if self.take_failure(FailurePoint::Draw) {
            return Err(BackendError::DrawFailed("injected failure".into()));
        }
        self.record(BackendCommand::DrawInstanced {
            topology,
            count,
            indexed,
            instances: instance_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_per_kind() {
        let mut backend = HeadlessBackend::default();
        assert_eq!(backend.generate_id(ResourceKind::Texture).unwrap(), GpuId(1));
        assert_eq!(backend.generate_id(ResourceKind::Texture).unwrap(), GpuId(2));
        assert_eq!(
            backend.generate_id(ResourceKind::VertexBuffer).unwrap(),
            GpuId(1)
        );
    }

    #[test]
    fn test_delete_releases_identity() {
        let mut backend = HeadlessBackend::default();
        let id = backend.generate_id(ResourceKind::IndexBuffer).unwrap();
        assert!(backend.is_live(ResourceKind::IndexBuffer, id));

        backend.delete_ids(ResourceKind::IndexBuffer, &[id]);
        assert!(!backend.is_live(ResourceKind::IndexBuffer, id));
        assert_eq!(backend.live_count(ResourceKind::IndexBuffer), 0);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut backend = HeadlessBackend::default();
        backend.inject_failure(FailurePoint::Draw);

        assert!(backend.draw_arrays(PrimitiveTopology::TriangleList, 3).is_err());
        assert!(backend.draw_arrays(PrimitiveTopology::TriangleList, 3).is_ok());
        assert_eq!(backend.draw_count(), 1);
    }

    #[test]
    fn test_texture_upload_checks_data_size() {
        let mut backend = HeadlessBackend::default();
        let id = backend.generate_id(ResourceKind::Texture).unwrap();
        let desc = TextureDescriptor {
            width: 2,
            height: 2,
            ..Default::default()
        };
        assert!(backend.upload_texture(id, &desc, Some(&[0u8; 4])).is_err());
        assert!(backend.upload_texture(id, &desc, Some(&[0u8; 16])).is_ok());
    }
}
