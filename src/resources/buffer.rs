//! Vertex, index and instanced buffers

use bytemuck::Pod;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::catalog::{GraphicsResource, ResourceKey, Uploadable};

/// Raw buffer contents plus the number of elements they hold
#[derive(Debug, Clone)]
pub struct BufferObject {
    key: ResourceKey,
    version: u64,
    kind: ResourceKind,
    data: Vec<u8>,
    count: u32,
}

impl BufferObject {
    fn from_slice<T: Pod>(kind: ResourceKind, items: &[T]) -> Self {
        Self {
            key: ResourceKey::next(),
            version: 0,
            kind,
            data: bytemuck::cast_slice(items).to_vec(),
            count: items.len() as u32,
        }
    }

    pub fn vertices(vertices: &[Vertex]) -> Self {
        Self::from_slice(ResourceKind::VertexBuffer, vertices)
    }

    pub fn indices(indices: &[u32]) -> Self {
        Self::from_slice(ResourceKind::IndexBuffer, indices)
    }

    /// Per-instance attributes (for example world matrices)
    pub fn instanced<T: Pod>(items: &[T]) -> Self {
        Self::from_slice(ResourceKind::InstancedBuffer, items)
    }

    /// Number of elements stored
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Replace the contents, keeping the buffer kind
    pub fn update<T: Pod>(&mut self, items: &[T]) {
        self.data = bytemuck::cast_slice(items).to_vec();
        self.count = items.len() as u32;
        self.version += 1;
    }
}

impl GraphicsResource for BufferObject {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn key(&self) -> ResourceKey {
        self.key
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn size_in_bytes(&self) -> usize {
        self.data.len()
    }
}

impl Uploadable for BufferObject {
    fn upload(&self, backend: &mut dyn GraphicsBackend, id: GpuId) -> BackendResult<()> {
        backend.upload_buffer(self.kind, id, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn test_index_buffer_size() {
        let buffer = BufferObject::indices(&[0, 1, 2, 2, 3, 0]);
        assert_eq!(buffer.count(), 6);
        assert_eq!(buffer.size_in_bytes(), 24);
        assert_eq!(buffer.kind(), ResourceKind::IndexBuffer);
    }

    #[test]
    fn test_update_marks_dirty() {
        let mut buffer = BufferObject::instanced(&[Mat4::IDENTITY]);
        buffer.update(&[Mat4::IDENTITY, Mat4::IDENTITY]);
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.size_in_bytes(), 128);
    }
}
