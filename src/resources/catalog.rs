//! GPU resource catalogs
//!
//! A [`Catalog`] maps logical resources to backend identities. Resources become
//! cataloged the first time they are bound; unloading hands the identity to a
//! pending-deletion queue that is flushed in one batch by [`Catalog::cleanup`].
//! Reclaimed identities are never handed to another resource directly: they
//! go back to the backend, and only the backend decides if a number is reused.
//!
//! Every operation accepts `Option<&R>` and treats `None` as a no-op so that
//! callers tearing down partially built state don't need to special-case it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::backend::traits::{BackendError, BackendResult, GraphicsBackend};
use crate::backend::types::{GpuId, ResourceKind};

/// Logical identity of a graphics resource, stable for the resource's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(u64);

static NEXT_RESOURCE_KEY: AtomicU64 = AtomicU64::new(1);

impl ResourceKey {
    /// Allocate a fresh key.
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Any GPU-resident object (buffer, texture, frame buffer, program).
///
/// The CPU-side data is owned by the resource; the catalog only owns the
/// mapping to a backend identity. `version` is bumped on every mutation so a
/// catalog can tell whether its uploaded copy is stale.
pub trait GraphicsResource {
    fn kind(&self) -> ResourceKind;
    fn key(&self) -> ResourceKey;
    fn version(&self) -> u64;
    fn size_in_bytes(&self) -> usize;
}

/// Resources that know how to upload themselves once they own an identity.
pub trait Uploadable: GraphicsResource {
    fn upload(&self, backend: &mut dyn GraphicsBackend, id: GpuId) -> BackendResult<()>;
}

/// Catalog error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Backend returned {kind} identity {id:?} which is still owned by the catalog")]
    IdentityAliased { kind: &'static str, id: GpuId },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    id: GpuId,
    loaded_version: Option<u64>,
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub resident: usize,
    pub pending_deletion: usize,
    pub allocated_total: u64,
    pub deleted_total: u64,
}

/// Catalog for one kind of GPU object
#[derive(Debug)]
pub struct Catalog {
    kind: ResourceKind,
    entries: HashMap<ResourceKey, CatalogEntry>,
    pending_deletion: Vec<GpuId>,
    current: Option<GpuId>,
    allocated_total: u64,
    deleted_total: u64,
}

impl Catalog {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
            pending_deletion: Vec::new(),
            current: None,
            allocated_total: 0,
            deleted_total: 0,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Allocate a new backend identity.
    ///
    /// Fails if the backend hands back an identity this catalog still owns,
    /// either for a resident resource or one waiting for deletion.
    pub fn next_resource_id<R: GraphicsResource + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: &R,
    ) -> CatalogResult<GpuId> {
        let id = backend.generate_id(self.kind)?;

        if self.owns(id) {
            log::error!(
                "{} catalog: backend reused identity {:?} for resource {:?}",
                self.kind.label(),
                id,
                resource.key()
            );
            return Err(CatalogError::IdentityAliased {
                kind: self.kind.label(),
                id,
            });
        }

        self.allocated_total += 1;
        Ok(id)
    }

    /// Make sure the resource owns an identity without touching backend
    /// binding state.
    pub fn register<R: GraphicsResource + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: Option<&R>,
    ) -> CatalogResult<Option<GpuId>> {
        match resource {
            Some(resource) => self.identity(backend, resource).map(Some),
            None => Ok(None),
        }
    }

    /// Identity owned by the resource, allocating one on first use.
    pub fn identity<R: GraphicsResource + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: &R,
    ) -> CatalogResult<GpuId> {
        if let Some(entry) = self.entries.get(&resource.key()) {
            return Ok(entry.id);
        }

        let id = self.next_resource_id(backend, resource)?;
        self.entries.insert(
            resource.key(),
            CatalogEntry {
                id,
                loaded_version: None,
            },
        );
        log::trace!(
            "{} catalog: {:?} -> {:?}",
            self.kind.label(),
            resource.key(),
            id
        );
        Ok(id)
    }

    /// Upload the resource when its backend copy is stale and return its
    /// identity.
    pub fn load_if_dirty<R: Uploadable + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: &R,
    ) -> CatalogResult<GpuId> {
        if self.is_dirty(resource) {
            self.load(backend, Some(resource))?;
        }
        self.identity(backend, resource)
    }

    /// Bind a resource, cataloging it first if needed.
    ///
    /// Binding an already bound resource only makes it current again.
    pub fn bind<R: GraphicsResource + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: Option<&R>,
    ) -> CatalogResult<Option<GpuId>> {
        let Some(id) = self.register(backend, resource)? else {
            return Ok(None);
        };

        backend.bind_object(self.kind, id);
        self.current = Some(id);
        Ok(Some(id))
    }

    /// Reverse the binding side effects. The identity is kept.
    pub fn unbind<R: GraphicsResource + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: Option<&R>,
    ) {
        let Some(id) = resource.and_then(|r| self.catalog_id(r)) else {
            return;
        };

        if self.current == Some(id) {
            backend.unbind_object(self.kind);
            self.current = None;
        }
    }

    /// Upload the resource through its own [`Uploadable`] implementation.
    pub fn load<R: Uploadable + ?Sized>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: Option<&R>,
    ) -> CatalogResult<()> {
        let Some(resource) = resource else {
            return Ok(());
        };
        self.load_with(backend, Some(resource), |backend, id| {
            resource.upload(backend, id)
        })
    }

    /// Upload the resource with a caller supplied upload routine.
    ///
    /// The resource is cataloged first when it does not own an identity yet.
    pub fn load_with<R, F>(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        resource: Option<&R>,
        upload: F,
    ) -> CatalogResult<()>
    where
        R: GraphicsResource + ?Sized,
        F: FnOnce(&mut dyn GraphicsBackend, GpuId) -> BackendResult<()>,
    {
        let Some(resource) = resource else {
            return Ok(());
        };
        let id = self.identity(backend, resource)?;

        upload(backend, id)?;

        if let Some(entry) = self.entries.get_mut(&resource.key()) {
            entry.loaded_version = Some(resource.version());
        }
        Ok(())
    }

    /// Release the identity into the pending-deletion queue.
    ///
    /// The resource itself survives and receives a new identity the next
    /// time it is bound.
    pub fn unload<R: GraphicsResource + ?Sized>(&mut self, resource: Option<&R>) {
        let Some(resource) = resource else {
            return;
        };
        self.unload_key(resource.key());
    }

    /// Release the identity for a resource that may no longer exist.
    pub fn unload_key(&mut self, key: ResourceKey) {
        if let Some(entry) = self.entries.remove(&key) {
            if self.current == Some(entry.id) {
                self.current = None;
            }
            self.pending_deletion.push(entry.id);
        }
    }

    /// Release every identity owned by this catalog.
    pub fn unload_all(&mut self) {
        self.current = None;
        self.pending_deletion
            .extend(self.entries.drain().map(|(_, entry)| entry.id));
    }

    /// Delete every pending identity in one batch.
    ///
    /// Must only run between frames, when no pass references those identities.
    pub fn cleanup(&mut self, backend: &mut dyn GraphicsBackend) {
        if self.pending_deletion.is_empty() {
            return;
        }

        log::debug!(
            "{} catalog: deleting {} identities",
            self.kind.label(),
            self.pending_deletion.len()
        );
        backend.delete_ids(self.kind, &self.pending_deletion);
        self.deleted_total += self.pending_deletion.len() as u64;
        self.pending_deletion.clear();
    }

    /// Identity currently owned by the resource, if any.
    pub fn catalog_id<R: GraphicsResource + ?Sized>(&self, resource: &R) -> Option<GpuId> {
        self.entries.get(&resource.key()).map(|e| e.id)
    }

    /// Whether the backend copy is missing or older than the resource data.
    pub fn is_dirty<R: GraphicsResource + ?Sized>(&self, resource: &R) -> bool {
        match self.entries.get(&resource.key()) {
            Some(entry) => entry.loaded_version != Some(resource.version()),
            None => true,
        }
    }

    pub fn is_resident<R: GraphicsResource + ?Sized>(&self, resource: &R) -> bool {
        self.entries.contains_key(&resource.key())
    }

    /// Identity currently bound through this catalog.
    pub fn current(&self) -> Option<GpuId> {
        self.current
    }

    pub fn pending_deletion(&self) -> &[GpuId] {
        &self.pending_deletion
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            resident: self.entries.len(),
            pending_deletion: self.pending_deletion.len(),
            allocated_total: self.allocated_total,
            deleted_total: self.deleted_total,
        }
    }

    fn owns(&self, id: GpuId) -> bool {
        self.pending_deletion.contains(&id) || self.entries.values().any(|e| e.id == id)
    }
}
