//! Displayable result resources.
//!
//! A result image lives outside the session (a file, a texture, a cache
//! entry). The session only ever holds an [`EditResult`], an owned handle that
//! revokes its resource exactly once: on [`EditResult::release`] or on drop.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_types::ResourceId;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Opaque reference handed to the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub mime: String,
    /// Where the collaborator can load the image from.
    pub uri: String,
}

pub trait ResourceStore: Send + Sync {
    fn publish(&self, bytes: Vec<u8>, mime: &str) -> io::Result<ResourceRef>;

    fn read(&self, resource: &ResourceRef) -> io::Result<Vec<u8>>;

    /// Free the resource. Revoking an unknown resource is logged, not fatal.
    fn revoke(&self, resource: &ResourceRef);
}

/// Owned handle to a published result image.
pub struct EditResult {
    resource: ResourceRef,
    store: Arc<dyn ResourceStore>,
    received_at: DateTime<Utc>,
    released: bool,
}

impl EditResult {
    pub fn new(resource: ResourceRef, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            resource,
            store,
            received_at: Utc::now(),
            released: false,
        }
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn id(&self) -> ResourceId {
        self.resource.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        self.store.read(&self.resource)
    }

    /// Revoke the underlying resource.
    pub fn release(mut self) {
        self.revoke_once();
    }

    fn revoke_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        tracing::debug!(id = self.resource.id.0, uri = %self.resource.uri, "releasing result");
        self.store.revoke(&self.resource);
    }
}

impl Drop for EditResult {
    fn drop(&mut self) {
        self.revoke_once();
    }
}

impl std::fmt::Debug for EditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditResult")
            .field("resource", &self.resource)
            .field("received_at", &self.received_at)
            .field("released", &self.released)
            .finish()
    }
}

/// Keeps result images in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    entries: Mutex<HashMap<ResourceId, Vec<u8>>>,
    revoked: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources published and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.lock().contains_key(&id)
    }
}

impl ResourceStore for MemoryStore {
    fn publish(&self, bytes: Vec<u8>, mime: &str) -> io::Result<ResourceRef> {
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.entries.lock().insert(id, bytes);
        Ok(ResourceRef {
            id,
            mime: mime.to_string(),
            uri: format!("memory://result/{}", id.0),
        })
    }

    fn read(&self, resource: &ResourceRef) -> io::Result<Vec<u8>> {
        self.entries
            .lock()
            .get(&resource.id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "result was released"))
    }

    fn revoke(&self, resource: &ResourceRef) {
        if self.entries.lock().remove(&resource.id).is_some() {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        } else {
            tracing::warn!(id = resource.id.0, "revoke of unknown result");
        }
    }
}

/// Writes each result to its own file in a private temporary directory.
///
/// The directory and anything left in it are removed when the store drops.
#[derive(Debug)]
pub struct TempDirStore {
    dir: TempDir,
    next_id: AtomicU64,
}

impl TempDirStore {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("retouch-results").tempdir()?;
        Ok(Self {
            dir,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn path_of(&self, resource: &ResourceRef) -> PathBuf {
        self.dir
            .path()
            .join(format!("result-{}.{}", resource.id.0, extension_for(&resource.mime)))
    }
}

impl ResourceStore for TempDirStore {
    fn publish(&self, bytes: Vec<u8>, mime: &str) -> io::Result<ResourceRef> {
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut resource = ResourceRef {
            id,
            mime: mime.to_string(),
            uri: String::new(),
        };
        let path = self.path_of(&resource);
        fs::write(&path, bytes)?;
        resource.uri = path.to_string_lossy().to_string();
        Ok(resource)
    }

    fn read(&self, resource: &ResourceRef) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(resource))
    }

    fn revoke(&self, resource: &ResourceRef) {
        let path = self.path_of(resource);
        if let Err(err) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), "failed to remove result file: {err}");
        }
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
