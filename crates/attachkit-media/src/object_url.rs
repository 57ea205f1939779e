use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use attachkit_core::FileBlob;
use tracing::debug;

pub const OBJECT_URL_PREFIX: &str = "blob:attachkit/";

/// Process-local table of reference URLs pointing at in-memory files.
///
/// Every URL handed out by [`ObjectUrlRegistry::create`] keeps its file
/// alive until [`ObjectUrlRegistry::revoke`] is called.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<Mutex<HashMap<String, FileBlob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, FileBlob>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create(&self, file: &FileBlob) -> String {
        let url = format!("{OBJECT_URL_PREFIX}{}", uuid::Uuid::new_v4());
        self.entries().insert(url.clone(), file.clone());
        debug!("created {url} for {}", file.name());
        url
    }

    pub fn resolve(&self, url: &str) -> Option<FileBlob> {
        self.entries().get(url).cloned()
    }

    /// Release a reference URL. Returns false if it was unknown or already revoked.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.entries().remove(url).is_some();
        if removed {
            debug!("revoked {url}");
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}

pub fn is_object_url(url: &str) -> bool {
    url.starts_with(OBJECT_URL_PREFIX)
}
