use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Durable-store objects owned by one synthesis operation.
///
/// Draining deletes every registered key and forgets it, so a second drain
/// is a no-op. Delete failures are logged and swallowed.
pub struct CleanupSet {
    store: Option<Arc<dyn ObjectStore>>,
    keys: Vec<String>,
}

impl CleanupSet {
    pub fn new(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            store,
            keys: Vec::new(),
        }
    }

    pub fn register(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns how many objects were actually deleted.
    pub async fn drain(&mut self) -> usize {
        let keys = std::mem::take(&mut self.keys);
        if keys.is_empty() {
            return 0;
        }
        let Some(store) = &self.store else {
            warn!(count = keys.len(), "no object store to clean up with; objects left in place");
            return 0;
        };
        let mut deleted = 0;
        for key in keys {
            match store.delete(&key).await {
                Ok(()) => {
                    debug!(key = key.as_str(), "cleaned up object");
                    deleted += 1;
                }
                Err(e) => warn!(key = key.as_str(), error = %e, "cleanup delete failed"),
            }
        }
        deleted
    }
}
