use super::{TierError, TransferHandle, TransferTier};
use crate::storage::{object_key, ObjectStore, PRESIGN_TTL};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Stages into the durable store and hands out a presigned GET URL.
pub struct DurableStoreTier {
    store: Option<Arc<dyn ObjectStore>>,
    ttl: Duration,
}

impl DurableStoreTier {
    /// `None` means the store is not configured; the tier then reports
    /// itself unavailable on every call.
    pub fn new(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            store,
            ttl: PRESIGN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl TransferTier for DurableStoreTier {
    fn name(&self) -> &str {
        "durable-store"
    }

    async fn stage(
        &self,
        local_path: &Path,
        prefix: &str,
    ) -> std::result::Result<TransferHandle, TierError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| TierError::Unavailable("object store not configured".into()))?;
        let key = object_key(prefix, local_path);
        store.put(local_path, &key).await?;
        let url = match store.presigned_get(&key, self.ttl) {
            Ok(url) => url,
            Err(e) => {
                // Uploaded but unusable; don't leave it behind.
                if let Err(cleanup) = store.delete(&key).await {
                    tracing::warn!(key = key.as_str(), error = %cleanup, "failed to remove unusable upload");
                }
                return Err(e.into());
            }
        };
        Ok(TransferHandle {
            url,
            deletable_key: Some(key),
            tier: self.name().to_string(),
        })
    }
}
