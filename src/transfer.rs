//! 分层传输：按优先级尝试持久存储与匿名文件托管。
//!
//! # Transfer Tiers
//!
//! Turns a local file into a URL the remote worker can fetch. Tiers are an
//! ordered list behind one trait; the first tier that succeeds wins and every
//! failure is recorded as a typed [`ProviderFailure`] instead of aborting.
//!
//! | Tier | Deletable | Retention |
//! |------|-----------|-----------|
//! | [`DurableStoreTier`] | yes | until deleted (presigned URL lives 2h) |
//! | [`AnonymousDropTier::litterbox`] | no | 24h |
//! | [`AnonymousDropTier::zero_x0`] | no | 30 days |

mod anonymous;
mod durable;

pub use anonymous::AnonymousDropTier;
pub use durable::DurableStoreTier;

use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A staged file: always a URL, plus the store key when the file can be deleted later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHandle {
    pub url: String,
    pub deletable_key: Option<String>,
    /// Name of the tier that produced the handle.
    pub tier: String,
}

impl TransferHandle {
    pub fn is_deletable(&self) -> bool {
        self.deletable_key.is_some()
    }
}

/// Why a single tier could not stage a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// Tier not configured (e.g. no store credentials).
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Host answered but refused or returned something unusable.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("io: {0}")]
    Io(String),
}

impl From<Error> for TierError {
    fn from(err: Error) -> Self {
        match err {
            Error::ConfigurationMissing { message, .. } => TierError::Unavailable(message),
            Error::Transport(e) => TierError::Transport(e.to_string()),
            Error::Io(e) => TierError::Io(e.to_string()),
            other => TierError::Rejected(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{tier}: {error}")]
pub struct ProviderFailure {
    pub tier: String,
    pub error: TierError,
}

#[async_trait]
pub trait TransferTier: Send + Sync {
    fn name(&self) -> &str;

    async fn stage(
        &self,
        local_path: &Path,
        prefix: &str,
    ) -> std::result::Result<TransferHandle, TierError>;
}

/// Ordered, first-success-wins list of tiers.
#[derive(Clone, Default)]
pub struct TierSelector {
    tiers: Vec<Arc<dyn TransferTier>>,
}

impl TierSelector {
    pub fn new(tiers: Vec<Arc<dyn TransferTier>>) -> Self {
        Self { tiers }
    }

    /// Durable store first (when given), then litterbox, then 0x0.st.
    pub fn standard(
        store: Option<Arc<dyn crate::storage::ObjectStore>>,
        transport: crate::transport::HttpTransport,
    ) -> Self {
        Self::new(vec![
            Arc::new(DurableStoreTier::new(store)),
            Arc::new(AnonymousDropTier::litterbox(transport.clone())),
            Arc::new(AnonymousDropTier::zero_x0(transport)),
        ])
    }

    pub fn with_tier(mut self, tier: Arc<dyn TransferTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name().to_string()).collect()
    }

    pub async fn stage(&self, local_path: &Path, prefix: &str) -> Result<TransferHandle> {
        let mut failures = Vec::new();
        for tier in &self.tiers {
            match tier.stage(local_path, prefix).await {
                Ok(handle) => {
                    info!(
                        tier = tier.name(),
                        path = %local_path.display(),
                        deletable = handle.is_deletable(),
                        "staged file"
                    );
                    return Ok(handle);
                }
                Err(error) => {
                    warn!(tier = tier.name(), error = %error, "transfer tier failed, trying next");
                    failures.push(ProviderFailure {
                        tier: tier.name().to_string(),
                        error,
                    });
                }
            }
        }
        Err(Error::AllProvidersFailed {
            path: local_path.to_path_buf(),
            failures,
        })
    }
}
