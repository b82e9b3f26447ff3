//! 结果取回：按优先级（存储键、URL、内联数据）落盘。
//!
//! # Result Retrieval
//!
//! Materializes a completed job's [`OutputDescriptor`] to a local file.
//! Representations are tried cheapest first: durable-store key, then URL,
//! then inline base64. The first one that succeeds wins and later ones are
//! never touched.

use crate::job::OutputDescriptor;
use crate::storage::ObjectStore;
use crate::transport::{stream_to_file, write_atomically, HttpTransport};
use crate::{Error, Result};
use base64::Engine as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which representation produced the local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Store,
    Url,
    Inline,
}

impl OutputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Url => "url",
            Self::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Materialized {
    pub source: OutputSource,
    pub bytes: u64,
}

#[derive(Clone)]
pub struct ResultRetriever {
    store: Option<Arc<dyn ObjectStore>>,
    transport: HttpTransport,
}

impl ResultRetriever {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, transport: HttpTransport) -> Self {
        Self { store, transport }
    }

    pub async fn materialize(
        &self,
        descriptor: &OutputDescriptor,
        dest: &Path,
    ) -> Result<Materialized> {
        if descriptor.is_empty() {
            return Err(Error::no_output(
                "output carries no store key, URL or inline audio",
            ));
        }

        let mut attempts = Vec::new();

        if let Some(key) = descriptor.store_key.as_deref() {
            match &self.store {
                Some(store) => match store.download(key, dest).await {
                    Ok(bytes) => return Ok(done(OutputSource::Store, bytes, dest)),
                    Err(e) => {
                        warn!(key, error = %e, "store download failed, trying next source");
                        attempts.push(format!("store: {}", e));
                    }
                },
                None => attempts.push("store: no object store configured".to_string()),
            }
        }

        if let Some(url) = descriptor.url.as_deref() {
            match self.fetch(url, dest).await {
                Ok(bytes) => return Ok(done(OutputSource::Url, bytes, dest)),
                Err(e) => {
                    warn!(url, error = %e, "url download failed, trying next source");
                    attempts.push(format!("url: {}", e));
                }
            }
        }

        if let Some(data) = descriptor.inline_base64.as_deref() {
            match write_inline(data, dest).await {
                Ok(bytes) => return Ok(done(OutputSource::Inline, bytes, dest)),
                Err(e) => {
                    warn!(error = %e, "inline audio could not be written");
                    attempts.push(format!("inline: {}", e));
                }
            }
        }

        Err(Error::no_output(attempts.join("; ")))
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let request = self.transport.for_transfer(self.transport.client().get(url));
        let response = self.transport.send_checked(request).await?;
        stream_to_file(response, dest).await
    }
}

fn done(source: OutputSource, bytes: u64, dest: &Path) -> Materialized {
    debug!(source = source.as_str(), bytes, path = %dest.display(), "output materialized");
    Materialized { source, bytes }
}

async fn write_inline(data: &str, dest: &Path) -> Result<u64> {
    let audio = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| Error::no_output(format!("invalid base64 payload: {}", e)))?;
    write_atomically(futures::stream::iter([Ok::<_, Error>(audio)]), dest).await
}
