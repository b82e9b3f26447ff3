//! 持久对象存储：上传、预签名下载链接、下载、删除。
//!
//! Durable object store capability.
//!
//! The orchestrator only ever talks to [`ObjectStore`]; [`S3Store`] is the
//! production implementation for S3-compatible buckets (Cloudflare R2 by
//! default).

pub mod s3;
pub mod sigv4;

pub use s3::S3Store;

use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Lifetime of presigned fetch URLs handed to the worker.
pub const PRESIGN_TTL: Duration = Duration::from_secs(2 * 3600);

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `key`.
    async fn put(&self, local_path: &Path, key: &str) -> Result<()>;

    /// A time-boxed GET URL for `key`. Computed locally, no network call.
    fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String>;

    /// Download `key` to `dest`, returning the number of bytes written.
    async fn download(&self, key: &str, dest: &Path) -> Result<u64>;

    /// Delete `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// `{prefix}/{8 hex chars}_{file name}`; the random part keeps concurrent
/// operations sharing one prefix from colliding.
pub fn object_key(prefix: &str, local_path: &Path) -> String {
    let file_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());
    let id = uuid::Uuid::new_v4().simple().to_string();
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}_{}", &id[..8], file_name)
    } else {
        format!("{}/{}_{}", prefix, &id[..8], file_name)
    }
}

/// Content type sent with uploads, guessed from the extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
