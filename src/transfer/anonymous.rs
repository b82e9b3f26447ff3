use super::{TierError, TransferHandle, TransferTier};
use crate::storage::content_type_for;
use crate::transport::{truncate, HttpTransport};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub const LITTERBOX_UPLOAD_URL: &str = "https://litterbox.catbox.moe/resources/internals/api.php";
pub const ZERO_X0_UPLOAD_URL: &str = "https://0x0.st";

/// Credential-less public file host. Uploads cannot be deleted; they expire
/// on the host's own retention window.
pub struct AnonymousDropTier {
    name: String,
    transport: HttpTransport,
    upload_url: String,
    file_field: String,
    fields: Vec<(String, String)>,
    retention: Duration,
}

impl AnonymousDropTier {
    pub fn new(
        name: impl Into<String>,
        transport: HttpTransport,
        upload_url: impl Into<String>,
        file_field: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            upload_url: upload_url.into(),
            file_field: file_field.into(),
            fields: Vec::new(),
            retention,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// litterbox.catbox.moe, 24h retention.
    pub fn litterbox(transport: HttpTransport) -> Self {
        Self::new(
            "litterbox",
            transport,
            LITTERBOX_UPLOAD_URL,
            "fileToUpload",
            Duration::from_secs(24 * 3600),
        )
        .with_field("reqtype", "fileupload")
        .with_field("time", "24h")
    }

    /// 0x0.st, 30 day retention.
    pub fn zero_x0(transport: HttpTransport) -> Self {
        Self::new(
            "0x0.st",
            transport,
            ZERO_X0_UPLOAD_URL,
            "file",
            Duration::from_secs(30 * 24 * 3600),
        )
    }

    /// Point the tier at another host (mirrors, tests).
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}

#[async_trait]
impl TransferTier for AnonymousDropTier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stage(
        &self,
        local_path: &Path,
        _prefix: &str,
    ) -> std::result::Result<TransferHandle, TierError> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| TierError::Io(e.to_string()))?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(content_type_for(local_path))
            .map_err(|e| TierError::Rejected(format!("invalid mime: {}", e)))?;

        let mut form = reqwest::multipart::Form::new();
        for (k, v) in &self.fields {
            form = form.text(k.clone(), v.clone());
        }
        form = form.part(self.file_field.clone(), part);

        let request = self
            .transport
            .for_transfer(self.transport.client().post(&self.upload_url).multipart(form));
        let response = self.transport.send(request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(TierError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(body.trim(), 200)
            )));
        }
        let url = body.trim();
        if !url.starts_with("http") {
            return Err(TierError::Rejected(format!(
                "unexpected response: {}",
                truncate(url, 200)
            )));
        }
        Ok(TransferHandle {
            url: url.to_string(),
            deletable_key: None,
            tier: self.name.clone(),
        })
    }
}
