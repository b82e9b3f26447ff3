//! S3-compatible store client (path-style addressing, SigV4).

use super::sigv4::{self, Signer};
use super::{content_type_for, ObjectStore};
use crate::config::StoreConfig;
use crate::transport::{stream_to_file, truncate, HttpTransport};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct S3Store {
    transport: HttpTransport,
    endpoint: Url,
    bucket: String,
    signer: Signer,
}

impl S3Store {
    /// Fails with `ConfigurationMissing` when the config is incomplete and
    /// with `Storage` when the endpoint is not a URL, so the caller can treat
    /// the store as unavailable.
    pub fn new(config: &StoreConfig, transport: HttpTransport) -> Result<Self> {
        if !config.is_complete() {
            return Err(Error::configuration_missing(
                "object store configuration is incomplete",
                "store",
            ));
        }
        let endpoint = Url::parse(config.endpoint_url.trim_end_matches('/')).map_err(|e| {
            Error::storage_with_context(
                format!("invalid store endpoint '{}': {}", config.endpoint_url, e),
                ErrorContext::new()
                    .with_field_path("store.endpoint_url")
                    .with_source("s3_store"),
            )
        })?;
        Ok(Self {
            transport,
            endpoint,
            bucket: config.bucket_name.clone(),
            signer: Signer::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                config.region.clone(),
            ),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            sigv4::uri_encode(&self.bucket, true),
            sigv4::uri_encode(key.trim_start_matches('/'), false)
        );
        Url::parse(&raw).map_err(|e| {
            Error::storage_with_context(
                format!("cannot build object url: {}", e),
                ErrorContext::new().with_field_path(key).with_source("s3_store"),
            )
        })
    }

    fn signed(
        &self,
        method: reqwest::Method,
        url: &Url,
        payload_sha256: &str,
    ) -> reqwest::RequestBuilder {
        let mut request = self.transport.client().request(method.clone(), url.clone());
        for (name, value) in self
            .signer
            .sign_headers(method.as_str(), url, payload_sha256, Utc::now())
        {
            request = request.header(name, value);
        }
        request
    }

    async fn failure(&self, op: &str, key: &str, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Error::storage_with_context(
            format!("{} {} failed", op, key),
            ErrorContext::new()
                .with_status_code(status)
                .with_details(truncate(&body, 300))
                .with_source("s3_store"),
        )
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = tokio::fs::read(local_path).await?;
        let url = self.object_url(key)?;
        let payload_hash = sigv4::sha256_hex(&body);
        let size = body.len();
        let request = self.transport.for_transfer(
            self.signed(reqwest::Method::PUT, &url, &payload_hash)
                .header("content-type", content_type_for(local_path))
                .body(body),
        );
        let response = self.transport.send(request).await?;
        if !response.status().is_success() {
            return Err(self.failure("PUT", key, response).await);
        }
        debug!(bucket = self.bucket.as_str(), key, bytes = size, "object uploaded");
        Ok(())
    }

    fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String> {
        let url = self.object_url(key)?;
        Ok(self.signer.presign("GET", &url, ttl, Utc::now()).to_string())
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<u64> {
        let url = self.object_url(key)?;
        let request = self
            .transport
            .for_transfer(self.signed(reqwest::Method::GET, &url, sigv4::EMPTY_PAYLOAD_SHA256));
        let response = self.transport.send(request).await?;
        if !response.status().is_success() {
            return Err(self.failure("GET", key, response).await);
        }
        let written = stream_to_file(response, dest).await?;
        debug!(bucket = self.bucket.as_str(), key, bytes = written, "object downloaded");
        Ok(written)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let request = self.signed(reqwest::Method::DELETE, &url, sigv4::EMPTY_PAYLOAD_SHA256);
        let response = self.transport.send(request).await?;
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            debug!(bucket = self.bucket.as_str(), key, "object deleted");
            return Ok(());
        }
        Err(self.failure("DELETE", key, response).await)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
