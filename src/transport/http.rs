use crate::config::TransportConfig;
use crate::Result;
use reqwest::Proxy;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Owns the pooled `reqwest::Client`.
///
/// Cloning is cheap; clones share the same connection pool, so one transport
/// can back the job client, the object store and the drop hosts at once.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    transfer_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        // Env knobs win over the config values so deployments can tune
        // without touching config files.
        let timeout_secs = env::var("TTS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(config.timeout_secs);
        let transfer_timeout_secs = env::var("TTS_HTTP_TRANSFER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(config.transfer_timeout_secs);
        let pool_max_idle = env::var("TTS_HTTP_POOL_MAX_IDLE_PER_HOST")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.pool_max_idle_per_host);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(pool_max_idle)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        let proxy_url = env::var("TTS_PROXY_URL").ok().or_else(|| config.proxy_url.clone());
        if let Some(proxy_url) = proxy_url {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(proxy = proxy_url.as_str(), error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            transfer_timeout: Duration::from_secs(transfer_timeout_secs.max(1)),
        })
    }

    /// Wrap an existing client (tests, or callers that already own one).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            transfer_timeout: Duration::from_secs(TransportConfig::default().transfer_timeout_secs),
        }
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn transfer_timeout(&self) -> Duration {
        self.transfer_timeout
    }

    /// Give a body-carrying request the longer transfer timeout in place of
    /// the client-wide one.
    pub fn for_transfer(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.timeout(self.transfer_timeout)
    }

    /// Send a prepared request, mapping connection-level failures.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))
    }

    /// Send a request and turn non-2xx responses into [`TransportError::Status`].
    pub async fn send_checked(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(crate::Error::Transport(TransportError::Status {
            status: status.as_u16(),
            body: truncate(&body, 500),
        }))
    }
}

/// Stream a successful response body into `dest`, creating parent
/// directories. The body lands in a sibling temp file that replaces `dest`
/// only once complete, so a failed download leaves any earlier file alone.
pub(crate) async fn stream_to_file(response: reqwest::Response, dest: &Path) -> Result<u64> {
    use futures::StreamExt;

    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| crate::Error::Transport(TransportError::Http(e))));
    write_atomically(body, dest).await
}

pub(crate) async fn write_atomically<S, B>(body: S, dest: &Path) -> Result<u64>
where
    S: futures::Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut written = 0u64;
    futures::pin_mut!(body);
    let outcome: Result<()> = async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(chunk.as_ref()).await?;
            written += chunk.as_ref().len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    drop(file);
    let outcome = match outcome {
        Ok(()) => tokio::fs::rename(&partial, dest).await.map_err(crate::Error::from),
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(written)
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dest.with_file_name(format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple()))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Other(String),
}
