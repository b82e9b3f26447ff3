//! 运行时配置：环境变量与 YAML 文件。
//!
//! Runtime configuration.
//!
//! Configuration is read once (from the environment or a YAML file) and then
//! handed to the builders; nothing below this layer reads the environment
//! except the transport's tuning knobs.

use crate::job::PollOptions;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.runpod.ai/v2";
pub const DEFAULT_INPUT_PREFIX: &str = "qwen3-tts/input";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection details for the S3-compatible durable store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "auto".to_string()
}

impl StoreConfig {
    /// Read the `R2_*` variables. Any missing piece means "no store".
    pub fn from_env() -> Option<Self> {
        let endpoint_url = non_empty_var("R2_ENDPOINT_URL").or_else(|| {
            non_empty_var("R2_ACCOUNT_ID")
                .map(|account| format!("https://{}.r2.cloudflarestorage.com", account))
        })?;
        Some(Self {
            endpoint_url,
            access_key_id: non_empty_var("R2_ACCESS_KEY_ID")?,
            secret_access_key: non_empty_var("R2_SECRET_ACCESS_KEY")?,
            bucket_name: non_empty_var("R2_BUCKET_NAME")?,
            region: non_empty_var("R2_REGION").unwrap_or_else(default_region),
        })
    }

    /// A config with any blank field is treated as absent.
    pub fn is_complete(&self) -> bool {
        !self.endpoint_url.trim().is_empty()
            && !self.access_key_id.trim().is_empty()
            && !self.secret_access_key.trim().is_empty()
            && !self.bucket_name.trim().is_empty()
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

/// HTTP client tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    /// Ceiling for requests that move audio bodies (uploads, downloads).
    pub transfer_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub proxy_url: Option<String>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            transfer_timeout_secs: 300,
            pool_max_idle_per_host: 32,
            proxy_url: None,
            user_agent: format!("remote-tts-runtime/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Everything needed to drive the remote worker.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub http: TransportConfig,
    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_input_prefix() -> String {
    DEFAULT_INPUT_PREFIX.to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint_id: None,
            api_base_url: default_api_base_url(),
            store: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            http: TransportConfig::default(),
            input_prefix: default_input_prefix(),
        }
    }
}

impl std::fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint_id", &self.endpoint_id)
            .field("api_base_url", &self.api_base_url)
            .field("store", &self.store)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("http", &self.http)
            .field("input_prefix", &self.input_prefix)
            .finish()
    }
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty_var("RUNPOD_API_KEY"),
            endpoint_id: non_empty_var("RUNPOD_QWEN3_TTS_ENDPOINT_ID"),
            api_base_url: non_empty_var("RUNPOD_API_BASE_URL").unwrap_or(defaults.api_base_url),
            store: StoreConfig::from_env(),
            poll_interval_secs: parsed_var("TTS_POLL_INTERVAL_SECS")
                .unwrap_or(defaults.poll_interval_secs),
            timeout_secs: parsed_var("TTS_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            http: defaults.http,
            input_prefix: defaults.input_prefix,
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&raw).map_err(|e| {
            Error::validation_with_context(
                format!("invalid config file: {}", e),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config"),
            )
        })
    }

    /// Fails fast when the worker credential or endpoint is absent.
    pub fn require_credentials(&self) -> Result<(&str, &str)> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::configuration_missing("RUNPOD_API_KEY not set", "api_key"))?;
        let endpoint_id = self
            .endpoint_id
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_missing(
                    "RUNPOD_QWEN3_TTS_ENDPOINT_ID not set",
                    "endpoint_id",
                )
            })?;
        Ok((api_key, endpoint_id))
    }

    /// The store config, if present and complete.
    pub fn usable_store(&self) -> Option<&StoreConfig> {
        self.store.as_ref().filter(|s| s.is_complete())
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions::new(
            Duration::from_secs(self.timeout_secs.max(1)),
            Duration::from_secs(self.poll_interval_secs.max(1)),
        )
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}
