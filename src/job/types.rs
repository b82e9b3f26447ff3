//! Job protocol types: wire bodies, handles, statuses and output descriptors.

use crate::config::StoreConfig;
use crate::types::{ReferenceAudio, SynthesisRequest, VoiceSelection};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline and cadence of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub deadline: Duration,
    pub interval: Duration,
}

impl PollOptions {
    pub fn new(deadline: Duration, interval: Duration) -> Self {
        Self { deadline, interval }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// A serverless endpoint: `{base_url}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub id: String,
    pub base_url: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.id)
    }

    pub fn run_url(&self) -> String {
        format!("{}/run", self.url())
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/status/{}", self.url(), job_id)
    }
}

/// A submitted job. Dead once a terminal status has been observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub endpoint: Endpoint,
}

/// Local view of a job's lifecycle.
///
/// `TimedOut` is synthesized locally when the poll deadline passes; the
/// remote side never reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        }
    }

    /// Move to `next` unless the job is already terminal.
    pub fn advance(self, next: JobStatus) -> JobStatus {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status token reported by the worker API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    InQueue,
    InProgress,
    Completed,
    Failed,
    /// Anything else (e.g. `CANCELLED`); treated as non-terminal.
    Other(String),
}

impl RemoteState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "IN_QUEUE" => Self::InQueue,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Local status, or `None` for tokens that carry no lifecycle meaning.
    pub fn to_status(&self) -> Option<JobStatus> {
        match self {
            Self::InQueue => Some(JobStatus::Queued),
            Self::InProgress => Some(JobStatus::Running),
            Self::Completed => Some(JobStatus::Completed),
            Self::Failed => Some(JobStatus::Failed),
            Self::Other(_) => None,
        }
    }
}

/// `r2` block telling the worker where to upload its result.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OutputSink {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

impl From<&StoreConfig> for OutputSink {
    fn from(cfg: &StoreConfig) -> Self {
        Self {
            endpoint_url: cfg.endpoint_url.clone(),
            access_key_id: cfg.access_key_id.clone(),
            secret_access_key: cfg.secret_access_key.clone(),
            bucket_name: cfg.bucket_name.clone(),
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket_name", &self.bucket_name)
            .finish_non_exhaustive()
    }
}

/// The `input` object of a `/run` submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInput {
    pub text: String,
    pub mode: String,
    pub language: String,
    pub output_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<OutputSink>,
}

impl JobInput {
    /// Build the wire input. In clone mode with a local reference file,
    /// `staged_ref_url` must carry the URL produced by the transfer tiers.
    pub fn from_request(request: &SynthesisRequest, staged_ref_url: Option<&str>) -> Result<Self> {
        let language = request
            .canonical_language()
            .unwrap_or(crate::voices::DEFAULT_LANGUAGE)
            .to_string();
        let mut input = Self {
            text: request.text.clone(),
            mode: request.voice.wire_mode().to_string(),
            language,
            output_format: request.format.as_str().to_string(),
            speaker: None,
            instruct: None,
            ref_audio_url: None,
            ref_text: None,
            r2: None,
        };
        match &request.voice {
            VoiceSelection::Preset { speaker, instruct } => {
                input.speaker = Some(speaker.clone());
                input.instruct = instruct.clone().filter(|i| !i.trim().is_empty());
            }
            VoiceSelection::Clone {
                reference,
                transcript,
            } => {
                let url = match (reference, staged_ref_url) {
                    (_, Some(staged)) => staged.to_string(),
                    (ReferenceAudio::Url(url), None) => url.clone(),
                    (ReferenceAudio::Local(path), None) => {
                        return Err(Error::validation_with_context(
                            format!("reference audio {} has not been staged", path.display()),
                            ErrorContext::new()
                                .with_field_path("request.ref_audio")
                                .with_source("job_input"),
                        ))
                    }
                };
                input.ref_audio_url = Some(url);
                input.ref_text = Some(transcript.clone());
            }
        }
        Ok(input)
    }

    pub fn with_output_sink(mut self, sink: Option<OutputSink>) -> Self {
        self.r2 = sink;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunRequest<'a> {
    pub input: &'a JobInput,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `GET /status/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Every representation the worker may have used for its result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputDescriptor {
    #[serde(default, rename = "r2_key")]
    pub store_key: Option<String>,
    #[serde(default, rename = "audio_url")]
    pub url: Option<String>,
    #[serde(default, rename = "audio_base64")]
    pub inline_base64: Option<String>,
    /// Duration measured by the worker, if it reported one.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl OutputDescriptor {
    pub fn from_store_key(key: impl Into<String>) -> Self {
        Self {
            store_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_inline(data: impl Into<String>) -> Self {
        Self {
            inline_base64: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.store_key.is_none() && self.url.is_none() && self.inline_base64.is_none()
    }

    /// Names of the populated representations, for diagnostics.
    pub fn available(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.store_key.is_some() {
            out.push("r2_key");
        }
        if self.url.is_some() {
            out.push("audio_url");
        }
        if self.inline_base64.is_some() {
            out.push("audio_base64");
        }
        out
    }
}

/// A job observed in a terminal remote state.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub handle: JobHandle,
    pub status: JobStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl JobResult {
    pub(crate) fn from_status(
        handle: JobHandle,
        status: JobStatus,
        response: StatusResponse,
        elapsed: Duration,
    ) -> Self {
        Self {
            handle,
            status,
            output: response.output,
            error: response.error.map(|e| value_to_message(&e)),
            elapsed,
        }
    }

    /// The completed job's output, or `RemoteJobFailed` with the worker's
    /// message (top-level `error`, then `output.error`, then a generic one).
    pub fn into_output(self) -> Result<OutputDescriptor> {
        let output_error = self
            .output
            .as_ref()
            .and_then(|o| o.get("error"))
            .filter(|e| !e.is_null())
            .map(value_to_message);

        if self.status != JobStatus::Completed {
            return Err(Error::RemoteJobFailed {
                job_id: self.handle.id,
                message: self
                    .error
                    .or(output_error)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        if let Some(message) = output_error {
            return Err(Error::RemoteJobFailed {
                job_id: self.handle.id,
                message,
            });
        }
        match self.output {
            Some(value @ serde_json::Value::Object(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(Error::no_output(format!(
                "unexpected output shape: {}",
                crate::transport::truncate(&other.to_string(), 200)
            ))),
            None => Err(Error::no_output("completed job carried no output")),
        }
    }
}

fn value_to_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
