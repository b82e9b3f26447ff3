//! Job API client.

use super::types::{
    Endpoint, JobHandle, JobInput, JobResult, JobStatus, OutputSink, PollOptions, RemoteState,
    RunRequest, RunResponse, StatusResponse,
};
use crate::config::{StoreConfig, TransportConfig, DEFAULT_API_BASE_URL};
use crate::transport::{truncate, HttpTransport};
use crate::types::SynthesisRequest;
use crate::{Error, ErrorContext, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Client for the serverless job API.
#[derive(Clone)]
pub struct JobClient {
    transport: HttpTransport,
    endpoint: Endpoint,
    api_key: String,
    output_sink: Option<OutputSink>,
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient")
            .field("endpoint", &self.endpoint)
            .field("output_sink", &self.output_sink)
            .finish_non_exhaustive()
    }
}

impl JobClient {
    pub fn builder() -> JobClientBuilder {
        JobClientBuilder::new()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn has_output_sink(&self) -> bool {
        self.output_sink.is_some()
    }

    /// Submit one synthesis job.
    ///
    /// `staged_ref_url` is the fetchable URL of a locally staged reference
    /// recording (clone mode only).
    pub async fn submit(
        &self,
        request: &SynthesisRequest,
        staged_ref_url: Option<&str>,
    ) -> Result<JobHandle> {
        let input = JobInput::from_request(request, staged_ref_url)?
            .with_output_sink(self.output_sink.clone());
        self.submit_input(&input).await
    }

    /// Submit a prebuilt wire input as-is.
    pub async fn submit_input(&self, input: &JobInput) -> Result<JobHandle> {
        let url = self.endpoint.run_url();
        debug!(
            endpoint = self.endpoint.id.as_str(),
            mode = input.mode.as_str(),
            chars = input.text.chars().count(),
            "submitting job"
        );
        let request = self
            .transport
            .client()
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&RunRequest { input });
        let response = self.transport.send(request).await.map_err(|e| {
            Error::submission_with_context(
                format!("request to {} failed: {}", url, e),
                ErrorContext::new().with_source("job_client"),
            )
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::submission_with_context(
                format!("failed to read submission response: {}", e),
                ErrorContext::new()
                    .with_status_code(status.as_u16())
                    .with_source("job_client"),
            )
        })?;
        if !status.is_success() {
            return Err(Error::submission_with_context(
                format!("HTTP {}", status.as_u16()),
                ErrorContext::new()
                    .with_status_code(status.as_u16())
                    .with_details(truncate(&body, 300))
                    .with_source("job_client"),
            ));
        }

        let parsed: RunResponse = serde_json::from_str(&body).map_err(|e| {
            Error::submission_with_context(
                format!("unparseable submission response: {}", e),
                ErrorContext::new()
                    .with_details(truncate(&body, 300))
                    .with_source("job_client"),
            )
        })?;
        let id = parsed
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::submission_with_context(
                    "No job ID in response",
                    ErrorContext::new()
                        .with_details(truncate(&body, 300))
                        .with_source("job_client"),
                )
            })?;

        info!(
            job_id = id.as_str(),
            status = parsed.status.as_deref().unwrap_or("unknown"),
            "job submitted"
        );
        Ok(JobHandle {
            id,
            endpoint: self.endpoint.clone(),
        })
    }

    /// One status check.
    pub async fn status(&self, handle: &JobHandle) -> Result<StatusResponse> {
        let request = self
            .transport
            .client()
            .get(handle.endpoint.status_url(&handle.id))
            .bearer_auth(&self.api_key);
        let response = self.transport.send_checked(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(crate::transport::TransportError::Http(e)))?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Poll until the job reaches a terminal remote state or the deadline
    /// passes.
    ///
    /// No request outlives the deadline and no sleep crosses it. Transient
    /// status-check failures are logged and retried; unknown remote tokens
    /// keep the loop going. On timeout the remote job is left alone.
    pub async fn poll(&self, handle: &JobHandle, options: PollOptions) -> Result<JobResult> {
        let start = Instant::now();
        let mut current = JobStatus::Queued;
        let mut last_reported: Option<String> = None;

        loop {
            let elapsed = start.elapsed();
            if elapsed >= options.deadline {
                warn!(
                    job_id = handle.id.as_str(),
                    last_status = current.as_str(),
                    elapsed_s = elapsed.as_secs_f64(),
                    "job deadline exceeded"
                );
                return Err(Error::TimedOut {
                    job_id: handle.id.clone(),
                    elapsed,
                    last_status: current.as_str().to_string(),
                });
            }
            let remaining = options.deadline - elapsed;

            match tokio::time::timeout(remaining, self.status(handle)).await {
                Ok(Ok(response)) => {
                    if last_reported.as_deref() != Some(response.status.as_str()) {
                        info!(
                            job_id = handle.id.as_str(),
                            status = response.status.as_str(),
                            elapsed_s = start.elapsed().as_secs(),
                            "job status"
                        );
                        last_reported = Some(response.status.clone());
                    }
                    let remote = RemoteState::parse(&response.status);
                    if let Some(next) = remote.to_status() {
                        current = current.advance(next);
                    }
                    if current.is_terminal() {
                        return Ok(JobResult::from_status(
                            handle.clone(),
                            current,
                            response,
                            start.elapsed(),
                        ));
                    }
                }
                Ok(Err(e)) => {
                    warn!(job_id = handle.id.as_str(), error = %e, "status check failed, will retry");
                }
                // The deadline expired mid-request; the check at the top reports it.
                Err(_) => continue,
            }

            let elapsed = start.elapsed();
            if elapsed < options.deadline {
                tokio::time::sleep(options.interval.min(options.deadline - elapsed)).await;
            }
        }
    }
}

/// Builder for [`JobClient`]. Credential and endpoint fall back to
/// `RUNPOD_API_KEY` and `RUNPOD_QWEN3_TTS_ENDPOINT_ID`.
pub struct JobClientBuilder {
    api_key: Option<String>,
    endpoint_id: Option<String>,
    base_url: Option<String>,
    output_sink: Option<StoreConfig>,
    transport: Option<HttpTransport>,
}

impl JobClientBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint_id: None,
            base_url: None,
            output_sink: None,
            transport: None,
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Ask the worker to upload results to this store instead of inlining them.
    pub fn output_sink(mut self, store: Option<StoreConfig>) -> Self {
        self.output_sink = store.filter(|s| s.is_complete());
        self
    }

    pub fn transport(mut self, transport: HttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<JobClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("RUNPOD_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::configuration_missing("RUNPOD_API_KEY not set", "api_key"))?;
        let endpoint_id = self
            .endpoint_id
            .or_else(|| std::env::var("RUNPOD_QWEN3_TTS_ENDPOINT_ID").ok())
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_missing("RUNPOD_QWEN3_TTS_ENDPOINT_ID not set", "endpoint_id")
            })?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let transport = match self.transport {
            Some(t) => t,
            None => HttpTransport::new(&TransportConfig::default())?,
        };
        Ok(JobClient {
            transport,
            endpoint: Endpoint::new(base_url, endpoint_id),
            api_key,
            output_sink: self.output_sink.as_ref().map(OutputSink::from),
        })
    }
}

impl Default for JobClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
