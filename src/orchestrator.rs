//! 编排器：校验、暂存、提交、轮询、取回、清理。
//!
//! # Orchestrator
//!
//! Composes the pieces into one synthesis operation:
//!
//! 1. validate the request locally (no network on failure)
//! 2. stage a local clone reference through the transfer tiers
//! 3. submit the job
//! 4. poll it to a terminal state under the deadline
//! 5. materialize the output and measure its duration
//! 6. delete every durable-store object the operation created
//!
//! Step 6 runs on every path. Each call owns its job handle and cleanup set;
//! only the network clients are shared, so concurrent calls are independent.

mod batch;
mod cleanup;

pub use batch::BatchItem;
pub use cleanup::CleanupSet;

use crate::config::RunnerConfig;
use crate::job::{JobClient, PollOptions};
use crate::media::ProbeChain;
use crate::retrieve::ResultRetriever;
use crate::storage::{ObjectStore, S3Store};
use crate::transfer::TierSelector;
use crate::transport::HttpTransport;
use crate::types::{AudioDuration, ReferenceAudio, SynthesisRequest, SynthesisResult, VoiceSelection};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct Orchestrator {
    jobs: JobClient,
    tiers: TierSelector,
    retriever: ResultRetriever,
    store: Option<Arc<dyn ObjectStore>>,
    probe: ProbeChain,
    input_prefix: String,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Wire everything from one config. Missing credentials fail here,
    /// before any network activity. A missing, partial or malformed store
    /// config just disables the durable tier.
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.http)?;
        Self::from_config_with_transport(config, transport)
    }

    pub fn from_config_with_transport(config: &RunnerConfig, transport: HttpTransport) -> Result<Self> {
        let (api_key, endpoint_id) = config.require_credentials()?;
        let (store, sink): (Option<Arc<dyn ObjectStore>>, _) = match config.usable_store() {
            Some(cfg) => match S3Store::new(cfg, transport.clone()) {
                Ok(s3) => (Some(Arc::new(s3) as Arc<dyn ObjectStore>), Some(cfg.clone())),
                Err(e) => {
                    warn!(error = %e, "object store unusable, durable tier disabled");
                    (None, None)
                }
            },
            None => (None, None),
        };
        let jobs = JobClient::builder()
            .api_key(api_key)
            .endpoint_id(endpoint_id)
            .base_url(config.api_base_url.clone())
            .output_sink(sink)
            .transport(transport.clone())
            .build()?;
        Self::builder()
            .job_client(jobs)
            .store(store)
            .transport(transport)
            .input_prefix(config.input_prefix.clone())
            .build()
    }

    pub fn job_client(&self) -> &JobClient {
        &self.jobs
    }

    pub fn tiers(&self) -> &TierSelector {
        &self.tiers
    }

    pub fn store(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.store.as_ref()
    }

    /// Run one synthesis operation. Never returns `Err`: every failure is
    /// folded into the result with its reason.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        output_path: &Path,
        poll: PollOptions,
    ) -> SynthesisResult {
        let start = Instant::now();
        let script_chars = request.text.chars().count();
        let mut cleanup = CleanupSet::new(self.store.clone());
        let mut job_id = None;

        let outcome = self
            .run(request, output_path, poll, &mut cleanup, &mut job_id)
            .await;
        cleanup.drain().await;

        match outcome {
            Ok(duration) => {
                info!(
                    job_id = job_id.as_deref().unwrap_or(""),
                    output = %output_path.display(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    duration_s = duration.map(|d| d.seconds),
                    "synthesis complete"
                );
                SynthesisResult::succeeded(
                    output_path.to_path_buf(),
                    start.elapsed(),
                    duration,
                    job_id,
                    script_chars,
                )
            }
            Err(e) => {
                error!(
                    job_id = job_id.as_deref().unwrap_or(""),
                    reason = e.kind().as_str(),
                    error = %e,
                    "synthesis failed"
                );
                SynthesisResult::failed(&e, start.elapsed(), job_id, script_chars)
            }
        }
    }

    async fn run(
        &self,
        request: &SynthesisRequest,
        output_path: &Path,
        poll: PollOptions,
        cleanup: &mut CleanupSet,
        job_id: &mut Option<String>,
    ) -> Result<Option<AudioDuration>> {
        request.validate()?;

        let staged_url = match &request.voice {
            VoiceSelection::Clone {
                reference: ReferenceAudio::Local(path),
                ..
            } => {
                let handle = self.tiers.stage(path, &self.input_prefix).await?;
                if let Some(key) = handle.deletable_key {
                    cleanup.register(key);
                }
                Some(handle.url)
            }
            _ => None,
        };

        let handle = self.jobs.submit(request, staged_url.as_deref()).await?;
        *job_id = Some(handle.id.clone());

        let descriptor = self.jobs.poll(&handle, poll).await?.into_output()?;
        if let Some(key) = &descriptor.store_key {
            cleanup.register(key.clone());
        }
        self.retriever.materialize(&descriptor, output_path).await?;

        // The worker reports 0.0 when its own probe failed.
        let measured = self
            .probe
            .duration(output_path)
            .await
            .and_then(AudioDuration::from_seconds);
        Ok(measured.or_else(|| descriptor.duration_seconds.and_then(AudioDuration::from_seconds)))
    }
}

/// Builder for [`Orchestrator`]. Only the job client is required.
pub struct OrchestratorBuilder {
    jobs: Option<JobClient>,
    tiers: Option<TierSelector>,
    store: Option<Arc<dyn ObjectStore>>,
    transport: Option<HttpTransport>,
    probe: Option<ProbeChain>,
    input_prefix: String,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            jobs: None,
            tiers: None,
            store: None,
            transport: None,
            probe: None,
            input_prefix: crate::config::DEFAULT_INPUT_PREFIX.to_string(),
        }
    }

    pub fn job_client(mut self, jobs: JobClient) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Replace the default tier list (durable store, litterbox, 0x0.st).
    pub fn tiers(mut self, tiers: TierSelector) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn store(mut self, store: Option<Arc<dyn ObjectStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn transport(mut self, transport: HttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn probe(mut self, probe: ProbeChain) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn input_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.input_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let jobs = self.jobs.ok_or_else(|| {
            Error::configuration_missing("a job client is required", "orchestrator.job_client")
        })?;
        let transport = match self.transport {
            Some(t) => t,
            None => HttpTransport::new(&crate::config::TransportConfig::default())?,
        };
        let tiers = self
            .tiers
            .unwrap_or_else(|| TierSelector::standard(self.store.clone(), transport.clone()));
        Ok(Orchestrator {
            jobs,
            tiers,
            retriever: ResultRetriever::new(self.store.clone(), transport),
            store: self.store,
            probe: self.probe.unwrap_or_else(ProbeChain::standard),
            input_prefix: self.input_prefix,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
