//! # remote-tts-runtime
//!
//! 远程 GPU 语音合成任务的编排运行时：暂存参考音频、提交任务、在截止时间内轮询、取回结果并清理临时对象。
//!
//! Orchestration runtime for remote speech-synthesis jobs running on a
//! serverless GPU worker pool.
//!
//! ## Overview
//!
//! One [`Orchestrator::synthesize`] call validates a request, stages any local
//! reference audio through an ordered list of transfer tiers, submits the job,
//! polls it under a deadline, materializes the output to disk and deletes the
//! transient durable-store objects it created. Failures come back as a
//! structured [`SynthesisResult`] carrying a stable reason token.
//!
//! ## Key Features
//!
//! - **Tiered transfer**: durable S3-compatible store first, anonymous drop hosts as fallback
//! - **Deadline-bounded polling**: transient status errors retried until the deadline
//! - **Prioritized retrieval**: store key, then URL, then inline base64
//! - **Guaranteed cleanup**: best-effort deletes on every exit path
//! - **Batching**: bounded-concurrency [`Orchestrator::synthesize_batch`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_tts_runtime::{Orchestrator, RunnerConfig, SynthesisRequest};
//!
//! #[tokio::main]
//! async fn main() -> remote_tts_runtime::Result<()> {
//!     let config = RunnerConfig::from_env();
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let request = SynthesisRequest::preset("Hello world", "Ryan").with_language("English");
//!     let result = orchestrator
//!         .synthesize(&request, "hello.mp3".as_ref(), config.poll_options())
//!         .await;
//!     println!("success={} duration={:?}", result.success, result.duration_seconds);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | End-to-end synthesis operation, cleanup and batching |
//! | [`job`] | Job submission and polling |
//! | [`transfer`] | Ordered transfer tiers with fallback |
//! | [`storage`] | S3-compatible object store with SigV4 signing |
//! | [`retrieve`] | Output materialization |
//! | [`media`] | Audio duration probes |
//! | [`pool`] | Process-wide resource pool |
//! | [`config`] | Environment and YAML configuration |
//! | [`types`] | Request and result types |
//! | [`voices`] | Built-in speakers and languages |

pub mod config;
pub mod job;
pub mod media;
pub mod orchestrator;
pub mod pool;
pub mod retrieve;
pub mod storage;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod voices;

pub use config::{RunnerConfig, StoreConfig, TransportConfig};
pub use job::{JobClient, JobClientBuilder, JobStatus, OutputDescriptor, PollOptions};
pub use orchestrator::{BatchItem, Orchestrator, OrchestratorBuilder};
pub use retrieve::ResultRetriever;
pub use storage::{ObjectStore, S3Store};
pub use transfer::{TierSelector, TransferHandle, TransferTier};
pub use transport::HttpTransport;
pub use types::{
    AudioDuration, AudioFormat, ReferenceAudio, SynthesisRequest, SynthesisResult, VoiceSelection,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
