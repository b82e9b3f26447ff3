//! 远程任务：提交与轮询。
//!
//! # Remote Jobs
//!
//! Submission and deadline-bounded polling against the serverless worker
//! API (`POST /run`, `GET /status/{id}`).

mod client;
mod types;

pub use client::{JobClient, JobClientBuilder};
pub use types::{
    Endpoint, JobHandle, JobInput, JobResult, JobStatus, OutputDescriptor, OutputSink,
    PollOptions, RemoteState, StatusResponse,
};
