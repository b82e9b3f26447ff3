use crate::transfer::ProviderFailure;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.ref_text", "RUNPOD_API_KEY")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., response body excerpt)
    pub details: Option<String>,
    /// Source of the error (e.g., "job_client", "s3_store")
    pub source: Option<String>,
    /// HTTP status code, when the error came from a remote response
    pub status_code: Option<u16>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }
}

/// Unified error type for the synthesis runtime.
///
/// Variants follow the failure taxonomy callers act on; transport and I/O
/// variants exist for plumbing and are usually converted before they reach
/// the orchestrator's result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration missing: {message}{}", format_context(.context))]
    ConfigurationMissing {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Job submission failed: {message}{}", format_context(.context))]
    SubmissionFailed {
        message: String,
        context: ErrorContext,
    },

    #[error("Job {job_id} timed out after {}s (last status: {last_status})", .elapsed.as_secs())]
    TimedOut {
        job_id: String,
        elapsed: Duration,
        last_status: String,
    },

    #[error("Job {job_id} failed: {message}")]
    RemoteJobFailed { job_id: String, message: String },

    #[error("No retrievable output: {message}")]
    NoRetrievableOutput { message: String },

    #[error("All transfer providers failed for {}: {}", .path.display(), format_failures(.failures))]
    AllProvidersFailed {
        path: PathBuf,
        failures: Vec<ProviderFailure>,
    },

    #[error("Object store error: {message}{}", format_context(.context))]
    Storage {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Flat classification of [`Error`], used as the stable reason token in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    ConfigurationMissing,
    Validation,
    SubmissionFailed,
    TimedOut,
    RemoteJobFailed,
    NoRetrievableOutput,
    AllProvidersFailed,
    Storage,
    Transport,
    Io,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "ConfigurationMissing",
            Self::Validation => "Validation",
            Self::SubmissionFailed => "SubmissionFailed",
            Self::TimedOut => "TimedOut",
            Self::RemoteJobFailed => "RemoteJobFailed",
            Self::NoRetrievableOutput => "NoRetrievableOutput",
            Self::AllProvidersFailed => "AllProvidersFailed",
            Self::Storage => "Storage",
            Self::Transport => "Transport",
            Self::Io => "Io",
            Self::Serialization => "Serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(status) = ctx.status_code {
        parts.push(format!("status: {}", status));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn configuration_missing(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Error::ConfigurationMissing {
            message: msg.into(),
            context: ErrorContext::new().with_field_path(field),
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn submission_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::SubmissionFailed {
            message: msg.into(),
            context,
        }
    }

    pub fn storage_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Storage {
            message: msg.into(),
            context,
        }
    }

    pub fn no_output(msg: impl Into<String>) -> Self {
        Error::NoRetrievableOutput {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::SubmissionFailed { .. } => ErrorKind::SubmissionFailed,
            Error::TimedOut { .. } => ErrorKind::TimedOut,
            Error::RemoteJobFailed { .. } => ErrorKind::RemoteJobFailed,
            Error::NoRetrievableOutput { .. } => ErrorKind::NoRetrievableOutput,
            Error::AllProvidersFailed { .. } => ErrorKind::AllProvidersFailed,
            Error::Storage { .. } => ErrorKind::Storage,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::ConfigurationMissing { context, .. }
            | Error::Validation { context, .. }
            | Error::SubmissionFailed { context, .. }
            | Error::Storage { context, .. } => Some(context),
            _ => None,
        }
    }
}
