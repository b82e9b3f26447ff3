//! Synthesis result types.

use crate::{Error, ErrorKind};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Frame rate used by downstream timeline consumers.
pub const TIMELINE_FPS: u32 = 30;

/// Measured duration of a produced clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioDuration {
    /// Seconds, rounded to two decimals.
    pub seconds: f64,
    /// Whole frames at [`TIMELINE_FPS`], truncated.
    pub frames: u64,
}

impl AudioDuration {
    /// Non-positive or non-finite values mean the length is unknown.
    pub fn from_seconds(raw: f64) -> Option<Self> {
        if !raw.is_finite() || raw <= 0.0 {
            return None;
        }
        Some(Self {
            seconds: (raw * 100.0).round() / 100.0,
            frames: (raw * TIMELINE_FPS as f64) as u64,
        })
    }
}

/// Outcome of one orchestrated synthesis.
///
/// Failures never carry an output path, so a partially written file is never
/// reported as usable output.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip)]
    pub elapsed: Duration,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_frames_30fps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub script_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SynthesisResult {
    pub fn succeeded(
        output: PathBuf,
        elapsed: Duration,
        duration: Option<AudioDuration>,
        job_id: Option<String>,
        script_chars: usize,
    ) -> Self {
        Self {
            success: true,
            output: Some(output),
            elapsed,
            elapsed_seconds: round_millis(elapsed),
            duration_seconds: duration.map(|d| d.seconds),
            duration_frames_30fps: duration.map(|d| d.frames),
            job_id,
            script_chars,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(
        err: &Error,
        elapsed: Duration,
        job_id: Option<String>,
        script_chars: usize,
    ) -> Self {
        Self {
            success: false,
            output: None,
            elapsed,
            elapsed_seconds: round_millis(elapsed),
            duration_seconds: None,
            duration_frames_30fps: None,
            job_id,
            script_chars,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
        }
    }

    /// Stable reason token for failures (`"TimedOut"`, `"RemoteJobFailed"`, ...).
    pub fn reason(&self) -> Option<&'static str> {
        self.error_kind.map(|k| k.as_str())
    }
}

fn round_millis(d: Duration) -> f64 {
    (d.as_secs_f64() * 1000.0).round() / 1000.0
}
