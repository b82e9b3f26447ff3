//! Media duration probing.
//!
//! A missing or unparseable duration is never an error: probes return
//! `None` and the result simply carries no duration.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait DurationProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Duration in seconds, or `None` when it cannot be determined.
    async fn duration(&self, path: &Path) -> Option<f64>;
}

/// Asks `ffprobe` for the container duration.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffprobe"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn duration(&self, path: &Path) -> Option<f64> {
        let output = tokio::process::Command::new(&self.binary)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await;
        let output = match output {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!(path = %path.display(), status = %o.status, "ffprobe exited with failure");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "ffprobe unavailable");
                return None;
            }
        };
        parse_seconds(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads the WAV header directly; only understands RIFF/WAVE files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavHeaderProbe;

#[async_trait]
impl DurationProbe for WavHeaderProbe {
    fn name(&self) -> &str {
        "wav-header"
    }

    async fn duration(&self, path: &Path) -> Option<f64> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let reader = hound::WavReader::open(&path).ok()?;
            let rate = reader.spec().sample_rate;
            if rate == 0 {
                return None;
            }
            Some(reader.duration() as f64 / rate as f64)
        })
        .await
        .ok()
        .flatten()
    }
}

/// Tries each probe in order; the first `Some` wins.
#[derive(Clone, Default)]
pub struct ProbeChain {
    probes: Vec<Arc<dyn DurationProbe>>,
}

impl ProbeChain {
    pub fn new(probes: Vec<Arc<dyn DurationProbe>>) -> Self {
        Self { probes }
    }

    /// ffprobe, then the WAV header reader.
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(FfprobeProbe::new()), Arc::new(WavHeaderProbe)])
    }

    pub async fn duration(&self, path: &Path) -> Option<f64> {
        for probe in &self.probes {
            if let Some(seconds) = probe.duration(path).await {
                debug!(probe = probe.name(), seconds, "duration probed");
                return Some(seconds);
            }
        }
        None
    }
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
}
