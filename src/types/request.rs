//! Synthesis request types.

use crate::voices;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output container requested from the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }

    /// Guess the format from an output path's extension; `.wav` means WAV,
    /// anything else falls back to MP3.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => Self::Wav,
            _ => Self::Mp3,
        }
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            other => Err(Error::validation_with_context(
                format!("unsupported output format '{}' (expected mp3 or wav)", other),
                ErrorContext::new().with_field_path("request.format"),
            )),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the clone-mode reference recording lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceAudio {
    /// Local file; staged through the transfer tiers before submission.
    Local(PathBuf),
    /// Already fetchable by the worker; sent as-is.
    Url(String),
}

impl ReferenceAudio {
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(trimmed))
        }
    }
}

/// Exactly one way of choosing the voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelection {
    Preset {
        speaker: String,
        /// Natural-language style instruction ("Speak warmly").
        instruct: Option<String>,
    },
    Clone {
        reference: ReferenceAudio,
        transcript: String,
    },
}

impl VoiceSelection {
    /// Mode token the worker expects in `input.mode`.
    pub fn wire_mode(&self) -> &'static str {
        match self {
            Self::Preset { .. } => "custom_voice",
            Self::Clone { .. } => "clone",
        }
    }

    pub fn is_clone(&self) -> bool {
        matches!(self, Self::Clone { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: VoiceSelection,
    pub language: String,
    pub format: AudioFormat,
}

impl SynthesisRequest {
    pub fn preset(text: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: VoiceSelection::Preset {
                speaker: speaker.into(),
                instruct: None,
            },
            language: voices::DEFAULT_LANGUAGE.to_string(),
            format: AudioFormat::default(),
        }
    }

    pub fn clone_voice(
        text: impl Into<String>,
        reference: ReferenceAudio,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            voice: VoiceSelection::Clone {
                reference,
                transcript: transcript.into(),
            },
            language: voices::DEFAULT_LANGUAGE.to_string(),
            format: AudioFormat::default(),
        }
    }

    /// Attach a style instruction. Ignored in clone mode.
    pub fn with_instruct(mut self, instruction: impl Into<String>) -> Self {
        if let VoiceSelection::Preset { instruct, .. } = &mut self.voice {
            let instruction = instruction.into();
            *instruct = if instruction.trim().is_empty() {
                None
            } else {
                Some(instruction)
            };
        }
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Canonical language name, if the hint is supported.
    pub fn canonical_language(&self) -> Option<&'static str> {
        voices::canonical_language(&self.language)
    }

    /// Local-only checks; never touches the network.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(invalid("text must not be empty", "request.text"));
        }
        if self.canonical_language().is_none() {
            return Err(invalid(
                format!(
                    "unsupported language '{}' (supported: {})",
                    self.language,
                    voices::SUPPORTED_LANGUAGES.join(", ")
                ),
                "request.language",
            ));
        }
        match &self.voice {
            VoiceSelection::Preset { speaker, .. } => {
                if speaker.trim().is_empty() {
                    return Err(invalid("speaker must not be empty", "request.speaker"));
                }
                if !voices::is_builtin_speaker(speaker) {
                    tracing::debug!(speaker = speaker.as_str(), "speaker is not in the built-in catalog");
                }
            }
            VoiceSelection::Clone {
                reference,
                transcript,
            } => {
                if transcript.trim().is_empty() {
                    return Err(invalid(
                        "ref_text is required for voice cloning",
                        "request.ref_text",
                    ));
                }
                match reference {
                    ReferenceAudio::Local(path) if !path.is_file() => {
                        return Err(invalid(
                            format!("Reference audio not found: {}", path.display()),
                            "request.ref_audio",
                        ));
                    }
                    ReferenceAudio::Url(url) if url::Url::parse(url).is_err() => {
                        return Err(invalid(
                            format!("Reference audio URL is malformed: {}", url),
                            "request.ref_audio",
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>, field: &str) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("request_validator"),
    )
}
