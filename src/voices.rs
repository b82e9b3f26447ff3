//! Built-in speakers and language hints understood by the Qwen3-TTS worker.

/// Speaker used when a preset request names none.
pub const DEFAULT_SPEAKER: &str = "Ryan";

/// Language hint used when a request names none.
pub const DEFAULT_LANGUAGE: &str = "Auto";

/// Built-in speakers and their native language.
pub const BUILTIN_SPEAKERS: &[(&str, &str)] = &[
    ("Ryan", "English"),
    ("Aiden", "English"),
    ("Vivian", "Chinese"),
    ("Serena", "Chinese"),
    ("Uncle_Fu", "Chinese"),
    ("Dylan", "Chinese"),
    ("Eric", "Chinese"),
    ("Ono_Anna", "Japanese"),
    ("Sohee", "Korean"),
];

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "Auto",
    "English",
    "Chinese",
    "French",
    "German",
    "Italian",
    "Japanese",
    "Korean",
    "Portuguese",
    "Russian",
    "Spanish",
];

/// Normalise a language hint (`"english"`, `"ENGLISH"`) to its canonical name.
pub fn canonical_language(language: &str) -> Option<&'static str> {
    let wanted = language.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(wanted))
}

/// Native language of a built-in speaker, matched case-insensitively.
pub fn native_language(speaker: &str) -> Option<&'static str> {
    BUILTIN_SPEAKERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(speaker.trim()))
        .map(|(_, lang)| *lang)
}

pub fn is_builtin_speaker(speaker: &str) -> bool {
    native_language(speaker).is_some()
}
