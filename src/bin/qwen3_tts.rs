//! qwen3-tts: 通过远程 GPU 任务合成语音的命令行工具
//!
//! Usage:
//!   qwen3-tts --text "Hello world" --speaker Ryan --output hello.mp3
//!   qwen3-tts --text "Great news!" --instruct "Speak enthusiastically" -o excited.mp3
//!   qwen3-tts --text "Hello" --ref-audio sample.wav --ref-text "transcript" -o cloned.mp3
//!   qwen3-tts --list-voices

use anyhow::{bail, Context, Result};
use clap::Parser;
use remote_tts_runtime::types::TIMELINE_FPS;
use remote_tts_runtime::{
    voices, AudioFormat, Orchestrator, ReferenceAudio, RunnerConfig, SynthesisRequest,
    SynthesisResult,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Generate speech with Qwen3-TTS on a serverless GPU endpoint
#[derive(Parser, Debug)]
#[command(name = "qwen3-tts", version, about)]
struct Args {
    /// Text to synthesize
    #[arg(long, short = 't')]
    text: Option<String>,

    /// Output audio file path (.mp3 or .wav)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Built-in speaker name. Use --list-voices to see options.
    #[arg(long, short = 's', default_value = voices::DEFAULT_SPEAKER)]
    speaker: String,

    /// Language hint
    #[arg(long, short = 'l', default_value = "auto")]
    language: String,

    /// Natural-language emotion/style instruction (e.g. "Speak warmly")
    #[arg(long, default_value = "")]
    instruct: String,

    /// Reference audio for voice cloning: a local file or an http(s) URL
    #[arg(long)]
    ref_audio: Option<String>,

    /// Transcript of the reference audio (required with --ref-audio)
    #[arg(long)]
    ref_text: Option<String>,

    /// Output format
    #[arg(long, default_value = "mp3", value_parser = ["mp3", "wav"])]
    format: String,

    /// Job timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds between status checks
    #[arg(long)]
    poll_interval: Option<u64>,

    /// YAML config file (otherwise the environment is used)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List built-in speakers and exit
    #[arg(long)]
    list_voices: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json);

    if args.list_voices {
        print_voices();
        return Ok(ExitCode::SUCCESS);
    }

    let Some(text) = args.text.clone() else {
        bail!("--text is required");
    };
    let Some(output) = args.output.clone() else {
        bail!("--output is required");
    };

    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RunnerConfig::from_env(),
    };
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(interval) = args.poll_interval {
        config.poll_interval_secs = interval;
    }

    let request = build_request(&args, text)?;
    let result = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => {
            if !args.json {
                println!("Generating speech with Qwen3-TTS...");
            }
            orchestrator
                .synthesize(&request, &output, config.poll_options())
                .await
        }
        Err(e) => SynthesisResult::failed(&e, Duration::ZERO, None, request.text.chars().count()),
    };

    report(&result, args.json)?;
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_request(args: &Args, text: String) -> Result<SynthesisRequest> {
    let format: AudioFormat = args.format.parse()?;
    let request = match &args.ref_audio {
        Some(locator) => SynthesisRequest::clone_voice(
            text,
            ReferenceAudio::parse(locator),
            args.ref_text.clone().unwrap_or_default(),
        ),
        None => SynthesisRequest::preset(text, args.speaker.clone()).with_instruct(args.instruct.clone()),
    };
    Ok(request.with_language(args.language.clone()).with_format(format))
}

fn report(result: &SynthesisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    if !result.success {
        eprintln!("Error: {}", result.error.as_deref().unwrap_or("Unknown error"));
        return Ok(());
    }
    if let Some(output) = &result.output {
        println!("Generated: {}", output.display());
    }
    if let (Some(seconds), Some(frames)) = (result.duration_seconds, result.duration_frames_30fps) {
        println!("  Duration: {:.1}s ({} frames @ {}fps)", seconds, frames, TIMELINE_FPS);
    }
    Ok(())
}

fn print_voices() {
    println!("Built-in speakers:");
    println!();
    println!("  {:<12} Language", "Speaker");
    println!("  {:<12} {}", "-".repeat(12), "-".repeat(10));
    for (speaker, language) in voices::BUILTIN_SPEAKERS {
        println!("  {:<12} {}", speaker, language);
    }
    println!();
    println!("Supported languages: {}", voices::SUPPORTED_LANGUAGES.join(", "));
    println!();
    println!("Tip: Use --instruct to control emotion/style:");
    println!("  --instruct \"Speak warmly and calmly\"");
    println!("  --instruct \"Whisper mysteriously\"");
}
