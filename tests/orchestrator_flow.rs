//! End-to-end synthesis against a mocked worker API and object store.

mod common;

use common::{MockServerFixture, BUCKET};
use mockito::Matcher;
use remote_tts_runtime::media::{ProbeChain, WavHeaderProbe};
use remote_tts_runtime::transfer::{AnonymousDropTier, DurableStoreTier, TierSelector};
use remote_tts_runtime::{
    AudioFormat, BatchItem, ObjectStore, Orchestrator, PollOptions, ReferenceAudio, S3Store,
    SynthesisRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fast_poll() -> PollOptions {
    PollOptions::new(Duration::from_secs(10), Duration::from_millis(20))
}

fn orchestrator(fixture: &MockServerFixture) -> Orchestrator {
    Orchestrator::builder()
        .job_client(fixture.job_client())
        .transport(fixture.transport())
        .tiers(TierSelector::new(vec![]))
        .probe(ProbeChain::new(vec![Arc::new(WavHeaderProbe)]))
        .build()
        .unwrap()
}

#[tokio::test]
async fn preset_voice_completes_with_inline_audio() {
    let mut fixture = MockServerFixture::new().await;
    let submit = fixture.mock_submit("job-1").await;
    let _running = fixture
        .mock_status("job-1", json!({"id": "job-1", "status": "IN_PROGRESS"}), Some(2))
        .await;
    let _done = fixture
        .mock_status(
            "job-1",
            json!({
                "id": "job-1",
                "status": "COMPLETED",
                "output": {"success": true, "audio_base64": common::silent_wav_base64(1), "mode": "custom_voice"}
            }),
            None,
        )
        .await;

    let dir = common::scratch_dir();
    let out = dir.join("hello.wav");
    let request = SynthesisRequest::preset("Hello world", "Ryan").with_format(AudioFormat::Wav);
    let result = orchestrator(&fixture).synthesize(&request, &out, fast_poll()).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.output.as_deref(), Some(out.as_path()));
    assert_eq!(result.duration_seconds, Some(1.0));
    assert_eq!(result.duration_frames_30fps, Some(30));
    assert_eq!(result.job_id.as_deref(), Some("job-1"));
    assert_eq!(result.script_chars, 11);
    submit.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn never_finishing_job_times_out() {
    let mut fixture = MockServerFixture::new().await;
    fixture.mock_submit("job-slow").await;
    fixture
        .mock_status("job-slow", json!({"status": "IN_PROGRESS"}), None)
        .await;

    let request = SynthesisRequest::preset("Hello world", "Ryan");
    let poll = PollOptions::new(Duration::from_secs(5), Duration::from_secs(1));
    let dir = common::scratch_dir();
    let out = dir.join("slow.mp3");
    let result = orchestrator(&fixture).synthesize(&request, &out, poll).await;

    assert!(!result.success);
    assert_eq!(result.reason(), Some("TimedOut"));
    assert!(result.output.is_none());
    assert!(result.elapsed >= Duration::from_secs(5));
    assert!(result.elapsed < Duration::from_secs(7));
    assert!(!out.exists());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn clone_without_transcript_never_touches_network() {
    let mut fixture = MockServerFixture::new().await;
    let submit = fixture
        .server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let drop_host = fixture
        .server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dir = common::scratch_dir();
    let reference = dir.join("ref.wav");
    std::fs::write(&reference, common::silent_wav(1, 8000)).unwrap();
    let request = SynthesisRequest::clone_voice("Hello", ReferenceAudio::Local(reference), "");
    let result = orchestrator(&fixture)
        .synthesize(&request, &dir.join("out.mp3"), fast_poll())
        .await;

    assert!(!result.success);
    assert_eq!(result.reason(), Some("Validation"));
    assert!(result.error.unwrap().contains("ref_text is required"));
    assert!(result.job_id.is_none());
    submit.assert_async().await;
    drop_host.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn remote_failure_skips_retrieval() {
    let mut fixture = MockServerFixture::new().await;
    fixture.mock_submit("job-bad").await;
    fixture
        .mock_status(
            "job-bad",
            json!({"status": "FAILED", "error": "CUDA out of memory"}),
            None,
        )
        .await;

    let request = SynthesisRequest::preset("Hello", "Ryan");
    let result = orchestrator(&fixture)
        .synthesize(&request, &common::scratch_dir().join("x.mp3"), fast_poll())
        .await;

    assert_eq!(result.reason(), Some("RemoteJobFailed"));
    assert_eq!(result.job_id.as_deref(), Some("job-bad"));
    assert!(result.error.unwrap().contains("CUDA out of memory"));
}

#[tokio::test]
async fn submission_errors_are_hard_failures() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("POST", MockServerFixture::run_path().as_str())
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let result = orchestrator(&fixture)
        .synthesize(
            &SynthesisRequest::preset("Hello", "Ryan"),
            &common::scratch_dir().join("x.mp3"),
            fast_poll(),
        )
        .await;
    assert_eq!(result.reason(), Some("SubmissionFailed"));
    assert!(result.job_id.is_none());
    assert!(result.error.unwrap().contains("status: 401"));
}

#[tokio::test]
async fn missing_job_id_is_submission_failure() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("POST", MockServerFixture::run_path().as_str())
        .with_status(200)
        .with_body(r#"{"status":"IN_QUEUE"}"#)
        .create_async()
        .await;

    let result = orchestrator(&fixture)
        .synthesize(
            &SynthesisRequest::preset("Hello", "Ryan"),
            &common::scratch_dir().join("x.mp3"),
            fast_poll(),
        )
        .await;
    assert_eq!(result.reason(), Some("SubmissionFailed"));
    assert!(result.error.unwrap().contains("No job ID in response"));
}

#[tokio::test]
async fn clone_through_store_cleans_up_every_object() {
    let mut fixture = MockServerFixture::new().await;
    let store_cfg = fixture.store_config();
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&store_cfg, fixture.transport()).unwrap());

    let put = fixture
        .mock_object("PUT", &format!("^/{}/qwen3-tts/input/[0-9a-f]{{8}}_ref.wav$", BUCKET), 200, b"")
        .await;
    let submit = fixture
        .server
        .mock("POST", MockServerFixture::run_path().as_str())
        .match_body(Matcher::PartialJson(json!({
            "input": {
                "mode": "clone",
                "ref_text": "a short transcript",
                "r2": {"bucket_name": BUCKET}
            }
        })))
        .with_status(200)
        .with_body(r#"{"id":"job-clone"}"#)
        .create_async()
        .await;
    fixture
        .mock_status(
            "job-clone",
            json!({
                "status": "COMPLETED",
                "output": {"audio_url": "https://cdn.invalid/out.wav", "r2_key": "qwen3-tts/output/out.wav"}
            }),
            None,
        )
        .await;
    let get = fixture
        .mock_object("GET", &format!("^/{}/qwen3-tts/output/out.wav$", BUCKET), 200, &common::silent_wav(2, 8000))
        .await;
    let delete_input = fixture
        .mock_object("DELETE", &format!("^/{}/qwen3-tts/input/", BUCKET), 204, b"")
        .await;
    let delete_output = fixture
        .mock_object("DELETE", &format!("^/{}/qwen3-tts/output/out.wav$", BUCKET), 204, b"")
        .await;

    let dir = common::scratch_dir();
    let reference = dir.join("ref.wav");
    std::fs::write(&reference, common::silent_wav(1, 8000)).unwrap();

    let orchestrator = Orchestrator::builder()
        .job_client(fixture.job_client_with_sink(Some(store_cfg)))
        .store(Some(store.clone()))
        .transport(fixture.transport())
        .tiers(TierSelector::new(vec![Arc::new(DurableStoreTier::new(Some(store)))]))
        .probe(ProbeChain::new(vec![Arc::new(WavHeaderProbe)]))
        .build()
        .unwrap();

    let request = SynthesisRequest::clone_voice(
        "Cloned hello",
        ReferenceAudio::Local(reference),
        "a short transcript",
    )
    .with_format(AudioFormat::Wav);
    let out = dir.join("cloned.wav");
    let result = orchestrator.synthesize(&request, &out, fast_poll()).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.duration_seconds, Some(2.0));
    assert_eq!(result.duration_frames_30fps, Some(60));
    put.assert_async().await;
    submit.assert_async().await;
    get.assert_async().await;
    delete_input.assert_async().await;
    delete_output.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

/// Orchestrator staging through the mock store, with the store as output sink.
fn store_orchestrator(fixture: &MockServerFixture) -> Orchestrator {
    let store_cfg = fixture.store_config();
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&store_cfg, fixture.transport()).unwrap());
    Orchestrator::builder()
        .job_client(fixture.job_client_with_sink(Some(store_cfg)))
        .store(Some(store.clone()))
        .transport(fixture.transport())
        .tiers(TierSelector::new(vec![Arc::new(DurableStoreTier::new(Some(store)))]))
        .probe(ProbeChain::new(vec![Arc::new(WavHeaderProbe)]))
        .build()
        .unwrap()
}

/// Mocks for a staged input object: the upload, exactly one delete, and no
/// object reads at all.
async fn mock_staged_input(fixture: &mut MockServerFixture) -> (mockito::Mock, mockito::Mock, mockito::Mock) {
    let put = fixture
        .mock_object("PUT", &format!("^/{}/qwen3-tts/input/[0-9a-f]{{8}}_ref.wav$", BUCKET), 200, b"")
        .await;
    let delete = fixture
        .server
        .mock("DELETE", Matcher::Regex(format!("^/{}/qwen3-tts/input/", BUCKET)))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let reads = fixture
        .server
        .mock("GET", Matcher::Regex(format!("^/{}/", BUCKET)))
        .expect(0)
        .create_async()
        .await;
    (put, delete, reads)
}

fn staged_clone_request(dir: &std::path::Path) -> SynthesisRequest {
    let reference = dir.join("ref.wav");
    std::fs::write(&reference, common::silent_wav(1, 8000)).unwrap();
    SynthesisRequest::clone_voice("Cloned hello", ReferenceAudio::Local(reference), "a short transcript")
}

#[tokio::test]
async fn failed_job_still_deletes_staged_input() {
    let mut fixture = MockServerFixture::new().await;
    let (put, delete, reads) = mock_staged_input(&mut fixture).await;
    fixture.mock_submit("job-fail").await;
    fixture
        .mock_status("job-fail", json!({"status": "FAILED", "error": "worker crashed"}), None)
        .await;

    let dir = common::scratch_dir();
    let request = staged_clone_request(&dir);
    let out = dir.join("out.wav");
    let result = store_orchestrator(&fixture)
        .synthesize(&request, &out, fast_poll())
        .await;

    assert_eq!(result.reason(), Some("RemoteJobFailed"));
    assert!(result.output.is_none());
    assert!(!out.exists());
    put.assert_async().await;
    delete.assert_async().await;
    reads.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn timed_out_job_still_deletes_staged_input() {
    let mut fixture = MockServerFixture::new().await;
    let (put, delete, reads) = mock_staged_input(&mut fixture).await;
    fixture.mock_submit("job-stuck").await;
    fixture
        .mock_status("job-stuck", json!({"status": "IN_QUEUE"}), None)
        .await;

    let dir = common::scratch_dir();
    let request = staged_clone_request(&dir);
    let poll = PollOptions::new(Duration::from_secs(2), Duration::from_millis(200));
    let result = store_orchestrator(&fixture)
        .synthesize(&request, &dir.join("out.wav"), poll)
        .await;

    assert_eq!(result.reason(), Some("TimedOut"));
    assert_eq!(result.job_id.as_deref(), Some("job-stuck"));
    put.assert_async().await;
    delete.assert_async().await;
    reads.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn zero_worker_duration_is_reported_as_unknown() {
    let mut fixture = MockServerFixture::new().await;
    fixture.mock_submit("job-zero").await;
    fixture
        .mock_status(
            "job-zero",
            json!({
                "status": "COMPLETED",
                "output": {"audio_base64": common::silent_wav_base64(1), "duration_seconds": 0.0}
            }),
            None,
        )
        .await;

    let orchestrator = Orchestrator::builder()
        .job_client(fixture.job_client())
        .transport(fixture.transport())
        .tiers(TierSelector::new(vec![]))
        .probe(ProbeChain::new(vec![]))
        .build()
        .unwrap();
    let dir = common::scratch_dir();
    let result = orchestrator
        .synthesize(&SynthesisRequest::preset("Hello", "Ryan"), &dir.join("z.wav"), fast_poll())
        .await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.duration_seconds, None);
    assert_eq!(result.duration_frames_30fps, None);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn url_reference_is_sent_without_staging() {
    let mut fixture = MockServerFixture::new().await;
    let drop_host = fixture
        .server
        .mock("POST", "/upload")
        .expect(0)
        .create_async()
        .await;
    let submit = fixture
        .server
        .mock("POST", MockServerFixture::run_path().as_str())
        .match_body(Matcher::PartialJson(json!({
            "input": {"ref_audio_url": "https://voices.example.com/ref.wav"}
        })))
        .with_status(200)
        .with_body(r#"{"id":"job-url"}"#)
        .create_async()
        .await;
    fixture
        .mock_status(
            "job-url",
            json!({"status": "COMPLETED", "output": {"audio_base64": common::silent_wav_base64(1)}}),
            None,
        )
        .await;

    let orchestrator = Orchestrator::builder()
        .job_client(fixture.job_client())
        .transport(fixture.transport())
        .tiers(TierSelector::new(vec![Arc::new(
            AnonymousDropTier::zero_x0(fixture.transport())
                .with_upload_url(format!("{}/upload", fixture.base_url)),
        )]))
        .probe(ProbeChain::new(vec![Arc::new(WavHeaderProbe)]))
        .build()
        .unwrap();

    let request = SynthesisRequest::clone_voice(
        "Hi",
        ReferenceAudio::parse("https://voices.example.com/ref.wav"),
        "transcript",
    );
    let dir = common::scratch_dir();
    let result = orchestrator
        .synthesize(&request, &dir.join("out.wav"), fast_poll())
        .await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    submit.assert_async().await;
    drop_host.assert_async().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn batch_preserves_input_order() {
    let mut fixture = MockServerFixture::new().await;
    for (text, id) in [("one", "job-a"), ("two", "job-b"), ("three", "job-c")] {
        fixture
            .server
            .mock("POST", MockServerFixture::run_path().as_str())
            .match_body(Matcher::PartialJson(json!({"input": {"text": text}})))
            .with_status(200)
            .with_body(json!({"id": id}).to_string())
            .create_async()
            .await;
    }
    fixture
        .mock_status(
            "job-a",
            json!({"status": "COMPLETED", "output": {"audio_base64": common::silent_wav_base64(1)}}),
            None,
        )
        .await;
    fixture
        .mock_status("job-b", json!({"status": "FAILED", "error": "bad text"}), None)
        .await;
    fixture
        .mock_status(
            "job-c",
            json!({"status": "COMPLETED", "output": {"audio_base64": common::silent_wav_base64(2)}}),
            None,
        )
        .await;

    let dir = common::scratch_dir();
    let items = ["one", "two", "three"]
        .iter()
        .map(|t| BatchItem::new(SynthesisRequest::preset(*t, "Ryan"), dir.join(format!("{t}.wav"))))
        .collect();
    let results = orchestrator(&fixture)
        .synthesize_batch(items, 2, fast_poll())
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].job_id.as_deref(), Some("job-a"));
    assert_eq!(results[0].duration_seconds, Some(1.0));
    assert_eq!(results[1].reason(), Some("RemoteJobFailed"));
    assert_eq!(results[2].job_id.as_deref(), Some("job-c"));
    assert_eq!(results[2].duration_seconds, Some(2.0));
    let _ = std::fs::remove_dir_all(dir);
}
