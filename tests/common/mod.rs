//! Shared fixtures for integration tests: a mockito server speaking the job
//! API and the S3 path-style protocol, plus audio helpers.

#![allow(dead_code)]

use base64::Engine as _;
use mockito::{Matcher, Mock, Server, ServerGuard};
use remote_tts_runtime::{HttpTransport, JobClient, StoreConfig};
use std::io::Cursor;
use std::path::PathBuf;

pub const ENDPOINT_ID: &str = "ep-test";
pub const API_KEY: &str = "test-key";
pub const BUCKET: &str = "media";

/// Test fixture that owns a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    pub fn transport(&self) -> HttpTransport {
        HttpTransport::from_client(reqwest::Client::new())
    }

    /// Job client whose API base URL is the mock server.
    pub fn job_client(&self) -> JobClient {
        self.job_client_with_sink(None)
    }

    pub fn job_client_with_sink(&self, sink: Option<StoreConfig>) -> JobClient {
        JobClient::builder()
            .api_key(API_KEY)
            .endpoint_id(ENDPOINT_ID)
            .base_url(&self.base_url)
            .output_sink(sink)
            .transport(self.transport())
            .build()
            .expect("job client")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            endpoint_url: self.base_url.clone(),
            access_key_id: "AKIDTEST".into(),
            secret_access_key: "secret".into(),
            bucket_name: BUCKET.into(),
            region: "auto".into(),
        }
    }

    pub fn run_path() -> String {
        format!("/{}/run", ENDPOINT_ID)
    }

    pub fn status_path(job_id: &str) -> String {
        format!("/{}/status/{}", ENDPOINT_ID, job_id)
    }

    /// `POST /run` answering with `job_id`.
    pub async fn mock_submit(&mut self, job_id: &str) -> Mock {
        self.server
            .mock("POST", Self::run_path().as_str())
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"id":"{}","status":"IN_QUEUE"}}"#, job_id))
            .create_async()
            .await
    }

    /// `GET /status/{id}` with a fixed body; `hits` bounds how many polls it
    /// answers before the next registered status mock takes over.
    pub async fn mock_status(&mut self, job_id: &str, body: serde_json::Value, hits: Option<usize>) -> Mock {
        let mut mock = self
            .server
            .mock("GET", Self::status_path(job_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string());
        if let Some(n) = hits {
            mock = mock.expect(n);
        }
        mock.create_async().await
    }

    /// Any request method under the bucket whose path matches `pattern`.
    pub async fn mock_object(&mut self, method: &str, pattern: &str, status: usize, body: &[u8]) -> Mock {
        self.server
            .mock(method, Matcher::Regex(pattern.to_string()))
            .match_header("authorization", Matcher::Regex("^AWS4-HMAC-SHA256 Credential=AKIDTEST/".into()))
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }
}

/// Mono 16-bit PCM silence.
pub fn silent_wav(seconds: u32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).expect("wav writer");
        for _ in 0..seconds * sample_rate {
            writer.write_sample(0i16).expect("sample");
        }
        writer.finalize().expect("finalize");
    }
    buf.into_inner()
}

pub fn silent_wav_base64(seconds: u32) -> String {
    base64::engine::general_purpose::STANDARD.encode(silent_wav(seconds, 16_000))
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tts-test-{}", uuid::Uuid::new_v4().simple()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}
