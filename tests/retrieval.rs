//! Output materialization priority.

mod common;

use common::{MockServerFixture, BUCKET};
use remote_tts_runtime::job::OutputDescriptor;
use remote_tts_runtime::retrieve::OutputSource;
use remote_tts_runtime::{ErrorKind, ObjectStore, ResultRetriever, S3Store};
use std::sync::Arc;

fn retriever(fixture: &MockServerFixture) -> ResultRetriever {
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&fixture.store_config(), fixture.transport()).unwrap());
    ResultRetriever::new(Some(store), fixture.transport())
}

#[tokio::test]
async fn store_key_wins_over_url() {
    let mut fixture = MockServerFixture::new().await;
    let get = fixture
        .mock_object("GET", &format!("^/{}/out/a.mp3$", BUCKET), 200, b"from-store")
        .await;
    let url = fixture
        .server
        .mock("GET", "/cdn/a.mp3")
        .expect(0)
        .create_async()
        .await;

    let descriptor = OutputDescriptor {
        store_key: Some("out/a.mp3".into()),
        url: Some(format!("{}/cdn/a.mp3", fixture.base_url)),
        ..OutputDescriptor::default()
    };
    let dest = common::scratch_dir().join("a.mp3");
    let got = retriever(&fixture).materialize(&descriptor, &dest).await.unwrap();

    assert_eq!(got.source, OutputSource::Store);
    assert_eq!(std::fs::read(&dest).unwrap(), b"from-store");
    get.assert_async().await;
    url.assert_async().await;
}

#[tokio::test]
async fn store_failure_falls_through_to_url() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_object("GET", &format!("^/{}/out/b.mp3$", BUCKET), 404, b"NoSuchKey")
        .await;
    let url = fixture
        .server
        .mock("GET", "/cdn/b.mp3")
        .with_status(200)
        .with_body("from-url")
        .create_async()
        .await;

    let descriptor = OutputDescriptor {
        store_key: Some("out/b.mp3".into()),
        url: Some(format!("{}/cdn/b.mp3", fixture.base_url)),
        ..OutputDescriptor::default()
    };
    let dest = common::scratch_dir().join("nested/dir/b.mp3");
    let got = retriever(&fixture).materialize(&descriptor, &dest).await.unwrap();

    assert_eq!(got.source, OutputSource::Url);
    assert_eq!(got.bytes, 8);
    assert_eq!(std::fs::read(&dest).unwrap(), b"from-url");
    url.assert_async().await;
}

#[tokio::test]
async fn all_sources_failing_is_no_output() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("GET", "/cdn/c.mp3")
        .with_status(500)
        .create_async()
        .await;

    let descriptor = OutputDescriptor::from_url(format!("{}/cdn/c.mp3", fixture.base_url));
    let dest = common::scratch_dir().join("c.mp3");
    let err = retriever(&fixture)
        .materialize(&descriptor, &dest)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoRetrievableOutput);
    assert!(err.to_string().contains("url: "));
    assert!(!dest.exists());
}
