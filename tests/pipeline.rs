mod common;

use common::{ZipBuilder, file_count, listing};
use feedpull::{
    ErrorKind, FailurePolicy, FileStore, HttpClient, IngestionStore, MemoryStore, OrderedStore,
    Pipeline, PipelineOptions, RunSummary,
};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(temp_dir: &Path, policy: FailurePolicy) -> PipelineOptions {
    PipelineOptions {
        temp_dir: temp_dir.to_path_buf(),
        failure_policy: policy,
        ..Default::default()
    }
}

async fn serve(server: &MockServer, at: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

async fn serve_listing(server: &MockServer, names: &[&str]) -> String {
    serve(server, "/feeds/", listing(names).into_bytes()).await;
    format!("{}/feeds/", server.uri())
}

#[tokio::test]
async fn rerunning_the_same_feed_appends_nothing() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["a.zip", "b.zip", "notes.txt"]).await;
    serve(
        &server,
        "/feeds/a.zip",
        ZipBuilder::new()
            .stored("x.xml", b"<a/>")
            .stored("y.xml", b"<b/>")
            .build(),
    )
    .await;
    serve(
        &server,
        "/feeds/b.zip",
        ZipBuilder::new().deflated("x.xml", b"<a/>").build(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/feeds/notes.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

    let first = pipeline.run(&url).await.unwrap();
    assert_eq!(
        first,
        RunSummary {
            archives: 2,
            entries: 3,
            appended: 2,
            already_present: 1,
            ..Default::default()
        }
    );
    let records = store.records().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].position, records[0].content.as_slice()), (1, &b"<a/>"[..]));
    assert_eq!((records[1].position, records[1].content.as_slice()), (2, &b"<b/>"[..]));

    let second = pipeline.run(&url).await.unwrap();
    assert_eq!(second.appended, 0);
    assert_eq!(second.already_present, 3);
    assert_eq!(store.len().await.unwrap(), 2);

    assert_eq!(file_count(tmp.path()), 0);
}

#[tokio::test]
async fn durable_store_dedups_across_process_runs() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["a.zip"]).await;
    serve(
        &server,
        "/feeds/a.zip",
        ZipBuilder::new()
            .stored("x.xml", b"<a/>")
            .stored("y.xml", b"<b/>")
            .build(),
    )
    .await;

    let store_dir = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();

    for expected_appends in [2, 0] {
        let backend = FileStore::open(store_dir.path()).await.unwrap();
        let store = IngestionStore::new(Arc::new(backend), "NEWS_XML");
        let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

        let summary = pipeline.run(&url).await.unwrap();
        assert_eq!(summary.appended, expected_appends);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    let backend = FileStore::open(store_dir.path()).await.unwrap();
    assert_eq!(
        backend.range("NEWS_XML", 0, 1).await.unwrap(),
        vec![b"<a/>".to_vec(), b"<b/>".to_vec()]
    );
}

#[tokio::test]
async fn bad_archive_aborts_run_and_cleans_up() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["a.zip", "b.zip"]).await;
    serve(&server, "/feeds/a.zip", b"this is not a zip archive".to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/feeds/b.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(
            ZipBuilder::new().stored("x.xml", b"<a/>").build(),
        ))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

    let err = pipeline.run(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(store.is_empty().await.unwrap());
    assert_eq!(file_count(tmp.path()), 0);
}

#[tokio::test]
async fn skip_policy_isolates_failing_archives() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["missing.zip", "broken.zip", "b.zip"]).await;
    Mock::given(method("GET"))
        .and(path("/feeds/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    serve(&server, "/feeds/broken.zip", vec![0u8; 64]).await;
    serve(
        &server,
        "/feeds/b.zip",
        ZipBuilder::new().stored("x.xml", b"<a/>").build(),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Skip));

    let summary = pipeline.run(&url).await.unwrap();
    assert_eq!(summary.archives, 3);
    assert_eq!(summary.failed_archives, 2);
    assert_eq!(summary.appended, 1);
    assert_eq!(file_count(tmp.path()), 0);
}

#[tokio::test]
async fn http_error_on_archive_is_a_fetch_error() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["gone.zip"]).await;
    Mock::given(method("GET"))
        .and(path("/feeds/gone.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

    let err = pipeline.run(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(file_count(tmp.path()), 0);
}

#[tokio::test]
async fn entry_failures_do_not_stop_siblings() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["a.zip"]).await;
    serve(
        &server,
        "/feeds/a.zip",
        ZipBuilder::new()
            .corrupt("bad.xml", b"<bad/>")
            .directory("dir/")
            .stored("dir/good.xml", b"<good/>")
            .build(),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

    let summary = pipeline.run(&url).await.unwrap();
    assert_eq!(summary.entries, 2);
    assert_eq!(summary.failed_entries, 1);
    assert_eq!(summary.appended, 1);
    assert_eq!(store.records().await.unwrap()[0].content, b"<good/>");
}

#[tokio::test]
async fn discovery_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Skip));

    let err = pipeline
        .run(&format!("{}/feeds/", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(file_count(tmp.path()), 0);
}

#[tokio::test]
async fn empty_listing_is_an_empty_run() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["readme.txt"]).await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let pipeline = Pipeline::new(&http, &store, options(tmp.path(), FailurePolicy::Abort));

    assert_eq!(pipeline.run(&url).await.unwrap(), RunSummary::default());
}

#[tokio::test]
async fn missing_temp_dir_is_an_io_error() {
    let server = MockServer::start().await;
    let url = serve_listing(&server, &["a.zip"]).await;
    serve(
        &server,
        "/feeds/a.zip",
        ZipBuilder::new().stored("x.xml", b"<a/>").build(),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let http = HttpClient::new(None).unwrap();
    let store = IngestionStore::new(Arc::new(MemoryStore::new()), "NEWS_XML");
    let opts = options(&tmp.path().join("does-not-exist"), FailurePolicy::Abort);
    let pipeline = Pipeline::new(&http, &store, opts);

    let err = pipeline.run(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(store.is_empty().await.unwrap());
}
