//! Web fetcher behaviour against a local mock server.

use std::time::Duration;

use biocorpus_ingestion::models::RecordStatus;
use biocorpus_ingestion::normalise::web::WebDefaults;
use biocorpus_ingestion::sources::web::WebFetcher;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "<html><head><title>Screening Q&amp;A</title></head><body>\
    <p>Lung cancer screening is recommended for adults aged 50 to 80 with a smoking history.</p>\
    <p>Talk to your doctor.</p></body></html>";

fn fetcher(timeout_ms: u64) -> WebFetcher {
    WebFetcher::new(Duration::from_millis(timeout_ms), WebDefaults::default()).unwrap()
}

#[tokio::test]
async fn test_fetch_page_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/screening"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let url = format!("{}/screening", server.uri());
    let record = fetcher(5_000).fetch_page(&url).await;

    assert_eq!(record.title, "Screening Q&A");
    assert!(record.abstract_text.starts_with("Lung cancer screening is recommended"));
    assert_eq!(record.status, RecordStatus::Ok);
    assert_eq!(record.url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_http_error_yields_error_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let record = fetcher(5_000).fetch_page(&format!("{}/missing", server.uri())).await;
    assert_eq!(record.keywords, vec!["error"]);
    assert_eq!(record.combined_text, "");
    assert_eq!(record.status, RecordStatus::FetchError);
}

#[tokio::test]
async fn test_timeout_yields_error_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let record = fetcher(100).fetch_page(&format!("{}/slow", server.uri())).await;
    assert_eq!(record.status, RecordStatus::FetchError);
    assert_eq!(record.title, "Error fetching page");
}

#[tokio::test]
async fn test_fetch_all_never_drops_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/ok", server.uri()),
        "http://127.0.0.1:9/unreachable".to_string(),
        format!("{}/also-missing", server.uri()),
    ];
    let records = fetcher(2_000).fetch_all(&urls).await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, RecordStatus::Ok);
    assert_eq!(records[1].status, RecordStatus::FetchError);
    assert_eq!(records[2].status, RecordStatus::FetchError);
}
