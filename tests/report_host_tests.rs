//! Report-host client behavior against a mocked HTTP server.
//!
//! The two tolerated not-ready conditions must come back as retryable values,
//! and everything else on the same call path must be a terminal error.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use covgate::report::{ReportClient, ReportFetchError, ReportPoll};

async fn mock_report(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/org/repo"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn queued_revision_is_retryable_not_an_error() {
    let server = MockServer::start().await;
    mock_report(&server, 404, json!({"queue": ["C1"]})).await;

    let client = ReportClient::new(&server.uri());
    let poll = client.fetch_candidate("org/repo", "C1").await.unwrap();
    assert!(matches!(poll, ReportPoll::Queued));
}

#[tokio::test]
async fn missing_from_queue_is_terminal() {
    let server = MockServer::start().await;
    mock_report(&server, 404, json!({"queue": ["OTHER"]})).await;

    let client = ReportClient::new(&server.uri());
    let err = client.fetch_candidate("org/repo", "C1").await.unwrap_err();
    assert!(matches!(err, ReportFetchError::NotQueued { .. }));
}

#[tokio::test]
async fn waiting_flag_is_retryable() {
    let server = MockServer::start().await;
    mock_report(&server, 200, json!({"waiting": true, "report": null})).await;

    let client = ReportClient::new(&server.uri());
    let poll = client.fetch_candidate("org/repo", "C1").await.unwrap();
    assert!(matches!(poll, ReportPoll::Processing));
}

#[tokio::test]
async fn ready_report_is_returned_verbatim() {
    let server = MockServer::start().await;
    let report = json!({"files": {"a.py": {"lines": {"1": 1}}}});
    mock_report(&server, 200, json!({"report": report.clone()})).await;

    let client = ReportClient::new(&server.uri());
    match client.fetch_candidate("org/repo", "C1").await.unwrap() {
        ReportPoll::Ready(body) => assert_eq!(body, report),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_terminal_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/repo"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReportClient::new(&server.uri());
    let err = client.fetch_candidate("org/repo", "C1").await.unwrap_err();
    match err {
        ReportFetchError::UnexpectedStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn baseline_fetch_requires_ready_report() {
    let server = MockServer::start().await;
    let report = json!({"files": {}});
    Mock::given(method("GET"))
        .and(path("/org/repo"))
        .and(query_param("branch", "master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"report": report.clone()})))
        .mount(&server)
        .await;

    let client = ReportClient::new(&server.uri());
    let baseline = client.fetch_baseline("org/repo", "master").await.unwrap();
    assert_eq!(baseline, report);
}

#[tokio::test]
async fn baseline_without_report_body_is_terminal() {
    let server = MockServer::start().await;
    mock_report(&server, 200, json!({"waiting": false})).await;

    let client = ReportClient::new(&server.uri());
    let err = client.fetch_baseline("org/repo", "master").await.unwrap_err();
    assert!(matches!(err, ReportFetchError::MissingReport { .. }));
}
