//! HTTP grader against a local server with canned responses

mod common;

use std::time::Duration;

use signpath_runtime::config::GraderConfig;
use signpath_runtime::grading::{GradeRequest, GradingError, GradingService, HttpGrader};

use common::{closed_url, CannedServer};

const GOOD: &str = r#"{"evaluation": {"overall_score_0_to_4": 3, "summary": "clear",
    "pros": {"points": ["handshape"]}, "cons": {"points": []}}}"#;

fn grader(endpoint: &str, max_retries: usize) -> HttpGrader {
    HttpGrader::new(GraderConfig {
        endpoint: endpoint.to_string(),
        timeout: Duration::from_secs(5),
        max_retries,
    })
}

fn request(word: &str) -> GradeRequest {
    GradeRequest::new(word, vec![7u8; 32])
}

#[tokio::test]
async fn test_missing_reference_auto_passes() {
    let server = CannedServer::start(vec![(404, r#"{"detail": "not found"}"#)]).await;

    let evaluation = grader(&server.url, 2)
        .evaluate(&request("Thank You"))
        .await
        .unwrap();

    assert_eq!(evaluation.overall_score_0_to_4, 4);
    assert!(evaluation.score().unwrap().passes());
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("POST /api/evaluate-sign?word=thankyou "));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = CannedServer::start(vec![(500, "{}"), (200, GOOD)]).await;

    let score = grader(&server.url, 2)
        .grade(request("Hello"))
        .await
        .unwrap()
        .score()
        .unwrap();

    assert_eq!(score.value(), 3);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = CannedServer::start(vec![(400, r#"{"detail": "bad video"}"#)]).await;

    let err = grader(&server.url, 2)
        .evaluate(&request("Hello"))
        .await
        .unwrap_err();

    match err {
        GradingError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 400);
            assert!(body.contains("bad video"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_retries_stop_after_limit() {
    let server = CannedServer::start(vec![(503, "{}")]).await;

    let err = grader(&server.url, 1)
        .evaluate(&request("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, GradingError::HttpStatus { .. }));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_transport_error_after_retries() {
    let url = closed_url().await;

    let err = grader(&url, 1).evaluate(&request("Hello")).await.unwrap_err();

    assert!(matches!(err, GradingError::Request(_)));
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let server = CannedServer::start(vec![(200, "not json")]).await;

    let err = grader(&server.url, 0)
        .evaluate(&request("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, GradingError::Json(_)));
}
