//! Scenario: response bodies are consumed on every path.
//!
//! # Invariants under test
//!
//! 1. Many sequential submissions over a transport limited to one idle
//!    connection per host all complete, whatever the outcome of each.
//! 2. An oversized error body is cut to `MAX_ERROR_BODY_BYTES` in the error
//!    and the call still completes.
//! 3. Large success bodies are discarded without affecting the outcome.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use nfy_client::{BasicAuthTransport, Client, Delivery, SubmitError, MAX_ERROR_BODY_BYTES};
use nfy_event::{Event, Type};

fn pooled_client(server: &MockServer) -> Client {
    let http = reqwest::Client::builder()
        .pool_max_idle_per_host(1)
        .build()
        .unwrap();
    let transport = BasicAuthTransport::with_http(http, "source-1", "s3cret", "nfy-test");
    Client::new(&server.base_url(), Arc::new(transport)).unwrap()
}

fn event_for(case: &str) -> Event {
    Event::new("web-01", Type::State).with_tag("case", case)
}

#[tokio::test]
async fn sequential_calls_complete_on_every_outcome() {
    let server = MockServer::start_async().await;
    let big = "x".repeat(256 * 1024);

    server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(r#"{"tags":{"case":"ok"}}"#);
            then.status(200).body(&big);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .json_body_partial(r#"{"tags":{"case":"irrelevant"}}"#);
            then.status(406).body(&big);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(r#"{"tags":{"case":"stale"}}"#);
            then.status(412).body(r#"{"version":"0x2","rules":{}}"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(r#"{"tags":{"case":"broken"}}"#);
            then.status(412).body(&big);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(r#"{"tags":{"case":"fail"}}"#);
            then.status(503).body(&big);
        })
        .await;

    let client = pooled_client(&server);
    let cases = ["ok", "irrelevant", "stale", "broken", "fail"];

    let run = async {
        for round in 0..6 {
            for case in cases {
                let res = client.submit(&event_for(case)).await;
                match (case, res) {
                    ("ok", Ok(Delivery::Accepted)) => {}
                    ("irrelevant", Ok(Delivery::Irrelevant)) => {}
                    ("stale", Err(SubmitError::RulesOutdated(s))) => assert_eq!(s.version(), "0x2"),
                    ("broken", Err(SubmitError::Protocol(_))) => {}
                    ("fail", Err(SubmitError::UnexpectedStatus { status, .. })) => {
                        assert_eq!(status.as_u16(), 503)
                    }
                    (case, res) => panic!("round {round} case {case}: unexpected {res:?}"),
                }
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(60), run)
        .await
        .expect("sequential submissions must not stall");
}

#[tokio::test]
async fn oversized_error_body_is_truncated() {
    let server = MockServer::start_async().await;
    let huge = "e".repeat(MAX_ERROR_BODY_BYTES * 2 + 17);
    server
        .mock_async(|when, then| {
            when.method(POST).path("/process-event");
            then.status(500).body(&huge);
        })
        .await;

    let client = pooled_client(&server);
    for _ in 0..3 {
        let err = client.submit(&event_for("huge")).await.unwrap_err();
        match err {
            SubmitError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body.len(), MAX_ERROR_BODY_BYTES);
                assert!(body.bytes().all(|b| b == b'e'));
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn small_error_body_is_kept_whole() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/process-event");
            then.status(409).body("  conflict: incident already closed  ");
        })
        .await;

    let err = pooled_client(&server)
        .submit(&event_for("small"))
        .await
        .unwrap_err();
    assert!(err.to_string().ends_with("conflict: incident already closed"));
}
