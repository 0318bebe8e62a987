//! Tests for the async job protocol.

use std::time::Duration;

use rstest::rstest;

use super::{BASE_URL, poller};
use crate::cancel::CancelToken;
use crate::heketi::{
    HeketiError, HttpResponse, Method, PollPolicy, QueueStep, classify,
};
use crate::test_support::ScriptedTransport;

fn urls(transport: &ScriptedTransport) -> Vec<(Method, String)> {
    transport
        .requests()
        .into_iter()
        .map(|request| (request.method, request.url))
        .collect()
}

#[rstest]
#[case(HttpResponse::new(204), QueueStep::Complete)]
#[case(HttpResponse::new(200), QueueStep::Complete)]
#[case(HttpResponse::new(200).with_header("X-Pending", "true"), QueueStep::Pending)]
#[case(
    HttpResponse::new(303).with_header("Location", "/nodes/n1"),
    QueueStep::SeeOther(String::from("/nodes/n1"))
)]
#[case(HttpResponse::new(500), QueueStep::Unexpected)]
#[case(HttpResponse::new(201), QueueStep::Unexpected)]
fn classify_maps_statuses(#[case] response: HttpResponse, #[case] expected: QueueStep) {
    assert_eq!(classify(&response).expect("classification"), expected);
}

#[test]
fn classify_requires_location_on_see_other() {
    assert_eq!(
        classify(&HttpResponse::new(303)),
        Err(HeketiError::MissingLocation { status: 303 })
    );
}

#[tokio::test]
async fn pending_jobs_are_polled_until_no_content() {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/job1");
    transport.push_pending();
    transport.push_pending();
    transport.push_no_content();

    let response = poller(&transport)
        .submit(Method::Delete, "volumes/v1", None)
        .await
        .expect("job should complete");

    assert_eq!(response.status, 204);
    let queue = format!("{BASE_URL}/queue/job1");
    assert_eq!(
        urls(&transport),
        vec![
            (Method::Delete, format!("{BASE_URL}/volumes/v1")),
            (Method::Get, queue.clone()),
            (Method::Get, queue.clone()),
            (Method::Get, queue),
        ]
    );
}

#[tokio::test]
async fn see_other_is_followed_exactly_once() {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/job2");
    transport.push_see_other("/nodes/n1");
    transport.push(HttpResponse::new(200).with_body(r#"{"id":"n1"}"#));

    let response = poller(&transport)
        .submit(Method::Post, "nodes", Some(serde_json::json!({"zone": 1})))
        .await
        .expect("job should complete");

    assert_eq!(response.body, r#"{"id":"n1"}"#);
    assert_eq!(
        urls(&transport),
        vec![
            (Method::Post, format!("{BASE_URL}/nodes")),
            (Method::Get, format!("{BASE_URL}/queue/job2")),
            (Method::Get, format!("{BASE_URL}/nodes/n1")),
        ]
    );
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test]
async fn inline_results_complete_without_pending_marker() {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/job3");
    transport.push(HttpResponse::new(200).with_body("done"));

    let response = poller(&transport)
        .delete("devices/d1")
        .await
        .expect("job should complete");
    assert_eq!(response.body, "done");
}

#[tokio::test]
async fn submit_error_status_surfaces_http_error() {
    let transport = ScriptedTransport::new();
    transport.push(HttpResponse::new(500).with_body("internal"));

    let err = poller(&transport)
        .submit(Method::Post, "nodes", None)
        .await
        .expect_err("500 should fail");

    assert!(
        matches!(err, HeketiError::Http { status: 500, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(transport.requests().len(), 1, "no polling after failure");
}

#[tokio::test]
async fn submit_non_accepted_success_is_unexpected() {
    let transport = ScriptedTransport::new();
    transport.push(HttpResponse::new(200));

    let err = poller(&transport)
        .submit(Method::Delete, "nodes/n1", None)
        .await
        .expect_err("200 on submit should fail");
    assert_eq!(
        err,
        HeketiError::UnexpectedAsyncStatus {
            method: Method::Delete,
            status: 200,
        }
    );
}

#[tokio::test]
async fn accepted_without_location_fails() {
    let transport = ScriptedTransport::new();
    transport.push(HttpResponse::new(202));

    let err = poller(&transport)
        .delete("nodes/n1")
        .await
        .expect_err("missing location should fail");
    assert_eq!(err, HeketiError::MissingLocation { status: 202 });
}

#[rstest]
#[case(500, true)]
#[case(404, true)]
#[case(201, false)]
#[tokio::test]
async fn unexpected_queue_statuses_fail(#[case] status: u16, #[case] is_http_error: bool) {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/job4");
    transport.push(HttpResponse::new(status));

    let err = poller(&transport)
        .delete("volumes/v1")
        .await
        .expect_err("queue status should fail");

    if is_http_error {
        assert!(
            matches!(err, HeketiError::Http { status: got, .. } if got == status),
            "unexpected error: {err}"
        );
    } else {
        assert_eq!(err, HeketiError::UnexpectedQueueStatus { status });
    }
}

#[tokio::test]
async fn max_wait_turns_endless_pending_into_timeout() {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/slow");
    transport.push_pending();

    let err = poller(&transport)
        .with_policy(PollPolicy {
            interval: Duration::ZERO,
            max_wait: Some(Duration::ZERO),
        })
        .delete("volumes/v1")
        .await
        .expect_err("pending job should time out");

    assert!(
        matches!(err, HeketiError::PollTimeout { ref locator, .. } if locator == "/queue/slow"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn cancellation_stops_polling() {
    let transport = ScriptedTransport::new();
    transport.push_accepted("/queue/job5");
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = poller(&transport)
        .with_cancel_token(cancel)
        .delete("volumes/v1")
        .await
        .expect_err("cancelled job should fail");

    assert_eq!(
        err,
        HeketiError::Cancelled {
            locator: String::from("/queue/job5"),
        }
    );
    assert_eq!(transport.requests().len(), 1);
}
