mod helpers;

use helpers::{setup_test_app, teardown};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn submitted_job_is_queued_and_drained() {
    let app = setup_test_app(10);

    let response = app
        .server
        .post("/api/v0/jobs")
        .json(&json!({ "duration_ms": 10 }))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["queued"], true);
    assert_eq!(body["privileged"], false);
    assert!(body["job_id"].as_str().is_some());

    // Drain proves the job finished and its permit came back.
    app.state.dispatcher.shutdown();
    app.state
        .dispatcher
        .await_termination(Duration::from_secs(2))
        .expect("job should finish and release its permit");
}

#[tokio::test]
async fn privileged_job_does_not_consume_a_permit() {
    let app = setup_test_app(10);

    let response = app
        .server
        .post("/api/v0/jobs")
        .json(&json!({ "duration_ms": 0, "privileged": true }))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["privileged"], true);
    assert_eq!(
        app.state.dispatcher.outstanding_permits(),
        0,
        "privileged work must never hold a permit"
    );

    teardown(&app);
}

#[tokio::test]
async fn status_reports_dispatcher_capacity() {
    let app = setup_test_app(10);

    let response = app.server.get("/api/v0/status").await;
    response.assert_status_ok();
    let body: Value = response.json();
    // max(processor_count, 3) with 4 scripted processors.
    assert_eq!(body["dispatcher"]["max_available"], 4);
    assert_eq!(body["dispatcher"]["shutdown"], false);

    teardown(&app);
}
