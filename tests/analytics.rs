//! Oneshot analytics: submission, polling and terminal outcomes.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yetiapi::{CancellationToken, Observable, OneshotJob, PollOptions, YetiApi, YetiError};

fn api(server: &MockServer) -> YetiApi {
    YetiApi::new(&format!("{}/api", server.uri()), None).unwrap()
}

fn job() -> OneshotJob {
    serde_json::from_value(json!({"id": "shodan", "name": "Shodan", "acts_on": ["Ip"]})).unwrap()
}

fn target() -> Observable {
    serde_json::from_value(json!({"id": "o1", "value": "127.0.0.1", "type": "Ip"})).unwrap()
}

fn fast() -> PollOptions {
    PollOptions::default().with_interval(Duration::from_millis(5))
}

async fn mount_run(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/analytics/oneshot/shodan/run"))
        .and(body_json(json!({"id": "o1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"_id": {"$oid": "run1"}, "status": "pending"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, body: Value, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/analytics/oneshot/run1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

#[tokio::test]
async fn test_get_analytic_oneshot_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/oneshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "shodan", "name": "Shodan"},
            {"_id": {"$oid": "abc"}, "name": "Resolve"}
        ])))
        .mount(&server)
        .await;

    let api = api(&server);
    let found = api.get_analytic_oneshot("Resolve").await.unwrap().unwrap();
    assert_eq!(found.id, "abc");
    assert!(api.get_analytic_oneshot("Missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_polls_until_finished() {
    let server = MockServer::start().await;
    mount_run(&server).await;
    mount_status(&server, json!({"status": "running"}), Some(2)).await;
    mount_status(
        &server,
        json!({"_id": {"$oid": "run1"}, "status": "finished", "results": {"ports": [22, 443]}}),
        None,
    )
    .await;

    let results = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &fast(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results, json!({"ports": [22, 443]}));
    let status_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/status"))
        .count();
    assert_eq!(status_calls, 3);
}

#[tokio::test]
async fn test_error_status_is_job_failed() {
    let server = MockServer::start().await;
    mount_run(&server).await;
    mount_status(&server, json!({"status": "error"}), None).await;

    let err = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &fast(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        YetiError::JobFailed { id, status } => {
            assert_eq!(id, "run1");
            assert_eq!(status, "error");
        }
        other => panic!("Expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stuck_run_times_out() {
    let server = MockServer::start().await;
    mount_run(&server).await;
    mount_status(&server, json!({"status": "running"}), None).await;

    let options = fast().with_max_attempts(3);
    let err = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &options, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        YetiError::PollTimeout { id, attempts, .. } => {
            assert_eq!(id, "run1");
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected PollTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_run() {
    let server = MockServer::start().await;
    mount_run(&server).await;
    mount_status(&server, json!({"status": "running"}), None).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let options = fast().without_timeout();
    let err = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &options, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, YetiError::Cancelled { ref id } if id == "run1"));
}

#[tokio::test]
async fn test_slow_status_request_times_out() {
    let server = MockServer::start().await;
    mount_run(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/oneshot/run1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "finished", "results": {"ok": 1}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let options = fast().with_timeout(Duration::from_millis(200));
    let started = std::time::Instant::now();
    let err = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &options, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, YetiError::PollTimeout { ref id, .. } if id == "run1"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_status_error_propagates() {
    let server = MockServer::start().await;
    mount_run(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/oneshot/run1/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let err = api(&server)
        .analytics_oneshot_run_with(&job(), &target(), &fast(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_add_analytics_settings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/settings"))
        .and(body_json(json!({"shodan_api_key": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"shodan_api_key": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = serde_json::Map::new();
    settings.insert("shodan_api_key".into(), json!("abc"));
    api(&server).add_analytics_settings(&settings).await.unwrap();
}
