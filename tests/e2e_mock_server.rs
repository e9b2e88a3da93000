//! E2E tests using the mock Yeti server.
//!
//! These tests exercise full workflows against the mock server,
//! testing realistic scenarios rather than individual endpoints.

#![cfg(feature = "test-server")]

use std::time::Duration;

use serde_json::json;
use yetiapi::mock_server::{MockServer, MockState};
use yetiapi::{
    CancellationToken, EntityApi, LinkApi, NewObservable, ObjectRef, ObservableApi, PollOptions,
    SearchQuery, YetiApi, YetiError,
};

fn fast() -> PollOptions {
    PollOptions::default().with_interval(Duration::from_millis(5))
}

// =============================================================================
// Server Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_server_starts_on_random_port() {
    let server1 = MockServer::start().await;
    let server2 = MockServer::start().await;

    assert_ne!(server1.url(), server2.url());

    server1.shutdown().await;
    server2.shutdown().await;
}

#[tokio::test]
async fn test_connection_check() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    tokio_test::assert_ok!(api.check_connection().await);

    let wrong = YetiApi::new(&server.url().replace("/api", "/nope"), None).unwrap();
    tokio_test::assert_err!(wrong.check_connection().await);

    server.shutdown().await;
}

// =============================================================================
// Observable Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_add_then_details_round_trip() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let obs = NewObservable::new("hxxps://test[.]com/")
        .with_tags(["asd"])
        .with_context("source_note", "from e2e");
    let added = api.add_observable(&obs).await.unwrap();
    let details = api.observable(&added.id).await.unwrap();

    assert_eq!(details.value, "https://test.com/");
    assert_eq!(details.kind.as_deref(), Some("Url"));
    assert_eq!(details.tag_names(), vec!["asd"]);
    assert_eq!(details.context[0]["source_note"], "from e2e");

    server.shutdown().await;
}

#[tokio::test]
async fn test_url_normalization_cases() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    for (input, expected) in [
        ("hxxp://test.com/", "http://test.com/"),
        ("test[.]com", "test.com"),
        ("http://test.com", "http://test.com/"),
    ] {
        let obs = api.add_observable(&NewObservable::new(input)).await.unwrap();
        assert_eq!(obs.value, expected, "normalizing {input}");
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_bulk_add_returns_one_per_input() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let items: Vec<NewObservable> = ["a.com", "b.com", "c.com"]
        .into_iter()
        .map(|v| NewObservable::new(v).with_tags(["bulk"]))
        .collect();
    let added = api.bulk_add_observables(&items).await.unwrap();

    assert_eq!(added.len(), 3);
    for (obs, input) in added.iter().zip(&items) {
        assert_eq!(obs.value, input.value);
        assert!(obs.has_tag("bulk"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_tagging_and_search() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let tagged = api
        .search_observables(&SearchQuery::new().filter("tags", "c2"))
        .await
        .unwrap();
    assert_eq!(tagged.len(), 2);

    let host = api.add_hostname("fresh.example.net", &[]).await.unwrap();
    api.tag_observable(&host.id, &["c2".to_string()]).await.unwrap();

    let tagged = api
        .search_all_observables(&SearchQuery::new().filter("tags", "c2").count(1))
        .await
        .unwrap();
    assert_eq!(tagged.len(), 3);

    server.shutdown().await;
}

#[tokio::test]
async fn test_regex_search_single_hit() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let query = SearchQuery::new()
        .filter("value", "^http://evil.*pay.oad$")
        .regex(true);
    let hits = api.search_observables(&query).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].value, "http://evil.example.com/payload");

    server.shutdown().await;
}

#[tokio::test]
async fn test_delete_then_details_is_not_found() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let obs = api.add_ip("192.0.2.1", &[]).await.unwrap();
    api.delete_observable(&obs.id).await.unwrap();

    let err = api.observable(&obs.id).await.unwrap_err();
    assert!(err.is_not_found());

    server.shutdown().await;
}

#[tokio::test]
async fn test_analysis_match_known_and_unknown() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let matched = api
        .analysis_match(&["evil[.]example.com", "benign.example.org"])
        .await
        .unwrap();

    assert_eq!(matched.known_values(), vec!["evil.example.com"]);
    assert_eq!(matched.unknown, vec!["benign.example.org"]);

    server.shutdown().await;
}

// =============================================================================
// Entity and Graph Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_entities_links_and_investigation() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let malware = api.add_malware("test_malware", &["asd"]).await.unwrap();
    let ttp = api.add_ttp("test_ttp", "toto", &[]).await.unwrap();
    let host = api.add_hostname("c2.example.com", &[]).await.unwrap();

    assert_eq!(api.entity(&ttp.id).await.unwrap().extra["killchain"], "toto");

    let link = api
        .link_entity_to_observable(&malware.id, &host.id, "C2 server")
        .await
        .unwrap();
    let link_id = link["id"].as_str().unwrap().to_string();
    let updated = api.update_link(&link_id, None, "Primary C2").await.unwrap();
    assert_eq!(updated["description"], "Primary C2");
    api.delete_links(&[link_id]).await.unwrap();

    let investigation = api.investigation_create("Case 1").await.unwrap();
    api.investigation_add(
        &investigation.id,
        &[ObjectRef::entity(&malware.id), ObjectRef::observable(&host.id)],
    )
    .await
    .unwrap();
    api.investigation_remove(&investigation.id, &[ObjectRef::observable(&host.id)])
        .await
        .unwrap();

    let fetched = api.investigation(&investigation.id).await.unwrap();
    assert_eq!(fetched.name.as_deref(), Some("Case 1"));
    assert_eq!(
        fetched.nodes,
        vec![json!({"$id": {"$oid": malware.id}, "$ref": "entity"})]
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_link_to_missing_node_fails() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let malware = api.add_malware("m", &[]).await.unwrap();
    let err = api
        .link_entity_to_observable(&malware.id, "000000000000000000000999", "")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    server.shutdown().await;
}

// =============================================================================
// File Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_upload_then_download_by_id_and_hash() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("report.json");
    let content = br#"{"z": 1,  "a": [1, 2]}"#;
    std::fs::write(&file, content).unwrap();

    let added = api
        .observable_file_add(&file, &["report".to_string()], &serde_json::Map::new())
        .await
        .unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].filenames, vec!["report.json"]);
    assert_eq!(added[0].tag_names(), vec!["report"]);

    let sha256 = added[0].sha256().unwrap().to_string();
    let by_hash = api.observable_file_contents(None, Some(&sha256)).await.unwrap();
    let by_id = api
        .observable_file_contents(Some(&added[0].id), None)
        .await
        .unwrap();
    assert_eq!(by_hash, content);
    assert_eq!(by_id, content);

    let found = api.search_files_by_hash(&sha256).await.unwrap();
    assert_eq!(found[0].id, added[0].id);

    server.shutdown().await;
}

// =============================================================================
// Analytics Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_oneshot_run_finishes() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let job = api
        .get_analytic_oneshot("Resolve hostname")
        .await
        .unwrap()
        .expect("fixture analytic missing");
    let host = api.add_hostname("evil.example.com", &[]).await.unwrap();

    let results = api
        .analytics_oneshot_run_with(&job, &host, &fast(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(results["nodes"][0]["value"], "203.0.113.7");

    server.shutdown().await;
}

#[tokio::test]
async fn test_oneshot_run_error_and_timeout() {
    let server = MockServer::start().await;
    let api = YetiApi::new(server.url(), None).unwrap();
    let host = api.add_hostname("evil.example.com", &[]).await.unwrap();

    let broken = api.get_analytic_oneshot("Broken").await.unwrap().unwrap();
    let err = api
        .analytics_oneshot_run_with(&broken, &host, &fast(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, YetiError::JobFailed { ref status, .. } if status == "error"));

    let forever = api.get_analytic_oneshot("Forever").await.unwrap().unwrap();
    let err = api
        .analytics_oneshot_run_with(
            &forever,
            &host,
            &fast().with_max_attempts(4),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, YetiError::PollTimeout { attempts: 4, .. }));

    server.shutdown().await;
}

#[tokio::test]
async fn test_settings_are_stored() {
    let server = MockServer::start_empty().await;
    let api = YetiApi::new(server.url(), None).unwrap();

    let mut settings = serde_json::Map::new();
    settings.insert("virustotal_api_key".into(), json!("vt"));
    api.add_analytics_settings(&settings).await.unwrap();

    let state = server.state();
    assert_eq!(state.read().await.settings["virustotal_api_key"], "vt");

    server.shutdown().await;
}

#[tokio::test]
async fn test_required_api_key() {
    let server = MockServer::with_state(MockState::new().with_required_api_key("s3cret")).await;

    let err = YetiApi::new(server.url(), Some("wrong"))
        .unwrap()
        .observable("x")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    server.shutdown().await;
}
