//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to create mock HTTP servers and drive a full
//! kickoff → provisioning → workflow cycle end-to-end against a SQLite file.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tempfile::TempDir;
use wavecrawl::config::Config;
use wavecrawl::output::load_statistics;
use wavecrawl::pipeline::Pipeline;
use wavecrawl::state::{SessionStatus, StopReason};
use wavecrawl::provisioner::task_fingerprint;
use wavecrawl::storage::{Database, FrontierEntry, FrontierTables, SessionKey};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(30);

/// Creates a test configuration with short delays
fn create_test_config(db_path: &str) -> Config {
    let mut config = Config::default();
    config.queues.crawl_tasks = "crawl-tasks".to_string();
    config.queues.executions = "executions".to_string();
    config.workflow.definition = "breadth-first".to_string();
    config.workflow.fetch_retries = 0;
    config.workflow.retry_delay_ms = 10;
    config.provisioning.min_delay_ms = 10;
    config.provisioning.max_delay_ms = 20;
    config.provisioning.timeout_ms = 1_000;
    config.storage.database_path = db_path.to_string();
    config
}

fn open_database(dir: &TempDir) -> (Database, String) {
    let db_path = dir.path().join("crawl.db");
    let db = Database::open(&db_path).expect("Failed to open database");
    (db, db_path.to_string_lossy().to_string())
}

async fn mount_page(server: &MockServer, route: &str, html: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

fn kickoff_body(url: &str) -> String {
    format!(r#"{{"url": "{}"}}"#, url)
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/", mock_server.uri());

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><a href="/page1">Page 1</a><a href="page2">Page 2</a></body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        r#"<html><body><a href="/">Home</a><a href="/page2">Page 2</a></body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        r#"<html><body><a href="/missing">Gone</a><a href="mailto:a@b.c">Mail</a></body></html>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);
    let config = create_test_config(&db_path);
    let pipeline = Pipeline::start(&config, db.clone()).unwrap();

    let submitted_at = Utc::now();
    let response = pipeline.gate().handle(&kickoff_body(&seed)).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "Task Queued!");

    let session = pipeline
        .wait_for_session(&seed, submitted_at, WAIT)
        .await
        .unwrap()
        .expect("Crawl did not finish");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.stop_reason, Some(StopReason::FrontierExhausted));
    assert_eq!(session.waves, 3);

    let stats = load_statistics(&db, &session.session_key).unwrap();
    assert_eq!(stats.visited, 4);
    assert_eq!(stats.not_visited, 0);
    assert!(pipeline.dead_letters().is_empty());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_gate_rejections_create_no_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);
    let pipeline = Pipeline::start(&create_test_config(&db_path), db.clone()).unwrap();
    let gate = pipeline.gate();

    let missing = gate.handle("{}").await;
    assert_eq!(missing.status, 400);
    assert_eq!(missing.body, "url not found within the body");

    let malformed = gate.handle(&kickoff_body("http://")).await;
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.body, "url is malformed");

    pipeline.shutdown().await;
    assert!(db.list_sessions().unwrap().is_empty());
}

#[tokio::test]
async fn test_wave_budget_stops_deep_site() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/0", mock_server.uri());

    for i in 0..2 {
        mount_page(
            &mock_server,
            &format!("/{}", i),
            &format!(r#"<html><body><a href="/{}">Next</a></body></html>"#, i + 1),
            1,
        )
        .await;
    }
    // Pages past the budget must never be fetched
    Mock::given(method("GET"))
        .and(path("/2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);
    let mut config = create_test_config(&db_path);
    config.workflow.max_waves = 2;
    let pipeline = Pipeline::start(&config, db.clone()).unwrap();

    let submitted_at = Utc::now();
    assert_eq!(pipeline.gate().handle(&kickoff_body(&seed)).await.status, 200);

    let session = pipeline
        .wait_for_session(&seed, submitted_at, WAIT)
        .await
        .unwrap()
        .expect("Crawl did not finish");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.stop_reason, Some(StopReason::WaveBudget));
    assert_eq!(session.waves, 2);

    let stats = load_statistics(&db, &session.session_key).unwrap();
    assert_eq!(stats.visited, 2);
    assert_eq!(stats.not_visited, 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_repeated_kickoff_is_deduplicated() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/", mock_server.uri());
    mount_page(&mock_server, "/", "<html><body>leaf</body></html>", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);
    let pipeline = Pipeline::start(&create_test_config(&db_path), db.clone()).unwrap();

    let gate = pipeline.gate();
    let submitted_at = Utc::now();
    assert_eq!(gate.handle(&kickoff_body(&seed)).await.status, 200);
    assert_eq!(gate.handle(&kickoff_body(&seed)).await.status, 200);

    pipeline
        .wait_for_session(&seed, submitted_at, WAIT)
        .await
        .unwrap()
        .expect("Crawl did not finish");
    pipeline.shutdown().await;

    let sessions = db.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_unreachable_seed_still_completes() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/", mock_server.uri());
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);
    let mut config = create_test_config(&db_path);
    config.workflow.fetch_retries = 1;
    let pipeline = Pipeline::start(&config, db.clone()).unwrap();

    let submitted_at = Utc::now();
    assert_eq!(pipeline.gate().handle(&kickoff_body(&seed)).await.status, 200);

    let session = pipeline
        .wait_for_session(&seed, submitted_at, WAIT)
        .await
        .unwrap()
        .expect("Crawl did not finish");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.waves, 1);
    let stats = load_statistics(&db, &session.session_key).unwrap();
    assert_eq!(stats.visited, 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_earlier_finished_crawl_of_same_seed_is_not_reported() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/", mock_server.uri());
    mount_page(&mock_server, "/", "<html><body>leaf</body></html>", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (db, db_path) = open_database(&dir);

    // A crawl of the same seed that finished an hour ago
    let host = url::Url::parse(&seed).unwrap().host_str().unwrap().to_string();
    let an_hour_ago: DateTime<Utc> = Utc::now() - chrono::Duration::hours(1);
    let old = db
        .reserve_session(
            &SessionKey::derive(&host, an_hour_ago.timestamp()),
            &seed,
            &task_fingerprint(&seed),
            an_hour_ago,
        )
        .unwrap();
    db.create_table(&old).unwrap();
    db.open_frontier(&old)
        .unwrap()
        .put(&FrontierEntry::not_visited(&seed))
        .unwrap();
    db.complete_session(&old, 7, StopReason::FrontierExhausted)
        .unwrap();

    let pipeline = Pipeline::start(&create_test_config(&db_path), db.clone()).unwrap();
    let submitted_at = Utc::now();
    assert_eq!(pipeline.gate().handle(&kickoff_body(&seed)).await.status, 200);

    let session = pipeline
        .wait_for_session(&seed, submitted_at, WAIT)
        .await
        .unwrap()
        .expect("Crawl did not finish");

    assert_ne!(session.session_key, old);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.waves, 1);
    let stats = load_statistics(&db, &session.session_key).unwrap();
    assert_eq!(stats.visited, 1);

    pipeline.shutdown().await;
    assert_eq!(db.list_sessions().unwrap().len(), 2);
}
