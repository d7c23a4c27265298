//! Integration tests for the crawl client
//!
//! Most tests point the client at a wiremock server standing in for the
//! crawl service; the last ones run against the real service router.

use crawl_relay::client::{ClientConfig, ClientError, CrawlClient, Mode};
use crawl_relay::engine::{EngineOutcome, MockEngine, RunConfig};
use crawl_relay::service::{router, serve, AppState};
use crawl_relay::storage::InMemoryTaskStore;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn config_for(port: u16, mode: Mode, output: &Path) -> ClientConfig {
    let mut config = ClientConfig::new("127.0.0.1", port, Some(TOKEN.to_string())).unwrap();
    config.mode = mode;
    config.output_path = output.to_path_buf();
    config.poll_interval = Duration::from_millis(20);
    config.max_wait = Duration::from_secs(5);
    config.request_timeout = Duration::from_secs(5);
    config
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

async fn mount_submission(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/crawl"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": task_id})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_async_nested_result_is_written_verbatim() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/task/t1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t1",
            "status": "completed",
            "result": {"result": {"markdown": "# Hello"}}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(server.address().port(), Mode::Async, &output)).unwrap();

    let outcome = client.run("https://example.com").await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Hello");
    assert_eq!(outcome.markdown.as_deref(), Some("# Hello"));
    assert_eq!(outcome.output_path.as_deref(), Some(output.as_path()));
}

#[tokio::test]
async fn test_failed_task_surfaces_service_error() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t2").await;

    Mock::given(method("GET"))
        .and(path("/task/t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t2",
            "status": "failed",
            "error": "render timeout"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(server.address().port(), Mode::Async, &output)).unwrap();

    let err = client.run("https://example.com").await.unwrap_err();

    assert!(matches!(err, ClientError::TaskFailed(ref msg) if msg == "render timeout"));
    assert!(err.to_string().contains("render timeout"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_pending_tasks_time_out_within_budget() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "slow").await;

    Mock::given(method("GET"))
        .and(path("/task/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"task_id": "slow", "status": "pending"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let mut config = config_for(server.address().port(), Mode::Async, &output);
    config.max_wait = Duration::from_millis(300);
    config.poll_interval = Duration::from_millis(50);
    let client = CrawlClient::new(config).unwrap();

    let started = Instant::now();
    let err = client.run("https://example.com").await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        ClientError::Timeout { task_id, waited } => {
            assert_eq!(task_id, "slow");
            assert_eq!(waited, Duration::from_millis(300));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_secs(2));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_transient_status_errors_are_retried() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t3").await;

    // Earlier mounts take precedence until they are used up
    Mock::given(method("GET"))
        .and(path("/task/t3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream hiccup"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/task/t3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task_id": "t3", "status": "pending"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/task/t3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t3",
            "status": "completed",
            "result": {"result": "# Eventually", "metadata": {"success": true}}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(server.address().port(), Mode::Async, &output)).unwrap();

    client.run("https://example.com").await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Eventually");
}

#[tokio::test]
async fn test_unknown_task_stops_polling() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "gone").await;

    Mock::given(method("GET"))
        .and(path("/task/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found: gone"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(server.address().port(), Mode::Async, &output)).unwrap();

    let err = client.run("https://example.com").await.unwrap_err();
    assert!(matches!(err, ClientError::TaskNotFound(ref id) if id == "gone"));
}

#[tokio::test]
async fn test_no_wait_returns_task_id_without_polling() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t4").await;

    Mock::given(method("GET"))
        .and(path("/task/t4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let mut config = config_for(server.address().port(), Mode::Async, &output);
    config.wait = false;
    let client = CrawlClient::new(config).unwrap();

    let outcome = client.run("https://example.com").await.unwrap();

    assert_eq!(outcome.response, json!({"task_id": "t4"}));
    assert!(outcome.markdown.is_none());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_sync_mode_writes_result() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/crawl_sync"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"url": "https://example.com", "priority": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "# Page\n\nBody text",
            "metadata": {"success": true, "status_code": 200}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("page.md");
    let client = CrawlClient::new(config_for(server.address().port(), Mode::Sync, &output)).unwrap();

    let outcome = client.run("https://example.com").await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Page\n\nBody text");
    assert_eq!(outcome.response["metadata"]["status_code"], 200);
}

#[tokio::test]
async fn test_service_error_detail_is_reported() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/crawl_direct"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"detail": "Crawling failed: HTTP 404"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client =
        CrawlClient::new(config_for(server.address().port(), Mode::Direct, &output)).unwrap();

    match client.run("https://example.com/missing").await.unwrap_err() {
        ClientError::Http { status, detail, .. } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "Crawling failed: HTTP 404");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_unhealthy_service_is_not_called() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = CrawlClient::new(config_for(
        server.address().port(),
        Mode::Sync,
        &dir.path().join("out.md"),
    ))
    .unwrap();

    let err = client.run("https://example.com").await.unwrap_err();
    assert!(matches!(err, ClientError::Unhealthy { status: 503 }));
}

#[tokio::test]
async fn test_connection_refused_is_connect_error() {
    // Bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(port, Mode::Sync, &dir.path().join("out.md"));
    config.health_check = false;
    let client = CrawlClient::new(config).unwrap();

    match client.run("https://example.com").await.unwrap_err() {
        ClientError::Connect { endpoint, .. } => {
            assert_eq!(endpoint, format!("http://127.0.0.1:{}/crawl_sync", port));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_crawl-client"))
        .arg("https://example.com")
        .args(["--host", "127.0.0.1"])
        .args(["--port", &server.address().port().to_string()])
        .env_remove("CRAWL_API_TOKEN")
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CRAWL_API_TOKEN"));

    assert!(matches!(
        ClientConfig::new("127.0.0.1", 1, Some("   ".to_string())),
        Err(ClientError::MissingToken)
    ));
}

#[tokio::test]
async fn test_cli_exits_nonzero_on_failed_task() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t5").await;

    Mock::given(method("GET"))
        .and(path("/task/t5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t5",
            "status": "failed",
            "error": "render timeout"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.md");

    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_crawl-client"))
        .arg("https://example.com")
        .args(["--host", "127.0.0.1"])
        .args(["--port", &server.address().port().to_string()])
        .args(["--mode", "async"])
        .args(["--poll-interval", "1"])
        .arg("--output")
        .arg(&output_path)
        .env("CRAWL_API_TOKEN", TOKEN)
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("render timeout"));
    assert!(!output_path.exists());
}

async fn spawn_service(engine: MockEngine) -> u16 {
    let store = Arc::new(InMemoryTaskStore::default());
    let state = AppState::new(
        Arc::new(engine),
        store,
        RunConfig::default(),
        4,
        Some(TOKEN.to_string()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, router(state), std::future::pending()));
    port
}

#[tokio::test]
async fn test_async_round_trip_against_service() {
    let port = spawn_service(MockEngine::new().with_delay(Duration::from_millis(100))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(port, Mode::Async, &output)).unwrap();

    let outcome = client.run("https://example.com").await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Mock page");
    assert_eq!(outcome.response["metadata"]["success"], true);
}

#[tokio::test]
async fn test_failed_crawl_against_service() {
    let engine = MockEngine::new().with_default(EngineOutcome::Failed {
        status_code: None,
        error_message: "render timeout".to_string(),
    });
    let port = spawn_service(engine).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let client = CrawlClient::new(config_for(port, Mode::Async, &output)).unwrap();

    let err = client.run("https://example.com").await.unwrap_err();
    match err {
        ClientError::TaskFailed(message) => assert!(message.contains("render timeout")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_token_is_rejected_by_service() {
    let port = spawn_service(MockEngine::new()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = ClientConfig::new("127.0.0.1", port, Some("wrong".to_string())).unwrap();
    config.output_path = dir.path().join("out.md");
    let client = CrawlClient::new(config).unwrap();

    match client.run("https://example.com").await.unwrap_err() {
        ClientError::Http { status, detail, .. } => {
            assert_eq!(status, 401);
            assert_eq!(detail, "Not authenticated");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_cli_rejects_out_of_range_wait_flags() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let port = server.address().port().to_string();
    let cases = [
        ("--max-wait", "18446744073709551615"),
        ("--max-wait", "0"),
        ("--poll-interval", "0"),
        ("--poll-interval", "86401"),
    ];

    for (flag, value) in cases {
        let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_crawl-client"))
            .arg("https://example.com")
            .args(["--host", "127.0.0.1"])
            .args(["--port", &port])
            .args(["--mode", "async"])
            .args([flag, value])
            .env("CRAWL_API_TOKEN", TOKEN)
            .output()
            .await
            .unwrap();

        assert_eq!(output.status.code(), Some(1), "{} {}", flag, value);
        assert!(String::from_utf8_lossy(&output.stderr).contains(flag));
    }
}

#[tokio::test]
async fn test_huge_max_wait_does_not_overflow() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_submission(&server, "t6").await;

    Mock::given(method("GET"))
        .and(path("/task/t6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t6",
            "status": "completed",
            "result": {"result": "# Done"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.md");
    let mut config = config_for(server.address().port(), Mode::Async, &output);
    config.max_wait = Duration::MAX;
    let client = CrawlClient::new(config).unwrap();

    client.run("https://example.com").await.unwrap();
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "# Done");
}
