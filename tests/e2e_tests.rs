//! End-to-end HTTP tests.

mod common;

use std::sync::Arc;

use lucid::cleanup::CleanupPolicy;
use lucid::scoring::{MockResponse, MockScorer, ScoringBranch};

use common::fixtures::{entries, jpeg_bytes, png_bytes};
use common::harness::{TestServerConfig, spawn_test_server};
use common::http_client::TestClient;

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");

    let client = TestClient::new(server.url());
    let health = client.get("/healthz").await.expect("Health check should succeed");

    assert_eq!(health.status, 200);
    assert_eq!(health.body["status"], "ok");
}

#[tokio::test]
async fn test_ready_endpoint_reports_components() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");

    let client = TestClient::new(server.url());
    let ready = client.get("/ready").await.expect("Ready check should succeed");

    assert_eq!(ready.status, 200);
    assert_eq!(ready.body["components"]["http"], "ready");
    assert_eq!(ready.body["components"]["scratch"], "ready");
}

#[tokio::test]
async fn test_still_image_upload_is_authentic() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("holiday.jpg", jpeg_bytes()).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.lucid_status, "AUTHENTIC");
    assert_eq!(resp.body["status"], "success");
    assert_eq!(resp.body["verdict"], "AUTHENTIC");
    assert_eq!(resp.body["risk_level"], "LOW");
    assert_eq!(resp.body["confidence_avg"], 10.0);
    assert_eq!(resp.body["confidence_max"], 10.0);
    assert_eq!(resp.body["frames_analyzed"], 1);
    assert_eq!(resp.body["filename"], "holiday.jpg");
    assert_eq!(resp.body["hash_algorithm"], "sha256");

    server.settle().await;
    assert_eq!(entries(server.scratch_root()), 0);
}

#[tokio::test]
async fn test_video_upload_is_budgeted() {
    let config = TestServerConfig::default().with_scorer(MockScorer::constant(0.92));
    let server = spawn_test_server(config).await.expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("clip.MP4", b"opaque container".to_vec()).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["verdict"], "FAKE");
    assert_eq!(resp.body["risk_level"], "CRITICAL");
    assert_eq!(resp.body["color_code"], "red");
    assert_eq!(resp.body["samples_extracted"], 12);
    assert_eq!(resp.body["frames_analyzed"], 10);

    server.settle().await;
    assert_eq!(entries(server.scratch_root()), 0);
}

#[tokio::test]
async fn test_multi_branch_upload_reports_details() {
    let config = TestServerConfig::default().with_branches(vec![
        ScoringBranch::new("remote", Arc::new(MockScorer::constant(0.2))),
        ScoringBranch::new("local", Arc::new(MockScorer::constant(0.4))),
    ]);
    let server = spawn_test_server(config).await.expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("portrait.png", png_bytes()).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["verdict"], "REAL");
    assert_eq!(resp.body["confidence"], 40.0);
    assert_eq!(resp.body["details"]["remote"], 20.0);
    assert_eq!(resp.body["details"]["local"], 40.0);
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("report.pdf", b"%PDF-1.7".to_vec()).await.unwrap();

    assert_eq!(resp.status, 415);
    assert_eq!(resp.lucid_status, "error");
    assert_eq!(resp.body["status"], "error");
    assert_eq!(resp.body["kind"], "unsupported_format");
    assert!(resp.body["message"].as_str().is_some());
    assert_eq!(entries(server.scratch_root()), 0);
}

#[tokio::test]
async fn test_unreachable_backends_fail_analysis() {
    let config = TestServerConfig::default().with_scorer(MockScorer::unavailable());
    let server = spawn_test_server(config).await.expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("photo.png", png_bytes()).await.unwrap();

    assert_eq!(resp.status, 502);
    assert_eq!(resp.body["kind"], "analysis_failed");

    server.settle().await;
    assert_eq!(entries(server.scratch_root()), 0);
}

#[tokio::test]
async fn test_hung_backend_times_out() {
    let scorer = MockScorer::new(MockResponse::Hang);
    let config = TestServerConfig::default().with_scorer(scorer);
    let server = spawn_test_server(config).await.expect("Server should start");
    let client = TestClient::new(server.url());

    let resp = client.analyze("photo.png", png_bytes()).await.unwrap();

    assert_eq!(resp.status, 502);
    assert_eq!(resp.body["kind"], "analysis_failed");
}

#[tokio::test]
async fn test_concurrent_uploads_do_not_collide() {
    let mut config = TestServerConfig::default();
    config.cleanup = CleanupPolicy::Immediate;
    let server = spawn_test_server(config).await.expect("Server should start");
    let url = server.url();

    let mut tasks = Vec::new();
    for i in 0..6 {
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            TestClient::new(url)
                .analyze(&format!("frame_{i}.png"), png_bytes())
                .await
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for task in tasks {
        let resp = task.await.unwrap().unwrap();
        assert_eq!(resp.status, 200);
        ids.insert(resp.body["invocation_id"].as_str().unwrap().to_string());
    }

    assert_eq!(ids.len(), 6);
    assert_eq!(entries(server.scratch_root()), 0);
    server.shutdown().await;
}
