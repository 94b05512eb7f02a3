use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;
use crate::budget::SampleBudgeter;
use crate::cleanup::{CleanupPolicy, CleanupScheduler};
use crate::fusion::{FusionEngine, FusionPolicy};
use crate::media::{MediaSampler, MockVideoDecoder, SamplerConfig};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::scoring::{BranchRunner, MockScorer, ScoringBranch};

const BOUNDARY: &str = "lucid-test-boundary";

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn test_state(scratch: &TempDir, scorer: MockScorer) -> HandlerState {
    let sampler = MediaSampler::new(
        SamplerConfig::default(),
        Arc::new(MockVideoDecoder::new(4, 1.0)),
    );
    let config = PipelineConfig {
        cleanup: CleanupPolicy::Immediate,
        ..PipelineConfig::new(scratch.path())
    };
    let pipeline = Pipeline::new(
        config,
        sampler,
        SampleBudgeter::default(),
        BranchRunner::new(vec![ScoringBranch::new("mock", Arc::new(scorer))]),
        FusionEngine::new(FusionPolicy::MeanMax),
        CleanupScheduler::spawn(),
    );
    HandlerState::new(Arc::new(pipeline))
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_handler() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::constant(0.1)));

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[LUCID_STATUS_HEADER], "ok");
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_ready_handler_reports_components() {
    let scratch = TempDir::new().unwrap();
    let state = test_state(&scratch, MockScorer::constant(0.1));
    let app = create_router_with_state(state.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["components"]["scratch"], "ready");
    assert_eq!(json["components"]["cleanup"], "ready");

    state.pipeline.cleanup().shutdown().await;
    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["components"]["cleanup"], "stopped");
}

#[tokio::test]
async fn test_analyze_still_image() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::constant(0.95)));

    let response = app
        .oneshot(analyze_request(multipart_body("file", "upload.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[LUCID_STATUS_HEADER], "FAKE");
    let json = json_body(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["verdict"], "FAKE");
    assert_eq!(json["risk_level"], "CRITICAL");
    assert_eq!(json["color_code"], "red");
    assert_eq!(json["filename"], "upload.png");
    assert_eq!(json["frames_analyzed"], 1);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analyze_unsupported_format_is_415() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::constant(0.1)));

    let response = app
        .oneshot(analyze_request(multipart_body("file", "notes.txt", b"hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.headers()[LUCID_STATUS_HEADER], "error");
    let json = json_body(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["kind"], "unsupported_format");
}

#[tokio::test]
async fn test_analyze_corrupt_image_is_422() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::constant(0.1)));

    let response = app
        .oneshot(analyze_request(multipart_body("file", "broken.jpg", b"not a jpeg")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["kind"], "decode_failure");
}

#[tokio::test]
async fn test_analyze_all_scorers_down_is_502() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::unavailable()));

    let response = app
        .oneshot(analyze_request(multipart_body("file", "upload.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["kind"], "analysis_failed");
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analyze_missing_file_field_is_400() {
    let scratch = TempDir::new().unwrap();
    let app = create_router_with_state(test_state(&scratch, MockScorer::constant(0.1)));

    let response = app
        .oneshot(analyze_request(multipart_body("attachment", "upload.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "invalid_request");
}

#[tokio::test]
async fn test_analyze_rejects_oversized_upload() {
    let scratch = TempDir::new().unwrap();
    let state = test_state(&scratch, MockScorer::constant(0.1)).with_max_upload_bytes(64);
    let app = create_router_with_state(state);

    let response = app
        .oneshot(analyze_request(multipart_body("file", "big.png", &[0u8; 4096])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
