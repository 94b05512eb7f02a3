//! HTTP client helpers for tests.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// Status code, `x-lucid-status` header, and JSON body of a response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub lucid_status: String,
    pub body: Value,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub async fn analyze(&self, filename: &str, bytes: Vec<u8>) -> reqwest::Result<TestResponse> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url("/analyze"))
            .multipart(form)
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<TestResponse> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::read(resp).await
    }

    async fn read(resp: reqwest::Response) -> reqwest::Result<TestResponse> {
        let status = resp.status().as_u16();
        let lucid_status = resp
            .headers()
            .get("x-lucid-status")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let body = resp.json().await?;
        Ok(TestResponse {
            status,
            lucid_status,
            body,
        })
    }
}
