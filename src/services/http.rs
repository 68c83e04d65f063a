use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::Service;
use crate::pipeline::stage::Argument;

/// A service reached over HTTP at a configured location.
///
/// Each call POSTs `{"endpoint": ..., "arguments": {...}}` to
/// `<location>/<endpoint>` and returns the response body.
pub struct HttpService {
    name: String,
    location: String,
    client: reqwest::Client,
}

impl HttpService {
    pub fn new(name: &str, location: String) -> Self {
        Self {
            name: name.to_string(),
            location,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.location.trim_end_matches('/'), endpoint)
    }
}

fn request_body(endpoint: &str, arguments: &[Argument]) -> Value {
    let arguments: Map<String, Value> = arguments
        .iter()
        .map(|a| (a.key.clone(), a.value.clone()))
        .collect();
    serde_json::json!({ "endpoint": endpoint, "arguments": arguments })
}

#[async_trait]
impl Service for HttpService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, endpoint: &str, arguments: &[Argument]) -> Result<String> {
        let url = self.endpoint_url(endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request_body(endpoint, arguments))
            .send()
            .await
            .with_context(|| format!("{} request to {url} failed", self.name))?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read service response")?;
        if !status.is_success() {
            anyhow::bail!("{} {endpoint} returned {status}: {body}", self.name);
        }
        Ok(body)
    }
}
