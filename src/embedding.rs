//! OpenAI embeddings provider.
//!
//! Calls `POST {base_url}/embeddings` with the session's API key. Requests
//! are bounded by `embedding.timeout_secs` and are not retried: a failure is
//! reported to the caller as [`Error::EmbeddingService`] or
//! [`Error::Timeout`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use text2sql_core::embedding::EmbeddingProvider;
use text2sql_core::session::Credential;
use text2sql_core::{Error, Result};

use crate::config::EmbeddingConfig;
use crate::openai::{endpoint, truncate_body};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: Option<usize>,
    timeout_secs: u64,
    credential: Credential,
}

impl OpenAiEmbedder {
    pub fn new(client: reqwest::Client, config: &EmbeddingConfig, credential: Credential) -> Self {
        Self {
            client,
            url: endpoint(&config.base_url, "embeddings"),
            model: config.model.clone(),
            dims: config.dims,
            timeout_secs: config.timeout_secs,
            credential,
        }
    }

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                service: "embedding",
                secs: self.timeout_secs,
            }
        } else {
            Error::EmbeddingService(format!("request failed: {}", err))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, batch = texts.len(), "Requesting embeddings");

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dims,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.credential.expose())
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingService(format!(
                "OpenAI API error {}: {}",
                status,
                truncate_body(&body_text)
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.send_error(e)
            } else {
                Error::EmbeddingService(format!("invalid response: {}", e))
            }
        })?;
        parse_embeddings(parsed, texts.len())
    }
}

/// Order vectors by their `index` field. The indices must be exactly
/// `0..expected`, one vector per input.
fn parse_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(Error::EmbeddingService(format!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    if let Some((pos, bad)) = data.iter().enumerate().find(|(pos, d)| d.index != *pos) {
        return Err(Error::EmbeddingService(format!(
            "unexpected embedding index {} at position {}",
            bad.index, pos
        )));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
