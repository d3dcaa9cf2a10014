//! Shared plumbing for the OpenAI-compatible HTTP providers.
//!
//! One [`reqwest::Client`] is shared by every session; each request carries
//! its own timeout and the session's bearer key.

use std::sync::Arc;

use text2sql_core::completion::CompletionProvider;
use text2sql_core::embedding::EmbeddingProvider;
use text2sql_core::session::{Credential, ProviderFactory};
use text2sql_core::Result;

use crate::completion::OpenAiCompleter;
use crate::config::Config;
use crate::embedding::OpenAiEmbedder;

/// Join a configured base URL and an endpoint path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Trim an error body so a misbehaving upstream cannot flood logs and
/// API responses.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 500;
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Builds OpenAI providers for a session credential.
#[derive(Clone)]
pub struct OpenAiFactory {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl OpenAiFactory {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("t2s/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }
}

impl ProviderFactory for OpenAiFactory {
    fn embedding_provider(&self, credential: &Credential) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(OpenAiEmbedder::new(
            self.client.clone(),
            &self.config.embedding,
            credential.clone(),
        )))
    }

    fn completion_provider(&self, credential: &Credential) -> Result<Arc<dyn CompletionProvider>> {
        Ok(Arc::new(OpenAiCompleter::new(
            self.client.clone(),
            &self.config.completion,
            credential.clone(),
        )))
    }
}
