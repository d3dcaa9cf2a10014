//! TOML configuration.
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below. See `config/t2s.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use text2sql_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use text2sql_core::history::DEFAULT_HISTORY_LIMIT;
use text2sql_core::pipeline::PipelineSettings;
use text2sql_core::prompt::PromptTemplate;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Overrides the built-in system message.
    #[serde(default)]
    pub system_template: Option<String>,
    /// Overrides the built-in user message.
    #[serde(default)]
    pub user_template: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            max_rows: default_max_rows(),
            system_template: None,
            user_template: None,
        }
    }
}

fn default_dialect() -> String {
    "sql".to_string()
}
fn default_max_rows() -> usize {
    10
}

impl PromptConfig {
    /// The effective template: the built-in one with any overrides applied.
    pub fn template(&self) -> PromptTemplate {
        let mut template = PromptTemplate::builtin();
        if self.system_template.is_none() && self.user_template.is_none() {
            return template;
        }
        if let Some(system) = &self.system_template {
            template.system = system.clone();
        }
        if let Some(user) = &self.user_template {
            template.user = user.clone();
        }
        template.version = "custom".to_string();
        template
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Requested vector size; the model default when unset.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            dims: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_completion_model(),
            temperature: None,
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_completion_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed browser origins; `"*"` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}
fn default_max_upload_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Sessions untouched for this long are dropped; `0` disables expiry.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_idle_timeout() -> u64 {
    3600
}
fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Pipeline tuning derived from the chunking, retrieval, prompt and
    /// embedding sections.
    pub fn pipeline_settings(&self) -> Arc<PipelineSettings> {
        Arc::new(PipelineSettings {
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.chunk_overlap,
            top_k: self.retrieval.top_k,
            dialect: self.prompt.dialect.clone(),
            max_rows: self.prompt.max_rows,
            embed_batch_size: self.embedding.batch_size,
            template: self.prompt.template(),
        })
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            anyhow::bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        if self.prompt.max_rows < 1 {
            anyhow::bail!("prompt.max_rows must be >= 1");
        }
        let missing = self.prompt.template().missing_placeholders();
        if !missing.is_empty() {
            anyhow::bail!(
                "prompt templates must reference every placeholder; missing: {}",
                missing
                    .iter()
                    .map(|name| format!("{{{}}}", name))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        if self.embedding.batch_size < 1 {
            anyhow::bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.dims == Some(0) {
            anyhow::bail!("embedding.dims must be > 0 when set");
        }
        if self.embedding.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be > 0");
        }

        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be > 0");
        }
        if self.server.cors_origins.iter().any(|o| o != "*")
            && self.server.cors_origins.iter().any(|o| o == "*")
        {
            anyhow::bail!("server.cors_origins cannot mix \"*\" with explicit origins");
        }

        Ok(())
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
