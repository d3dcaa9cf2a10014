//! Per-user session state machine.
//!
//! ```text
//! NoCredential ──set_credential──▶ CredentialSet ──load_schema──▶ SchemaLoaded
//!                                                                  │  ▲
//!                                                                  └──┘ load_schema (replace)
//! ```
//!
//! A [`PipelineSession`] owns at most one [`Pipeline`] (and therefore one
//! vector index), the credential it was built from, and a bounded history.
//! Conversions are only accepted in `SchemaLoaded`.
//!
//! The session itself is not synchronized; callers that share it across
//! tasks wrap it in a mutex so operations on one session never interleave.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::history::QueryHistory;
use crate::models::HistoryEntry;
use crate::pipeline::{LoadReport, Pipeline, PipelineSettings};

/// An API key for the hosted services. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Builds hosted-service clients for a credential.
pub trait ProviderFactory: Send + Sync {
    fn embedding_provider(&self, credential: &Credential) -> Result<Arc<dyn EmbeddingProvider>>;
    fn completion_provider(&self, credential: &Credential) -> Result<Arc<dyn CompletionProvider>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoCredential,
    CredentialSet,
    SchemaLoaded,
}

/// A serializable snapshot of a session's progress.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub history_len: usize,
}

pub struct PipelineSession {
    id: String,
    settings: Arc<PipelineSettings>,
    credential: Option<Credential>,
    pipeline: Option<Pipeline>,
    history: QueryHistory,
    created_at: DateTime<Utc>,
}

impl PipelineSession {
    pub fn new(id: impl Into<String>, settings: Arc<PipelineSettings>, history_limit: usize) -> Self {
        Self {
            id: id.into(),
            settings,
            credential: None,
            pipeline: None,
            history: QueryHistory::new(history_limit),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        match (&self.credential, &self.pipeline) {
            (Some(_), Some(p)) if p.is_loaded() => SessionState::SchemaLoaded,
            (Some(_), _) => SessionState::CredentialSet,
            (None, _) => SessionState::NoCredential,
        }
    }

    /// Set or replace the credential.
    ///
    /// Replacing a credential swaps the providers but keeps an already
    /// indexed schema, since the embedding model is unchanged.
    pub fn set_credential(
        &mut self,
        credential: Credential,
        factory: &dyn ProviderFactory,
    ) -> Result<()> {
        if credential.expose().trim().is_empty() {
            return Err(Error::MissingCredential);
        }

        let embedder = factory.embedding_provider(&credential)?;
        let completer = factory.completion_provider(&credential)?;
        match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.set_providers(embedder, completer),
            None => {
                self.pipeline = Some(Pipeline::new(self.settings.clone(), embedder, completer));
            }
        }
        self.credential = Some(credential);
        info!(session = %self.id, "Credential set");
        Ok(())
    }

    /// Build (or rebuild) the session's index from an uploaded schema.
    pub async fn load_schema(&mut self, schema: &Value) -> Result<LoadReport> {
        let pipeline = self.pipeline.as_mut().ok_or(Error::MissingCredential)?;
        let report = pipeline.load_schema(schema).await?;
        info!(
            session = %self.id,
            tables = report.tables,
            fragments = report.fragments,
            "Schema loaded"
        );
        Ok(report)
    }

    /// Convert a question to SQL and record it in the history.
    ///
    /// A failed conversion leaves the history untouched.
    pub async fn convert(&mut self, question: &str) -> Result<HistoryEntry> {
        let pipeline = self.pipeline.as_ref().ok_or(Error::MissingCredential)?;
        if !pipeline.is_loaded() {
            return Err(Error::SchemaNotLoaded);
        }

        let sql_query = pipeline.convert(question).await?;
        let entry = HistoryEntry {
            sql_query,
            question: question.to_string(),
            timestamp: Utc::now(),
        };
        self.history.record(entry.clone());
        Ok(entry)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            state: self.state(),
            created_at: self.created_at,
            history_len: self.history.len(),
        }
    }

    /// Past conversions, most recent first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.entries()
    }
}
