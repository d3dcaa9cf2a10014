//! The retrieval-augmented SQL pipeline.
//!
//! A [`Pipeline`] owns one vector index plus handles to the embedding and
//! completion providers. It has two phases:
//!
//! - **build** ([`Pipeline::load_schema`]): schema → documents → fragments →
//!   embeddings → index. The new corpus replaces the old one only after every
//!   fragment has been embedded, so a failed build leaves the previous index
//!   usable.
//! - **query** ([`Pipeline::convert`]): question → embedding → top-k search →
//!   prompt → completion. The completion text is returned verbatim.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::chunk::{chunk_documents, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::completion::CompletionProvider;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::models::{SchemaDocument, ScoredFragment};
use crate::prompt::{Prompt, PromptInputs, PromptTemplate};
use crate::schema::load_schema;
use crate::store::memory::InMemoryStore;
use crate::store::VectorStore;

/// Tuning knobs for a pipeline, decoupled from application config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum fragment length, in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive fragments.
    pub chunk_overlap: usize,
    /// Number of fragments retrieved per question.
    pub top_k: usize,
    /// SQL dialect named in the prompt.
    pub dialect: String,
    /// Result-row cap the model is told to respect.
    pub max_rows: usize,
    /// Fragments per embedding request.
    pub embed_batch_size: usize,
    pub template: PromptTemplate,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: 4,
            dialect: "sql".to_string(),
            max_rows: 10,
            embed_batch_size: 64,
            template: PromptTemplate::builtin(),
        }
    }
}

/// Outcome of a successful schema load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: usize,
    pub fragments: usize,
}

pub struct Pipeline {
    settings: Arc<PipelineSettings>,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    index: Box<dyn VectorStore>,
    loaded: bool,
}

impl Pipeline {
    /// Create a pipeline with an empty in-memory index.
    pub fn new(
        settings: Arc<PipelineSettings>,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            settings,
            embedder,
            completer,
            index: Box::new(InMemoryStore::new()),
            loaded: false,
        }
    }

    /// Use a different similarity backend. Must be called before loading.
    pub fn with_store(mut self, store: Box<dyn VectorStore>) -> Self {
        self.index = store;
        self.loaded = false;
        self
    }

    /// Swap the providers, keeping the indexed corpus.
    pub fn set_providers(
        &mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
    ) {
        self.embedder = embedder;
        self.completer = completer;
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Parse, chunk, embed and index an uploaded schema array.
    pub async fn load_schema(&mut self, schema: &Value) -> Result<LoadReport> {
        let docs = load_schema(schema)?;
        self.load_documents(&docs).await
    }

    /// Chunk, embed and index already-parsed documents, replacing the
    /// current corpus.
    pub async fn load_documents(&mut self, docs: &[SchemaDocument]) -> Result<LoadReport> {
        let fragments = chunk_documents(
            docs,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        );

        let mut vectors = Vec::with_capacity(fragments.len());
        for batch in fragments.chunks(self.settings.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|f| f.text.clone()).collect();
            let embedded = self.embedder.embed_texts(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::EmbeddingService(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }

        let fragment_count = fragments.len();
        self.index
            .replace_all(vectors.into_iter().zip(fragments).collect())
            .await?;
        self.loaded = true;

        info!(
            tables = docs.len(),
            fragments = fragment_count,
            model = self.embedder.model_name(),
            "Schema indexed"
        );

        Ok(LoadReport {
            tables: docs.len(),
            fragments: fragment_count,
        })
    }

    /// Return the fragments most similar to `question`.
    ///
    /// An empty index yields an empty list without calling the embedding
    /// service.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredFragment>> {
        if !self.loaded {
            return Err(Error::SchemaNotLoaded);
        }
        if self.index.is_empty().await? {
            debug!("Index is empty; skipping retrieval");
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), question).await?;
        let hits = self.index.search(&query_vec, self.settings.top_k).await?;
        debug!(hits = hits.len(), top_k = self.settings.top_k, "Retrieved schema context");
        Ok(hits)
    }

    /// Retrieve context for `question` and render the prompt.
    pub async fn build_prompt(&self, question: &str) -> Result<Prompt> {
        let context = self.retrieve(question).await?;
        Ok(self.render(&context, question))
    }

    /// Render a prompt from already-retrieved context.
    pub fn render(&self, context: &[ScoredFragment], question: &str) -> Prompt {
        self.settings.template.render(&PromptInputs {
            dialect: &self.settings.dialect,
            top_k: self.settings.max_rows,
            table_info: context,
            question,
        })
    }

    /// Convert a natural-language question into SQL text.
    pub async fn convert(&self, question: &str) -> Result<String> {
        let prompt = self.build_prompt(question).await?;
        debug!(model = self.completer.model_name(), "Requesting completion");
        self.completer.complete(&prompt).await
    }
}
