//! # text2sql Core
//!
//! Network-free logic for text2sql: data models, schema loading, chunking,
//! the vector store abstraction, prompt assembly, the retrieval-augmented
//! pipeline, and the per-session state machine.
//!
//! This crate contains no tokio, HTTP, or filesystem dependencies. Hosted
//! services are reached through the [`embedding::EmbeddingProvider`] and
//! [`completion::CompletionProvider`] traits, implemented by the `text2sql`
//! app crate.
//!
//! ## Data Flow
//!
//! ```text
//! build:  schema JSON ─▶ schema::load_schema ─▶ chunk::chunk_document ─▶ embed ─▶ VectorStore
//! query:  question ─▶ embed ─▶ VectorStore::search ─▶ prompt::PromptTemplate ─▶ complete ─▶ SQL
//! ```

pub mod chunk;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod session;
pub mod store;

pub use error::{Error, Result};
