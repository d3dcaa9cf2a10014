//! # text2sql
//!
//! Natural-language to SQL conversion over a retrieval-augmented schema
//! index.
//!
//! A user uploads a JSON array of table descriptions. Each description is
//! split into overlapping fragments, embedded, and indexed in memory. A
//! question is embedded with the same model, the closest fragments are
//! retrieved and assembled into a prompt, and a chat model writes the SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  Schema    │──▶│ Chunk+Embed  │──▶│  In-memory  │
//! │  upload    │   │              │   │ vector index│
//! └────────────┘   └──────────────┘   └──────┬──────┘
//!                                           │ top-k
//!                  ┌──────────────┐   ┌──────▼──────┐
//!   question ─────▶│   Prompt     │◀──│  Retriever  │
//!                  └──────┬───────┘   └─────────────┘
//!                         ▼
//!                  ┌──────────────┐
//!                  │  Completion  │──▶ SQL
//!                  └──────────────┘
//! ```
//!
//! The network-free pipeline lives in the `text2sql-core` crate. This crate
//! adds configuration, the OpenAI providers, the session registry, the HTTP
//! server and the `t2s` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI embeddings provider |
//! | [`completion`] | OpenAI chat-completion provider |
//! | [`openai`] | Provider factory shared by all sessions |
//! | [`registry`] | Session registry with idle expiry |
//! | [`server`] | HTTP API |
//! | [`ask`] | One-shot CLI conversion |
//! | [`inspect`] | Fragment and prompt inspection commands |

pub mod ask;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod inspect;
pub mod openai;
pub mod registry;
pub mod server;
