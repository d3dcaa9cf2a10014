//! Error kinds shared by every pipeline stage.
//!
//! Each variant names the stage that failed. Nothing in the core retries or
//! swallows these; the serving layer decides how each kind is reported.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API key must be set before this operation")]
    MissingCredential,

    #[error("Schema must be loaded before converting queries")]
    SchemaNotLoaded,

    #[error("Invalid schema format: {0}")]
    SchemaFormat(String),

    #[error("Invalid schema record at index {index}: {message}")]
    SchemaParse { index: usize, message: String },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Invalid session ID: {0}")]
    InvalidSession(String),

    #[error("{service} request timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },
}

impl Error {
    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingCredential => "missing_credential",
            Error::SchemaNotLoaded => "schema_not_loaded",
            Error::SchemaFormat(_) => "schema_format",
            Error::SchemaParse { .. } => "schema_parse",
            Error::EmbeddingService(_) => "embedding_error",
            Error::Search(_) => "search_error",
            Error::Completion(_) => "completion_error",
            Error::InvalidSession(_) => "invalid_session",
            Error::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = Error::SchemaParse {
            index: 2,
            message: "missing description".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid schema record at index 2: missing description"
        );

        let err = Error::Timeout {
            service: "completion",
            secs: 60,
        };
        assert_eq!(err.to_string(), "completion request timed out after 60s");
        assert_eq!(err.code(), "timeout");
    }
}
