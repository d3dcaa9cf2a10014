//! Completion provider trait.
//!
//! The pipeline hands a rendered [`Prompt`] to a [`CompletionProvider`] and
//! treats the returned text as the SQL query, verbatim.

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt::Prompt;

/// A hosted chat-completion model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// Failures are reported as [`Error::Completion`](crate::Error::Completion)
    /// or [`Error::Timeout`](crate::Error::Timeout).
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}
