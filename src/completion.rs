//! OpenAI chat-completion provider.
//!
//! Sends the rendered prompt as a system and a user message to
//! `POST {base_url}/chat/completions` and returns the first choice's content
//! verbatim. No post-processing is applied to the generated SQL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use text2sql_core::completion::CompletionProvider;
use text2sql_core::prompt::Prompt;
use text2sql_core::session::Credential;
use text2sql_core::{Error, Result};

use crate::config::CompletionConfig;
use crate::openai::{endpoint, truncate_body};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiCompleter {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: Option<f32>,
    timeout_secs: u64,
    credential: Credential,
}

impl OpenAiCompleter {
    pub fn new(client: reqwest::Client, config: &CompletionConfig, credential: Credential) -> Self {
        Self {
            client,
            url: endpoint(&config.base_url, "chat/completions"),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            credential,
        }
    }

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                service: "completion",
                secs: self.timeout_secs,
            }
        } else {
            Error::Completion(format!("request failed: {}", err))
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        debug!(model = %self.model, "Requesting completion");

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.credential.expose())
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "OpenAI API error {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.send_error(e)
            } else {
                Error::Completion(format!("invalid response: {}", e))
            }
        })?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| Error::Completion("response contained no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completer(server: &MockServer, temperature: Option<f32>, timeout_secs: u64) -> OpenAiCompleter {
        let config = CompletionConfig {
            base_url: server.uri(),
            temperature,
            timeout_secs,
            ..Default::default()
        };
        OpenAiCompleter::new(reqwest::Client::new(), &config, Credential::new("sk-test"))
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "You are an expert sqlite developer.".to_string(),
            user: "Question: how many orders".to_string(),
        }
    }

    #[tokio::test]
    async fn test_returns_content_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You are an expert sqlite developer."},
                    {"role": "user", "content": "Question: how many orders"}
                ],
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "```sql\nSELECT COUNT(*) FROM orders;\n```"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sql = completer(&server, Some(0.0), 5)
            .complete(&prompt())
            .await
            .unwrap();
        assert_eq!(sql, "```sql\nSELECT COUNT(*) FROM orders;\n```");
    }

    #[tokio::test]
    async fn test_http_error_is_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let err = completer(&server, None, 5)
            .complete(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Completion(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = completer(&server, None, 5)
            .complete(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Completion(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "SELECT 1;"}}]}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = completer(&server, None, 1)
            .complete(&prompt())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "timeout");
    }
}
