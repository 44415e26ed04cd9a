//! Language-model completion provider port and an OpenAI-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use brandpulse_core::AppConfig;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AnalyticsError;
use crate::retry::retry_with_backoff;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode completion response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("completion response contained no text")]
    EmptyResponse,

    #[error("invalid provider base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: Option<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.2,
            system: None,
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, AnalyticsError>;
}

#[derive(Debug, Clone)]
pub struct CompletionClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl CompletionClientConfig {
    /// `None` when no provider base URL is configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.llm_base_url.as_ref().map(|base_url| Self {
            base_url: base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            max_retries: config.llm_max_retries,
            retry_backoff_base_ms: config.llm_retry_backoff_base_ms,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct HttpCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    retry_backoff_base_ms: u64,
}

impl HttpCompletionClient {
    /// # Errors
    ///
    /// Returns [`CompletionError::InvalidBaseUrl`] for an unparseable base URL
    /// and [`CompletionError::Http`] if the HTTP client cannot be built.
    pub fn new(config: CompletionClientConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("brandpulse/0.1")
            .build()?;

        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| CompletionError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, CompletionError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|source| CompletionError::Decode { source })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, AnalyticsError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let text = retry_with_backoff(self.max_retries, self.retry_backoff_base_ms, || {
            self.send_once(&request)
        })
        .await?;
        tracing::debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: &str, max_retries: u32) -> HttpCompletionClient {
        HttpCompletionClient::new(CompletionClientConfig {
            base_url: base_url.to_string(),
            api_key: Some("sk-test".to_string()),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            max_retries,
            retry_backoff_base_ms: 0,
        })
        .expect("client construction should not fail")
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
    }

    #[test]
    fn endpoint_joins_onto_base_path() {
        let c = client("https://llm.example.com/v1/", 0);
        assert_eq!(
            c.endpoint().as_str(),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpCompletionClient::new(CompletionClientConfig {
            base_url: "not a url".to_string(),
            api_key: None,
            model: "m".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
            retry_backoff_base_ms: 0,
        })
        .err()
        .expect("should fail");
        assert!(matches!(err, CompletionError::InvalidBaseUrl(_)));
    }

    #[tokio::test]
    async fn sends_chat_request_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "summarize acme"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  Acme is doing well. ")))
            .expect(1)
            .mount(&server)
            .await;

        let options = CompletionOptions {
            system: Some("be brief".to_string()),
            ..CompletionOptions::default()
        };
        let text = client(&format!("{}/v1", server.uri()), 0)
            .complete("summarize acme", &options)
            .await
            .unwrap();
        assert_eq!(text, "Acme is doing well.");
    }

    #[tokio::test]
    async fn retries_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let text = client(&server.uri(), 2)
            .complete("hi", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn client_error_surfaces_as_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri(), 3)
            .complete("hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "COMPLETION_ERROR");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server.uri(), 0)
            .complete("hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Completion(CompletionError::EmptyResponse)
        ));
    }
}
