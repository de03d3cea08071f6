//! Completion client: one outbound call per agent invocation.

use async_trait::async_trait;
use tracing::debug;

use crate::config::CompletionConfig;

/// Error type for completion calls.
///
/// Every failure mode surfaces as a tagged value here; nothing past this
/// boundary panics or raises.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A text-completion backend.
///
/// Implemented by [`HttpCompletionClient`] in production and by stub
/// clients in tests; strategy runners only see this trait.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Issue one completion request and return the generated content.
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        agent_label: &str,
    ) -> Result<String, CompletionError>;
}

/// Reqwest-backed client for an OpenAI-style chat-completion endpoint.
///
/// No retry and no timeout beyond the transport default; the chart
/// generation path layers its own bounded retry on top.
pub struct HttpCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Completion for HttpCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        agent_label: &str,
    ) -> Result<String, CompletionError> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            temperature: f32,
        }

        #[derive(serde::Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(serde::Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(serde::Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        debug!(agent = agent_label, prompt_chars = prompt.len(), "Issuing completion");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let content = chat_response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| CompletionError::Malformed("no choices in response".into()))?;

        debug!(agent = agent_label, response_chars = content.len(), "Completion received");

        Ok(content)
    }
}
