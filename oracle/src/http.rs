//! Chat-completions transport for the live oracle.
//!
//! Speaks the OpenAI-compatible `/v1/chat/completions` wire shape with
//! temperature pinned to zero. Transport-level flakiness is absorbed by
//! [`crate::retry`]; answer-level flakiness (unparseable replies) is
//! the caller's concern.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};
use crate::{Oracle, OracleError, OracleFut};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Live oracle backed by a chat-completions endpoint.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    retry: RetryConfig,
}

impl HttpOracle {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_inner(&self, prompt: &str) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };
        let correlation_id = Uuid::new_v4().to_string();

        let outcome = send_with_retry(
            || {
                self.client
                    .post(&self.endpoint)
                    .bearer_auth(&self.api_key)
                    .timeout(REQUEST_TIMEOUT)
                    .json(&body)
            },
            &correlation_id,
            &self.retry,
        )
        .await;

        match outcome {
            RetryOutcome::Success(response) => {
                let text = response.text().await?;
                let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
                    OracleError::MalformedReply {
                        detail: format!("invalid completion envelope: {e}"),
                    }
                })?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| OracleError::MalformedReply {
                        detail: "completion had no choices".to_owned(),
                    })
            }
            RetryOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let detail = truncate_detail(&response.text().await.unwrap_or_default());
                Err(OracleError::Http { status, detail })
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                Err(OracleError::Connection { attempts, source })
            }
            RetryOutcome::NonRetryable(e) => Err(OracleError::Transport(e)),
        }
    }
}

impl Oracle for HttpOracle {
    fn complete<'a>(&'a self, prompt: &'a str) -> OracleFut<'a, String> {
        Box::pin(self.complete_inner(prompt))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn truncate_detail(text: &str) -> String {
    const MAX: usize = 300;
    if text.len() <= MAX {
        return text.to_owned();
    }
    let mut cut = MAX;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}
