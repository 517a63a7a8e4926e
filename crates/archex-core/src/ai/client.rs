//! Model collaborator seam
//!
//! The control plane never talks to a provider directly. Anything that can
//! turn a [`ModelRequest`] into a [`ModelResponse`] implements [`ModelClient`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::retry::{is_retryable_status, with_retry, IsRetryable, RetryConfig};
use crate::ai::types::{AiTool, AiToolCall, ModelMessage};

/// Everything the model sees for one round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<AiTool>,
}

impl ModelRequest {
    /// Append a section to the system prompt, separated by a blank line
    pub fn append_system_prompt(&mut self, section: &str) {
        match &mut self.system_prompt {
            Some(prompt) if !prompt.is_empty() => {
                prompt.push_str("\n\n");
                prompt.push_str(section);
            }
            _ => self.system_prompt = Some(section.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Vec<AiToolCall>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<AiToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Failure reported by a model collaborator
#[derive(Debug, Clone)]
pub struct ModelCallError {
    pub message: String,
    pub status: Option<u16>,
    pub retry_after: Option<Duration>,
}

impl ModelCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

impl fmt::Display for ModelCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "HTTP {}: {}", status, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ModelCallError {}

impl IsRetryable for ModelCallError {
    fn is_retryable(&self) -> bool {
        match self.status {
            Some(status) => is_retryable_status(status),
            // Network errors without status codes are typically retryable
            None => {
                self.message.contains("timeout")
                    || self.message.contains("connection")
                    || self.message.contains("network")
            }
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl From<anyhow::Error> for ModelCallError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        let status = extract_status_from_error(&message);
        Self {
            message,
            status,
            retry_after: None,
        }
    }
}

/// Try to extract an HTTP status code from an error message
pub fn extract_status_from_error(message: &str) -> Option<u16> {
    for pattern in &["HTTP ", "status: ", "status code: "] {
        if let Some(pos) = message.find(pattern) {
            let start = pos + pattern.len();
            let code_str: String = message[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(code) = code_str.parse() {
                return Some(code);
            }
        }
    }
    None
}

/// A language model that can answer one request at a time
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelCallError>;
}

#[async_trait]
impl<M: ModelClient + ?Sized> ModelClient for Arc<M> {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
        (**self).complete(request).await
    }
}

/// Retries transient failures of the wrapped client.
///
/// Sits beneath the hook pipeline: wrappers see one call, however many
/// attempts it took.
pub struct RetryingModel<M> {
    inner: M,
    config: RetryConfig,
}

impl<M: ModelClient> RetryingModel<M> {
    pub fn new(inner: M, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<M: ModelClient> ModelClient for RetryingModel<M> {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
        with_retry(&self.config, || self.inner.complete(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Overloaded {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for Overloaded {
        async fn complete(&self, _request: &ModelRequest) -> Result<ModelResponse, ModelCallError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ModelCallError::new("overloaded").with_status(529))
            } else {
                Ok(ModelResponse::text("ok"))
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            jitter: false,
        }
    }

    #[test]
    fn test_extract_status() {
        assert_eq!(extract_status_from_error("HTTP 429: slow down"), Some(429));
        assert_eq!(extract_status_from_error("status code: 503"), Some(503));
        assert_eq!(extract_status_from_error("socket closed"), None);
    }

    #[test]
    fn test_append_system_prompt() {
        let mut request = ModelRequest::default();
        request.append_system_prompt("base");
        request.append_system_prompt("## Skills");
        assert_eq!(request.system_prompt.as_deref(), Some("base\n\n## Skills"));
    }

    #[tokio::test]
    async fn test_retrying_model_recovers() {
        let model = RetryingModel::new(
            Overloaded {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            fast_retry(),
        );
        let response = model.complete(&ModelRequest::default()).await.unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retrying_model_surfaces_final_error() {
        let model = RetryingModel::new(
            Overloaded {
                failures: 10,
                calls: AtomicUsize::new(0),
            },
            fast_retry(),
        );
        let err = model.complete(&ModelRequest::default()).await.unwrap_err();
        assert_eq!(err.status, Some(529));
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 3);
    }
}
