//! AI provider integration for the failover dispatcher
//!
//! Each provider client turns a [`GenerationRequest`] into one HTTP call and
//! classifies the outcome. [`ProviderPool`] binds the configured roster to
//! those clients and is what the dispatcher invokes.

pub mod anthropic;
pub mod gemini;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod pool;

pub use anthropic::AnthropicMessagesClient;
pub use gemini::GeminiChatClient;
pub use mock::MockGenerationClient;
pub use openai::OpenAiChatClient;
pub use pool::ProviderPool;

use crate::error::{BackendError, BackendResult};
use crate::models::{GenerationRequest, GenerationResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GenerationResponse>;
}

/// Turn a provider HTTP response into `Resp`, classifying failures for `backend`.
pub(crate) async fn decode_response<Resp: DeserializeOwned>(
    provider: &str,
    backend: &str,
    response: reqwest::Response,
) -> BackendResult<Resp> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!("{} API error (status {}): {}", provider, status, error_text);
        return Err(BackendError::from_status(backend, status, &error_text));
    }

    let body = response.text().await.map_err(|e| {
        BackendError::rejected(backend, format!("Failed to read {} response: {}", provider, e))
    })?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse {} response: {}\nBody: {}", provider, e, body);
        BackendError::rejected(backend, format!("Failed to parse {} response: {}", provider, e))
    })
}

/// Map a transport failure (connect, timeout, TLS) for `backend`.
pub(crate) fn transport_error(provider: &str, backend: &str, e: reqwest::Error) -> BackendError {
    tracing::error!("Failed to send request to {}: {}", provider, e);
    BackendError::rejected(backend, format!("Request to {} failed: {}", provider, e))
}
