use super::types::{MessagesRequest, MessagesResponse};
use crate::ai::{decode_response, transport_error};
use crate::error::BackendResult;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Minimal client for the Anthropic Messages API.
pub struct AnthropicHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl AnthropicHttpClient {
    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn create_message(
        &self,
        backend: &str,
        request: &MessagesRequest,
    ) -> BackendResult<MessagesResponse> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Anthropic", backend, e))?;

        decode_response("Anthropic", backend, response).await
    }
}
