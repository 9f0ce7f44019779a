use crate::ai::{decode_response, transport_error};
use crate::error::BackendResult;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client.
pub struct GeminiHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    model: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example `gemini-1.5-pro`);
    /// a `models/` prefix is stripped.
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Calls Gemini's `generateContent` endpoint.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        backend: &str,
        request: &Req,
    ) -> BackendResult<Resp> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", backend, e))?;

        decode_response("Gemini", backend, response).await
    }
}
