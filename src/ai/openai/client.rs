use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::ai::{decode_response, transport_error};
use crate::error::BackendResult;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl OpenAiHttpClient {
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

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        backend: &str,
        path: &str,
        request: &Req,
    ) -> BackendResult<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", backend, e))?;

        decode_response("OpenAI", backend, response).await
    }

    pub async fn chat_completion(
        &self,
        backend: &str,
        request: &ChatCompletionRequest,
    ) -> BackendResult<ChatCompletionResponse> {
        self.post(backend, "/v1/chat/completions", request).await
    }
}
