use super::client::AnthropicHttpClient;
use super::types::{ContentBlock, ImageSource, Message, MessagesRequest, MessagesResponse};
use crate::ai::GenerationService;
use crate::error::{BackendError, BackendResult};
use crate::models::{
    AiProvider, GenerationRequest, GenerationResponse, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

pub struct AnthropicMessagesClient {
    http: AnthropicHttpClient,
    model: String,
    backend: String,
    max_output_tokens: u32,
}

impl AnthropicMessagesClient {
    pub fn new(api_key: String, model: String, max_output_tokens: u32) -> Self {
        Self::new_with_client(
            api_key,
            model,
            max_output_tokens,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reqwest::Client::new(),
        )
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        max_output_tokens: u32,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: AnthropicHttpClient::new_with_client(api_key, timeout, client),
            backend: format!("{}:{}", AiProvider::Anthropic, model),
            model,
            max_output_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &GenerationRequest) -> MessagesRequest {
        // Images precede the instruction text.
        let mut content: Vec<ContentBlock> = request
            .attachments
            .iter()
            .map(|attachment| ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64".to_string(),
                    media_type: attachment.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&attachment.data),
                },
            })
            .collect();
        content.push(ContentBlock::Text {
            text: request.prompt.clone(),
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
        }
    }

    fn extract_text(response: &MessagesResponse) -> Option<String> {
        let text: Vec<&str> = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        }
    }
}

#[async_trait]
impl GenerationService for AnthropicMessagesClient {
    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GenerationResponse> {
        tracing::debug!(
            "Sending message to {} ({} attachments)",
            self.backend,
            request.attachments.len()
        );

        let response = self
            .http
            .create_message(&self.backend, &self.build_request(request))
            .await?;

        Self::extract_text(&response)
            .map(|text| GenerationResponse {
                model: self.model.clone(),
                text,
            })
            .ok_or_else(|| {
                BackendError::rejected(
                    &self.backend,
                    format!(
                        "No text in Anthropic response (stop_reason: {})",
                        response.stop_reason.as_deref().unwrap_or("unknown")
                    ),
                )
            })
    }
}
