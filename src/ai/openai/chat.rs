use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage, ChatMessageContent, MessagePart};
use crate::ai::GenerationService;
use crate::error::{BackendError, BackendResult};
use crate::models::{
    AiProvider, GenerationRequest, GenerationResponse, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

pub struct OpenAiChatClient {
    http: OpenAiHttpClient,
    model: String,
    backend: String,
    max_output_tokens: u32,
}

impl OpenAiChatClient {
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
            http: OpenAiHttpClient::new_with_client(api_key, timeout, client),
            backend: format!("{}:{}", AiProvider::OpenAi, model),
            model,
            max_output_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let content = if request.attachments.is_empty() {
            ChatMessageContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![MessagePart::text(request.prompt.clone())];
            parts.extend(request.attachments.iter().map(|attachment| {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&attachment.data);
                MessagePart::image(format!("data:{};base64,{}", attachment.mime_type, encoded))
            }));
            ChatMessageContent::Parts(parts)
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(content),
            }],
            max_completion_tokens: self.max_output_tokens,
        }
    }
}

#[async_trait]
impl GenerationService for OpenAiChatClient {
    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GenerationResponse> {
        tracing::debug!(
            "Sending chat completion to {} ({} attachments)",
            self.backend,
            request.attachments.len()
        );

        let response = self
            .http
            .chat_completion(&self.backend, &self.build_request(request))
            .await?;

        response
            .choices
            .first()
            .and_then(|choice| match &choice.message.content {
                Some(ChatMessageContent::Text(text)) => Some(text.clone()),
                _ => None,
            })
            .map(|text| GenerationResponse {
                model: self.model.clone(),
                text,
            })
            .ok_or_else(|| {
                BackendError::rejected(&self.backend, "No response from OpenAI chat API")
            })
    }
}
