use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::ai::GenerationService;
use crate::error::{BackendError, BackendResult};
use crate::models::{
    AiProvider, GenerationRequest, GenerationResponse, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

pub struct GeminiChatClient {
    http: GeminiHttpClient,
    backend: String,
    max_output_tokens: u32,
}

impl GeminiChatClient {
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
        let http = GeminiHttpClient::new_with_client(api_key, model, timeout, client);
        Self {
            backend: format!("{}:{}", AiProvider::Gemini, http.model()),
            http,
            max_output_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.attachments.iter().map(|attachment| Part::InlineData {
            inline_data: InlineData {
                mime_type: attachment.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&attachment.data),
            },
        }));

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let candidate = response.candidates.first()?;
        let texts: Vec<&str> = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

#[async_trait]
impl GenerationService for GeminiChatClient {
    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GenerationResponse> {
        let response: GenerateContentResponse = self
            .http
            .generate_content(&self.backend, &self.build_request(request))
            .await?;

        Self::extract_text(&response)
            .map(|text| GenerationResponse {
                model: self.http.model().to_string(),
                text,
            })
            .ok_or_else(|| BackendError::rejected(&self.backend, "No text in Gemini response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendErrorKind;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-1.5-pro";
    const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

    fn make_client(server: &MockServer, model: &str) -> GeminiChatClient {
        GeminiChatClient::new("gm-key".to_string(), model.to_string(), 256)
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_generate_parses_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "gm-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "Subsurface scattering on a jade bracelet" }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let response = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("jade bracelet"))
            .await
            .unwrap();
        assert_eq!(response.text, "Subsurface scattering on a jade bracelet");
        assert_eq!(response.model, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_generate_sends_inline_image_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_string_contains("\"inlineData\""))
            .and(body_string_contains("\"mimeType\":\"image/png\""))
            .and(body_string_contains("\"maxOutputTokens\":256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            GenerationRequest::new("describe").with_attachment("image/png", vec![0x89, 0x50]);
        make_client(&server, DEFAULT_MODEL)
            .generate(&request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_strips_models_prefix_from_model_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, "models/gemini-1.5-pro");
        let response = client.generate(&GenerationRequest::new("x")).await.unwrap();
        assert_eq!(response.model, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_quota_error_is_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let err = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::RateLimited);
        assert_eq!(err.backend, "gemini:gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_forbidden_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Rejected);
    }

    #[tokio::test]
    async fn test_empty_candidates_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let err = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Rejected);
    }

    #[tokio::test]
    async fn test_generate_joins_every_text_part() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "[Lighting] rim light. " },
                            { "text": "[Texture] subsurface." }
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let response = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("amber ring"))
            .await
            .unwrap();
        assert_eq!(response.text, "[Lighting] rim light. [Texture] subsurface.");
    }

    #[tokio::test]
    async fn test_timeout_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "candidates": [{ "content": { "parts": [{ "text": "late" }] } }]
                    }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = GeminiChatClient::new_with_client(
            "gm-key".to_string(),
            DEFAULT_MODEL.to_string(),
            256,
            Duration::from_millis(100),
            reqwest::Client::new(),
        )
        .with_base_url(server.uri());

        let err = client
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Rejected);
        assert_eq!(err.backend, "gemini:gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = make_client(&server, DEFAULT_MODEL)
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Rejected);
        assert!(err.message.contains("Failed to parse Gemini response"));
    }

    #[test]
    fn test_new_uses_default_request_timeout() {
        let client = GeminiChatClient::new("gm-key".to_string(), DEFAULT_MODEL.to_string(), 256);
        assert_eq!(
            client.http.timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }
}
