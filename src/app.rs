//! Application wiring: build the provider pool from config, assemble the
//! request, run one dispatch and summarise it.

use crate::ai::mime::detect_image_mime;
use crate::ai::{
    AnthropicMessagesClient, GeminiChatClient, GenerationService, OpenAiChatClient, ProviderPool,
};
use crate::dispatch::{dispatch, DispatchOutcome, DispatchRequest};
use crate::models::{AiProvider, BackendSpec, Config, GenerationRequest, GenerationResponse};
use crate::report::OutcomeReport;
use crate::{Error, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Instrument};
use uuid::Uuid;

pub struct App {
    pool: ProviderPool,
    queued_retry_after_secs: u64,
}

impl App {
    /// Build an app around an existing pool.
    ///
    /// Integration tests use this to inject mock clients.
    pub fn with_pool(pool: ProviderPool, queued_retry_after_secs: u64) -> Self {
        Self {
            pool,
            queued_retry_after_secs,
        }
    }

    fn build_client(
        spec: &BackendSpec,
        config: &Config,
        http_client: reqwest::Client,
    ) -> Result<Box<dyn GenerationService>> {
        let api_key = config
            .api_key(spec.provider)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "{} not set (required by backend {})",
                    spec.provider.api_key_var(),
                    spec.identifier()
                ))
            })?
            .to_string();
        let model = spec.model.clone();
        let tokens = config.max_output_tokens;
        let timeout = config.request_timeout;

        info!(
            "Backend {} (priority {})",
            spec.identifier(),
            spec.priority
        );

        let client: Box<dyn GenerationService> = match spec.provider {
            AiProvider::OpenAi => Box::new(OpenAiChatClient::new_with_client(
                api_key,
                model,
                tokens,
                timeout,
                http_client,
            )),
            AiProvider::Anthropic => Box::new(AnthropicMessagesClient::new_with_client(
                api_key,
                model,
                tokens,
                timeout,
                http_client,
            )),
            AiProvider::Gemini => Box::new(GeminiChatClient::new_with_client(
                api_key,
                model,
                tokens,
                timeout,
                http_client,
            )),
        };

        Ok(client)
    }

    /// Construct an app with one HTTP client per configured backend.
    pub fn new(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::builder().build()?;

        let mut pool = ProviderPool::new();
        for spec in &config.backends {
            let client = Self::build_client(spec, config, http_client.clone())?;
            pool.register(spec.descriptor(), client)?;
        }

        Ok(Self::with_pool(pool, config.queued_retry_after_secs))
    }

    /// Assemble a request from prompt text and image files.
    pub fn build_request(prompt: &str, image_paths: &[PathBuf]) -> Result<GenerationRequest> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("Prompt must not be empty".to_string()));
        }

        let mut request = GenerationRequest::new(prompt);
        for path in image_paths {
            let data = fs::read(path)?;
            let mime = detect_image_mime(&data).map_err(|e| {
                Error::InvalidInput(format!("{}: {}", path.display(), e))
            })?;
            info!("Attached {} ({}, {} bytes)", path.display(), mime, data.len());
            request = request.with_attachment(mime, data);
        }

        Ok(request)
    }

    /// Send `request` through the failover roster.
    pub async fn dispatch(
        &self,
        request: GenerationRequest,
    ) -> Result<DispatchOutcome<GenerationResponse>> {
        let backends = self.pool.descriptors();
        dispatch(&backends, &DispatchRequest::new(request), &self.pool).await
    }

    /// Dispatch and summarise the outcome for display.
    pub async fn run(&self, request: GenerationRequest) -> Result<OutcomeReport> {
        let dispatch_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %dispatch_id);

        let outcome = self.dispatch(request).instrument(span).await?;
        let report =
            OutcomeReport::from_outcome(dispatch_id, &outcome, self.queued_retry_after_secs);
        info!("Dispatch {} finished: {:?}", dispatch_id, report.status);

        Ok(report)
    }
}
