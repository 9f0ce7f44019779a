//! Data models and configuration
//!
//! Defines the generation payload passed through the dispatcher, the
//! configured backend roster and the environment-driven `Config`.

use crate::dispatch::BackendDescriptor;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BACKENDS: &str =
    "openai:gpt-4o,anthropic:claude-3-5-sonnet-latest,gemini:gemini-1.5-pro";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_QUEUED_RETRY_AFTER_SECS: u64 = 5;

/// An image attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Provider-neutral prompt plus attached media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.attachments.push(Attachment {
            mime_type: mime_type.into(),
            data,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub model: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl AiProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(Error::Configuration(format!(
                "Unknown AI provider '{}'. Expected openai, anthropic or gemini",
                other
            ))),
        }
    }
}

/// One configured entry of the failover roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub provider: AiProvider,
    pub model: String,
    pub priority: u32,
}

impl BackendSpec {
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }

    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::new(self.identifier(), self.priority)
    }
}

/// Parse `provider:model[@priority]` entries separated by commas.
///
/// Entries without an explicit priority rank by list position. The result is
/// sorted by priority with ties kept in list order.
pub fn parse_backend_roster(input: &str) -> Result<Vec<BackendSpec>> {
    let mut specs = Vec::new();

    for (position, entry) in input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
    {
        let (provider, rest) = entry.split_once(':').ok_or_else(|| {
            Error::Configuration(format!(
                "Invalid backend '{}'. Expected provider:model[@priority]",
                entry
            ))
        })?;
        let provider: AiProvider = provider.parse()?;

        // Model ids may contain '@' themselves, so only a numeric suffix is a priority.
        let explicit = rest.rsplit_once('@').and_then(|(model, rank)| {
            rank.trim().parse::<u32>().ok().map(|rank| (model.trim(), rank))
        });
        let (model, priority) = explicit.unwrap_or((rest.trim(), position as u32));
        let model = match provider {
            AiProvider::Gemini => model.strip_prefix("models/").unwrap_or(model),
            _ => model,
        };

        if model.is_empty() {
            return Err(Error::Configuration(format!(
                "Backend '{}' is missing a model name",
                entry
            )));
        }

        specs.push(BackendSpec {
            provider,
            model: model.to_string(),
            priority,
        });
    }

    if specs.is_empty() {
        return Err(Error::Configuration(
            "Backend roster is empty; configure at least one provider:model".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for spec in &specs {
        if !seen.insert(spec.identifier()) {
            return Err(Error::Configuration(format!(
                "Backend '{}' is listed more than once",
                spec.identifier()
            )));
        }
    }

    // Stable: equal priorities keep list order.
    specs.sort_by_key(|spec| spec.priority);

    Ok(specs)
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backends: Vec<BackendSpec>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub request_timeout: Duration,
    pub max_output_tokens: u32,
    pub queued_retry_after_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backends = parse_backend_roster(
            &non_empty("FAILOVER_BACKENDS").unwrap_or_else(|| DEFAULT_BACKENDS.to_string()),
        )?;

        let config = Self {
            backends,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            request_timeout: Duration::from_secs(parse_number(
                "REQUEST_TIMEOUT_SECS",
                non_empty("REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_output_tokens: parse_number(
                "MAX_OUTPUT_TOKENS",
                non_empty("MAX_OUTPUT_TOKENS"),
                DEFAULT_MAX_OUTPUT_TOKENS,
            )?,
            queued_retry_after_secs: parse_number(
                "QUEUED_RETRY_AFTER_SECS",
                non_empty("QUEUED_RETRY_AFTER_SECS"),
                DEFAULT_QUEUED_RETRY_AFTER_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Replace the roster, e.g. from a command-line override.
    pub fn with_backends(mut self, roster: &str) -> Result<Self> {
        self.backends = parse_backend_roster(roster)?;
        self.validate()?;
        Ok(self)
    }

    pub fn api_key(&self, provider: AiProvider) -> Option<&str> {
        match provider {
            AiProvider::OpenAi => self.openai_api_key.as_deref(),
            AiProvider::Anthropic => self.anthropic_api_key.as_deref(),
            AiProvider::Gemini => self.gemini_api_key.as_deref(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Configuration(
                "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(Error::Configuration(
                "MAX_OUTPUT_TOKENS must be greater than zero".to_string(),
            ));
        }

        for spec in &self.backends {
            if self.api_key(spec.provider).is_none() {
                return Err(Error::Configuration(format!(
                    "{} not set (required by backend {})",
                    spec.provider.api_key_var(),
                    spec.identifier()
                )));
            }
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
