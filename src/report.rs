//! User-facing summary of a dispatch
//!
//! Backends exhausting their quota are reported as `queued` with a retry
//! hint rather than as an error; only non-retryable failures surface their
//! message.

use crate::dispatch::DispatchOutcome;
use crate::models::GenerationResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const QUEUED_MESSAGE: &str =
    "High-end rendering is still in progress. Please wait a moment and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Queued,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub dispatch_id: Uuid,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    pub finished_at: DateTime<Utc>,
}

impl OutcomeReport {
    pub fn from_outcome(
        dispatch_id: Uuid,
        outcome: &DispatchOutcome<GenerationResponse>,
        retry_after_secs: u64,
    ) -> Self {
        let mut report = Self {
            dispatch_id,
            status: ReportStatus::Failed,
            engine: None,
            data: None,
            message: None,
            retry_after_secs: None,
            finished_at: Utc::now(),
        };

        match outcome {
            DispatchOutcome::Success {
                backend_identifier,
                result,
            } => {
                report.status = ReportStatus::Success;
                report.engine = Some(backend_identifier.clone());
                report.data = Some(result.text.clone());
            }
            DispatchOutcome::Exhausted { .. } => {
                report.status = ReportStatus::Queued;
                report.message = Some(QUEUED_MESSAGE.to_string());
                report.retry_after_secs = Some(retry_after_secs);
            }
            DispatchOutcome::Fatal { error } => {
                report.engine = Some(error.backend.clone());
                report.message = Some(error.message.clone());
            }
        }

        report
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_report_carries_engine_and_text() {
        let outcome = DispatchOutcome::Success {
            backend_identifier: "anthropic:claude-3-5-sonnet-latest".to_string(),
            result: GenerationResponse {
                model: "claude-3-5-sonnet-latest".to_string(),
                text: "result-X".to_string(),
            },
        };

        let report = OutcomeReport::from_outcome(Uuid::new_v4(), &outcome, 5);

        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(
            report.engine.as_deref(),
            Some("anthropic:claude-3-5-sonnet-latest")
        );
        assert_eq!(report.data.as_deref(), Some("result-X"));
        assert_eq!(report.retry_after_secs, None);
    }

    #[test]
    fn test_exhausted_report_hides_backend_error() {
        let outcome: DispatchOutcome<GenerationResponse> = DispatchOutcome::Exhausted {
            last_error: BackendError::rate_limited("gemini:gemini-1.5-pro", "quota exceeded"),
        };

        let report = OutcomeReport::from_outcome(Uuid::new_v4(), &outcome, 7);

        assert_eq!(report.status, ReportStatus::Queued);
        assert_eq!(report.message.as_deref(), Some(QUEUED_MESSAGE));
        assert_eq!(report.retry_after_secs, Some(7));
        assert_eq!(report.engine, None);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"queued\""));
        assert!(!json.contains("quota exceeded"));
    }

    #[test]
    fn test_fatal_report_shows_concrete_error() {
        let outcome: DispatchOutcome<GenerationResponse> = DispatchOutcome::Fatal {
            error: BackendError::rejected("openai:gpt-4o", "invalid request body"),
        };

        let report = OutcomeReport::from_outcome(Uuid::new_v4(), &outcome, 5);

        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.message.as_deref(), Some("invalid request body"));
        assert_eq!(report.engine.as_deref(), Some("openai:gpt-4o"));
    }
}
