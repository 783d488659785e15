//! Wire contracts for the remote capture RPC

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::submission::{PendingSubmission, ResultRef, TerminalOutcome};

/// Request body sent to the capture endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,
    pub timezone: String,
    /// The submission id, stable across retries of the same entry.
    pub idempotency_key: Uuid,
}

impl CaptureRequest {
    #[must_use]
    pub fn for_submission(entry: &PendingSubmission, timezone: &str) -> Self {
        Self {
            url: entry.url.clone(),
            shared_text: entry.shared_text.clone(),
            source_app: entry.source_app.clone(),
            timezone: timezone.to_string(),
            idempotency_key: entry.id,
        }
    }
}

/// Status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Saved,
    AlreadyExists,
    NeedsClarification,
    Failed,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Structured error attached to a `failed` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub retryable: Option<bool>,
}

/// Response body of the capture endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub status: CaptureStatus,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub backend_status: Option<String>,
    #[serde(default)]
    pub bucket_item_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub candidates: Vec<serde_json::Value>,
    #[serde(default)]
    pub error: Option<CaptureErrorBody>,
}

impl CaptureResponse {
    /// Identifiers worth keeping on the local entry.
    #[must_use]
    pub fn result_ref(&self) -> ResultRef {
        ResultRef {
            remote_id: self.bucket_item_id.clone(),
            canonical_url: self.canonical_url.clone(),
            title: self.title.clone(),
            message: self.message.clone(),
            request_id: self.request_id.clone(),
            backend_status: self.backend_status.clone(),
        }
    }

    /// Terminal outcome for success-family statuses, `None` otherwise.
    #[must_use]
    pub fn success_outcome(&self) -> Option<TerminalOutcome> {
        match self.status {
            CaptureStatus::Saved => Some(TerminalOutcome::Saved(self.result_ref())),
            CaptureStatus::AlreadyExists => Some(TerminalOutcome::AlreadyExists(self.result_ref())),
            CaptureStatus::NeedsClarification => {
                Some(TerminalOutcome::NeedsClarification(self.result_ref()))
            }
            CaptureStatus::Failed | CaptureStatus::Unknown => None,
        }
    }

    /// Best human-readable explanation for a failed response.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| match self.status {
                CaptureStatus::Unknown => "capture endpoint returned an unknown status".to_string(),
                _ => "capture failed on the backend".to_string(),
            })
    }

    /// A `failed` response is retryable unless the backend explicitly says
    /// otherwise.
    #[must_use]
    pub fn failure_is_retryable(&self) -> bool {
        self.error.as_ref().and_then(|e| e.retryable).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn request_omits_absent_optionals() {
        let entry = PendingSubmission::new("https://example.com/a", None, Some("Chrome"), Utc::now());
        let request = CaptureRequest::for_submission(&entry, "Europe/Bucharest");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["url"], "https://example.com/a");
        assert_eq!(json["source_app"], "Chrome");
        assert_eq!(json["timezone"], "Europe/Bucharest");
        assert_eq!(json["idempotency_key"], entry.id.to_string());
        assert!(json.get("shared_text").is_none());
    }

    #[test]
    fn saved_response_becomes_terminal_outcome() {
        let response: CaptureResponse = serde_json::from_str(
            r#"{"status":"saved","request_id":"r-1","bucket_item_id":"b-9","title":"Story"}"#,
        )
        .unwrap();
        let Some(TerminalOutcome::Saved(result)) = response.success_outcome() else {
            panic!("expected saved outcome");
        };
        assert_eq!(result.remote_id.as_deref(), Some("b-9"));
        assert_eq!(result.request_id.as_deref(), Some("r-1"));
        assert_eq!(result.title.as_deref(), Some("Story"));
    }

    #[test]
    fn failed_response_retryability() {
        let retryable: CaptureResponse =
            serde_json::from_str(r#"{"status":"failed","message":"extractor down"}"#).unwrap();
        assert!(retryable.success_outcome().is_none());
        assert!(retryable.failure_is_retryable());
        assert_eq!(retryable.failure_message(), "extractor down");

        let fatal: CaptureResponse = serde_json::from_str(
            r#"{"status":"failed","error":{"code":"unsupported","message":"not an article","retryable":false}}"#,
        )
        .unwrap();
        assert!(!fatal.failure_is_retryable());
        assert_eq!(fatal.failure_message(), "not an article");
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let response: CaptureResponse =
            serde_json::from_str(r#"{"status":"processing","request_id":"x"}"#).unwrap();
        assert_eq!(response.status, CaptureStatus::Unknown);
        assert!(response.success_outcome().is_none());
        assert!(response.failure_is_retryable());
    }
}
