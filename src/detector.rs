//! Detection orchestrator.
//!
//! Receives a raw request body, walks it with the anonymizer, records every
//! found address in the ledger, and hands back the redacted body plus the
//! normalized addresses. Storage failures propagate unmodified — this layer
//! never masks them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::anonymizer;
use crate::ledger::{HistoryLedger, LedgerError};
use crate::payload;

/// Input to [`DetectionService::analyze_prompt`]: the raw body of an
/// intercepted request.
///
/// The body is kept loosely typed so contract violations (missing, wrong
/// type) from the boundary surface as [`DetectError::InvalidBody`] instead
/// of a deserialization failure upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePromptPayload {
    /// Raw body string, as sent over the boundary.
    #[serde(default)]
    pub body: Option<Value>,
}

impl AnalyzePromptPayload {
    /// Build a payload from a raw body string.
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(Value::String(body.into())),
        }
    }
}

/// Result of analyzing one request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePromptResponse {
    /// Normalized addresses recorded by the ledger, one per occurrence,
    /// in order of discovery. Empty when nothing was found.
    pub emails: Vec<String>,
    /// The body with every detected address masked. Identical to the input
    /// when the body was not a prompt payload or contained no matches.
    pub anonymized_body: String,
}

/// Errors from prompt analysis.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The body was missing, not a string, or empty. Indicates an
    /// integration error upstream; never swallowed.
    #[error("invalid body - expected a non-empty string")]
    InvalidBody,

    /// The ledger (or its storage collaborator) failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Orchestrates detection, redaction, and history logging.
pub struct DetectionService {
    ledger: Arc<HistoryLedger>,
}

impl DetectionService {
    /// Create a service recording into the given ledger.
    pub fn new(ledger: Arc<HistoryLedger>) -> Self {
        Self { ledger }
    }

    /// Analyze a prompt body: redact every email address and log the finds.
    ///
    /// The combined list of raw matches — across all messages and all text
    /// parts, order and multiplicity preserved — is recorded through the
    /// ledger only when non-empty; the returned `emails` are the ledger's
    /// normalized output. A body that fails to parse as a prompt payload
    /// passes through unchanged with no addresses reported.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidBody`] when the body is missing, not a string,
    /// or empty (checked before any parsing); [`DetectError::Ledger`] when
    /// persistence fails.
    pub async fn analyze_prompt(
        &self,
        payload: AnalyzePromptPayload,
    ) -> Result<AnalyzePromptResponse, DetectError> {
        let body = match payload.body {
            Some(Value::String(body)) if !body.is_empty() => body,
            _ => return Err(DetectError::InvalidBody),
        };

        let mut detected: Vec<String> = Vec::new();
        let anonymized_body = payload::transform_text_parts(&body, |text| {
            trace!(chars = text.len(), "processing text part");
            let outcome = anonymizer::anonymize(text);
            detected.extend(outcome.found);
            outcome.redacted
        });

        let emails = if detected.is_empty() {
            Vec::new()
        } else {
            debug!(count = detected.len(), "addresses detected in prompt");
            self.ledger.record_occurrences(&detected).await?
        };

        Ok(AnalyzePromptResponse {
            emails,
            anonymized_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizer::EMAIL_PLACEHOLDER;
    use crate::storage::{KeyValueStore, MemoryStore};
    use serde_json::json;

    fn service() -> (Arc<MemoryStore>, DetectionService) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(HistoryLedger::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>
        ));
        (store, DetectionService::new(ledger))
    }

    #[tokio::test]
    async fn test_detects_and_redacts_single_part() {
        let (_store, service) = service();
        let body = r#"{"messages":[{"content":{"parts":["Contact john@example.com"]}}]}"#;

        let response = service
            .analyze_prompt(AnalyzePromptPayload::from_body(body))
            .await
            .expect("analysis should succeed");

        assert_eq!(response.emails, vec!["john@example.com"]);
        let parsed: serde_json::Value =
            serde_json::from_str(&response.anonymized_body).expect("output should be JSON");
        assert_eq!(
            parsed["messages"][0]["content"]["parts"][0],
            json!(format!("Contact {EMAIL_PLACEHOLDER}"))
        );
    }

    #[tokio::test]
    async fn test_aggregates_across_messages_and_parts() {
        let (_store, service) = service();
        let body = r#"{"messages":[
            {"content":{"parts":["one@a.com and two@b.org"]}},
            {"content":{"parts":["again one@a.com","Three@C.net"]}}
        ]}"#;

        let response = service
            .analyze_prompt(AnalyzePromptPayload::from_body(body))
            .await
            .expect("analysis should succeed");

        // Per-part dedup only: one@a.com appears in two different parts.
        assert_eq!(
            response.emails,
            vec!["one@a.com", "two@b.org", "one@a.com", "three@c.net"]
        );
    }

    #[tokio::test]
    async fn test_no_matches_leaves_ledger_untouched() {
        let (store, service) = service();
        let body = r#"{"messages":[{"content":{"parts":["nothing to see"]}}]}"#;

        let response = service
            .analyze_prompt(AnalyzePromptPayload::from_body(body))
            .await
            .expect("analysis should succeed");

        assert!(response.emails.is_empty());
        assert!(store.is_empty().await, "ledger should never be invoked");
    }

    #[tokio::test]
    async fn test_unparseable_body_passes_through_verbatim() {
        let (store, service) = service();
        let body = r#"{"someOtherField":"value"}"#;

        let response = service
            .analyze_prompt(AnalyzePromptPayload::from_body(body))
            .await
            .expect("analysis should succeed");

        assert_eq!(response.anonymized_body, body);
        assert!(response.emails.is_empty());
        assert!(store.is_empty().await);
    }

    // ── Contract violations ──

    #[tokio::test]
    async fn test_missing_body_rejected() {
        let (_store, service) = service();
        let result = service.analyze_prompt(AnalyzePromptPayload::default()).await;
        assert!(matches!(result, Err(DetectError::InvalidBody)));
    }

    #[tokio::test]
    async fn test_non_string_body_rejected() {
        let (_store, service) = service();
        let payload = AnalyzePromptPayload {
            body: Some(json!({"messages": []})),
        };
        let result = service.analyze_prompt(payload).await;
        assert!(matches!(result, Err(DetectError::InvalidBody)));
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let (_store, service) = service();
        let result = service
            .analyze_prompt(AnalyzePromptPayload::from_body(""))
            .await;
        assert!(matches!(result, Err(DetectError::InvalidBody)));
    }

    #[tokio::test]
    async fn test_records_persist_in_store() {
        let (store, service) = service();
        let body = r#"{"messages":[{"content":{"parts":["Ping Admin@Site.io twice Admin@Site.io"]}}]}"#;

        let response = service
            .analyze_prompt(AnalyzePromptPayload::from_body(body))
            .await
            .expect("analysis should succeed");

        // Exact duplicates collapse within one text part.
        assert_eq!(response.emails, vec!["admin@site.io"]);
        let stored = store
            .get(crate::ledger::HISTORY_KEY)
            .await
            .expect("get should succeed")
            .expect("history should be persisted");
        let records = stored.as_array().expect("history should be a list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["email"], json!("admin@site.io"));
    }
}
