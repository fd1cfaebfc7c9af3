//! Boundary protocol between the page context and the privileged context.
//!
//! The two sides exchange correlation-tagged envelopes over generic async
//! channels. The only properties the protocol requires are at-most-one
//! resolution per `requestId` and a hard timeout on the requesting side;
//! request/response order is not guaranteed.

pub mod authority;
pub mod exchange;

pub use authority::run_authority;
pub use exchange::{ExchangeResult, PendingExchange};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detector::{AnalyzePromptPayload, DetectionService};

/// Wire envelope crossing the context boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryMessage {
    /// Outbound: a suspended chat request awaiting redaction.
    #[serde(rename = "CHATGPT_REQUEST", rename_all = "camelCase")]
    ChatRequest {
        /// Correlation id, monotonic within one interceptor instance.
        request_id: u64,
        /// Raw request body string.
        body: String,
    },

    /// Inbound: the redacted body for a previously dispatched request.
    #[serde(rename = "ANONYMIZATION_RESPONSE", rename_all = "camelCase")]
    AnonymizationResponse {
        /// Correlation id of the request this answers.
        request_id: u64,
        /// Body with every detected address masked.
        anonymized_body: String,
    },

    /// Informational broadcast; not correlated to any request.
    #[serde(rename = "EMAIL_DETECTED")]
    EmailDetected {
        /// Normalized addresses recorded by the analysis.
        emails: Vec<String>,
    },
}

/// Wire type tag of the privileged-context RPC entry point.
pub const ANALYZE_PROMPT_TYPE: &str = "ANALYZE_PROMPT";

/// Serve one privileged-context RPC request.
///
/// Expects `{ "type": "ANALYZE_PROMPT", "payload": { "body": ... } }` and
/// answers with the serialized [`crate::detector::AnalyzePromptResponse`],
/// or `{ "success": false, "error": ... }` for unknown types, malformed
/// payloads, and orchestrator failures. The call is never synchronous; the
/// caller must keep its response channel open until this resolves.
pub async fn handle_rpc(service: &DetectionService, request: &Value) -> Value {
    let kind = request.get("type").and_then(Value::as_str).unwrap_or("");
    if kind != ANALYZE_PROMPT_TYPE {
        return failure(format!("unknown message type: {kind:?}"));
    }

    let payload: AnalyzePromptPayload = match request.get("payload") {
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(payload) => payload,
            Err(err) => return failure(format!("malformed payload: {err}")),
        },
        None => AnalyzePromptPayload::default(),
    };

    match service.analyze_prompt(payload).await {
        Ok(response) => {
            serde_json::to_value(&response).unwrap_or_else(|err| failure(err.to_string()))
        }
        Err(err) => failure(err.to_string()),
    }
}

fn failure(error: String) -> Value {
    serde_json::json!({ "success": false, "error": error })
}
