//! Privileged-side authority serving redaction requests.
//!
//! An mpsc-fed task in front of the detection service: requests arrive as
//! [`BoundaryMessage::ChatRequest`], redacted bodies and detection
//! broadcasts go back over the reply channel. When analysis fails nothing
//! is sent back for that id — the requesting side's timeout handles it and
//! the call fails open.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::BoundaryMessage;
use crate::detector::{AnalyzePromptPayload, DetectionService};

/// Run the authority loop until the request sender is dropped.
pub async fn run_authority(
    service: Arc<DetectionService>,
    mut requests: mpsc::Receiver<BoundaryMessage>,
    replies: mpsc::Sender<BoundaryMessage>,
) {
    while let Some(message) = requests.recv().await {
        match message {
            BoundaryMessage::ChatRequest { request_id, body } => {
                handle_request(&service, &replies, request_id, body).await;
            }
            other => warn!(?other, "authority received unexpected message"),
        }
    }
    trace!("detection authority stopped");
}

async fn handle_request(
    service: &DetectionService,
    replies: &mpsc::Sender<BoundaryMessage>,
    request_id: u64,
    body: String,
) {
    match service
        .analyze_prompt(AnalyzePromptPayload::from_body(body))
        .await
    {
        Ok(response) => {
            let reply = BoundaryMessage::AnonymizationResponse {
                request_id,
                anonymized_body: response.anonymized_body,
            };
            if replies.send(reply).await.is_err() {
                warn!(request_id, "reply channel closed; dropping response");
                return;
            }
            if !response.emails.is_empty() {
                debug!(
                    request_id,
                    count = response.emails.len(),
                    "broadcasting detected addresses"
                );
                let broadcast = BoundaryMessage::EmailDetected {
                    emails: response.emails,
                };
                let _ = replies.send(broadcast).await;
            }
        }
        Err(err) => {
            // No reply for this id: the requester times out and fails open.
            warn!(request_id, error = %err, "prompt analysis failed");
        }
    }
}
