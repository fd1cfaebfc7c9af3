//! Outbound request interception.
//!
//! [`Dispatch`] models the network-call entry point; [`RequestInterceptor`]
//! wraps an inner dispatcher so that calls matching the configured URL
//! pattern are suspended while the boundary authority redacts their
//! bodies. Everything else passes straight through. Redaction fails open:
//! on timeout, explicit rejection, or a closed boundary channel the call
//! proceeds with its original body and a warning is logged — this layer
//! must never block the host application's traffic.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::boundary::{BoundaryMessage, PendingExchange};
use crate::config::InterceptorConfig;

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Textual body, eligible for redaction.
    Text(String),
    /// Opaque bytes; passed through untouched.
    Bytes(Vec<u8>),
}

/// An outbound network call about to leave the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Target URL.
    pub url: String,
    /// Request body, if any.
    pub body: Option<RequestBody>,
}

/// Result of the underlying network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    /// Status code reported by the transport.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// Errors surfaced by a dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// The network-call entry point.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Perform the call and return its result.
    async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse, DispatchError>;
}

/// Redacting wrapper around an inner [`Dispatch`].
pub struct RequestInterceptor {
    inner: Arc<dyn Dispatch>,
    config: InterceptorConfig,
    exchange: Arc<Mutex<PendingExchange>>,
    boundary_tx: mpsc::Sender<BoundaryMessage>,
}

impl RequestInterceptor {
    /// Wrap `inner`, sending redaction requests over `boundary_tx`.
    pub fn new(
        inner: Arc<dyn Dispatch>,
        config: InterceptorConfig,
        boundary_tx: mpsc::Sender<BoundaryMessage>,
    ) -> Self {
        Self {
            inner,
            config,
            exchange: Arc::new(Mutex::new(PendingExchange::new())),
            boundary_tx,
        }
    }

    /// Shared correlation table, for wiring [`run_response_listener`].
    pub fn exchange(&self) -> Arc<Mutex<PendingExchange>> {
        Arc::clone(&self.exchange)
    }

    /// Substring predicate over the target URL.
    pub fn should_intercept(&self, url: &str) -> bool {
        url.contains(&self.config.target_url_pattern)
    }

    /// Number of calls currently suspended on the boundary.
    pub async fn pending_count(&self) -> usize {
        self.exchange.lock().await.pending_count()
    }

    /// Release every suspended call with its original body.
    ///
    /// Pending exchanges are rejected rather than dropped, so waiters fail
    /// open immediately instead of sitting out their timers.
    pub async fn shutdown(&self) {
        let released = self.exchange.lock().await.reject_all("interceptor shut down");
        if released > 0 {
            warn!(released, "pending calls released with original bodies");
        }
    }

    /// Ask the boundary authority for a redacted body, falling back to the
    /// original on timeout, rejection, or a closed channel.
    async fn redact_or_original(&self, body: String) -> String {
        let (request_id, rx) = self.exchange.lock().await.register();

        let request = BoundaryMessage::ChatRequest {
            request_id,
            body: body.clone(),
        };
        if self.boundary_tx.send(request).await.is_err() {
            warn!(request_id, "boundary channel closed; sending original body");
            self.exchange.lock().await.discard(request_id);
            return body;
        }

        match timeout(self.config.request_timeout(), rx).await {
            Ok(Ok(Ok(anonymized))) => {
                trace!(request_id, "body redacted");
                anonymized
            }
            Ok(Ok(Err(reason))) => {
                warn!(request_id, %reason, "redaction rejected; sending original body");
                body
            }
            Ok(Err(_closed)) => {
                warn!(request_id, "resolver dropped; sending original body");
                body
            }
            Err(_elapsed) => {
                warn!(
                    request_id,
                    timeout_ms = self.config.request_timeout_ms,
                    "redaction timed out; sending original body"
                );
                self.exchange.lock().await.discard(request_id);
                body
            }
        }
    }
}

#[async_trait]
impl Dispatch for RequestInterceptor {
    async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse, DispatchError> {
        if !self.should_intercept(&request.url) {
            return self.inner.dispatch(request).await;
        }

        let Some(RequestBody::Text(body)) = request.body.clone() else {
            debug!(url = %request.url, "no textual body; skipping interception");
            return self.inner.dispatch(request).await;
        };

        debug!(url = %request.url, "intercepting outgoing call");
        let redacted = self.redact_or_original(body).await;
        let request = OutboundRequest {
            body: Some(RequestBody::Text(redacted)),
            ..request
        };
        self.inner.dispatch(request).await
    }
}

/// Resolve suspended calls as boundary replies arrive.
///
/// [`BoundaryMessage::EmailDetected`] broadcasts are informational and only
/// logged here. Runs until the reply sender is dropped.
pub async fn run_response_listener(
    mut replies: mpsc::Receiver<BoundaryMessage>,
    exchange: Arc<Mutex<PendingExchange>>,
) {
    while let Some(message) = replies.recv().await {
        match message {
            BoundaryMessage::AnonymizationResponse {
                request_id,
                anonymized_body,
            } => {
                if !exchange.lock().await.resolve(request_id, anonymized_body) {
                    warn!(
                        request_id,
                        "no pending call for response (already resolved or timed out)"
                    );
                }
            }
            BoundaryMessage::EmailDetected { emails } => {
                debug!(count = emails.len(), "addresses detected upstream");
            }
            other => warn!(?other, "listener received unexpected message"),
        }
    }
    trace!("response listener stopped");
}
