//! Pending request/response correlation table.
//!
//! Pairs each dispatched boundary request with a `oneshot` resolver. Ids
//! are monotonic within one instance and each id resolves at most once; a
//! resolver abandoned without resolution surfaces to its waiter as a
//! closed channel.

use std::collections::HashMap;

use tokio::sync::oneshot;

/// Outcome delivered to a suspended request: the redacted body, or the
/// reason the exchange was rejected.
pub type ExchangeResult = Result<String, String>;

/// Correlation table for in-flight boundary exchanges.
pub struct PendingExchange {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<ExchangeResult>>,
}

// Manual Debug: the map values are channel endpoints, only the count is
// informative.
impl std::fmt::Debug for PendingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingExchange")
            .field("next_id", &self.next_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl PendingExchange {
    /// Create an empty table. Ids start at zero.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    /// Allocate a fresh id and register a resolver for it.
    ///
    /// The caller awaits the returned receiver (typically under a timeout)
    /// to suspend until the exchange resolves.
    pub fn register(&mut self) -> (u64, oneshot::Receiver<ExchangeResult>) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Deliver the redacted body for `request_id`.
    ///
    /// Returns `false` when no resolver is waiting — already resolved,
    /// timed out, or never dispatched.
    pub fn resolve(&mut self, request_id: u64, anonymized_body: String) -> bool {
        match self.pending.remove(&request_id) {
            Some(tx) => {
                // A dropped receiver (waiter gave up) is a no-op.
                let _ = tx.send(Ok(anonymized_body));
                true
            }
            None => false,
        }
    }

    /// Deliver an explicit rejection for `request_id`.
    pub fn reject(&mut self, request_id: u64, reason: impl Into<String>) -> bool {
        match self.pending.remove(&request_id) {
            Some(tx) => {
                let _ = tx.send(Err(reason.into()));
                true
            }
            None => false,
        }
    }

    /// Drop the resolver for `request_id` without notifying it.
    ///
    /// Used by the waiter itself after its timeout fired, so a late
    /// response cannot resolve a call that already proceeded.
    pub fn discard(&mut self, request_id: u64) {
        self.pending.remove(&request_id);
    }

    /// Reject every pending exchange with `reason`, returning how many
    /// were released. Used on interceptor shutdown so suspended calls fail
    /// open immediately instead of waiting out their timers.
    pub fn reject_all(&mut self, reason: &str) -> usize {
        let count = self.pending.len();
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(reason.to_owned()));
        }
        count
    }

    /// Number of exchanges still awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for PendingExchange {
    fn default() -> Self {
        Self::new()
    }
}
