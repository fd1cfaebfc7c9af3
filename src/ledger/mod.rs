//! Detection history and dismissal ledger.
//!
//! Two independent projections over the key-value store:
//!
//! - `detectionHistory` — append-only log, one record per observed
//!   occurrence, never deduplicated. Answers "how many times, and when".
//! - `dismissedEmails` — one entry per unique address, expiring 24 hours
//!   after the dismissal, lazily pruned on read. Answers "is this address
//!   currently suppressed".
//!
//! The asymmetry is deliberate; do not unify the two models. Every
//! read-modify-write here runs without a transactional guard, so
//! concurrent writers are last-write-wins on the whole key.

pub mod dismissal;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the detection log.
pub const HISTORY_KEY: &str = "detectionHistory";

/// Storage key for the dismissal map.
pub const DISMISSED_KEY: &str = "dismissedEmails";

/// One observed occurrence of an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Lower-cased address.
    pub email: String,
    /// Epoch milliseconds at which the occurrence was recorded.
    pub timestamp: i64,
    /// Dismissal stamp found in older persisted logs. New dismissals live
    /// only in the dismissal map; this field is never written by us.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dismissed: Option<i64>,
}

/// Map from lower-cased address to dismissal time (epoch ms).
pub type DismissedEmails = BTreeMap<String, i64>;

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The storage collaborator failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A persisted value did not decode as the expected shape.
    #[error("corrupt {key} value: {source}")]
    Corrupt {
        /// Storage key whose value failed to decode.
        key: &'static str,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}

/// Durable history of detected addresses plus the dismissal map.
pub struct HistoryLedger {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryLedger {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the detection log, or an empty list when none is stored.
    pub async fn load_history(&self) -> Result<Vec<DetectionRecord>, LedgerError> {
        match self.store.get(HISTORY_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|source| LedgerError::Corrupt {
                key: HISTORY_KEY,
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn save_history(&self, records: &[DetectionRecord]) -> Result<(), LedgerError> {
        let value = serde_json::to_value(records).map_err(|source| LedgerError::Corrupt {
            key: HISTORY_KEY,
            source,
        })?;
        self.store.set(HISTORY_KEY, value).await?;
        Ok(())
    }

    /// Append one record per input occurrence and return the normalized
    /// addresses in input order.
    ///
    /// Inputs are not deduplicated — neither against each other nor against
    /// history; every occurrence becomes its own record. Empty input skips
    /// the write entirely.
    pub async fn record_occurrences(&self, emails: &[String]) -> Result<Vec<String>, LedgerError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let mut history = self.load_history().await?;
        let timestamp = Utc::now().timestamp_millis();
        let mut normalized = Vec::with_capacity(emails.len());

        for email in emails {
            let email = email.to_lowercase();
            history.push(DetectionRecord {
                email: email.clone(),
                timestamp,
                dismissed: None,
            });
            normalized.push(email);
        }

        self.save_history(&history).await?;
        info!(
            appended = normalized.len(),
            total = history.len(),
            "detection history updated"
        );
        Ok(normalized)
    }

    /// Delete the detection log entirely. Dismissals are unaffected.
    pub async fn clear_history(&self) -> Result<(), LedgerError> {
        self.store.remove(HISTORY_KEY).await?;
        info!("detection history cleared");
        Ok(())
    }

    /// Load the raw dismissal map, expired entries included.
    pub async fn load_dismissed(&self) -> Result<DismissedEmails, LedgerError> {
        match self.store.get(DISMISSED_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|source| LedgerError::Corrupt {
                key: DISMISSED_KEY,
                source,
            }),
            None => Ok(DismissedEmails::new()),
        }
    }

    async fn save_dismissed(&self, dismissed: &DismissedEmails) -> Result<(), LedgerError> {
        let value = serde_json::to_value(dismissed).map_err(|source| LedgerError::Corrupt {
            key: DISMISSED_KEY,
            source,
        })?;
        self.store.set(DISMISSED_KEY, value).await?;
        Ok(())
    }

    /// Snooze `email` for the next 24 hours.
    ///
    /// Re-dismissing overwrites the previous stamp (last-write-wins).
    pub async fn dismiss_email(&self, email: &str) -> Result<(), LedgerError> {
        let mut dismissed = self.load_dismissed().await?;
        let normalized = email.to_lowercase();
        let now = Utc::now().timestamp_millis();
        dismissed.insert(normalized.clone(), now);
        self.save_dismissed(&dismissed).await?;
        debug!(email = %normalized, "address dismissed");
        Ok(())
    }

    /// Drop expired entries from the dismissal map and return what remains.
    ///
    /// The pruned map is written back only when something was actually
    /// removed.
    pub async fn clean_expired_dismissals(&self) -> Result<DismissedEmails, LedgerError> {
        let dismissed = self.load_dismissed().await?;
        let now = Utc::now().timestamp_millis();

        let kept: DismissedEmails = dismissed
            .iter()
            .filter(|(_, &at)| dismissal::is_active(at, now))
            .map(|(email, &at)| (email.clone(), at))
            .collect();

        if kept.len() != dismissed.len() {
            debug!(
                removed = dismissed.len().saturating_sub(kept.len()),
                "pruned expired dismissals"
            );
            self.save_dismissed(&kept).await?;
        }

        Ok(kept)
    }

    /// Whether `email` is currently suppressed by an active dismissal.
    pub async fn is_dismissed(&self, email: &str) -> Result<bool, LedgerError> {
        let active = self.clean_expired_dismissals().await?;
        Ok(active.contains_key(&email.to_lowercase()))
    }
}
