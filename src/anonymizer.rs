//! Email scanning and masking.
//!
//! The anonymizer is a pure function over text: it finds every email-like
//! substring, replaces it with a fixed placeholder, and reports what it
//! found. Lower-case normalization happens downstream in the ledger, not
//! here — callers get the addresses exactly as they appeared.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical replacement marker for redacted email addresses.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL ADDRESS]";

/// Best-effort email pattern: a local part of alphanumerics plus `._%+-`,
/// an `@`, a domain of alphanumerics plus `.-`, and a 2+ letter TLD.
///
/// Deliberately not RFC 5322 — the goal is catching addresses the way
/// people type them into a chat box.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("email pattern is a valid regex")
});

/// Result of anonymizing a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anonymized {
    /// The input with every matched address replaced by [`EMAIL_PLACEHOLDER`].
    pub redacted: String,
    /// Matched addresses in original case, first-seen order, deduplicated
    /// by exact string equality within this call.
    pub found: Vec<String>,
}

/// Scan `text` for email addresses and mask each one in place.
///
/// Matching is global, left to right, non-overlapping. Every other
/// character — line breaks and punctuation adjacent to a match included —
/// is preserved exactly. Match-free input comes back unchanged. Any string
/// is valid input; this function has no failure mode.
pub fn anonymize(text: &str) -> Anonymized {
    let mut found: Vec<String> = Vec::new();
    let redacted = EMAIL_PATTERN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let raw = &caps[0];
            if !found.iter().any(|seen| seen == raw) {
                found.push(raw.to_owned());
            }
            EMAIL_PLACEHOLDER
        })
        .into_owned();

    Anonymized { redacted, found }
}
