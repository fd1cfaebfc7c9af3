//! Mailveil — email detection and redaction for chat prompt traffic.
//!
//! Intercepts outgoing prompt requests, masks email addresses before they
//! leave the client, and keeps a durable history of everything detected
//! with a time-boxed per-address dismissal. Redaction fails open: the
//! user's request always completes, redacted or not.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anonymizer;
pub mod boundary;
pub mod config;
pub mod detector;
pub mod interceptor;
pub mod ledger;
pub mod logging;
pub mod payload;
pub mod storage;
