//! # error
//!
//! Error types for the two I/O boundaries of the reporter.
//!
//! Neither type escapes a reporting cycle: adapters degrade to empty/zero
//! results and the notifier degrades to a logged [`crate::notifier::Delivery::Failed`].
//! They exist so the boundary can log *what* went wrong before degrading.

use thiserror::Error;

use crate::models::ExchangeId;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange was requested but its key/secret (or passphrase) is unset.
    #[error("{0} credentials are not configured")]
    MissingCredentials(ExchangeId),

    /// Request never produced a response (DNS, TLS, timeout).
    #[error("{exchange} unreachable: {source}")]
    Transport {
        exchange: ExchangeId,
        #[source]
        source:   reqwest::Error,
    },

    /// Non-2xx HTTP status.
    #[error("{exchange} HTTP {status}: {body}")]
    Http {
        exchange: ExchangeId,
        status:   reqwest::StatusCode,
        body:     String,
    },

    /// HTTP 200 but the envelope carried an error code (Bybit `retCode`,
    /// Bitget `code`).
    #[error("{exchange} API error {code}: {message}")]
    Api {
        exchange: ExchangeId,
        code:     String,
        message:  String,
    },

    /// Payload did not match the expected shape.
    #[error("{exchange} response parse error: {detail}")]
    Malformed {
        exchange: ExchangeId,
        detail:   String,
    },

    #[error("request signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram response parse error: {0}")]
    Malformed(String),
}
