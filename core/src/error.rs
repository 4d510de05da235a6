//! Error types for the billing client, its configuration and the recorder.
//!
//! # Design
//! `ApiError` never escapes a client operation: it is rendered into the
//! `{"error": ...}` record of an [`OperationResult`](crate::OperationResult).
//! Its `Display` text is that record's message, so the `HTTP error:` and
//! `Request error:` prefixes are part of the contract. `ConfigError` and
//! `RecorderError` are ordinary `Result` errors and propagate to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single API round trip.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error: {status} {}: {reason} for url: {url}", status_class(.status))]
    Http {
        status: u16,
        reason: String,
        url: String,
    },

    /// The request never produced a usable response: connection refused, DNS
    /// failure, timeout, unreadable or undecodable body.
    #[error("Request error: {0}")]
    Request(String),

    /// A required identifier was empty or `additional_params` was malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The request payload could not be serialized to JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// `Client Error` for 4xx, `Server Error` for 5xx.
fn status_class(status: &u16) -> &'static str {
    match status {
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unexpected Status",
    }
}

/// Missing or unusable process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
}

/// File-system failures while persisting responses or appending to the log.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation name would not stay a single file name inside the
    /// responses directory.
    #[error("invalid operation name {0:?}")]
    InvalidOperation(String),
}
