//! Error types for the sharepoint_client crate.

use thiserror::Error;

/// Errors that can occur when talking to SharePoint.
///
/// Construction-time failures (`Config`, `Auth`) are fatal and always
/// propagate to the caller. Transfer and list operations catch remote
/// failures, log them, and return an absent/false result instead; only
/// local I/O surfaces as an error on those paths.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("SharePoint API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
