//! Error handling and custom error types
//!
//! Each external service has its own error type so callers can tell an
//! upload failure apart from a document store failure. The crate-level
//! [`Error`] wraps both without rewriting them.

use thiserror::Error;

/// Failure talking to the media host.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response; `body` is the upstream payload verbatim.
    #[error("Media host rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid media host response: {0}")]
    InvalidResponse(String),

    #[error("Operation requires signed credentials (API key and secret)")]
    Unsigned,

    /// The file's content type is not a valid MIME string; nothing was sent.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}

/// Failure talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response; `body` is the upstream payload verbatim.
    #[error("Document store rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to decode document store response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
