//! Client code for the completion endpoints.
//!
//! One `reqwest::Client` is built at startup and shared by every request in
//! the process; connection setup and teardown live inside its pool instead
//! of being repeated per call.

pub mod chat;
pub mod image;

use std::path::PathBuf;
use thiserror::Error;

/// Transport-layer failures. Each one aborts the current operation; none of
/// them ends a chat session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established or the transfer was aborted.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    /// The download destination could not be opened or written.
    #[error("failed to write {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build the process-wide HTTP client.
pub fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client")
}
