use std::result;
use std::time::Duration;

use crate::pubmed::models::RecordKind;
use crate::retry::RetryableError;
use thiserror::Error;

/// Error types for PubMed history client operations
#[derive(Error, Debug)]
pub enum PubMedError {
    /// HTTP request failed before a response status was received
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Transport error {status}: {body}")]
    Transport { status: u16, body: String },

    /// An expected token or field was missing from a parsed response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid client setup, surfaced at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// XML parsing failed
    #[error("XML parsing failed: {0}")]
    XmlError(String),

    /// Invalid PMID format
    #[error("Invalid PMID format: {pmid}")]
    InvalidPmid { pmid: String },

    /// A record node could not be decoded
    #[error("Failed to decode {kind} record: {message}")]
    Decode { kind: RecordKind, message: String },

    /// Waiting for a rate-limit slot took longer than the configured deadline
    #[error("Rate limit wait exceeded deadline after {waited:?}")]
    RateLimitWaitExceeded { waited: Duration },

    /// The operation was cancelled through the client's cancellation token
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = result::Result<T, PubMedError>;

impl From<quick_xml::Error> for PubMedError {
    fn from(err: quick_xml::Error) -> Self {
        PubMedError::XmlError(err.to_string())
    }
}

impl RetryableError for PubMedError {
    fn is_retryable(&self) -> bool {
        match self {
            PubMedError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            // Server errors (5xx) and throttling (429) are transient
            PubMedError::Transport { status, .. } => {
                (*status >= 500 && *status < 600) || *status == 429
            }

            PubMedError::Protocol(_)
            | PubMedError::Configuration(_)
            | PubMedError::JsonError(_)
            | PubMedError::XmlError(_)
            | PubMedError::InvalidPmid { .. }
            | PubMedError::Decode { .. }
            | PubMedError::RateLimitWaitExceeded { .. }
            | PubMedError::Cancelled => false,
        }
    }

    fn retry_reason(&self) -> &str {
        if self.is_retryable() {
            match self {
                PubMedError::RequestError(err) if err.is_timeout() => "Request timeout",
                PubMedError::RequestError(err) if err.is_connect() => "Connection error",
                PubMedError::RequestError(_) => "Network error",
                PubMedError::Transport { status, .. } => match status {
                    429 => "Rate limit exceeded",
                    _ => "Server error",
                },
                _ => "Transient error",
            }
        } else {
            match self {
                PubMedError::Transport { .. } => "Client error",
                PubMedError::Protocol(_) => "Unexpected response shape",
                PubMedError::Configuration(_) => "Invalid configuration",
                PubMedError::JsonError(_) => "Invalid JSON response",
                PubMedError::XmlError(_) => "Invalid XML response",
                PubMedError::InvalidPmid { .. } => "Invalid input",
                PubMedError::Decode { .. } => "Undecodable record",
                PubMedError::RateLimitWaitExceeded { .. } => "Rate limit deadline",
                PubMedError::Cancelled => "Cancelled",
                _ => "Non-transient error",
            }
        }
    }
}
