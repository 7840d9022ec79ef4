use crate::client::FetchResult;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single endpoint fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Endpoint answered 404
    #[error("endpoint {endpoint} is not supported by the server (HTTP 404)")]
    NotSupported { endpoint: String, response: FetchResult },

    /// Endpoint answered with any other non-success status
    #[error("endpoint {endpoint} returned HTTP {}", .response.status)]
    Status { endpoint: String, response: FetchResult },

    /// Connection, DNS, TLS or body-read failure
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Caller cancelled the request before a response arrived
    #[error("request to {endpoint} was cancelled")]
    Cancelled { endpoint: String },

    /// Request did not complete within its deadline
    #[error("request to {endpoint} timed out after {timeout:?}")]
    DeadlineExceeded { endpoint: String, timeout: Duration },

    /// Body is neither the expected JSON nor the storage-disabled sentinel
    #[error("malformed response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse category of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotSupported,
    Status,
    Transport,
    Malformed,
}

impl FetchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotSupported { .. } => ErrorClass::NotSupported,
            Self::Status { .. } => ErrorClass::Status,
            Self::Transport { .. } | Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => {
                ErrorClass::Transport
            }
            Self::Malformed { .. } => ErrorClass::Malformed,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::NotSupported { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Cancelled { endpoint }
            | Self::DeadlineExceeded { endpoint, .. }
            | Self::Malformed { endpoint, .. } => endpoint,
        }
    }

    /// Response the server sent, for errors raised after a response arrived
    pub fn response(&self) -> Option<&FetchResult> {
        match self {
            Self::NotSupported { response, .. } | Self::Status { response, .. } => Some(response),
            Self::Transport { .. }
            | Self::Cancelled { .. }
            | Self::DeadlineExceeded { .. }
            | Self::Malformed { .. } => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.class() == ErrorClass::Transport
    }

    /// Stable label for logs and metrics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NotSupported { .. } => "not_supported",
            Self::Status { .. } => "status",
            Self::Transport { .. } => "transport",
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Malformed { .. } => "malformed",
        }
    }
}
