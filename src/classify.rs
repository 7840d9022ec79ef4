//! Turning a fetch outcome into a verdict
//!
//! Three signals decide whether a response carries data: the HTTP status,
//! the storage-disabled sentinel text, and later the JSON decode itself.
//! This module handles the first two; decoding belongs to the endpoint
//! modules and only ever sees [`Classification::Decodable`] bodies.

use crate::client::FetchResult;
use crate::error::FetchError;

/// Text Artifactory answers with, instead of JSON, when the storage layer
/// has the feature's data access switched off
pub const STORAGE_DISABLED_SENTINEL: &str = "RTFS is enabled";

/// Whether `body` is the storage-disabled sentinel message
///
/// The server embeds the marker in free-form text, so this is a substring
/// match anywhere in the body.
pub fn is_storage_disabled(body: &[u8]) -> bool {
    let needle = STORAGE_DISABLED_SENTINEL.as_bytes();
    body.windows(needle.len()).any(|window| window == needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The feature is off; success with no data
    Disabled,
    /// 2xx with a body worth decoding
    Decodable,
    Failed,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Decodable => "decodable",
            Self::Failed => "failed",
        }
    }
}

/// What a 404 means for the endpoint being called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// The server version predates the feature: treat as no data
    NoData,
    /// The endpoint is missing: treat as failure
    Unsupported,
}

/// Classify a response that arrived without a transport error
pub fn classify(result: &FetchResult) -> Classification {
    if is_storage_disabled(&result.body) {
        Classification::Disabled
    } else if result.status.is_success() {
        Classification::Decodable
    } else {
        Classification::Failed
    }
}

/// Classify the full outcome of a fetch, errors included
pub fn classify_outcome(
    outcome: &Result<FetchResult, FetchError>,
    not_found: NotFoundPolicy,
) -> Classification {
    match outcome {
        Ok(result) => classify(result),
        Err(FetchError::NotSupported { response, .. }) => {
            if is_storage_disabled(&response.body) {
                return Classification::Disabled;
            }
            match not_found {
                NotFoundPolicy::NoData => Classification::Disabled,
                NotFoundPolicy::Unsupported => Classification::Failed,
            }
        }
        Err(FetchError::Status { response, .. }) => classify(response),
        Err(FetchError::Transport { .. })
        | Err(FetchError::Cancelled { .. })
        | Err(FetchError::DeadlineExceeded { .. })
        | Err(FetchError::Malformed { .. }) => Classification::Failed,
    }
}

/// Outcome of [`triage`] that did not fail
#[derive(Debug)]
pub enum Triaged {
    /// Nothing to decode; the result container stays empty
    NoData { node_id: String },
    Data(FetchResult),
}

/// Reduce a fetch outcome to "no data", "data to decode", or the error to
/// surface
///
/// A response that is neither disabled nor decodable becomes
/// [`FetchError::Status`] even if the transport accepted it.
pub fn triage(
    endpoint: &str,
    outcome: Result<FetchResult, FetchError>,
    not_found: NotFoundPolicy,
) -> Result<Triaged, FetchError> {
    let classification = classify_outcome(&outcome, not_found);
    crate::metrics::record_classification(endpoint, classification);

    match (classification, outcome) {
        (Classification::Disabled, outcome) => {
            let node_id = match &outcome {
                Ok(result) => result.node_id.clone(),
                Err(e) => e.response().map(|r| r.node_id.clone()).unwrap_or_default(),
            };
            Ok(Triaged::NoData { node_id })
        }
        (Classification::Decodable, Ok(result)) => Ok(Triaged::Data(result)),
        (_, Ok(result)) => Err(FetchError::Status {
            endpoint: endpoint.to_string(),
            response: result,
        }),
        (_, Err(e)) => Err(e),
    }
}
