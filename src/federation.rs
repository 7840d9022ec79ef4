//! Federation status endpoints
//!
//! Both endpoints answer with plain text instead of JSON when RTFS owns the
//! federation data, and with 404 on servers without federation support.
//! Neither case is an error for the data fetches; only the probe treats a
//! 404 as "federation unavailable".

use crate::classify::{self, NotFoundPolicy, Triaged};
use crate::client::{ArtifactoryClient, Deadline};
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIRRORS_LAG_ENDPOINT: &str = "federation/status/mirrorsLag";
pub const UNAVAILABLE_MIRRORS_ENDPOINT: &str = "federation/status/unavailableMirrors";

const UNAVAILABLE_MIRRORS_TIMEOUT: Duration = Duration::from_secs(5);

/// One element of the `mirrorsLag` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorLag {
    pub local_repo_key: String,
    pub remote_url: String,
    pub remote_repo_key: String,
    #[serde(rename = "lagInMS")]
    pub lag_in_ms: i64,
    /// Epoch milliseconds
    pub event_registration_time_stamp: i64,
}

impl MirrorLag {
    pub fn event_registered_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.event_registration_time_stamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorLags {
    pub mirror_lags: Vec<MirrorLag>,
    /// Taken from the node-id response header
    pub node_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnavailableMirror {
    pub repo_key: String,
    pub node_id: String,
    pub status: String,
    pub local_repo_key: String,
    pub remote_url: String,
    pub remote_repo_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableMirrors {
    pub unavailable_mirrors: Vec<UnavailableMirror>,
    pub node_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnavailableMirrorsBody {
    #[serde(default)]
    unavailable_mirrors: Option<Vec<UnavailableMirror>>,
    #[serde(default)]
    node_id: Option<String>,
}

/// Decode a `mirrorsLag` body: a bare JSON array
pub fn decode_mirror_lags(body: &[u8], node_id: &str) -> Result<MirrorLags, serde_json::Error> {
    let mirror_lags: Option<Vec<MirrorLag>> = serde_json::from_slice(body)?;

    Ok(MirrorLags {
        mirror_lags: mirror_lags.unwrap_or_default(),
        node_id: node_id.to_string(),
    })
}

/// Decode an `unavailableMirrors` body
///
/// The body repeats the node id; the header value wins unless it was absent.
pub fn decode_unavailable_mirrors(
    body: &[u8],
    node_id: &str,
) -> Result<UnavailableMirrors, serde_json::Error> {
    let decoded: UnavailableMirrorsBody = serde_json::from_slice(body)?;

    let node_id = if node_id.is_empty() {
        decoded.node_id.unwrap_or_default()
    } else {
        node_id.to_string()
    };

    Ok(UnavailableMirrors {
        unavailable_mirrors: decoded.unavailable_mirrors.unwrap_or_default(),
        node_id,
    })
}

/// Both federation families from one collection pass
///
/// Each family succeeds or fails on its own.
#[derive(Debug)]
pub struct FederationStatus {
    pub mirror_lags: Result<MirrorLags, FetchError>,
    pub unavailable_mirrors: Result<UnavailableMirrors, FetchError>,
}

impl ArtifactoryClient {
    pub async fn fetch_mirror_lags(&self) -> Result<MirrorLags, FetchError> {
        self.fetch_mirror_lags_with_deadline(Deadline::default())
            .await
    }

    pub async fn fetch_mirror_lags_with_deadline(
        &self,
        deadline: Deadline,
    ) -> Result<MirrorLags, FetchError> {
        tracing::debug!("Fetching mirror lags");

        let outcome = self
            .fetch_http_with_deadline(MIRRORS_LAG_ENDPOINT, deadline)
            .await;

        // 404 here means the server predates federation status: no data
        match classify::triage(MIRRORS_LAG_ENDPOINT, outcome, NotFoundPolicy::NoData)? {
            Triaged::NoData { node_id } => {
                tracing::debug!(node_id = %node_id, "Mirror lags not available on this server");
                Ok(MirrorLags {
                    mirror_lags: Vec::new(),
                    node_id,
                })
            }
            Triaged::Data(response) => decode_mirror_lags(&response.body, &response.node_id)
                .map_err(|source| {
                    tracing::error!(
                        error = %source,
                        "There was an issue when trying to unmarshal mirror lags response"
                    );
                    FetchError::Malformed {
                        endpoint: MIRRORS_LAG_ENDPOINT.to_string(),
                        source,
                    }
                }),
        }
    }

    pub async fn fetch_unavailable_mirrors(&self) -> Result<UnavailableMirrors, FetchError> {
        self.fetch_unavailable_mirrors_with_deadline(Deadline::timeout(UNAVAILABLE_MIRRORS_TIMEOUT))
            .await
    }

    pub async fn fetch_unavailable_mirrors_with_deadline(
        &self,
        deadline: Deadline,
    ) -> Result<UnavailableMirrors, FetchError> {
        tracing::debug!("Fetching unavailable mirrors");

        let outcome = self
            .fetch_http_with_deadline(UNAVAILABLE_MIRRORS_ENDPOINT, deadline)
            .await;

        // 404 here means the server does not support federation: no data
        match classify::triage(UNAVAILABLE_MIRRORS_ENDPOINT, outcome, NotFoundPolicy::NoData)? {
            Triaged::NoData { node_id } => {
                tracing::debug!(
                    node_id = %node_id,
                    "Unavailable mirrors not available on this server"
                );
                Ok(UnavailableMirrors {
                    unavailable_mirrors: Vec::new(),
                    node_id,
                })
            }
            Triaged::Data(response) => {
                decode_unavailable_mirrors(&response.body, &response.node_id).map_err(|source| {
                    tracing::error!(
                        error = %source,
                        "There was an issue when trying to unmarshal unavailable mirrors response"
                    );
                    FetchError::Malformed {
                        endpoint: UNAVAILABLE_MIRRORS_ENDPOINT.to_string(),
                        source,
                    }
                })
            }
        }
    }

    /// Whether the server exposes the federation status API at all
    ///
    /// Sentinel text counts as enabled: federation exists even though RTFS
    /// withholds its data. A 404 counts as disabled.
    pub async fn is_federation_enabled(&self) -> bool {
        let outcome = self.fetch_http(UNAVAILABLE_MIRRORS_ENDPOINT).await;
        let classification = classify::classify_outcome(&outcome, NotFoundPolicy::Unsupported);

        if let Err(e) = &outcome {
            tracing::debug!(error = %e, ?classification, "Federation probe did not get a JSON answer");
        }

        classification != classify::Classification::Failed
    }

    /// Collect both federation families if the family is switched on in
    /// `optional_metrics` and the server supports it
    ///
    /// Returns `None` when the family is off or the probe fails.
    pub async fn fetch_federation_status(&self) -> Option<FederationStatus> {
        if !self.config().optional_metrics.federation_status {
            return None;
        }
        if !self.is_federation_enabled().await {
            tracing::info!("Federation is not enabled on this server, skipping federation status");
            return None;
        }

        let (mirror_lags, unavailable_mirrors) =
            tokio::join!(self.fetch_mirror_lags(), self.fetch_unavailable_mirrors());

        Some(FederationStatus {
            mirror_lags,
            unavailable_mirrors,
        })
    }
}
