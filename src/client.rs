//! HTTP access to the Artifactory REST API
//!
//! [`ArtifactoryClient`] performs exactly one GET per call, bounded by a
//! deadline, and hands back the raw body together with the node that served
//! it. Interpreting the body is left to [`crate::classify`] and the endpoint
//! decoders.

use crate::cache::ResponseCache;
use crate::config::{ArtifactoryConfig, Config};
use crate::error::FetchError;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Response header naming the cluster node that served the request
pub const NODE_ID_HEADER: &str = "x-artifactory-node-id";

/// Raw outcome of one HTTP round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub node_id: String,
    pub body: Bytes,
    pub status: StatusCode,
}

/// Bound on how long a fetch may take
///
/// Without an explicit timeout the configured request timeout applies; a
/// cancellation token, when given, aborts the request as soon as it fires.
/// A token that has already fired fails the call even when the response
/// cache holds a fresh entry.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    timeout: Option<Duration>,
    token: Option<CancellationToken>,
}

impl Deadline {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            token: None,
        }
    }

    pub fn token(token: CancellationToken) -> Self {
        Self {
            timeout: None,
            token: Some(token),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }
}

pub struct ArtifactoryClient {
    http: Client,
    config: Arc<Config>,
    cache: Option<ResponseCache>,
    span: tracing::Span,
}

impl ArtifactoryClient {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let http = http_client_builder(&config.artifactory).build()?;

        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(config.cache.ttl()));

        let span = tracing::info_span!(
            "artifactory_client",
            uri = %config.artifactory.scrape_uri,
        );

        tracing::debug!(
            uri = %config.artifactory.scrape_uri,
            auth_method = config.artifactory.credentials.auth_method(),
            ssl_verify = config.artifactory.ssl_verify,
            cache_enabled = cache.is_some(),
            "Created Artifactory client"
        );

        Ok(Self {
            http,
            config,
            cache,
            span,
        })
    }

    /// Replace the span every request is recorded under
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Fetch `endpoint` under the default deadline
    pub async fn fetch_http(&self, endpoint: &str) -> Result<FetchResult, FetchError> {
        self.fetch_http_with_deadline(endpoint, Deadline::default())
            .await
    }

    /// Fetch `endpoint`, going through the response cache when it is enabled
    ///
    /// A cache miss is bounded by the shorter of the cache timeout and the
    /// deadline's own timeout.
    pub async fn fetch_http_with_deadline(
        &self,
        endpoint: &str,
        deadline: Deadline,
    ) -> Result<FetchResult, FetchError> {
        if deadline.token.as_ref().is_some_and(|t| t.is_cancelled()) {
            tracing::debug!(endpoint, "Deadline already cancelled, not fetching");
            return Err(FetchError::Cancelled {
                endpoint: endpoint.to_string(),
            });
        }

        match &self.cache {
            Some(cache) => {
                let deadline = miss_deadline(deadline, self.config.cache.timeout());
                cache
                    .get_or_fetch(endpoint, || self.fetch_uncached(endpoint, deadline))
                    .await
            }
            None => self.fetch_uncached(endpoint, deadline).await,
        }
    }

    async fn fetch_uncached(
        &self,
        endpoint: &str,
        deadline: Deadline,
    ) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        let result = self
            .exchange(endpoint, deadline)
            .instrument(self.span.clone())
            .await;

        crate::metrics::record_fetch_duration(endpoint, start.elapsed());
        match &result {
            Ok(_) => crate::metrics::record_fetch(endpoint, "success"),
            Err(e) => crate::metrics::record_fetch(endpoint, e.type_name()),
        }

        result
    }

    async fn exchange(&self, endpoint: &str, deadline: Deadline) -> Result<FetchResult, FetchError> {
        let url = format!(
            "{}/{}",
            self.config.artifactory.scrape_uri.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let timeout = deadline
            .timeout
            .unwrap_or_else(|| self.config.artifactory.request_timeout());

        tracing::debug!(endpoint, url = %url, ?timeout, "Fetching endpoint");

        let request = self.config.artifactory.credentials.apply(self.http.get(&url));

        // Dropping this future on timeout or cancellation aborts the request
        // and releases its connection
        let round_trip = async {
            let response = request.send().await.map_err(|source| FetchError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

            let status = response.status();
            let node_id = node_id_from(response.headers());
            let body = response.bytes().await.map_err(|source| FetchError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

            Ok::<_, FetchError>(FetchResult {
                node_id,
                body,
                status,
            })
        };
        let bounded = tokio::time::timeout(timeout, round_trip);

        let outcome = match &deadline.token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::warn!(endpoint, "Request cancelled before a response arrived");
                    return Err(FetchError::Cancelled {
                        endpoint: endpoint.to_string(),
                    });
                }
                outcome = bounded => outcome,
            },
            None => bounded.await,
        };

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(endpoint, error = %e, "Transport error while fetching endpoint");
                return Err(e);
            }
            Err(_) => {
                tracing::error!(endpoint, ?timeout, "Request deadline exceeded");
                return Err(FetchError::DeadlineExceeded {
                    endpoint: endpoint.to_string(),
                    timeout,
                });
            }
        };

        tracing::debug!(
            endpoint,
            status = response.status.as_u16(),
            node_id = %response.node_id,
            bytes = response.body.len(),
            "Received response"
        );

        if response.status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotSupported {
                endpoint: endpoint.to_string(),
                response,
            });
        }
        if response.status.is_client_error() || response.status.is_server_error() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                response,
            });
        }

        Ok(response)
    }
}

fn http_client_builder(artifactory: &ArtifactoryConfig) -> ClientBuilder {
    Client::builder().danger_accept_invalid_certs(!artifactory.ssl_verify)
}

fn miss_deadline(deadline: Deadline, cache_timeout: Duration) -> Deadline {
    let timeout = deadline
        .timeout
        .map_or(cache_timeout, |t| t.min(cache_timeout));
    deadline.with_timeout(timeout)
}

fn node_id_from(headers: &HeaderMap) -> String {
    headers
        .get(NODE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactoryConfig, CacheConfig, Credentials, LoggingConfig, OptionalMetrics};
    use reqwest::header::HeaderValue;

    fn create_test_config(cache_enabled: bool) -> Config {
        Config {
            artifactory: ArtifactoryConfig {
                scrape_uri: "http://localhost:8081/artifactory/api/".to_string(),
                ssl_verify: false,
                timeout_seconds: 5,
                credentials: Credentials::UserPass {
                    username: "user".to_string(),
                    password: "pass".to_string(),
                },
            },
            cache: CacheConfig {
                enabled: cache_enabled,
                ..CacheConfig::default()
            },
            optional_metrics: OptionalMetrics::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_node_id_header_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Artifactory-Node-Id", HeaderValue::from_static("node-a"));
        assert_eq!(node_id_from(&headers), "node-a");
    }

    #[test]
    fn test_missing_node_id_header_is_empty() {
        assert_eq!(node_id_from(&HeaderMap::new()), "");
    }

    #[test]
    fn test_deadline_builders() {
        let token = CancellationToken::new();
        let deadline = Deadline::token(token.clone()).with_timeout(Duration::from_millis(250));
        assert_eq!(deadline.timeout, Some(Duration::from_millis(250)));
        assert!(deadline.token.is_some());

        let deadline = Deadline::default();
        assert!(deadline.timeout.is_none());
        assert!(deadline.token.is_none());
    }

    #[test]
    fn test_miss_deadline_keeps_the_shorter_timeout() {
        let cache_timeout = Duration::from_secs(30);

        let short = miss_deadline(Deadline::timeout(Duration::from_millis(200)), cache_timeout);
        assert_eq!(short.timeout, Some(Duration::from_millis(200)));

        let long = miss_deadline(Deadline::timeout(Duration::from_secs(60)), cache_timeout);
        assert_eq!(long.timeout, Some(cache_timeout));

        let token = CancellationToken::new();
        let unbounded = miss_deadline(Deadline::token(token), cache_timeout);
        assert_eq!(unbounded.timeout, Some(cache_timeout));
        assert!(unbounded.token.is_some());
    }

    #[test]
    fn test_ssl_verify_controls_certificate_checks() {
        let mut config = create_test_config(false);

        config.artifactory.ssl_verify = false;
        let builder = format!("{:?}", http_client_builder(&config.artifactory));
        assert!(builder.contains("danger_accept_invalid_certs"), "{}", builder);

        config.artifactory.ssl_verify = true;
        let builder = format!("{:?}", http_client_builder(&config.artifactory));
        assert!(!builder.contains("danger_accept_invalid_certs"), "{}", builder);
    }

    #[test]
    fn test_cache_follows_config() {
        let client = ArtifactoryClient::new(Arc::new(create_test_config(false))).unwrap();
        assert!(client.cache().is_none());

        let client = ArtifactoryClient::new(Arc::new(create_test_config(true))).unwrap();
        assert_eq!(client.cache().unwrap().ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_fails_fast() {
        let client = ArtifactoryClient::new(Arc::new(create_test_config(false))).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .fetch_http_with_deadline("federation/status/mirrorsLag", Deadline::token(token))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled { .. }));
        assert_eq!(err.endpoint(), "federation/status/mirrorsLag");
    }

    #[tokio::test]
    async fn test_cancelled_token_is_not_served_from_cache() {
        let client = ArtifactoryClient::new(Arc::new(create_test_config(true))).unwrap();
        let endpoint = "federation/status/mirrorsLag";
        client.cache().unwrap().insert(
            endpoint,
            FetchResult {
                node_id: "node-a".to_string(),
                body: Bytes::from_static(b"[]"),
                status: StatusCode::OK,
            },
        );

        let token = CancellationToken::new();
        token.cancel();
        let err = client
            .fetch_http_with_deadline(endpoint, Deadline::token(token))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled { .. }));

        let hit = client.fetch_http(endpoint).await.unwrap();
        assert_eq!(hit.node_id, "node-a");
    }
}
