use artifactory_exporter::{
    config::{ArtifactoryConfig, CacheConfig, Config, Credentials, LoggingConfig, OptionalMetrics},
    ArtifactoryClient,
};
use std::sync::Arc;

/// Config pointing at `scrape_uri`, caching off, federation metrics on
pub fn create_test_config(scrape_uri: &str) -> Config {
    Config {
        artifactory: ArtifactoryConfig {
            scrape_uri: scrape_uri.to_string(),
            ssl_verify: false,
            timeout_seconds: 5,
            credentials: Credentials::UserPass {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
        },
        cache: CacheConfig {
            enabled: false,
            ttl_seconds: 300,
            timeout_seconds: 30,
        },
        optional_metrics: OptionalMetrics {
            federation_status: true,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "text".to_string(),
        },
    }
}

pub fn create_test_client(scrape_uri: &str) -> ArtifactoryClient {
    ArtifactoryClient::new(Arc::new(create_test_config(scrape_uri)))
        .expect("test client should build")
}

pub fn create_cached_test_client(scrape_uri: &str, ttl_seconds: u64) -> ArtifactoryClient {
    let mut config = create_test_config(scrape_uri);
    config.cache.enabled = true;
    config.cache.ttl_seconds = ttl_seconds;

    ArtifactoryClient::new(Arc::new(config)).expect("test client should build")
}
