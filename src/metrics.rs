use crate::classify::Classification;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register descriptions for the client's own metrics
///
/// Recording works without this; descriptions only show up once the
/// embedding application has installed a recorder. Safe to call repeatedly.
pub fn describe_metrics() {
    describe_counter!(
        "artifactory_client_requests_total",
        "Total number of Artifactory API requests, by outcome"
    );
    describe_histogram!(
        "artifactory_client_request_duration_seconds",
        "Artifactory API request duration in seconds"
    );
    describe_counter!(
        "artifactory_client_cache_lookups_total",
        "Response cache lookups, by hit or miss"
    );
    describe_counter!(
        "artifactory_client_classifications_total",
        "Endpoint responses, by classification"
    );
}

/// Record a finished request; `outcome` is "success" or an error type name
pub fn record_fetch(endpoint: &str, outcome: &str) {
    counter!(
        "artifactory_client_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

pub fn record_fetch_duration(endpoint: &str, duration: Duration) {
    histogram!(
        "artifactory_client_request_duration_seconds",
        "endpoint" => endpoint.to_string(),
    )
    .record(duration.as_secs_f64());
}

pub fn record_cache_lookup(endpoint: &str, hit: bool) {
    counter!(
        "artifactory_client_cache_lookups_total",
        "endpoint" => endpoint.to_string(),
        "result" => if hit { "hit" } else { "miss" },
    )
    .increment(1);
}

pub fn record_classification(endpoint: &str, classification: Classification) {
    counter!(
        "artifactory_client_classifications_total",
        "endpoint" => endpoint.to_string(),
        "classification" => classification.as_str(),
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_metrics() {
        describe_metrics();

        record_fetch("federation/status/mirrorsLag", "success");
        record_fetch("federation/status/mirrorsLag", "deadline_exceeded");
        record_fetch_duration("federation/status/mirrorsLag", Duration::from_millis(120));
        record_cache_lookup("federation/status/mirrorsLag", true);
        record_classification("federation/status/mirrorsLag", Classification::Disabled);

        // No recorder is installed in tests; these must simply not panic
    }
}
