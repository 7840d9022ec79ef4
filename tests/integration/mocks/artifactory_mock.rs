use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Node id every mocked response carries in its header
pub const NODE_ID: &str = "test-node";

fn artifactory_response(body: &str, status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("X-Artifactory-Node-Id", NODE_ID)
        .set_body_raw(body.as_bytes().to_vec(), content_type_for(body))
}

fn content_type_for(body: &str) -> &'static str {
    if body.starts_with('{') || body.starts_with('[') {
        "application/json"
    } else {
        "text/plain"
    }
}

/// Start a mock Artifactory answering GET `endpoint` with `body` and `status`
///
/// `endpoint` is relative to the server root, like the client's endpoints.
pub async fn setup_artifactory_mock(endpoint: &str, body: &str, status: u16) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}", endpoint)))
        .respond_with(artifactory_response(body, status))
        .mount(&mock_server)
        .await;

    mock_server
}

/// Same as [`setup_artifactory_mock`] but every response is held back by `delay`
pub async fn setup_delayed_artifactory_mock(
    endpoint: &str,
    body: &str,
    status: u16,
    delay: Duration,
) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}", endpoint)))
        .respond_with(artifactory_response(body, status).set_delay(delay))
        .mount(&mock_server)
        .await;

    mock_server
}
