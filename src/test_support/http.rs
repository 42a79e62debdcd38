use httpmock::MockServer;

/// Start a fresh `httpmock::MockServer` for use in unit or integration tests.
pub async fn start_mock_server() -> MockServer {
    MockServer::start_async().await
}
