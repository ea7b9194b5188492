//! Shared HTTP client construction and response helpers

use crate::error::ClientError;
use reel_common::config::HttpConfig;
use std::time::Duration;

/// Build the reqwest client shared by every collaborator
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Join a base URL and a relative endpoint with exactly one slash
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Map a non-2xx response to `ClientError::Api`
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        body,
    })
}
