//! JSON-over-HTTP plumbing shared by the embedding and generation providers.
//!
//! # Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

/// Build a client with the provider's request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send the request produced by `build` and decode a JSON response body.
///
/// `build` is called once per attempt because a `RequestBuilder` cannot be
/// reused. `service` names the remote side in error messages.
pub async fn send_json<F>(build: F, max_retries: u32, service: &str) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        service,
                        status,
                        body_text
                    ));
                    continue;
                }

                bail!("{} API error {}: {}", service, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!("{} request failed: {}", service, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", service)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": 42}"#)
            .create_async()
            .await;

        let http = client(5).unwrap();
        let url = format!("{}/ok", server.url());
        let json = send_json(|| http.post(&url), 0, "Test").await.unwrap();
        assert_eq!(json["answer"], 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bad")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let http = client(5).unwrap();
        let url = format!("{}/bad", server.url());
        let err = send_json(|| http.post(&url), 3, "Test").await.unwrap_err();
        assert!(err.to_string().contains("Test API error 400"));
        assert!(err.to_string().contains("bad request"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_without_retries_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/down")
            .with_status(503)
            .create_async()
            .await;

        let http = client(5).unwrap();
        let url = format!("{}/down", server.url());
        let err = send_json(|| http.post(&url), 0, "Test").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
