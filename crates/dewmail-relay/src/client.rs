//! JSON HTTP client shared by all outbound relay calls.
//!
//! Every request carries `Content-Type: application/json` and runs under
//! the configured timeout, user agent, and redirect limit. Responses are
//! captured with their status and a size-limited body so callers can log
//! or parse them without rereading the wire.

use std::time::Duration;

use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::error::{RelayError, Result};

/// Configuration for the outbound JSON client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Default timeout for HTTP requests.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Dewmail-Relay/1.0".to_string(),
            max_redirects: 3,
            verify_tls: true,
        }
    }
}

/// Response from an outbound JSON request.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body (limited size).
    pub body: String,
    /// Total duration of the request.
    pub duration: Duration,
    /// Whether the request was successful (2xx status).
    pub is_success: bool,
}

/// HTTP client for relay dispatch, datastore pushes, and SPF lookups.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl JsonClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Configuration` if the HTTP client cannot be
    /// built with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| RelayError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a new client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Issues a POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Timeout` or `RelayError::Network` when the
    /// request cannot complete. Non-2xx responses are not errors; callers
    /// inspect `is_success` when they care.
    pub async fn post(&self, url: &str, body: &serde_json::Value) -> Result<JsonResponse> {
        self.request(Method::POST, url, Some(body)).await
    }

    /// Issues a PATCH with a JSON body.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`JsonClient::post`].
    pub async fn patch(&self, url: &str, body: &serde_json::Value) -> Result<JsonResponse> {
        self.request(Method::PATCH, url, Some(body)).await
    }

    /// Issues a GET, expecting a JSON response.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`JsonClient::post`].
    pub async fn get(&self, url: &str) -> Result<JsonResponse> {
        self.request(Method::GET, url, None).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<JsonResponse> {
        if url.is_empty() {
            return Err(RelayError::configuration("empty request URL"));
        }

        let start_time = std::time::Instant::now();
        let span = info_span!("json_request", method = %method, url = %url);

        async move {
            let mut request =
                self.client.request(method, url).header("content-type", "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let duration = start_time.elapsed();
                    tracing::warn!(duration_ms = duration.as_millis(), "request failed: {}", e);

                    if e.is_timeout() {
                        return Err(RelayError::timeout(self.config.timeout.as_secs()));
                    }
                    if e.is_connect() {
                        return Err(RelayError::network(format!("connection failed: {e}")));
                    }
                    return Err(RelayError::network(e.to_string()));
                },
            };

            let duration = start_time.elapsed();
            let json_response = read_response(response, duration).await;

            tracing::debug!(
                status = json_response.status_code,
                duration_ms = duration.as_millis(),
                "received response"
            );

            Ok(json_response)
        }
        .instrument(span)
        .await
    }
}

/// Reads a response body with truncation for oversized payloads.
async fn read_response(response: Response, duration: Duration) -> JsonResponse {
    const MAX_RESPONSE_BODY_SIZE: usize = 64 * 1024;

    let status_code = response.status().as_u16();
    let is_success = response.status().is_success();

    let body = match response.bytes().await {
        Ok(bytes) => {
            if bytes.len() > MAX_RESPONSE_BODY_SIZE {
                let truncated = String::from_utf8_lossy(&bytes[..MAX_RESPONSE_BODY_SIZE]);
                format!("{truncated}... (truncated)")
            } else {
                String::from_utf8_lossy(&bytes).into_owned()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read response body: {}", e);
            format!("[failed to read response body: {e}]")
        },
    };

    JsonResponse { status_code, body, duration, is_success }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn post_sends_json_content_type() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/sink"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::body_json(json!({"from": "a*****@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&mock_server)
            .await;

        let client = JsonClient::with_defaults().unwrap();
        let response = client
            .post(&format!("{}/sink", mock_server.uri()), &json!({"from": "a*****@example.com"}))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.is_success);
        assert_eq!(response.body, "OK");
    }

    #[tokio::test]
    async fn patch_updates_resource() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("PATCH"))
            .and(matchers::path("/count.json"))
            .and(matchers::body_json(json!({"count": 42})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = JsonClient::with_defaults().unwrap();
        let response = client
            .patch(&format!("{}/count.json", mock_server.uri()), &json!({"count": 42}))
            .await
            .unwrap();

        assert!(response.is_success);
    }

    #[tokio::test]
    async fn get_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/count.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"count": 7}"#))
            .mount(&mock_server)
            .await;

        let client = JsonClient::with_defaults().unwrap();
        let response = client.get(&format!("{}/count.json", mock_server.uri())).await.unwrap();

        assert_eq!(response.body, r#"{"count": 7}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = JsonClient::with_defaults().unwrap();
        let response =
            client.post(&format!("{}/sink", mock_server.uri()), &json!({})).await.unwrap();

        assert_eq!(response.status_code, 500);
        assert!(!response.is_success);
        assert_eq!(response.body, "boom");
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let client = JsonClient::with_defaults().unwrap();
        // Port 9 (discard) is almost certainly closed
        let result = client.post("http://127.0.0.1:9/sink", &json!({})).await;

        assert!(matches!(result, Err(RelayError::Network { .. })));
    }

    #[tokio::test]
    async fn empty_url_rejected_before_sending() {
        let client = JsonClient::with_defaults().unwrap();
        let result = client.get("").await;

        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }
}
