//! HTTP client for outbound delivery with bounded timeouts.
//!
//! Handles request construction, header filtering, response excerpt capture,
//! and transport error categorization. The client is pool-backed and safe for
//! concurrent use; parallel fan-out attempts never serialize through it.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use hookrelay_core::{models::DestinationId, Clock};
use reqwest::{Method, Response, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{RelayError, Result};

/// Maximum response body excerpt retained on an outcome.
const MAX_EXCERPT_BYTES: usize = 1024;

/// Cap on bytes read from a response body; the stream is dropped once the
/// cap is reached, so a huge or unbounded body cannot exhaust memory.
const MAX_RESPONSE_BODY_BYTES: usize = 64 * 1024;

/// Configuration for the outbound dispatch client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-attempt timeout. Always finite; a relay call can never hang on a
    /// single destination longer than this.
    pub timeout: Duration,

    /// User agent string for outbound requests.
    pub user_agent: String,

    /// Maximum number of redirects to follow.
    pub max_redirects: u32,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Envelope headers that are never forwarded, lowercase. The defaults
    /// cover transport framing headers whose values would be wrong for the
    /// re-issued request.
    pub blocked_headers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "hookrelay/0.1".to_string(),
            max_redirects: 3,
            verify_tls: true,
            blocked_headers: vec![
                "content-length".to_string(),
                "connection".to_string(),
                "content-type".to_string(),
            ],
        }
    }
}

/// Fully-prepared outbound request for one destination.
///
/// Built by the engine before any attempt is issued so that malformed
/// destination data fails the relay call up front instead of mid-chain.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// Unique identifier for this delivery attempt.
    pub delivery_id: Uuid,
    /// Destination being delivered to.
    pub destination_id: DestinationId,
    /// Resolved target URL (destination base, with the envelope path already
    /// applied per the configured path mode).
    pub url: Url,
    /// HTTP method copied from the envelope.
    pub method: Method,
    /// Envelope headers; the blocklist is applied at dispatch time.
    pub headers: HashMap<String, String>,
    /// Envelope body, copied verbatim.
    pub body: Option<Bytes>,
}

/// Response received from a destination.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Truncated response body excerpt.
    pub excerpt: String,
    /// Total duration of the request.
    pub duration: Duration,
}

/// Transport-level failure: no HTTP response was received.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The per-attempt timeout elapsed.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout that elapsed.
        timeout_seconds: u64,
    },

    /// Connection could not be established (DNS failure, refused).
    #[error("connection failed: {message}")]
    Connect {
        /// Underlying connection error.
        message: String,
    },

    /// Any other transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying transport error.
        message: String,
    },
}

/// HTTP client for relaying captured messages to destinations.
#[derive(Debug, Clone)]
pub struct DispatchClient {
    client: reqwest::Client,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
}

impl DispatchClient {
    /// Creates a new dispatch client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Configuration` if the HTTP client cannot be
    /// built with the provided settings.
    pub fn new(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| RelayError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config, clock })
    }

    /// Sends one prepared request to its destination.
    ///
    /// Method and body come verbatim from the envelope; headers are forwarded
    /// minus the configured blocklist, and relay metadata headers are stamped
    /// on top.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` only for transport-level failures where no
    /// HTTP response was received. Non-2xx responses are not errors here;
    /// success classification belongs to the engine's success policy.
    pub async fn dispatch(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<DispatchResponse, DispatchError> {
        let start = self.clock.now();

        let span = info_span!(
            "relay_dispatch",
            delivery_id = %request.delivery_id,
            destination_id = %request.destination_id,
            url = %request.url,
        );

        async move {
            debug!(method = %request.method, "dispatching to destination");

            let mut http_request =
                self.client.request(request.method.clone(), request.url.clone());

            for (name, value) in &request.headers {
                if !self.is_blocked_header(name) {
                    http_request = http_request.header(name, value);
                }
            }

            http_request = http_request
                .header("X-Relay-Delivery-Id", request.delivery_id.to_string())
                .header("X-Relay-Timestamp", chrono::Utc::now().to_rfc3339());

            if let Some(body) = &request.body {
                http_request = http_request.body(body.clone());
            }

            let response = match http_request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let duration = start.elapsed();
                    warn!(duration_ms = duration.as_millis(), "request failed: {}", e);

                    if e.is_timeout() {
                        return Err(DispatchError::Timeout {
                            timeout_seconds: self.config.timeout.as_secs(),
                        });
                    }
                    if e.is_connect() {
                        return Err(DispatchError::Connect { message: e.to_string() });
                    }
                    return Err(DispatchError::Transport { message: e.to_string() });
                },
            };

            let status_code = response.status().as_u16();
            let excerpt = read_excerpt(response).await;
            let duration = start.elapsed();

            match status_code {
                200..=299 => debug!(status = status_code, "destination accepted message"),
                _ => warn!(status = status_code, "destination returned non-success status"),
            }

            Ok(DispatchResponse { status_code, excerpt, duration })
        }
        .instrument(span)
        .await
    }

    fn is_blocked_header(&self, name: &str) -> bool {
        self.config.blocked_headers.iter().any(|blocked| blocked.eq_ignore_ascii_case(name))
    }
}

/// Reads the response body and truncates it to the audit excerpt size.
async fn read_excerpt(response: Response) -> String {
    match read_body_capped(response).await {
        Ok(bytes) => truncate_excerpt(&bytes),
        Err(e) => {
            warn!("failed to read response body: {}", e);
            format!("[failed to read response body: {e}]")
        },
    }
}

/// Streams the response body, stopping at [`MAX_RESPONSE_BODY_BYTES`].
async fn read_body_capped(mut response: Response) -> reqwest::Result<Vec<u8>> {
    let mut buffer = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BODY_BYTES - buffer.len();
        if chunk.len() >= remaining {
            buffer.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// Truncates raw response bytes to [`MAX_EXCERPT_BYTES`], marking truncation.
fn truncate_excerpt(bytes: &[u8]) -> String {
    if bytes.len() > MAX_EXCERPT_BYTES {
        let suffix = "... (truncated)";
        let max_content = MAX_EXCERPT_BYTES - suffix.len();
        let truncated = String::from_utf8_lossy(&bytes[..max_content]);
        format!("{truncated}{suffix}")
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use hookrelay_core::RealClock;

    use super::*;

    fn test_client(config: ClientConfig) -> DispatchClient {
        DispatchClient::new(config, Arc::new(RealClock)).expect("client should build")
    }

    #[test]
    fn default_blocklist_covers_framing_headers() {
        let client = test_client(ClientConfig::default());

        assert!(client.is_blocked_header("content-length"));
        assert!(client.is_blocked_header("Content-Length"));
        assert!(client.is_blocked_header("CONNECTION"));
        assert!(client.is_blocked_header("content-type"));

        assert!(!client.is_blocked_header("x-signature"));
        assert!(!client.is_blocked_header("authorization"));
    }

    #[test]
    fn blocklist_is_configurable() {
        let config = ClientConfig {
            blocked_headers: vec!["content-length".to_string(), "connection".to_string()],
            ..ClientConfig::default()
        };
        let client = test_client(config);

        // Matches the variant that forwards content-type untouched.
        assert!(!client.is_blocked_header("content-type"));
        assert!(client.is_blocked_header("content-length"));
    }

    #[test]
    fn excerpt_preserves_short_bodies() {
        assert_eq!(truncate_excerpt(b"OK"), "OK");
        assert_eq!(truncate_excerpt(b""), "");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = vec![b'a'; 10 * 1024];
        let excerpt = truncate_excerpt(&body);

        assert!(excerpt.len() <= MAX_EXCERPT_BYTES);
        assert!(excerpt.ends_with("... (truncated)"));
    }

    #[test]
    fn excerpt_handles_invalid_utf8() {
        let body = vec![0xff, 0xfe, b'o', b'k'];
        let excerpt = truncate_excerpt(&body);
        assert!(excerpt.contains("ok"));
    }

    #[test]
    fn timeout_is_always_finite() {
        let config = ClientConfig::default();
        assert!(config.timeout > Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
