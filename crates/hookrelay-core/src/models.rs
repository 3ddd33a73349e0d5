//! Core domain models for message relay.
//!
//! Defines destinations, captured message envelopes, routing strategies, and
//! delivery outcomes, plus newtype ID wrappers for compile-time type safety.
//! All values are immutable snapshots for the duration of one relay call;
//! the engine never mutates them.

use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status code recorded when no HTTP response was received at all
/// (DNS failure, connection refused, timeout).
pub const STATUS_NO_RESPONSE: i32 = -1;

/// Strongly-typed destination identifier.
///
/// Wraps a UUID to prevent mixing with other ID types. Destination IDs are
/// assigned by the configuration layer and follow the destination through
/// every delivery outcome recorded against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub Uuid);

impl DestinationId {
    /// Creates a new random destination ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DestinationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DestinationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A configured outbound target for relayed messages.
///
/// Destinations are snapshotted by the caller before a relay call and stay
/// immutable for its duration. Only destinations with `enabled = true`
/// participate in routing, in ascending `order`. Order values need not be
/// contiguous; only relative order matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Unique identifier for this destination.
    pub id: DestinationId,

    /// Base URL messages are relayed to.
    pub url: String,

    /// Whether this destination participates in routing.
    pub enabled: bool,

    /// Relative position in the routing order, ascending.
    pub order: u32,

    /// Status code that counts as a successful delivery for this destination
    /// when the expected-status success policy is active. `None` falls back
    /// to the 2xx default.
    pub expected_status: Option<u16>,
}

impl Destination {
    /// Creates an enabled destination with the given URL and order.
    pub fn new(url: impl Into<String>, order: u32) -> Self {
        Self {
            id: DestinationId::new(),
            url: url.into(),
            enabled: true,
            order,
            expected_status: None,
        }
    }

    /// Disables the destination.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Sets the destination-specific expected success status code.
    #[must_use]
    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }
}

/// Captured representation of one inbound webhook request.
///
/// The envelope is an opaque payload: the engine copies method and body
/// verbatim and never parses or re-encodes the content. Header keys are
/// normalized to lowercase on insertion; a later write to the same key wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// HTTP method of the captured request.
    pub method: String,

    /// Request path, including leading slash, relative to the capture
    /// endpoint. Appended to the destination URL under path-append routing.
    pub path: String,

    /// Captured request headers, keys lowercase.
    pub headers: HashMap<String, String>,

    /// Raw request body, absent for bodyless methods.
    pub body: Option<Bytes>,
}

impl Envelope {
    /// Creates an envelope with no headers and no body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into(), headers: HashMap::new(), body: None }
    }

    /// Adds a header, normalizing the key to lowercase. Last write wins.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// Adds every header from the iterator, normalizing keys to lowercase.
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.as_ref().to_lowercase(), value.into());
        }
        self
    }

    /// Sets the raw body payload.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Looks up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Policy governing how the enabled destinations of an endpoint are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStrategy {
    /// Sequential fallback: try destinations in ascending order, stop at the
    /// first successful delivery.
    First,
    /// Parallel fan-out: attempt every enabled destination concurrently.
    All,
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for RoutingStrategy {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(crate::error::CoreError::InvalidRoutingStrategy(other.to_string())),
        }
    }
}

/// Recorded result of one attempted send to one destination.
///
/// Outcomes are produced fresh on every relay invocation and handed back to
/// the caller for persistence. Destinations skipped because they are disabled
/// produce no outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Unique identifier for this delivery attempt.
    pub id: Uuid,

    /// Destination this attempt was sent to.
    pub destination_id: DestinationId,

    /// Whether the attempt satisfied the configured success policy.
    pub success: bool,

    /// HTTP status code of the response, or [`STATUS_NO_RESPONSE`] when the
    /// request failed at the transport level.
    pub status_code: i32,

    /// Truncated excerpt of the response body, empty when no response was
    /// received.
    pub response_excerpt: String,

    /// When the attempt was started.
    pub attempted_at: DateTime<Utc>,

    /// Wall-clock duration of the attempt.
    pub duration: Duration,
}

impl DeliveryOutcome {
    /// Whether an HTTP response was received at all, successful or not.
    pub fn received_response(&self) -> bool {
        self.status_code != STATUS_NO_RESPONSE
    }
}
