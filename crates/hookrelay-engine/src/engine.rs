//! Relay engine orchestrating delivery to ordered destinations.
//!
//! The engine is the single parameterized dispatch path for captured
//! messages: it snapshots the routable destinations, executes the selected
//! routing strategy, classifies every attempt into a `DeliveryOutcome`, and
//! optionally hands outcomes to a configured recorder. It holds no state
//! across calls; each invocation is a pure function from envelope,
//! destination snapshot, and strategy to a list of outcomes, modulo network
//! nondeterminism.
//!
//! # Strategies
//!
//! - `First`: strictly sequential fallback in ascending destination order,
//!   short-circuiting on the first successful delivery. Outcomes for every
//!   failed prior attempt are retained for audit.
//! - `All`: one spawned task per destination, full isolation between
//!   attempts, outcomes returned in destination order regardless of
//!   completion order.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use hookrelay_core::{
    models::{DeliveryOutcome, Destination, Envelope, RoutingStrategy, STATUS_NO_RESPONSE},
    Clock, RealClock,
};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    client::{ClientConfig, DispatchClient, OutboundRequest},
    error::{RelayError, Result},
    recorder::DeliveryRecorder,
    routing,
};

/// How the envelope path is applied to the destination URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Append the envelope path to the destination URL (the default).
    #[default]
    Append,
    /// Send to the destination URL as configured, ignoring the envelope path.
    Ignore,
}

/// Predicate deciding whether a received HTTP status counts as success.
///
/// One predicate applies per engine; the two definitions are never mixed
/// within a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Any 2xx status is a success (the default).
    #[default]
    Http2xx,
    /// The status must equal the destination's configured expected status;
    /// destinations without one fall back to the 2xx rule.
    ExpectedStatus,
}

impl SuccessPolicy {
    /// Classifies a received status code for the given destination.
    pub fn is_success(self, status_code: u16, destination: &Destination) -> bool {
        match self {
            Self::Http2xx => (200..300).contains(&status_code),
            Self::ExpectedStatus => match destination.expected_status {
                Some(expected) => status_code == expected,
                None => (200..300).contains(&status_code),
            },
        }
    }
}

/// Configuration for the relay engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Outbound HTTP client configuration, including the per-attempt timeout
    /// and the forwarded-header blocklist.
    pub client: ClientConfig,

    /// Whether the envelope path is appended to destination URLs.
    pub path_mode: PathMode,

    /// Success predicate applied to received responses.
    pub success_policy: SuccessPolicy,

    /// Additional per-attempt deadline under the `All` strategy, layered on
    /// top of the client timeout. An attempt cut off by this deadline yields
    /// a timeout outcome; sibling attempts are unaffected.
    pub fanout_timeout: Option<Duration>,
}

/// Relay engine for forwarding captured messages to destinations.
pub struct RelayEngine {
    client: Arc<DispatchClient>,
    config: RelayConfig,
    clock: Arc<dyn Clock>,
    recorder: Option<Arc<dyn DeliveryRecorder>>,
}

impl RelayEngine {
    /// Creates a relay engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: RelayConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(RealClock))
    }

    /// Creates a relay engine with an injected clock for deterministic
    /// timestamps in tests.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Arc::new(DispatchClient::new(config.client.clone(), clock.clone())?);
        Ok(Self { client, config, clock, recorder: None })
    }

    /// Attaches a delivery recorder that receives every produced outcome.
    ///
    /// Recorder failures are logged and never affect the relay result.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn DeliveryRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Relays one captured envelope to the destination snapshot under the
    /// given routing strategy.
    ///
    /// Destinations are filtered to enabled entries and stably sorted by
    /// ascending order before the strategy executes. An empty routable set is
    /// a no-op, not an error. Per-destination delivery failures are captured
    /// into outcomes and never abort the call.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Configuration` when destination data is
    /// malformed (unparsable URL or method); this is detected before any
    /// attempt is issued. Returns `RelayError::Internal` if a fan-out task
    /// fails to join.
    pub async fn relay(
        &self,
        envelope: &Envelope,
        destinations: &[Destination],
        strategy: RoutingStrategy,
    ) -> Result<Vec<DeliveryOutcome>> {
        let snapshot = routing::routable(destinations);
        if snapshot.is_empty() {
            debug!("no enabled destinations, relay is a no-op");
            return Ok(Vec::new());
        }

        // Validate the whole plan up front so malformed destination data
        // fails the call before anything is sent.
        let plan = snapshot
            .into_iter()
            .map(|destination| {
                let request = self.prepare(envelope, &destination)?;
                Ok((destination, request))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            strategy = %strategy,
            destination_count = plan.len(),
            method = %envelope.method,
            path = %envelope.path,
            "executing routing policy"
        );

        let outcomes = match strategy {
            RoutingStrategy::First => self.run_first(plan).await,
            RoutingStrategy::All => self.run_all(plan).await?,
        };

        if let Some(recorder) = &self.recorder {
            for outcome in &outcomes {
                if let Err(error) = recorder.record_outcome(outcome.clone()).await {
                    warn!(
                        delivery_id = %outcome.id,
                        destination_id = %outcome.destination_id,
                        error = %error,
                        "failed to record delivery outcome"
                    );
                }
            }
        }

        Ok(outcomes)
    }

    /// Re-relays a previously captured envelope.
    ///
    /// Replay is a deliberate, caller-initiated invocation: it shares no
    /// state with earlier calls and always produces a fresh, independent set
    /// of outcomes.
    ///
    /// # Errors
    ///
    /// Same contract as [`RelayEngine::relay`].
    pub async fn replay(
        &self,
        envelope: &Envelope,
        destinations: &[Destination],
        strategy: RoutingStrategy,
    ) -> Result<Vec<DeliveryOutcome>> {
        debug!("replaying captured envelope");
        self.relay(envelope, destinations, strategy).await
    }

    /// Builds the outbound request for one destination.
    fn prepare(&self, envelope: &Envelope, destination: &Destination) -> Result<OutboundRequest> {
        let target = match self.config.path_mode {
            PathMode::Append => format!("{}{}", destination.url, envelope.path),
            PathMode::Ignore => destination.url.clone(),
        };

        let url = target.parse::<Url>().map_err(|e| {
            RelayError::configuration(format!(
                "destination {} has invalid URL {target:?}: {e}",
                destination.id
            ))
        })?;

        let method = Method::from_bytes(envelope.method.as_bytes()).map_err(|e| {
            RelayError::configuration(format!(
                "envelope method {:?} is not a valid HTTP method: {e}",
                envelope.method
            ))
        })?;

        Ok(OutboundRequest {
            delivery_id: Uuid::new_v4(),
            destination_id: destination.id,
            url,
            method,
            headers: envelope.headers.clone(),
            body: envelope.body.clone(),
        })
    }

    /// Sequential fallback: try destinations in order, stop on first success.
    async fn run_first(&self, plan: Vec<(Destination, OutboundRequest)>) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(plan.len());

        for (destination, request) in plan {
            let outcome = Self::attempt(
                self.client.clone(),
                self.clock.clone(),
                self.config.success_policy,
                destination,
                request,
                None,
            )
            .await;

            let succeeded = outcome.success;
            outcomes.push(outcome);
            if succeeded {
                // Winner found; later destinations are never attempted.
                break;
            }
        }

        outcomes
    }

    /// Parallel fan-out: one task per destination, joined in destination
    /// order.
    async fn run_all(
        &self,
        plan: Vec<(Destination, OutboundRequest)>,
    ) -> Result<Vec<DeliveryOutcome>> {
        let mut handles = Vec::with_capacity(plan.len());

        for (destination, request) in plan {
            handles.push(tokio::spawn(Self::attempt(
                self.client.clone(),
                self.clock.clone(),
                self.config.success_policy,
                destination,
                request,
                self.config.fanout_timeout,
            )));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| RelayError::internal(format!("fan-out attempt task failed: {e}")))?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Sends one prepared request and classifies the result.
    ///
    /// Never fails: transport errors become outcomes with the no-response
    /// sentinel status, received responses are classified by the success
    /// policy. An optional deadline caps the attempt in addition to the
    /// client timeout.
    async fn attempt(
        client: Arc<DispatchClient>,
        clock: Arc<dyn Clock>,
        success_policy: SuccessPolicy,
        destination: Destination,
        request: OutboundRequest,
        deadline: Option<Duration>,
    ) -> DeliveryOutcome {
        let attempted_at = DateTime::<Utc>::from(clock.now_system());
        let start = clock.now();
        let delivery_id = request.delivery_id;

        let result = match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, client.dispatch(&request)).await
            {
                Ok(result) => result,
                Err(_elapsed) => Err(crate::client::DispatchError::Timeout {
                    timeout_seconds: deadline.as_secs(),
                }),
            },
            None => client.dispatch(&request).await,
        };

        match result {
            Ok(response) => {
                let success = success_policy.is_success(response.status_code, &destination);
                DeliveryOutcome {
                    id: delivery_id,
                    destination_id: destination.id,
                    success,
                    status_code: i32::from(response.status_code),
                    response_excerpt: response.excerpt,
                    attempted_at,
                    duration: response.duration,
                }
            },
            Err(error) => {
                warn!(
                    delivery_id = %delivery_id,
                    destination_id = %destination.id,
                    error = %error,
                    "delivery attempt failed without a response"
                );
                DeliveryOutcome {
                    id: delivery_id,
                    destination_id: destination.id,
                    success: false,
                    status_code: STATUS_NO_RESPONSE,
                    response_excerpt: String::new(),
                    attempted_at,
                    duration: start.elapsed(),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine(config: RelayConfig) -> RelayEngine {
        RelayEngine::new(config).expect("engine should build")
    }

    #[test]
    fn prepare_appends_envelope_path_by_default() {
        let engine = test_engine(RelayConfig::default());
        let envelope = Envelope::new("POST", "/github/push");
        let destination = Destination::new("https://example.com/hooks", 0);

        let request = engine.prepare(&envelope, &destination).expect("prepare should succeed");
        assert_eq!(request.url.as_str(), "https://example.com/hooks/github/push");
        assert_eq!(request.method, Method::POST);
    }

    #[test]
    fn prepare_can_ignore_envelope_path() {
        let config = RelayConfig { path_mode: PathMode::Ignore, ..RelayConfig::default() };
        let engine = test_engine(config);
        let envelope = Envelope::new("POST", "/github/push");
        let destination = Destination::new("https://example.com/hooks", 0);

        let request = engine.prepare(&envelope, &destination).expect("prepare should succeed");
        assert_eq!(request.url.as_str(), "https://example.com/hooks");
    }

    #[test]
    fn prepare_rejects_malformed_destination_url() {
        let engine = test_engine(RelayConfig::default());
        let envelope = Envelope::new("POST", "/hook");
        let destination = Destination::new("not a url", 0);

        let result = engine.prepare(&envelope, &destination);
        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }

    #[test]
    fn prepare_rejects_malformed_method() {
        let engine = test_engine(RelayConfig::default());
        let envelope = Envelope::new("NOT A METHOD", "/hook");
        let destination = Destination::new("https://example.com", 0);

        let result = engine.prepare(&envelope, &destination);
        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }

    #[test]
    fn success_policy_defaults_to_2xx() {
        let destination = Destination::new("https://example.com", 0);

        assert!(SuccessPolicy::Http2xx.is_success(200, &destination));
        assert!(SuccessPolicy::Http2xx.is_success(204, &destination));
        assert!(!SuccessPolicy::Http2xx.is_success(301, &destination));
        assert!(!SuccessPolicy::Http2xx.is_success(404, &destination));
        assert!(!SuccessPolicy::Http2xx.is_success(500, &destination));
    }

    #[test]
    fn expected_status_policy_matches_exact_code() {
        let destination = Destination::new("https://example.com", 0).with_expected_status(201);

        assert!(SuccessPolicy::ExpectedStatus.is_success(201, &destination));
        // A 200 is a failure when the destination expects 201.
        assert!(!SuccessPolicy::ExpectedStatus.is_success(200, &destination));
    }

    #[test]
    fn expected_status_policy_falls_back_to_2xx() {
        let destination = Destination::new("https://example.com", 0);

        assert!(SuccessPolicy::ExpectedStatus.is_success(200, &destination));
        assert!(!SuccessPolicy::ExpectedStatus.is_success(500, &destination));
    }

    #[tokio::test]
    async fn relay_with_no_enabled_destinations_is_noop() {
        let engine = test_engine(RelayConfig::default());
        let envelope = Envelope::new("POST", "/hook");

        for strategy in [RoutingStrategy::First, RoutingStrategy::All] {
            let outcomes =
                engine.relay(&envelope, &[], strategy).await.expect("relay should succeed");
            assert!(outcomes.is_empty());

            let disabled = vec![
                Destination::new("https://a.example.com", 0).disabled(),
                Destination::new("https://b.example.com", 1).disabled(),
            ];
            let outcomes =
                engine.relay(&envelope, &disabled, strategy).await.expect("relay should succeed");
            assert!(outcomes.is_empty());
        }
    }

    #[tokio::test]
    async fn relay_fails_fast_on_malformed_destination() {
        let engine = test_engine(RelayConfig::default());
        let envelope = Envelope::new("POST", "/hook");
        let destinations = vec![
            Destination::new("https://ok.example.com", 0),
            Destination::new("::broken::", 1),
        ];

        let result = engine.relay(&envelope, &destinations, RoutingStrategy::First).await;
        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }
}
