//! Message relay engine for captured webhook requests.
//!
//! This crate implements the delivery core of the relay: given a captured
//! [`Envelope`](hookrelay_core::Envelope), an immutable destination
//! snapshot, and a routing strategy, it forwards the message and reports one
//! [`DeliveryOutcome`](hookrelay_core::DeliveryOutcome) per attempted
//! destination. Request capture, persistence, and the canned response shown
//! to the original sender are the caller's job; the engine is invoked
//! in-process and holds no state between calls.
//!
//! # Routing strategies
//!
//! - **First** — sequential fallback: destinations are tried in ascending
//!   order and the chain stops at the first successful delivery.
//! - **All** — parallel fan-out: every enabled destination is attempted
//!   concurrently, with full isolation between attempts.
//!
//! # Example
//!
//! ```no_run
//! use hookrelay_core::{Destination, Envelope, RoutingStrategy};
//! use hookrelay_engine::{RelayConfig, RelayEngine, RelayError};
//!
//! # async fn example() -> Result<(), RelayError> {
//! let engine = RelayEngine::new(RelayConfig::default())?;
//!
//! let envelope = Envelope::new("POST", "/github/push")
//!     .with_header("x-github-event", "push")
//!     .with_body(r#"{"ref":"refs/heads/main"}"#);
//! let destinations = vec![
//!     Destination::new("https://primary.example.com/hooks", 0),
//!     Destination::new("https://backup.example.com/hooks", 1),
//! ];
//!
//! let outcomes = engine.relay(&envelope, &destinations, RoutingStrategy::First).await?;
//! for outcome in &outcomes {
//!     println!("{}: success={}", outcome.destination_id, outcome.success);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod engine;
pub mod error;
pub mod recorder;
pub mod routing;

// Re-export main public API
pub use client::ClientConfig;
pub use engine::{PathMode, RelayConfig, RelayEngine, SuccessPolicy};
pub use error::{RelayError, Result};
pub use recorder::DeliveryRecorder;

/// Default per-attempt HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
