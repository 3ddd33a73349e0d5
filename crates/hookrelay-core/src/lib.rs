//! Core domain models for the webhook relay.
//!
//! Provides strongly-typed domain primitives, the clock abstraction, and
//! shared error handling. The engine crate depends on these foundational
//! types; callers use them to construct destination snapshots and captured
//! envelopes for relay invocations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;

pub use error::{CoreError, Result};
pub use models::{
    DeliveryOutcome, Destination, DestinationId, Envelope, RoutingStrategy, STATUS_NO_RESPONSE,
};
pub use time::{Clock, RealClock, TestClock};
