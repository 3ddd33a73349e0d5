//! Delivery recorder abstraction.
//!
//! The recorder is an external collaborator: the engine hands it each
//! outcome after policy execution but does not own storage. Recorder
//! failures are logged and never affect the relay result, so a broken audit
//! store cannot break delivery. Callers that prefer to persist the returned
//! outcome list themselves can simply not configure a recorder.

use std::{future::Future, pin::Pin};

use hookrelay_core::{error::Result, models::DeliveryOutcome};

/// Persists delivery outcomes produced by the relay engine.
///
/// Implementations typically write to the caller's delivery-record store.
/// The trait is object-safe so the engine can hold `Arc<dyn DeliveryRecorder>`
/// without committing to a storage backend.
pub trait DeliveryRecorder: Send + Sync + 'static {
    /// Records one delivery outcome.
    ///
    /// Outcomes arrive in the order the engine returns them: destination
    /// order, not completion order.
    fn record_outcome(
        &self,
        outcome: DeliveryOutcome,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

pub mod mock {
    //! In-memory recorder for testing delivery bookkeeping.

    use std::sync::Arc;

    use hookrelay_core::error::CoreError;
    use tokio::sync::RwLock;

    use super::{DeliveryOutcome, DeliveryRecorder, Future, Pin, Result};

    /// Recorder that keeps outcomes in memory for verification.
    ///
    /// Supports injecting a failure to verify that recorder errors never
    /// propagate out of the engine.
    #[derive(Debug, Default)]
    pub struct MemoryRecorder {
        outcomes: Arc<RwLock<Vec<DeliveryOutcome>>>,
        fail_with: Arc<RwLock<Option<String>>>,
    }

    impl MemoryRecorder {
        /// Creates an empty recorder.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent `record_outcome` call fail.
        pub async fn inject_error(&self, message: impl Into<String>) {
            *self.fail_with.write().await = Some(message.into());
        }

        /// Returns all recorded outcomes, in recording order.
        pub async fn recorded(&self) -> Vec<DeliveryOutcome> {
            self.outcomes.read().await.clone()
        }
    }

    impl DeliveryRecorder for MemoryRecorder {
        fn record_outcome(
            &self,
            outcome: DeliveryOutcome,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            let outcomes = self.outcomes.clone();
            let fail_with = self.fail_with.clone();

            Box::pin(async move {
                if let Some(message) = fail_with.read().await.clone() {
                    return Err(CoreError::Storage(message));
                }
                outcomes.write().await.push(outcome);
                Ok(())
            })
        }
    }
}
