//! Diagnostic sink for isolated subscriber failures.
//!
//! A failing observer never aborts delivery and never reaches the writer.
//! Its failure is counted here and logged through `tracing` instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::SubscriberError;

/// Tracing target for subscriber failures.
pub const DIAGNOSTICS_TARGET: &str = "reactive_models::diagnostics";

#[derive(Debug, Default)]
pub struct Diagnostics {
    subscriber_failures: AtomicU64,
    last_failure: Mutex<Option<SubscriberError>>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscriber failure raised while delivering on `channel`.
    pub fn record(&self, channel: &str, err: SubscriberError) {
        self.subscriber_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(target: DIAGNOSTICS_TARGET, channel, error = %err, "subscriber failed during delivery");
        *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    #[must_use]
    pub fn subscriber_failures(&self) -> u64 {
        self.subscriber_failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<SubscriberError> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        self.subscriber_failures.store(0, Ordering::Relaxed);
        *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_and_keeps_last() {
        let diag = Diagnostics::new();
        diag.record("User", SubscriberError::failed("first"));
        diag.record("User", SubscriberError::failed("second"));

        assert_eq!(diag.subscriber_failures(), 2);
        assert_eq!(diag.last_failure(), Some(SubscriberError::failed("second")));

        diag.reset();
        assert_eq!(diag.subscriber_failures(), 0);
        assert!(diag.last_failure().is_none());
    }
}
