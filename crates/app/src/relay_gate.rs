//! Relay gate — serializes commands per relay and bounds every call.
//!
//! The schedule runner and the rule engine share one controller. Wrapping it
//! in a [`RelayGate`] guarantees at most one in-flight call per relay id,
//! while calls for different relays still proceed concurrently.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use relayhub_domain::error::CommandError;
use relayhub_domain::id::RelayId;

use crate::ports::RelayController;

/// Upper bound on a single controller call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`RelayController`] decorator adding per-relay locking and timeouts.
pub struct RelayGate<C> {
    inner: C,
    timeout: Duration,
    locks: Mutex<HashMap<RelayId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: RelayController> RelayGate<C> {
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self::with_timeout(inner, DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(inner: C, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped controller.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn lock_for(&self, id: &RelayId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    async fn guarded<T, F, Fut>(
        &self,
        id: &RelayId,
        operation: &'static str,
        limit: Duration,
        call: F,
    ) -> Result<T, CommandError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CommandError>>,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        if let Ok(result) = tokio::time::timeout(limit, call()).await {
            result
        } else {
            tracing::warn!(
                relay_id = %id,
                operation,
                timeout_ms = limit.as_millis(),
                "relay controller call timed out"
            );
            Err(CommandError::Timeout {
                relay_id: id.to_string(),
                timeout: limit,
            })
        }
    }
}

impl<C: RelayController> RelayController for RelayGate<C> {
    fn set_on(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send {
        self.guarded(id, "set_on", self.timeout, move || self.inner.set_on(id))
    }

    fn set_off(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send {
        self.guarded(id, "set_off", self.timeout, move || self.inner.set_off(id))
    }

    fn pulse(
        &self,
        id: &RelayId,
        duration: Duration,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        // Controllers may hold the call open for the whole pulse.
        let limit = self.timeout.saturating_add(duration);
        self.guarded(id, "pulse", limit, move || self.inner.pulse(id, duration))
    }

    fn get_state(&self, id: &RelayId) -> impl Future<Output = Result<bool, CommandError>> + Send {
        self.guarded(id, "get_state", self.timeout, move || self.inner.get_state(id))
    }
}
