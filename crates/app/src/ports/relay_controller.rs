//! Relay controller port — the command channel to the relay hardware.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relayhub_domain::error::CommandError;
use relayhub_domain::id::RelayId;

/// Drives relays and reports their confirmed state.
///
/// Calls may be slow and may fail; failures come back as values, never panics.
pub trait RelayController: Send + Sync {
    /// Energize a relay.
    fn set_on(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// Release a relay.
    fn set_off(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// Energize a relay for `duration`, then release it.
    fn pulse(
        &self,
        id: &RelayId,
        duration: Duration,
    ) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// Confirmed state of a relay, `true` when energized.
    ///
    /// An `Err` means the state is unknown.
    fn get_state(&self, id: &RelayId) -> impl Future<Output = Result<bool, CommandError>> + Send;

    /// Drive a relay to `on`.
    fn set_state(
        &self,
        id: &RelayId,
        on: bool,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        async move {
            if on {
                self.set_on(id).await
            } else {
                self.set_off(id).await
            }
        }
    }
}

impl<T: RelayController> RelayController for Arc<T> {
    fn set_on(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send {
        (**self).set_on(id)
    }

    fn set_off(&self, id: &RelayId) -> impl Future<Output = Result<(), CommandError>> + Send {
        (**self).set_off(id)
    }

    fn pulse(
        &self,
        id: &RelayId,
        duration: Duration,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        (**self).pulse(id, duration)
    }

    fn get_state(&self, id: &RelayId) -> impl Future<Output = Result<bool, CommandError>> + Send {
        (**self).get_state(id)
    }
}
