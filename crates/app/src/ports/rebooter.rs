//! Rebooter port — restarts the host when a rule asks for it.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::error::ActionError;

/// Restarts the machine the daemon runs on.
pub trait Rebooter: Send + Sync {
    /// Request an immediate reboot.
    fn reboot(&self) -> impl Future<Output = Result<(), ActionError>> + Send;
}

impl<T: Rebooter> Rebooter for Arc<T> {
    fn reboot(&self) -> impl Future<Output = Result<(), ActionError>> + Send {
        (**self).reboot()
    }
}
