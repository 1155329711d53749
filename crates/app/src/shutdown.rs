//! Cooperative shutdown: a broadcast flag plus a bounded task drain.
//!
//! The composition root owns the [`ShutdownHandle`]; every long-running loop
//! holds a [`ShutdownSignal`] and exits at its next suspension point once the
//! flag is raised.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Raises the shutdown flag for every [`ShutdownSignal`] derived from it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Ask every listener to stop. Idempotent.
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }

    /// A new listener for this handle.
    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Listener side of a [`ShutdownHandle`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// Also resolves when every handle has been dropped, since nothing can
    /// request a shutdown any more and listeners should not outlive the owner.
    pub async fn triggered(&mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }
}

/// Create a connected handle/signal pair.
#[must_use]
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownHandle {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

/// Wait for named tasks to finish, sharing one `grace` deadline.
///
/// Tasks still running at the deadline are aborted. Returns how many were.
pub async fn drain(tasks: Vec<(String, JoinHandle<()>)>, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    let mut aborted = 0;

    for (name, mut handle) in tasks {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => tracing::debug!(task = %name, "task stopped"),
            Ok(Err(err)) => tracing::warn!(%err, task = %name, "task ended abnormally"),
            Err(_) => {
                handle.abort();
                aborted += 1;
                tracing::warn!(
                    task = %name,
                    grace_ms = grace.as_millis(),
                    "task did not stop within grace period, aborted"
                );
            }
        }
    }

    aborted
}
