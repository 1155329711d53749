//! In-memory relay bank.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use relayhub_app::ports::RelayController;
use relayhub_domain::error::CommandError;
use relayhub_domain::id::RelayId;

/// A command received by the [`VirtualRelayBank`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    On(RelayId),
    Off(RelayId),
    Pulse(RelayId, Duration),
}

/// Simulated relay board.
///
/// Relays start released. Commands and state queries can be made to fail
/// per relay to exercise the error paths of the automation core.
#[derive(Debug, Default)]
pub struct VirtualRelayBank {
    states: Mutex<HashMap<RelayId, bool>>,
    failing_commands: Mutex<HashSet<RelayId>>,
    failing_queries: Mutex<HashSet<RelayId>>,
    commands: Mutex<Vec<RelayCommand>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VirtualRelayBank {
    /// Create a bank with the given relays, all released.
    pub fn new(ids: impl IntoIterator<Item = RelayId>) -> Self {
        Self {
            states: Mutex::new(ids.into_iter().map(|id| (id, false)).collect()),
            ..Self::default()
        }
    }

    /// Current state of a relay, `None` if the bank does not have it.
    #[must_use]
    pub fn state(&self, id: &RelayId) -> Option<bool> {
        lock(&self.states).get(id).copied()
    }

    /// Change a relay's state behind the automation core's back.
    pub fn set_observed(&self, id: &RelayId, on: bool) {
        lock(&self.states).insert(id.clone(), on);
    }

    /// Make every command to `id` fail (or succeed again).
    pub fn fail_commands(&self, id: &RelayId, failing: bool) {
        toggle(&self.failing_commands, id, failing);
    }

    /// Make every state query for `id` fail (or succeed again).
    pub fn fail_queries(&self, id: &RelayId, failing: bool) {
        toggle(&self.failing_queries, id, failing);
    }

    /// Every accepted command, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<RelayCommand> {
        lock(&self.commands).clone()
    }

    fn apply(&self, id: &RelayId, on: bool, command: RelayCommand) -> Result<(), CommandError> {
        if lock(&self.failing_commands).contains(id) {
            return Err(CommandError::Rejected {
                relay_id: id.to_string(),
                message: "simulated relay fault".to_string(),
            });
        }
        let mut states = lock(&self.states);
        let Some(state) = states.get_mut(id) else {
            return Err(CommandError::UnknownRelay {
                relay_id: id.to_string(),
            });
        };
        *state = on;
        lock(&self.commands).push(command);
        tracing::debug!(relay_id = %id, on, "virtual relay switched");
        Ok(())
    }
}

fn toggle(set: &Mutex<HashSet<RelayId>>, id: &RelayId, present: bool) {
    let mut set = lock(set);
    if present {
        set.insert(id.clone());
    } else {
        set.remove(id);
    }
}

impl RelayController for VirtualRelayBank {
    async fn set_on(&self, id: &RelayId) -> Result<(), CommandError> {
        self.apply(id, true, RelayCommand::On(id.clone()))
    }

    async fn set_off(&self, id: &RelayId) -> Result<(), CommandError> {
        self.apply(id, false, RelayCommand::Off(id.clone()))
    }

    async fn pulse(&self, id: &RelayId, duration: Duration) -> Result<(), CommandError> {
        self.apply(id, true, RelayCommand::Pulse(id.clone(), duration))?;
        tokio::time::sleep(duration).await;
        lock(&self.states).insert(id.clone(), false);
        Ok(())
    }

    async fn get_state(&self, id: &RelayId) -> Result<bool, CommandError> {
        if lock(&self.failing_queries).contains(id) {
            return Err(CommandError::Transport("simulated read failure".into()));
        }
        self.state(id).ok_or_else(|| CommandError::UnknownRelay {
            relay_id: id.to_string(),
        })
    }
}
