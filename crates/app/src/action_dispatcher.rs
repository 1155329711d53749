//! Action dispatcher — runs a triggered rule's actions in order.
//!
//! Each action is isolated: a failure is logged and recorded in the
//! [`DispatchReport`], and the remaining actions still execute.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use relayhub_domain::error::ActionError;
use relayhub_domain::id::{RelayId, RuleId};
use relayhub_domain::relay::{DEFAULT_PULSE_TIME, RelayConfig};
use relayhub_domain::rule::{Action, IoState, Rule, Sample};

use crate::ports::{Rebooter, RelayController};

/// Grace period between a reboot action and the actual reboot.
pub const DEFAULT_REBOOT_DELAY: Duration = Duration::from_secs(5);

/// Which rule fired, and on what data.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub rule_id: &'a RuleId,
    pub rule_name: &'a str,
    pub source: &'a str,
    pub sample: &'a Sample,
}

impl<'a> RuleContext<'a> {
    #[must_use]
    pub fn new(rule: &'a Rule, sample: &'a Sample) -> Self {
        Self {
            rule_id: &rule.id,
            rule_name: &rule.name,
            source: &rule.source,
            sample,
        }
    }
}

/// Outcome of one [`ActionDispatcher::dispatch`] call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Actions that completed (a reboot counts once it is scheduled).
    pub executed: usize,
    pub failures: Vec<ActionError>,
}

impl DispatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Executes [`Action`]s against the relay controller and the host.
pub struct ActionDispatcher<C, B> {
    controller: C,
    rebooter: Arc<B>,
    pulse_times: HashMap<RelayId, Duration>,
    reboot_delay: Duration,
}

impl<C, B> ActionDispatcher<C, B>
where
    C: RelayController,
    B: Rebooter + 'static,
{
    /// Create a dispatcher; `relays` provides the pulse length per target.
    pub fn new<'r>(
        controller: C,
        rebooter: Arc<B>,
        relays: impl IntoIterator<Item = &'r RelayConfig>,
    ) -> Self {
        Self {
            controller,
            rebooter,
            pulse_times: relays
                .into_iter()
                .map(|relay| (relay.id.clone(), relay.pulse_time))
                .collect(),
            reboot_delay: DEFAULT_REBOOT_DELAY,
        }
    }

    #[must_use]
    pub fn with_reboot_delay(mut self, delay: Duration) -> Self {
        self.reboot_delay = delay;
        self
    }

    /// Pulse length of `target`, or the default for relays not configured.
    #[must_use]
    pub fn pulse_time(&self, target: &RelayId) -> Duration {
        self.pulse_times
            .get(target)
            .copied()
            .unwrap_or(DEFAULT_PULSE_TIME)
    }

    /// Execute `actions` in order, isolating failures.
    pub async fn dispatch(&self, actions: &[Action], context: &RuleContext<'_>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for action in actions {
            match self.execute(action, context).await {
                Ok(()) => report.executed += 1,
                Err(err) => {
                    tracing::error!(
                        %err,
                        rule_id = %context.rule_id,
                        action = %action,
                        "rule action failed"
                    );
                    report.failures.push(err);
                }
            }
        }

        report
    }

    async fn execute(&self, action: &Action, context: &RuleContext<'_>) -> Result<(), ActionError> {
        match action {
            Action::Io { target, state } => {
                let result = match state {
                    IoState::On => self.controller.set_on(target).await,
                    IoState::Off => self.controller.set_off(target).await,
                    IoState::Pulse => {
                        self.controller
                            .pulse(target, self.pulse_time(target))
                            .await
                    }
                };
                result.map_err(|source| ActionError::Io {
                    relay_id: target.to_string(),
                    source,
                })?;
                tracing::info!(
                    rule_id = %context.rule_id,
                    relay_id = %target,
                    state = %state,
                    "rule drove relay"
                );
                Ok(())
            }
            Action::Log { message } => {
                tracing::info!(
                    rule_id = %context.rule_id,
                    rule_name = context.rule_name,
                    source = context.source,
                    sample = ?context.sample,
                    "{message}"
                );
                Ok(())
            }
            Action::Reboot => {
                self.schedule_reboot(context);
                Ok(())
            }
        }
    }

    fn schedule_reboot(&self, context: &RuleContext<'_>) {
        let rebooter = Arc::clone(&self.rebooter);
        let delay = self.reboot_delay;

        tracing::warn!(
            rule_id = %context.rule_id,
            delay_secs = delay.as_secs(),
            "rule requested a reboot"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = rebooter.reboot().await {
                tracing::error!(%err, "reboot failed");
            }
        });
    }
}
