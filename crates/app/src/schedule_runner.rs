//! Schedule runner — enforces relay schedules on a fixed tick.
//!
//! Each tick compares the state a relay *should* have with the state the
//! controller *reports*, and commands the relay only when they differ and the
//! desired state has not already been commanded. The last commanded state is
//! cached per relay so a command that succeeded but is not yet reflected by
//! the hardware is not repeated every tick. The cache only changes when a
//! command succeeds.

use std::collections::HashMap;
use std::time::Duration;

use relayhub_domain::id::RelayId;
use relayhub_domain::relay::RelayConfig;

use crate::ports::{Clock, RelayController};
use crate::shutdown::ShutdownSignal;

/// Time between two schedule evaluations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Counters describing one [`ScheduleRunner::tick`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Relays whose schedule was evaluated.
    pub evaluated: usize,
    /// Commands that succeeded.
    pub commanded: usize,
    /// Relays skipped because their state could not be read.
    pub skipped: usize,
    /// Commands that failed and will be retried next tick.
    pub failed: usize,
}

/// Periodic driver applying every scheduled relay's [`RelaySchedule`].
///
/// [`RelaySchedule`]: relayhub_domain::schedule::RelaySchedule
pub struct ScheduleRunner<C, K> {
    relays: Vec<RelayConfig>,
    controller: C,
    clock: K,
    interval: Duration,
    commanded: HashMap<RelayId, bool>,
    shutdown: ShutdownSignal,
}

impl<C, K> ScheduleRunner<C, K>
where
    C: RelayController,
    K: Clock,
{
    /// Create a runner for the relays that are enabled and have an enabled schedule.
    pub fn new(
        relays: impl IntoIterator<Item = RelayConfig>,
        controller: C,
        clock: K,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            relays: relays
                .into_iter()
                .filter(RelayConfig::is_scheduled)
                .collect(),
            controller,
            clock,
            interval: DEFAULT_INTERVAL,
            commanded: HashMap::new(),
            shutdown,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Relays this runner drives.
    #[must_use]
    pub fn relays(&self) -> &[RelayConfig] {
        &self.relays
    }

    /// Last state successfully commanded to `id`, if any.
    #[must_use]
    pub fn last_commanded(&self, id: &RelayId) -> Option<bool> {
        self.commanded.get(id).copied()
    }

    /// Evaluate every schedule once and issue the commands it calls for.
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        for relay in &self.relays {
            report.evaluated += 1;
            let desired = relay.schedule.should_be_on(now);

            let observed = match self.controller.get_state(&relay.id).await {
                Ok(observed) => observed,
                Err(err) => {
                    tracing::warn!(%err, relay_id = %relay.id, "relay state unknown, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            if desired == observed || self.commanded.get(&relay.id) == Some(&desired) {
                continue;
            }

            match self.controller.set_state(&relay.id, desired).await {
                Ok(()) => {
                    self.commanded.insert(relay.id.clone(), desired);
                    report.commanded += 1;
                    let next = relay.schedule.next_change(now);
                    tracing::info!(
                        relay_id = %relay.id,
                        relay_name = %relay.name,
                        on = desired,
                        next_change = ?next.map(|change| change.time),
                        "schedule drove relay"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        %err,
                        relay_id = %relay.id,
                        on = desired,
                        "schedule command failed, retrying next tick"
                    );
                }
            }
        }

        report
    }

    /// Tick immediately, then every interval, until shutdown is requested.
    pub async fn run(mut self) {
        tracing::info!(
            relays = self.relays.len(),
            interval_secs = self.interval.as_secs(),
            "schedule runner started"
        );

        let mut shutdown = self.shutdown.clone();
        while !shutdown.is_triggered() {
            let report = self.tick().await;
            tracing::debug!(?report, "schedule tick complete");

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = shutdown.triggered() => {}
            }
        }

        tracing::info!("schedule runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, NaiveDateTime};
    use relayhub_domain::error::CommandError;
    use relayhub_domain::schedule::{DayMask, RelaySchedule};
    use relayhub_domain::time::TimeOfDay;

    use super::*;
    use crate::shutdown;

    // ── Fake controller ────────────────────────────────────────────

    /// Relay bank whose reported state only changes when a test says so,
    /// modelling hardware that has not yet reflected a command.
    #[derive(Default)]
    struct FakeBank {
        observed: Mutex<HashMap<String, bool>>,
        unreadable: Mutex<HashSet<String>>,
        rejecting: Mutex<HashSet<String>>,
        commands: Mutex<Vec<(String, bool)>>,
        reflect: bool,
    }

    impl FakeBank {
        fn reflecting() -> Self {
            Self {
                reflect: true,
                ..Self::default()
            }
        }

        fn set_observed(&self, id: &str, on: bool) {
            self.observed.lock().unwrap().insert(id.to_string(), on);
        }

        fn commands(&self) -> Vec<(String, bool)> {
            self.commands.lock().unwrap().clone()
        }

        fn command(&self, id: &RelayId, on: bool) -> Result<(), CommandError> {
            if self.rejecting.lock().unwrap().contains(id.as_str()) {
                return Err(CommandError::Rejected {
                    relay_id: id.to_string(),
                    message: "busy".to_string(),
                });
            }
            self.commands.lock().unwrap().push((id.to_string(), on));
            if self.reflect {
                self.set_observed(id.as_str(), on);
            }
            Ok(())
        }
    }

    impl RelayController for FakeBank {
        async fn set_on(&self, id: &RelayId) -> Result<(), CommandError> {
            self.command(id, true)
        }

        async fn set_off(&self, id: &RelayId) -> Result<(), CommandError> {
            self.command(id, false)
        }

        async fn pulse(&self, id: &RelayId, _duration: Duration) -> Result<(), CommandError> {
            self.command(id, true)
        }

        async fn get_state(&self, id: &RelayId) -> Result<bool, CommandError> {
            if self.unreadable.lock().unwrap().contains(id.as_str()) {
                return Err(CommandError::UnknownRelay {
                    relay_id: id.to_string(),
                });
            }
            Ok(self
                .observed
                .lock()
                .unwrap()
                .get(id.as_str())
                .copied()
                .unwrap_or(false))
        }
    }

    // ── Fixed clock ────────────────────────────────────────────────

    struct FixedClock(Mutex<NaiveDateTime>);

    impl FixedClock {
        fn at(now: NaiveDateTime) -> Self {
            Self(Mutex::new(now))
        }

        fn set(&self, now: NaiveDateTime) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn office_relay(id: &str) -> RelayConfig {
        RelayConfig::builder()
            .id(id)
            .schedule(RelaySchedule::new(
                TimeOfDay::new(8, 0).unwrap(),
                TimeOfDay::new(18, 0).unwrap(),
                DayMask::MONDAY,
            ))
            .build()
            .unwrap()
    }

    type TestRunner = ScheduleRunner<Arc<FakeBank>, Arc<FixedClock>>;

    fn runner(
        relays: Vec<RelayConfig>,
        bank: &Arc<FakeBank>,
        clock: &Arc<FixedClock>,
    ) -> (TestRunner, shutdown::ShutdownHandle) {
        let (handle, signal) = shutdown::channel();
        let runner = ScheduleRunner::new(relays, Arc::clone(bank), Arc::clone(clock), signal);
        (runner, handle)
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_command_relay_when_schedule_turns_on() {
        let bank = Arc::new(FakeBank::reflecting());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        let report = runner.tick().await;

        assert_eq!(report.evaluated, 1);
        assert_eq!(report.commanded, 1);
        assert_eq!(bank.commands(), vec![("relay_1".to_string(), true)]);
        assert_eq!(runner.last_commanded(&RelayId::new("relay_1")), Some(true));
    }

    #[tokio::test]
    async fn should_be_idempotent_when_nothing_changes() {
        let bank = Arc::new(FakeBank::reflecting());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        runner.tick().await;
        let second = runner.tick().await;

        assert_eq!(second.commanded, 0);
        assert_eq!(bank.commands().len(), 1);
    }

    #[tokio::test]
    async fn should_not_repeat_command_not_yet_reflected_by_hardware() {
        let bank = Arc::new(FakeBank::default());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        runner.tick().await;
        clock.set(monday(9, 1));
        runner.tick().await;
        clock.set(monday(9, 2));
        runner.tick().await;

        assert_eq!(bank.commands(), vec![("relay_1".to_string(), true)]);
    }

    #[tokio::test]
    async fn should_command_again_once_desired_state_changes() {
        let bank = Arc::new(FakeBank::default());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        runner.tick().await;
        bank.set_observed("relay_1", true);
        clock.set(monday(18, 0));
        runner.tick().await;

        assert_eq!(
            bank.commands(),
            vec![
                ("relay_1".to_string(), true),
                ("relay_1".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn should_stay_silent_after_off_period_while_last_command_was_on() {
        let bank = Arc::new(FakeBank::default());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        // Commanded on, but the relay never reports on.
        runner.tick().await;
        // Off period: desired matches observed, nothing is sent.
        clock.set(monday(19, 0));
        let off = runner.tick().await;
        assert_eq!(off.commanded, 0);
        assert_eq!(runner.last_commanded(&RelayId::new("relay_1")), Some(true));
        // Next window: "on" is still the last command, so it is not repeated.
        clock.set(
            NaiveDate::from_ymd_opt(2024, 6, 10)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        );
        runner.tick().await;

        assert_eq!(bank.commands(), vec![("relay_1".to_string(), true)]);
    }

    #[tokio::test]
    async fn should_keep_cache_untouched_when_no_command_is_sent() {
        let bank = Arc::new(FakeBank::reflecting());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        runner.tick().await;
        bank.set_observed("relay_1", false);
        clock.set(monday(19, 0));
        runner.tick().await;

        assert_eq!(runner.last_commanded(&RelayId::new("relay_1")), Some(true));
        assert_eq!(bank.commands().len(), 1);
    }

    #[tokio::test]
    async fn should_skip_relay_with_unknown_state() {
        let bank = Arc::new(FakeBank::reflecting());
        bank.unreadable.lock().unwrap().insert("relay_1".to_string());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(
            vec![office_relay("relay_1"), office_relay("relay_2")],
            &bank,
            &clock,
        );

        let report = runner.tick().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.commanded, 1);
        assert_eq!(bank.commands(), vec![("relay_2".to_string(), true)]);
    }

    #[tokio::test]
    async fn should_retry_failed_command_next_tick() {
        let bank = Arc::new(FakeBank::reflecting());
        bank.rejecting.lock().unwrap().insert("relay_1".to_string());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (mut runner, _handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        let first = runner.tick().await;
        assert_eq!(first.failed, 1);
        assert_eq!(runner.last_commanded(&RelayId::new("relay_1")), None);

        bank.rejecting.lock().unwrap().clear();
        let second = runner.tick().await;
        assert_eq!(second.commanded, 1);
    }

    #[tokio::test]
    async fn should_ignore_relays_without_enabled_schedule() {
        let bank = Arc::new(FakeBank::reflecting());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let unscheduled = RelayConfig::builder().id("relay_3").build().unwrap();
        let disabled = RelayConfig {
            enabled: false,
            ..office_relay("relay_4")
        };
        let (mut runner, _handle) = runner(vec![unscheduled, disabled], &bank, &clock);

        assert!(runner.relays().is_empty());
        assert_eq!(runner.tick().await, TickReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_run_loop_on_shutdown() {
        let bank = Arc::new(FakeBank::reflecting());
        let clock = Arc::new(FixedClock::at(monday(9, 0)));
        let (runner, handle) = runner(vec![office_relay("relay_1")], &bank, &clock);

        let task = tokio::spawn(runner.with_interval(Duration::from_secs(60)).run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown();
        task.await.unwrap();

        assert_eq!(bank.commands(), vec![("relay_1".to_string(), true)]);
    }
}
