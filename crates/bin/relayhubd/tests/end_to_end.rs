//! End-to-end tests for the relayhub automation core.
//!
//! Each test wires the real engines (schedule runner, rule engine, action
//! dispatcher, relay gate) over the in-memory relay bank and virtual sensors,
//! with a hand-driven clock and a spy in place of the host reboot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use relayhub_adapter_virtual::{RelayCommand, VirtualRelayBank, VirtualSensor};
use relayhub_app::action_dispatcher::ActionDispatcher;
use relayhub_app::ports::{Clock, Rebooter};
use relayhub_app::relay_gate::RelayGate;
use relayhub_app::rule_engine::{RuleEngine, RuleTransition};
use relayhub_app::schedule_runner::ScheduleRunner;
use relayhub_app::shutdown;
use relayhub_domain::error::ActionError;
use relayhub_domain::id::{RelayId, RuleId};
use relayhub_domain::relay::RelayConfig;
use relayhub_domain::rule::{Action, IoState, Operator, Rule, Sample};
use relayhub_domain::schedule::{DayMask, RelaySchedule};
use relayhub_domain::time::TimeOfDay;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct ManualClock(Mutex<NaiveDateTime>);

impl ManualClock {
    fn at(now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct SpyRebooter {
    reboots: AtomicUsize,
}

impl Rebooter for SpyRebooter {
    async fn reboot(&self) -> Result<(), ActionError> {
        self.reboots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 3 June 2024 was a Monday.
fn monday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn pump() -> RelayConfig {
    RelayConfig::builder()
        .id("pump")
        .name("Pump")
        .schedule(RelaySchedule::new(
            TimeOfDay::new(8, 0).unwrap(),
            TimeOfDay::new(18, 0).unwrap(),
            DayMask::MONDAY,
        ))
        .build()
        .unwrap()
}

fn fan() -> RelayConfig {
    RelayConfig::builder()
        .id("fan")
        .pulse_time(Duration::from_secs(2))
        .build()
        .unwrap()
}

fn over_current() -> Rule {
    Rule::builder()
        .id("over_current")
        .name("Pump over current")
        .source("pump")
        .field("amps")
        .operator(Operator::Gt)
        .threshold(5.0)
        .action(Action::Io {
            target: RelayId::new("pump"),
            state: IoState::Off,
        })
        .action(Action::Log {
            message: "pump switched off".to_string(),
        })
        .build()
        .unwrap()
}

fn amps(value: f64) -> Sample {
    Sample::from([("amps".to_string(), value)])
}

type Bank = Arc<VirtualRelayBank>;
type Gate = Arc<RelayGate<Bank>>;

fn wire(
    relays: &[RelayConfig],
    rules: Vec<Rule>,
) -> (Bank, Gate, Arc<SpyRebooter>, RuleEngine<Gate, SpyRebooter>) {
    let bank = Arc::new(VirtualRelayBank::new(
        relays.iter().map(|relay| relay.id.clone()),
    ));
    let gate = Arc::new(RelayGate::new(Arc::clone(&bank)));
    let rebooter = Arc::new(SpyRebooter::default());
    let dispatcher = ActionDispatcher::new(Arc::clone(&gate), Arc::clone(&rebooter), relays);
    let engine = RuleEngine::new(rules, dispatcher);
    (bank, gate, rebooter, engine)
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_follow_schedule_over_a_day() {
    let relays = vec![pump(), fan()];
    let (bank, gate, _, _) = wire(&relays, Vec::new());
    let clock = ManualClock::at(monday(7, 59));
    let (_handle, signal) = shutdown::channel();
    let mut runner = ScheduleRunner::new(relays, gate, Arc::clone(&clock), signal);
    let pump_id = RelayId::new("pump");

    assert_eq!(runner.relays().len(), 1);

    runner.tick().await;
    assert_eq!(bank.state(&pump_id), Some(false));

    clock.set(monday(8, 0));
    runner.tick().await;
    assert_eq!(bank.state(&pump_id), Some(true));

    clock.set(monday(12, 0));
    runner.tick().await;

    clock.set(monday(18, 0));
    runner.tick().await;
    assert_eq!(bank.state(&pump_id), Some(false));

    assert_eq!(
        bank.commands(),
        vec![
            RelayCommand::On(pump_id.clone()),
            RelayCommand::Off(pump_id),
        ]
    );
}

#[tokio::test]
async fn should_leave_manual_override_in_place() {
    let relays = vec![pump()];
    let (bank, gate, _, _) = wire(&relays, Vec::new());
    let clock = ManualClock::at(monday(9, 0));
    let (_handle, signal) = shutdown::channel();
    let mut runner = ScheduleRunner::new(relays, gate, Arc::clone(&clock), signal);
    let pump_id = RelayId::new("pump");

    runner.tick().await;
    bank.set_observed(&pump_id, false);

    clock.set(monday(9, 1));
    let report = runner.tick().await;
    assert_eq!(report.commanded, 0);
    assert_eq!(bank.state(&pump_id), Some(false));

    clock.set(monday(18, 0));
    runner.tick().await;

    assert_eq!(bank.state(&pump_id), Some(false));
    assert_eq!(bank.commands(), vec![RelayCommand::On(pump_id.clone())]);
    assert_eq!(runner.last_commanded(&pump_id), Some(true));
}

#[tokio::test]
async fn should_retry_after_relay_fault_clears() {
    let relays = vec![pump()];
    let (bank, gate, _, _) = wire(&relays, Vec::new());
    let (_handle, signal) = shutdown::channel();
    let mut runner = ScheduleRunner::new(relays, gate, ManualClock::at(monday(9, 0)), signal);
    let pump_id = RelayId::new("pump");

    bank.fail_commands(&pump_id, true);
    let report = runner.tick().await;
    assert_eq!(report.failed, 1);
    assert_eq!(bank.state(&pump_id), Some(false));

    bank.fail_commands(&pump_id, false);
    let report = runner.tick().await;
    assert_eq!(report.commanded, 1);
    assert_eq!(bank.state(&pump_id), Some(true));
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_switch_relay_off_on_each_threshold_crossing() {
    let relays = vec![pump()];
    let (bank, _, _, engine) = wire(&relays, vec![over_current()]);
    let pump_id = RelayId::new("pump");
    let rule_id = RuleId::new("over_current");

    let mut transitions = Vec::new();
    for value in [3.0, 6.0, 6.5, 4.0, 7.0] {
        bank.set_observed(&pump_id, true);
        transitions.extend(engine.evaluate("pump", &amps(value)).await);
    }

    assert_eq!(
        transitions,
        vec![
            RuleTransition::Triggered(rule_id.clone()),
            RuleTransition::Cleared(rule_id.clone()),
            RuleTransition::Triggered(rule_id),
        ]
    );
    assert_eq!(
        bank.commands(),
        vec![
            RelayCommand::Off(pump_id.clone()),
            RelayCommand::Off(pump_id.clone()),
        ]
    );
    assert_eq!(bank.state(&pump_id), Some(false));
}

#[tokio::test(start_paused = true)]
async fn should_pulse_with_target_pulse_time() {
    let relays = vec![pump(), fan()];
    let rule = Rule::builder()
        .id("vent")
        .name("Vent on high current")
        .source("pump")
        .field("amps")
        .operator(Operator::Ge)
        .threshold(5.0)
        .action(Action::Io {
            target: RelayId::new("fan"),
            state: IoState::Pulse,
        })
        .build()
        .unwrap();
    let (bank, _, _, engine) = wire(&relays, vec![rule]);
    let fan_id = RelayId::new("fan");

    engine.evaluate("pump", &amps(5.0)).await;

    assert_eq!(
        bank.commands(),
        vec![RelayCommand::Pulse(fan_id.clone(), Duration::from_secs(2))]
    );
    assert_eq!(bank.state(&fan_id), Some(false));
}

#[tokio::test(start_paused = true)]
async fn should_reboot_after_delay() {
    let relays = vec![pump()];
    let rule = Rule::builder()
        .id("meltdown")
        .name("Meltdown")
        .source("pump")
        .field("amps")
        .threshold(20.0)
        .action(Action::Reboot)
        .build()
        .unwrap();
    let (_, _, rebooter, engine) = wire(&relays, vec![rule]);

    engine.evaluate("pump", &amps(25.0)).await;
    assert_eq!(rebooter.reboots.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(rebooter.reboots.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_run_until_shutdown_and_drain() {
    let relays = vec![pump()];
    let (bank, gate, _, engine) = wire(&relays, vec![over_current()]);
    let engine = Arc::new(engine);
    let (handle, signal) = shutdown::channel();
    let runner = ScheduleRunner::new(relays, gate, ManualClock::at(monday(9, 0)), signal)
        .with_interval(Duration::from_secs(60));

    let tasks = vec![
        ("schedule-runner".to_string(), tokio::spawn(runner.run())),
        (
            "sensor-pump".to_string(),
            VirtualSensor::power(&RelayId::new("pump")).spawn(
                Arc::clone(&engine),
                Duration::from_secs(5),
                handle.signal(),
            ),
        ),
    ];

    tokio::time::sleep(Duration::from_secs(90)).await;
    handle.shutdown();
    let aborted = shutdown::drain(tasks, Duration::from_secs(5)).await;

    assert_eq!(aborted, 0);
    assert!(
        bank.commands()
            .first()
            .is_some_and(|command| *command == RelayCommand::On(RelayId::new("pump")))
    );
}
