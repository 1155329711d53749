//! # relayhubd — relayhub daemon
//!
//! Composition root that wires the automation core to its adapters and runs
//! it until the process is asked to stop.
//!
//! ## Responsibilities
//! - Load configuration (`relayhub.toml`, env vars) and initialise logging
//! - Turn relay and rule entries into domain values, reporting rejected ones
//! - Construct the relay controller (virtual bank or HTTP API) behind a
//!   [`RelayGate`], the reboot command and the engines
//! - Spawn the schedule runner and the virtual sensors
//! - Handle graceful shutdown (SIGTERM/SIGINT) with a bounded drain
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use relayhub_adapter_http::HttpRelayController;
use relayhub_adapter_system::CommandRebooter;
use relayhub_adapter_virtual::{VirtualRelayBank, VirtualSensor};
use relayhub_app::action_dispatcher::ActionDispatcher;
use relayhub_app::ports::{RelayController, SystemClock};
use relayhub_app::relay_gate::RelayGate;
use relayhub_app::rule_engine::RuleEngine;
use relayhub_app::schedule_runner::ScheduleRunner;
use relayhub_app::shutdown;
use relayhub_domain::relay::RelayConfig;
use tracing_subscriber::EnvFilter;

use crate::config::{Automation, Config, ControllerKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_target(true)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relayhubd starting");

    let (automation, rejected) = config.automation();
    for err in rejected {
        let message = format!("{:#}", anyhow::Error::from(err));
        tracing::warn!(error = %message, "configuration entry dropped");
    }
    tracing::info!(
        relays = automation.relays.len(),
        rules = automation.rules.len(),
        "configuration loaded"
    );

    match config.controller.kind {
        ControllerKind::Virtual => {
            let bank = VirtualRelayBank::new(automation.relays.iter().map(|relay| relay.id.clone()));
            run(&config, automation, bank).await
        }
        ControllerKind::Http => {
            let controller = HttpRelayController::new(&config.controller.http)
                .context("failed to build relay API client")?;
            tracing::info!(base_url = %config.controller.http.base_url, "using relay API");
            run(&config, automation, controller).await
        }
    }
}

async fn run<C>(config: &Config, automation: Automation, controller: C) -> anyhow::Result<()>
where
    C: RelayController + 'static,
{
    let gate = Arc::new(RelayGate::with_timeout(controller, config.command_timeout()));
    let rebooter = Arc::new(CommandRebooter::new(config.reboot.clone()));

    let dispatcher = ActionDispatcher::new(Arc::clone(&gate), rebooter, &automation.relays)
        .with_reboot_delay(config.reboot_delay());
    let engine = Arc::new(RuleEngine::new(automation.rules.into_values(), dispatcher));
    tracing::debug!(rules = engine.rule_count(), "rule engine ready");

    let (handle, signal) = shutdown::channel();
    let runner = ScheduleRunner::new(automation.relays.clone(), Arc::clone(&gate), SystemClock, signal)
        .with_interval(config.schedule_interval());
    log_next_changes(runner.relays());

    let mut tasks = vec![("schedule-runner".to_string(), tokio::spawn(runner.run()))];

    if config.sensors.virtual_enabled {
        let sensors: Vec<VirtualSensor> = automation
            .relays
            .iter()
            .map(|relay| VirtualSensor::power(&relay.id))
            .chain([VirtualSensor::main_supply(), VirtualSensor::environmental()])
            .collect();
        for source in engine.sources() {
            if !sensors.iter().any(|sensor| sensor.source() == source) {
                tracing::warn!(source, "rules listen to a source no sensor publishes");
            }
        }
        for sensor in sensors {
            let name = format!("sensor-{}", sensor.source());
            let task = sensor.spawn(Arc::clone(&engine), config.sensor_interval(), handle.signal());
            tasks.push((name, task));
        }
    }

    tracing::info!(tasks = tasks.len(), "relayhubd running");

    wait_for_signal()
        .await
        .context("failed to listen for shutdown signals")?;

    tracing::info!(grace_secs = config.shutdown_grace().as_secs(), "shutting down");
    handle.shutdown();
    let aborted = shutdown::drain(tasks, config.shutdown_grace()).await;
    if aborted > 0 {
        tracing::warn!(aborted, "tasks did not stop within the grace period");
    }

    tracing::info!("relayhubd stopped");
    Ok(())
}

fn log_next_changes(relays: &[RelayConfig]) {
    let now = relayhub_domain::time::now_local();
    for relay in relays {
        match relay.schedule.next_change(now) {
            Some(change) => tracing::info!(
                relay_id = %relay.id,
                relay = %relay.name,
                at = %change.time,
                new_state = change.new_state,
                days_away = change.days_away,
                "next schedule change"
            ),
            None => tracing::info!(
                relay_id = %relay.id,
                relay = %relay.name,
                "schedule never changes state"
            ),
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT");
            result
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
