//! # relayhub-app
//!
//! Application layer — automation use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RelayController` — command relays and query their confirmed state
//!   - `Rebooter` — restart the host
//!   - `Clock` — local wall-clock time
//! - Define the **driving/inbound port** sample producers push into:
//!   - `SampleSink` — implemented by [`rule_engine::RuleEngine`]
//! - Provide the automation core:
//!   - [`schedule_runner::ScheduleRunner`] — periodic, debounced schedule enforcement
//!   - [`rule_engine::RuleEngine`] — edge-triggered threshold rules
//!   - [`action_dispatcher::ActionDispatcher`] — ordered, failure-isolated actions
//!   - [`relay_gate::RelayGate`] — per-relay command serialization and timeouts
//! - Provide cooperative shutdown primitives ([`shutdown`])
//!
//! ## Dependency rule
//! Depends on `relayhub-domain` only (plus `tokio` sync/time primitives).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action_dispatcher;
pub mod ports;
pub mod relay_gate;
pub mod rule_engine;
pub mod schedule_runner;
pub mod shutdown;
