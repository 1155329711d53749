//! # relayhub-domain
//!
//! Pure domain model for the relayhub appliance-automation daemon.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, wall-clock time
//! - Define **Relays** (controllable binary outputs) and their weekly **Schedules**
//! - Define **Day masks** (which weekdays a schedule is active on)
//! - Define **Rules** (source, field, comparator, threshold) and their **Actions**
//! - Contain all invariant enforcement and pure decision logic
//!   (`should_be_on`, next schedule change, threshold comparison)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod relay;
pub mod rule;
pub mod schedule;
