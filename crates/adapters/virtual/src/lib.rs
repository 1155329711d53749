//! # relayhub-adapter-virtual
//!
//! Virtual/demo adapter that stands in for relay hardware and sensors.
//!
//! ## Provided components
//!
//! | Component | Port | Behaviour |
//! |-----------|------|-----------|
//! | [`VirtualRelayBank`] | `RelayController` | In-memory relay states, failure injection, command log |
//! | [`VirtualSensor::power`] | `SampleSink` producer | `volts` / `amps` / `watts` for one relay |
//! | [`VirtualSensor::main_supply`] | `SampleSink` producer | `volts` / `amps` / `watts` on the `main` supply rail |
//! | [`VirtualSensor::environmental`] | `SampleSink` producer | `temperature` / `humidity` |
//!
//! ## Dependency rule
//!
//! Depends on `relayhub-app` (port traits) and `relayhub-domain` only.

mod relay_bank;
mod sensors;

pub use relay_bank::{RelayCommand, VirtualRelayBank};
pub use sensors::{ENVIRONMENTAL_SOURCE, MAIN_SOURCE, VirtualSensor, Waveform};
