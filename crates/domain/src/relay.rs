//! Relay — a controllable binary output and its weekly schedule.

use std::time::Duration;

use crate::error::{RelayHubError, ValidationError};
use crate::id::RelayId;
use crate::schedule::RelaySchedule;

/// Pulse length used when a relay does not configure one.
pub const DEFAULT_PULSE_TIME: Duration = Duration::from_secs(5);

/// Static configuration of one relay, immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub id: RelayId,
    pub name: String,
    pub enabled: bool,
    pub pulse_time: Duration,
    pub schedule: RelaySchedule,
}

impl RelayConfig {
    /// Create a builder for constructing a [`RelayConfig`].
    #[must_use]
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when:
    /// - `id` is empty ([`ValidationError::MissingField`])
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `pulse_time` is zero ([`ValidationError::NonPositivePulse`])
    pub fn validate(&self) -> Result<(), RelayHubError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id").into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.pulse_time.is_zero() {
            return Err(ValidationError::NonPositivePulse(0).into());
        }
        Ok(())
    }

    /// Whether the schedule runner should drive this relay.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.enabled && self.schedule.enabled
    }
}

/// Step-by-step builder for [`RelayConfig`].
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    id: Option<RelayId>,
    name: Option<String>,
    enabled: Option<bool>,
    pulse_time: Option<Duration>,
    schedule: Option<RelaySchedule>,
}

impl RelayConfigBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RelayId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn pulse_time(mut self, pulse_time: Duration) -> Self {
        self.pulse_time = Some(pulse_time);
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: RelaySchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Consume the builder, validate, and return a [`RelayConfig`].
    ///
    /// The name defaults to the id when not given.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] if required fields are missing or invalid.
    pub fn build(self) -> Result<RelayConfig, RelayHubError> {
        let id = self.id.unwrap_or_else(|| RelayId::new(""));
        let relay = RelayConfig {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            enabled: self.enabled.unwrap_or(true),
            pulse_time: self.pulse_time.unwrap_or(DEFAULT_PULSE_TIME),
            schedule: self.schedule.unwrap_or_default(),
        };
        relay.validate()?;
        Ok(relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DayMask;
    use crate::time::TimeOfDay;

    fn office_schedule() -> RelaySchedule {
        RelaySchedule::new(
            TimeOfDay::new(8, 0).unwrap(),
            TimeOfDay::new(18, 0).unwrap(),
            DayMask::WEEKDAYS,
        )
    }

    #[test]
    fn should_apply_defaults_when_only_id_given() {
        let relay = RelayConfig::builder().id("relay_1").build().unwrap();
        assert_eq!(relay.name, "relay_1");
        assert!(relay.enabled);
        assert_eq!(relay.pulse_time, DEFAULT_PULSE_TIME);
        assert!(!relay.schedule.enabled);
        assert!(!relay.is_scheduled());
    }

    #[test]
    fn should_be_scheduled_when_relay_and_schedule_enabled() {
        let relay = RelayConfig::builder()
            .id("relay_2")
            .name("Pump")
            .schedule(office_schedule())
            .build()
            .unwrap();
        assert!(relay.is_scheduled());
    }

    #[test]
    fn should_not_be_scheduled_when_relay_disabled() {
        let relay = RelayConfig::builder()
            .id("relay_2")
            .enabled(false)
            .schedule(office_schedule())
            .build()
            .unwrap();
        assert!(!relay.is_scheduled());
    }

    #[test]
    fn should_return_validation_error_when_id_missing() {
        let err = RelayConfig::builder().name("Pump").build().unwrap_err();
        assert!(matches!(
            err,
            RelayHubError::Validation(ValidationError::MissingField("id"))
        ));
    }

    #[test]
    fn should_return_validation_error_when_pulse_time_zero() {
        let err = RelayConfig::builder()
            .id("relay_1")
            .pulse_time(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RelayHubError::Validation(ValidationError::NonPositivePulse(0))
        ));
    }
}
