//! Action — a side-effect executed when a rule triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::RelayId;

/// Target state of an `io` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoState {
    On,
    Off,
    /// Energize for the target relay's `pulse_time`, then release.
    Pulse,
}

impl IoState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Pulse => "pulse",
        }
    }
}

impl fmt::Display for IoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IoState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "pulse" => Ok(Self::Pulse),
            _ => Err(ValidationError::UnknownIoState(s.to_string())),
        }
    }
}

/// One step of a rule's ordered action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Drive a relay.
    Io { target: RelayId, state: IoState },
    /// Emit a log record carrying the triggering sample.
    Log { message: String },
    /// Reboot the host after a grace delay.
    Reboot,
}

impl Action {
    /// Build an action from the loosely-typed fields of a config entry.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the type is unknown or a field the
    /// type requires is missing.
    pub fn from_fields(
        kind: &str,
        target: Option<&str>,
        state: Option<&str>,
        message: Option<&str>,
    ) -> Result<Self, ValidationError> {
        fn non_empty(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "io" => {
                let (Some(target), Some(state)) = (non_empty(target), non_empty(state)) else {
                    return Err(ValidationError::IncompleteIoAction);
                };
                Ok(Self::Io {
                    target: RelayId::new(target),
                    state: state.parse()?,
                })
            }
            "log" => non_empty(message)
                .map(|message| Self::Log {
                    message: message.to_string(),
                })
                .ok_or(ValidationError::MissingLogMessage),
            "reboot" => Ok(Self::Reboot),
            _ => Err(ValidationError::UnknownActionType(kind.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { target, state } => write!(f, "io({target}, {state})"),
            Self::Log { message } => write!(f, "log({message:?})"),
            Self::Reboot => f.write_str("reboot"),
        }
    }
}
