//! Common error types used across the workspace.
//!
//! Each concern owns a typed error; [`RelayHubError`] aggregates them through
//! `#[from]` so callers can propagate with `?` and still match on the cause.

use std::time::Duration;

/// Top-level error for relayhub operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("relay command failed")]
    Command(#[from] CommandError),

    #[error("rule evaluation failed")]
    Evaluation(#[from] EvaluationError),

    #[error("action failed")]
    Action(#[from] ActionError),
}

/// A configured relay, schedule, rule or action breaks a domain invariant.
///
/// Raised at load time; fatal to the offending entity only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),

    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("days_mask {0} is not a combination of day bits (0..=254)")]
    InvalidDaysMask(i64),

    #[error("unknown day name {0:?}")]
    UnknownDay(String),

    #[error("`schedule = true` needs a schedule table with times and days")]
    BareScheduleFlag,

    #[error("pulse_time must be positive, got {0}")]
    NonPositivePulse(i64),

    #[error("unknown operator {0:?}, expected one of >, <, >=, <=, ==, !=")]
    UnknownOperator(String),

    #[error("unknown metric field {0:?}")]
    UnknownField(String),

    #[error("threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("rule must have at least one action")]
    NoActions,

    #[error("unknown action type {0:?}, expected io, log or reboot")]
    UnknownActionType(String),

    #[error("io actions require `target` and `state`")]
    IncompleteIoAction,

    #[error("unknown io state {0:?}, expected on, off or pulse")]
    UnknownIoState(String),

    #[error("log actions require a `message`")]
    MissingLogMessage,
}

/// A call across the relay controller boundary failed.
///
/// Logged and retried on the next scheduler tick; never escalated.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("relay {relay_id} is unknown to the controller")]
    UnknownRelay { relay_id: String },

    #[error("relay {relay_id} rejected the command: {message}")]
    Rejected { relay_id: String, message: String },

    #[error("relay {relay_id} did not answer within {timeout:?}")]
    Timeout { relay_id: String, timeout: Duration },

    #[error("relay controller transport failure")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A rule could not be evaluated against a sample.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("sample from {source_tag} has no field {field:?}")]
    MissingField { source_tag: String, field: String },
}

/// One action of a rule dispatch failed. Remaining actions still run.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("io action on relay {relay_id} failed")]
    Io {
        relay_id: String,
        #[source]
        source: CommandError,
    },

    #[error("reboot command could not be started")]
    RebootSpawn(#[source] std::io::Error),

    #[error("reboot command exited unsuccessfully: {0}")]
    RebootFailed(String),
}
