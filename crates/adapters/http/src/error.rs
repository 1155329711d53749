//! HTTP adapter error types.

use relayhub_domain::error::CommandError;

/// Errors specific to the HTTP relay controller.
#[derive(Debug, thiserror::Error)]
pub enum HttpRelayError {
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or its reply could not be read.
    #[error("request for relay {relay_id} failed")]
    Request {
        relay_id: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success HTTP status.
    #[error("relay API answered {status} for relay {relay_id}")]
    Status { relay_id: String, status: u16 },

    /// The API answered but refused the command.
    #[error("relay API refused command for {relay_id}: {message}")]
    Rejected { relay_id: String, message: String },

    /// The state listing does not contain the relay.
    #[error("relay {relay_id} missing from state listing")]
    MissingRelay { relay_id: String },

    /// The state listing holds something other than 0/1 or a boolean.
    #[error("relay {relay_id} has unreadable state {value}")]
    InvalidState {
        relay_id: String,
        value: serde_json::Value,
    },
}

impl HttpRelayError {
    /// Convert into a [`CommandError`] for propagation across the port boundary.
    #[must_use]
    pub fn into_command(self) -> CommandError {
        match self {
            Self::Rejected { relay_id, message } => CommandError::Rejected { relay_id, message },
            Self::MissingRelay { relay_id } => CommandError::UnknownRelay { relay_id },
            other => CommandError::Transport(Box::new(other)),
        }
    }
}

impl From<HttpRelayError> for CommandError {
    fn from(err: HttpRelayError) -> Self {
        err.into_command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_rejection_to_rejected_command() {
        let err: CommandError = HttpRelayError::Rejected {
            relay_id: "relay_1".to_string(),
            message: "locked".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            CommandError::Rejected { relay_id, message } if relay_id == "relay_1" && message == "locked"
        ));
    }

    #[test]
    fn should_convert_missing_relay_to_unknown_relay() {
        let err: CommandError = HttpRelayError::MissingRelay {
            relay_id: "relay_5".to_string(),
        }
        .into();
        assert!(matches!(err, CommandError::UnknownRelay { .. }));
    }

    #[test]
    fn should_wrap_status_error_as_transport() {
        let err: CommandError = HttpRelayError::Status {
            relay_id: "relay_1".to_string(),
            status: 503,
        }
        .into();
        assert!(matches!(err, CommandError::Transport(_)));
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("relay API answered 503 for relay relay_1".to_string())
        );
    }
}
