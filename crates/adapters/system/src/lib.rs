//! # relayhub-adapter-system
//!
//! [`Rebooter`] implementation that runs an external command (by default
//! `sudo reboot`).
//!
//! ## Dependency rule
//!
//! Depends on `relayhub-app` (port traits) and `relayhub-domain` only.

use relayhub_app::ports::Rebooter;
use relayhub_domain::error::ActionError;
use serde::Deserialize;
use tokio::process::Command;

/// Command used to reboot the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            program: "sudo".to_string(),
            args: vec!["reboot".to_string()],
        }
    }
}

/// [`Rebooter`] that spawns [`RebootConfig::program`] and waits for it.
#[derive(Debug, Clone, Default)]
pub struct CommandRebooter {
    config: RebootConfig,
}

impl CommandRebooter {
    #[must_use]
    pub fn new(config: RebootConfig) -> Self {
        Self { config }
    }
}

impl Rebooter for CommandRebooter {
    async fn reboot(&self) -> Result<(), ActionError> {
        tracing::warn!(
            program = %self.config.program,
            args = ?self.config.args,
            "rebooting host"
        );

        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .output()
            .await
            .map_err(ActionError::RebootSpawn)?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ActionError::RebootFailed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}
