//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `relayhub.toml` in the working directory, or at the path named
//! by `RELAYHUB_CONFIG`. Every daemon setting has a default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! Relays and rules are kept loosely typed until [`Config::automation`]
//! turns them into domain values: a malformed entry is reported and dropped
//! without taking the rest of the configuration down with it.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use relayhub_adapter_http::HttpRelayConfig;
use relayhub_adapter_system::RebootConfig;
use relayhub_domain::error::{RelayHubError, ValidationError};
use relayhub_domain::id::RuleId;
use relayhub_domain::relay::RelayConfig;
use relayhub_domain::rule::{Action, Operator, Rule};
use relayhub_domain::schedule::{DayMask, RelaySchedule};
use relayhub_domain::time::TimeOfDay;
use serde::Deserialize;

const DEFAULT_PATH: &str = "relayhub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing of the automation core.
    pub daemon: DaemonConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Which relay controller to drive.
    pub controller: ControllerConfig,
    /// Command run by `reboot` actions.
    pub reboot: RebootConfig,
    /// Metric producers.
    pub sensors: SensorsConfig,
    pub relays: Vec<RelayEntry>,
    /// Rules keyed by id.
    pub rules: BTreeMap<String, RuleEntry>,
}

/// Timing of the automation core, in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub schedule_interval_secs: u64,
    /// Upper bound for a single relay controller call.
    pub command_timeout_secs: u64,
    /// How long in-flight tasks get to finish once shutdown starts.
    pub shutdown_grace_secs: u64,
    /// Delay between a `reboot` action and the actual reboot.
    pub reboot_delay_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    /// In-memory relay bank, for demos and bench setups.
    #[default]
    Virtual,
    /// Local relay REST API.
    Http,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kind: ControllerKind,
    /// Only read when `kind = "http"`.
    pub http: HttpRelayConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// Run the virtual power and environmental sensors.
    pub virtual_enabled: bool,
    pub interval_secs: u64,
}

/// One `[[relays]]` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Pulse length in seconds.
    #[serde(default)]
    pub pulse_time: Option<i64>,
    #[serde(default)]
    pub schedule: Option<ScheduleEntry>,
}

/// `schedule = false` or a schedule table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScheduleEntry {
    Flag(bool),
    Table(ScheduleTable),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleTable {
    /// Off unless set, like an absent schedule.
    #[serde(default)]
    pub enabled: bool,
    /// `HH:MM`.
    #[serde(default)]
    pub on_time: Option<String>,
    /// `HH:MM`, exclusive.
    #[serde(default)]
    pub off_time: Option<String>,
    /// Sunday = 2, Monday = 4 … Saturday = 128.
    #[serde(default)]
    pub days_mask: Option<i64>,
    /// Day names, merged with `days_mask`.
    #[serde(default)]
    pub days: Vec<String>,
}

/// One `[rules.<id>]` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub source: String,
    pub field: String,
    /// One of `>`, `<`, `>=`, `<=`, `==`, `!=`; defaults to `>`.
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default, alias = "threshold")]
    pub value: Option<f64>,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Validated relays and rules, ready to be handed to the engines.
#[derive(Debug, Default)]
pub struct Automation {
    pub relays: Vec<RelayConfig>,
    pub rules: BTreeMap<RuleId, Rule>,
}

fn enabled_by_default() -> bool {
    true
}

impl Config {
    /// Load configuration from `relayhub.toml` (or `RELAYHUB_CONFIG`) then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, if an explicitly named
    /// file cannot be read, or if a daemon setting is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RELAYHUB_CONFIG") {
            Ok(path) => Self::from_path(Path::new(&path))?,
            Err(_) => Self::from_file(DEFAULT_PATH)?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RELAYHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RELAYHUB_API_URL") {
            self.controller.http.base_url = val;
        }
        if let Ok(val) = std::env::var("RELAYHUB_API_KEY") {
            self.controller.http.api_key = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.schedule_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "daemon.schedule_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.daemon.command_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "daemon.command_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.sensors.virtual_enabled && self.sensors.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sensors.interval_secs must be non-zero".to_string(),
            ));
        }
        if self.controller.kind == ControllerKind::Http
            && self.controller.http.base_url.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "controller.http.base_url must be set".to_string(),
            ));
        }
        if self.reboot.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "reboot.program must be set".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.daemon.schedule_interval_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.command_timeout_secs)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.daemon.shutdown_grace_secs)
    }

    #[must_use]
    pub fn reboot_delay(&self) -> Duration {
        Duration::from_secs(self.daemon.reboot_delay_secs)
    }

    #[must_use]
    pub fn sensor_interval(&self) -> Duration {
        Duration::from_secs(self.sensors.interval_secs)
    }

    /// Convert the relay and rule entries into domain values.
    ///
    /// Invalid entries are left out and reported in the returned error list;
    /// the first relay wins when an id appears twice.
    #[must_use]
    pub fn automation(&self) -> (Automation, Vec<ConfigError>) {
        let mut automation = Automation::default();
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for entry in &self.relays {
            match entry.to_relay() {
                Ok(relay) if !seen.insert(relay.id.clone()) => {
                    errors.push(ConfigError::DuplicateRelay(relay.id.to_string()));
                }
                Ok(relay) => automation.relays.push(relay),
                Err(source) => errors.push(ConfigError::Relay {
                    id: entry.id.clone(),
                    source,
                }),
            }
        }

        for (id, entry) in &self.rules {
            match entry.to_rule(id) {
                Ok(rule) => {
                    automation.rules.insert(rule.id.clone(), rule);
                }
                Err(source) => errors.push(ConfigError::Rule {
                    id: id.clone(),
                    source,
                }),
            }
        }

        (automation, errors)
    }
}

impl RelayEntry {
    fn to_relay(&self) -> Result<RelayConfig, RelayHubError> {
        let mut builder = RelayConfig::builder()
            .id(self.id.trim())
            .enabled(self.enabled);
        if let Some(name) = &self.name {
            builder = builder.name(name.as_str());
        }
        if let Some(secs) = self.pulse_time {
            let secs = u64::try_from(secs)
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ValidationError::NonPositivePulse(secs))?;
            builder = builder.pulse_time(Duration::from_secs(secs));
        }
        if let Some(schedule) = &self.schedule {
            builder = builder.schedule(schedule.to_schedule()?);
        }
        builder.build()
    }
}

impl ScheduleEntry {
    fn to_schedule(&self) -> Result<RelaySchedule, ValidationError> {
        match self {
            Self::Flag(false) => Ok(RelaySchedule::disabled()),
            Self::Flag(true) => Err(ValidationError::BareScheduleFlag),
            Self::Table(table) => table.to_schedule(),
        }
    }
}

impl ScheduleTable {
    fn to_schedule(&self) -> Result<RelaySchedule, ValidationError> {
        let mut days_mask = self
            .days_mask
            .map(DayMask::from_bits)
            .transpose()?
            .unwrap_or(DayMask::NONE);
        if !self.days.is_empty() {
            days_mask |= DayMask::from_names(&self.days)?;
        }

        Ok(RelaySchedule {
            enabled: self.enabled,
            on_time: parse_time(self.on_time.as_deref())?,
            off_time: parse_time(self.off_time.as_deref())?,
            days_mask,
        })
    }
}

fn parse_time(value: Option<&str>) -> Result<Option<TimeOfDay>, ValidationError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .transpose()
}

impl RuleEntry {
    fn to_rule(&self, id: &str) -> Result<Rule, RelayHubError> {
        let operator = match self.operator.as_deref() {
            Some(symbol) => symbol.parse::<Operator>()?,
            None => Operator::Gt,
        };
        let threshold = self.value.ok_or(ValidationError::MissingField("value"))?;
        let actions = self
            .actions
            .iter()
            .map(ActionEntry::to_action)
            .collect::<Result<Vec<_>, _>>()?;

        Rule::builder()
            .id(id)
            .name(self.name.as_deref().unwrap_or(id))
            .source(self.source.trim())
            .field(self.field.trim())
            .operator(operator)
            .threshold(threshold)
            .actions(actions)
            .build()
    }
}

impl ActionEntry {
    fn to_action(&self) -> Result<Action, ValidationError> {
        Action::from_fields(
            &self.kind,
            self.target.as_deref(),
            self.state.as_deref(),
            self.message.as_deref(),
        )
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            schedule_interval_secs: 60,
            command_timeout_secs: 10,
            shutdown_grace_secs: 5,
            reboot_delay_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "relayhubd=info,relayhub=info".to_string(),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            interval_secs: 5,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A relay entry was rejected.
    #[error("relay {id:?} ignored")]
    Relay {
        id: String,
        #[source]
        source: RelayHubError,
    },
    #[error("relay {0:?} is declared more than once")]
    DuplicateRelay(String),
    /// A rule entry was rejected.
    #[error("rule {id:?} ignored")]
    Rule {
        id: String,
        #[source]
        source: RelayHubError,
    },
}
