//! Rule — a threshold condition on one metric of one sample source.
//!
//! A [`Rule`] watches `field` of the samples published by `source` and fires
//! its [`Action`]s when `sample[field] <operator> threshold` becomes true.
//! The edge-triggered state lives in the application layer; this module only
//! holds the definition and the pure comparison.

mod action;
mod operator;

pub use action::{Action, IoState};
pub use operator::Operator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, RelayHubError, ValidationError};
use crate::id::RuleId;

/// Metric fields a rule may watch.
pub const KNOWN_FIELDS: [&str; 8] = [
    "volts",
    "amps",
    "watts",
    "temperature",
    "humidity",
    "sinr",
    "rsrp",
    "rsrq",
];

/// One reading from a sample source, keyed by metric field.
pub type Sample = BTreeMap<String, f64>;

/// A threshold rule with its ordered actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    /// Tag of the sample stream, e.g. `relay_1` or `environmental`.
    pub source: String,
    pub field: String,
    pub operator: Operator,
    pub threshold: f64,
    pub actions: Vec<Action>,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `source` is empty ([`ValidationError::MissingField`])
    /// - `field` is not one of [`KNOWN_FIELDS`] ([`ValidationError::UnknownField`])
    /// - `threshold` is NaN or infinite ([`ValidationError::NonFiniteThreshold`])
    /// - `actions` is empty ([`ValidationError::NoActions`])
    pub fn validate(&self) -> Result<(), RelayHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.source.trim().is_empty() {
            return Err(ValidationError::MissingField("source").into());
        }
        if !KNOWN_FIELDS.contains(&self.field.as_str()) {
            return Err(ValidationError::UnknownField(self.field.clone()).into());
        }
        if !self.threshold.is_finite() {
            return Err(ValidationError::NonFiniteThreshold.into());
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions.into());
        }
        Ok(())
    }

    /// Read the watched field out of a sample.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::MissingField`] when the sample lacks it.
    pub fn measure(&self, sample: &Sample) -> Result<f64, EvaluationError> {
        sample
            .get(&self.field)
            .copied()
            .ok_or_else(|| EvaluationError::MissingField {
                source_tag: self.source.clone(),
                field: self.field.clone(),
            })
    }

    /// Whether the rule's condition holds for `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::MissingField`] when the sample lacks the field.
    pub fn is_met(&self, sample: &Sample) -> Result<bool, EvaluationError> {
        self.measure(sample)
            .map(|value| self.operator.compare(value, self.threshold))
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.source, self.field, self.operator, self.threshold
        )
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    source: Option<String>,
    field: Option<String>,
    operator: Option<Operator>,
    threshold: Option<f64>,
    actions: Vec<Action>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RuleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// The id defaults to the name, the operator to `>` and the threshold to 0.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] if required fields are missing or invalid.
    pub fn build(self) -> Result<Rule, RelayHubError> {
        let name = self.name.unwrap_or_default();
        let rule = Rule {
            id: self.id.unwrap_or_else(|| RuleId::new(name.clone())),
            name,
            source: self.source.unwrap_or_default(),
            field: self.field.unwrap_or_default(),
            operator: self.operator.unwrap_or(Operator::Gt),
            threshold: self.threshold.unwrap_or_default(),
            actions: self.actions,
        };
        rule.validate()?;
        Ok(rule)
    }
}
