//! Rule engine — edge-triggered threshold rules over streamed samples.
//!
//! Every rule carries a `triggered` flag. A sample that makes the condition
//! true while the flag is down raises it and dispatches the rule's actions;
//! a sample that makes it false while the flag is up lowers it ("cleared").
//! Everything else is a no-op, so one threshold crossing yields exactly one
//! dispatch.

use std::collections::HashMap;

use relayhub_domain::id::RuleId;
use relayhub_domain::rule::{Rule, Sample};
use tokio::sync::Mutex;

use crate::action_dispatcher::{ActionDispatcher, RuleContext};
use crate::ports::{Rebooter, RelayController, SampleSink};

/// A state change produced by [`RuleEngine::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTransition {
    Triggered(RuleId),
    Cleared(RuleId),
}

#[derive(Debug, Default)]
struct RuleState {
    triggered: bool,
}

struct RuleSlot {
    rule: Rule,
    // Held across the flip and the dispatch so one rule never interleaves.
    state: Mutex<RuleState>,
}

/// Evaluates samples against rules and dispatches actions on rising edges.
pub struct RuleEngine<C, B> {
    by_source: HashMap<String, Vec<RuleSlot>>,
    dispatcher: ActionDispatcher<C, B>,
}

impl<C, B> RuleEngine<C, B>
where
    C: RelayController,
    B: Rebooter + 'static,
{
    /// Index `rules` by source. All rules start cleared.
    pub fn new(rules: impl IntoIterator<Item = Rule>, dispatcher: ActionDispatcher<C, B>) -> Self {
        let mut by_source: HashMap<String, Vec<RuleSlot>> = HashMap::new();
        for rule in rules {
            by_source
                .entry(rule.source.clone())
                .or_default()
                .push(RuleSlot {
                    rule,
                    state: Mutex::new(RuleState::default()),
                });
        }
        Self {
            by_source,
            dispatcher,
        }
    }

    /// Number of rules loaded.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    /// Sources at least one rule listens to.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.by_source.keys().map(String::as_str)
    }

    /// Evaluate one sample from `source` against every rule watching it.
    ///
    /// Rules whose field is absent from the sample are skipped. Safe to call
    /// concurrently; evaluations of the same rule are serialized.
    #[tracing::instrument(skip(self, sample), fields(sample_len = sample.len()))]
    pub async fn evaluate(&self, source: &str, sample: &Sample) -> Vec<RuleTransition> {
        let Some(slots) = self.by_source.get(source) else {
            return Vec::new();
        };

        let mut transitions = Vec::new();
        for slot in slots {
            let rule = &slot.rule;
            let condition_met = match rule.is_met(sample) {
                Ok(met) => met,
                Err(err) => {
                    tracing::debug!(%err, rule_id = %rule.id, "rule skipped for sample");
                    continue;
                }
            };

            let mut state = slot.state.lock().await;
            match (state.triggered, condition_met) {
                (false, true) => {
                    state.triggered = true;
                    tracing::info!(rule_id = %rule.id, rule = %rule, "rule triggered");
                    let report = self
                        .dispatcher
                        .dispatch(&rule.actions, &RuleContext::new(rule, sample))
                        .await;
                    if !report.is_success() {
                        tracing::warn!(
                            rule_id = %rule.id,
                            failed = report.failures.len(),
                            executed = report.executed,
                            "rule actions partially failed"
                        );
                    }
                    transitions.push(RuleTransition::Triggered(rule.id.clone()));
                }
                (true, false) => {
                    state.triggered = false;
                    tracing::info!(rule_id = %rule.id, rule = %rule, "rule cleared");
                    transitions.push(RuleTransition::Cleared(rule.id.clone()));
                }
                _ => {}
            }
        }

        transitions
    }
}

impl<C, B> SampleSink for RuleEngine<C, B>
where
    C: RelayController,
    B: Rebooter + 'static,
{
    async fn ingest(&self, source: &str, sample: &Sample) {
        self.evaluate(source, sample).await;
    }
}
