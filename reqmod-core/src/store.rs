//! Rule storage seam
//!
//! The engine never owns rule persistence. It asks a [`RuleStore`] for
//! the currently enabled set at the start of each pass and treats the
//! answer as a snapshot.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::rule::Rule;
use crate::Result;

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Enabled rules only; disabled rules are invisible to the engine
    async fn get_enabled_rules(&self) -> Result<Vec<Rule>>;
}

#[derive(Debug, Clone)]
struct StoredRule {
    rule: Rule,
    enabled: bool,
}

/// In-memory store keyed by rule id.
///
/// Backs the standalone evaluator and the tests; server deployments use
/// a database-backed implementation of the same trait.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: DashMap<i64, StoredRule>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a rule, enabled
    pub fn upsert(&self, rule: Rule) {
        self.rules.insert(
            rule.id,
            StoredRule {
                rule,
                enabled: true,
            },
        );
    }

    /// Returns false when no rule has this id
    pub fn set_enabled(&self, id: i64, enabled: bool) -> bool {
        match self.rules.get_mut(&id) {
            Some(mut stored) => {
                stored.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: i64) -> bool {
        self.rules.remove(&id).is_some()
    }

    /// Swap the whole set, as a sync from a rule server does
    pub fn replace_all(&self, rules: Vec<Rule>) {
        self.rules.clear();
        for rule in rules {
            self.upsert(rule);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn get_enabled_rules(&self) -> Result<Vec<Rule>> {
        Ok(self
            .rules
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.rule.clone())
            .collect())
    }
}
