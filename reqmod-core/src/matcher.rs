//! Single-rule matching
//!
//! Pairs a condition verdict with the header payload the rule carries,
//! so later stages never have to look back inside the action to find
//! what a HEADERS or USERAGENT rule wants changed.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::rule::{HeaderModification, Rule, RuleAction};

/// Outcome of evaluating one rule against one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub is_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pair: Option<ModificationPair>,
}

/// Header edits carried by a matched rule, split by direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationPair {
    #[serde(default)]
    pub request: Vec<HeaderModification>,
    #[serde(default)]
    pub response: Vec<HeaderModification>,
}

impl MatchResult {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn applied(matched_pair: Option<ModificationPair>) -> Self {
        Self {
            is_applied: true,
            matched_pair,
        }
    }
}

/// Evaluate one rule against a request snapshot.
///
/// Header-bearing actions surface their modifications in the result;
/// every other action type matches with no pair attached.
pub fn match_rule(rule: &Rule, ctx: &RequestContext) -> MatchResult {
    if !rule.condition.matches(ctx) {
        return MatchResult::skipped();
    }

    let matched_pair = match &rule.action {
        RuleAction::Headers(config) => Some(ModificationPair {
            request: config.request.clone(),
            response: config.response.clone(),
        }),
        // A user agent override is a request-side Set in disguise
        RuleAction::UserAgent(spoof) => Some(ModificationPair {
            request: vec![HeaderModification::set("User-Agent", &spoof.user_agent)],
            response: Vec::new(),
        }),
        RuleAction::Redirect(_)
        | RuleAction::Replace(_)
        | RuleAction::QueryParam(_)
        | RuleAction::Cancel
        | RuleAction::Delay(_) => None,
    };

    MatchResult::applied(matched_pair)
}
