//! Conflict resolution
//!
//! Orders matched rules into the deterministic effect sequence a pass
//! will execute. Every applicable rule survives into the output; CANCEL
//! is the only action that cuts the sequence short.

use serde::{Deserialize, Serialize};

use crate::context::{Phase, RequestContext};
use crate::matcher::MatchResult;
use crate::rule::{Rule, RuleAction};

/// Which header direction an effect acts on, when it acts on one at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// A rule together with its match outcome, ready for ordering
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: Rule,
    pub result: MatchResult,
}

/// One concrete instruction for the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEffect {
    pub rule: Rule,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    pub is_top_level_or_prerender: bool,
}

impl ResolvedEffect {
    pub fn is_cancel(&self) -> bool {
        matches!(self.rule.action, RuleAction::Cancel)
    }
}

/// Whether an action type has any business running in a phase.
///
/// Exhaustive on purpose: adding an action variant without deciding its
/// phases must not compile.
pub fn phase_eligible(action: &RuleAction, phase: Phase) -> bool {
    match action {
        RuleAction::Redirect(_)
        | RuleAction::Replace(_)
        | RuleAction::QueryParam(_)
        | RuleAction::Cancel
        | RuleAction::Delay(_) => phase == Phase::PreSend,
        RuleAction::Headers(_) => {
            phase == Phase::PreHeaderSend || phase == Phase::PostHeaderReceive
        }
        RuleAction::UserAgent(_) => phase == Phase::PreHeaderSend,
    }
}

/// Order matches and emit the effect sequence for one pass.
///
/// Descending priority, ascending id on ties. Matches that carry no
/// actionable payload for this phase (a HEADERS rule with an empty
/// direction) drop out instead of producing empty instructions.
pub fn resolve(phase: Phase, ctx: &RequestContext, mut matches: Vec<RuleMatch>) -> Vec<ResolvedEffect> {
    matches.sort_by(|a, b| {
        b.rule
            .priority
            .cmp(&a.rule.priority)
            .then(a.rule.id.cmp(&b.rule.id))
    });

    let is_top_level_or_prerender = ctx.is_top_level_or_prerender();
    let mut effects = Vec::new();

    for m in matches {
        if !m.result.is_applied {
            continue;
        }

        let direction = match phase {
            Phase::PreSend => None,
            Phase::PreHeaderSend => {
                let has_request_mods = m
                    .result
                    .matched_pair
                    .as_ref()
                    .map_or(false, |p| !p.request.is_empty());
                if !has_request_mods {
                    continue;
                }
                Some(Direction::Request)
            }
            Phase::PostHeaderReceive => {
                let has_response_mods = m
                    .result
                    .matched_pair
                    .as_ref()
                    .map_or(false, |p| !p.response.is_empty());
                if !has_response_mods {
                    continue;
                }
                Some(Direction::Response)
            }
        };

        let cancel = matches!(m.rule.action, RuleAction::Cancel);
        effects.push(ResolvedEffect {
            rule: m.rule,
            phase,
            direction,
            is_top_level_or_prerender,
        });

        // Nothing after a cancel runs in this pass
        if cancel {
            break;
        }
    }

    effects
}
