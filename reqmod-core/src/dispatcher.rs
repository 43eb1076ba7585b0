//! Pass dispatch
//!
//! One parameterized entry point drives all three phases. A pass never
//! returns an error: anything that goes wrong is folded into the report
//! status so the caller always knows what happened to the request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blocklist::BlockList;
use crate::config::{DispatchConfig, FailurePolicy};
use crate::context::{DocumentLifecycle, Phase, RequestContext};
use crate::executor::Executor;
use crate::matcher::match_rule;
use crate::resolver::{phase_eligible, resolve, ResolvedEffect, RuleMatch};
use crate::store::RuleStore;
use crate::Result;

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// At least one effect was emitted
    Applied,
    /// Eligible rules existed but none applied
    NoMatch,
    /// The request is outside the engine's jurisdiction
    NotApplicable,
    /// A block list entry vetoed the request
    Blocked,
    /// A collaborator failed and the policy is fail-closed
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub status: PassStatus,
    pub effects: Vec<ResolvedEffect>,
}

impl PassReport {
    fn empty(status: PassStatus) -> Self {
        Self {
            status,
            effects: Vec::new(),
        }
    }

    /// True when the effect sequence ends the request
    pub fn cancelled(&self) -> bool {
        self.effects.iter().any(|e| e.is_cancel())
    }
}

/// Drives match, resolve and execute for a single phase.
///
/// Holds no per-request state; the same dispatcher serves every phase of
/// every request concurrently.
pub struct Dispatcher {
    store: Arc<dyn RuleStore>,
    block_list: Arc<dyn BlockList>,
    executor: Arc<dyn Executor>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RuleStore>,
        block_list: Arc<dyn BlockList>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            store,
            block_list,
            executor,
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one phase against one request snapshot
    pub async fn run_pass(&self, phase: Phase, ctx: &RequestContext) -> PassReport {
        if ctx.initiator.is_empty() || ctx.url.is_empty() {
            return PassReport::empty(PassStatus::NotApplicable);
        }

        if phase == Phase::PreSend
            && self.config.honor_document_lifecycle
            && !lifecycle_admits(ctx.document_lifecycle)
        {
            debug!("Skipping {} for inactive document: {}", phase, ctx.url);
            return PassReport::empty(PassStatus::NotApplicable);
        }

        match self.vetoed(ctx).await {
            Ok(true) => {
                debug!("Request blocked from evaluation: {}", ctx.url);
                return PassReport::empty(PassStatus::Blocked);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Block list lookup failed: {}", e);
                if self.config.failure_policy == FailurePolicy::FailClosed {
                    return PassReport::empty(PassStatus::Aborted);
                }
            }
        }

        let rules = match self.store.get_enabled_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Rule store unavailable: {}", e);
                match self.config.failure_policy {
                    FailurePolicy::FailClosed => return PassReport::empty(PassStatus::Aborted),
                    FailurePolicy::FailOpen => Vec::new(),
                }
            }
        };

        let matches: Vec<RuleMatch> = rules
            .into_iter()
            .filter(|rule| phase_eligible(&rule.action, phase))
            .map(|rule| {
                let result = match_rule(&rule, ctx);
                RuleMatch { rule, result }
            })
            .collect();

        let effects = resolve(phase, ctx, matches);
        if effects.is_empty() {
            return PassReport::empty(PassStatus::NoMatch);
        }

        for effect in &effects {
            // One bad effect must not sink the rest of the sequence
            if let Err(e) = self.executor.execute(effect).await {
                warn!(
                    "Executing effect of rule {} in {} failed: {}",
                    effect.rule.id, phase, e
                );
            }
        }

        PassReport {
            status: PassStatus::Applied,
            effects,
        }
    }

    /// Initiator first, then target URL; the second lookup only runs
    /// when the first comes back clean
    async fn vetoed(&self, ctx: &RequestContext) -> Result<bool> {
        if self.block_list.is_blocked(&ctx.initiator).await? {
            return Ok(true);
        }
        self.block_list.is_blocked(&ctx.url).await
    }
}

fn lifecycle_admits(lifecycle: Option<DocumentLifecycle>) -> bool {
    match lifecycle {
        None | Some(DocumentLifecycle::Active) | Some(DocumentLifecycle::Prerender) => true,
        Some(DocumentLifecycle::Cached) | Some(DocumentLifecycle::PendingDeletion) => false,
    }
}
