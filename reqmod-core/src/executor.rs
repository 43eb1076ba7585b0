//! Effect execution seam
//!
//! The engine decides, an [`Executor`] acts. What acting means depends
//! on the deployment: hand instructions to a browser hook, rewrite an
//! in-flight request, or just record them.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::resolver::ResolvedEffect;
use crate::Result;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Carry out one resolved effect.
    ///
    /// A failure here is scoped to the one effect; the dispatcher keeps
    /// going with the rest of the sequence.
    async fn execute(&self, effect: &ResolvedEffect) -> Result<()>;
}

/// Executor that records every effect it is handed, in order
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<ResolvedEffect>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn executed(&self) -> Vec<ResolvedEffect> {
        self.executed.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.executed.lock().await.len()
    }

    pub async fn clear(&self) {
        self.executed.lock().await.clear();
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, effect: &ResolvedEffect) -> Result<()> {
        self.executed.lock().await.push(effect.clone());
        Ok(())
    }
}

/// Executor for deployments where the caller applies the instructions
/// itself; executing here just means leaving a trace
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceExecutor;

#[async_trait]
impl Executor for TraceExecutor {
    async fn execute(&self, effect: &ResolvedEffect) -> Result<()> {
        debug!(
            "Resolved rule {} ({}) in {}",
            effect.rule.id,
            effect.rule.action.kind(),
            effect.phase
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Phase, RequestContext, RequestMethod, ResourceType};
    use crate::rule::{Rule, RuleAction, RuleCondition};

    fn effect(id: i64) -> ResolvedEffect {
        let ctx = RequestContext::new(
            "https://example.com/",
            RequestMethod::Get,
            ResourceType::Other,
            "https://origin.com",
        );
        ResolvedEffect {
            rule: Rule {
                id,
                priority: 1,
                condition: RuleCondition {
                    url_filter: "||example.com".to_string(),
                    ..Default::default()
                },
                action: RuleAction::Cancel,
            },
            phase: Phase::PreSend,
            direction: None,
            is_top_level_or_prerender: ctx.is_top_level_or_prerender(),
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let executor = RecordingExecutor::new();
        executor.execute(&effect(1)).await.unwrap();
        executor.execute(&effect(2)).await.unwrap();

        let seen = executor.executed().await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].rule.id, 1);
        assert_eq!(seen[1].rule.id, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let executor = RecordingExecutor::new();
        executor.execute(&effect(1)).await.unwrap();
        executor.clear().await;
        assert_eq!(executor.count().await, 0);
    }
}
