//! Request Modification Engine
//!
//! This library decides which modification rules apply to an observed
//! request, resolves conflicts between them deterministically, and emits
//! the concrete modification instructions for each interception phase.

pub mod blocklist;
pub mod condition;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod interceptor;
pub mod matcher;
pub mod resolver;
/// Rule shapes as they travel over the wire
pub mod rule;
pub mod store;

/// Dispatch configuration
pub mod config;

/// URL filter pattern language
pub mod pattern;

/// Error types for engine operations
pub mod error;

/// Header and URL rewrite helpers
pub mod modification;

pub use blocklist::{BlockList, PatternBlockList};
pub use condition::host_matches_domain;
pub use config::{DispatchConfig, FailurePolicy};
pub use context::{DocumentLifecycle, Phase, RequestContext, RequestMethod, ResourceType};
pub use dispatcher::{Dispatcher, PassReport, PassStatus};
pub use error::EngineError;
pub use executor::{Executor, RecordingExecutor, TraceExecutor};
pub use interceptor::{spawn_transition_logger, Interceptor};
pub use matcher::{match_rule, MatchResult, ModificationPair};
pub use pattern::UrlFilter;
pub use resolver::{phase_eligible, resolve, Direction, ResolvedEffect, RuleMatch};
/// Re-export commonly used types
pub use rule::{Rule, RuleAction, RuleCondition};
pub use store::{MemoryRuleStore, RuleStore};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
