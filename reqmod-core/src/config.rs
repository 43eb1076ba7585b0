//! Dispatch configuration

use serde::{Deserialize, Serialize};

/// What a pass does when a collaborator lookup fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the pass and leave the request untouched
    #[default]
    FailClosed,
    /// Treat the failed lookup as empty and keep going
    FailOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Gate the pre-send pass on document lifecycle state
    #[serde(default = "default_true")]
    pub honor_document_lifecycle: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            honor_document_lifecycle: true,
        }
    }
}
