//! Error types for rule evaluation and dispatch

use thiserror::Error;

/// Main error type for engine operations
#[derive(Debug, Error, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum EngineError {
    #[error("Invalid URL filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("Invalid rule: {reason}")]
    InvalidRule { reason: String },

    #[error("Invalid redirect target: {reason}")]
    InvalidRedirect { reason: String },

    #[error("Unknown phase: {name}")]
    UnknownPhase { name: String },

    #[error("Rule store lookup failed: {details}")]
    StoreUnavailable { details: String },

    #[error("Block list lookup failed: {details}")]
    BlockListUnavailable { details: String },

    #[error("Effect execution failed for rule {rule_id}: {details}")]
    ExecutionFailed { rule_id: i64, details: String },
}

impl EngineError {
    /// Create an invalid filter error
    pub fn invalid_filter(pattern: &str, reason: &str) -> Self {
        Self::InvalidFilter {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid rule error
    pub fn invalid_rule(reason: &str) -> Self {
        Self::InvalidRule {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid redirect error
    pub fn invalid_redirect(reason: &str) -> Self {
        Self::InvalidRedirect {
            reason: reason.to_string(),
        }
    }

    /// Create a store failure error
    pub fn store_unavailable(details: &str) -> Self {
        Self::StoreUnavailable {
            details: details.to_string(),
        }
    }

    /// Create a block list failure error
    pub fn block_list_unavailable(details: &str) -> Self {
        Self::BlockListUnavailable {
            details: details.to_string(),
        }
    }

    /// True for failures of an external collaborator, as opposed to bad rule data
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            EngineError::StoreUnavailable { .. }
                | EngineError::BlockListUnavailable { .. }
                | EngineError::ExecutionFailed { .. }
        )
    }
}
