//! Rule condition evaluation
//!
//! Pure predicate over a condition and a request snapshot. A condition
//! that cannot be evaluated never matches; it must not take the rest of
//! the rule set down with it.

use tracing::warn;

use crate::context::RequestContext;
use crate::pattern::UrlFilter;
use crate::rule::RuleCondition;

impl RuleCondition {
    /// Check if this condition matches the request
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        // Empty resource type set matches every type
        if !self.resource_types.is_empty() && !self.resource_types.contains(&ctx.resource_type) {
            return false;
        }

        if let Some(methods) = &self.request_methods {
            if !methods.is_empty() && !methods.contains(&ctx.method) {
                return false;
            }
        }

        if !self.initiator_admitted(ctx) {
            return false;
        }

        UrlFilter::parse(&self.url_filter)
            .map(|filter| filter.matches(&ctx.url))
            .unwrap_or_else(|e| {
                warn!("Unmatchable URL filter '{}': {}", self.url_filter, e);
                false
            })
    }

    fn initiator_admitted(&self, ctx: &RequestContext) -> bool {
        let Some(host) = ctx.initiator_host() else {
            // Opaque initiator: only conditions without a positive domain
            // requirement can still match
            return self.domains.as_ref().map_or(true, |d| d.is_empty());
        };

        // Exclusion wins over inclusion
        if let Some(excluded) = &self.excluded_domains {
            if excluded.iter().any(|d| host_matches_domain(&host, d)) {
                return false;
            }
        }

        if let Some(domains) = &self.domains {
            if !domains.is_empty() && !domains.iter().any(|d| host_matches_domain(&host, d)) {
                return false;
            }
        }

        true
    }
}

/// `sub.example.com` counts as inside `example.com`
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}
