//! Block list veto
//!
//! A blocked host on either the initiator or the target URL removes the
//! whole request from the engine's jurisdiction before any rule is read.

use async_trait::async_trait;
use dashmap::DashSet;
use wildmatch::WildMatch;

use crate::Result;

#[async_trait]
pub trait BlockList: Send + Sync {
    /// `target` is a URL or an initiator origin; matching is by host
    async fn is_blocked(&self, target: &str) -> Result<bool>;
}

/// Pull the host out of a URL-ish string for pattern matching.
///
/// Falls back to the raw lowercased input when it does not parse as a
/// URL, so bare hostnames in configs still match.
pub fn block_target_host(target: &str) -> String {
    match url::Url::parse(target) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_else(|| target.to_ascii_lowercase()),
        Err(_) => target.to_ascii_lowercase(),
    }
}

/// Check a host against a set of wildcard patterns
pub fn host_matches_patterns<'a, I>(host: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    patterns
        .into_iter()
        .any(|pattern| WildMatch::new(&pattern.to_ascii_lowercase()).matches(host))
}

/// In-memory block list of wildcard host patterns
#[derive(Debug, Default)]
pub struct PatternBlockList {
    patterns: DashSet<String>,
}

impl PatternBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, pattern: &str) {
        self.patterns.insert(pattern.to_string());
    }

    pub fn remove(&self, pattern: &str) -> bool {
        self.patterns.remove(pattern).is_some()
    }

    pub fn set_patterns(&self, patterns: Vec<String>) {
        self.patterns.clear();
        for pattern in patterns {
            self.patterns.insert(pattern);
        }
    }

    pub fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl BlockList for PatternBlockList {
    async fn is_blocked(&self, target: &str) -> Result<bool> {
        let host = block_target_host(target);
        let patterns = self.patterns();
        Ok(host_matches_patterns(
            &host,
            patterns.iter().map(|p| p.as_str()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_list_blocks_nothing() {
        let list = PatternBlockList::new();
        assert!(!list.is_blocked("https://example.com/page").await.unwrap());
    }

    #[tokio::test]
    async fn test_exact_host_pattern() {
        let list = PatternBlockList::new();
        list.add("tracker.com");
        assert!(list.is_blocked("https://tracker.com/pixel.gif").await.unwrap());
        assert!(!list.is_blocked("https://example.com/").await.unwrap());
        // Exact pattern does not cover subdomains
        assert!(!list.is_blocked("https://cdn.tracker.com/").await.unwrap());
    }

    #[tokio::test]
    async fn test_wildcard_pattern_covers_subdomains() {
        let list = PatternBlockList::new();
        list.add("*.ads.net");
        assert!(list.is_blocked("https://static.ads.net/b.js").await.unwrap());
        assert!(!list.is_blocked("https://ads.net/b.js").await.unwrap());
    }

    #[tokio::test]
    async fn test_bare_host_target() {
        let list = PatternBlockList::new();
        list.add("tracker.com");
        assert!(list.is_blocked("tracker.com").await.unwrap());
        assert!(list.is_blocked("TRACKER.COM").await.unwrap());
    }

    #[tokio::test]
    async fn test_pattern_case_insensitive() {
        let list = PatternBlockList::new();
        list.add("Tracker.COM");
        assert!(list.is_blocked("https://tracker.com/").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_patterns_replaces() {
        let list = PatternBlockList::new();
        list.add("old.com");
        list.set_patterns(vec!["new.com".to_string()]);
        assert!(!list.is_blocked("https://old.com/").await.unwrap());
        assert!(list.is_blocked("https://new.com/").await.unwrap());
    }

    #[test]
    fn test_block_target_host_extraction() {
        assert_eq!(block_target_host("https://Example.COM/path?q=1"), "example.com");
        assert_eq!(block_target_host("plain-host.org"), "plain-host.org");
        assert_eq!(block_target_host("data:text/html,hi"), "data:text/html,hi");
    }
}
