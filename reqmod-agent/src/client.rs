//! HTTP client for the rule server's engine-facing endpoints

use serde::Deserialize;
use tracing::debug;

use reqmod_core::Rule;

/// One consistent view of the server state the engine cares about
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    pub rules: Vec<Rule>,
    pub block_patterns: Vec<String>,
    pub interception_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct BlockListPayload {
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InterceptionPayload {
    enabled: bool,
}

pub struct RuleServerClient {
    base_url: String,
    http: reqwest::Client,
}

impl RuleServerClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn fetch_enabled_rules(&self) -> Result<Vec<Rule>, reqwest::Error> {
        self.http
            .get(format!("{}/rules/enabled", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn fetch_block_patterns(&self) -> Result<Vec<String>, reqwest::Error> {
        let payload: BlockListPayload = self
            .http
            .get(format!("{}/blocklist", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload.patterns)
    }

    pub async fn fetch_interception_enabled(&self) -> Result<bool, reqwest::Error> {
        let payload: InterceptionPayload = self
            .http
            .get(format!("{}/interception", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload.enabled)
    }

    /// Fetch rules, block patterns and the interception switch in one pass
    pub async fn fetch_snapshot(&self) -> Result<SyncSnapshot, reqwest::Error> {
        let rules = self.fetch_enabled_rules().await?;
        let block_patterns = self.fetch_block_patterns().await?;
        let interception_enabled = self.fetch_interception_enabled().await?;
        debug!(
            "Fetched snapshot: {} rules, {} block patterns, interception {}",
            rules.len(),
            block_patterns.len(),
            if interception_enabled { "on" } else { "off" }
        );
        Ok(SyncSnapshot {
            rules,
            block_patterns,
            interception_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{response::Json, routing::get, Router};
    use serde_json::json;

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route(
                "/rules/enabled",
                get(|| async {
                    Json(json!([
                        {
                            "id": 1,
                            "priority": 5,
                            "condition": { "urlFilter": "||example.com" },
                            "ruleType": "CANCEL"
                        }
                    ]))
                }),
            )
            .route(
                "/blocklist",
                get(|| async { Json(json!({ "patterns": ["*.ads.net"] })) }),
            )
            .route(
                "/interception",
                get(|| async { Json(json!({ "enabled": false })) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub stopped");
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_snapshot_from_server() {
        let base = spawn_stub().await;
        let client = RuleServerClient::new(&base);

        let snapshot = client.fetch_snapshot().await.expect("Sync failed");
        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.rules[0].id, 1);
        assert_eq!(snapshot.block_patterns, vec!["*.ads.net"]);
        assert!(!snapshot.interception_enabled);
    }

    #[tokio::test]
    async fn test_trailing_slash_is_normalized() {
        let base = spawn_stub().await;
        let client = RuleServerClient::new(&format!("{}/", base));

        let rules = client.fetch_enabled_rules().await.expect("Fetch failed");
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        // Stub has no /rules route, only /rules/enabled
        let base = spawn_stub().await;
        let client = RuleServerClient::new(&base);

        let result = client
            .http
            .get(format!("{}/rules", client.base_url))
            .send()
            .await
            .expect("Request failed")
            .error_for_status();
        assert!(result.is_err());
    }
}
