use reqmod_core::rule::{
    HeaderConfig, HeaderModification, QueryParamPair, QueryTransform, RedirectAction,
};
use reqmod_core::{RuleAction, RuleCondition};
use reqmod_server::Database;
use tempfile::TempDir;

async fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("rules.db").display());
    let db = Database::new(&url).await.expect("Failed to create DB");
    (dir, db)
}

fn condition(filter: &str) -> RuleCondition {
    RuleCondition {
        url_filter: filter.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_rule_round_trip() {
    let (_dir, db) = test_db().await;

    let action = RuleAction::Redirect(RedirectAction {
        url: Some("https://mirror.example.net/".to_string()),
        transform: None,
    });
    let created = db
        .create_rule(5, &condition("||example.com"), &action)
        .await
        .expect("Failed to create rule");

    assert!(created.rule.id > 0);
    assert!(created.is_enabled);

    let fetched = db
        .get_rule(created.rule.id)
        .await
        .expect("Failed to fetch rule")
        .expect("Rule should exist");
    assert_eq!(fetched.rule, created.rule);
    assert_eq!(fetched.rule.action, action);
}

#[tokio::test]
async fn test_cancel_rule_round_trip() {
    let (_dir, db) = test_db().await;

    let created = db
        .create_rule(1, &condition("||blocked.net"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");

    let fetched = db
        .get_rule(created.rule.id)
        .await
        .expect("Failed to fetch rule")
        .expect("Rule should exist");
    assert_eq!(fetched.rule.action, RuleAction::Cancel);
}

#[tokio::test]
async fn test_headers_rule_round_trip() {
    let (_dir, db) = test_db().await;

    let action = RuleAction::Headers(HeaderConfig {
        request: vec![HeaderModification::set("X-Debug", "1")],
        response: vec![HeaderModification::remove("Set-Cookie")],
    });
    let created = db
        .create_rule(2, &condition("||example.com"), &action)
        .await
        .expect("Failed to create rule");

    let fetched = db
        .get_rule(created.rule.id)
        .await
        .expect("Failed to fetch rule")
        .expect("Rule should exist");
    assert_eq!(fetched.rule.action, action);
}

#[tokio::test]
async fn test_disabled_rules_excluded_from_engine_set() {
    let (_dir, db) = test_db().await;

    let first = db
        .create_rule(1, &condition("||a.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");
    db.create_rule(1, &condition("||b.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");

    assert!(db
        .set_rule_enabled(first.rule.id, false)
        .await
        .expect("Failed to toggle rule"));

    let enabled = db.get_enabled_rules().await.expect("Failed to list enabled");
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].condition.url_filter, "||b.com");

    // Management listing still shows both
    let all = db.list_rules().await.expect("Failed to list rules");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_toggle_unknown_rule_reports_missing() {
    let (_dir, db) = test_db().await;
    assert!(!db
        .set_rule_enabled(999, false)
        .await
        .expect("Toggle should not error"));
}

#[tokio::test]
async fn test_update_rule() {
    let (_dir, db) = test_db().await;

    let created = db
        .create_rule(1, &condition("||example.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");

    let mut updated = created.rule.clone();
    updated.priority = 9;
    updated.action = RuleAction::QueryParam(QueryTransform {
        remove_params: vec!["utm_source".to_string()],
        add_or_replace_params: vec![QueryParamPair {
            key: "lang".to_string(),
            value: "en".to_string(),
        }],
    });

    assert!(db.update_rule(&updated).await.expect("Failed to update"));

    let fetched = db
        .get_rule(created.rule.id)
        .await
        .expect("Failed to fetch rule")
        .expect("Rule should exist");
    assert_eq!(fetched.rule, updated);
    assert!(fetched.updated_at >= fetched.created_at);
}

#[tokio::test]
async fn test_delete_rule() {
    let (_dir, db) = test_db().await;

    let created = db
        .create_rule(1, &condition("||example.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");

    assert!(db.delete_rule(created.rule.id).await.expect("Failed to delete"));
    assert!(db
        .get_rule(created.rule.id)
        .await
        .expect("Failed to fetch")
        .is_none());
    assert!(!db.delete_rule(created.rule.id).await.expect("Second delete should not error"));
}

#[tokio::test]
async fn test_enabled_rules_come_back_ordered() {
    let (_dir, db) = test_db().await;

    db.create_rule(1, &condition("||low.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");
    db.create_rule(9, &condition("||high.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");
    db.create_rule(9, &condition("||high2.com"), &RuleAction::Cancel)
        .await
        .expect("Failed to create rule");

    let enabled = db.get_enabled_rules().await.expect("Failed to list enabled");
    let filters: Vec<&str> = enabled.iter().map(|r| r.condition.url_filter.as_str()).collect();
    assert_eq!(filters, vec!["||high.com", "||high2.com", "||low.com"]);
}

#[tokio::test]
async fn test_block_pattern_management() {
    let (_dir, db) = test_db().await;

    db.add_block_pattern("tracker.com")
        .await
        .expect("Failed to add pattern");
    db.add_block_pattern("*.ads.net")
        .await
        .expect("Failed to add pattern");
    // Duplicate insert is a no-op
    db.add_block_pattern("tracker.com")
        .await
        .expect("Duplicate add should not error");

    let patterns = db.list_block_patterns().await.expect("Failed to list");
    assert_eq!(patterns, vec!["*.ads.net", "tracker.com"]);

    assert!(db
        .remove_block_pattern("tracker.com")
        .await
        .expect("Failed to remove"));
    assert!(!db
        .remove_block_pattern("tracker.com")
        .await
        .expect("Second remove should not error"));

    let patterns = db.list_block_patterns().await.expect("Failed to list");
    assert_eq!(patterns, vec!["*.ads.net"]);
}

#[tokio::test]
async fn test_interception_setting_persists() {
    let (_dir, db) = test_db().await;

    // Seeded enabled
    assert!(db
        .get_interception_enabled()
        .await
        .expect("Failed to read setting"));

    db.set_interception_enabled(false)
        .await
        .expect("Failed to write setting");
    assert!(!db
        .get_interception_enabled()
        .await
        .expect("Failed to read setting"));

    db.set_interception_enabled(true)
        .await
        .expect("Failed to write setting");
    assert!(db
        .get_interception_enabled()
        .await
        .expect("Failed to read setting"));
}
