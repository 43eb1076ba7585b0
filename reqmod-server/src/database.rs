use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reqmod_core::{Rule, RuleAction, RuleCondition};

use crate::error::{ServerError, ServerResult};

/// A rule as persisted, with its enablement flag and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRule {
    #[serde(flatten)]
    pub rule: Rule,
    pub is_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(database_url: &str) -> ServerResult<Self> {
        use sqlx::sqlite::SqliteConnectOptions;
        use std::str::FromStr;

        // Parse the database URL and ensure create_if_missing is set
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // Run migrations (path is relative to reqmod-server crate root)
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("✓ Database initialized and migrated at {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn create_rule(
        &self,
        priority: i32,
        condition: &RuleCondition,
        action: &RuleAction,
    ) -> ServerResult<StoredRule> {
        let condition_json = serde_json::to_string(condition)?;
        let (rule_type, action_json) = split_action(action)?;
        let timestamp = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO rules (priority, is_enabled, url_filter, condition_json, rule_type, action_json, created_at, updated_at)
            VALUES (?, 1, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(priority)
        .bind(&condition.url_filter)
        .bind(condition_json)
        .bind(rule_type)
        .bind(action_json)
        .bind(timestamp)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(StoredRule {
            rule: Rule {
                id: result.last_insert_rowid(),
                priority,
                condition: condition.clone(),
                action: action.clone(),
            },
            is_enabled: true,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    pub async fn get_rule(&self, id: i64) -> ServerResult<Option<StoredRule>> {
        let row = sqlx::query("SELECT * FROM rules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_stored(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_rules(&self) -> ServerResult<Vec<StoredRule>> {
        let rows = sqlx::query("SELECT * FROM rules ORDER BY priority DESC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = Vec::new();
        for row in rows {
            match row_to_stored(&row) {
                Ok(stored) => rules.push(stored),
                // One corrupt row must not hide the rest
                Err(e) => warn!("Skipping unreadable rule row: {}", e),
            }
        }
        Ok(rules)
    }

    /// The set the engine evaluates against
    pub async fn get_enabled_rules(&self) -> ServerResult<Vec<Rule>> {
        let rows = sqlx::query("SELECT * FROM rules WHERE is_enabled = 1 ORDER BY priority DESC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = Vec::new();
        for row in rows {
            match row_to_stored(&row) {
                Ok(stored) => rules.push(stored.rule),
                Err(e) => warn!("Skipping unreadable rule row: {}", e),
            }
        }
        Ok(rules)
    }

    pub async fn update_rule(&self, rule: &Rule) -> ServerResult<bool> {
        let condition_json = serde_json::to_string(&rule.condition)?;
        let (rule_type, action_json) = split_action(&rule.action)?;
        let timestamp = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE rules SET
                priority = ?,
                url_filter = ?,
                condition_json = ?,
                rule_type = ?,
                action_json = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rule.priority)
        .bind(&rule.condition.url_filter)
        .bind(condition_json)
        .bind(rule_type)
        .bind(action_json)
        .bind(timestamp)
        .bind(rule.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_rule(&self, id: i64) -> ServerResult<bool> {
        let result = sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_rule_enabled(&self, id: i64, enabled: bool) -> ServerResult<bool> {
        let timestamp = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE rules SET is_enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_block_pattern(&self, pattern: &str) -> ServerResult<()> {
        let timestamp = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO block_list (pattern, created_at)
            VALUES (?, ?)
            ON CONFLICT(pattern) DO NOTHING
            "#,
        )
        .bind(pattern)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_block_pattern(&self, pattern: &str) -> ServerResult<bool> {
        let result = sqlx::query("DELETE FROM block_list WHERE pattern = ?")
            .bind(pattern)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_block_patterns(&self) -> ServerResult<Vec<String>> {
        let rows = sqlx::query("SELECT pattern FROM block_list ORDER BY pattern ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("pattern")).collect())
    }

    /// Missing setting counts as enabled
    pub async fn get_interception_enabled(&self) -> ServerResult<bool> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = 'interception_enabled'")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| r.get::<String, _>("value") == "true")
            .unwrap_or(true))
    }

    pub async fn set_interception_enabled(&self, enabled: bool) -> ServerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES ('interception_enabled', ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(if enabled { "true" } else { "false" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Adjacent tag layout on the wire maps to two columns in the table
fn split_action(action: &RuleAction) -> Result<(String, String), serde_json::Error> {
    let value = serde_json::to_value(action)?;
    let payload = value
        .get("action")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Ok((action.kind().to_string(), payload.to_string()))
}

fn join_action(rule_type: &str, action_json: &str) -> Result<RuleAction, serde_json::Error> {
    let payload: serde_json::Value = serde_json::from_str(action_json)?;
    let mut wrapper = serde_json::Map::new();
    wrapper.insert("ruleType".to_string(), rule_type.into());
    if !payload.is_null() {
        wrapper.insert("action".to_string(), payload);
    }
    serde_json::from_value(serde_json::Value::Object(wrapper))
}

fn row_to_stored(row: &SqliteRow) -> ServerResult<StoredRule> {
    let id: i64 = row.get("id");

    let condition: RuleCondition = serde_json::from_str(&row.get::<String, _>("condition_json"))
        .map_err(|e| ServerError::CorruptRule {
            id,
            details: e.to_string(),
        })?;
    let action = join_action(
        &row.get::<String, _>("rule_type"),
        &row.get::<String, _>("action_json"),
    )
    .map_err(|e| ServerError::CorruptRule {
        id,
        details: e.to_string(),
    })?;

    Ok(StoredRule {
        rule: Rule {
            id,
            priority: row.get("priority"),
            condition,
            action,
        },
        is_enabled: row.get("is_enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
