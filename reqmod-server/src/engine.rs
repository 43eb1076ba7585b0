//! Database-backed engine collaborators
//!
//! Adapts [`Database`] to the engine's storage traits so the dispatcher
//! reads whatever the management API last wrote.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use reqmod_core::blocklist::{block_target_host, host_matches_patterns};
use reqmod_core::{
    BlockList, DispatchConfig, Dispatcher, EngineError, Interceptor, Rule, RuleStore,
    TraceExecutor,
};

use crate::database::Database;

pub struct DbRuleStore {
    db: Arc<Database>,
}

impl DbRuleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for DbRuleStore {
    async fn get_enabled_rules(&self) -> reqmod_core::Result<Vec<Rule>> {
        self.db
            .get_enabled_rules()
            .await
            .map_err(|e| EngineError::store_unavailable(&e.to_string()))
    }
}

pub struct DbBlockList {
    db: Arc<Database>,
}

impl DbBlockList {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlockList for DbBlockList {
    async fn is_blocked(&self, target: &str) -> reqmod_core::Result<bool> {
        let patterns = self
            .db
            .list_block_patterns()
            .await
            .map_err(|e| EngineError::block_list_unavailable(&e.to_string()))?;
        let host = block_target_host(target);
        Ok(host_matches_patterns(
            &host,
            patterns.iter().map(|p| p.as_str()),
        ))
    }
}

/// Wire the dispatcher to the database and hang the interception switch
/// in front of it
pub fn build_interceptor(
    db: Arc<Database>,
    enabled: bool,
    config: DispatchConfig,
) -> (watch::Sender<bool>, Interceptor) {
    let (tx, rx) = watch::channel(enabled);

    let dispatcher = Dispatcher::new(
        Arc::new(DbRuleStore::new(db.clone())),
        Arc::new(DbBlockList::new(db)),
        Arc::new(TraceExecutor),
    )
    .with_config(config);

    (tx, Interceptor::new(Arc::new(dispatcher), rx))
}
