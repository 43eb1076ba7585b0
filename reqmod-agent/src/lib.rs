//! Rule Agent Binary
//!
//! Standalone executable that mirrors a rule server's engine-facing state
//! (enabled rules, block patterns, the interception switch) into in-process
//! collaborators, so requests can be evaluated locally without a network
//! round trip per request.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;

use reqmod_core::{
    Dispatcher, Interceptor, MemoryRuleStore, PatternBlockList, Phase, RequestContext,
    RequestMethod, ResourceType, TraceExecutor,
};

pub mod client;
use client::{RuleServerClient, SyncSnapshot};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the rule server HTTP API
    #[arg(long, default_value = "http://127.0.0.1:7800")]
    pub server_url: String,

    /// Seconds between sync polls
    #[arg(long, default_value_t = 30)]
    pub sync_interval: u64,

    /// Evaluate this URL once against the mirrored rules, print the
    /// resulting report as JSON, and exit
    #[arg(long)]
    pub eval_url: Option<String>,

    /// HTTP method for the one-shot evaluation
    #[arg(long, default_value = "get")]
    pub eval_method: String,

    /// Resource type for the one-shot evaluation
    #[arg(long, default_value = "other")]
    pub eval_resource_type: String,

    /// Initiator origin for the one-shot evaluation; defaults to the
    /// evaluated URL itself
    #[arg(long)]
    pub eval_initiator: Option<String>,

    /// Interception phase for the one-shot evaluation
    #[arg(long, default_value = "pre-send")]
    pub eval_phase: String,
}

/// In-process replica of the server's engine-facing state
struct Mirror {
    store: Arc<MemoryRuleStore>,
    block_list: Arc<PatternBlockList>,
    interception: watch::Sender<bool>,
}

impl Mirror {
    fn apply(&self, snapshot: SyncSnapshot) {
        self.store.replace_all(snapshot.rules);
        self.block_list.set_patterns(snapshot.block_patterns);
        self.interception.send_replace(snapshot.interception_enabled);
    }
}

pub async fn run_agent(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting Rule Agent...");
    tracing::info!("  Server: {}", args.server_url);
    tracing::info!("  Sync interval: {}s", args.sync_interval);

    let store = Arc::new(MemoryRuleStore::new());
    let block_list = Arc::new(PatternBlockList::new());
    let (tx, rx) = watch::channel(false);
    let mirror = Mirror {
        store: store.clone(),
        block_list: block_list.clone(),
        interception: tx,
    };

    let dispatcher = Dispatcher::new(store, block_list, Arc::new(TraceExecutor));
    let interceptor = Interceptor::new(Arc::new(dispatcher), rx.clone());
    reqmod_core::spawn_transition_logger(rx);

    let client = RuleServerClient::new(&args.server_url);

    // Block until the first sync lands; evaluating against an empty mirror
    // would answer the wrong question
    let snapshot = loop {
        match client.fetch_snapshot().await {
            Ok(snapshot) => break snapshot,
            Err(e) => {
                tracing::warn!("Failed to sync with rule server: {}. Retrying in 5s...", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    };
    tracing::info!(
        "Synced {} rules and {} block patterns (interception {})",
        snapshot.rules.len(),
        snapshot.block_patterns.len(),
        if snapshot.interception_enabled { "on" } else { "off" }
    );
    mirror.apply(snapshot);

    if args.eval_url.is_some() {
        return evaluate_once(&interceptor, &args).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.sync_interval.max(1)));
    // The first tick completes immediately; the initial sync above covered it
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match client.fetch_snapshot().await {
            Ok(snapshot) => {
                tracing::debug!(
                    "Refreshed {} rules and {} block patterns",
                    snapshot.rules.len(),
                    snapshot.block_patterns.len()
                );
                mirror.apply(snapshot);
            }
            // A failed poll keeps the last good snapshot
            Err(e) => tracing::warn!("Sync failed: {}. Keeping last snapshot.", e),
        }
    }
}

async fn evaluate_once(
    interceptor: &Interceptor,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = args.eval_url.as_deref().unwrap_or_default();
    let phase: Phase = args.eval_phase.parse()?;
    let method = RequestMethod::parse(&args.eval_method)
        .ok_or_else(|| format!("Unknown HTTP method: {}", args.eval_method))?;
    let resource_type = ResourceType::parse(&args.eval_resource_type);
    let initiator = args
        .eval_initiator
        .clone()
        .unwrap_or_else(|| url.to_string());

    let ctx = RequestContext::new(url, method, resource_type, &initiator);
    match interceptor.intercept(phase, &ctx).await {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("{}", serde_json::json!({ "enabled": false })),
    }
    Ok(())
}
