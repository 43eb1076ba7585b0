use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use reqmod_core::modification::{apply_query_transform, apply_replacement, build_redirect_url};
use reqmod_core::{
    DispatchConfig, Interceptor, PassStatus, Phase, RequestContext, ResolvedEffect, Rule,
    RuleAction, RuleCondition,
};

use crate::database::{Database, StoredRule};
use crate::engine::build_interceptor;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    interception: Arc<watch::Sender<bool>>,
    interceptor: Interceptor,
}

pub fn build_state(db: Arc<Database>, enabled: bool, config: DispatchConfig) -> AppState {
    let (tx, interceptor) = build_interceptor(db.clone(), enabled, config);
    reqmod_core::spawn_transition_logger(tx.subscribe());
    AppState {
        db,
        interception: Arc::new(tx),
        interceptor,
    }
}

/// Request body for creating or replacing a rule
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBody {
    pub priority: i32,
    pub condition: RuleCondition,
    #[serde(flatten)]
    pub action: RuleAction,
}

#[derive(Debug, Deserialize)]
pub struct EnabledBody {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InterceptionState {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PatternBody {
    pub pattern: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockListResponse {
    pub patterns: Vec<String>,
}

/// Response for the evaluation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PassStatus>,
    pub cancelled: bool,
    pub effects: Vec<EffectView>,
}

/// Resolved effect plus the URL it produces, where one can be computed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectView {
    #[serde(flatten)]
    pub effect: ResolvedEffect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(health_handler))
        // Rule management endpoints
        .route("/rules", get(list_rules_handler).post(create_rule_handler))
        .route("/rules/enabled", get(enabled_rules_handler))
        .route(
            "/rules/:id",
            get(get_rule_handler)
                .put(update_rule_handler)
                .delete(delete_rule_handler),
        )
        .route("/rules/:id/enabled", put(set_rule_enabled_handler))
        // Interception lifecycle endpoints
        .route(
            "/interception",
            get(get_interception_handler).put(set_interception_handler),
        )
        // Block list endpoints
        .route(
            "/blocklist",
            get(list_block_patterns_handler)
                .post(add_block_pattern_handler)
                .delete(remove_block_pattern_handler),
        )
        // Evaluation endpoint
        .route("/evaluate/:phase", post(evaluate_handler))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Basic health check handler
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "reqmod-server"
    }))
}

async fn list_rules_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredRule>>, StatusCode> {
    match state.db.list_rules().await {
        Ok(rules) => Ok(Json(rules)),
        Err(e) => {
            tracing::error!("Failed to list rules: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn enabled_rules_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Rule>>, StatusCode> {
    match state.db.get_enabled_rules().await {
        Ok(rules) => Ok(Json(rules)),
        Err(e) => {
            tracing::error!("Failed to list enabled rules: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn create_rule_handler(
    State(state): State<AppState>,
    Json(body): Json<RuleBody>,
) -> Result<(StatusCode, Json<StoredRule>), StatusCode> {
    let candidate = Rule {
        id: 0,
        priority: body.priority,
        condition: body.condition.clone(),
        action: body.action.clone(),
    };
    if let Err(e) = candidate.validate() {
        tracing::warn!("Rejecting invalid rule: {}", e);
        return Err(StatusCode::BAD_REQUEST);
    }

    match state
        .db
        .create_rule(body.priority, &body.condition, &body.action)
        .await
    {
        Ok(stored) => {
            tracing::info!("Rule {} created ({})", stored.rule.id, stored.rule.action.kind());
            Ok((StatusCode::CREATED, Json(stored)))
        }
        Err(e) => {
            tracing::error!("Failed to create rule: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_rule_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<StoredRule>, StatusCode> {
    match state.db.get_rule(id).await {
        Ok(Some(stored)) => Ok(Json(stored)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch rule {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn update_rule_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<RuleBody>,
) -> Result<Json<StoredRule>, StatusCode> {
    let rule = Rule {
        id,
        priority: body.priority,
        condition: body.condition,
        action: body.action,
    };
    if let Err(e) = rule.validate() {
        tracing::warn!("Rejecting invalid rule update for {}: {}", id, e);
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.db.update_rule(&rule).await {
        Ok(true) => match state.db.get_rule(id).await {
            Ok(Some(stored)) => Ok(Json(stored)),
            Ok(None) => Err(StatusCode::NOT_FOUND),
            Err(e) => {
                tracing::error!("Failed to fetch rule {} after update: {}", id, e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to update rule {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn delete_rule_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.db.delete_rule(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete rule {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn set_rule_enabled_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<EnabledBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.db.set_rule_enabled(id, body.enabled).await {
        Ok(true) => Ok(Json(serde_json::json!({
            "id": id,
            "enabled": body.enabled
        }))),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to toggle rule {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_interception_handler(
    State(state): State<AppState>,
) -> Result<Json<InterceptionState>, StatusCode> {
    match state.db.get_interception_enabled().await {
        Ok(enabled) => Ok(Json(InterceptionState { enabled })),
        Err(e) => {
            tracing::error!("Failed to read interception state: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn set_interception_handler(
    State(state): State<AppState>,
    Json(body): Json<EnabledBody>,
) -> Result<Json<InterceptionState>, StatusCode> {
    // Persist first so a restart comes back in the same state
    if let Err(e) = state.db.set_interception_enabled(body.enabled).await {
        tracing::error!("Failed to persist interception state: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.interception.send_replace(body.enabled);

    Ok(Json(InterceptionState {
        enabled: body.enabled,
    }))
}

async fn list_block_patterns_handler(
    State(state): State<AppState>,
) -> Result<Json<BlockListResponse>, StatusCode> {
    match state.db.list_block_patterns().await {
        Ok(patterns) => Ok(Json(BlockListResponse { patterns })),
        Err(e) => {
            tracing::error!("Failed to list block patterns: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn add_block_pattern_handler(
    State(state): State<AppState>,
    Json(body): Json<PatternBody>,
) -> Result<(StatusCode, Json<BlockListResponse>), StatusCode> {
    if body.pattern.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Err(e) = state.db.add_block_pattern(body.pattern.trim()).await {
        tracing::error!("Failed to add block pattern: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    match state.db.list_block_patterns().await {
        Ok(patterns) => Ok((StatusCode::CREATED, Json(BlockListResponse { patterns }))),
        Err(e) => {
            tracing::error!("Failed to list block patterns: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn remove_block_pattern_handler(
    State(state): State<AppState>,
    Json(body): Json<PatternBody>,
) -> Result<Json<BlockListResponse>, StatusCode> {
    match state.db.remove_block_pattern(&body.pattern).await {
        Ok(true) => match state.db.list_block_patterns().await {
            Ok(patterns) => Ok(Json(BlockListResponse { patterns })),
            Err(e) => {
                tracing::error!("Failed to list block patterns: {}", e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to remove block pattern: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn evaluate_handler(
    Path(phase): Path<String>,
    State(state): State<AppState>,
    Json(ctx): Json<RequestContext>,
) -> Result<Json<EvaluateResponse>, StatusCode> {
    let phase: Phase = match phase.parse() {
        Ok(phase) => phase,
        Err(_) => return Err(StatusCode::BAD_REQUEST),
    };

    match state.interceptor.intercept(phase, &ctx).await {
        Some(report) => {
            let cancelled = report.cancelled();
            let effects = report
                .effects
                .into_iter()
                .map(|effect| {
                    let resolved_url = resolve_url_for(&effect, &ctx);
                    EffectView {
                        effect,
                        resolved_url,
                    }
                })
                .collect();
            Ok(Json(EvaluateResponse {
                enabled: true,
                status: Some(report.status),
                cancelled,
                effects,
            }))
        }
        None => Ok(Json(EvaluateResponse {
            enabled: false,
            status: None,
            cancelled: false,
            effects: Vec::new(),
        })),
    }
}

/// Pre-send URL actions produce a concrete URL for the caller
fn resolve_url_for(effect: &ResolvedEffect, ctx: &RequestContext) -> Option<String> {
    match &effect.rule.action {
        RuleAction::Redirect(redirect) => match build_redirect_url(redirect, &ctx.url) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Redirect of rule {} did not resolve: {}", effect.rule.id, e);
                None
            }
        },
        RuleAction::QueryParam(transform) => match apply_query_transform(&ctx.url, transform) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(
                    "Query transform of rule {} did not resolve: {}",
                    effect.rule.id,
                    e
                );
                None
            }
        },
        RuleAction::Replace(replace) => Some(apply_replacement(&ctx.url, replace)),
        RuleAction::Cancel
        | RuleAction::Delay(_)
        | RuleAction::Headers(_)
        | RuleAction::UserAgent(_) => None,
    }
}
