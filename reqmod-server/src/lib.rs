//! Rule Server Library
//!
//! Persists modification rules and the block list in SQLite, serves the
//! management REST API, and evaluates request snapshots against the
//! engine on demand.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use reqmod_core::DispatchConfig;

pub mod database;
pub mod engine;
pub mod error;
pub mod http;
pub mod logging;

pub use database::{Database, StoredRule};
pub use error::{ServerError, ServerResult};
pub use logging::LoggingConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub database_url: String,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

pub struct RuleServer {
    config: ServerConfig,
}

impl RuleServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn start(&self) -> ServerResult<()> {
        let db = Arc::new(Database::new(&self.config.database_url).await?);

        // The switch starts wherever the last run left it
        let enabled = db.get_interception_enabled().await?;
        let state = http::build_state(db, enabled, self.config.dispatch);
        let app = http::router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        info!("Rule server listening on http://{}", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
