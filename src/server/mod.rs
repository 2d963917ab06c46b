// Chain HTTP server
// Stateless JSON API: one pipeline stage per request

mod credentials;
mod error;
mod handlers;
mod types;

pub use credentials::{ConfiguredProviders, ProviderSource, ResolvedProvider};
pub use error::ApiError;
pub use handlers::{api_router, health_check, AppState, SharedState};
pub use types::{parse_code_map, parse_step, DetailsResponse, StageRequest, StageResponse};

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::constants::MAX_REQUEST_BODY_BYTES;
use crate::config::Config;

/// Main server structure
pub struct ChainServer {
    state: SharedState,
    bind_address: String,
}

impl ChainServer {
    /// Create a server from loaded configuration
    pub fn new(config: &Config, bind_address: String) -> Result<Self> {
        let providers = ConfiguredProviders::from_config(config)
            .context("Failed to create completion provider")?;

        if !providers.has_default() {
            tracing::warn!(
                "No provider configured; requests must include an api_key \
                 (set ANTHROPIC_API_KEY or OPENAI_API_KEY to avoid this)"
            );
        }

        Ok(Self::with_providers(Arc::new(providers), bind_address))
    }

    pub fn with_providers(providers: Arc<dyn ProviderSource>, bind_address: String) -> Self {
        Self {
            state: Arc::new(AppState { providers }),
            bind_address,
        }
    }

    /// Full application: routes plus body limit, CORS and request tracing
    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Start the HTTP server and run until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))?;

        let app = self.router();

        tracing::info!("Starting promptchain server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

pub fn build_app(state: SharedState) -> Router {
    api_router(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, finishing in-flight requests");
}
