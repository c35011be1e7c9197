//! # vibecheck-server
//!
//! AI gateway and moderation server for the Vibecheck platform.
//!
//! This binary provides:
//! - **AI gateway** (axum) proxying analysis and chat requests to an
//!   OpenAI-compatible model provider, with per-kind prompts and
//!   score extraction
//! - **Content moderation** combining deterministic local checks with
//!   a fail-open AI pass
//! - **Per-caller rate limiting** on the AI gateway endpoint

mod api;
mod config;
mod error;
mod gateway;
mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::gateway::AiClient;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vibecheck_server=debug")),
        )
        .init();

    info!("Starting Vibecheck server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = Arc::new(ServerConfig::from_env());
    info!(
        addr = %config.http_addr,
        ai_configured = config.ai_configured(),
        vision_model = %config.vision_model,
        text_model = %config.text_model,
        rate_limit_max = config.rate_limit_max,
        "Loaded configuration"
    );
    if !config.ai_configured() {
        tracing::warn!("AI_API_KEY not set; AI endpoints will return a configuration error");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let ai = Arc::new(AiClient::new(config.clone())?);
    let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);

    let app_state = AppState {
        ai,
        rate_limiter: rate_limiter.clone(),
        config: config.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale().await;
            let callers = rate_limiter.tracked_callers().await;
            tracing::debug!(callers, "Rate limiter purged");
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
