use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use vibecheck_core::moderation::{self, ModerationVerdict};
use vibecheck_core::types::AnalyzerKind;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::gateway::{AiClient, AiReply, CallerProfile, ChatMessage};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub ai: Arc<AiClient>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    // Only the AI gateway is rate limited; moderation must stay
    // reachable even for chatty callers.
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/ai",
            post(ai_analyze).layer(middleware::from_fn_with_state(
                state.rate_limiter.clone(),
                rate_limit_middleware,
            )),
        )
        .route("/api/moderate", post(moderate_content))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct AiRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
    /// Analyzer kind; unknown or missing values fall back to chat.
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "userProfile")]
    user_profile: Option<CallerProfile>,
}

#[derive(Deserialize)]
struct ModerateRequest {
    content: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ai_analyze(
    State(state): State<AppState>,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiReply>, ServerError> {
    if req.messages.is_empty() {
        return Err(ServerError::BadRequest(
            "Invalid messages format".to_string(),
        ));
    }

    let kind = AnalyzerKind::parse(req.kind.as_deref().unwrap_or("chat"));
    let reply = state
        .ai
        .analyze(kind, &req.messages, req.user_profile.as_ref())
        .await?;

    info!(kind = ?kind, scored = reply.scores.is_some(), "AI analysis served");
    Ok(Json(reply))
}

/// Local checks run first and are authoritative when they flag. The AI
/// pass is advisory: if the upstream call fails the content is allowed
/// through rather than blocking the user on our outage.
async fn moderate_content(
    State(state): State<AppState>,
    Json(req): Json<ModerateRequest>,
) -> Result<Json<ModerationVerdict>, ServerError> {
    let content = match req.content {
        Some(c) if !c.is_empty() => c,
        _ => return Err(ServerError::BadRequest("No content provided".to_string())),
    };

    let verdict = moderation::check_local(&content);
    if !verdict.safe {
        info!(reason = ?verdict.reason, "content rejected by local checks");
        return Ok(Json(verdict));
    }

    if state.config.ai_configured() {
        match state.ai.moderate(&content).await {
            Ok(Some(reason)) => {
                info!(%reason, "content rejected by AI moderation");
                return Ok(Json(ModerationVerdict::flagged(reason)));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "AI moderation unavailable, allowing content");
            }
        }
    }

    Ok(Json(verdict))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_state(config: ServerConfig) -> AppState {
        let config = Arc::new(config);
        AppState {
            ai: Arc::new(AiClient::new(config.clone()).unwrap()),
            rate_limiter: RateLimiter::default(),
            config,
        }
    }

    #[tokio::test]
    async fn empty_messages_rejected() {
        let state = test_state(ServerConfig::default());
        let req = AiRequest {
            messages: vec![],
            kind: Some("selfie".to_string()),
            user_profile: None,
        };
        let err = ai_analyze(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn moderate_requires_content() {
        let state = test_state(ServerConfig::default());
        let err = moderate_content(State(state), Json(ModerateRequest { content: None }))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn moderate_local_flag_short_circuits() {
        let state = test_state(ServerConfig::default());
        let req = ModerateRequest {
            content: Some("aaaaaaaaaaaaaaaaaaaa".to_string()),
        };
        let Json(verdict) = moderate_content(State(state), Json(req)).await.unwrap();
        assert!(!verdict.safe);
    }

    #[tokio::test]
    async fn moderate_fails_open_when_upstream_down() {
        let config = ServerConfig {
            ai_api_key: Some("test-key".to_string()),
            ai_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ai_timeout: Duration::from_millis(500),
            ..ServerConfig::default()
        };
        let state = test_state(config);
        let req = ModerateRequest {
            content: Some("just a normal friendly message about lunch".to_string()),
        };
        let Json(verdict) = moderate_content(State(state), Json(req)).await.unwrap();
        assert!(verdict.safe);
    }
}
