//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with
//! zero configuration for local development (without an API key the AI
//! endpoints return a configuration error and moderation runs its
//! local checks only).

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// OpenAI-compatible chat-completions endpoint of the upstream
    /// language model provider.
    /// Env: `AI_API_URL`
    pub ai_api_url: String,

    /// Bearer key for the upstream provider.
    /// Env: `AI_API_KEY`
    /// Default: unset (AI endpoints report "not configured").
    pub ai_api_key: Option<String>,

    /// Model used for image-based analysis (selfies, screenshots).
    /// Env: `AI_VISION_MODEL`
    pub vision_model: String,

    /// Model used for text analysis, chat and moderation.
    /// Env: `AI_TEXT_MODEL`
    pub text_model: String,

    /// Maximum AI requests per caller per sliding window.
    /// Env: `RATE_LIMIT_MAX`
    /// Default: `20`
    pub rate_limit_max: usize,

    /// Sliding-window length for the rate limiter.
    /// Env: `RATE_LIMIT_WINDOW_SECS`
    /// Default: `60`
    pub rate_limit_window: Duration,

    /// Timeout for a single upstream AI request.
    /// Env: `AI_TIMEOUT_SECS`
    /// Default: `30`
    pub ai_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            ai_api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            ai_api_key: None,
            vision_model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            text_model: "llama-3.3-70b-versatile".to_string(),
            rate_limit_max: 20,
            rate_limit_window: Duration::from_secs(60),
            ai_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(url) = std::env::var("AI_API_URL") {
            config.ai_api_url = url;
        }

        if let Ok(key) = std::env::var("AI_API_KEY") {
            if !key.is_empty() {
                config.ai_api_key = Some(key);
            }
        }

        if let Ok(model) = std::env::var("AI_VISION_MODEL") {
            config.vision_model = model;
        }

        if let Ok(model) = std::env::var("AI_TEXT_MODEL") {
            config.text_model = model;
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_MAX") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.rate_limit_max = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_MAX, using default"),
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_WINDOW_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.rate_limit_window = Duration::from_secs(n),
                _ => {
                    tracing::warn!(value = %val, "Invalid RATE_LIMIT_WINDOW_SECS, using default")
                }
            }
        }

        if let Ok(val) = std::env::var("AI_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.ai_timeout = Duration::from_secs(n),
                _ => tracing::warn!(value = %val, "Invalid AI_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    pub fn ai_configured(&self) -> bool {
        self.ai_api_key.is_some()
    }
}
