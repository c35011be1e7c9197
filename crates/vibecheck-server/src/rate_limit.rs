//! Per-caller sliding-window rate limiting for the AI gateway.
//!
//! The limiter is an injected component, not a module-level singleton:
//! it owns a map from caller id to recent request instants, admits a
//! request only when fewer than `max_requests` fall inside the window,
//! and compacts expired entries both on the hot path and from a
//! periodic purge task so memory stays bounded.
//!
//! Caller identity is the `x-user-id` header when present; anonymous
//! requests fall back to the client IP so one anonymous burst cannot
//! exhaust a shared bucket.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ServerError;

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Admit or reject a request from `caller` at this instant.
    pub async fn check(&self, caller: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let hits = windows.entry(caller.to_string()).or_default();

        hits.retain(|t| now.duration_since(*t) < self.window);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push(now);
        true
    }

    /// Drop expired instants and callers with no recent requests.
    pub async fn purge_stale(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, hits| {
            hits.retain(|t| now.duration_since(*t) < self.window);
            !hits.is_empty()
        });
    }

    /// Number of tracked callers (purge-task observability).
    pub async fn tracked_callers(&self) -> usize {
        self.windows.lock().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(20, Duration::from_secs(60))
    }
}

pub async fn rate_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let caller = caller_key(&req);

    if !limiter.check(&caller).await {
        warn!(caller = %caller, "rate limit exceeded");
        return Err(ServerError::RateLimited);
    }

    Ok(next.run(req).await)
}

/// Key the window per authenticated identity, falling back to client
/// IP, then a shared anonymous bucket.
fn caller_key<B>(req: &Request<B>) -> String {
    if let Some(user) = req.headers().get("x-user-id") {
        if let Ok(value) = user.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return format!("user:{value}");
            }
        }
    }

    if let Some(ip) = extract_client_ip(req) {
        return format!("ip:{ip}");
    }

    "anonymous".to_string()
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}
