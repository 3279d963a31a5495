//! Bearer-token protection for the trigger endpoint

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Token callers must present (None = auth disabled)
    pub trigger_token: Option<String>,
}

impl AuthConfig {
    /// Load auth config from TRIGGER_TOKEN
    pub fn from_env() -> Self {
        let trigger_token = std::env::var("TRIGGER_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if trigger_token.is_some() {
            tracing::info!("Trigger authentication enabled");
        } else {
            tracing::warn!("Trigger authentication DISABLED - anyone can advance leagues!");
        }
        Self { trigger_token }
    }

    pub fn is_enabled(&self) -> bool {
        self.trigger_token.is_some()
    }

    pub fn validate(&self, token: &str) -> bool {
        match &self.trigger_token {
            // Use constant-time comparison to prevent timing attacks
            Some(expected) => constant_time_eq(expected.as_bytes(), token.as_bytes()),
            None => true,
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Middleware requiring `Authorization: Bearer <TRIGGER_TOKEN>`
pub async fn trigger_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    if let Some(token) = bearer_token(&request) {
        if auth_config.validate(token) {
            return next.run(request).await;
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        "Unauthorized",
    )
        .into_response()
}
