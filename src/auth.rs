//! Bearer-token verification via OAuth 2.0 Token Introspection (RFC 7662).
//!
//! Multi-tenant mode authenticates every HTTP request against the
//! platform's introspection endpoint before it reaches the MCP layer. The
//! platform is its own authorization server, so the endpoint is derived
//! from the configured base URL.

use crate::request::bearer_token;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const INTROSPECTION_PATH: &str = "/api/oauth2/introspect";

/// Scopes a caller must hold to list and execute copilot skills.
pub const REQUIRED_SCOPES: &[&str] = &[
    "read:copilots",
    "read:copilotSkills",
    "execute:copilotSkills",
];

/// Claims of a verified access token.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<i64>,
}

#[derive(Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

pub struct IntrospectionVerifier {
    endpoint: String,
    required_scopes: Vec<String>,
    http: reqwest::Client,
}

impl IntrospectionVerifier {
    pub fn new(auth_server_url: &str) -> Self {
        IntrospectionVerifier {
            endpoint: format!(
                "{}{}",
                auth_server_url.trim_end_matches('/'),
                INTROSPECTION_PATH
            ),
            required_scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            http: reqwest::Client::new(),
        }
    }

    /// Verify a token via the introspection endpoint. `None` means the
    /// token is missing a claim, inactive, or the endpoint rejected it.
    pub async fn verify(&self, token: &str) -> Option<AccessClaims> {
        if !self.endpoint_is_safe() {
            warn!(
                "Rejecting introspection endpoint with unsafe scheme: {}",
                self.endpoint
            );
            return None;
        }

        let response = match self
            .http
            .post(&self.endpoint)
            .form(&[("token", token)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Token introspection failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Token introspection returned status {}", response.status());
            return None;
        }

        let data: IntrospectionResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Malformed introspection response: {}", e);
                return None;
            }
        };

        if !data.active {
            return None;
        }

        let scopes: Vec<String> = data
            .scope
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if !self
            .required_scopes
            .iter()
            .all(|required| scopes.iter().any(|s| s == required))
        {
            debug!("Token missing required scopes: {:?}", self.required_scopes);
            return None;
        }

        Some(AccessClaims {
            client_id: data.client_id.unwrap_or_else(|| "unknown".to_string()),
            scopes,
            expires_at: data.exp,
        })
    }

    /// TLS required except for loopback development targets.
    fn endpoint_is_safe(&self) -> bool {
        endpoint_is_safe(&self.endpoint)
    }
}

/// Plain http is only acceptable against an actual loopback host, matched
/// on the parsed host rather than a string prefix so names like
/// `localhost.evil.com` do not qualify.
fn endpoint_is_safe(endpoint: &str) -> bool {
    if endpoint.starts_with("https://") {
        return true;
    }
    let Some(rest) = endpoint.strip_prefix("http://") else {
        return false;
    };
    let host = rest.split('/').next().unwrap_or(rest);
    crate::request::is_loopback_host(host)
}

/// axum middleware rejecting requests without a verifiable bearer token.
pub async fn require_bearer(
    State(verifier): State<Arc<IntrospectionVerifier>>,
    request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers());

    match token {
        Some(token) if verifier.verify(&token).await.is_some() => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            "invalid or missing bearer token",
        )
            .into_response(),
    }
}
