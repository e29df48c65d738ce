//! Extraction of identity material from inbound HTTP requests.
//!
//! In multi-tenant mode every request carries its own identity: the bearer
//! credential in the `Authorization` header, the acting copilot in the
//! request path, and the upstream base URL in the request's own host.

use axum::http::{header, request::Parts, HeaderMap};

/// Path segment marking the tenant identifier: `/mcp/agent/{copilot_id}`.
pub const TENANT_PATH_MARKER: &str = "/agent/";

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the raw bearer credential from the `Authorization` header.
///
/// Header-name matching is case-insensitive (`HeaderMap` guarantees it);
/// the value must start with the literal `Bearer ` prefix.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix(BEARER_PREFIX).map(str::to_string)
}

/// Extract the copilot id from a request path.
///
/// Returns the path component immediately following the `/agent/` marker,
/// stopping at the next `/`. `None` means no tenant could be identified and
/// registration must be skipped.
pub fn copilot_id_from_path(path: &str) -> Option<&str> {
    let (_, rest) = path.split_once(TENANT_PATH_MARKER)?;
    let id = rest.split('/').next().unwrap_or("");
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Derive the upstream base URL from the inbound request's own host.
///
/// Requests are trusted to identify their own upstream; loopback hosts get
/// plain http, everything else https.
pub fn base_url_from_parts(parts: &Parts) -> Option<String> {
    let host = parts
        .uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            parts
                .headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })?;

    let scheme = if is_loopback_host(&host) { "http" } else { "https" };
    Some(format!("{}://{}", scheme, host))
}

pub fn is_loopback_host(host: &str) -> bool {
    // Bracketed IPv6 hosts carry colons of their own, so the port can
    // only be split off after the closing bracket is handled.
    let name = if let Some(rest) = host.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else if host.matches(':').count() > 1 {
        host
    } else {
        host.split(':').next().unwrap_or(host)
    };
    matches!(name, "127.0.0.1" | "localhost" | "::1")
}
