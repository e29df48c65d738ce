//! Identity and client resolution.
//!
//! Given either static configuration or the in-flight request, produce a
//! validated platform client handle. The factory trait is the seam the
//! invocation pipeline is written against; tests substitute a recording
//! platform behind a stub factory.

use crate::config::{ServerConfig, ServerMode};
use crate::error::ServerError;
use crate::platform::{PlatformApi, PlatformClient};
use crate::request;
use async_trait::async_trait;
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::debug;

/// Produces a platform client for one invocation or registration cycle.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Resolve a client from the request parts (multi-tenant) or static
    /// configuration (single-tenant).
    ///
    /// Fails with [`ServerError::Configuration`] when no credential can be
    /// found and with [`ServerError::Connectivity`] when the probe against
    /// the resolved base URL does not succeed.
    async fn client(&self, parts: Option<&Parts>) -> Result<Arc<dyn PlatformApi>, ServerError>;
}

/// Production factory backed by [`PlatformClient`].
pub struct PlatformClientFactory {
    config: ServerConfig,
}

impl PlatformClientFactory {
    pub fn new(config: ServerConfig) -> Self {
        PlatformClientFactory { config }
    }

    fn resolve_token(&self, parts: Option<&Parts>) -> Option<String> {
        parts
            .and_then(|p| request::bearer_token(&p.headers))
            .or_else(|| self.config.api_token.clone())
    }

    fn resolve_base_url(&self, parts: Option<&Parts>) -> String {
        if self.config.mode == ServerMode::Remote {
            if let Some(url) = parts.and_then(request::base_url_from_parts) {
                return url;
            }
        }
        self.config.base_url.clone()
    }
}

#[async_trait]
impl ClientFactory for PlatformClientFactory {
    async fn client(&self, parts: Option<&Parts>) -> Result<Arc<dyn PlatformApi>, ServerError> {
        let token = self.resolve_token(parts).ok_or_else(|| {
            ServerError::Configuration("no bearer credential available for platform client".into())
        })?;
        let base_url = self.resolve_base_url(parts);

        debug!("Resolving platform client against {}", base_url);
        let client = PlatformClient::new(&base_url, &token);

        if !client.can_connect().await {
            return Err(ServerError::Connectivity(base_url));
        }

        Ok(Arc::new(client))
    }
}
