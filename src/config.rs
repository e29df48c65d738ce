//! Server configuration.
//!
//! All values arrive through the CLI or environment (see `main.rs`); this
//! module only carries the resolved settings and the URL-derivation rules.

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Single-tenant: one pre-configured copilot and credential, tools
    /// registered once at startup.
    Local,
    /// Multi-tenant: copilot and credential resolved from each request,
    /// tools re-registered per listing call.
    Remote,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: ServerMode,
    /// Platform base URL. In remote mode this is also the OAuth issuer.
    pub base_url: String,
    /// Static credential, required in local mode.
    pub api_token: Option<String>,
    /// Static copilot id, required in local mode.
    pub copilot_id: Option<String>,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn local(
        base_url: &str,
        api_token: &str,
        copilot_id: &str,
        host: &str,
        port: u16,
    ) -> Self {
        ServerConfig {
            mode: ServerMode::Local,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: Some(api_token.to_string()),
            copilot_id: Some(copilot_id.to_string()),
            host: host.to_string(),
            port,
        }
    }

    pub fn remote(base_url: &str, host: &str, port: u16) -> Self {
        ServerConfig {
            mode: ServerMode::Remote,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: None,
            copilot_id: None,
            host: host.to_string(),
            port,
        }
    }

    /// The platform is its own OAuth authorization server.
    pub fn auth_server_url(&self) -> &str {
        &self.base_url
    }

    /// URL this server is reachable at, derived from host and port: http
    /// for loopback hosts, https otherwise.
    pub fn resource_server_url(&self) -> String {
        let scheme = if crate::request::is_loopback_host(&self.host) {
            "http"
        } else {
            "https"
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
