//! MCP server façade using the official rmcp SDK.
//!
//! Binds the registry and invocation pipeline to the protocol. In local
//! mode `tools/list` returns the statically registered set; in remote mode
//! every `tools/list` re-runs the registration pipeline keyed by the
//! copilot id in the request path: resolve tenant, clear the table, fetch
//! and rebuild, return the listing. `tools/call` dispatches to the
//! registered contract and never surfaces an unhandled error.

use crate::config::{ServerConfig, ServerMode};
use crate::invoke::{invoke_skill, Notices};
use crate::registry::ToolRegistry;
use crate::request::copilot_id_from_path;
use crate::resolver::ClientFactory;
use axum::http::request::Parts;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before the best-effort tools-changed notification after a dynamic
/// registration cycle.
const TOOL_REFRESH_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CopilotServer {
    config: Arc<ServerConfig>,
    factory: Arc<dyn ClientFactory>,
    registry: Arc<ToolRegistry>,
    /// Display name reported to clients; the copilot name in local mode.
    server_name: String,
}

impl CopilotServer {
    pub fn new(
        config: ServerConfig,
        factory: Arc<dyn ClientFactory>,
        registry: Arc<ToolRegistry>,
        server_name: impl Into<String>,
    ) -> Self {
        CopilotServer {
            config: Arc::new(config),
            factory,
            registry,
            server_name: server_name.into(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Resolve the acting copilot id: the request path in remote mode,
    /// static configuration in local mode.
    fn resolve_copilot_id(&self, parts: Option<&Parts>) -> Option<String> {
        match self.config.mode {
            ServerMode::Remote => parts
                .and_then(|p| copilot_id_from_path(p.uri.path()))
                .map(str::to_string)
                .or_else(|| self.config.copilot_id.clone()),
            ServerMode::Local => self.config.copilot_id.clone(),
        }
    }

    /// Dynamic registration cycle for one listing request.
    async fn dynamic_list(&self, context: &RequestContext<RoleServer>) -> Vec<rmcp::model::Tool> {
        let parts = context.extensions.get::<Parts>();
        let copilot_id = self.resolve_copilot_id(parts);

        let Some(copilot_id) = copilot_id else {
            warn!("No copilot id available for tool registration");
            // The clear still runs: an unidentified caller must not see a
            // stale tenant's tools.
            return self.registry.refresh_for_tenant(None, None).await;
        };

        let api = match self.factory.client(parts).await {
            Ok(api) => api,
            Err(e) => {
                warn!("Failed to resolve platform client: {}", e);
                return self.registry.refresh_for_tenant(None, None).await;
            }
        };

        let tools = self
            .registry
            .refresh_for_tenant(Some(api.as_ref()), Some(&copilot_id))
            .await;

        // Best-effort delayed refresh signal, detached from this request.
        let peer = context.peer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TOOL_REFRESH_DELAY).await;
            if peer.notify_tool_list_changed().await.is_ok() {
                debug!("Sent delayed tool list refresh notification");
            }
        });

        tools
    }
}

impl ServerHandler for CopilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                title: Some(self.server_name.clone()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Exposes the skills of a copilot as callable tools. \
                Each tool runs one remote skill; list tools to discover the \
                skills available to the active copilot."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = match self.config.mode {
            ServerMode::Local => self.registry.list().await,
            ServerMode::Remote => self.dynamic_list(&context).await,
        };

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(entry) = self.registry.find(&request.name).await else {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ));
        };

        let parts = context.extensions.get::<Parts>();
        let notices = Notices::new(context.peer.clone());

        let copilot_id = self
            .resolve_copilot_id(parts)
            .unwrap_or_else(|| entry.copilot_id.clone());

        Ok(invoke_skill(
            self.factory.as_ref(),
            parts,
            &copilot_id,
            &entry.contract,
            request.arguments.as_ref(),
            &notices,
        )
        .await)
    }
}
