//! copilot-mcp CLI
//!
//! Entry point for the copilot MCP server. Supports:
//! - local: single-tenant server bound to one copilot (stdio or HTTP)
//! - remote: multi-tenant HTTP server with bearer-token introspection
//! - validate: probe the platform and list the skills a copilot exposes

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use copilot_mcp::auth::{require_bearer, IntrospectionVerifier};
use copilot_mcp::config::ServerConfig;
use copilot_mcp::contract::ToolContract;
use copilot_mcp::platform::{PlatformApi, PlatformClient};
use copilot_mcp::registry::ToolRegistry;
use copilot_mcp::resolver::PlatformClientFactory;
use copilot_mcp::server::CopilotServer;
use copilot_mcp::skills::fetch_skills;
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "copilot-mcp")]
#[command(about = "Expose a copilot's skills as MCP tools", long_about = None)]
struct Cli {
    /// Platform base URL
    #[arg(long, env = "COPILOT_BASE_URL")]
    base_url: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run single-tenant, bound to one copilot and credential
    Local {
        /// Platform API token
        #[arg(long, env = "COPILOT_API_TOKEN")]
        api_token: String,

        /// Copilot whose skills are exposed
        #[arg(long, env = "COPILOT_ID")]
        copilot_id: String,

        /// Transport to serve on
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,

        /// Listen host (HTTP transport)
        #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Listen port (HTTP transport)
        #[arg(long, env = "MCP_PORT", default_value_t = 9090)]
        port: u16,
    },

    /// Run multi-tenant over HTTP, resolving the copilot per request
    Remote {
        /// Listen host
        #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Listen port
        #[arg(long, env = "MCP_PORT", default_value_t = 9090)]
        port: u16,
    },

    /// Probe the platform and list the skills a copilot exposes
    Validate {
        #[arg(long, env = "COPILOT_API_TOKEN")]
        api_token: String,

        #[arg(long, env = "COPILOT_ID")]
        copilot_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Local {
            api_token,
            copilot_id,
            transport,
            host,
            port,
        } => {
            let config = ServerConfig::local(&cli.base_url, &api_token, &copilot_id, &host, port);
            run_local(config, transport).await
        }

        Commands::Remote { host, port } => {
            let config = ServerConfig::remote(&cli.base_url, &host, port);
            run_remote(config).await
        }

        Commands::Validate {
            api_token,
            copilot_id,
        } => validate(&cli.base_url, &api_token, &copilot_id).await,
    }
}

/// Single-tenant startup: connectivity and configuration failures here are
/// fatal with a non-zero exit.
async fn run_local(config: ServerConfig, transport: Transport) -> Result<()> {
    let client = PlatformClient::new(&config.base_url, config.api_token.as_deref().unwrap_or(""));
    if !client.can_connect().await {
        bail!(
            "Cannot connect to platform at {}. Check COPILOT_BASE_URL and COPILOT_API_TOKEN",
            config.base_url
        );
    }

    let copilot_id = config
        .copilot_id
        .clone()
        .context("Copilot ID is required for local mode")?;
    let copilot = client
        .get_copilot(&copilot_id)
        .await?
        .with_context(|| format!("Copilot {} not found", copilot_id))?;
    let server_name = copilot.name.clone().unwrap_or_else(|| copilot_id.clone());

    let registry = Arc::new(ToolRegistry::new());
    let count = registry.register_static(&client, &copilot_id).await?;
    info!("Serving {} tools for copilot {}", count, server_name);

    let factory = Arc::new(PlatformClientFactory::new(config.clone()));
    let server = CopilotServer::new(config.clone(), factory, registry, server_name);

    match transport {
        Transport::Stdio => {
            eprintln!("Mode: local (stdio)");
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
        }
        Transport::Http => {
            eprintln!("Mode: local (http)");
            serve_http(server, &config, None).await?;
        }
    }

    Ok(())
}

/// Multi-tenant startup: only the base URL is required; callers supply
/// their own credentials and copilot id on every request.
async fn run_remote(config: ServerConfig) -> Result<()> {
    let verifier = Arc::new(IntrospectionVerifier::new(config.auth_server_url()));

    let registry = Arc::new(ToolRegistry::new());
    let factory = Arc::new(PlatformClientFactory::new(config.clone()));
    let server = CopilotServer::new(config.clone(), factory, registry, "Copilot MCP Server");

    eprintln!("Mode: remote");
    eprintln!("Auth server: {}", config.auth_server_url());
    eprintln!("Resource server: {}", config.resource_server_url());

    serve_http(server, &config, Some(verifier)).await
}

async fn serve_http(
    server: CopilotServer,
    config: &ServerConfig,
    verifier: Option<Arc<IntrospectionVerifier>>,
) -> Result<()> {
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager,
        tower::{StreamableHttpServerConfig, StreamableHttpService},
    };

    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let mut mcp_router = axum::Router::new().fallback_service(mcp_service);
    if let Some(verifier) = verifier {
        mcp_router = mcp_router.layer(axum::middleware::from_fn_with_state(
            verifier,
            require_bearer,
        ));
    }

    let app = axum::Router::new()
        .nest("/mcp", mcp_router)
        .layer(tower_http::cors::CorsLayer::permissive());

    let bind = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("HTTP server listening on {}", bind);
    eprintln!("MCP endpoint: http://{}/mcp", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}

/// Connection check plus a dry run of contract building, so a broken skill
/// shows up before the server is wired into a host.
async fn validate(base_url: &str, api_token: &str, copilot_id: &str) -> Result<()> {
    let client = PlatformClient::new(base_url, api_token);

    if !client.can_connect().await {
        bail!("Cannot connect to platform at {}", base_url);
    }
    eprintln!("✓ Connected to {}", client.base_url());

    let copilot = client
        .get_copilot(copilot_id)
        .await?
        .with_context(|| format!("Copilot {} not found", copilot_id))?;

    eprintln!(
        "✓ Copilot: {} ({})",
        copilot.name.as_deref().unwrap_or(copilot_id),
        copilot_id
    );
    if let Some(description) = &copilot.description {
        eprintln!("  {}", description);
    }

    let skills = fetch_skills(&client, copilot_id).await?;
    eprintln!("\n{} skill(s) would be exposed:", skills.len());

    for skill in &skills {
        match ToolContract::from_skill(skill) {
            Ok(contract) => {
                eprintln!(
                    "  • {} ({} parameter(s))",
                    contract.tool_name,
                    contract.parameters.len()
                );
            }
            Err(e) => {
                eprintln!("  ✗ {}: {}", skill.name, e);
            }
        }
    }

    Ok(())
}
