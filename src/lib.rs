//! copilot-mcp - expose a copilot's skills as MCP tools.
//!
//! A bridge between an MCP host and an upstream analytics platform: it
//! discovers which skills a copilot exposes, derives a typed tool contract
//! per skill, and registers each as a callable tool. Two deployment modes:
//! - local: one pre-configured copilot and credential, tools registered
//!   once at startup
//! - remote: multi-tenant, the copilot and credential are resolved from
//!   each request and the tool set is rebuilt on every listing call

pub mod auth;
pub mod config;
pub mod contract;
pub mod error;
pub mod invoke;
pub mod platform;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod server;
pub mod skills;
