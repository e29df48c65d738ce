//! Tool registry.
//!
//! Owns the process-wide tool table. Two regimes: static (single-tenant,
//! one registration pass at startup, tools persist for the process
//! lifetime) and dynamic (multi-tenant, clear-then-rebuild on every listing
//! call). The table is guarded by one async mutex held across the whole
//! clear/rebuild critical section, awaited fetch included, so two
//! concurrent listing calls can never interleave and expose a mix of two
//! tenants' tools.

use crate::contract::ToolContract;
use crate::error::ServerError;
use crate::platform::PlatformApi;
use crate::skills::fetch_skills;
use rmcp::model::Tool;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// One registered tool: the contract plus the copilot it was built for.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub contract: ToolContract,
    pub copilot_id: String,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<Vec<RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry::default()
    }

    /// Static regime: one fetch-and-register pass. Errors propagate so a
    /// single-tenant startup can treat them as fatal.
    pub async fn register_static(
        &self,
        api: &dyn PlatformApi,
        copilot_id: &str,
    ) -> Result<usize, ServerError> {
        let skills = fetch_skills(api, copilot_id).await?;

        let mut tools = self.tools.lock().await;
        tools.clear();
        register_into(&mut tools, &skills, copilot_id);

        info!(
            "Registered {} skills for copilot {}",
            tools.len(),
            copilot_id
        );
        Ok(tools.len())
    }

    /// Dynamic regime: clear all registered tools, then rebuild for the
    /// resolved tenant. Called on every listing request.
    ///
    /// The clear happens even when no tenant or client resolved, so a
    /// stale tenant's tools are never served to an unidentified caller.
    /// Fetch failures leave the table empty rather than erroring the
    /// listing.
    pub async fn refresh_for_tenant(
        &self,
        api: Option<&dyn PlatformApi>,
        copilot_id: Option<&str>,
    ) -> Vec<Tool> {
        let mut tools = self.tools.lock().await;
        tools.clear();
        debug!("Cleared all tools from registry");

        let (Some(api), Some(copilot_id)) = (api, copilot_id) else {
            return Vec::new();
        };

        match fetch_skills(api, copilot_id).await {
            Ok(skills) if skills.is_empty() => {
                warn!("No skills found for copilot {}", copilot_id);
            }
            Ok(skills) => {
                register_into(&mut tools, &skills, copilot_id);
                info!(
                    "Registered {} skills for copilot {}",
                    tools.len(),
                    copilot_id
                );
            }
            Err(e) => {
                error!("Failed to fetch skills for copilot {}: {}", copilot_id, e);
            }
        }

        tools.iter().map(|t| t.contract.to_tool()).collect()
    }

    /// Protocol-facing snapshot of the current tool set.
    pub async fn list(&self) -> Vec<Tool> {
        let tools = self.tools.lock().await;
        tools.iter().map(|t| t.contract.to_tool()).collect()
    }

    pub async fn find(&self, tool_name: &str) -> Option<RegisteredTool> {
        let tools = self.tools.lock().await;
        tools.iter().find(|t| t.contract.tool_name == tool_name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tools.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.lock().await.is_empty()
    }
}

/// Build contracts and append them to the table. A skill whose contract
/// cannot be built is logged and skipped; the rest still register.
fn register_into(tools: &mut Vec<RegisteredTool>, skills: &[crate::platform::Skill], copilot_id: &str) {
    for skill in skills {
        match ToolContract::from_skill(skill) {
            Ok(contract) => {
                debug!("Registered tool: {}", contract.tool_name);
                tools.push(RegisteredTool {
                    contract,
                    copilot_id: copilot_id.to_string(),
                });
            }
            Err(e) => {
                error!("Failed to register skill {}: {}", skill.name, e);
            }
        }
    }
}
