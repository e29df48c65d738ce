//! Skill invocation.
//!
//! The executable half of a tool contract: validate supplied arguments,
//! resolve the acting client and copilot at call time, run the remote
//! skill, and map its result onto the protocol response. Every invocation
//! terminates with either a value or a descriptive failure message; nothing
//! here propagates to the protocol layer.

use crate::contract::ToolContract;
use crate::error::ServerError;
use crate::platform::JsonObject;
use crate::resolver::ClientFactory;
use axum::http::request::Parts;
use rmcp::model::{CallToolResult, Content, LoggingLevel, LoggingMessageNotificationParam};
use rmcp::service::{Peer, RoleServer};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

/// Advisory progress notices emitted to the calling session.
///
/// Best-effort: a failed or absent channel never affects the invocation.
#[derive(Clone, Default)]
pub struct Notices {
    peer: Option<Peer<RoleServer>>,
}

impl Notices {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Notices { peer: Some(peer) }
    }

    pub fn none() -> Self {
        Notices { peer: None }
    }

    pub async fn info(&self, text: impl Into<String>) {
        self.send(LoggingLevel::Info, text.into()).await;
    }

    pub async fn debug(&self, text: impl Into<String>) {
        self.send(LoggingLevel::Debug, text.into()).await;
    }

    pub async fn error(&self, text: impl Into<String>) {
        self.send(LoggingLevel::Error, text.into()).await;
    }

    async fn send(&self, level: LoggingLevel, text: String) {
        if let Some(peer) = &self.peer {
            let _ = peer
                .notify_logging_message(LoggingMessageNotificationParam {
                    level,
                    logger: Some("copilot-mcp".to_string()),
                    data: json!(text),
                })
                .await;
        }
    }
}

/// Validate and process arguments against a contract.
///
/// Missing required parameters and out-of-set values fail with a
/// [`ServerError::Validation`] naming the parameter; null-valued optional
/// arguments are dropped, never forwarded; a bare scalar supplied for a
/// multi parameter is wrapped in a single-element list before membership
/// checking.
pub fn validate_arguments(
    contract: &ToolContract,
    arguments: Option<&JsonObject>,
) -> Result<JsonObject, ServerError> {
    let empty = JsonObject::new();
    let supplied = arguments.unwrap_or(&empty);
    let mut validated = JsonObject::new();

    for param in &contract.parameters {
        let value = match supplied.get(&param.name) {
            Some(JsonValue::Null) | None => {
                if param.required && !supplied.contains_key(&param.name) {
                    return Err(ServerError::Validation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                continue;
            }
            Some(value) => value.clone(),
        };

        let value = if param.multi && !value.is_array() {
            JsonValue::Array(vec![value])
        } else {
            value
        };

        if let Some(allowed) = &param.constrained_values {
            check_membership(&param.name, &value, allowed)?;
        }

        validated.insert(param.name.clone(), value);
    }

    Ok(validated)
}

fn check_membership(
    name: &str,
    value: &JsonValue,
    allowed: &[String],
) -> Result<(), ServerError> {
    let is_allowed = |v: &JsonValue| v.as_str().is_some_and(|s| allowed.iter().any(|a| a == s));

    match value {
        JsonValue::Array(items) => {
            let invalid: Vec<String> = items
                .iter()
                .filter(|v| !is_allowed(v))
                .map(JsonValue::to_string)
                .collect();
            if !invalid.is_empty() {
                return Err(ServerError::Validation(format!(
                    "Invalid values for {}: {:?}. Allowed values: {:?}",
                    name, invalid, allowed
                )));
            }
        }
        single => {
            if !is_allowed(single) {
                return Err(ServerError::Validation(format!(
                    "Invalid value for {}: {}. Allowed values: {:?}",
                    name, single, allowed
                )));
            }
        }
    }
    Ok(())
}

/// Execute one tool invocation end to end.
///
/// Argument validation runs before any client is resolved, so a validation
/// failure never issues a remote call. All failure modes come back as an
/// error-shaped [`CallToolResult`], never as an `Err`.
pub async fn invoke_skill(
    factory: &dyn ClientFactory,
    parts: Option<&Parts>,
    copilot_id: &str,
    contract: &ToolContract,
    arguments: Option<&JsonObject>,
    notices: &Notices,
) -> CallToolResult {
    notices
        .info(format!("Executing skill: {}", contract.skill_name))
        .await;

    let validated = match validate_arguments(contract, arguments) {
        Ok(args) => args,
        Err(e) => {
            notices.error(e.to_string()).await;
            return failure(e.to_string());
        }
    };

    if !validated.is_empty() {
        notices
            .debug(format!("Using parameters: {:?}", validated))
            .await;
    }

    notices.info("Connecting to platform...").await;
    let api = match factory.client(parts).await {
        Ok(api) => api,
        Err(e) => {
            notices.error(e.to_string()).await;
            return failure(e.to_string());
        }
    };

    notices.info("Running skill...").await;
    let result = match api
        .run_skill(copilot_id, &contract.skill_name, validated)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            let message = format!("Error running skill {}: {}", contract.skill_name, e);
            notices.error(message.clone()).await;
            return failure(message);
        }
    };

    if !result.success {
        let message = result
            .error
            .unwrap_or_else(|| "Skill execution failed".to_string());
        notices
            .error(format!("Skill execution failed: {}", message))
            .await;
        return failure(message);
    }

    notices.info("Skill executed successfully").await;
    debug!("Skill {} completed", contract.skill_name);

    let text = result
        .final_message()
        .unwrap_or("No data returned from skill")
        .to_string();
    CallToolResult::success(vec![Content::text(text)])
}

fn failure(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}
