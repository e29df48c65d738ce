//! Skill-to-tool contract building.
//!
//! Transforms one skill's fetched metadata into a reusable, typed
//! invocation contract: parameter names, required flags, primitive kinds,
//! permitted value sets. Pure and deterministic; contracts are rebuilt
//! every time a skill is discovered and live exactly as long as the
//! registered tool does.

use crate::error::ServerError;
use crate::platform::{JsonObject, Skill};
use rmcp::model::{Tool, ToolAnnotations};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Closed set of primitive parameter kinds.
///
/// A tagged descriptor rather than a dynamically built signature: the
/// validator and the JSON-schema materialization both consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    /// Map a skill's declared type descriptor onto the closed set.
    ///
    /// Unknown descriptors are a loud error: an un-typeable parameter
    /// breaks the typed invocation signature downstream.
    pub fn from_source(parameter: &str, source_type: &str) -> Result<Self, ServerError> {
        match source_type.to_ascii_lowercase().as_str() {
            "string" | "text" | "str" => Ok(ParamKind::String),
            "number" | "float" | "decimal" | "double" => Ok(ParamKind::Number),
            "integer" | "int" | "long" => Ok(ParamKind::Integer),
            "boolean" | "bool" => Ok(ParamKind::Boolean),
            _ => Err(ServerError::UnsupportedParameterType {
                parameter: parameter.to_string(),
                source_type: source_type.to_string(),
            }),
        }
    }

    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One parameter of a tool contract.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
    pub kind: ParamKind,
    /// Accepts a list of values; a bare scalar is wrapped at call time.
    pub multi: bool,
    pub constrained_values: Option<Vec<String>>,
    pub description: Option<String>,
}

/// Typed invocation contract derived 1:1 from a skill.
#[derive(Debug, Clone)]
pub struct ToolContract {
    /// Identifier-safe tool name exposed over the protocol.
    pub tool_name: String,
    pub title: String,
    pub description: String,
    /// Short skill name, used for the remote run call.
    pub skill_name: String,
    pub skill_id: String,
    pub scheduling_only: bool,
    pub parameters: Vec<ParamSpec>,
}

impl ToolContract {
    pub fn from_skill(skill: &Skill) -> Result<Self, ServerError> {
        let parameters = skill
            .parameters
            .iter()
            .map(|p| {
                Ok(ParamSpec {
                    name: p.name.clone(),
                    required: p.required,
                    kind: ParamKind::from_source(&p.name, &p.parameter_type)?,
                    multi: p.is_multi,
                    constrained_values: p.constrained_values.clone(),
                    description: p.description.clone(),
                })
            })
            .collect::<Result<Vec<_>, ServerError>>()?;

        let title = skill
            .detailed_name
            .clone()
            .unwrap_or_else(|| skill.name.clone());
        let description = skill
            .detailed_description
            .clone()
            .or_else(|| skill.description.clone())
            .unwrap_or_else(|| skill.name.clone());

        Ok(ToolContract {
            tool_name: normalize_tool_name(&skill.name),
            title,
            description,
            skill_name: skill.name.clone(),
            skill_id: skill.copilot_skill_id.clone(),
            scheduling_only: skill.scheduling_only,
            parameters,
        })
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = JsonObject::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut value_schema = json!({ "type": param.kind.json_type() });
            if let Some(values) = &param.constrained_values {
                value_schema["enum"] = json!(values);
            }

            let mut schema = if param.multi {
                json!({ "type": "array", "items": value_schema })
            } else {
                value_schema
            };
            if let Some(desc) = &param.description {
                schema["description"] = json!(desc);
            }

            properties.insert(param.name.clone(), schema);
            if param.required {
                required.push(JsonValue::from(param.name.clone()));
            }
        }

        let mut schema = JsonObject::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), JsonValue::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), JsonValue::Array(required));
        }
        schema.insert("additionalProperties".into(), json!(false));
        schema
    }

    /// Capability hints for the registered tool. Skills are read-only
    /// queries unless flagged scheduling-only, never destructive, and
    /// interact with external data sources.
    pub fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations {
            title: Some(self.title.clone()),
            read_only_hint: Some(!self.scheduling_only),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        }
    }

    /// Materialize the protocol-facing tool definition.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.tool_name.clone().into(),
            title: Some(self.title.clone()),
            description: Some(self.description.clone().into()),
            input_schema: Arc::new(self.input_schema()),
            output_schema: None,
            annotations: Some(self.annotations()),
            icons: None,
            meta: None,
        }
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Identifier-safe transform of a skill's short name.
///
/// Lowercases, maps any non-alphanumeric run to a single underscore, and
/// trims leading/trailing underscores. Collisions between two skills after
/// normalization are a configuration error upstream of this crate.
pub fn normalize_tool_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_underscore = false;
        } else if !last_underscore && !out.is_empty() {
            out.push('_');
            last_underscore = true;
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
