//! Upstream data-platform client.
//!
//! The platform is an opaque external service reached over GraphQL-on-HTTP.
//! This module defines the wire types the pipeline consumes (copilots,
//! skills, parameters, run results), the [`PlatformApi`] seam the rest of
//! the crate is written against, and the concrete reqwest-backed
//! [`PlatformClient`].

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::debug;

/// JSON object map, the shape tool arguments travel in.
pub type JsonObject = serde_json::Map<String, JsonValue>;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Platform request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Platform returned errors: {0}")]
    Api(String),

    #[error("Malformed platform response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// A named bundle of skills, fetched fresh per registration cycle and
/// never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Copilot {
    pub copilot_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// The platform may return a single scalar id, a list, or nothing.
    #[serde(default, deserialize_with = "scalar_or_list")]
    pub copilot_skill_ids: Vec<String>,
}

/// One remotely executable operation with a declared parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub copilot_skill_id: String,
    /// Short name, used for the remote run call.
    pub name: String,
    pub detailed_name: Option<String>,
    pub description: Option<String>,
    pub detailed_description: Option<String>,
    /// Scheduling-only skills exist for internal scheduled execution and
    /// are never exposed as interactive tools.
    #[serde(default)]
    pub scheduling_only: bool,
    #[serde(default)]
    pub parameters: Vec<SkillParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_parameter_type")]
    pub parameter_type: String,
    /// Accepts a list of values rather than a single value.
    #[serde(default)]
    pub is_multi: bool,
    /// Finite set of permitted values, when the platform constrains them.
    #[serde(default)]
    pub constrained_values: Option<Vec<String>>,
    pub description: Option<String>,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

/// Result of a remote skill execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRunResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

impl SkillRunResult {
    /// Human-readable output of a successful run, if the platform sent one.
    pub fn final_message(&self) -> Option<&str> {
        self.data.as_ref()?.get("final_message")?.as_str()
    }
}

/// Accept a bare string, a list of strings, or null for id fields.
fn scalar_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScalarOrList {
        One(String),
        Many(Vec<String>),
        None,
    }

    Ok(match ScalarOrList::deserialize(deserializer)? {
        ScalarOrList::One(id) => vec![id],
        ScalarOrList::Many(ids) => ids,
        ScalarOrList::None => Vec::new(),
    })
}

/// The platform operations the pipeline consumes.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Connectivity probe against the resolved base URL.
    async fn can_connect(&self) -> bool;

    async fn get_copilot(&self, copilot_id: &str) -> Result<Option<Copilot>>;

    async fn get_skill(&self, copilot_id: &str, skill_id: &str) -> Result<Option<Skill>>;

    async fn run_skill(
        &self,
        copilot_id: &str,
        skill_name: &str,
        parameters: JsonObject,
    ) -> Result<SkillRunResult>;
}

const GET_COPILOT_QUERY: &str = r#"
query GetCopilot($copilotId: UUID!) {
  getCopilot(copilotId: $copilotId, usePublishedVersion: true) {
    copilotId
    name
    description
    copilotSkillIds
  }
}"#;

const GET_SKILL_QUERY: &str = r#"
query GetCopilotSkill($copilotId: UUID!, $copilotSkillId: UUID!) {
  getCopilotSkill(
    copilotId: $copilotId
    copilotSkillId: $copilotSkillId
    usePublishedVersion: true
  ) {
    copilotSkillId
    name
    detailedName
    description
    detailedDescription
    schedulingOnly
    parameters {
      name
      required
      parameterType
      isMulti
      constrainedValues
      description
    }
  }
}"#;

const RUN_SKILL_MUTATION: &str = r#"
mutation RunCopilotSkill($copilotId: UUID!, $skillName: String!, $parameters: JSON) {
  runCopilotSkill(copilotId: $copilotId, skillName: $skillName, parameters: $parameters) {
    success
    error
    data
  }
}"#;

const PING_QUERY: &str = "query { ping }";

/// Concrete GraphQL-over-HTTP client, one per resolved (base URL, credential)
/// pair. Cheap to construct; the registration pipeline builds one per cycle.
#[derive(Clone)]
pub struct PlatformClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl PlatformClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        PlatformClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn graphql(&self, query: &str, variables: JsonValue) -> Result<JsonValue> {
        let response = self
            .http
            .post(format!("{}/api/graphql", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let mut body: JsonValue = response.json().await?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(PlatformError::Api(errors.to_string()));
        }

        Ok(body.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null))
    }
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn can_connect(&self) -> bool {
        match self.graphql(PING_QUERY, json!({})).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Connectivity probe against {} failed: {}", self.base_url, e);
                false
            }
        }
    }

    async fn get_copilot(&self, copilot_id: &str) -> Result<Option<Copilot>> {
        let data = self
            .graphql(GET_COPILOT_QUERY, json!({ "copilotId": copilot_id }))
            .await?;
        let copilot = data.get("getCopilot").cloned().unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(copilot)?)
    }

    async fn get_skill(&self, copilot_id: &str, skill_id: &str) -> Result<Option<Skill>> {
        let data = self
            .graphql(
                GET_SKILL_QUERY,
                json!({ "copilotId": copilot_id, "copilotSkillId": skill_id }),
            )
            .await?;
        let skill = data
            .get("getCopilotSkill")
            .cloned()
            .unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(skill)?)
    }

    async fn run_skill(
        &self,
        copilot_id: &str,
        skill_name: &str,
        parameters: JsonObject,
    ) -> Result<SkillRunResult> {
        let data = self
            .graphql(
                RUN_SKILL_MUTATION,
                json!({
                    "copilotId": copilot_id,
                    "skillName": skill_name,
                    "parameters": parameters,
                }),
            )
            .await?;
        let result = data
            .get("runCopilotSkill")
            .cloned()
            .unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(result)?)
    }
}
