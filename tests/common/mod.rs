//! Shared test fixtures: an in-memory platform that records run calls,
//! plus builders for copilots, skills, and parameters.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::request::Parts;
use copilot_mcp::error::ServerError;
use copilot_mcp::platform::{
    Copilot, JsonObject, PlatformApi, PlatformError, Skill, SkillParameter, SkillRunResult,
};
use copilot_mcp::resolver::ClientFactory;
use rmcp::model::CallToolResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RunCall {
    pub copilot_id: String,
    pub skill_name: String,
    pub parameters: JsonObject,
}

pub struct MockPlatform {
    pub copilots: HashMap<String, Copilot>,
    pub skills: HashMap<String, Skill>,
    /// Skill ids whose metadata fetch fails.
    pub failing_skills: Vec<String>,
    pub connectable: bool,
    pub run_result: Mutex<SkillRunResult>,
    pub run_calls: Mutex<Vec<RunCall>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        MockPlatform {
            copilots: HashMap::new(),
            skills: HashMap::new(),
            failing_skills: Vec::new(),
            connectable: true,
            run_result: Mutex::new(SkillRunResult {
                success: true,
                error: None,
                data: Some(serde_json::json!({ "final_message": "done" })),
            }),
            run_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_copilot(mut self, copilot: Copilot, skills: Vec<Skill>) -> Self {
        for skill in skills {
            self.skills.insert(skill.copilot_skill_id.clone(), skill);
        }
        self.copilots.insert(copilot.copilot_id.clone(), copilot);
        self
    }

    pub fn with_failing_skill(mut self, skill_id: &str) -> Self {
        self.failing_skills.push(skill_id.to_string());
        self
    }

    pub fn set_run_result(&self, result: SkillRunResult) {
        *self.run_result.lock().unwrap() = result;
    }

    pub fn recorded_calls(&self) -> Vec<RunCall> {
        self.run_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn can_connect(&self) -> bool {
        self.connectable
    }

    async fn get_copilot(
        &self,
        copilot_id: &str,
    ) -> Result<Option<Copilot>, PlatformError> {
        Ok(self.copilots.get(copilot_id).cloned())
    }

    async fn get_skill(
        &self,
        _copilot_id: &str,
        skill_id: &str,
    ) -> Result<Option<Skill>, PlatformError> {
        if self.failing_skills.iter().any(|id| id == skill_id) {
            return Err(PlatformError::Api(format!("fetch of {} failed", skill_id)));
        }
        Ok(self.skills.get(skill_id).cloned())
    }

    async fn run_skill(
        &self,
        copilot_id: &str,
        skill_name: &str,
        parameters: JsonObject,
    ) -> Result<SkillRunResult, PlatformError> {
        self.run_calls.lock().unwrap().push(RunCall {
            copilot_id: copilot_id.to_string(),
            skill_name: skill_name.to_string(),
            parameters,
        });
        Ok(self.run_result.lock().unwrap().clone())
    }
}

/// Factory handing out a shared mock, or failing resolution outright.
pub struct MockFactory {
    api: Arc<MockPlatform>,
    fail_with_connectivity: bool,
}

impl MockFactory {
    pub fn new(api: Arc<MockPlatform>) -> Self {
        MockFactory {
            api,
            fail_with_connectivity: false,
        }
    }

    pub fn failing(api: Arc<MockPlatform>) -> Self {
        MockFactory {
            api,
            fail_with_connectivity: true,
        }
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn client(&self, _parts: Option<&Parts>) -> Result<Arc<dyn PlatformApi>, ServerError> {
        if self.fail_with_connectivity {
            return Err(ServerError::Connectivity("https://mock.invalid".into()));
        }
        Ok(self.api.clone())
    }
}

pub fn copilot(id: &str, skill_ids: &[&str]) -> Copilot {
    Copilot {
        copilot_id: id.to_string(),
        name: Some(format!("{} copilot", id)),
        description: None,
        copilot_skill_ids: skill_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn skill(id: &str, name: &str, parameters: Vec<SkillParameter>) -> Skill {
    Skill {
        copilot_skill_id: id.to_string(),
        name: name.to_string(),
        detailed_name: None,
        description: Some(format!("{} description", name)),
        detailed_description: None,
        scheduling_only: false,
        parameters,
    }
}

pub fn scheduling_only_skill(id: &str, name: &str) -> Skill {
    Skill {
        scheduling_only: true,
        ..skill(id, name, Vec::new())
    }
}

pub fn string_param(name: &str, required: bool) -> SkillParameter {
    SkillParameter {
        name: name.to_string(),
        required,
        parameter_type: "string".to_string(),
        is_multi: false,
        constrained_values: None,
        description: None,
    }
}

pub fn constrained_param(name: &str, required: bool, values: &[&str]) -> SkillParameter {
    SkillParameter {
        constrained_values: Some(values.iter().map(|v| v.to_string()).collect()),
        ..string_param(name, required)
    }
}

pub fn multi_param(name: &str, values: Option<&[&str]>) -> SkillParameter {
    SkillParameter {
        is_multi: true,
        constrained_values: values.map(|vs| vs.iter().map(|v| v.to_string()).collect()),
        ..string_param(name, false)
    }
}

/// Flatten a tool result's text content; goes through serde so the tests
/// stay independent of the SDK's exact content representation.
pub fn result_text(result: &CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap();
    value["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

pub fn is_error(result: &CallToolResult) -> bool {
    serde_json::to_value(result).unwrap()["isError"]
        .as_bool()
        .unwrap_or(false)
}
