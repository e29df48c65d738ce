//! Tests for invocation: argument validation and end-to-end skill runs

mod common;

use common::{
    constrained_param, copilot, is_error, multi_param, result_text, skill, string_param,
    MockFactory, MockPlatform,
};
use copilot_mcp::contract::ToolContract;
use copilot_mcp::invoke::{invoke_skill, validate_arguments, Notices};
use copilot_mcp::platform::{JsonObject, SkillRunResult};
use serde_json::json;
use std::sync::Arc;

fn args(pairs: &[(&str, serde_json::Value)]) -> JsonObject {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn region_contract() -> ToolContract {
    let s = skill(
        "sk-1",
        "forecast",
        vec![constrained_param("region", true, &["east", "west"])],
    );
    ToolContract::from_skill(&s).unwrap()
}

#[test]
fn test_missing_required_parameter_names_it() {
    let err = validate_arguments(&region_contract(), None).unwrap_err();
    assert!(err.to_string().contains("region"), "got: {err}");
}

#[test]
fn test_constrained_value_in_set_passes() {
    let supplied = args(&[("region", json!("west"))]);
    let validated = validate_arguments(&region_contract(), Some(&supplied)).unwrap();
    assert_eq!(validated["region"], json!("west"));
}

#[test]
fn test_constrained_value_out_of_set_fails() {
    let supplied = args(&[("region", json!("north"))]);
    let err = validate_arguments(&region_contract(), Some(&supplied)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("region"), "got: {msg}");
    assert!(msg.contains("north"), "got: {msg}");
}

#[test]
fn test_multi_parameter_wraps_bare_scalar() {
    let s = skill("sk-1", "forecast", vec![multi_param("metrics", None)]);
    let contract = ToolContract::from_skill(&s).unwrap();

    let supplied = args(&[("metrics", json!("revenue"))]);
    let validated = validate_arguments(&contract, Some(&supplied)).unwrap();
    assert_eq!(validated["metrics"], json!(["revenue"]));
}

#[test]
fn test_multi_membership_checked_after_wrapping() {
    let s = skill(
        "sk-1",
        "forecast",
        vec![multi_param("metrics", Some(&["revenue", "units"]))],
    );
    let contract = ToolContract::from_skill(&s).unwrap();

    let ok = args(&[("metrics", json!("units"))]);
    assert!(validate_arguments(&contract, Some(&ok)).is_ok());

    let bad = args(&[("metrics", json!(["revenue", "margin"]))]);
    let err = validate_arguments(&contract, Some(&bad)).unwrap_err();
    assert!(err.to_string().contains("margin"));
}

#[test]
fn test_null_optional_argument_is_dropped() {
    let s = skill("sk-1", "forecast", vec![string_param("limit", false)]);
    let contract = ToolContract::from_skill(&s).unwrap();

    let supplied = args(&[("limit", json!(null))]);
    let validated = validate_arguments(&contract, Some(&supplied)).unwrap();
    assert!(validated.is_empty());
}

#[test]
fn test_undeclared_arguments_are_not_forwarded() {
    let s = skill("sk-1", "forecast", vec![string_param("region", false)]);
    let contract = ToolContract::from_skill(&s).unwrap();

    let supplied = args(&[("region", json!("east")), ("debug", json!(true))]);
    let validated = validate_arguments(&contract, Some(&supplied)).unwrap();
    assert_eq!(validated.len(), 1);
    assert!(!validated.contains_key("debug"));
}

#[tokio::test]
async fn test_invoke_runs_skill_with_validated_arguments() {
    let api = Arc::new(MockPlatform::new().with_copilot(
        copilot("cp-1", &["sk-1"]),
        vec![skill(
            "sk-1",
            "forecast",
            vec![constrained_param("region", true, &["east", "west"])],
        )],
    ));
    let factory = MockFactory::new(api.clone());
    let contract = region_contract();

    let supplied = args(&[("region", json!("west"))]);
    let result = invoke_skill(
        &factory,
        None,
        "cp-1",
        &contract,
        Some(&supplied),
        &Notices::none(),
    )
    .await;

    assert!(!is_error(&result));
    assert_eq!(result_text(&result), "done");

    let calls = api.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].copilot_id, "cp-1");
    assert_eq!(calls[0].skill_name, "forecast");
    assert_eq!(calls[0].parameters["region"], json!("west"));
}

#[tokio::test]
async fn test_validation_failure_never_issues_a_remote_call() {
    let api = Arc::new(MockPlatform::new());
    let factory = MockFactory::new(api.clone());
    let contract = region_contract();

    let result = invoke_skill(&factory, None, "cp-1", &contract, None, &Notices::none()).await;

    assert!(is_error(&result));
    assert!(result_text(&result).contains("region"));
    assert!(api.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_unresolvable_client_surfaces_as_error_result() {
    let api = Arc::new(MockPlatform::new());
    let factory = MockFactory::failing(api.clone());
    let contract = ToolContract::from_skill(&skill("sk-1", "forecast", vec![])).unwrap();

    let result = invoke_skill(&factory, None, "cp-1", &contract, None, &Notices::none()).await;

    assert!(is_error(&result));
    assert!(result_text(&result).contains("Cannot connect"));
    assert!(api.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_unsuccessful_run_surfaces_platform_error_message() {
    let api = Arc::new(MockPlatform::new().with_copilot(
        copilot("cp-1", &["sk-1"]),
        vec![skill("sk-1", "forecast", vec![])],
    ));
    api.set_run_result(SkillRunResult {
        success: false,
        error: Some("quota exceeded".to_string()),
        data: None,
    });
    let factory = MockFactory::new(api.clone());
    let contract = ToolContract::from_skill(&skill("sk-1", "forecast", vec![])).unwrap();

    let result = invoke_skill(&factory, None, "cp-1", &contract, None, &Notices::none()).await;

    assert!(is_error(&result));
    assert_eq!(result_text(&result), "quota exceeded");
}

#[tokio::test]
async fn test_successful_run_without_message_gets_placeholder() {
    let api = Arc::new(MockPlatform::new().with_copilot(
        copilot("cp-1", &["sk-1"]),
        vec![skill("sk-1", "forecast", vec![])],
    ));
    api.set_run_result(SkillRunResult {
        success: true,
        error: None,
        data: Some(json!({ "rows": 3 })),
    });
    let factory = MockFactory::new(api.clone());
    let contract = ToolContract::from_skill(&skill("sk-1", "forecast", vec![])).unwrap();

    let result = invoke_skill(&factory, None, "cp-1", &contract, None, &Notices::none()).await;

    assert!(!is_error(&result));
    assert_eq!(result_text(&result), "No data returned from skill");
}
