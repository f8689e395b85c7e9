// crates/flownodes/tests/nodes_test.rs

use flowcore::{ExecutionLog, LogLevel, Node, NodeContext, Outputs, Value};
use flownodes::{ConditionNode, LogNode, TransformNode, TriggerNode};
use flowruntime::NodeRegistry;
use serde_json::json;

fn object(value: serde_json::Value) -> Outputs {
    match Value::from(value) {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other.type_name()),
    }
}

fn context(log: &ExecutionLog, node_type: &str, inputs: Outputs, config: Outputs) -> NodeContext {
    NodeContext::new("exec-1", "node-1", node_type, log.emitter("node-1"))
        .with_inputs(inputs)
        .with_config(config)
}

#[tokio::test]
async fn test_trigger_is_identity() {
    let log = ExecutionLog::new();
    let inputs = object(json!({"x": 5, "name": "run"}));

    let output = TriggerNode
        .execute(context(&log, "manual_trigger", inputs.clone(), Outputs::new()))
        .await
        .unwrap();

    assert_eq!(output.outputs, inputs);
}

#[tokio::test]
async fn test_transform_uses_declared_expression() {
    let log = ExecutionLog::new();
    let output = TransformNode
        .execute(context(
            &log,
            "transform",
            object(json!({"x": 5})),
            object(json!({"expression": "data.x * 2"})),
        ))
        .await
        .unwrap();

    assert_eq!(output.outputs, object(json!({"result": 10})));
}

#[tokio::test]
async fn test_transform_prefers_wired_expression() {
    let log = ExecutionLog::new();
    let output = TransformNode
        .execute(context(
            &log,
            "json_transform",
            object(json!({"x": 5, "expression": "data.x + 1"})),
            object(json!({"expression": "data.x * 2"})),
        ))
        .await
        .unwrap();

    assert_eq!(output.outputs["result"], Value::Number(6.0));
}

#[tokio::test]
async fn test_transform_soft_failure() {
    let mut log = ExecutionLog::new();
    let output = TransformNode
        .execute(context(
            &log,
            "transform",
            object(json!({"x": 5})),
            object(json!({"expression": "data.x *"})),
        ))
        .await
        .unwrap();

    assert_eq!(output.outputs["result"], Value::from(json!({"x": 5})));
    assert!(output.outputs["error"]
        .as_str()
        .unwrap()
        .contains("syntax error"));

    let entries = log.drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Warning);
}

#[tokio::test]
async fn test_transform_without_expression_still_has_result() {
    let log = ExecutionLog::new();
    let output = TransformNode
        .execute(context(&log, "transform", object(json!({"x": 1})), Outputs::new()))
        .await
        .unwrap();

    assert_eq!(output.outputs["result"], Value::from(json!({"x": 1})));
    assert!(output.outputs.contains_key("error"));
}

#[tokio::test]
async fn test_condition_false_branch() {
    let log = ExecutionLog::new();
    let output = ConditionNode
        .execute(context(
            &log,
            "condition",
            object(json!({"amount": 50})),
            object(json!({"expression": "data.amount > 100"})),
        ))
        .await
        .unwrap();

    assert_eq!(
        output.outputs,
        object(json!({"result": false, "branch": "false", "data": {"amount": 50}}))
    );
}

#[tokio::test]
async fn test_condition_accepts_condition_key() {
    let log = ExecutionLog::new();
    let output = ConditionNode
        .execute(context(
            &log,
            "if",
            object(json!({"amount": 150, "condition": "amount > 100"})),
            Outputs::new(),
        ))
        .await
        .unwrap();

    assert_eq!(output.outputs["result"], Value::Bool(true));
    assert_eq!(output.outputs["branch"], Value::from("true"));
    // the expression itself is not part of the data
    assert_eq!(output.outputs["data"], Value::from(json!({"amount": 150})));
}

#[tokio::test]
async fn test_malformed_condition_is_false() {
    let log = ExecutionLog::new();
    let output = ConditionNode
        .execute(context(
            &log,
            "condition",
            object(json!({"amount": 150})),
            object(json!({"expression": "amount >>> 1"})),
        ))
        .await
        .unwrap();

    assert_eq!(output.outputs["result"], Value::Bool(false));
    assert_eq!(output.outputs["branch"], Value::from("false"));
}

#[tokio::test]
async fn test_log_writes_execution_log() {
    let mut log = ExecutionLog::new();
    let inputs = object(json!({"message": "hello"}));

    let output = LogNode
        .execute(context(&log, "console", inputs.clone(), Outputs::new()))
        .await
        .unwrap();

    assert_eq!(output.outputs["logged"], Value::Bool(true));
    assert_eq!(output.outputs["data"], Value::Object(inputs.clone()));

    let entries = log.drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Info);
    assert_eq!(entries[0].node_id, "node-1");
    assert_eq!(entries[0].data, Some(Value::Object(inputs)));
}

#[test]
fn test_register_all_covers_every_tag() {
    let mut registry = NodeRegistry::new();
    flownodes::register_all(&mut registry);

    for tag in [
        "trigger",
        "manual_trigger",
        "http_request",
        "transform",
        "json_transform",
        "condition",
        "if",
        "log",
        "console",
    ] {
        assert!(registry.contains(tag), "{} is not registered", tag);
    }
    assert!(!registry.contains("custom_unregistered"));

    let metadata = registry.get_metadata("http_request").unwrap();
    assert_eq!(metadata.category, "http");
    assert!(metadata.inputs.iter().any(|port| port.name == "url" && port.required));
}
