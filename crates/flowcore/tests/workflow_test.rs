// crates/flowcore/tests/workflow_test.rs

use flowcore::{NodeSpec, Value, Workflow, WorkflowError};

fn two_node_workflow() -> Workflow {
    let mut workflow = Workflow::new("two nodes").with_id("wf-1");
    workflow.add_node(NodeSpec::new("A", "manual_trigger"));
    workflow.add_node(NodeSpec::new("B", "log"));
    workflow.connect("A", "x", "B", "data");
    workflow
}

#[test]
fn test_valid_workflow_passes_validation() {
    assert_eq!(two_node_workflow().validate(), Ok(()));
}

#[test]
fn test_duplicate_node_id_is_rejected() {
    let mut workflow = two_node_workflow();
    workflow.add_node(NodeSpec::new("B", "transform"));

    assert_eq!(
        workflow.validate(),
        Err(WorkflowError::DuplicateNode("B".to_string()))
    );
}

#[test]
fn test_edge_to_unknown_node_is_rejected() {
    let mut workflow = two_node_workflow();
    workflow.connect("B", "logged", "ghost", "in");

    assert_eq!(
        workflow.validate(),
        Err(WorkflowError::UnknownEdgeNode {
            edge: 1,
            node_id: "ghost".to_string(),
        })
    );
}

#[test]
fn test_edge_from_unknown_node_is_rejected() {
    let mut workflow = two_node_workflow();
    workflow.connect("nope", "out", "A", "in");

    let err = workflow.validate().unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownEdgeNode { node_id, .. } if node_id == "nope"));
}

#[test]
fn test_empty_node_id_is_rejected() {
    let mut workflow = Workflow::new("blank");
    workflow.add_node(NodeSpec::new("  ", "log"));

    assert_eq!(workflow.validate(), Err(WorkflowError::EmptyNodeId(0)));
}

#[test]
fn test_workflow_deserializes_from_builder_json() {
    let json = serde_json::json!({
        "id": "wf-json",
        "name": "from json",
        "nodes": [
            { "id": "start", "type": "trigger" },
            {
                "id": "double",
                "type": "transform",
                "inputs": { "expression": "data.x * 2" },
                "outputs": ["result"]
            }
        ],
        "edges": [
            { "source": "start", "source_output": "x", "target": "double", "target_input": "x" }
        ]
    });

    let workflow: Workflow = serde_json::from_value(json).unwrap();

    assert_eq!(workflow.nodes.len(), 2);
    assert_eq!(workflow.nodes[1].node_type, "transform");
    assert_eq!(
        workflow.nodes[1].inputs.get("expression"),
        Some(&Value::String("data.x * 2".to_string()))
    );
    assert_eq!(workflow.nodes[1].outputs, vec!["result".to_string()]);
    assert_eq!(workflow.edges[0].target_input, "x");
    assert!(workflow.validate().is_ok());
}

#[test]
fn test_value_round_trips_through_plain_json() {
    let json = serde_json::json!({ "amount": 50, "tags": ["a", "b"], "ok": true, "none": null });
    let value = Value::from(json.clone());

    assert_eq!(value.get("amount"), Some(&Value::Number(50.0)));
    assert_eq!(value.to_json()["tags"], json["tags"]);

    let parsed: Value = serde_json::from_str(r#"{"n": 1.5, "s": "hi"}"#).unwrap();
    assert_eq!(parsed.get("n").and_then(Value::as_f64), Some(1.5));
    assert_eq!(parsed.get("s").and_then(Value::as_str), Some("hi"));
}

#[test]
fn test_value_truthiness() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::from(0i64).is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(Value::from("x").is_truthy());
    assert!(Value::Array(vec![]).is_truthy());
    assert_eq!(Value::from(10.0).to_string(), "10");
}
