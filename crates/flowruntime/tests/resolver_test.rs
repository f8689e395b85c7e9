// crates/flowruntime/tests/resolver_test.rs

use flowcore::{NodeSpec, Workflow, WorkflowError};
use flowruntime::WorkflowGraph;
use std::collections::HashSet;

fn diamond() -> Workflow {
    let mut workflow = Workflow::new("diamond").with_id("wf-diamond");
    for id in ["A", "B", "C", "D"] {
        workflow.add_node(NodeSpec::new(id, "echo"));
    }
    workflow.connect("A", "value", "B", "value");
    workflow.connect("A", "value", "C", "value");
    workflow.connect("B", "value", "D", "left");
    workflow.connect("C", "value", "D", "right");
    workflow
}

fn ids<'a>(nodes: impl IntoIterator<Item = &'a NodeSpec>) -> Vec<&'a str> {
    nodes.into_iter().map(|n| n.id.as_str()).collect()
}

#[test]
fn test_start_and_end_nodes() {
    let workflow = diamond();
    let graph = WorkflowGraph::build(&workflow).unwrap();

    assert_eq!(ids(graph.start_nodes()), vec!["A"]);
    assert_eq!(ids(graph.end_nodes()), vec!["D"]);
    assert!(graph.is_start_node("A"));
    assert!(!graph.is_start_node("D"));
}

#[test]
fn test_isolated_node_is_both_start_and_end() {
    let mut workflow = diamond();
    workflow.add_node(NodeSpec::new("lonely", "echo"));
    let graph = WorkflowGraph::build(&workflow).unwrap();

    assert_eq!(ids(graph.start_nodes()), vec!["A", "lonely"]);
    assert_eq!(ids(graph.end_nodes()), vec!["D", "lonely"]);
}

#[test]
fn test_edges_are_returned_in_declaration_order() {
    let workflow = diamond();
    let graph = WorkflowGraph::build(&workflow).unwrap();

    let outgoing: Vec<_> = graph
        .outgoing_edges("A")
        .iter()
        .map(|e| e.target.as_str())
        .collect();
    assert_eq!(outgoing, vec!["B", "C"]);

    let incoming: Vec<_> = graph
        .incoming_edges("D")
        .iter()
        .map(|e| e.target_input.as_str())
        .collect();
    assert_eq!(incoming, vec!["left", "right"]);
    assert!(graph.incoming_edges("A").is_empty());
    assert!(graph.outgoing_edges("missing").is_empty());
}

#[test]
fn test_readiness_requires_every_upstream_node() {
    let workflow = diamond();
    let graph = WorkflowGraph::build(&workflow).unwrap();
    let mut executed = HashSet::new();

    assert!(graph.is_ready(&executed, "A"));
    assert!(!graph.is_ready(&executed, "B"));

    executed.insert("A");
    executed.insert("B");
    assert!(graph.is_ready(&executed, "C"));
    assert!(!graph.is_ready(&executed, "D"));

    executed.insert("C");
    assert!(graph.is_ready(&executed, "D"));
}

#[test]
fn test_cycle_detection() {
    let workflow = diamond();
    assert!(!WorkflowGraph::build(&workflow).unwrap().has_cycle());

    let mut cyclic = diamond();
    cyclic.connect("D", "value", "B", "again");
    assert!(WorkflowGraph::build(&cyclic).unwrap().has_cycle());
}

#[test]
fn test_build_rejects_invalid_definitions() {
    let mut dangling = diamond();
    dangling.connect("D", "value", "E", "value");
    assert!(matches!(
        WorkflowGraph::build(&dangling),
        Err(WorkflowError::UnknownEdgeNode { edge: 4, .. })
    ));

    let mut duplicate = diamond();
    duplicate.add_node(NodeSpec::new("C", "echo"));
    assert!(matches!(
        WorkflowGraph::build(&duplicate),
        Err(WorkflowError::DuplicateNode(id)) if id == "C"
    ));
}
