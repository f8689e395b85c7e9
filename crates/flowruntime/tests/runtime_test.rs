// crates/flowruntime/tests/runtime_test.rs

use async_trait::async_trait;
use flowcore::{
    ExecutionEvent, FlowError, NodeContext, NodeError, NodeExecutionState, NodeId, NodeOutput, NodeSpec,
    NodeStatus, Outputs, ReporterError, RunFailure, RunStatus, StatusReporter, Workflow,
    WorkflowError,
};
use flowruntime::{FlowRuntime, NodeRegistry, RuntimeConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn slow_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register_fn("slow", |ctx: NodeContext| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, NodeError>(NodeOutput::from(ctx.inputs))
    });
    registry
}

fn chain(len: usize) -> Workflow {
    let mut workflow = Workflow::new("chain");
    for i in 0..len {
        workflow.add_node(NodeSpec::new(format!("n{}", i), "slow"));
        if i > 0 {
            workflow.connect(format!("n{}", i - 1), "value", format!("n{}", i), "value");
        }
    }
    workflow
}

/// Counts terminal checkpoints
#[derive(Default)]
struct CountingReporter {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

#[async_trait]
impl StatusReporter for CountingReporter {
    async fn on_run_status_changed(
        &self,
        _execution_id: &str,
        _status: RunStatus,
        _node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        Ok(())
    }

    async fn on_run_completed(
        &self,
        _execution_id: &str,
        _result: &HashMap<NodeId, Outputs>,
    ) -> Result<(), ReporterError> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_run_failed(
        &self,
        _execution_id: &str,
        _failure: &RunFailure,
        _node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        self.failed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_cancel_background_run() {
    let runtime = FlowRuntime::with_registry(Arc::new(slow_registry()), RuntimeConfig::default());
    let handle = runtime
        .spawn(Arc::new(chain(20)), None, Outputs::new())
        .unwrap();
    assert!(!handle.execution_id.is_empty());

    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.cancel();

    let result = handle.join().await.unwrap();
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.completed_nodes > 0);
    assert!(result.completed_nodes < 20);
    // completed outputs stay available after cancellation
    let first = result.context.node_state("n0").unwrap();
    assert_eq!(first.status, NodeStatus::Completed);
    assert!(matches!(
        result.into_result(),
        Err(FlowError::Node(NodeError::Cancelled))
    ));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let reporter = Arc::new(CountingReporter::default());
    let runtime = FlowRuntime::with_registry(Arc::new(slow_registry()), RuntimeConfig::default())
        .with_reporter(reporter.clone());
    let workflow = Arc::new(chain(3));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            runtime
                .spawn(workflow.clone(), Some(format!("exec-{}", i)), Outputs::new())
                .unwrap()
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().await.unwrap();
        assert_eq!(result.execution_id, format!("exec-{}", i));
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.execution_order, vec!["n0", "n1", "n2"]);
    }
    assert_eq!(reporter.completed.load(Ordering::SeqCst), 4);
    assert_eq!(reporter.failed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_spawn_rejects_invalid_definition() {
    let runtime = FlowRuntime::new();
    let mut workflow = Workflow::new("duplicate");
    workflow.add_node(NodeSpec::new("A", "slow"));
    workflow.add_node(NodeSpec::new("A", "slow"));

    let err = runtime
        .spawn(Arc::new(workflow.clone()), None, Outputs::new())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        FlowError::Workflow(WorkflowError::DuplicateNode(_))
    ));

    let err = runtime.register_workflow(workflow).await.unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateNode(_)));
}

#[test]
fn test_runtime_config_from_json() {
    let config: RuntimeConfig = serde_json::from_str(r#"{"reporter_timeout_ms": 250}"#).unwrap();
    assert_eq!(config.reporter_timeout(), Duration::from_millis(250));
    assert_eq!(config.event_buffer_size, 1000);
}

#[tokio::test]
async fn test_zero_event_buffer_from_config_is_usable() {
    let config: RuntimeConfig = serde_json::from_str(r#"{"event_buffer_size": 0}"#).unwrap();
    let runtime = FlowRuntime::with_registry(Arc::new(slow_registry()), config);
    let mut events = runtime.subscribe_events();

    let result = runtime.execute(&chain(1), Outputs::new()).await.unwrap();
    assert_eq!(result.status, RunStatus::Completed);
    // a one-slot buffer keeps only the newest event
    let last = loop {
        match events.try_recv() {
            Ok(event) => break event,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(e) => panic!("no event delivered: {:?}", e),
        }
    };
    assert!(matches!(last, ExecutionEvent::RunCompleted { .. }));
}
