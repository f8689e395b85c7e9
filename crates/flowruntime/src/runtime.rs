use crate::{registry::NodeRegistry, resolver::WorkflowGraph, ExecutionResult, WorkflowExecutor};
use flowcore::{
    EventBus, ExecutionEvent, ExecutionId, FanoutReporter, FlowError, Outputs, StatusReporter,
    Workflow, WorkflowError, WorkflowId,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Main runtime for executing workflows
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
    reporter: Arc<FanoutReporter>,
    workflows: Arc<RwLock<HashMap<WorkflowId, Arc<Workflow>>>>,
}

impl FlowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        Self::with_registry(registry, config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let executor = Arc::new(WorkflowExecutor::new(config.reporter_timeout()));
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        let mut reporter = FanoutReporter::new();
        reporter.push(Arc::new(event_bus.reporter()));

        Self {
            registry,
            executor,
            event_bus,
            reporter: Arc::new(reporter),
            workflows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a persistence reporter; it is called after the event bus.
    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        let mut fanout = (*self.reporter).clone();
        fanout.push(reporter);
        self.reporter = Arc::new(fanout);
        self
    }

    /// Get access to the node registry
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Register a workflow
    pub async fn register_workflow(&self, workflow: Workflow) -> Result<(), WorkflowError> {
        workflow.validate()?;
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id.clone(), Arc::new(workflow));
        Ok(())
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Option<Arc<Workflow>> {
        self.workflows.read().await.get(workflow_id).cloned()
    }

    /// Execute a registered workflow by ID
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        inputs: Outputs,
    ) -> Result<ExecutionResult, FlowError> {
        let workflow = self
            .get_workflow(workflow_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        self.execute(&workflow, inputs).await
    }

    /// Execute a workflow directly (without registration) under a fresh execution id
    pub async fn execute(
        &self,
        workflow: &Workflow,
        inputs: Outputs,
    ) -> Result<ExecutionResult, FlowError> {
        self.execute_with_id(workflow, new_execution_id(), inputs)
            .await
    }

    /// Execute a workflow under a caller-chosen execution id
    pub async fn execute_with_id(
        &self,
        workflow: &Workflow,
        execution_id: impl Into<ExecutionId>,
        inputs: Outputs,
    ) -> Result<ExecutionResult, FlowError> {
        self.executor
            .execute(
                workflow,
                &self.registry,
                self.reporter.as_ref(),
                execution_id.into(),
                inputs,
                CancellationToken::new(),
            )
            .await
    }

    /// Start a run on a background task.
    ///
    /// The definition is validated before spawning, so definition errors
    /// surface here rather than from the handle.
    pub fn spawn(
        &self,
        workflow: Arc<Workflow>,
        execution_id: Option<ExecutionId>,
        inputs: Outputs,
    ) -> Result<ExecutionHandle, FlowError> {
        WorkflowGraph::build(&workflow)?;

        let execution_id = execution_id.unwrap_or_else(new_execution_id);
        let cancellation = CancellationToken::new();

        let executor = self.executor.clone();
        let registry = self.registry.clone();
        let reporter = self.reporter.clone();
        let token = cancellation.clone();
        let id = execution_id.clone();

        let task = tokio::spawn(async move {
            executor
                .execute(&workflow, &registry, reporter.as_ref(), id, inputs, token)
                .await
        });

        Ok(ExecutionHandle {
            execution_id,
            cancellation,
            task,
        })
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn new_execution_id() -> ExecutionId {
    Uuid::new_v4().to_string()
}

/// Handle for monitoring a background run
pub struct ExecutionHandle {
    pub execution_id: ExecutionId,
    cancellation: CancellationToken,
    task: JoinHandle<Result<ExecutionResult, FlowError>>,
}

impl ExecutionHandle {
    /// Ask the run to stop before its next node step
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to reach a terminal state
    pub async fn join(self) -> Result<ExecutionResult, FlowError> {
        self.task
            .await
            .map_err(|e| FlowError::Execution(format!("Task join error: {}", e)))?
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the broadcast channel behind the event bus
    pub event_buffer_size: usize,
    /// Upper bound on a single status reporter call
    pub reporter_timeout_ms: u64,
}

impl RuntimeConfig {
    pub fn reporter_timeout(&self) -> Duration {
        Duration::from_millis(self.reporter_timeout_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            reporter_timeout_ms: 5000,
        }
    }
}
