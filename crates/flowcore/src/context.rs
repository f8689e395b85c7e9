use crate::{LogEntry, NodeId, Outputs, Workflow, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type ExecutionId = String;

/// Lifecycle of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Started,
    Executing,
    Completed,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Error | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Started => "started",
            RunStatus::Executing => "executing",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Idle,
    Executing,
    Completed,
    Error,
}

/// State of one node within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecutionState {
    pub node_id: NodeId,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Outputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl NodeExecutionState {
    fn idle(node_id: NodeId) -> Self {
        Self {
            node_id,
            status: NodeStatus::Idle,
            outputs: None,
            error_message: None,
            started_at: None,
            finished_at: None,
            duration_ms: None,
        }
    }

    fn finish(&mut self) {
        let now = Utc::now();
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds().max(0) as u64);
        }
        self.finished_at = Some(now);
    }
}

/// Why a run ended in [`RunStatus::Error`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

/// Mutable record of a single run.
///
/// Owned by the task driving the run. Once the run status is terminal the
/// context is only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    execution_id: ExecutionId,
    workflow_id: WorkflowId,
    input_parameters: Outputs,
    node_outputs: HashMap<NodeId, Outputs>,
    node_states: Vec<NodeExecutionState>,
    run_status: RunStatus,
    result: Option<HashMap<NodeId, Outputs>>,
    failure: Option<RunFailure>,
    logs: Vec<LogEntry>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ExecutionContext {
    /// Fresh context with every node idle and the run `Started`
    pub fn new(
        workflow: &Workflow,
        execution_id: impl Into<ExecutionId>,
        input_parameters: Outputs,
    ) -> Self {
        let node_states = workflow
            .nodes
            .iter()
            .map(|node| NodeExecutionState::idle(node.id.clone()))
            .collect();

        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow.id.clone(),
            input_parameters,
            node_outputs: HashMap::new(),
            node_states,
            run_status: RunStatus::Started,
            result: None,
            failure: None,
            logs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn input_parameters(&self) -> &Outputs {
        &self.input_parameters
    }

    pub fn node_outputs(&self) -> &HashMap<NodeId, Outputs> {
        &self.node_outputs
    }

    pub fn outputs_of(&self, node_id: &str) -> Option<&Outputs> {
        self.node_outputs.get(node_id)
    }

    pub fn node_states(&self) -> &[NodeExecutionState] {
        &self.node_states
    }

    pub fn node_state(&self, node_id: &str) -> Option<&NodeExecutionState> {
        self.node_states.iter().find(|s| s.node_id == node_id)
    }

    pub fn run_status(&self) -> RunStatus {
        self.run_status
    }

    pub fn result(&self) -> Option<&HashMap<NodeId, Outputs>> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn append_logs(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        self.logs.extend(entries);
    }

    pub fn begin_executing(&mut self) {
        debug_assert_eq!(self.run_status, RunStatus::Started);
        self.run_status = RunStatus::Executing;
    }

    fn state_mut(&mut self, node_id: &str) -> Option<&mut NodeExecutionState> {
        self.node_states.iter_mut().find(|s| s.node_id == node_id)
    }

    pub fn mark_node_executing(&mut self, node_id: &str) {
        if let Some(state) = self.state_mut(node_id) {
            state.status = NodeStatus::Executing;
            state.started_at = Some(Utc::now());
        }
    }

    /// Record a node's outputs; they become visible to downstream nodes
    pub fn complete_node(&mut self, node_id: &str, outputs: Outputs) {
        if let Some(state) = self.state_mut(node_id) {
            state.status = NodeStatus::Completed;
            state.outputs = Some(outputs.clone());
            state.finish();
        }
        self.node_outputs.insert(node_id.to_string(), outputs);
    }

    pub fn fail_node(&mut self, node_id: &str, message: impl Into<String>) {
        if let Some(state) = self.state_mut(node_id) {
            state.status = NodeStatus::Error;
            state.error_message = Some(message.into());
            state.finish();
        }
    }

    pub fn complete(&mut self, result: HashMap<NodeId, Outputs>) {
        self.result = Some(result);
        self.finish(RunStatus::Completed);
    }

    pub fn fail(&mut self, failure: RunFailure) {
        self.failure = Some(failure);
        self.finish(RunStatus::Error);
    }

    pub fn cancel(&mut self) {
        self.finish(RunStatus::Cancelled);
    }

    fn finish(&mut self, status: RunStatus) {
        debug_assert!(!self.run_status.is_terminal());
        self.run_status = status;
        self.finished_at = Some(Utc::now());
    }
}
