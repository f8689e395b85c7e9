use crate::{
    ExecutionId, NodeExecutionState, NodeId, Outputs, ReporterError, RunFailure, RunStatus,
    StatusReporter, Value,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

/// Events published on the bus at each reporter checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStatusChanged {
        execution_id: ExecutionId,
        status: RunStatus,
        node_states: Vec<NodeExecutionState>,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        result: HashMap<NodeId, Outputs>,
        timestamp: DateTime<Utc>,
    },
    RunFailed {
        execution_id: ExecutionId,
        failure: RunFailure,
        node_states: Vec<NodeExecutionState>,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> &str {
        match self {
            ExecutionEvent::RunStatusChanged { execution_id, .. }
            | ExecutionEvent::RunCompleted { execution_id, .. }
            | ExecutionEvent::RunFailed { execution_id, .. } => execution_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
}

/// One line of a run's execution log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub node_id: NodeId,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Event emitter handed to a node so it can write to the execution log
#[derive(Clone)]
pub struct EventEmitter {
    node_id: NodeId,
    sender: mpsc::UnboundedSender<LogEntry>,
}

impl EventEmitter {
    pub fn new(node_id: NodeId, sender: mpsc::UnboundedSender<LogEntry>) -> Self {
        Self { node_id, sender }
    }

    fn emit(&self, level: LogLevel, message: String, data: Option<Value>) {
        // The receiver lives as long as the run; a closed channel means nobody is listening.
        let _ = self.sender.send(LogEntry {
            timestamp: Utc::now(),
            node_id: self.node_id.clone(),
            level,
            message,
            data,
        });
    }

    /// Emit info message
    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into(), None);
    }

    /// Emit warning message
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message.into(), None);
    }

    /// Emit an info message carrying a value
    pub fn data(&self, message: impl Into<String>, value: Value) {
        self.emit(LogLevel::Info, message.into(), Some(value));
    }
}

/// Collects the log entries of a single run
pub struct ExecutionLog {
    sender: mpsc::UnboundedSender<LogEntry>,
    receiver: mpsc::UnboundedReceiver<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn emitter(&self, node_id: impl Into<NodeId>) -> EventEmitter {
        EventEmitter::new(node_id.into(), self.sender.clone())
    }

    /// Take every entry emitted so far
    pub fn drain(&mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        while let Ok(entry) = self.receiver.try_recv() {
            entries.push(entry);
        }
        entries
    }
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Global event bus
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn reporter(&self) -> EventBusReporter {
        EventBusReporter {
            sender: self.sender.clone(),
        }
    }
}

/// Status reporter that republishes every checkpoint on an [`EventBus`]
#[derive(Clone)]
pub struct EventBusReporter {
    sender: broadcast::Sender<ExecutionEvent>,
}

#[async_trait]
impl StatusReporter for EventBusReporter {
    async fn on_run_status_changed(
        &self,
        execution_id: &str,
        status: RunStatus,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        let _ = self.sender.send(ExecutionEvent::RunStatusChanged {
            execution_id: execution_id.to_string(),
            status,
            node_states: node_states.to_vec(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn on_run_completed(
        &self,
        execution_id: &str,
        result: &HashMap<NodeId, Outputs>,
    ) -> Result<(), ReporterError> {
        let _ = self.sender.send(ExecutionEvent::RunCompleted {
            execution_id: execution_id.to_string(),
            result: result.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn on_run_failed(
        &self,
        execution_id: &str,
        failure: &RunFailure,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        let _ = self.sender.send(ExecutionEvent::RunFailed {
            execution_id: execution_id.to_string(),
            failure: failure.clone(),
            node_states: node_states.to_vec(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
