use crate::{NodeExecutionState, NodeId, Outputs, ReporterError, RunFailure, RunStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Persistence hook called by the executor at every checkpoint of a run.
///
/// The executor calls into the reporter, never the reverse. Errors are
/// logged and otherwise ignored: the in-memory context stays authoritative.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Run status changed, or a node state inside the run changed
    async fn on_run_status_changed(
        &self,
        execution_id: &str,
        status: RunStatus,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError>;

    async fn on_run_completed(
        &self,
        execution_id: &str,
        result: &HashMap<NodeId, Outputs>,
    ) -> Result<(), ReporterError>;

    async fn on_run_failed(
        &self,
        execution_id: &str,
        failure: &RunFailure,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError>;
}

/// Reporter that drops every checkpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl StatusReporter for NoopReporter {
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
        Ok(())
    }

    async fn on_run_failed(
        &self,
        _execution_id: &str,
        _failure: &RunFailure,
        _node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        Ok(())
    }
}

/// Forwards every checkpoint to several reporters in order.
///
/// Every reporter is called even when an earlier one fails; the first
/// failure is returned.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn StatusReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reporter: Arc<dyn StatusReporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    fn first_error(results: Vec<Result<(), ReporterError>>) -> Result<(), ReporterError> {
        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }
}

#[async_trait]
impl StatusReporter for FanoutReporter {
    async fn on_run_status_changed(
        &self,
        execution_id: &str,
        status: RunStatus,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        let mut results = Vec::with_capacity(self.reporters.len());
        for reporter in &self.reporters {
            results.push(
                reporter
                    .on_run_status_changed(execution_id, status, node_states)
                    .await,
            );
        }
        Self::first_error(results)
    }

    async fn on_run_completed(
        &self,
        execution_id: &str,
        result: &HashMap<NodeId, Outputs>,
    ) -> Result<(), ReporterError> {
        let mut results = Vec::with_capacity(self.reporters.len());
        for reporter in &self.reporters {
            results.push(reporter.on_run_completed(execution_id, result).await);
        }
        Self::first_error(results)
    }

    async fn on_run_failed(
        &self,
        execution_id: &str,
        failure: &RunFailure,
        node_states: &[NodeExecutionState],
    ) -> Result<(), ReporterError> {
        let mut results = Vec::with_capacity(self.reporters.len());
        for reporter in &self.reporters {
            results.push(
                reporter
                    .on_run_failed(execution_id, failure, node_states)
                    .await,
            );
        }
        Self::first_error(results)
    }
}
