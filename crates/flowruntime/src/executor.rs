use crate::registry::NodeRegistry;
use crate::resolver::WorkflowGraph;
use flowcore::{
    ExecutionContext, ExecutionId, ExecutionLog, FlowError, Node, NodeContext, NodeError, NodeId,
    NodeSpec, Outputs, ReporterError, RunFailure, RunStatus, StatusReporter, Workflow,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Drives one workflow run at a time through a FIFO work queue.
///
/// Nodes of a run execute one after another; separate runs may share one
/// executor concurrently.
pub struct WorkflowExecutor {
    reporter_timeout: Duration,
}

/// How the scheduling loop ended
enum Outcome {
    Completed,
    Failed { failure: RunFailure, error: FlowError },
    Cancelled,
}

impl WorkflowExecutor {
    pub fn new(reporter_timeout: Duration) -> Self {
        Self { reporter_timeout }
    }

    /// Execute a workflow and return results
    ///
    /// Definition errors are returned as `Err` before any context exists.
    /// Every run that starts yields `Ok`, whatever its final status.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        reporter: &dyn StatusReporter,
        execution_id: ExecutionId,
        input_parameters: Outputs,
        cancellation: CancellationToken,
    ) -> Result<ExecutionResult, FlowError> {
        let graph = WorkflowGraph::build(workflow)?;
        let start_time = Instant::now();

        tracing::info!(
            execution_id = %execution_id,
            workflow_id = %workflow.id,
            "Starting workflow execution"
        );

        let mut ctx = ExecutionContext::new(workflow, execution_id, input_parameters);
        self.report_status(reporter, &ctx).await;

        ctx.begin_executing();
        self.report_status(reporter, &ctx).await;

        let mut order = Vec::with_capacity(workflow.nodes.len());
        let outcome = self
            .run_queue(&graph, registry, &mut ctx, reporter, &cancellation, &mut order)
            .await;

        let error = match outcome {
            Outcome::Completed => {
                let result = collect_result(&graph, &ctx);
                ctx.complete(result);
                self.report_status(reporter, &ctx).await;
                if let Some(result) = ctx.result() {
                    self.guard(
                        ctx.execution_id(),
                        "run completed",
                        reporter.on_run_completed(ctx.execution_id(), result),
                    )
                    .await;
                }
                None
            }
            Outcome::Failed { failure, error } => {
                tracing::error!(
                    execution_id = %ctx.execution_id(),
                    node_id = ?failure.node_id,
                    "Workflow execution failed: {}",
                    failure.message
                );
                ctx.fail(failure);
                self.report_status(reporter, &ctx).await;
                if let Some(failure) = ctx.failure() {
                    self.guard(
                        ctx.execution_id(),
                        "run failed",
                        reporter.on_run_failed(ctx.execution_id(), failure, ctx.node_states()),
                    )
                    .await;
                }
                Some(error)
            }
            Outcome::Cancelled => {
                tracing::info!(execution_id = %ctx.execution_id(), "Workflow execution cancelled");
                ctx.cancel();
                self.report_status(reporter, &ctx).await;
                Some(FlowError::Node(NodeError::Cancelled))
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            execution_id = %ctx.execution_id(),
            status = %ctx.run_status(),
            "Workflow execution finished in {}ms",
            duration_ms
        );

        Ok(ExecutionResult {
            execution_id: ctx.execution_id().to_string(),
            status: ctx.run_status(),
            result: ctx.result().cloned().unwrap_or_default(),
            failure: ctx.failure().cloned(),
            completed_nodes: order.len(),
            total_nodes: workflow.nodes.len(),
            execution_order: order,
            duration_ms,
            error,
            context: ctx,
        })
    }

    /// The scheduling loop: dequeue, check readiness, run or defer.
    async fn run_queue<'a>(
        &self,
        graph: &WorkflowGraph<'a>,
        registry: &NodeRegistry,
        ctx: &mut ExecutionContext,
        reporter: &dyn StatusReporter,
        cancellation: &CancellationToken,
        order: &mut Vec<NodeId>,
    ) -> Outcome {
        let mut queue: VecDeque<&'a NodeSpec> = graph.start_nodes().into_iter().collect();
        let mut queued: HashSet<&'a str> = queue.iter().map(|n| n.id.as_str()).collect();
        let mut executed: HashSet<&'a str> = HashSet::new();
        // Nodes deferred since the last node executed; seeing one twice
        // means a whole pass over the queue made no progress.
        let mut stalled: HashSet<&'a str> = HashSet::new();
        let mut deferrals: HashMap<&'a str, usize> = HashMap::new();
        let mut log = ExecutionLog::new();

        while let Some(node) = queue.pop_front() {
            let node_id = node.id.as_str();
            queued.remove(node_id);

            if cancellation.is_cancelled() {
                return Outcome::Cancelled;
            }

            if executed.contains(node_id) {
                continue;
            }

            if !graph.is_ready(&executed, node_id) {
                let count = deferrals.entry(node_id).or_insert(0);
                *count += 1;
                if !stalled.insert(node_id) {
                    let deferrals = *count;
                    return self.unsatisfiable(ctx, reporter, node_id, deferrals).await;
                }
                tracing::debug!(
                    execution_id = %ctx.execution_id(),
                    node_id,
                    "Node not ready, deferring"
                );
                queued.insert(node_id);
                queue.push_back(node);
                continue;
            }

            let inputs = collect_node_inputs(graph, node, ctx);
            ctx.mark_node_executing(node_id);
            self.report_status(reporter, ctx).await;

            let node_ctx = NodeContext::new(
                ctx.execution_id(),
                node_id,
                node.node_type.as_str(),
                log.emitter(node_id),
            )
            .with_inputs(inputs)
            .with_config(node.inputs.clone());

            let handler = registry.resolve(&node.node_type);

            tracing::debug!(
                execution_id = %ctx.execution_id(),
                node_id,
                node_type = %node.node_type,
                "Executing node"
            );
            let started = Instant::now();
            let result = handler.execute(node_ctx).await;
            ctx.append_logs(log.drain());

            match result {
                Ok(output) => {
                    tracing::info!(
                        "Node {} completed in {}ms",
                        node_id,
                        started.elapsed().as_millis()
                    );
                    ctx.complete_node(node_id, output.outputs);
                    self.report_status(reporter, ctx).await;

                    executed.insert(node_id);
                    order.push(node.id.clone());
                    stalled.clear();

                    for edge in graph.outgoing_edges(node_id) {
                        let target = edge.target.as_str();
                        if executed.contains(target) || queued.contains(target) {
                            continue;
                        }
                        if let Some(next) = graph.node(target) {
                            queued.insert(target);
                            queue.push_back(next);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Node {} failed: {}", node_id, e);
                    let message = e.to_string();
                    ctx.fail_node(node_id, message.clone());
                    self.report_status(reporter, ctx).await;
                    return Outcome::Failed {
                        failure: RunFailure {
                            message,
                            node_id: Some(node.id.clone()),
                        },
                        error: FlowError::NodeFailed {
                            node_id: node.id.clone(),
                            source: e,
                        },
                    };
                }
            }
        }

        // Whatever is left sits behind a cycle no start node reaches
        if let Some(stuck) = graph
            .workflow()
            .nodes
            .iter()
            .find(|node| !executed.contains(node.id.as_str()))
        {
            let deferrals = deferrals.get(stuck.id.as_str()).copied().unwrap_or(0);
            return self.unsatisfiable(ctx, reporter, &stuck.id, deferrals).await;
        }

        Outcome::Completed
    }

    /// Record the node as failed, the same way a handler error is recorded
    async fn unsatisfiable(
        &self,
        ctx: &mut ExecutionContext,
        reporter: &dyn StatusReporter,
        node_id: &str,
        deferrals: usize,
    ) -> Outcome {
        let error = FlowError::UnsatisfiableDependency {
            node_id: node_id.to_string(),
            deferrals,
        };
        let message = error.to_string();
        tracing::error!(execution_id = %ctx.execution_id(), node_id, "{}", message);
        ctx.fail_node(node_id, message.clone());
        self.report_status(reporter, ctx).await;
        Outcome::Failed {
            failure: RunFailure {
                message,
                node_id: Some(node_id.to_string()),
            },
            error,
        }
    }

    async fn report_status(&self, reporter: &dyn StatusReporter, ctx: &ExecutionContext) {
        self.guard(
            ctx.execution_id(),
            "status changed",
            reporter.on_run_status_changed(ctx.execution_id(), ctx.run_status(), ctx.node_states()),
        )
        .await;
    }

    /// Reporter failures and timeouts are logged, never propagated.
    async fn guard(
        &self,
        execution_id: &str,
        checkpoint: &str,
        call: impl Future<Output = Result<(), ReporterError>>,
    ) {
        match timeout(self.reporter_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(execution_id, checkpoint, error = %e, "Status reporter failed");
            }
            Err(_) => {
                tracing::warn!(
                    execution_id,
                    checkpoint,
                    "Status reporter timed out after {}ms",
                    self.reporter_timeout.as_millis()
                );
            }
        }
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Bind each incoming edge's source output to its target input; start
/// nodes additionally receive the run parameters, which win on collision.
fn collect_node_inputs(graph: &WorkflowGraph<'_>, node: &NodeSpec, ctx: &ExecutionContext) -> Outputs {
    let mut inputs = Outputs::new();

    for edge in graph.incoming_edges(&node.id) {
        match ctx
            .outputs_of(&edge.source)
            .and_then(|outputs| outputs.get(&edge.source_output))
        {
            Some(value) => {
                inputs.insert(edge.target_input.clone(), value.clone());
            }
            None => {
                tracing::debug!(
                    "Output '{}' of node {} not produced, input '{}' of node {} left unbound",
                    edge.source_output,
                    edge.source,
                    edge.target_input,
                    node.id
                );
            }
        }
    }

    if graph.is_start_node(&node.id) {
        inputs.extend(
            ctx.input_parameters()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }

    inputs
}

/// Outputs of every end node that executed, keyed by node id
fn collect_result(graph: &WorkflowGraph<'_>, ctx: &ExecutionContext) -> HashMap<NodeId, Outputs> {
    graph
        .end_nodes()
        .into_iter()
        .filter_map(|node| {
            ctx.outputs_of(&node.id)
                .map(|outputs| (node.id.clone(), outputs.clone()))
        })
        .collect()
}

/// Result of workflow execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub status: RunStatus,
    /// End-node outputs; empty unless the run completed
    pub result: HashMap<NodeId, Outputs>,
    pub failure: Option<RunFailure>,
    /// Node ids in the order their handlers finished successfully
    pub execution_order: Vec<NodeId>,
    pub completed_nodes: usize,
    pub total_nodes: usize,
    pub duration_ms: u64,
    /// The terminal execution context, for persistence or inspection
    pub context: ExecutionContext,
    error: Option<FlowError>,
}

impl ExecutionResult {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The error that ended the run, if it did not complete
    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    /// Completed runs yield their result; other runs yield their error.
    pub fn into_result(self) -> Result<HashMap<NodeId, Outputs>, FlowError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}
