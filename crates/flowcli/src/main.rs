// crates/flowcli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{
    ExecutionEvent, LogLevel, NodeSpec, NodeStatus, Outputs, RunStatus, Value, Workflow,
};
use flownodes::NodeOptions;
use flowruntime::{FlowRuntime, NodeRegistry, RuntimeConfig, WorkflowGraph};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Flow Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Run parameters as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Execution id to use instead of a generated one
        #[arg(long)]
        execution_id: Option<String>,

        /// Cancel the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Timeout for each http_request node call
        #[arg(long, default_value_t = 30)]
        http_timeout_secs: u64,

        /// Runtime configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            execution_id,
            timeout_secs,
            http_timeout_secs,
            config,
            verbose,
        } => {
            init_tracing(verbose);
            let options = RunOptions {
                execution_id,
                timeout: timeout_secs.map(Duration::from_secs),
                http_timeout: Duration::from_secs(http_timeout_secs),
                config,
            };
            run_workflow(&file, input, options).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_workflow(&file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

struct RunOptions {
    execution_id: Option<String>,
    timeout: Option<Duration>,
    http_timeout: Duration,
    config: Option<PathBuf>,
}

fn load_workflow(file: &Path) -> Result<Workflow> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)
        .with_context(|| format!("{} is not a valid workflow definition", file.display()))?;
    Ok(workflow)
}

fn parse_inputs(input: Option<String>) -> Result<Outputs> {
    let Some(input) = input else {
        return Ok(Outputs::new());
    };
    let json: serde_json::Value = serde_json::from_str(&input).context("Input is not valid JSON")?;
    match Value::from(json) {
        Value::Object(inputs) => Ok(inputs),
        _ => bail!("Input must be a JSON object"),
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid runtime config", path.display()))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn build_registry(options: NodeOptions) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    flownodes::register_all_with(&mut registry, options);
    registry
}

fn status_icon(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Idle => "⏸️ ",
        NodeStatus::Executing => "⚡",
        NodeStatus::Completed => "✅",
        NodeStatus::Error => "❌",
    }
}

async fn run_workflow(file: &Path, input: Option<String>, options: RunOptions) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = Arc::new(load_workflow(file)?);

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    let inputs = parse_inputs(input)?;
    let config = load_config(options.config.as_deref())?;
    let registry = build_registry(NodeOptions {
        http_timeout: options.http_timeout,
    });

    let runtime = FlowRuntime::with_registry(Arc::new(registry), config);

    // Subscribe before spawning so no checkpoint is missed
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        let mut seen: HashMap<String, NodeStatus> = HashMap::new();
        let mut started = false;
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStatusChanged {
                    status,
                    node_states,
                    ..
                } => {
                    for state in &node_states {
                        if seen.get(&state.node_id) == Some(&state.status) {
                            continue;
                        }
                        seen.insert(state.node_id.clone(), state.status);
                        match state.status {
                            NodeStatus::Idle => {}
                            NodeStatus::Executing => {
                                println!("  {} Starting node: {}", status_icon(state.status), state.node_id)
                            }
                            NodeStatus::Completed => println!(
                                "  {} Node {} completed in {}ms",
                                status_icon(state.status),
                                state.node_id,
                                state.duration_ms.unwrap_or(0)
                            ),
                            NodeStatus::Error => println!(
                                "  {} Node {} failed: {}",
                                status_icon(state.status),
                                state.node_id,
                                state.error_message.as_deref().unwrap_or("unknown error")
                            ),
                        }
                    }
                    match status {
                        RunStatus::Executing if !started => {
                            started = true;
                            println!("▶️  Workflow started");
                        }
                        RunStatus::Cancelled => {
                            println!("🛑 Workflow cancelled");
                            break;
                        }
                        _ => {}
                    }
                }
                ExecutionEvent::RunCompleted { .. } => {
                    println!("✨ Workflow completed successfully");
                    break;
                }
                ExecutionEvent::RunFailed { failure, .. } => {
                    println!("💥 Workflow failed: {}", failure.message);
                    break;
                }
            }
        }
    });

    let handle = runtime.spawn(workflow, options.execution_id, inputs)?;

    if let Some(timeout) = options.timeout {
        let token = handle.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!("Run timeout of {}s reached, cancelling", timeout.as_secs());
            token.cancel();
        });
    }

    let result = handle.join().await?;

    // Let the listener print the terminal event
    if tokio::time::timeout(Duration::from_secs(1), event_task).await.is_err() {
        tracing::debug!("Event listener did not see the terminal event");
    }

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", result.execution_id);
    println!("   Status: {}", result.status);
    println!(
        "   Completed: {}/{} nodes in {}ms",
        result.completed_nodes, result.total_nodes, result.duration_ms
    );

    let logs = result.context.logs();
    if !logs.is_empty() {
        println!();
        println!("📝 Execution Log:");
        for entry in logs {
            let icon = match entry.level {
                LogLevel::Info => "ℹ️ ",
                LogLevel::Warning => "⚠️ ",
            };
            match &entry.data {
                Some(data) => println!("   {} [{}] {}: {}", icon, entry.node_id, entry.message, data),
                None => println!("   {} [{}] {}", icon, entry.node_id, entry.message),
            }
        }
    }

    if !result.result.is_empty() {
        println!();
        println!("📤 Result:");
        let mut node_ids: Vec<&String> = result.result.keys().collect();
        node_ids.sort();
        for node_id in node_ids {
            println!("   Node {}:", node_id);
            let outputs = serde_json::to_string_pretty(&result.result[node_id])?;
            for line in outputs.lines() {
                println!("     {}", line);
            }
        }
    }

    if let Some(failure) = &result.failure {
        println!();
        match &failure.node_id {
            Some(node_id) => println!("❌ Failed at node {}: {}", node_id, failure.message),
            None => println!("❌ {}", failure.message),
        }
    }

    if !result.is_completed() {
        bail!("Workflow run ended with status {}", result.status);
    }

    Ok(())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    let graph = WorkflowGraph::build(&workflow)?;

    let names = |nodes: Vec<&NodeSpec>| {
        nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Start nodes: {}", names(graph.start_nodes()));
    println!("   End nodes: {}", names(graph.end_nodes()));

    if graph.has_cycle() {
        println!("⚠️  The workflow contains a cycle; nodes on it can never become ready");
    }

    let registry = build_registry(NodeOptions::default());
    for node in &workflow.nodes {
        if !registry.contains(&node.node_type) {
            println!(
                "⚠️  Node {} has unknown type '{}' and will pass its inputs through",
                node.id, node.node_type
            );
        }
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = build_registry(NodeOptions::default());

    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let mut workflow = Workflow::new("Example Order Workflow");
    workflow.description =
        Some("Computes an order total and logs whether it needs review".to_string());

    let trigger = workflow.add_node(NodeSpec::new("trigger", "manual_trigger").with_name("Start"));
    let total = workflow.add_node(
        NodeSpec::new("total", "transform")
            .with_name("Order Total")
            .with_input("expression", "{total: data.price * data.qty, customer: data.customer}")
            .with_output("result"),
    );
    let review = workflow.add_node(
        NodeSpec::new("review", "condition")
            .with_name("Needs Review")
            .with_input("expression", "data.order.total > 100")
            .with_output("result")
            .with_output("branch"),
    );
    let report = workflow.add_node(NodeSpec::new("report", "log").with_name("Report"));

    workflow.connect(&trigger, "price", &total, "price");
    workflow.connect(&trigger, "qty", &total, "qty");
    workflow.connect(&trigger, "customer", &total, "customer");
    workflow.connect(&total, "result", &review, "order");
    workflow.connect(&review, "branch", &report, "branch");
    workflow.connect(&review, "data", &report, "order");

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  flow run --file {} --input '{{\"price\": 25, \"qty\": 5, \"customer\": \"ada\"}}'",
        output.display()
    );

    Ok(())
}
