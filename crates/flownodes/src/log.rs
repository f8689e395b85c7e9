use async_trait::async_trait;
use flowcore::{Node, NodeContext, NodeError, NodeMetadata, NodeOutput, PortDefinition, Value};

/// Writes its inputs to the execution log
pub struct LogNode;

#[async_trait]
impl Node for LogNode {
    fn node_type(&self) -> &str {
        "log"
    }

    fn aliases(&self) -> &[&str] {
        &["console"]
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let data = Value::Object(ctx.inputs);

        tracing::info!(
            execution_id = %ctx.execution_id,
            node_id = %ctx.node_id,
            "{}",
            data
        );
        ctx.events.data(format!("Log from node {}", ctx.node_id), data.clone());

        Ok(NodeOutput::new()
            .with_output("logged", true)
            .with_output("data", data))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Write the inputs to the execution log".to_string(),
            category: "debug".to_string(),
            inputs: vec![],
            outputs: vec![
                PortDefinition::required("logged", "Always true"),
                PortDefinition::required("data", "The inputs, unchanged"),
            ],
        }
    }
}
