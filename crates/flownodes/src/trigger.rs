use async_trait::async_trait;
use flowcore::{Node, NodeContext, NodeError, NodeMetadata, NodeOutput};

/// Entry point of a workflow; forwards the run parameters it receives.
pub struct TriggerNode;

#[async_trait]
impl Node for TriggerNode {
    fn node_type(&self) -> &str {
        "trigger"
    }

    fn aliases(&self) -> &[&str] {
        &["manual_trigger"]
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::from(ctx.inputs))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Start a workflow; outputs equal inputs".to_string(),
            category: "trigger".to_string(),
            ..NodeMetadata::default()
        }
    }
}
