use async_trait::async_trait;
use flowcore::{Node, NodeContext, NodeError, NodeMetadata, NodeOutput};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Registry of available node types
///
/// Read-only once built; runs share it through an `Arc`.
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn Node>>,
    fallback: Arc<dyn Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(PassthroughNode),
        }
    }

    /// Register a handler under its type tag and every alias
    pub fn register(&mut self, handler: Arc<dyn Node>) {
        let mut tags = vec![handler.node_type().to_string()];
        tags.extend(handler.aliases().iter().map(|alias| alias.to_string()));
        for tag in tags {
            tracing::info!("Registering node type: {}", tag);
            if self.handlers.insert(tag.clone(), handler.clone()).is_some() {
                tracing::warn!("Node type {} was already registered and has been replaced", tag);
            }
        }
    }

    /// Register an async closure as the handler for `node_type`
    pub fn register_fn<F, Fut>(&mut self, node_type: impl Into<String>, handler: F)
    where
        F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
    {
        self.register(Arc::new(FnNode {
            node_type: node_type.into(),
            handler,
        }));
    }

    /// Handler for a type tag; unknown tags resolve to the passthrough handler
    pub fn resolve(&self, node_type: &str) -> Arc<dyn Node> {
        self.handlers
            .get(node_type)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.handlers.get(node_type).map(|handler| handler.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler used for type tags nobody registered: outputs = inputs.
pub struct PassthroughNode;

#[async_trait]
impl Node for PassthroughNode {
    fn node_type(&self) -> &str {
        "passthrough"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        tracing::warn!(
            execution_id = %ctx.execution_id,
            node_id = %ctx.node_id,
            node_type = %ctx.node_type,
            "unknown node type, passing inputs through"
        );
        ctx.events.warn(format!(
            "Unknown node type '{}', passing inputs through",
            ctx.node_type
        ));
        Ok(NodeOutput::from(ctx.inputs))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Fallback for unknown node types; outputs equal inputs".to_string(),
            category: "general".to_string(),
            inputs: vec![],
            outputs: vec![],
        }
    }
}

struct FnNode<F> {
    node_type: String,
    handler: F,
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
{
    fn node_type(&self) -> &str {
        &self.node_type
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        (self.handler)(ctx).await
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: format!("Custom handler for {}", self.node_type),
            category: "custom".to_string(),
            inputs: vec![],
            outputs: vec![],
        }
    }
}
