use crate::expr::Expression;
use async_trait::async_trait;
use flowcore::{Node, NodeContext, NodeMetadata, NodeError, NodeOutput, Outputs, PortDefinition, Value};

/// Locate the expression source among `keys`, checking resolved inputs
/// first and declared defaults second. Returns the source and the inputs
/// the expression should see, with the expression keys removed.
fn split_expression(ctx: &NodeContext, keys: &[&str]) -> (Option<Value>, Outputs) {
    let source = keys.iter().find_map(|key| ctx.input_or_config(key).cloned());
    let mut data = ctx.inputs.clone();
    for key in keys {
        data.remove(*key);
    }
    (source, data)
}

fn evaluate(source: Option<Value>, data: &Outputs) -> Result<Value, String> {
    match source {
        Some(Value::String(source)) => Expression::parse(&source)
            .and_then(|expression| expression.evaluate(data))
            .map_err(|e| e.to_string()),
        Some(other) => Err(format!(
            "expression must be a string, got {}",
            other.type_name()
        )),
        None => Err("no expression given".to_string()),
    }
}

/// Evaluates an expression over its inputs: `{result}`.
///
/// A bad expression does not fail the node; the inputs come back as
/// `result` alongside an `error` message.
pub struct TransformNode;

#[async_trait]
impl Node for TransformNode {
    fn node_type(&self) -> &str {
        "transform"
    }

    fn aliases(&self) -> &[&str] {
        &["json_transform"]
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let (source, data) = split_expression(&ctx, &["expression"]);

        match evaluate(source, &data) {
            Ok(result) => Ok(NodeOutput::new().with_output("result", result)),
            Err(message) => {
                tracing::warn!(
                    execution_id = %ctx.execution_id,
                    node_id = %ctx.node_id,
                    "transform expression failed: {}",
                    message
                );
                ctx.events.warn(format!("Transform failed: {}", message));
                Ok(NodeOutput::new()
                    .with_output("result", Value::Object(data))
                    .with_output("error", message))
            }
        }
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Evaluate an expression against the inputs".to_string(),
            category: "transform".to_string(),
            inputs: vec![PortDefinition::required(
                "expression",
                "Expression source; `data` names the inputs",
            )],
            outputs: vec![
                PortDefinition::required("result", "Expression value, or the inputs on error"),
                PortDefinition::optional("error", "Set when the expression could not be evaluated"),
            ],
        }
    }
}

/// Evaluates a boolean expression: `{result, branch, data}`.
pub struct ConditionNode;

#[async_trait]
impl Node for ConditionNode {
    fn node_type(&self) -> &str {
        "condition"
    }

    fn aliases(&self) -> &[&str] {
        &["if"]
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let (source, data) = split_expression(&ctx, &["expression", "condition"]);

        let result = match evaluate(source, &data) {
            Ok(value) => value.is_truthy(),
            Err(message) => {
                tracing::warn!(
                    execution_id = %ctx.execution_id,
                    node_id = %ctx.node_id,
                    "condition expression failed, treating as false: {}",
                    message
                );
                ctx.events
                    .warn(format!("Condition failed, treating as false: {}", message));
                false
            }
        };

        Ok(NodeOutput::new()
            .with_output("result", result)
            .with_output("branch", if result { "true" } else { "false" })
            .with_output("data", Value::Object(data)))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Evaluate a boolean expression and pick a branch".to_string(),
            category: "logic".to_string(),
            inputs: vec![PortDefinition::required(
                "expression",
                "Boolean expression; `condition` is accepted too",
            )],
            outputs: vec![
                PortDefinition::required("result", "Truthiness of the expression"),
                PortDefinition::required("branch", "\"true\" or \"false\""),
                PortDefinition::required("data", "The inputs, unchanged"),
            ],
        }
    }
}
