use async_trait::async_trait;
use flowcore::{Node, NodeContext, NodeError, NodeMetadata, NodeOutput, Outputs, PortDefinition, Value};
use reqwest::Method;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP request node
///
/// Non-2xx responses are data (`ok: false`), not failures. Only transport
/// errors and timeouts fail the node.
pub struct HttpRequestNode {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_method(ctx: &NodeContext) -> Result<Method, NodeError> {
    let method = match ctx.input_or_config("method") {
        None | Some(Value::Null) => return Ok(Method::GET),
        Some(Value::String(method)) => method.to_uppercase(),
        Some(other) => {
            return Err(NodeError::InvalidInputType {
                field: "method".to_string(),
                expected: "string".to_string(),
                actual: other.type_name().to_string(),
            })
        }
    };

    match method.as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(NodeError::Configuration(format!(
            "Unsupported method: {}",
            method
        ))),
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn node_type(&self) -> &str {
        "http_request"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let url = match ctx.input_or_config("url") {
            None | Some(Value::Null) => return Err(NodeError::MissingInput("url".to_string())),
            Some(Value::String(url)) => url.as_str(),
            Some(other) => {
                return Err(NodeError::InvalidInputType {
                    field: "url".to_string(),
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        let method = parse_method(&ctx)?;

        ctx.events.info(format!("{} {}", method, url));

        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(self.timeout);

        if let Some(Value::Object(headers)) = ctx.input_or_config("headers") {
            for (key, value) in headers {
                match value {
                    Value::String(s) => request = request.header(key, s),
                    Value::Null => {}
                    other => request = request.header(key, other.to_string()),
                }
            }
        }

        match ctx.input_or_config("body") {
            Some(body @ (Value::Object(_) | Value::Array(_))) => {
                request = request.json(&body.to_json());
            }
            Some(Value::String(text)) => {
                request = request.body(text.clone());
            }
            None | Some(Value::Null) => {}
            Some(other) => {
                request = request.body(other.to_string());
            }
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                NodeError::ExecutionFailed(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let headers: Outputs = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.to_string(), Value::String(v.to_string())))
            })
            .collect();

        let body_text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                NodeError::ExecutionFailed(format!("Failed to read response: {}", e))
            }
        })?;

        let body = match serde_json::from_str::<serde_json::Value>(&body_text) {
            Ok(json) => Value::from(json),
            Err(_) => Value::String(body_text),
        };

        ctx.events.info(format!("Response status: {}", status.as_u16()));
        tracing::debug!(
            execution_id = %ctx.execution_id,
            node_id = %ctx.node_id,
            status = status.as_u16(),
            "{} {} returned",
            method,
            url
        );

        Ok(NodeOutput::new()
            .with_output("status", status.as_u16())
            .with_output("ok", status.is_success())
            .with_output("body", body)
            .with_output("headers", Value::Object(headers)))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Make an HTTP request; non-2xx responses are returned as data".to_string(),
            category: "http".to_string(),
            inputs: vec![
                PortDefinition::required("url", "Request URL"),
                PortDefinition::optional("method", "HTTP method, GET by default"),
                PortDefinition::optional("headers", "Object of header values"),
                PortDefinition::optional("body", "Object/array sent as JSON, string sent as text"),
            ],
            outputs: vec![
                PortDefinition::required("status", "Response status code"),
                PortDefinition::required("ok", "True for 2xx statuses"),
                PortDefinition::required("body", "Parsed JSON body, or raw text"),
                PortDefinition::required("headers", "Response headers"),
            ],
        }
    }
}
