use super::{
    ConverterOutput, NodeConverter, extract_tools, extract_variables, fallback_state,
    sanitize_identifier,
};
use crate::context::ConversionContext;
use crate::diagnostic::{ConversionError, ConversionWarning, ValidationResult, codes};
use crate::error::{ConvertError, ConverterFailure};
use crate::ids;
use crate::journey::{State, StateType, Variable, VariableType};
use crate::workflow::Node;
use itertools::Itertools;
use serde_json::{Value, json};

/// Converts HTTP/API call nodes into `tool` states backed by a named tool.
pub struct ApiConverter;

const STANDARD_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];
const AUTH_SECRET_FIELDS: [&str; 7] = [
    "token", "key", "apiKey", "api_key", "username", "password", "value",
];

impl NodeConverter for ApiConverter {
    fn node_type(&self) -> &str {
        "api"
    }

    fn supported_types(&self) -> &[&str] {
        &["api", "http", "rest", "function", "webhook-call"]
    }

    fn convert(
        &self,
        node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        let fail = |error: ConvertError| {
            ConverterFailure::new(error).with_fallback(fallback_state(
                node,
                StateType::Tool,
                "Calling an external service.",
            ))
        };

        let method = method(node).map_err(fail)?;
        let timeout = timeout(node).map_err(fail)?;
        let tool_name = tool_name(node, &method);
        let endpoint = endpoint(node);

        let mut variables = extract_variables(node);
        variables.extend(facet_variables(node, &tool_name, &method, timeout));

        let content = match endpoint {
            Some(url) => format!("Call the `{}` tool: {} {}.", tool_name, method, url),
            None => format!("Call the `{}` tool.", tool_name),
        };
        let content = match node.data_str("description") {
            Some(description) => format!("{} {}", content, description),
            None => content,
        };

        let tools = std::iter::once(tool_name.clone())
            .chain(extract_tools(node))
            .unique()
            .collect();

        let state = State::new(self.state_id(node, None), StateType::Tool, node.display_name())
            .with_description(format!("Invokes the {} API tool", tool_name))
            .with_content(content)
            .with_tools(tools)
            .with_variables(variables.clone())
            .with_position(node.position);

        Ok(ConverterOutput::single(state).with_variables(variables))
    }

    fn validate_node(&self, node: &Node) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if endpoint(node).is_none() {
            result.error(
                ConversionError::error(
                    codes::MISSING_API_ENDPOINT,
                    format!("API node '{}' has no URL or endpoint configured", node.id),
                )
                .for_node(&node.id)
                .suggest("Set the request URL on the node")
                .suggest("Remove the node if the call is no longer needed"),
            );
        }

        if let Ok(method) = method(node) {
            if !STANDARD_METHODS.contains(&method.as_str()) {
                result.warn(
                    ConversionWarning::medium(
                        codes::NON_STANDARD_HTTP_METHOD,
                        format!("API node '{}' uses non-standard HTTP method '{}'", node.id, method),
                    )
                    .for_node(&node.id)
                    .suggest(format!("Use one of {}", STANDARD_METHODS.join(", "))),
                );
            }
        }

        if let Some(auth) = auth(node).and_then(Value::as_object) {
            let has_type = auth.get("type").and_then(Value::as_str).is_some();
            let has_secret = AUTH_SECRET_FIELDS
                .iter()
                .any(|field| auth.get(*field).is_some_and(|v| !v.is_null()));
            if has_type && !has_secret {
                result.warn(
                    ConversionWarning::medium(
                        codes::INCOMPLETE_AUTH,
                        format!("API node '{}' declares an auth type but no credentials", node.id),
                    )
                    .for_node(&node.id)
                    .suggest("Provide a token or key for the configured auth type"),
                );
            }
        }

        if let Some(headers) = facet(node, "headers") {
            if !headers.is_object() {
                result.warn(
                    ConversionWarning::low(
                        codes::INVALID_HEADERS,
                        format!("API node '{}' has headers that are not a key/value object", node.id),
                    )
                    .for_node(&node.id)
                    .suggest("Configure headers as name/value pairs"),
                );
            }
        }

        result
    }
}

/// A configuration facet read from the data bag, then from `config`.
fn facet<'n>(node: &'n Node, key: &str) -> Option<&'n Value> {
    node.data_field(key).or_else(|| node.config_field(key))
}

fn endpoint(node: &Node) -> Option<&str> {
    node.data_str("url")
        .or_else(|| node.data_str("endpoint"))
        .or_else(|| node.config_str("url"))
        .or_else(|| node.config_str("endpoint"))
}

fn auth(node: &Node) -> Option<&Value> {
    facet(node, "auth").or_else(|| facet(node, "authentication"))
}

fn method(node: &Node) -> Result<String, ConvertError> {
    match facet(node, "method") {
        None => Ok("GET".to_string()),
        Some(Value::String(m)) if m.trim().is_empty() => Ok("GET".to_string()),
        Some(Value::String(m)) => Ok(m.trim().to_ascii_uppercase()),
        Some(other) => Err(ConvertError::InvalidConfig {
            node_id: node.id.clone(),
            message: format!("HTTP method must be text, found {}", other),
        }),
    }
}

/// Timeout in milliseconds, accepting numbers and numeric strings.
fn timeout(node: &Node) -> Result<Option<u64>, ConvertError> {
    let invalid = |found: &Value| ConvertError::InvalidConfig {
        node_id: node.id.clone(),
        message: format!("timeout must be a non-negative number, found {}", found),
    };
    match facet(node, "timeout") {
        None => Ok(None),
        Some(value @ Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| invalid(value)),
        Some(value @ Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(value)),
        Some(other) => Err(invalid(other)),
    }
}

/// Explicit `toolName`, then the sanitized node name, then a name derived from the
/// URL path, then `api_call_<id suffix>`.
fn tool_name(node: &Node, method: &str) -> String {
    if let Some(explicit) = node.data_str("toolName") {
        return explicit.to_string();
    }
    let named = node
        .data_str("label")
        .or_else(|| node.data_str("name"))
        .map(sanitize_identifier)
        .filter(|n| !n.is_empty());
    if let Some(name) = named {
        return name;
    }
    if let Some(segment) = endpoint(node).and_then(last_path_segment) {
        return format!("{}_{}", method.to_ascii_lowercase(), segment);
    }
    format!("api_call_{}", sanitize_identifier(ids::node_id_suffix(&node.id)))
}

/// The last literal path segment of a URL, sanitized. Path parameters are skipped.
fn last_path_segment(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = match path.find('/') {
        Some(idx) if !url.starts_with('/') => &path[idx..],
        Some(_) => path,
        None => return None,
    };
    path.split('/')
        .rev()
        .filter(|s| !s.is_empty() && !s.starts_with('{') && !s.starts_with(':'))
        .map(sanitize_identifier)
        .find(|s| !s.is_empty())
}

fn facet_variables(node: &Node, tool_name: &str, method: &str, timeout: Option<u64>) -> Vec<Variable> {
    let name = |facet: &str| format!("{}_{}", tool_name, facet);
    let mut variables = Vec::new();

    if let Some(url) = endpoint(node) {
        variables.push(
            Variable::new(name("url"), VariableType::String)
                .described("Request URL")
                .with_default(Value::from(url)),
        );
    }
    if facet(node, "method").is_some() {
        variables.push(
            Variable::new(name("method"), VariableType::String)
                .described("HTTP method")
                .with_default(Value::from(method)),
        );
    }
    if let Some(headers) = facet(node, "headers") {
        variables.push(
            Variable::new(name("headers"), VariableType::infer(headers))
                .described("Request headers")
                .with_default(headers.clone()),
        );
    }
    if let Some(body) = facet(node, "body") {
        variables.push(
            Variable::new(name("body"), VariableType::infer(body))
                .described("Request body")
                .with_default(body.clone()),
        );
    }
    if let Some(params) = facet(node, "params").or_else(|| facet(node, "queryParams")) {
        variables.push(
            Variable::new(name("params"), VariableType::infer(params))
                .described("Query parameters")
                .with_default(params.clone()),
        );
    }
    if let Some(ms) = timeout {
        variables.push(
            Variable::new(name("timeout"), VariableType::Number)
                .described("Request timeout in milliseconds")
                .with_default(Value::from(ms)),
        );
    }
    if let Some(auth) = auth(node) {
        // Credentials never leave the node; only the scheme is carried over.
        let scheme = auth.get("type").and_then(Value::as_str).unwrap_or("custom");
        variables.push(
            Variable::new(name("auth"), VariableType::Json)
                .described("Authentication scheme")
                .with_default(json!({ "type": scheme })),
        );
    }
    variables
}
