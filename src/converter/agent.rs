use super::{ConverterOutput, NodeConverter, extract_tools, extract_variables, fallback_state};
use crate::context::ConversionContext;
use crate::diagnostic::{ConversionWarning, ValidationResult, codes};
use crate::error::{ConvertError, ConverterFailure};
use crate::journey::{State, StateType, Variable, VariableType};
use crate::workflow::Node;
use serde_json::Value;

/// Converts LLM-backed nodes into `chat` states.
pub struct AgentConverter;

/// Content sources in priority order. `config.prompt` is checked after these.
const CONTENT_FIELDS: [&str; 4] = ["prompt", "systemPrompt", "message", "instruction"];

impl NodeConverter for AgentConverter {
    fn node_type(&self) -> &str {
        "agent"
    }

    fn supported_types(&self) -> &[&str] {
        &["agent", "ai", "chat", "llm"]
    }

    fn convert(
        &self,
        node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        let content = resolve_content(node)
            .map_err(|error| {
                ConverterFailure::new(error).with_fallback(fallback_state(
                    node,
                    StateType::Chat,
                    "I'm here to help. What would you like to do?",
                ))
            })?
            .unwrap_or_else(|| greeting(node));

        let mut variables = extract_variables(node);
        variables.extend(model_variables(node));

        let description = node
            .data_str("description")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Conversation step handled by {}", node.display_name()));

        let state = State::new(self.state_id(node, None), StateType::Chat, node.display_name())
            .with_description(description)
            .with_content(content)
            .with_tools(extract_tools(node))
            .with_variables(variables.clone())
            .with_position(node.position);

        Ok(ConverterOutput::single(state).with_variables(variables))
    }

    fn validate_node(&self, node: &Node) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if matches!(resolve_content(node), Ok(None)) {
            result.warn(
                ConversionWarning::low(
                    codes::MISSING_PROMPT,
                    format!("Agent node '{}' has no prompt; a generic greeting will be used", node.id),
                )
                .for_node(&node.id)
                .suggest("Add a prompt or system prompt describing what the agent should do"),
            );
        }
        if let Some(temperature) = numeric(node, "temperature") {
            if !(0.0..=2.0).contains(&temperature) {
                result.warn(
                    ConversionWarning::medium(
                        codes::TEMPERATURE_OUT_OF_RANGE,
                        format!(
                            "Agent node '{}' has temperature {}, outside the usual 0-2 range",
                            node.id, temperature
                        ),
                    )
                    .for_node(&node.id)
                    .suggest("Use a temperature between 0 and 2"),
                );
            }
        }
        result
    }
}

/// Resolves the chat body by field priority. `None` when nothing is configured.
fn resolve_content(node: &Node) -> Result<Option<String>, ConvertError> {
    for field in CONTENT_FIELDS {
        match node.data_field(field) {
            None => continue,
            Some(Value::String(text)) if text.trim().is_empty() => continue,
            Some(Value::String(text)) => return Ok(Some(text.trim().to_string())),
            Some(other) => {
                return Err(ConvertError::InvalidConfig {
                    node_id: node.id.clone(),
                    message: format!("'{}' must be text, found {}", field, kind_of(other)),
                });
            }
        }
    }
    Ok(node.config_str("prompt").map(str::to_string))
}

/// The generated greeting used when a node has no prompt at all.
fn greeting(node: &Node) -> String {
    match node.data_str("label").or_else(|| node.data_str("name")) {
        Some(name) => format!("Hello! I'm {}. How can I help you today?", name),
        None => "Hello! How can I help you today?".to_string(),
    }
}

fn model_variables(node: &Node) -> Vec<Variable> {
    let mut variables = Vec::new();
    if let Some(model) = node.data_str("model").or_else(|| node.config_str("model")) {
        variables.push(
            Variable::new("model", VariableType::String)
                .described("Language model used for this step")
                .with_default(Value::from(model)),
        );
    }
    if let Some(temperature) = node
        .data_field("temperature")
        .or_else(|| node.config_field("temperature"))
        .filter(|v| v.is_number())
    {
        variables.push(
            Variable::new("temperature", VariableType::Number)
                .described("Sampling temperature")
                .with_default(temperature.clone()),
        );
    }
    if let Some(max_tokens) = ["maxTokens", "max_tokens"]
        .iter()
        .find_map(|key| node.data_field(key).or_else(|| node.config_field(key)))
        .filter(|v| v.is_number())
    {
        variables.push(
            Variable::new("max_tokens", VariableType::Number)
                .described("Maximum tokens in the response")
                .with_default(max_tokens.clone()),
        );
    }
    if let Some(context) = node.data_field("context") {
        let var_type = match context {
            Value::String(_) => VariableType::String,
            _ => VariableType::Json,
        };
        variables.push(
            Variable::new("context", var_type)
                .described("Additional context supplied to the model")
                .with_default(context.clone()),
        );
    }
    variables
}

fn numeric(node: &Node, key: &str) -> Option<f64> {
    node.data_field(key)
        .or_else(|| node.config_field(key))
        .and_then(Value::as_f64)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
