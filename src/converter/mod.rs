//! Pluggable node -> state converters.
//!
//! Every converter implements [`NodeConverter`]. The shared base behavior (capability
//! check, base validation, id generation, variable and tool extraction) lives here as
//! default methods and free helpers so concrete converters never re-implement it.

use crate::context::ConversionContext;
use crate::diagnostic::{codes, ConversionError, ConversionWarning, ValidationResult};
use crate::error::ConverterFailure;
use crate::ids;
use crate::journey::{State, StateType, Transition, Variable, VariableType};
use crate::workflow::Node;
use itertools::Itertools;
use serde_json::Value;

mod agent;
mod api;
mod generic;
mod registry;
mod starter;

pub use agent::AgentConverter;
pub use api::ApiConverter;
pub use generic::GenericConverter;
pub use registry::ConverterRegistry;
pub use starter::StarterConverter;

/// What a converter produces for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterOutput {
    pub states: Vec<State>,
    /// Rarely used; most transitions come from edges.
    pub transitions: Vec<Transition>,
    pub variables: Vec<Variable>,
}

impl ConverterOutput {
    pub fn single(state: State) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }
}

/// Defines the contract for converting nodes of some type family into journey states.
pub trait NodeConverter: Send + Sync {
    /// The primary type tag this converter handles.
    fn node_type(&self) -> &str;

    /// Additional type tags accepted either as the node type or as `data.type`.
    fn supported_types(&self) -> &[&str] {
        &[]
    }

    fn can_convert(&self, node: &Node) -> bool {
        accepts_type(node, self.node_type(), self.supported_types())
    }

    fn convert(
        &self,
        node: &Node,
        ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure>;

    /// Base validation followed by the converter-specific rules.
    fn validate_input(&self, node: &Node) -> ValidationResult {
        let base = validate_base(node);
        if !base.is_valid() {
            return base;
        }
        base.merge(self.validate_node(node))
    }

    /// Converter-specific validation. Defaults to accepting everything.
    fn validate_node(&self, _node: &Node) -> ValidationResult {
        ValidationResult::ok()
    }

    /// Generates a state id for a node following the shared naming rule.
    fn state_id(&self, node: &Node, suffix: Option<&str>) -> String {
        ids::state_id(&node.id, suffix)
    }
}

/// The base capability check: primary type, or a supported tag as type or `data.type`.
pub fn accepts_type(node: &Node, primary: &str, supported: &[&str]) -> bool {
    if node.node_type == primary || supported.contains(&node.node_type.as_str()) {
        return true;
    }
    node.data_type_tag()
        .is_some_and(|tag| tag == primary || supported.contains(&tag))
}

/// Rejects nodes without an id and warns on nodes without a data bag.
pub fn validate_base(node: &Node) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if node.id.trim().is_empty() {
        result.error(
            ConversionError::critical(codes::MISSING_NODE_ID, "Node has no id")
                .suggest("Give every node a unique, non-empty id"),
        );
        return result;
    }
    if node.data.is_none() {
        result.warn(
            ConversionWarning::low(
                codes::MISSING_NODE_DATA,
                format!("Node '{}' has no data; defaults will be used", node.id),
            )
            .for_node(&node.id)
            .suggest("Configure the node in the editor before converting"),
        );
    }
    result
}

/// Reads the node's `inputs` and `outputs` declarations into variables.
///
/// Both object form (`{"name": "string"}` or `{"name": {"type": ..}}`) and array form
/// (`[{"name": .., "type": ..}]`) are accepted. Duplicate names keep the first entry.
pub fn extract_variables(node: &Node) -> Vec<Variable> {
    ["inputs", "outputs"]
        .iter()
        .filter_map(|key| node.data_field(key).map(|v| (*key, v)))
        .flat_map(|(key, decl)| variables_from_declaration(key, decl))
        .unique_by(|v| v.name.clone())
        .collect()
}

fn variables_from_declaration(kind: &str, decl: &Value) -> Vec<Variable> {
    let direction = if kind == "inputs" { "Input" } else { "Output" };
    match decl {
        Value::Object(map) => map
            .iter()
            .map(|(name, spec)| variable_from_spec(name, spec, direction))
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name").and_then(Value::as_str)?;
                Some(variable_from_spec(name, item, direction))
            })
            .collect(),
        _ => vec![],
    }
}

fn variable_from_spec(name: &str, spec: &Value, direction: &str) -> Variable {
    let declared = match spec {
        Value::String(type_name) => VariableType::from_name(type_name),
        Value::Object(fields) => fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(VariableType::from_name),
        _ => None,
    };
    let default_value = match spec {
        Value::Object(fields) => fields.get("default").filter(|v| !v.is_null()).cloned(),
        Value::String(_) => None,
        other => Some(other.clone()),
    };
    let var_type = declared
        .or_else(|| default_value.as_ref().map(VariableType::infer))
        .unwrap_or(VariableType::String);
    let description = spec
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} '{}'", direction, name));

    let mut variable = Variable::new(name, var_type).described(description);
    variable.default_value = default_value;
    variable
}

/// Collects tool identifiers from `tools.access` and `config.tools`, de-duplicated
/// in first-seen order. Entries may be strings or objects with an `id` or `name`.
pub fn extract_tools(node: &Node) -> Vec<String> {
    let access = node
        .data_field("tools")
        .and_then(|t| t.get("access"))
        .and_then(Value::as_array);
    let configured = node.config_field("tools").and_then(Value::as_array);

    access
        .into_iter()
        .chain(configured)
        .flatten()
        .filter_map(tool_identifier)
        .unique()
        .collect()
}

fn tool_identifier(entry: &Value) -> Option<String> {
    let id = match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(fields) => fields
            .get("id")
            .or_else(|| fields.get("name"))
            .and_then(Value::as_str),
        _ => None,
    }?;
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Lowercases and replaces runs of non-alphanumeric characters with one underscore.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .join("_")
}

/// Builds the state every reference converter falls back to when its own
/// conversion fails part way.
pub(crate) fn fallback_state(node: &Node, state_type: StateType, body: &str) -> State {
    State::new(ids::state_id(&node.id, None), state_type, node.display_name())
        .with_description(format!("Fallback for node '{}'", node.id))
        .with_content(body)
        .with_position(node.position)
}
