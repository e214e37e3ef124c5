use crate::workflow::Position;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The role a state plays in the conversation. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    Initial,
    Chat,
    Tool,
    Condition,
    LoopStart,
    LoopEnd,
    ParallelStart,
    ParallelEnd,
    Final,
}

impl StateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::Initial => "initial",
            StateType::Chat => "chat",
            StateType::Tool => "tool",
            StateType::Condition => "condition",
            StateType::LoopStart => "loop_start",
            StateType::LoopEnd => "loop_end",
            StateType::ParallelStart => "parallel_start",
            StateType::ParallelEnd => "parallel_end",
            StateType::Final => "final",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state of the generated journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: String,
    #[serde(rename = "type")]
    pub state_type: StateType,
    pub name: String,
    pub description: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl State {
    pub fn new(id: impl Into<String>, state_type: StateType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state_type,
            name: name.into(),
            description: String::new(),
            content: String::new(),
            tools: None,
            variables: None,
            conditions: None,
            position: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Empty lists are stored as `None` so the serialized journey stays compact.
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = (!tools.is_empty()).then_some(tools);
        self
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = (!variables.is_empty()).then_some(variables);
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = (!conditions.is_empty()).then_some(conditions);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    Json,
    Array,
}

impl VariableType {
    /// Infers the variable type from a sample JSON value.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::String(_) => VariableType::String,
            Value::Number(_) => VariableType::Number,
            Value::Bool(_) => VariableType::Boolean,
            Value::Array(_) => VariableType::Array,
            Value::Object(_) | Value::Null => VariableType::Json,
        }
    }

    /// Parses a declared type name, accepting the usual aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" | "str" => Some(VariableType::String),
            "number" | "integer" | "int" | "float" | "double" => Some(VariableType::Number),
            "boolean" | "bool" => Some(VariableType::Boolean),
            "json" | "object" | "map" => Some(VariableType::Json),
            "array" | "list" => Some(VariableType::Array),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            var_type,
            description: None,
            default_value: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}
