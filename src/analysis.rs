use crate::context::ConversionContext;
use crate::error::AnalysisError;
use crate::workflow::Node;
use serde_json::Value;

/// Inspects one node before conversion. Any error is downgraded to a
/// `NODE_ANALYSIS_ERROR` warning and the phase continues.
pub trait NodeAnalyzer: Send + Sync {
    fn analyze_node(&self, node: &Node, ctx: &ConversionContext<'_>) -> Result<(), AnalysisError>;
}

/// Checks the shape every converter relies on: a non-empty id, a type tag, and a
/// data bag that is an object when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralAnalyzer;

impl NodeAnalyzer for StructuralAnalyzer {
    fn analyze_node(&self, node: &Node, _ctx: &ConversionContext<'_>) -> Result<(), AnalysisError> {
        if node.id.trim().is_empty() {
            return Err(AnalysisError::MissingId);
        }
        if node.node_type.trim().is_empty() {
            return Err(AnalysisError::MissingType(node.id.clone()));
        }
        match &node.data {
            None | Some(Value::Object(_)) => Ok(()),
            Some(other) => Err(AnalysisError::MalformedData {
                node_id: node.id.clone(),
                found: describe_json(other).to_string(),
            }),
        }
    }
}

fn describe_json(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
