use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The visual workflow graph handed to the engine. Read-only during a conversion.
///
/// Node and edge ids are expected to be unique, but edges may still point at
/// nodes that do not exist; the engine treats that as a recoverable condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: WorkflowMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

/// A single node on the canvas. The type tag is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    /// Arbitrary configuration. Expected to be a JSON object, but kept as a raw
    /// value because the graph comes from an untrusted editor export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
}

impl WorkflowGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            nodes: vec![],
            edges: vec![],
            metadata: WorkflowMetadata::default(),
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    /// The data bag, if it is a JSON object.
    pub fn data_map(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref().and_then(Value::as_object)
    }

    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data_map().and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    /// A trimmed, non-empty string field of the data bag.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data_field(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// A field of the nested `config` object.
    pub fn config_field(&self, key: &str) -> Option<&Value> {
        self.data_field("config")
            .and_then(Value::as_object)
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_field(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The secondary type tag stored as `data.type`.
    pub fn data_type_tag(&self) -> Option<&str> {
        self.data_str("type")
    }

    /// Human-facing name: `label`, then `name`, then `title`, then the id.
    pub fn display_name(&self) -> &str {
        self.data_str("label")
            .or_else(|| self.data_str("name"))
            .or_else(|| self.data_str("title"))
            .unwrap_or(&self.id)
    }
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// The source handle, with empty strings treated as absent.
    pub fn source_handle(&self) -> Option<&str> {
        self.source_handle.as_deref().filter(|h| !h.is_empty())
    }

    pub fn target_handle(&self) -> Option<&str> {
        self.target_handle.as_deref().filter(|h| !h.is_empty())
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
