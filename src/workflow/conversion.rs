use super::definition::WorkflowGraph;
use crate::error::WorkflowImportError;

/// A trait for custom editor formats that can be converted into a Waymark `WorkflowGraph`.
///
/// The engine only understands its canonical graph model. Implement this trait on the
/// structs that mirror your editor's export format to provide the translation layer.
///
/// # Example
///
/// ```rust,no_run
/// use waymark::prelude::*;
/// use waymark::error::WorkflowImportError;
///
/// struct CanvasNode { id: String, kind: String }
/// struct CanvasExport { name: String, nodes: Vec<CanvasNode> }
///
/// impl IntoWorkflow for CanvasExport {
///     fn into_workflow(self) -> Result<WorkflowGraph, WorkflowImportError> {
///         if self.name.is_empty() {
///             return Err(WorkflowImportError::Invalid("export has no name".to_string()));
///         }
///         let mut graph = WorkflowGraph::new("canvas", self.name);
///         for node in self.nodes {
///             graph.nodes.push(Node::new(node.id, node.kind));
///         }
///         Ok(graph)
///     }
/// }
/// ```
pub trait IntoWorkflow {
    /// Consumes the object and converts it into a graph the engine can convert.
    fn into_workflow(self) -> Result<WorkflowGraph, WorkflowImportError>;
}
