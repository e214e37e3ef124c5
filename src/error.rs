use crate::journey::State;
use thiserror::Error;

/// Errors a node converter can raise while turning a node into states.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("Node '{node_id}' is missing required field '{field}'")]
    MissingField { node_id: String, field: String },

    #[error("Node '{node_id}' has an invalid configuration: {message}")]
    InvalidConfig { node_id: String, message: String },

    #[error("Node '{node_id}' uses an unsupported feature: {message}")]
    Unsupported { node_id: String, message: String },

    #[error("Converter for node '{node_id}' panicked: {message}")]
    Panicked { node_id: String, message: String },
}

impl ConvertError {
    pub fn node_id(&self) -> &str {
        match self {
            ConvertError::MissingField { node_id, .. }
            | ConvertError::InvalidConfig { node_id, .. }
            | ConvertError::Unsupported { node_id, .. }
            | ConvertError::Panicked { node_id, .. } => node_id,
        }
    }

    /// The hint used when the raising code does not choose one explicitly.
    pub fn default_hint(&self) -> RecoveryHint {
        match self {
            ConvertError::Unsupported { .. } => RecoveryHint::Skip,
            _ => RecoveryHint::Fallback,
        }
    }
}

/// How the raising code wants recovery to treat a failed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Synthesize a fallback state matching the node's category.
    Fallback,
    /// Drop the node and every edge touching it.
    Skip,
    /// Produce the smallest valid state and nothing else.
    Minimal,
}

/// A failed conversion, tagged with a recovery hint and optionally a
/// converter-built fallback state of the right type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct ConverterFailure {
    #[source]
    pub error: ConvertError,
    pub hint: RecoveryHint,
    pub fallback: Option<Box<State>>,
}

impl ConverterFailure {
    pub fn new(error: ConvertError) -> Self {
        let hint = error.default_hint();
        Self {
            error,
            hint,
            fallback: None,
        }
    }

    pub fn with_hint(mut self, hint: RecoveryHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_fallback(mut self, state: State) -> Self {
        self.fallback = Some(Box::new(state));
        self
    }
}

impl From<ConvertError> for ConverterFailure {
    fn from(error: ConvertError) -> Self {
        ConverterFailure::new(error)
    }
}

/// Failures of a single edge that the transition builder cannot classify as a
/// plain dropped edge. These are the boundary for transition-level recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Edge '{edge_id}' is malformed: {reason}")]
    MalformedEdge { edge_id: String, reason: String },

    #[error("Edge '{edge_id}' has a malformed handle '{handle}'")]
    MalformedHandle { edge_id: String, handle: String },
}

impl TransitionError {
    pub fn edge_id(&self) -> &str {
        match self {
            TransitionError::MalformedEdge { edge_id, .. }
            | TransitionError::MalformedHandle { edge_id, .. } => edge_id,
        }
    }
}

/// Raised by a node analyzer. Always downgraded to a warning by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Node has no id")]
    MissingId,

    #[error("Node '{0}' has no type tag")]
    MissingType(String),

    #[error("Node '{node_id}' has a malformed data bag: expected an object, found {found}")]
    MalformedData { node_id: String, found: String },

    #[error("Analysis of node '{node_id}' failed: {message}")]
    Failed { node_id: String, message: String },
}

/// Failures that escape a whole conversion run rather than one node or edge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Workflow is invalid: {0}")]
    InvalidWorkflow(String),

    #[error("Conversion context is corrupted: {0}")]
    ContextCorrupted(String),

    #[error("Conversion aborted during {phase}: {message}")]
    Panicked { phase: String, message: String },
}

/// Errors that can occur when translating a custom editor format into a `WorkflowGraph`.
#[derive(Error, Debug, Clone)]
pub enum WorkflowImportError {
    #[error("Failed to parse workflow JSON: {0}")]
    Parse(String),

    #[error("Invalid workflow data: {0}")]
    Invalid(String),
}
