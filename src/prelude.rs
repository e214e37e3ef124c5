//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the waymark crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use waymark::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/workflow.json")?;
//! let graph: WorkflowGraph = serde_json::from_str(&json)?;
//!
//! let engine = ConversionEngine::new();
//! let result = engine.convert(&graph, ConversionOptions::default(), None);
//! println!("success: {}, states: {}", result.success, result.metadata.converted_states);
//! # Ok(())
//! # }
//! ```

// Engine and configuration
pub use crate::context::{ConversionContext, ConversionOptions};
pub use crate::engine::{
    ConversionEngine, ConversionMetadata, ConversionPhase, ConversionProgress, ConversionResult,
    EngineBuilder, ProgressSink,
};

// Extension points
pub use crate::analysis::NodeAnalyzer;
pub use crate::converter::{ConverterOutput, ConverterRegistry, NodeConverter};
pub use crate::validation::ValidationEngine;

// Input and output models
pub use crate::journey::{Journey, State, StateType, Transition, Variable, VariableType};
pub use crate::workflow::{Edge, IntoWorkflow, Node, Position, WorkflowGraph};

// Diagnostics and errors
pub use crate::diagnostic::{
    ConversionError, ConversionWarning, ErrorSeverity, ValidationResult, WarningImpact,
};
pub use crate::error::{ConvertError, ConverterFailure, RecoveryHint};

// Result type alias for convenience
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
