//! # Waymark - Workflow to Journey Conversion Engine
//!
//! **Waymark** compiles node-based workflow graphs, as drawn in a visual editor, into
//! conversational *journeys*: state machines made of typed states and conditioned,
//! weighted transitions. It behaves like a small compiler. It analyzes an untrusted
//! graph, dispatches each node to a pluggable converter, synthesizes transitions from
//! edge handle conventions, and recovers from partial failure so a structurally valid
//! journey comes out whenever anything could be converted at all.
//!
//! ## Core Workflow
//!
//! 1.  **Load Your Graph**: Deserialize a [`WorkflowGraph`](workflow::WorkflowGraph) from
//!     JSON, or implement [`IntoWorkflow`](workflow::IntoWorkflow) for your editor's
//!     own export format.
//! 2.  **Build an Engine**: Use [`ConversionEngine::builder`](engine::ConversionEngine::builder)
//!     to register custom converters or map your node types to the built-in ones.
//! 3.  **Convert**: Call `convert` (or `convert_with_recovery`) and inspect the
//!     [`ConversionResult`](engine::ConversionResult): the journey, every error and
//!     warning with display-ready suggestions, and run metadata.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waymark::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let graph = WorkflowGraph::new("support-flow", "Support")
//!         .with_node(Node::new("start", "starter").with_data(json!({ "label": "Start" })))
//!         .with_node(Node::new("helper", "assistant").with_data(json!({
//!             "label": "Helper",
//!             "prompt": "Answer billing questions."
//!         })))
//!         .with_edge(Edge::new("e1", "start", "helper"));
//!
//!     // "assistant" is our editor's name for an agent node.
//!     let engine = ConversionEngine::builder()
//!         .with_type_mapping("assistant", "agent")
//!         .build();
//!
//!     let result = engine.convert(&graph, ConversionOptions::default(), None);
//!     for warning in &result.warnings {
//!         println!("{}", warning);
//!     }
//!     if let Some(journey) = &result.journey {
//!         println!("{}", serde_json::to_string_pretty(journey)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod context;
pub mod converter;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod ids;
pub mod journey;
pub mod prelude;
pub mod recovery;
pub mod transition;
pub mod validation;
pub mod workflow;
