//! Common test utilities for building workflow graphs and test collaborators.
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use waymark::context::ConversionContext;
use waymark::error::{AnalysisError, ConvertError, ConverterFailure, RecoveryHint};
use waymark::prelude::*;

#[allow(dead_code)]
pub fn starter(id: &str) -> Node {
    Node::new(id, "starter").with_data(json!({ "label": "Start", "welcomeMessage": "Hi there!" }))
}

#[allow(dead_code)]
pub fn agent(id: &str, prompt: &str) -> Node {
    Node::new(id, "agent").with_data(json!({ "label": "Assistant", "prompt": prompt }))
}

#[allow(dead_code)]
pub fn api(id: &str, url: &str) -> Node {
    Node::new(id, "api").with_data(json!({
        "label": "Lookup Invoice",
        "url": url,
        "method": "get"
    }))
}

#[allow(dead_code)]
pub fn edge(id: &str, source: &str, target: &str) -> Edge {
    Edge::new(id, source, target)
}

/// `starter -> agent -> api` with default handles.
///
/// Node ids: `start`, `assistant`, `lookup`.
#[allow(dead_code)]
pub fn linear_workflow() -> WorkflowGraph {
    WorkflowGraph::new("wf-linear", "Billing Support")
        .with_node(starter("start"))
        .with_node(agent("assistant", "Help the user with billing questions."))
        .with_node(api("lookup", "https://api.example.com/invoices/{id}"))
        .with_edge(edge("e1", "start", "assistant"))
        .with_edge(edge("e2", "assistant", "lookup"))
}

/// `starter -> loop -> agent`, leaving the loop through its end handle.
#[allow(dead_code)]
pub fn loop_workflow() -> WorkflowGraph {
    WorkflowGraph::new("wf-loop", "Invoice Review")
        .with_node(starter("start"))
        .with_node(
            Node::new("repeat", "loop").with_data(json!({ "label": "Repeat", "items": "invoices" })),
        )
        .with_node(agent("assistant", "Summarize the reviewed invoices."))
        .with_edge(edge("e1", "start", "repeat"))
        .with_edge(edge("e2", "repeat", "assistant").with_source_handle("loop-end-source"))
}

#[allow(dead_code)]
pub fn warning_codes(result: &ConversionResult) -> Vec<&str> {
    result.warnings.iter().map(|w| w.code.as_str()).collect()
}

#[allow(dead_code)]
pub fn error_codes(result: &ConversionResult) -> Vec<&str> {
    result.errors.iter().map(|e| e.code.as_str()).collect()
}

#[allow(dead_code)]
pub fn state_ids(journey: &Journey) -> Vec<&str> {
    journey.states.iter().map(|s| s.id.as_str()).collect()
}

/// A converter that always fails with the given error kind and hint.
#[allow(dead_code)]
pub struct FailingConverter {
    pub tag: &'static str,
    pub unsupported: bool,
    pub hint: Option<RecoveryHint>,
}

#[allow(dead_code)]
impl FailingConverter {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            unsupported: false,
            hint: None,
        }
    }

    pub fn unsupported(tag: &'static str) -> Self {
        Self {
            tag,
            unsupported: true,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: RecoveryHint) -> Self {
        self.hint = Some(hint);
        self
    }
}

impl NodeConverter for FailingConverter {
    fn node_type(&self) -> &str {
        self.tag
    }

    fn convert(
        &self,
        node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        let error = if self.unsupported {
            ConvertError::Unsupported {
                node_id: node.id.clone(),
                message: "forced failure".to_string(),
            }
        } else {
            ConvertError::InvalidConfig {
                node_id: node.id.clone(),
                message: "forced failure".to_string(),
            }
        };
        let failure = ConverterFailure::new(error);
        Err(match self.hint {
            Some(hint) => failure.with_hint(hint),
            None => failure,
        })
    }
}

/// A converter whose `convert` panics.
#[allow(dead_code)]
pub struct PanickingConverter(pub &'static str);

impl NodeConverter for PanickingConverter {
    fn node_type(&self) -> &str {
        self.0
    }

    fn convert(
        &self,
        _node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        panic!("converter exploded");
    }
}

/// An analyzer that counts its invocations and rejects nodes tagged `reject`.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CountingAnalyzer(pub Arc<AtomicUsize>);

#[allow(dead_code)]
impl CountingAnalyzer {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl NodeAnalyzer for CountingAnalyzer {
    fn analyze_node(&self, node: &Node, _ctx: &ConversionContext<'_>) -> Result<(), AnalysisError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        if node.node_type == "reject" {
            return Err(AnalysisError::Failed {
                node_id: node.id.clone(),
                message: "rejected by test analyzer".to_string(),
            });
        }
        Ok(())
    }
}

/// A validator that accepts every workflow and panics on every journey.
#[allow(dead_code)]
pub struct PanickingValidator;

impl ValidationEngine for PanickingValidator {
    fn validate_workflow(&self, _graph: &WorkflowGraph, _registry: &ConverterRegistry) -> ValidationResult {
        ValidationResult::ok()
    }

    fn validate_journey(&self, _journey: &Journey) -> ValidationResult {
        panic!("validator exploded");
    }
}

#[allow(dead_code)]
pub const CANVAS_WORKFLOW_JSON: &str = r#"{
    "id": "wf-json",
    "name": "Support Desk",
    "description": "Routes support requests",
    "nodes": [
        { "id": "start", "type": "starter", "position": { "x": 0, "y": 0 },
          "data": { "label": "Start", "triggerType": "webhook", "url": "/hooks/support" } },
        { "id": "route", "type": "router", "position": { "x": 200, "y": 0 },
          "data": { "label": "Route" } },
        { "id": "billing", "type": "agent", "position": { "x": 400, "y": -100 },
          "data": { "label": "Billing", "prompt": "Handle billing questions." } },
        { "id": "tech", "type": "agent", "position": { "x": 400, "y": 100 },
          "data": { "label": "Tech", "prompt": "Handle technical questions." } }
    ],
    "edges": [
        { "id": "e1", "source": "start", "target": "route" },
        { "id": "e2", "source": "route", "target": "billing", "sourceHandle": "condition-1" },
        { "id": "e3", "source": "route", "target": "tech", "sourceHandle": "condition-2" }
    ],
    "metadata": { "version": "2", "workspaceId": "ws-1", "createdAt": "2026-01-05T10:00:00Z" }
}"#;
