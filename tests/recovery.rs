//! Tests for node, transition and critical error recovery.
mod common;
use common::*;
use serde_json::json;
use waymark::context::ConversionContext;
use waymark::diagnostic::codes;
use waymark::error::EngineError;
use waymark::prelude::*;
use waymark::recovery::{ErrorRecovery, RecoveryStrategy, repair_conversion_context};

/// `start -> middle -> assistant`, with `middle` supplied by the caller.
fn workflow_around(middle: Node) -> WorkflowGraph {
    let id = middle.id.clone();
    WorkflowGraph::new("wf-recovery", "Recovery")
        .with_node(starter("start"))
        .with_node(middle)
        .with_node(agent("assistant", "Wrap up."))
        .with_edge(edge("e1", "start", &id))
        .with_edge(edge("e2", &id, "assistant"))
}

fn warning<'r>(result: &'r ConversionResult, code: &str) -> &'r ConversionWarning {
    result
        .warnings
        .iter()
        .find(|w| w.code == code)
        .unwrap_or_else(|| panic!("missing warning {}: {:?}", code, result.warnings))
}

#[test]
fn test_agent_failure_falls_back_to_chat_state() {
    let graph = workflow_around(Node::new("broken", "agent").with_data(json!({ "prompt": 12 })));
    let result = ConversionEngine::new().convert(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    assert_eq!(error_codes(&result), vec![codes::NODE_CONVERSION_ERROR]);
    assert!(warning(&result, codes::NODE_RECOVERED).message.contains("fallback_chat_state"));

    let journey = result.journey.expect("journey should still be produced");
    let fallback = journey.state("state_broken").expect("fallback state");
    assert_eq!(fallback.state_type, StateType::Chat);
    assert_eq!(fallback.content, "I'm here to help. What would you like to do?");
    // Edges through a recovered node survive.
    assert_eq!(journey.transitions.len(), 2);
}

#[test]
fn test_api_failure_falls_back_to_tool_state() {
    let graph = workflow_around(
        Node::new("slow", "api").with_data(json!({ "url": "https://x.test/a", "timeout": "soon" })),
    );
    let result = ConversionEngine::new().convert(&graph, ConversionOptions::default(), None);

    assert!(warning(&result, codes::NODE_RECOVERED).message.contains("fallback_tool_state"));
    let journey = result.journey.expect("journey should still be produced");
    let fallback = journey.state("state_slow").expect("fallback state");
    assert_eq!(fallback.state_type, StateType::Tool);
    assert_eq!(fallback.content, "Calling an external service.");
}

#[test]
fn test_panicking_converter_is_contained() {
    let engine = ConversionEngine::builder()
        .with_converter("agent", PanickingConverter("agent"))
        .build();
    let graph = linear_workflow();
    let result = engine.convert(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    let error = &result.errors[0];
    assert_eq!(error.code, codes::NODE_CONVERSION_ERROR);
    assert_eq!(error.node_id.as_deref(), Some("assistant"));
    assert!(error.message.contains("converter exploded"));

    let journey = result.journey.expect("journey should still be produced");
    assert_eq!(state_ids(&journey), vec!["state_start", "state_assistant", "state_lookup"]);
    let fallback = journey.state("state_assistant").expect("fallback state");
    assert_eq!(fallback.state_type, StateType::Chat);
}

#[test]
fn test_unsupported_node_is_skipped_with_its_edges() {
    let engine = ConversionEngine::builder()
        .with_converter("custom", FailingConverter::unsupported("custom"))
        .build();
    let graph = workflow_around(Node::new("mid", "custom").with_data(json!({})));
    let result = engine.convert(&graph, ConversionOptions::default(), None);

    let skipped = warning(&result, codes::NODE_SKIPPED);
    assert_eq!(skipped.impact, WarningImpact::High);
    assert_eq!(skipped.node_id.as_deref(), Some("mid"));

    let dropped: Vec<&str> = result
        .warnings
        .iter()
        .filter(|w| w.code == codes::SKIPPED_NODE_EDGE)
        .filter_map(|w| w.edge_id.as_deref())
        .collect();
    assert_eq!(dropped, vec!["e1", "e2"]);

    let journey = result.journey.expect("journey should still be produced");
    assert_eq!(state_ids(&journey), vec!["state_start", "state_assistant"]);
    assert!(journey.transitions.is_empty());
    assert_eq!(result.metadata.skipped_nodes, 1);
}

#[test]
fn test_minimal_hint_produces_placeholder() {
    let engine = ConversionEngine::builder()
        .with_converter(
            "custom",
            FailingConverter::new("custom").with_hint(RecoveryHint::Minimal),
        )
        .build();
    let graph = workflow_around(Node::new("mid", "custom").with_data(json!({})));
    let result = engine.convert(&graph, ConversionOptions::default(), None);

    assert!(warning(&result, codes::NODE_RECOVERED).message.contains("minimal_state"));
    let journey = result.journey.expect("journey should still be produced");
    let placeholder = journey.state("state_mid").expect("placeholder state");
    assert_eq!(placeholder.state_type, StateType::Chat);
    assert_eq!(placeholder.content, "Continue.");
    assert_eq!(journey.transitions.len(), 2);
}

#[test]
fn test_unknown_family_falls_back_to_minimal_state() {
    let graph = WorkflowGraph::new("wf-x", "X").with_node(Node::new("mid", "custom"));
    let mut ctx = ConversionContext::new(&graph, ConversionOptions::default());
    let failure = ConverterFailure::new(ConvertError::InvalidConfig {
        node_id: "mid".to_string(),
        message: "bad".to_string(),
    });

    let recovery = ErrorRecovery::new().recover_from_node_error(&graph.nodes[0], &failure, &mut ctx);

    assert_eq!(recovery.strategy, RecoveryStrategy::MinimalState);
    assert!(!recovery.skip_edges);
    assert_eq!(recovery.state.map(|s| s.content).as_deref(), Some("Continue."));
}

#[test]
fn test_node_recovery_uses_family_and_ignores_foreign_fallbacks() {
    let graph = WorkflowGraph::new("wf-x", "X").with_node(api("lookup", "https://x.test/a"));
    let mut ctx = ConversionContext::new(&graph, ConversionOptions::default());
    let foreign = State::new("state_other", StateType::Chat, "Other");
    let failure = ConverterFailure::new(ConvertError::MissingField {
        node_id: "lookup".to_string(),
        field: "url".to_string(),
    })
    .with_fallback(foreign);

    let recovery = ErrorRecovery::new().recover_from_node_error(&graph.nodes[0], &failure, &mut ctx);

    assert_eq!(recovery.strategy, RecoveryStrategy::FallbackToolState);
    let state = recovery.state.expect("replacement state");
    assert_eq!(state.id, "state_lookup");
    assert_eq!(state.state_type, StateType::Tool);
    // Recovery records the warning but leaves insertion to the caller.
    assert_eq!(ctx.state_count(), 0);
    assert_eq!(ctx.warnings[0].code, codes::NODE_RECOVERED);
}

#[test]
fn test_malformed_handle_is_recovered_as_plain_transition() {
    let graph = linear_workflow()
        .with_edge(edge("e3", "start", "lookup").with_source_handle("condition-"));
    let result = ConversionEngine::new().convert(&graph, ConversionOptions::default(), None);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(warning_codes(&result), vec![codes::TRANSITION_RECOVERED]);

    let journey = result.journey.expect("journey should be produced");
    let recovered = journey
        .transitions
        .iter()
        .find(|t| t.id == "transition_state_start_to_state_lookup")
        .expect("recovered transition");
    assert_eq!(recovered.condition, None);
    assert_eq!(
        recovered.description.as_deref(),
        Some("Recovered transition for edge 'e3'")
    );
}

#[test]
fn test_unrecoverable_edge_is_reported() {
    let graph = linear_workflow().with_edge(edge("e3", "start", ""));
    let result = ConversionEngine::new().convert(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    assert_eq!(error_codes(&result), vec![codes::TRANSITION_RECOVERY_FAILED]);
    assert_eq!(result.errors[0].edge_id.as_deref(), Some("e3"));
    assert_eq!(result.metadata.transitions, 2);
}

#[test]
fn test_critical_failure_without_recovery_returns_no_journey() {
    let engine = ConversionEngine::builder().with_validator(PanickingValidator).build();
    let graph = linear_workflow();
    let result = engine.convert(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    assert!(result.journey.is_none());
    assert_eq!(error_codes(&result), vec![codes::CRITICAL_CONVERSION_ERROR]);
    assert_eq!(result.errors[0].severity, ErrorSeverity::Critical);
    assert!(result.errors[0].message.contains("validator exploded"));
    assert_eq!(result.metadata.converted_states, 3);
    assert_eq!(result.metadata.transitions, 0);
}

#[test]
fn test_critical_failure_with_recovery_returns_partial_journey() {
    let engine = ConversionEngine::builder().with_validator(PanickingValidator).build();
    let graph = linear_workflow();
    let result = engine.convert_with_recovery(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    assert_eq!(error_codes(&result), vec![codes::CRITICAL_CONVERSION_ERROR]);

    let journey = result.journey.expect("partial journey");
    assert_eq!(journey.title, "Billing Support (Partial)");
    assert!(journey.description.contains("validator exploded"));
    assert_eq!(state_ids(&journey), vec!["state_start", "state_assistant", "state_lookup"]);
    assert!(journey.transitions.is_empty());
    assert!(journey.metadata.partial_conversion);
    assert_eq!(
        journey.metadata.recovery_actions,
        vec![
            "Preserved 3 converted states",
            "Preserved 2 variables",
            "Discarded all transitions"
        ]
    );
}

#[test]
fn test_panicking_progress_sink_aborts_the_run() {
    let mut sink = |progress: &ConversionProgress| {
        if progress.phase == ConversionPhase::Analyzing {
            panic!("sink exploded");
        }
    };
    let graph = linear_workflow();
    let result = ConversionEngine::new().convert_with_recovery(
        &graph,
        ConversionOptions::default(),
        Some(&mut sink),
    );

    assert!(!result.success);
    assert_eq!(error_codes(&result), vec![codes::CRITICAL_CONVERSION_ERROR]);
    assert!(result.errors[0].message.contains("analyzing"));
    // Nothing was converted, so there is nothing to salvage.
    assert!(result.journey.is_none());
}

#[test]
fn test_workflow_without_id_is_rejected() {
    let graph = WorkflowGraph::new("", "Nameless").with_node(starter("start"));
    let result = ConversionEngine::new().convert(&graph, ConversionOptions::default(), None);

    assert!(!result.success);
    assert!(result.journey.is_none());
    assert_eq!(error_codes(&result), vec![codes::CRITICAL_CONVERSION_ERROR]);
    assert!(result.errors[0].message.contains("workflow id must not be empty"));
}

#[test]
fn test_repair_is_idempotent() {
    let graph = linear_workflow();
    let mut ctx = ConversionContext::new(&graph, ConversionOptions::default());
    assert!(repair_conversion_context(&mut ctx).is_empty());

    ctx.node_lookup.clear();
    let actions = repair_conversion_context(&mut ctx);
    assert_eq!(actions.len(), 1);
    assert!(ctx.node("assistant").is_some());
    assert_eq!(ctx.outgoing_edges("start").len(), 1);

    assert!(repair_conversion_context(&mut ctx).is_empty());
}

#[test]
fn test_critical_recovery_needs_at_least_one_state() {
    let graph = linear_workflow();
    let mut ctx = ConversionContext::new(&graph, ConversionOptions::default());
    let cause = EngineError::ContextCorrupted("lost track".to_string());

    let empty = ErrorRecovery::new().recover_from_critical_error(&cause, &mut ctx);
    assert!(!empty.can_recover);
    assert!(empty.partial_result.is_none());
    assert_eq!(
        empty.recovery_actions,
        vec!["No states were converted before the failure"]
    );

    ctx.insert_state(
        State::new("state_start", StateType::Initial, "Start")
            .with_conditions(vec!["User starts a conversation".to_string()]),
    );
    let recovered = ErrorRecovery::new().recover_from_critical_error(&cause, &mut ctx);
    assert!(recovered.can_recover);
    let journey = recovered.partial_result.expect("partial journey");
    assert_eq!(journey.id, "journey_wf-linear");
    assert_eq!(journey.conditions, vec!["User starts a conversation"]);
    assert_eq!(journey.metadata.recovery_actions, recovered.recovery_actions);
}
