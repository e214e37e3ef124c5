//! Tests for the reference converters, the shared base helpers and the registry.
mod common;
use serde_json::json;
use waymark::context::ConversionContext;
use waymark::converter::{
    AgentConverter, ApiConverter, GenericConverter, StarterConverter, extract_tools,
    extract_variables, sanitize_identifier, validate_base,
};
use waymark::diagnostic::codes;
use waymark::prelude::*;

fn convert_single(converter: &dyn NodeConverter, node: Node) -> Result<ConverterOutput, ConverterFailure> {
    let graph = WorkflowGraph::new("wf-unit", "Unit").with_node(node.clone());
    let ctx = ConversionContext::new(&graph, ConversionOptions::default());
    converter.convert(&node, &ctx)
}

fn warning_codes(result: &ValidationResult) -> Vec<&str> {
    result.warnings.iter().map(|w| w.code.as_str()).collect()
}

mod starter {
    use super::*;

    #[test]
    fn test_webhook_starter_describes_its_endpoint() {
        let node = Node::new("hook", "webhook").with_data(json!({ "url": "/hooks/in" }));
        let output = convert_single(&StarterConverter, node).expect("conversion");

        let state = &output.states[0];
        assert_eq!(state.id, "state_hook");
        assert_eq!(state.state_type, StateType::Initial);
        assert_eq!(
            state.content,
            "This workflow was started by a webhook request to /hooks/in. Processing the received data."
        );
        assert_eq!(
            state.conditions.as_deref(),
            Some(&["Webhook request received".to_string()][..])
        );
    }

    #[test]
    fn test_declared_conditions_and_input_are_carried_over() {
        let node = Node::new("start", "starter").with_data(json!({
            "welcomeMessage": "Hello!",
            "conditions": ["User is signed in"],
            "input": 42
        }));
        let output = convert_single(&StarterConverter, node).expect("conversion");

        let state = &output.states[0];
        assert_eq!(state.content, "Hello!");
        assert_eq!(
            state.conditions.clone().unwrap_or_default(),
            vec!["User starts a conversation", "User is signed in"]
        );
        let input = output
            .variables
            .iter()
            .find(|v| v.name == "start_input")
            .expect("start_input variable");
        assert_eq!(input.var_type, VariableType::Number);
        assert_eq!(input.default_value, Some(json!(42)));
    }

    #[test]
    fn test_invalid_conditions_fail_with_initial_fallback() {
        let node = Node::new("start", "starter").with_data(json!({ "conditions": 7 }));
        let failure = convert_single(&StarterConverter, node).expect_err("should fail");

        assert_eq!(failure.hint, RecoveryHint::Fallback);
        let fallback = failure.fallback.expect("fallback state");
        assert_eq!(fallback.state_type, StateType::Initial);
        assert_eq!(fallback.id, "state_start");
    }

    #[test]
    fn test_webhook_and_schedule_validation() {
        let webhook = Node::new("hook", "webhook").with_data(json!({}));
        let result = StarterConverter.validate_input(&webhook);
        assert!(result.is_valid());
        assert_eq!(warning_codes(&result), vec![codes::MISSING_WEBHOOK_ENDPOINT]);

        let schedule = Node::new("tick", "starter").with_data(json!({ "triggerType": "schedule" }));
        let result = StarterConverter.validate_input(&schedule);
        assert_eq!(warning_codes(&result), vec![codes::MISSING_SCHEDULE]);

        let scheduled = Node::new("tick", "schedule").with_data(json!({ "cron": "0 9 * * *" }));
        assert!(StarterConverter.validate_input(&scheduled).warnings.is_empty());
    }
}

mod agent {
    use super::*;

    #[test]
    fn test_prompt_takes_priority_over_other_fields() {
        let node = Node::new("a", "agent").with_data(json!({
            "systemPrompt": "You are terse.",
            "prompt": "Answer billing questions."
        }));
        let output = convert_single(&AgentConverter, node).expect("conversion");
        assert_eq!(output.states[0].content, "Answer billing questions.");
        assert_eq!(output.states[0].state_type, StateType::Chat);
    }

    #[test]
    fn test_config_prompt_is_used_last() {
        let node = Node::new("a", "llm").with_data(json!({ "config": { "prompt": "From config." } }));
        let output = convert_single(&AgentConverter, node).expect("conversion");
        assert_eq!(output.states[0].content, "From config.");
    }

    #[test]
    fn test_missing_prompt_generates_greeting() {
        let node = Node::new("a", "agent").with_data(json!({ "label": "Ava" }));
        let output = convert_single(&AgentConverter, node.clone()).expect("conversion");
        assert_eq!(output.states[0].content, "Hello! I'm Ava. How can I help you today?");

        let result = AgentConverter.validate_input(&node);
        let warning = &result.warnings[0];
        assert_eq!(warning.code, codes::MISSING_PROMPT);
        assert_eq!(warning.impact, WarningImpact::Low);
    }

    #[test]
    fn test_non_text_prompt_fails_with_chat_fallback() {
        let node = Node::new("a", "agent").with_data(json!({ "prompt": 12 }));
        let failure = convert_single(&AgentConverter, node).expect_err("should fail");

        assert!(matches!(failure.error, ConvertError::InvalidConfig { .. }));
        let fallback = failure.fallback.expect("fallback state");
        assert_eq!(fallback.state_type, StateType::Chat);
        assert_eq!(fallback.content, "I'm here to help. What would you like to do?");
    }

    #[test]
    fn test_model_settings_become_variables() {
        let node = Node::new("a", "agent").with_data(json!({
            "prompt": "Hi.",
            "model": "gpt-4o",
            "temperature": 0.3,
            "maxTokens": 512,
            "inputs": { "customer_id": "string" }
        }));
        let output = convert_single(&AgentConverter, node).expect("conversion");

        let names: Vec<&str> = output.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["customer_id", "model", "temperature", "max_tokens"]);
        assert_eq!(output.states[0].variables.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_temperature_out_of_range_is_flagged() {
        let node = Node::new("a", "agent").with_data(json!({ "prompt": "Hi.", "temperature": 3.5 }));
        let result = AgentConverter.validate_input(&node);
        assert_eq!(warning_codes(&result), vec![codes::TEMPERATURE_OUT_OF_RANGE]);
        assert_eq!(result.warnings[0].impact, WarningImpact::Medium);
    }
}

mod api {
    use super::*;

    #[test]
    fn test_tool_name_falls_back_to_url_path() {
        let node = Node::new("call-1", "api").with_data(json!({
            "url": "https://api.example.com/v1/users/{id}",
            "method": "post"
        }));
        let output = convert_single(&ApiConverter, node).expect("conversion");

        let state = &output.states[0];
        assert_eq!(state.state_type, StateType::Tool);
        assert_eq!(state.tools.as_deref(), Some(&["post_users".to_string()][..]));
        assert_eq!(
            state.content,
            "Call the `post_users` tool: POST https://api.example.com/v1/users/{id}."
        );
        let names: Vec<&str> = output.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["post_users_url", "post_users_method"]);
    }

    #[test]
    fn test_tool_name_falls_back_to_node_id() {
        let node = Node::new("node-abcdef123456", "http").with_data(json!({}));
        let output = convert_single(&ApiConverter, node).expect("conversion");
        assert_eq!(output.states[0].tools.as_deref(), Some(&["api_call_ef123456".to_string()][..]));
        assert_eq!(output.states[0].content, "Call the `api_call_ef123456` tool.");
    }

    #[test]
    fn test_credentials_never_reach_the_journey() {
        let node = Node::new("pay", "api").with_data(json!({
            "toolName": "charge_card",
            "url": "https://pay.example.com/charge",
            "auth": { "type": "bearer", "token": "s3cr3t" },
            "timeout": "5000"
        }));
        let output = convert_single(&ApiConverter, node).expect("conversion");

        let auth = output
            .variables
            .iter()
            .find(|v| v.name == "charge_card_auth")
            .expect("auth variable");
        assert_eq!(auth.default_value, Some(json!({ "type": "bearer" })));
        let timeout = output
            .variables
            .iter()
            .find(|v| v.name == "charge_card_timeout")
            .expect("timeout variable");
        assert_eq!(timeout.default_value, Some(json!(5000)));

        let serialized = serde_json::to_string(&output.states).expect("serialize");
        assert!(!serialized.contains("s3cr3t"));
    }

    #[test]
    fn test_invalid_timeout_fails_with_tool_fallback() {
        let node = Node::new("slow", "api").with_data(json!({ "url": "https://x.test/a", "timeout": "soon" }));
        let failure = convert_single(&ApiConverter, node).expect_err("should fail");
        let fallback = failure.fallback.expect("fallback state");
        assert_eq!(fallback.state_type, StateType::Tool);
        assert_eq!(fallback.content, "Calling an external service.");
    }

    #[test]
    fn test_validation_rules() {
        let missing_url = Node::new("a", "api").with_data(json!({ "label": "Call" }));
        let result = ApiConverter.validate_input(&missing_url);
        assert_eq!(result.errors[0].code, codes::MISSING_API_ENDPOINT);
        assert_eq!(result.errors[0].severity, ErrorSeverity::Error);

        let odd = Node::new("b", "api").with_data(json!({
            "url": "https://x.test/a",
            "method": "FETCH",
            "auth": { "type": "basic" },
            "headers": "Accept: json"
        }));
        let result = ApiConverter.validate_input(&odd);
        assert!(result.errors.is_empty());
        assert_eq!(
            warning_codes(&result),
            vec![
                codes::NON_STANDARD_HTTP_METHOD,
                codes::INCOMPLETE_AUTH,
                codes::INVALID_HEADERS
            ]
        );
    }
}

mod generic {
    use super::*;

    #[test]
    fn test_condition_node_becomes_condition_state() {
        let node = Node::new("check", "condition").with_data(json!({ "condition": "amount > 100" }));
        let output = convert_single(&GenericConverter, node).expect("conversion");
        let state = &output.states[0];
        assert_eq!(state.state_type, StateType::Condition);
        assert_eq!(state.content, "Evaluate: amount > 100");
        assert_eq!(state.conditions.as_deref(), Some(&["amount > 100".to_string()][..]));
    }

    #[test]
    fn test_parallel_node_becomes_joined_pair() {
        let node = Node::new("fan", "parallel");
        let output = convert_single(&GenericConverter, node).expect("conversion");

        let ids: Vec<&str> = output.states.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["state_fan_start", "state_fan_end"]);
        assert_eq!(output.states[0].state_type, StateType::ParallelStart);
        assert_eq!(output.states[1].state_type, StateType::ParallelEnd);
        assert_eq!(output.transitions.len(), 1);
        assert_eq!(
            output.transitions[0].condition.as_deref(),
            Some("All branches completed")
        );
    }

    #[test]
    fn test_terminal_tags_become_final_states() {
        let node = Node::new("bye", "end").with_data(json!({ "message": "Goodbye!" }));
        let output = convert_single(&GenericConverter, node).expect("conversion");
        assert_eq!(output.states[0].state_type, StateType::Final);
        assert_eq!(output.states[0].content, "Goodbye!");
    }

    #[test]
    fn test_unknown_tags_are_rejected() {
        assert!(!GenericConverter.can_convert(&Node::new("x", "unsupported-xyz")));
        assert!(GenericConverter.can_convert(&Node::new("x", "custom").with_data(json!({ "type": "wait" }))));
        let failure = convert_single(&GenericConverter, Node::new("x", "mystery")).expect_err("should fail");
        assert_eq!(failure.hint, RecoveryHint::Skip);
    }
}

mod base {
    use super::*;

    #[test]
    fn test_base_validation_requires_an_id() {
        let result = validate_base(&Node::new("", "agent"));
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].code, codes::MISSING_NODE_ID);
        assert_eq!(result.errors[0].severity, ErrorSeverity::Critical);

        // Converter-specific rules are not run on a node that fails the base check.
        assert_eq!(AgentConverter.validate_input(&Node::new("", "agent")).warnings.len(), 0);
    }

    #[test]
    fn test_variables_accept_object_and_array_declarations() {
        let node = Node::new("n", "agent").with_data(json!({
            "inputs": { "city": "string", "days": { "type": "number", "default": 3 } },
            "outputs": [ { "name": "forecast", "type": "object" }, { "name": "city" } ]
        }));
        let variables = extract_variables(&node);

        let summary: Vec<(&str, VariableType)> =
            variables.iter().map(|v| (v.name.as_str(), v.var_type)).collect();
        assert_eq!(
            summary,
            vec![
                ("city", VariableType::String),
                ("days", VariableType::Number),
                ("forecast", VariableType::Json)
            ]
        );
        assert_eq!(variables[1].default_value, Some(json!(3)));
    }

    #[test]
    fn test_tools_are_collected_once() {
        let node = Node::new("n", "agent").with_data(json!({
            "tools": { "access": ["search", { "id": "calendar" }, ""] },
            "config": { "tools": [{ "name": "search" }, "mailer"] }
        }));
        assert_eq!(extract_tools(&node), vec!["search", "calendar", "mailer"]);
    }

    #[test]
    fn test_identifiers_are_sanitized() {
        assert_eq!(sanitize_identifier("Lookup Invoice!"), "lookup_invoice");
        assert_eq!(sanitize_identifier("--Send  SMS--"), "send_sms");
    }
}

mod registry {
    use super::*;
    use std::sync::Arc;

    fn resolved_tag(registry: &ConverterRegistry, node: &Node) -> Option<String> {
        registry.resolve(node).map(|(tag, _)| tag.to_string())
    }

    #[test]
    fn test_resolution_order() {
        let registry = ConverterRegistry::default();

        assert_eq!(resolved_tag(&registry, &Node::new("n", "agent")).as_deref(), Some("agent"));
        let by_data_type = Node::new("n", "custom").with_data(json!({ "type": "api" }));
        assert_eq!(resolved_tag(&registry, &by_data_type).as_deref(), Some("api"));
        assert_eq!(resolved_tag(&registry, &Node::new("n", "trigger")).as_deref(), Some("starter"));
        assert_eq!(resolved_tag(&registry, &Node::new("n", "if")).as_deref(), Some("generic"));
        assert_eq!(resolved_tag(&registry, &Node::new("n", "unsupported-xyz")), None);
    }

    #[test]
    fn test_aliases_and_replacement() {
        let mut registry = ConverterRegistry::default();
        assert!(registry.alias("assistant", "agent"));
        assert!(!registry.alias("robot", "does-not-exist"));
        assert_eq!(
            resolved_tag(&registry, &Node::new("n", "assistant")).as_deref(),
            Some("assistant")
        );

        registry.register("agent", Arc::new(ApiConverter));
        assert_eq!(
            registry.available_converters(),
            vec!["starter", "agent", "api", "generic", "assistant"]
        );
        let converter = registry.get("agent").expect("agent entry");
        assert_eq!(converter.node_type(), "api");
    }
}
