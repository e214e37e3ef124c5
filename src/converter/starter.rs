use super::{ConverterOutput, NodeConverter, extract_tools, extract_variables, fallback_state};
use crate::context::ConversionContext;
use crate::diagnostic::{ConversionWarning, ValidationResult, codes};
use crate::error::{ConvertError, ConverterFailure};
use crate::journey::{State, StateType, Variable, VariableType};
use crate::workflow::Node;
use serde_json::Value;

/// Converts entry-point nodes (manual starters, triggers, webhooks, schedules)
/// into the journey's `initial` state.
pub struct StarterConverter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Webhook,
    Schedule,
    Trigger,
    Manual,
}

impl EntryKind {
    fn of(node: &Node) -> Self {
        let tag = node
            .data_str("triggerType")
            .unwrap_or(node.node_type.as_str());
        match tag {
            "webhook" => EntryKind::Webhook,
            "schedule" | "cron" => EntryKind::Schedule,
            "trigger" | "event" => EntryKind::Trigger,
            _ => EntryKind::Manual,
        }
    }
}

impl NodeConverter for StarterConverter {
    fn node_type(&self) -> &str {
        "starter"
    }

    fn supported_types(&self) -> &[&str] {
        &["starter", "trigger", "webhook", "schedule", "start"]
    }

    fn convert(
        &self,
        node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        let kind = EntryKind::of(node);
        let conditions = entry_conditions(node, kind).map_err(|error| {
            ConverterFailure::new(error).with_fallback(fallback_state(
                node,
                StateType::Initial,
                "Welcome! Let's get started.",
            ))
        })?;

        let mut variables = extract_variables(node);
        if let Some(input) = node.data_field("input") {
            variables.push(
                Variable::new("start_input", VariableType::infer(input))
                    .described("Input provided when the workflow starts")
                    .with_default(input.clone()),
            );
        }

        let state = State::new(self.state_id(node, None), StateType::Initial, node.display_name())
            .with_description(describe(node, kind))
            .with_content(entry_content(node, kind))
            .with_conditions(conditions)
            .with_tools(extract_tools(node))
            .with_variables(variables.clone())
            .with_position(node.position);

        Ok(ConverterOutput::single(state).with_variables(variables))
    }

    fn validate_node(&self, node: &Node) -> ValidationResult {
        let mut result = ValidationResult::ok();
        match EntryKind::of(node) {
            EntryKind::Webhook if webhook_endpoint(node).is_none() => {
                result.warn(
                    ConversionWarning::medium(
                        codes::MISSING_WEBHOOK_ENDPOINT,
                        format!("Webhook node '{}' has neither a URL nor a path", node.id),
                    )
                    .for_node(&node.id)
                    .suggest("Set the webhook URL or path so callers know where to send events"),
                );
            }
            EntryKind::Schedule if schedule_spec(node).is_none() => {
                result.warn(
                    ConversionWarning::medium(
                        codes::MISSING_SCHEDULE,
                        format!("Schedule node '{}' has neither a cron expression nor an interval", node.id),
                    )
                    .for_node(&node.id)
                    .suggest("Add a cron expression (e.g. \"0 9 * * *\") or an interval"),
                );
            }
            _ => {}
        }
        result
    }
}

fn webhook_endpoint(node: &Node) -> Option<&str> {
    node.data_str("url")
        .or_else(|| node.data_str("path"))
        .or_else(|| node.config_str("url"))
        .or_else(|| node.config_str("path"))
}

fn schedule_spec(node: &Node) -> Option<String> {
    if let Some(cron) = node.data_str("cron").or_else(|| node.config_str("cron")) {
        return Some(format!("cron \"{}\"", cron));
    }
    let interval = node
        .data_field("interval")
        .or_else(|| node.config_field("interval"))?;
    match interval {
        Value::Number(n) => Some(format!("every {} seconds", n)),
        Value::String(s) if !s.trim().is_empty() => Some(format!("every {}", s.trim())),
        _ => None,
    }
}

fn describe(node: &Node, kind: EntryKind) -> String {
    if let Some(description) = node.data_str("description") {
        return description.to_string();
    }
    match kind {
        EntryKind::Webhook => "Entry point triggered by an incoming webhook".to_string(),
        EntryKind::Schedule => "Entry point triggered on a schedule".to_string(),
        EntryKind::Trigger => "Entry point triggered by an external event".to_string(),
        EntryKind::Manual => "Conversation entry point".to_string(),
    }
}

fn entry_content(node: &Node, kind: EntryKind) -> String {
    if let Some(message) = node
        .data_str("welcomeMessage")
        .or_else(|| node.data_str("message"))
    {
        return message.to_string();
    }
    match kind {
        EntryKind::Webhook => match webhook_endpoint(node) {
            Some(endpoint) => format!(
                "This workflow was started by a webhook request to {}. Processing the received data.",
                endpoint
            ),
            None => "This workflow was started by a webhook request. Processing the received data."
                .to_string(),
        },
        EntryKind::Schedule => match schedule_spec(node) {
            Some(spec) => format!("This is a scheduled run ({}). Starting the workflow.", spec),
            None => "This is a scheduled run. Starting the workflow.".to_string(),
        },
        EntryKind::Trigger => match trigger_event(node) {
            Some(event) => format!("The '{}' event fired. Starting the workflow.", event),
            None => "A trigger fired. Starting the workflow.".to_string(),
        },
        EntryKind::Manual => "Welcome! How can I help you today?".to_string(),
    }
}

fn trigger_event(node: &Node) -> Option<&str> {
    node.data_str("event")
        .or_else(|| node.data_str("eventType"))
        .or_else(|| node.config_str("event"))
}

/// Built-in conditions for the entry kind, followed by any declared in `data.conditions`.
fn entry_conditions(node: &Node, kind: EntryKind) -> Result<Vec<String>, ConvertError> {
    let mut conditions = match kind {
        EntryKind::Webhook => vec!["Webhook request received".to_string()],
        EntryKind::Schedule => vec!["Scheduled time reached".to_string()],
        EntryKind::Trigger => match trigger_event(node) {
            Some(event) => vec![format!("Event '{}' fired", event)],
            None => vec!["Trigger event fired".to_string()],
        },
        EntryKind::Manual => vec!["User starts a conversation".to_string()],
    };
    match node.data_field("conditions") {
        None => {}
        Some(Value::Array(extra)) => conditions.extend(
            extra
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        ),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            conditions.push(single.trim().to_string())
        }
        Some(other) => {
            return Err(ConvertError::InvalidConfig {
                node_id: node.id.clone(),
                message: format!("entry conditions must be a list of strings, found {}", other),
            });
        }
    }
    Ok(conditions)
}
