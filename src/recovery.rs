//! Tiered failure recovery.
//!
//! Each entry point is invoked by the engine at one failure boundary and never calls
//! the others. Node-level recovery picks a strategy by matching on the failure's
//! [`RecoveryHint`] and the node's type family.

use crate::context::ConversionContext;
use crate::diagnostic::{ConversionError, ConversionWarning, codes};
use crate::error::{ConverterFailure, EngineError, RecoveryHint, TransitionError};
use crate::ids;
use crate::journey::{Journey, State, StateType, Transition};
use crate::workflow::{Edge, Node};
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    FallbackChatState,
    FallbackToolState,
    FallbackGenericState,
    SkipNode,
    MinimalState,
}

impl RecoveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::FallbackChatState => "fallback_chat_state",
            RecoveryStrategy::FallbackToolState => "fallback_tool_state",
            RecoveryStrategy::FallbackGenericState => "fallback_generic_state",
            RecoveryStrategy::SkipNode => "skip_node",
            RecoveryStrategy::MinimalState => "minimal_state",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of node-level recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecovery {
    pub strategy: RecoveryStrategy,
    /// The replacement state. `None` only for [`RecoveryStrategy::SkipNode`].
    pub state: Option<State>,
    /// Edges touching the node must be dropped.
    pub skip_edges: bool,
}

/// Outcome of pipeline-level recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalRecovery {
    pub can_recover: bool,
    pub partial_result: Option<Journey>,
    pub recovery_actions: Vec<String>,
}

/// Coarse type families used to pick a fallback state type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeFamily {
    Conversational,
    Tool,
    Entry,
    Branch,
    Terminal,
    Other,
}

impl NodeFamily {
    fn of(node: &Node) -> Self {
        let tag = node.node_type.trim().to_ascii_lowercase();
        let from_tag = Self::from_tag(&tag);
        if from_tag != NodeFamily::Other {
            return from_tag;
        }
        node.data_type_tag()
            .map(|t| Self::from_tag(&t.trim().to_ascii_lowercase()))
            .unwrap_or(NodeFamily::Other)
    }

    fn from_tag(tag: &str) -> Self {
        match tag {
            "agent" | "ai" | "chat" | "llm" => NodeFamily::Conversational,
            "api" | "http" | "rest" | "function" | "webhook-call" | "tool" => NodeFamily::Tool,
            "starter" | "trigger" | "webhook" | "schedule" | "start" => NodeFamily::Entry,
            "condition" | "if" | "switch" | "router" => NodeFamily::Branch,
            "end" | "final" | "output" | "response" => NodeFamily::Terminal,
            _ => NodeFamily::Other,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorRecovery;

impl ErrorRecovery {
    pub fn new() -> Self {
        Self
    }

    /// Picks a strategy for a failed node and builds its replacement state.
    ///
    /// The returned state is not inserted into the context; the caller owns that
    /// decision. The matching warning is recorded here.
    pub fn recover_from_node_error(
        &self,
        node: &Node,
        failure: &ConverterFailure,
        ctx: &mut ConversionContext<'_>,
    ) -> NodeRecovery {
        let recovery = match failure.hint {
            RecoveryHint::Skip => NodeRecovery {
                strategy: RecoveryStrategy::SkipNode,
                state: None,
                skip_edges: true,
            },
            RecoveryHint::Minimal => NodeRecovery {
                strategy: RecoveryStrategy::MinimalState,
                state: Some(minimal_state(node)),
                skip_edges: false,
            },
            RecoveryHint::Fallback => match failure.fallback.as_deref() {
                Some(state) if ids::belongs_to_node(&state.id, &node.id) => NodeRecovery {
                    strategy: strategy_for_state(state.state_type),
                    state: Some(state.clone()),
                    skip_edges: false,
                },
                _ => fallback_for_family(node),
            },
        };

        match recovery.strategy {
            RecoveryStrategy::SkipNode => {
                warn!(node_id = %node.id, "Skipping node after conversion failure");
                ctx.add_warning(
                    ConversionWarning::high(
                        codes::NODE_SKIPPED,
                        format!(
                            "Node '{}' was skipped: {}. Edges touching it are dropped",
                            node.id, failure.error
                        ),
                    )
                    .for_node(&node.id)
                    .suggest("Register a converter for this node type")
                    .suggest("Remove or replace the node in the workflow"),
                );
            }
            strategy => {
                warn!(node_id = %node.id, %strategy, "Recovered node with fallback state");
                ctx.add_warning(
                    ConversionWarning::medium(
                        codes::NODE_RECOVERED,
                        format!(
                            "Node '{}' was replaced by a placeholder state ({})",
                            node.id, strategy
                        ),
                    )
                    .for_node(&node.id)
                    .suggest("Review the generated placeholder content")
                    .suggest("Fix the node configuration and convert again"),
                );
            }
        }
        recovery
    }

    /// Synthesizes a plain transition between the endpoints' states for an edge the
    /// transition builder rejected. Returns `None` after recording
    /// `TRANSITION_RECOVERY_FAILED` when no such states exist.
    pub fn recover_from_transition_error(
        &self,
        edge: &Edge,
        cause: &TransitionError,
        ctx: &mut ConversionContext<'_>,
    ) -> Option<Transition> {
        let resolved = guess_state(ctx, &edge.source).zip(guess_state(ctx, &edge.target));
        let Some((source, target)) = resolved else {
            warn!(edge_id = %edge.id, %cause, "Transition recovery failed");
            ctx.add_error(
                ConversionError::error(
                    codes::TRANSITION_RECOVERY_FAILED,
                    format!(
                        "Edge '{}' could not be recovered: {}",
                        edge.id, cause
                    ),
                )
                .for_edge(&edge.id)
                .suggest("Delete the edge and reconnect the nodes in the editor"),
            );
            return None;
        };

        info!(edge_id = %edge.id, "Recovered transition");
        ctx.add_warning(
            ConversionWarning::medium(
                codes::TRANSITION_RECOVERED,
                format!(
                    "Edge '{}' was replaced by an unconditional transition: {}",
                    edge.id, cause
                ),
            )
            .for_edge(&edge.id)
            .suggest("Check that the recovered transition matches the intended flow"),
        );
        Some(
            Transition::between(source, target)
                .with_description(format!("Recovered transition for edge '{}'", edge.id)),
        )
    }

    /// Assembles a partial journey from whatever states survived a run-wide failure.
    /// Transitions are left empty.
    pub fn recover_from_critical_error(
        &self,
        cause: &EngineError,
        ctx: &mut ConversionContext<'_>,
    ) -> CriticalRecovery {
        error!(%cause, states = ctx.state_count(), "Attempting critical recovery");
        let mut recovery_actions = repair_conversion_context(ctx);

        if ctx.state_count() == 0 {
            recovery_actions.push("No states were converted before the failure".to_string());
            return CriticalRecovery {
                can_recover: false,
                partial_result: None,
                recovery_actions,
            };
        }

        recovery_actions.push(format!("Preserved {} converted states", ctx.state_count()));
        if !ctx.variables.is_empty() {
            recovery_actions.push(format!("Preserved {} variables", ctx.variables.len()));
        }
        recovery_actions.push("Discarded all transitions".to_string());

        let mut journey = ctx.journey_skeleton();
        journey.title = format!("{} (Partial)", journey.title);
        journey.description = format!("Partial conversion after a critical error: {}", cause);
        journey.metadata.partial_conversion = true;
        journey.metadata.recovery_actions = recovery_actions.clone();

        CriticalRecovery {
            can_recover: true,
            partial_result: Some(journey),
            recovery_actions,
        }
    }
}

/// Rebuilds derived lookups and re-synchronizes the state ordering. Idempotent;
/// returns the actions taken, empty when the context was already consistent.
pub fn repair_conversion_context(ctx: &mut ConversionContext<'_>) -> Vec<String> {
    let actions = ctx.repair();
    for action in &actions {
        info!(action = %action, "Repaired conversion context");
    }
    actions
}

fn strategy_for_state(state_type: StateType) -> RecoveryStrategy {
    match state_type {
        StateType::Chat => RecoveryStrategy::FallbackChatState,
        StateType::Tool => RecoveryStrategy::FallbackToolState,
        _ => RecoveryStrategy::FallbackGenericState,
    }
}

fn fallback_for_family(node: &Node) -> NodeRecovery {
    let (strategy, state_type, body) = match NodeFamily::of(node) {
        NodeFamily::Conversational => (
            RecoveryStrategy::FallbackChatState,
            StateType::Chat,
            "I'm here to help. What would you like to do?",
        ),
        NodeFamily::Tool => (
            RecoveryStrategy::FallbackToolState,
            StateType::Tool,
            "Calling an external service.",
        ),
        NodeFamily::Entry => (
            RecoveryStrategy::FallbackGenericState,
            StateType::Initial,
            "Welcome! Let's get started.",
        ),
        NodeFamily::Branch => (
            RecoveryStrategy::FallbackGenericState,
            StateType::Condition,
            "Decide which path to take next.",
        ),
        NodeFamily::Terminal => (
            RecoveryStrategy::FallbackGenericState,
            StateType::Final,
            "Thank you! This conversation is complete.",
        ),
        NodeFamily::Other => {
            return NodeRecovery {
                strategy: RecoveryStrategy::MinimalState,
                state: Some(minimal_state(node)),
                skip_edges: false,
            };
        }
    };
    let state = State::new(ids::state_id(&node.id, None), state_type, node.display_name())
        .with_description(format!("Fallback for node '{}'", node.id))
        .with_content(body)
        .with_position(node.position);
    NodeRecovery {
        strategy,
        state: Some(state),
        skip_edges: false,
    }
}

fn minimal_state(node: &Node) -> State {
    State::new(ids::state_id(&node.id, None), StateType::Chat, node.display_name())
        .with_description(format!("Placeholder for node '{}'", node.id))
        .with_content("Continue.")
        .with_position(node.position)
}

/// `state_<id>` if it exists, else the node's `_start` or first secondary state.
fn guess_state(ctx: &ConversionContext<'_>, node_id: &str) -> Option<String> {
    if node_id.trim().is_empty() {
        return None;
    }
    let guess = ids::state_id(node_id, None);
    if ctx.contains_state(&guess) {
        return Some(guess);
    }
    let candidates = ctx.multi_state_ids(node_id);
    candidates
        .iter()
        .find(|id| id.ends_with("_start"))
        .or_else(|| candidates.first())
        .map(|id| id.to_string())
}
