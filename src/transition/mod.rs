//! Edge -> transition synthesis.
//!
//! Transitions are a pure function of the edge and the context's state map: building
//! the same edges against the same states always yields the same ids, conditions and
//! weights. Only the accumulated diagnostics may differ in order.

use crate::context::ConversionContext;
use crate::diagnostic::{ConversionError, ConversionWarning, codes};
use crate::error::TransitionError;
use crate::ids;
use crate::journey::Transition;
use crate::workflow::Edge;
use tracing::{debug, warn};

pub mod handles;

use handles::{HandleKind, humanize_condition};

/// Which end of an edge a state is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Source { from_block_end: bool },
    Target,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionBuilder;

impl TransitionBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds every edge in input order. Edges that fail with a `TransitionError`
    /// are dropped with a `TRANSITION_BUILD_ERROR` warning.
    pub fn build_all_transitions(&self, ctx: &mut ConversionContext<'_>) -> Vec<Transition> {
        self.build_all_transitions_with(ctx, |edge, error, ctx| {
            ctx.add_warning(
                ConversionWarning::medium(codes::TRANSITION_BUILD_ERROR, error.to_string())
                    .for_edge(&edge.id)
                    .suggest("Reconnect the edge in the editor"),
            );
            None
        })
    }

    /// Like [`build_all_transitions`](Self::build_all_transitions), but hands each
    /// failed edge to `on_error`, which may produce a replacement transition.
    pub fn build_all_transitions_with<'g, F>(
        &self,
        ctx: &mut ConversionContext<'g>,
        mut on_error: F,
    ) -> Vec<Transition>
    where
        F: FnMut(&Edge, TransitionError, &mut ConversionContext<'g>) -> Option<Transition>,
    {
        let graph = ctx.graph;
        let mut transitions = Vec::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            match self.build_transition(edge, ctx) {
                Ok(Some(transition)) => transitions.push(transition),
                Ok(None) => {}
                Err(error) => {
                    warn!(edge_id = %edge.id, %error, "Transition build failed");
                    if let Some(transition) = on_error(edge, error, ctx) {
                        transitions.push(transition);
                    }
                }
            }
        }
        transitions
    }

    /// Builds the transition for one edge. `Ok(None)` means the edge was dropped; a
    /// diagnostic explaining why has been recorded in the context.
    pub fn build_transition(
        &self,
        edge: &Edge,
        ctx: &mut ConversionContext<'_>,
    ) -> Result<Option<Transition>, TransitionError> {
        if edge.source.trim().is_empty() || edge.target.trim().is_empty() {
            return Err(TransitionError::MalformedEdge {
                edge_id: edge.id.clone(),
                reason: "source and target node ids must not be empty".to_string(),
            });
        }

        let source_kind = HandleKind::classify(edge.source_handle());
        let target_kind = HandleKind::classify(edge.target_handle());
        for (kind, handle) in [
            (source_kind, edge.source_handle()),
            (target_kind, edge.target_handle()),
        ] {
            match kind {
                HandleKind::Condition("") => {
                    return Err(TransitionError::MalformedHandle {
                        edge_id: edge.id.clone(),
                        handle: handle.unwrap_or_default().to_string(),
                    });
                }
                HandleKind::Unrecognized => ctx.add_warning(
                    ConversionWarning::low(
                        codes::UNRECOGNIZED_HANDLE,
                        format!(
                            "Edge '{}' uses unrecognized handle '{}'; it is treated as a plain connection",
                            edge.id,
                            handle.unwrap_or_default()
                        ),
                    )
                    .for_edge(&edge.id),
                ),
                _ => {}
            }
        }

        if !self.validate_endpoints(edge, ctx) {
            return Ok(None);
        }

        if edge.is_self_loop() {
            ctx.add_warning(
                ConversionWarning::medium(
                    codes::SELF_LOOP_DETECTED,
                    format!("Edge '{}' connects node '{}' to itself", edge.id, edge.source),
                )
                .for_node(&edge.source)
                .for_edge(&edge.id)
                .suggest("Make sure the journey runtime can exit this state, or add an exit condition"),
            );
        }

        if let Some(skipped) = [&edge.source, &edge.target]
            .into_iter()
            .find(|id| ctx.is_skipped(id))
        {
            ctx.add_warning(
                ConversionWarning::low(
                    codes::SKIPPED_NODE_EDGE,
                    format!("Edge '{}' dropped because node '{}' was skipped", edge.id, skipped),
                )
                .for_node(skipped.as_str())
                .for_edge(&edge.id),
            );
            return Ok(None);
        }

        let source = Endpoint::Source {
            from_block_end: source_kind.leaves_block_end(),
        };
        let (Some(source_state), Some(target_state)) = (
            resolve_state(ctx, &edge.source, source),
            resolve_state(ctx, &edge.target, Endpoint::Target),
        ) else {
            debug!(edge_id = %edge.id, "Dropping edge without converted states");
            ctx.add_warning(
                ConversionWarning::medium(
                    codes::MISSING_STATES_FOR_TRANSITION,
                    format!(
                        "Edge '{}' dropped: no state was produced for node '{}' or '{}'",
                        edge.id, edge.source, edge.target
                    ),
                )
                .for_edge(&edge.id)
                .suggest("Check the warnings for the connected nodes"),
            );
            return Ok(None);
        };

        let mut transition = Transition::between(source_state, target_state)
            .with_description(describe(edge, ctx, source_kind));
        if let Some(condition) = extract_condition(edge, ctx, source_kind) {
            transition = transition.with_condition(condition);
        }
        if let Some(weight) = source_kind.weight() {
            transition = transition.with_weight(weight);
        }
        Ok(Some(transition))
    }

    /// Records an error for each endpoint that does not reference a known node.
    fn validate_endpoints(&self, edge: &Edge, ctx: &mut ConversionContext<'_>) -> bool {
        let mut valid = true;
        if ctx.node(&edge.source).is_none() {
            ctx.add_error(
                ConversionError::error(
                    codes::MISSING_SOURCE_NODE,
                    format!("Edge '{}' starts at unknown node '{}'", edge.id, edge.source),
                )
                .for_edge(&edge.id)
                .suggest("Delete the edge or reconnect it to an existing node"),
            );
            valid = false;
        }
        if ctx.node(&edge.target).is_none() {
            ctx.add_error(
                ConversionError::error(
                    codes::MISSING_TARGET_NODE,
                    format!("Edge '{}' ends at unknown node '{}'", edge.id, edge.target),
                )
                .for_edge(&edge.id)
                .suggest("Delete the edge or reconnect it to an existing node"),
            );
            valid = false;
        }
        valid
    }
}

/// Maps a node id to one of its states: `state_<id>` first, then the node's
/// multi-state ids (`_end` for edges leaving a block end, `_start` otherwise).
fn resolve_state(ctx: &ConversionContext<'_>, node_id: &str, endpoint: Endpoint) -> Option<String> {
    let primary = ids::state_id(node_id, None);
    if ctx.contains_state(&primary) {
        return Some(primary);
    }
    let candidates = ctx.multi_state_ids(node_id);
    let preferred = match endpoint {
        Endpoint::Source {
            from_block_end: true,
        } => "_end",
        _ => "_start",
    };
    candidates
        .iter()
        .find(|id| id.ends_with(preferred))
        .or_else(|| candidates.first())
        .map(|id| id.to_string())
}

fn extract_condition(edge: &Edge, ctx: &ConversionContext<'_>, kind: HandleKind<'_>) -> Option<String> {
    if let HandleKind::Condition(value) = kind {
        return Some(humanize_condition(value));
    }
    if let Some(phrase) = kind.structural_condition() {
        return Some(phrase);
    }
    let source = ctx.node(&edge.source)?;
    match source.node_type.as_str() {
        "condition" | "if" => Some(
            source
                .data_str("condition")
                .or_else(|| source.data_str("expression"))
                .unwrap_or("Condition met")
                .to_string(),
        ),
        "router" | "switch" => {
            let target = ctx
                .node(&edge.target)
                .map_or(edge.target.as_str(), |n| n.display_name());
            Some(format!("Route to {}", target))
        }
        _ => None,
    }
}

fn describe(edge: &Edge, ctx: &ConversionContext<'_>, kind: HandleKind<'_>) -> String {
    let name = |id: &str| {
        ctx.node(id)
            .map_or_else(|| id.to_string(), |n| n.display_name().to_string())
    };
    let sentence = format!(
        "Transition from {} to {}",
        name(&edge.source),
        name(&edge.target)
    );
    match edge.source_handle() {
        Some(handle) if !kind.is_default() => format!("{} via '{}'", sentence, handle),
        _ => sentence,
    }
}
