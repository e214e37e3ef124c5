use crate::converter::ConverterRegistry;
use crate::diagnostic::{ConversionError, ConversionWarning, ValidationResult, codes};
use crate::journey::{Journey, StateType};
use crate::workflow::WorkflowGraph;
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// Checks a workflow before conversion and a journey after it. Both results are
/// merged verbatim into the conversion's diagnostics.
pub trait ValidationEngine: Send + Sync {
    fn validate_workflow(&self, graph: &WorkflowGraph, registry: &ConverterRegistry) -> ValidationResult;

    fn validate_journey(&self, journey: &Journey) -> ValidationResult;
}

/// Duplicate-id checks, per-node converter validation, and state machine
/// integrity checks on the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl ValidationEngine for StructuralValidator {
    fn validate_workflow(&self, graph: &WorkflowGraph, registry: &ConverterRegistry) -> ValidationResult {
        let mut result = ValidationResult::ok();

        let mut seen = AHashSet::new();
        for node in &graph.nodes {
            if !node.id.is_empty() && !seen.insert(node.id.as_str()) {
                result.error(
                    ConversionError::error(
                        codes::DUPLICATE_NODE_ID,
                        format!("Node id '{}' is used more than once", node.id),
                    )
                    .for_node(&node.id)
                    .suggest("Give every node a unique id"),
                );
            }
        }

        let mut seen = AHashSet::new();
        for edge in &graph.edges {
            if !seen.insert(edge.id.as_str()) {
                result.error(
                    ConversionError::error(
                        codes::DUPLICATE_EDGE_ID,
                        format!("Edge id '{}' is used more than once", edge.id),
                    )
                    .for_edge(&edge.id)
                    .suggest("Give every edge a unique id"),
                );
            }
        }

        graph
            .nodes
            .iter()
            .filter_map(|node| registry.resolve(node).map(|(_, c)| c.validate_input(node)))
            .fold(result, ValidationResult::merge)
    }

    fn validate_journey(&self, journey: &Journey) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if journey.states.is_empty() {
            result.warn(
                ConversionWarning::high(codes::NO_STATES, "The journey has no states")
                    .suggest("Add at least one supported node to the workflow"),
            );
            return result;
        }

        let initial: Vec<&str> = journey.initial_states().map(|s| s.id.as_str()).collect();
        match initial.len() {
            0 => result.warn(
                ConversionWarning::medium(
                    codes::NO_INITIAL_STATE,
                    "The journey has no initial state",
                )
                .suggest("Add a starter node to the workflow"),
            ),
            1 => {}
            n => result.warn(ConversionWarning::low(
                codes::MULTIPLE_INITIAL_STATES,
                format!("The journey has {} initial states", n),
            )),
        }

        let known: AHashSet<&str> = journey.states.iter().map(|s| s.id.as_str()).collect();
        let mut seen_transitions = AHashSet::new();
        for transition in &journey.transitions {
            for endpoint in [&transition.source_state_id, &transition.target_state_id] {
                if !known.contains(endpoint.as_str()) {
                    result.error(
                        ConversionError::error(
                            codes::ORPHAN_TRANSITION,
                            format!(
                                "Transition '{}' references unknown state '{}'",
                                transition.id, endpoint
                            ),
                        )
                        .suggest("Reconnect the edge to a converted node"),
                    );
                }
            }
            if !seen_transitions.insert(transition.id.as_str()) {
                result.warn(ConversionWarning::low(
                    codes::DUPLICATE_TRANSITION,
                    format!("Transition '{}' appears more than once", transition.id),
                ));
            }
        }

        if !initial.is_empty() {
            let reachable = reachable_from(journey, &initial);
            for state in &journey.states {
                if !reachable.contains(state.id.as_str()) && state.state_type != StateType::Initial {
                    result.warn(
                        ConversionWarning::low(
                            codes::UNREACHABLE_STATE,
                            format!("State '{}' cannot be reached from an initial state", state.id),
                        )
                        .suggest("Connect the node to the rest of the workflow"),
                    );
                }
            }
        }

        result
    }
}

/// Breadth-first walk over the transitions.
fn reachable_from<'j>(journey: &'j Journey, roots: &[&'j str]) -> AHashSet<&'j str> {
    let mut adjacency: AHashMap<&str, Vec<&str>> = AHashMap::new();
    for t in &journey.transitions {
        adjacency
            .entry(t.source_state_id.as_str())
            .or_default()
            .push(t.target_state_id.as_str());
    }

    let mut visited: AHashSet<&str> = roots.iter().copied().collect();
    let mut queue: VecDeque<&str> = roots.iter().copied().collect();
    while let Some(current) = queue.pop_front() {
        for next in adjacency.get(current).into_iter().flatten().copied() {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    visited
}
