use super::{State, StateType, Transition};
use crate::workflow::{Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version stamped on every generated journey.
pub const JOURNEY_SCHEMA_VERSION: &str = "1.0.0";

/// The conversational state machine produced by a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub title: String,
    pub description: String,
    pub conditions: Vec<String>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    pub metadata: JourneyMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyMetadata {
    pub source_workflow_id: String,
    pub converted_at: DateTime<Utc>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_nodes: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_edges: Option<Vec<Edge>>,
    #[serde(default)]
    pub partial_conversion: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

impl JourneyMetadata {
    pub fn new(source_workflow_id: impl Into<String>) -> Self {
        Self {
            source_workflow_id: source_workflow_id.into(),
            converted_at: Utc::now(),
            version: JOURNEY_SCHEMA_VERSION.to_string(),
            original_nodes: None,
            original_edges: None,
            partial_conversion: false,
            recovery_actions: vec![],
            debug: None,
        }
    }
}

/// Extra diagnostics attached when debug info is requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub phase_timings: Vec<PhaseTiming>,
    /// Node id -> registry tag of the converter that handled it.
    pub converters_used: BTreeMap<String, String>,
    pub state_collisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed_micros: u64,
}

impl Journey {
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn initial_states(&self) -> impl Iterator<Item = &State> {
        self.states
            .iter()
            .filter(|s| s.state_type == StateType::Initial)
    }

    /// Outgoing transitions of a state, highest priority (lowest weight) first.
    /// Unweighted transitions sort last, in their original order.
    pub fn transitions_from(&self, state_id: &str) -> Vec<&Transition> {
        let mut outgoing: Vec<&Transition> = self
            .transitions
            .iter()
            .filter(|t| t.source_state_id == state_id)
            .collect();
        outgoing.sort_by_key(|t| t.weight.map_or((1, 0), |w| (0, w)));
        outgoing
    }
}
