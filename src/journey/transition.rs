use crate::ids;
use serde::{Deserialize, Serialize};

/// A directed, optionally conditioned edge between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: String,
    pub source_state_id: String,
    pub target_state_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordering hint among transitions sharing a source. Absent means unordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

impl Transition {
    /// Creates an unconditional transition with the canonical id.
    pub fn between(source_state_id: impl Into<String>, target_state_id: impl Into<String>) -> Self {
        let source_state_id = source_state_id.into();
        let target_state_id = target_state_id.into();
        Self {
            id: ids::transition_id(&source_state_id, &target_state_id),
            source_state_id,
            target_state_id,
            condition: None,
            description: None,
            weight: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }
}
