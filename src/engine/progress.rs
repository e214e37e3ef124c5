use serde::{Deserialize, Serialize};
use std::fmt;

/// The five pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionPhase {
    Analyzing,
    Converting,
    BuildingTransitions,
    PreservingState,
    Validating,
}

impl ConversionPhase {
    pub const ALL: [ConversionPhase; 5] = [
        ConversionPhase::Analyzing,
        ConversionPhase::Converting,
        ConversionPhase::BuildingTransitions,
        ConversionPhase::PreservingState,
        ConversionPhase::Validating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionPhase::Analyzing => "analyzing",
            ConversionPhase::Converting => "converting",
            ConversionPhase::BuildingTransitions => "building-transitions",
            ConversionPhase::PreservingState => "preserving-state",
            ConversionPhase::Validating => "validating",
        }
    }
}

impl fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionProgress {
    pub phase: ConversionPhase,
    /// Human-readable label for the current step.
    pub step: String,
    pub completed: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
}

/// Receives progress notifications. Any `FnMut(&ConversionProgress)` closure works.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &ConversionProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ConversionProgress),
{
    fn on_progress(&mut self, progress: &ConversionProgress) {
        self(progress)
    }
}
