use crate::diagnostic::{ConversionError, ConversionWarning};
use crate::journey::Journey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a conversion run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// True when no error of severity `critical` or `error` was recorded.
    pub success: bool,
    /// Present whenever at least one state was produced, even if `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey: Option<Journey>,
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<ConversionWarning>,
    pub metadata: ConversionMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub converted_states: usize,
    pub skipped_nodes: usize,
    pub transitions: usize,
    pub elapsed_ms: u64,
    /// Node id -> first state id produced for it. Unconverted nodes are absent.
    pub conversion_map: BTreeMap<String, String>,
}

impl ConversionResult {
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}
