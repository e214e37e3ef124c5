//! User-facing error and warning records accumulated during a conversion.
//!
//! These are data, not Rust errors: they travel inside the `ConversionResult` and are
//! meant to be displayed directly, which is why every record carries suggestions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, machine-readable codes.
pub mod codes {
    pub const EMPTY_WORKFLOW: &str = "EMPTY_WORKFLOW";
    pub const NODE_ANALYSIS_ERROR: &str = "NODE_ANALYSIS_ERROR";
    pub const NO_CONVERTER: &str = "NO_CONVERTER";
    pub const NODE_CONVERSION_ERROR: &str = "NODE_CONVERSION_ERROR";
    pub const NODE_RECOVERED: &str = "NODE_RECOVERED";
    pub const NODE_SKIPPED: &str = "NODE_SKIPPED";
    pub const STATE_ID_COLLISION: &str = "STATE_ID_COLLISION";

    pub const MISSING_NODE_ID: &str = "MISSING_NODE_ID";
    pub const MISSING_NODE_DATA: &str = "MISSING_NODE_DATA";
    pub const DUPLICATE_NODE_ID: &str = "DUPLICATE_NODE_ID";
    pub const DUPLICATE_EDGE_ID: &str = "DUPLICATE_EDGE_ID";

    pub const MISSING_SOURCE_NODE: &str = "MISSING_SOURCE_NODE";
    pub const MISSING_TARGET_NODE: &str = "MISSING_TARGET_NODE";
    pub const SELF_LOOP_DETECTED: &str = "SELF_LOOP_DETECTED";
    pub const UNRECOGNIZED_HANDLE: &str = "UNRECOGNIZED_HANDLE";
    pub const MISSING_STATES_FOR_TRANSITION: &str = "MISSING_STATES_FOR_TRANSITION";
    pub const SKIPPED_NODE_EDGE: &str = "SKIPPED_NODE_EDGE";
    pub const TRANSITION_BUILD_ERROR: &str = "TRANSITION_BUILD_ERROR";
    pub const TRANSITION_RECOVERED: &str = "TRANSITION_RECOVERED";
    pub const TRANSITION_RECOVERY_FAILED: &str = "TRANSITION_RECOVERY_FAILED";

    pub const CRITICAL_CONVERSION_ERROR: &str = "CRITICAL_CONVERSION_ERROR";

    pub const NO_STATES: &str = "NO_STATES";
    pub const NO_INITIAL_STATE: &str = "NO_INITIAL_STATE";
    pub const MULTIPLE_INITIAL_STATES: &str = "MULTIPLE_INITIAL_STATES";
    pub const ORPHAN_TRANSITION: &str = "ORPHAN_TRANSITION";
    pub const DUPLICATE_TRANSITION: &str = "DUPLICATE_TRANSITION";
    pub const UNREACHABLE_STATE: &str = "UNREACHABLE_STATE";

    pub const MISSING_WEBHOOK_ENDPOINT: &str = "MISSING_WEBHOOK_ENDPOINT";
    pub const MISSING_SCHEDULE: &str = "MISSING_SCHEDULE";
    pub const MISSING_API_ENDPOINT: &str = "MISSING_API_ENDPOINT";
    pub const NON_STANDARD_HTTP_METHOD: &str = "NON_STANDARD_HTTP_METHOD";
    pub const INCOMPLETE_AUTH: &str = "INCOMPLETE_AUTH";
    pub const INVALID_HEADERS: &str = "INVALID_HEADERS";
    pub const MISSING_PROMPT: &str = "MISSING_PROMPT";
    pub const TEMPERATURE_OUT_OF_RANGE: &str = "TEMPERATURE_OUT_OF_RANGE";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Critical,
    Error,
    Warning,
}

impl ErrorSeverity {
    /// Critical and error severities make the run unsuccessful.
    pub fn is_blocking(&self) -> bool {
        matches!(self, ErrorSeverity::Critical | ErrorSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningImpact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    pub severity: ErrorSeverity,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionWarning {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    pub impact: WarningImpact,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ConversionError {
    pub fn new(code: &str, message: impl Into<String>, severity: ErrorSeverity) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            node_id: None,
            edge_id: None,
            severity,
            suggestions: vec![],
        }
    }

    pub fn critical(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorSeverity::Critical)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorSeverity::Error)
    }

    pub fn for_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn for_edge(mut self, edge_id: impl Into<String>) -> Self {
        self.edge_id = Some(edge_id.into());
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl ConversionWarning {
    pub fn new(code: &str, message: impl Into<String>, impact: WarningImpact) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            node_id: None,
            edge_id: None,
            impact,
            suggestions: vec![],
        }
    }

    pub fn high(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningImpact::High)
    }

    pub fn medium(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningImpact::Medium)
    }

    pub fn low(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningImpact::Low)
    }

    pub fn for_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn for_edge(mut self, edge_id: impl Into<String>) -> Self {
        self.edge_id = Some(edge_id.into());
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " (node '{}')", node_id)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " (node '{}')", node_id)?;
        }
        Ok(())
    }
}

/// Outcome of validating a node, a workflow, or a journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<ConversionWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    /// Valid unless a blocking error was recorded.
    pub fn is_valid(&self) -> bool {
        !self.errors.iter().any(ConversionError::is_blocking)
    }

    pub fn error(&mut self, error: ConversionError) {
        self.errors.push(error);
    }

    pub fn warn(&mut self, warning: ConversionWarning) {
        self.warnings.push(warning);
    }

    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}
