//! Deterministic id derivation shared by converters, the transition builder and recovery.
//!
//! Every state produced for node `n` has the id `state_<n>` or `state_<n>_<suffix>`.
//! The transition builder resolves node references back to states by this rule, so
//! no other code may build state ids by hand.

const STATE_PREFIX: &str = "state_";

/// `state_<nodeId>` or `state_<nodeId>_<suffix>`.
pub fn state_id(node_id: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{STATE_PREFIX}{node_id}_{suffix}"),
        _ => format!("{STATE_PREFIX}{node_id}"),
    }
}

/// The prefix shared by the secondary states of a multi-state node.
pub fn multi_state_prefix(node_id: &str) -> String {
    format!("{STATE_PREFIX}{node_id}_")
}

/// True if `state_id` was derived from `node_id`.
pub fn belongs_to_node(state_id: &str, node_id: &str) -> bool {
    state_id
        .strip_prefix(STATE_PREFIX)
        .and_then(|rest| rest.strip_prefix(node_id))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

pub fn transition_id(source_state_id: &str, target_state_id: &str) -> String {
    format!("transition_{source_state_id}_to_{target_state_id}")
}

/// The last eight characters of a node id, used for generated names.
pub fn node_id_suffix(node_id: &str) -> &str {
    let count = node_id.chars().count();
    if count <= 8 {
        return node_id;
    }
    let start = node_id
        .char_indices()
        .nth(count - 8)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &node_id[start..]
}
