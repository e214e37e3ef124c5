use crate::diagnostic::{ConversionError, ConversionWarning};
use crate::ids;
use crate::journey::{Journey, JourneyMetadata, State, StateType, Transition, Variable};
use crate::workflow::{Edge, Node, WorkflowGraph};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-run toggles. Missing fields in a config file fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Copy the original nodes and edges into the journey metadata.
    pub preserve_layout: bool,
    /// Attach phase timings and converter usage to the journey metadata.
    pub include_debug_info: bool,
    /// Run the validation engine over the finished journey.
    pub validate_output: bool,
    /// Run the validation engine over the workflow before converting it.
    pub validate_input: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            preserve_layout: true,
            include_debug_info: false,
            validate_output: true,
            validate_input: false,
        }
    }
}

/// The single-owner record threaded through every phase of one conversion run.
///
/// The context owns every produced state; nothing else keeps a competing copy.
/// It must never be reused for a second run.
pub struct ConversionContext<'g> {
    pub graph: &'g WorkflowGraph,
    pub options: ConversionOptions,
    /// Node id -> node.
    pub node_lookup: AHashMap<String, &'g Node>,
    /// Source node id -> outgoing edges, in input order.
    pub edge_lookup: AHashMap<String, Vec<&'g Edge>>,
    states: AHashMap<String, State>,
    state_order: Vec<String>,
    pub variables: AHashMap<String, Variable>,
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<ConversionWarning>,
    pub(crate) skipped_nodes: AHashSet<String>,
    /// Node id -> first state id produced for it.
    pub(crate) conversion_map: BTreeMap<String, String>,
    pub(crate) converter_transitions: Vec<Transition>,
    pub(crate) state_collisions: Vec<String>,
}

impl<'g> ConversionContext<'g> {
    pub fn new(graph: &'g WorkflowGraph, options: ConversionOptions) -> Self {
        let mut ctx = Self {
            graph,
            options,
            node_lookup: AHashMap::new(),
            edge_lookup: AHashMap::new(),
            states: AHashMap::new(),
            state_order: Vec::new(),
            variables: AHashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped_nodes: AHashSet::new(),
            conversion_map: BTreeMap::new(),
            converter_transitions: Vec::new(),
            state_collisions: Vec::new(),
        };
        ctx.index_graph();
        ctx
    }

    /// Rebuilds the node and outgoing-edge lookups from the source graph.
    pub(crate) fn index_graph(&mut self) {
        self.node_lookup = self.graph.nodes.iter().map(|n| (n.id.clone(), n)).collect();
        self.edge_lookup.clear();
        for edge in &self.graph.edges {
            self.edge_lookup
                .entry(edge.source.clone())
                .or_default()
                .push(edge);
        }
    }

    pub fn node(&self, id: &str) -> Option<&'g Node> {
        self.node_lookup.get(id).copied()
    }

    pub fn outgoing_edges(&self, node_id: &str) -> &[&'g Edge] {
        self.edge_lookup.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inserts a state. Duplicate ids overwrite the earlier state and return it.
    pub fn insert_state(&mut self, state: State) -> Option<State> {
        let id = state.id.clone();
        let previous = self.states.insert(id.clone(), state);
        if previous.is_none() {
            self.state_order.push(id);
        }
        previous
    }

    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    pub fn contains_state(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// States in first-insertion order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.state_order.iter().filter_map(|id| self.states.get(id))
    }

    /// Ids of the secondary states of a multi-state node, sorted.
    ///
    /// States of another node whose id merely extends this one (`a` vs `a_2`) are
    /// excluded.
    pub fn multi_state_ids(&self, node_id: &str) -> Vec<&str> {
        let prefix = ids::multi_state_prefix(node_id);
        let longer_nodes: Vec<&str> = self
            .node_lookup
            .keys()
            .filter(|other| other.len() > node_id.len() && other.starts_with(node_id))
            .map(String::as_str)
            .collect();
        let mut found: Vec<&str> = self
            .state_order
            .iter()
            .filter(|id| id.starts_with(&prefix) && self.states.contains_key(id.as_str()))
            .filter(|id| !longer_nodes.iter().any(|other| ids::belongs_to_node(id, other)))
            .map(String::as_str)
            .collect();
        found.sort_unstable();
        found
    }

    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn add_error(&mut self, error: ConversionError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConversionWarning) {
        self.warnings.push(warning);
    }

    pub fn has_blocking_errors(&self) -> bool {
        self.errors.iter().any(ConversionError::is_blocking)
    }

    pub fn is_skipped(&self, node_id: &str) -> bool {
        self.skipped_nodes.contains(node_id)
    }

    pub fn conversion_map(&self) -> &BTreeMap<String, String> {
        &self.conversion_map
    }

    /// A journey holding the current states and no transitions. Title, description
    /// and entry conditions are derived from the graph and the `initial` states.
    pub(crate) fn journey_skeleton(&self) -> Journey {
        let title = match self.graph.name.trim() {
            "" => "Untitled journey".to_string(),
            name => name.to_string(),
        };
        let description = self
            .graph
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Converted from workflow '{}'", title));
        let states: Vec<State> = self.states().cloned().collect();
        let conditions = states
            .iter()
            .filter(|s| s.state_type == StateType::Initial)
            .flat_map(|s| s.conditions.iter().flatten().cloned())
            .unique()
            .collect();

        Journey {
            id: format!("journey_{}", self.graph.id),
            title,
            description,
            conditions,
            states,
            transitions: vec![],
            metadata: JourneyMetadata::new(&self.graph.id),
        }
    }

    /// Re-initializes any derived collection that no longer agrees with the source
    /// graph or the state map. Safe to call repeatedly.
    pub fn repair(&mut self) -> Vec<String> {
        let mut actions = Vec::new();

        let graph_node_ids: AHashSet<&str> =
            self.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let indexed_edges: usize = self.edge_lookup.values().map(Vec::len).sum();
        let lookups_stale = self.node_lookup.len() != graph_node_ids.len()
            || indexed_edges != self.graph.edges.len()
            || graph_node_ids
                .iter()
                .any(|id| !self.node_lookup.contains_key(*id));
        if lookups_stale {
            self.index_graph();
            actions.push("Rebuilt node and edge lookups from the source graph".to_string());
        }

        let before = self.state_order.len();
        let states = &self.states;
        self.state_order.retain(|id| states.contains_key(id));
        let mut seen: AHashSet<String> = AHashSet::new();
        self.state_order.retain(|id| seen.insert(id.clone()));
        let mut missing: Vec<String> = self
            .states
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        missing.sort_unstable();
        let appended = missing.len();
        self.state_order.extend(missing);
        if appended > 0 || self.state_order.len() != before {
            actions.push("Re-synchronized state ordering with the state map".to_string());
        }

        actions
    }
}
