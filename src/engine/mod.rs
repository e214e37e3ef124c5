//! The conversion pipeline.
//!
//! A run executes five strictly ordered phases over a fresh [`ConversionContext`]:
//! structure analysis, node conversion, transition synthesis, layout preservation and
//! finalization. Per-node and per-edge failures are downgraded to diagnostics; only a
//! failure escaping a whole phase ends the run with `CRITICAL_CONVERSION_ERROR`.

use crate::analysis::{NodeAnalyzer, StructuralAnalyzer};
use crate::context::{ConversionContext, ConversionOptions};
use crate::converter::{ConverterOutput, ConverterRegistry, NodeConverter};
use crate::diagnostic::{ConversionError, ConversionWarning, codes};
use crate::error::{AnalysisError, ConvertError, ConverterFailure, EngineError};
use crate::journey::{DebugInfo, Journey, PhaseTiming, State, Transition};
use crate::recovery::ErrorRecovery;
use crate::transition::TransitionBuilder;
use crate::validation::{StructuralValidator, ValidationEngine};
use crate::workflow::{Node, WorkflowGraph};
use ahash::AHashSet;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

mod progress;
mod result;

pub use progress::{ConversionPhase, ConversionProgress, ProgressSink};
pub use result::{ConversionMetadata, ConversionResult};

/// Converts workflow graphs into journeys. Immutable once built, so one engine can
/// serve concurrent runs from several threads.
pub struct ConversionEngine {
    registry: ConverterRegistry,
    analyzer: Arc<dyn NodeAnalyzer>,
    validator: Arc<dyn ValidationEngine>,
    transitions: TransitionBuilder,
    recovery: ErrorRecovery,
}

pub struct EngineBuilder {
    registry: ConverterRegistry,
    analyzer: Arc<dyn NodeAnalyzer>,
    validator: Arc<dyn ValidationEngine>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: ConverterRegistry::default(),
            analyzer: Arc::new(StructuralAnalyzer),
            validator: Arc::new(StructuralValidator),
        }
    }

    /// Registers `converter` under `tag`, replacing any converter already there.
    pub fn with_converter(mut self, tag: &str, converter: impl NodeConverter + 'static) -> Self {
        self.registry.register(tag, Arc::new(converter));
        self
    }

    /// Routes nodes tagged `user_type_name` to the converter registered as `builtin_type_name`.
    pub fn with_type_mapping(mut self, user_type_name: &str, builtin_type_name: &str) -> Self {
        if !self.registry.alias(user_type_name, builtin_type_name) {
            warn!(
                user_type = user_type_name,
                builtin_type = builtin_type_name,
                "Ignoring type mapping to an unregistered converter"
            );
        }
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl NodeAnalyzer + 'static) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn with_validator(mut self, validator: impl ValidationEngine + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn build(self) -> ConversionEngine {
        ConversionEngine {
            registry: self.registry,
            analyzer: self.analyzer,
            validator: self.validator,
            transitions: TransitionBuilder::new(),
            recovery: ErrorRecovery::new(),
        }
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConversionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Registered converter tags in registration order.
    pub fn get_available_converters(&self) -> Vec<String> {
        self.registry.available_converters()
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Runs the pipeline. Never panics and never returns an `Err`: every failure is
    /// reported inside the result.
    pub fn convert(
        &self,
        graph: &WorkflowGraph,
        options: ConversionOptions,
        progress: Option<&mut dyn ProgressSink>,
    ) -> ConversionResult {
        self.run(graph, options, progress, false)
    }

    /// Like [`convert`](Self::convert), but a pipeline-level failure repairs the
    /// context and returns a partial journey built from the surviving states.
    pub fn convert_with_recovery(
        &self,
        graph: &WorkflowGraph,
        options: ConversionOptions,
        progress: Option<&mut dyn ProgressSink>,
    ) -> ConversionResult {
        self.run(graph, options, progress, true)
    }

    fn run<'g>(
        &self,
        graph: &'g WorkflowGraph,
        options: ConversionOptions,
        progress: Option<&mut dyn ProgressSink>,
        recover: bool,
    ) -> ConversionResult {
        let started = Instant::now();
        info!(workflow_id = %graph.id, nodes = graph.nodes.len(), edges = graph.edges.len(), "Starting conversion");

        let mut pipeline = Pipeline {
            engine: self,
            ctx: ConversionContext::new(graph, options),
            sink: progress,
            timings: Vec::new(),
            converters_used: BTreeMap::new(),
            transitions: Vec::new(),
            journey: None,
        };

        let outcome = pipeline.execute();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(()) => pipeline.finish(elapsed_ms),
            Err(cause) => pipeline.fail(cause, recover, elapsed_ms),
        }
    }
}

/// State of one run. Dropped when the run ends.
struct Pipeline<'e, 'g, 'p> {
    engine: &'e ConversionEngine,
    ctx: ConversionContext<'g>,
    sink: Option<&'p mut dyn ProgressSink>,
    timings: Vec<PhaseTiming>,
    /// Node id -> registry tag of the converter that handled it.
    converters_used: BTreeMap<String, String>,
    transitions: Vec<Transition>,
    journey: Option<Journey>,
}

impl<'g> Pipeline<'_, 'g, '_> {
    fn execute(&mut self) -> Result<(), EngineError> {
        if self.ctx.graph.id.trim().is_empty() {
            return Err(EngineError::InvalidWorkflow(
                "workflow id must not be empty".to_string(),
            ));
        }
        if self.ctx.graph.nodes.is_empty() {
            self.ctx.add_warning(
                ConversionWarning::medium(codes::EMPTY_WORKFLOW, "The workflow has no nodes")
                    .suggest("Add a starter node and connect the steps of the conversation"),
            );
            for phase in ConversionPhase::ALL {
                self.report(phase, "No nodes to process", 0, 0, None);
            }
            return Ok(());
        }

        self.phase(ConversionPhase::Analyzing, Self::analyze)?;
        self.phase(ConversionPhase::Converting, Self::convert_nodes)?;
        self.phase(ConversionPhase::BuildingTransitions, Self::build_transitions)?;
        self.phase(ConversionPhase::PreservingState, Self::preserve_state)?;
        self.phase(ConversionPhase::Validating, Self::finalize)?;
        Ok(())
    }

    /// Runs one phase to completion. A panic escaping the phase becomes `EngineError::Panicked`.
    fn phase(
        &mut self,
        phase: ConversionPhase,
        body: fn(&mut Self) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        debug!(%phase, "Phase started");
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(self))).unwrap_or_else(|payload| {
            Err(EngineError::Panicked {
                phase: phase.to_string(),
                message: panic_message(payload.as_ref()),
            })
        });
        let elapsed_micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.timings.push(PhaseTiming {
            phase: phase.to_string(),
            elapsed_micros,
        });
        debug!(%phase, elapsed_micros, "Phase finished");
        outcome
    }

    fn report(
        &mut self,
        phase: ConversionPhase,
        step: impl Into<String>,
        completed: usize,
        total: usize,
        current_node: Option<&str>,
    ) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.on_progress(&ConversionProgress {
                phase,
                step: step.into(),
                completed,
                total,
                current_node: current_node.map(str::to_string),
            });
        }
    }

    fn analyze(&mut self) -> Result<(), EngineError> {
        let graph = self.ctx.graph;
        let total = graph.nodes.len();
        self.report(ConversionPhase::Analyzing, "Analyzing workflow structure", 0, total, None);

        if self.ctx.options.validate_input {
            let validation = self
                .engine
                .validator
                .validate_workflow(graph, &self.engine.registry);
            self.ctx.errors.extend(validation.errors);
            self.ctx.warnings.extend(validation.warnings);
        }

        for (index, node) in graph.nodes.iter().enumerate() {
            let analyzer = &self.engine.analyzer;
            let ctx = &self.ctx;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze_node(node, ctx)))
                .unwrap_or_else(|payload| {
                    Err(AnalysisError::Failed {
                        node_id: node.id.clone(),
                        message: panic_message(payload.as_ref()),
                    })
                });
            if let Err(cause) = outcome {
                warn!(node_id = %node.id, %cause, "Node analysis failed");
                self.ctx.add_warning(
                    ConversionWarning::medium(codes::NODE_ANALYSIS_ERROR, cause.to_string())
                        .for_node(&node.id)
                        .suggest("Check the node's configuration in the editor"),
                );
            }
            self.report(
                ConversionPhase::Analyzing,
                "Analyzed node",
                index + 1,
                total,
                Some(&node.id),
            );
        }
        Ok(())
    }

    fn convert_nodes(&mut self) -> Result<(), EngineError> {
        let graph = self.ctx.graph;
        let total = graph.nodes.len();
        self.report(ConversionPhase::Converting, "Converting nodes to states", 0, total, None);

        for (index, node) in graph.nodes.iter().enumerate() {
            self.convert_node(node);
            self.report(
                ConversionPhase::Converting,
                "Converted node",
                index + 1,
                total,
                Some(&node.id),
            );
        }
        info!(states = self.ctx.state_count(), "Node conversion finished");
        Ok(())
    }

    fn convert_node(&mut self, node: &'g Node) {
        let Some((tag, converter)) = self.engine.registry.resolve(node) else {
            warn!(node_id = %node.id, node_type = %node.node_type, "No converter for node");
            self.ctx.add_warning(
                ConversionWarning::medium(
                    codes::NO_CONVERTER,
                    format!(
                        "No converter available for node '{}' of type '{}'",
                        node.id, node.node_type
                    ),
                )
                .for_node(&node.id)
                .suggest(format!("Register a converter for type '{}'", node.node_type))
                .suggest("Map the type to a built-in converter"),
            );
            return;
        };
        debug!(node_id = %node.id, converter = tag, "Converting node");
        self.converters_used.insert(node.id.clone(), tag.to_string());

        let ctx = &self.ctx;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| converter.convert(node, ctx)))
            .unwrap_or_else(|payload| {
                Err(ConverterFailure::new(ConvertError::Panicked {
                    node_id: node.id.clone(),
                    message: panic_message(payload.as_ref()),
                }))
            });

        match outcome {
            Ok(output) => self.apply_output(node, output),
            Err(failure) => {
                warn!(node_id = %node.id, error = %failure, "Node conversion failed");
                self.ctx.add_error(
                    ConversionError::error(codes::NODE_CONVERSION_ERROR, failure.to_string())
                        .for_node(&node.id)
                        .suggest("Check the node's configuration in the editor")
                        .suggest("A placeholder state was generated where possible"),
                );
                let recovery = self
                    .engine
                    .recovery
                    .recover_from_node_error(node, &failure, &mut self.ctx);
                if recovery.skip_edges {
                    self.ctx.skipped_nodes.insert(node.id.clone());
                }
                if let Some(state) = recovery.state {
                    self.store_state(node, state);
                }
            }
        }
    }

    fn apply_output(&mut self, node: &Node, output: ConverterOutput) {
        for state in output.states {
            self.store_state(node, state);
        }
        for variable in output.variables {
            self.ctx.add_variable(variable);
        }
        self.ctx.converter_transitions.extend(output.transitions);
    }

    /// Inserts a state, last writer wins. Overwrites are flagged.
    fn store_state(&mut self, node: &Node, state: State) {
        let id = state.id.clone();
        if self.ctx.insert_state(state).is_some() {
            warn!(node_id = %node.id, state_id = %id, "State id collision, keeping the later state");
            self.ctx.add_warning(
                ConversionWarning::low(
                    codes::STATE_ID_COLLISION,
                    format!("State '{}' was produced twice; the later one was kept", id),
                )
                .for_node(&node.id)
                .suggest("Make sure node ids are unique"),
            );
            self.ctx.state_collisions.push(id.clone());
        }
        self.ctx.conversion_map.entry(node.id.clone()).or_insert(id);
    }

    fn build_transitions(&mut self) -> Result<(), EngineError> {
        let graph = self.ctx.graph;
        let unindexed = graph
            .nodes
            .iter()
            .filter(|n| !self.ctx.node_lookup.contains_key(&n.id))
            .count();
        if unindexed > 0 {
            return Err(EngineError::ContextCorrupted(format!(
                "{} nodes are missing from the node lookup",
                unindexed
            )));
        }

        let total = graph.edges.len();
        self.report(
            ConversionPhase::BuildingTransitions,
            "Building transitions from edges",
            0,
            total,
            None,
        );

        let recovery = self.engine.recovery;
        let mut transitions =
            self.engine
                .transitions
                .build_all_transitions_with(&mut self.ctx, |edge, cause, ctx| {
                    recovery.recover_from_transition_error(edge, &cause, ctx)
                });

        let mut seen: AHashSet<String> = transitions.iter().map(|t| t.id.clone()).collect();
        for transition in std::mem::take(&mut self.ctx.converter_transitions) {
            let connected = self.ctx.contains_state(&transition.source_state_id)
                && self.ctx.contains_state(&transition.target_state_id);
            if connected && seen.insert(transition.id.clone()) {
                transitions.push(transition);
            } else if !connected {
                debug!(transition_id = %transition.id, "Dropping converter transition with missing endpoint");
            }
        }

        self.report(
            ConversionPhase::BuildingTransitions,
            "Built transitions",
            total,
            total,
            None,
        );
        self.transitions = transitions;
        Ok(())
    }

    fn preserve_state(&mut self) -> Result<(), EngineError> {
        let preserve = self.ctx.options.preserve_layout;
        let step = if preserve {
            "Preserving original layout"
        } else {
            "Layout preservation disabled"
        };
        self.report(ConversionPhase::PreservingState, step, 0, 1, None);
        self.report(ConversionPhase::PreservingState, step, 1, 1, None);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), EngineError> {
        self.report(ConversionPhase::Validating, "Assembling journey", 0, 1, None);

        let mut journey = self.ctx.journey_skeleton();
        journey.transitions = std::mem::take(&mut self.transitions);
        if self.ctx.options.preserve_layout {
            journey.metadata.original_nodes = Some(self.ctx.graph.nodes.clone());
            journey.metadata.original_edges = Some(self.ctx.graph.edges.clone());
        }

        if self.ctx.options.validate_output {
            let validation = self.engine.validator.validate_journey(&journey);
            self.ctx.errors.extend(validation.errors);
            self.ctx.warnings.extend(validation.warnings);
        }

        self.journey = (!journey.states.is_empty()).then_some(journey);
        self.report(ConversionPhase::Validating, "Validated journey", 1, 1, None);
        Ok(())
    }

    fn finish(mut self, elapsed_ms: u64) -> ConversionResult {
        if self.ctx.options.include_debug_info {
            if let Some(journey) = self.journey.as_mut() {
                journey.metadata.debug = Some(DebugInfo {
                    phase_timings: std::mem::take(&mut self.timings),
                    converters_used: std::mem::take(&mut self.converters_used),
                    state_collisions: self.ctx.state_collisions.clone(),
                });
            }
        }

        let success = !self.ctx.has_blocking_errors();
        let metadata = self.metadata(elapsed_ms);
        info!(
            workflow_id = %self.ctx.graph.id,
            success,
            states = metadata.converted_states,
            transitions = metadata.transitions,
            errors = self.ctx.errors.len(),
            warnings = self.ctx.warnings.len(),
            elapsed_ms,
            "Conversion finished"
        );
        ConversionResult {
            success,
            journey: self.journey,
            errors: self.ctx.errors,
            warnings: self.ctx.warnings,
            metadata,
        }
    }

    fn fail(mut self, cause: EngineError, recover: bool, elapsed_ms: u64) -> ConversionResult {
        error!(workflow_id = %self.ctx.graph.id, %cause, "Conversion failed");
        let mut critical = ConversionError::critical(
            codes::CRITICAL_CONVERSION_ERROR,
            format!("Conversion failed: {}", cause),
        );
        let journey = if recover {
            let outcome = self
                .engine
                .recovery
                .recover_from_critical_error(&cause, &mut self.ctx);
            critical = critical.suggest(if outcome.can_recover {
                "A partial journey without transitions was produced; review it before use"
            } else {
                "No states could be recovered"
            });
            outcome.partial_result
        } else {
            critical = critical.suggest("Retry with recovery enabled to obtain a partial journey");
            None
        };
        let critical = critical.suggest("Check the workflow for malformed nodes and edges");

        let mut metadata = self.metadata(elapsed_ms);
        metadata.transitions = 0;
        ConversionResult {
            success: false,
            journey,
            errors: vec![critical],
            warnings: self.ctx.warnings,
            metadata,
        }
    }

    fn metadata(&self, elapsed_ms: u64) -> ConversionMetadata {
        let graph = self.ctx.graph;
        let conversion_map = self.ctx.conversion_map().clone();
        let skipped_nodes = graph
            .nodes
            .iter()
            .filter(|n| !conversion_map.contains_key(&n.id))
            .count();
        ConversionMetadata {
            total_nodes: graph.nodes.len(),
            total_edges: graph.edges.len(),
            converted_states: self.ctx.state_count(),
            skipped_nodes,
            transitions: self.journey.as_ref().map_or(0, |j| j.transitions.len()),
            elapsed_ms,
            conversion_map,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
