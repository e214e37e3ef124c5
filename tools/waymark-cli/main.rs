use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use waymark::error::WorkflowImportError;
use waymark::prelude::*;

// --- Canvas Export Structs (Input Format Specific) ---
// A bare `{nodes, edges}` export straight from the editor canvas, without the
// workflow envelope. Only used here for conversion.

#[derive(Deserialize)]
struct RawCanvas {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type", default)]
    node_type: Option<String>,
    #[serde(default)]
    position: Option<Position>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<String>,
    source: String,
    target: String,
    #[serde(default, alias = "sourceHandle")]
    source_handle: Option<String>,
    #[serde(default, alias = "targetHandle")]
    target_handle: Option<String>,
}

impl IntoWorkflow for RawCanvas {
    fn into_workflow(self) -> Result<WorkflowGraph, WorkflowImportError> {
        if self.nodes.is_empty() {
            return Err(WorkflowImportError::Invalid(
                "canvas export contains no nodes".to_string(),
            ));
        }
        let id = self.id.unwrap_or_else(|| "canvas".to_string());
        let name = self.name.unwrap_or_else(|| "Canvas export".to_string());
        let mut graph = WorkflowGraph::new(id, name);

        for raw in self.nodes {
            // Editors that nest the real type under `data.type` leave the outer type empty.
            let node_type = raw
                .node_type
                .or_else(|| {
                    raw.data
                        .as_ref()
                        .and_then(|d| d.get("type"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .ok_or_else(|| {
                    WorkflowImportError::Invalid(format!("node '{}' has no type", raw.id))
                })?;
            let mut node = Node::new(raw.id, node_type);
            node.position = raw.position.unwrap_or_default();
            node.data = raw.data;
            graph.nodes.push(node);
        }

        for (index, raw) in self.edges.into_iter().enumerate() {
            let id = raw
                .id
                .unwrap_or_else(|| format!("edge_{}_{}_{}", index, raw.source, raw.target));
            let mut edge = Edge::new(id, raw.source, raw.target);
            edge.source_handle = raw.source_handle;
            edge.target_handle = raw.target_handle;
            graph.edges.push(edge);
        }
        Ok(graph)
    }
}

/// Converts a workflow graph JSON file into a conversational journey
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the workflow JSON file (full graph or bare canvas export)
    workflow_path: String,

    /// Write the journey JSON here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Path to a JSON file with conversion options
    #[arg(long)]
    options: Option<String>,

    /// Map an editor node type to a built-in converter, e.g. `assistant=agent`
    #[arg(short = 'm', long = "map", value_name = "USER=BUILTIN")]
    type_mappings: Vec<String>,

    /// Do not copy the original nodes and edges into the journey metadata
    #[arg(long)]
    no_layout: bool,

    /// Attach phase timings and converter usage to the journey metadata
    #[arg(long)]
    debug_info: bool,

    /// Skip input and output validation
    #[arg(long)]
    no_validate: bool,

    /// Validate node configuration before converting
    #[arg(long, conflicts_with = "no_validate")]
    validate_input: bool,

    /// Return a partial journey if the pipeline fails as a whole
    #[arg(long)]
    recover: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let load_start = Instant::now();
    let graph = load_workflow(&cli.workflow_path);
    let options = load_options(&cli);
    let load_duration = load_start.elapsed();

    let mut builder = ConversionEngine::builder();
    for mapping in &cli.type_mappings {
        let (user_type, builtin_type) = mapping.split_once('=').unwrap_or_else(|| {
            exit_with_error(&format!(
                "Invalid type mapping '{}', expected USER=BUILTIN",
                mapping
            ))
        });
        builder = builder.with_type_mapping(user_type.trim(), builtin_type.trim());
    }
    let engine = builder.build();

    let convert_start = Instant::now();
    let mut report = |progress: &ConversionProgress| {
        tracing::debug!(
            phase = %progress.phase,
            completed = progress.completed,
            total = progress.total,
            "{}",
            progress.step
        );
    };
    let result = if cli.recover {
        engine.convert_with_recovery(&graph, options, Some(&mut report))
    } else {
        engine.convert(&graph, options, Some(&mut report))
    };
    let convert_duration = convert_start.elapsed();

    if let Some(journey) = &result.journey {
        let json = serde_json::to_string_pretty(journey)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize journey: {}", e)));
        match &cli.output {
            Some(path) => {
                fs::write(path, json).unwrap_or_else(|e| {
                    exit_with_error(&format!("Failed to write journey to '{}': {}", path, e))
                });
                eprintln!("Journey written to '{}'", path);
            }
            None => println!("{}", json),
        }
    }

    print_summary(&result);
    eprintln!("\n--- Performance Summary ---");
    eprintln!("File Loading:   {:?}", load_duration);
    eprintln!("Conversion:     {:?}", convert_duration);

    if !result.success {
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("waymark=debug,waymark_cli=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waymark=info,warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a full `WorkflowGraph`, falling back to a bare canvas export.
fn load_workflow(path: &str) -> WorkflowGraph {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read workflow file '{}': {}", path, e))
    });
    let value: Value = serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse workflow JSON: {}", e)));

    let is_full_graph = value.get("id").is_some() && value.get("name").is_some();
    if is_full_graph {
        return serde_json::from_value(value)
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid workflow graph: {}", e)));
    }

    let canvas: RawCanvas = serde_json::from_value(value)
        .map_err(|e| WorkflowImportError::Parse(e.to_string()))
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let mut graph = canvas
        .into_workflow()
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    if graph.id == "canvas" {
        if let Some(stem) = Path::new(path).file_stem().and_then(|s| s.to_str()) {
            graph.id = stem.to_string();
        }
    }
    graph
}

fn load_options(cli: &Cli) -> ConversionOptions {
    let mut options = match &cli.options {
        Some(path) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read options file '{}': {}", path, e))
            });
            serde_json::from_str(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid options file: {}", e)))
        }
        None => ConversionOptions::default(),
    };
    if cli.no_layout {
        options.preserve_layout = false;
    }
    if cli.debug_info {
        options.include_debug_info = true;
    }
    if cli.validate_input {
        options.validate_input = true;
    }
    if cli.no_validate {
        options.validate_input = false;
        options.validate_output = false;
    }
    options
}

fn print_summary(result: &ConversionResult) {
    let meta = &result.metadata;
    eprintln!("\n--- Conversion Summary ---");
    eprintln!("Success:        {}", result.success);
    eprintln!("Nodes:          {} ({} skipped)", meta.total_nodes, meta.skipped_nodes);
    eprintln!("Edges:          {}", meta.total_edges);
    eprintln!("States:         {}", meta.converted_states);
    eprintln!("Transitions:    {}", meta.transitions);

    if !result.errors.is_empty() {
        eprintln!("\nErrors:");
        for error in &result.errors {
            eprintln!("  {}", error);
            for suggestion in &error.suggestions {
                eprintln!("    - {}", suggestion);
            }
        }
    }
    if !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  {}", warning);
            for suggestion in &warning.suggestions {
                eprintln!("    - {}", suggestion);
            }
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
