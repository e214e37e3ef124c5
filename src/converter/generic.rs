use super::{ConverterOutput, NodeConverter, extract_tools, extract_variables};
use crate::context::ConversionContext;
use crate::error::{ConvertError, ConverterFailure};
use crate::journey::{State, StateType, Transition};
use crate::workflow::Node;

/// Fallback converter for structural nodes: branches, loops, parallel blocks and
/// terminals. Unknown tags are rejected so they surface as `NO_CONVERTER`.
pub struct GenericConverter;

const BRANCH_TAGS: [&str; 4] = ["condition", "if", "switch", "router"];
const LOOP_TAGS: [&str; 3] = ["loop", "iteration", "foreach"];
const PARALLEL_TAGS: [&str; 1] = ["parallel"];
const FINAL_TAGS: [&str; 4] = ["end", "final", "output", "response"];
const PAUSE_TAGS: [&str; 3] = ["delay", "wait", "note"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Branch,
    Loop,
    Parallel,
    Final,
    Pause,
}

impl Shape {
    fn of(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let tag = tag.as_str();
        if BRANCH_TAGS.contains(&tag) {
            Some(Shape::Branch)
        } else if LOOP_TAGS.contains(&tag) {
            Some(Shape::Loop)
        } else if PARALLEL_TAGS.contains(&tag) {
            Some(Shape::Parallel)
        } else if FINAL_TAGS.contains(&tag) {
            Some(Shape::Final)
        } else if PAUSE_TAGS.contains(&tag) {
            Some(Shape::Pause)
        } else {
            None
        }
    }

    fn for_node(node: &Node) -> Option<Self> {
        Shape::of(&node.node_type).or_else(|| node.data_type_tag().and_then(Shape::of))
    }
}

impl NodeConverter for GenericConverter {
    fn node_type(&self) -> &str {
        "generic"
    }

    fn can_convert(&self, node: &Node) -> bool {
        Shape::for_node(node).is_some()
    }

    fn convert(
        &self,
        node: &Node,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConverterOutput, ConverterFailure> {
        let shape = Shape::for_node(node).ok_or_else(|| ConvertError::Unsupported {
            node_id: node.id.clone(),
            message: format!("no structural mapping for type '{}'", node.node_type),
        })?;

        let name = node.display_name();
        let variables = extract_variables(node);
        let base = |suffix: Option<&str>, state_type: StateType| {
            State::new(self.state_id(node, suffix), state_type, name)
                .with_position(node.position)
        };

        let output = match shape {
            Shape::Branch => {
                let condition = node
                    .data_str("condition")
                    .or_else(|| node.data_str("expression"))
                    .or_else(|| node.config_str("condition"));
                let content = match condition {
                    Some(c) => format!("Evaluate: {}", c),
                    None => "Decide which path to take next.".to_string(),
                };
                let state = base(None, StateType::Condition)
                    .with_description(format!("Branching point '{}'", name))
                    .with_content(content)
                    .with_conditions(condition.map(str::to_string).into_iter().collect())
                    .with_variables(variables.clone());
                ConverterOutput::single(state)
            }
            Shape::Loop => {
                let over = node
                    .data_str("items")
                    .or_else(|| node.data_str("collection"))
                    .map(|items| format!("Repeat for each item in {}.", items))
                    .unwrap_or_else(|| "Repeat the enclosed steps.".to_string());
                let start = base(Some("start"), StateType::LoopStart)
                    .with_description(format!("Start of loop '{}'", name))
                    .with_content(over)
                    .with_variables(variables.clone());
                let end = base(Some("end"), StateType::LoopEnd)
                    .with_description(format!("End of loop '{}'", name))
                    .with_content("Loop finished.");
                let link = Transition::between(&start.id, &end.id)
                    .with_condition("Loop completed")
                    .with_description(format!("Leave loop '{}'", name))
                    .with_weight(2);
                ConverterOutput {
                    states: vec![start, end],
                    transitions: vec![link],
                    variables: vec![],
                }
            }
            Shape::Parallel => {
                let start = base(Some("start"), StateType::ParallelStart)
                    .with_description(format!("Start of parallel block '{}'", name))
                    .with_content("Run the following branches in parallel.")
                    .with_variables(variables.clone());
                let end = base(Some("end"), StateType::ParallelEnd)
                    .with_description(format!("End of parallel block '{}'", name))
                    .with_content("All parallel branches finished.");
                let link = Transition::between(&start.id, &end.id)
                    .with_condition("All branches completed")
                    .with_description(format!("Join parallel block '{}'", name))
                    .with_weight(2);
                ConverterOutput {
                    states: vec![start, end],
                    transitions: vec![link],
                    variables: vec![],
                }
            }
            Shape::Final => {
                let content = node
                    .data_str("message")
                    .or_else(|| node.data_str("content"))
                    .unwrap_or("Thank you! This conversation is complete.");
                ConverterOutput::single(
                    base(None, StateType::Final)
                        .with_description(format!("End of journey at '{}'", name))
                        .with_content(content)
                        .with_variables(variables.clone()),
                )
            }
            Shape::Pause => {
                let content = node
                    .data_str("message")
                    .or_else(|| node.data_str("content"))
                    .unwrap_or("Please wait a moment.");
                ConverterOutput::single(
                    base(None, StateType::Chat)
                        .with_description(format!("Pass-through step '{}'", name))
                        .with_content(content)
                        .with_tools(extract_tools(node))
                        .with_variables(variables.clone()),
                )
            }
        };
        Ok(output.with_variables(variables))
    }
}
