//! Interpretation of the handle naming conventions used by the editor.

use regex::Regex;
use std::sync::LazyLock;

static PLAIN_HANDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:source|target|output|input|default|out|in)(?:-\d+)?$").unwrap()
});
static BRANCH_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:parallel-)?branch-(\d+)(?:-source)?$").unwrap());

/// The semantic role encoded in a handle name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind<'a> {
    /// No handle, or a plain connection point such as `source` or `output-1`.
    Plain { named: bool },
    /// `condition-<value>`. The value may be empty, which is malformed.
    Condition(&'a str),
    LoopStart,
    LoopEnd,
    ParallelStart,
    ParallelEnd,
    Branch(u32),
    Unrecognized,
}

impl<'a> HandleKind<'a> {
    pub fn classify(handle: Option<&'a str>) -> Self {
        let Some(handle) = handle.map(str::trim).filter(|h| !h.is_empty()) else {
            return HandleKind::Plain { named: false };
        };
        if let Some(value) = handle.strip_prefix("condition-") {
            return HandleKind::Condition(value.trim());
        }
        match handle {
            "condition" => HandleKind::Condition(""),
            "true" | "false" | "yes" | "no" | "else" => HandleKind::Condition(handle),
            "loop-start-source" | "loop-start" | "loop-body-source" => HandleKind::LoopStart,
            "loop-end-source" | "loop-end" => HandleKind::LoopEnd,
            "parallel-start-source" | "parallel-start" => HandleKind::ParallelStart,
            "parallel-end-source" | "parallel-end" => HandleKind::ParallelEnd,
            _ if PLAIN_HANDLE.is_match(handle) => HandleKind::Plain { named: true },
            _ => match BRANCH_HANDLE
                .captures(handle)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
            {
                Some(n) => HandleKind::Branch(n),
                None => HandleKind::Unrecognized,
            },
        }
    }

    /// Plain and absent handles carry no meaning worth mentioning in descriptions.
    pub fn is_default(&self) -> bool {
        matches!(self, HandleKind::Plain { .. })
    }

    /// Edges leaving through these handles start at the closing state of a block.
    pub fn leaves_block_end(&self) -> bool {
        matches!(self, HandleKind::LoopEnd | HandleKind::ParallelEnd)
    }

    /// The fixed phrase for structural handles.
    pub fn structural_condition(&self) -> Option<String> {
        match self {
            HandleKind::LoopStart => Some("Loop iteration".to_string()),
            HandleKind::LoopEnd => Some("Loop completed".to_string()),
            HandleKind::ParallelStart => Some("Parallel branches started".to_string()),
            HandleKind::ParallelEnd => Some("All branches completed".to_string()),
            HandleKind::Branch(n) => Some(format!("Parallel branch {}", n)),
            _ => None,
        }
    }

    /// Ordering weight: the numeric value of `condition-N`, else a fixed table.
    pub fn weight(&self) -> Option<i32> {
        match self {
            HandleKind::Condition(value) => value.parse().ok(),
            HandleKind::Plain { named: true } => Some(0),
            HandleKind::LoopStart | HandleKind::ParallelStart => Some(1),
            HandleKind::LoopEnd | HandleKind::ParallelEnd => Some(2),
            HandleKind::Branch(n) => i32::try_from(*n).ok(),
            HandleKind::Plain { named: false } | HandleKind::Unrecognized => None,
        }
    }
}

/// Turns the value of a `condition-<value>` handle into a readable phrase.
pub fn humanize_condition(value: &str) -> String {
    match value.to_ascii_lowercase().as_str() {
        "true" => return "When condition is true".to_string(),
        "false" => return "When condition is false".to_string(),
        "yes" => return "When the answer is yes".to_string(),
        "no" => return "When the answer is no".to_string(),
        "default" | "else" | "otherwise" => return "Otherwise".to_string(),
        _ => {}
    }
    if let Ok(n) = value.parse::<i64>() {
        return format!("Option {}", n);
    }
    humanize_identifier(value)
}

/// `user_confirmed`, `user-confirmed` and `userConfirmed` all become `User confirmed`.
pub fn humanize_identifier(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in raw.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    let sentence = words.join(" ");
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
