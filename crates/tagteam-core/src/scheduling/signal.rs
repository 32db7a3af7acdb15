//! Control-signal interpretation.
//!
//! Policies can express the same control action two ways: a structured tool
//! call, or text (a `__SPECIAL_TOOL__{json}` marker or a fenced command
//! block). [`parse_raw_action`] normalizes both into an [`Action`], and
//! [`classify`] maps a recorded step onto a [`ControlSignal`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::collaborators::RawAction;
use crate::domain::{Action, FormatError, Participant, Step, ToolCall};

pub const HANDOFF_TOOL: &str = "handoff";
pub const ASK_QUESTION_TOOL: &str = "ask_question";
pub const SPECIAL_TOOL_MARKER: &str = "__SPECIAL_TOOL__";
/// Tool name given to commands found in fenced code blocks.
pub const SHELL_TOOL: &str = "bash";

/// What a step means for rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    Plain,
    Handoff {
        message: Option<String>,
    },
    Question {
        text: String,
        target: Option<String>,
    },
}

/// Classify a recorded step.
pub fn classify(step: &Step) -> ControlSignal {
    match &step.action {
        Action::Handoff { message } => ControlSignal::Handoff {
            message: message.clone(),
        },
        Action::Question { text, target } => ControlSignal::Question {
            text: text.clone(),
            target: target.clone(),
        },
        Action::ToolCall(_) | Action::Malformed { .. } => ControlSignal::Plain,
    }
}

/// Classify a step produced by `author`, honouring its handoff setting.
pub fn classify_for(author: &Participant, step: &Step) -> ControlSignal {
    match classify(step) {
        ControlSignal::Handoff { .. } if !author.handoff_enabled => ControlSignal::Plain,
        signal => signal,
    }
}

/// Normalize raw policy output into an action.
pub fn parse_raw_action(raw: &RawAction) -> Result<Action, FormatError> {
    match raw.tool_calls.as_slice() {
        [] => {}
        [call] => {
            let arguments = normalize_arguments(&call.arguments)?;
            return action_from_call(&call.name, arguments);
        }
        calls => {
            return Err(FormatError::new(format!(
                "expected exactly one tool call, got {}",
                calls.len()
            )))
        }
    }

    let content = raw.content.trim();
    if let Some(start) = content.find(SPECIAL_TOOL_MARKER) {
        return parse_special_tool(&content[start + SPECIAL_TOOL_MARKER.len()..]);
    }

    if let Some(block) = last_fenced_block(content) {
        let command = block.command.trim();
        if command.is_empty() {
            return Err(FormatError::new("command block is empty"));
        }
        return Ok(Action::ToolCall(ToolCall::new(
            SHELL_TOOL,
            serde_json::json!({ "command": command }),
        )));
    }

    Err(FormatError::new(
        "no tool call found: emit a tool call or a single fenced command block",
    ))
}

/// Prose that accompanied a text-encoded or structured action.
///
/// For structured tool calls this is the whole content. For the text
/// encodings it is whatever surrounds the marker payload or the last fenced
/// block. Output with no recognizable action yields `None`.
pub fn surrounding_prose(raw: &RawAction) -> Option<String> {
    let content = raw.content.trim();
    let (before, after) = if !raw.tool_calls.is_empty() {
        (content, "")
    } else if let Some(start) = content.find(SPECIAL_TOOL_MARKER) {
        (&content[..start], "")
    } else {
        let block = last_fenced_block(content)?;
        (&content[..block.start], &content[block.end..])
    };
    let prose = [before.trim(), after.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!prose.is_empty()).then_some(prose)
}

fn parse_special_tool(json: &str) -> Result<Action, FormatError> {
    let value: Value = serde_json::from_str(json.trim())
        .map_err(|e| FormatError::new(format!("malformed {SPECIAL_TOOL_MARKER} payload: {e}")))?;
    let function = value
        .get("function")
        .ok_or_else(|| FormatError::new(format!("{SPECIAL_TOOL_MARKER} payload has no function")))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::new(format!("{SPECIAL_TOOL_MARKER} function has no name")))?;
    let arguments = normalize_arguments(function.get("arguments").unwrap_or(&Value::Null))?;
    action_from_call(name, arguments)
}

/// Accept arguments as an object, a JSON string holding an object, or nothing.
fn normalize_arguments(arguments: &Value) -> Result<Value, FormatError> {
    match arguments {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(arguments.clone()),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => Ok(parsed),
            Ok(_) => Err(FormatError::new("tool arguments must be a JSON object")),
            Err(e) => Err(FormatError::new(format!("tool arguments are not valid JSON: {e}"))),
        },
        _ => Err(FormatError::new("tool arguments must be a JSON object")),
    }
}

fn action_from_call(name: &str, arguments: Value) -> Result<Action, FormatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormatError::new("tool call has no name"));
    }

    if name.eq_ignore_ascii_case(HANDOFF_TOOL) {
        return Ok(Action::Handoff {
            message: non_empty(&arguments, "message"),
        });
    }

    if name.eq_ignore_ascii_case(ASK_QUESTION_TOOL) {
        let text = non_empty(&arguments, "question")
            .ok_or_else(|| FormatError::new("ask_question requires a non-empty `question`"))?;
        let target = non_empty(&arguments, "target").or_else(|| non_empty(&arguments, "agent"));
        return Ok(Action::Question { text, target });
    }

    Ok(Action::ToolCall(ToolCall::new(name, arguments)))
}

fn non_empty(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

struct FencedBlock<'a> {
    command: &'a str,
    /// Byte range of the whole block, fences included.
    start: usize,
    end: usize,
}

fn last_fenced_block(content: &str) -> Option<FencedBlock<'_>> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence =
        FENCE.get_or_init(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("fence regex is valid"));
    let caps = fence.captures_iter(content).last()?;
    let whole = caps.get(0)?;
    Some(FencedBlock {
        command: caps.get(1)?.as_str(),
        start: whole.start(),
        end: whole.end(),
    })
}
