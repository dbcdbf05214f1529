//! # Domain Types
//!
//! Conversation and tool data structures shared by the dispatcher, the agent loop
//! and the decision-engine adapters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a single tool invocation.
///
/// Both variants carry text so the decision engine always receives the same
/// envelope. Serializes as `{"result": ..}` or `{"error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolResult {
    #[serde(rename = "result")]
    Ok(String),
    #[serde(rename = "error")]
    Error(String),
}

impl ToolResult {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self::Ok(payload.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The payload or error message, without the variant tag.
    pub fn text(&self) -> &str {
        match self {
            Self::Ok(payload) => payload,
            Self::Error(message) => message,
        }
    }

    /// JSON envelope handed back to the decision engine.
    pub fn to_response(&self) -> Value {
        match self {
            Self::Ok(payload) => serde_json::json!({ "result": payload }),
            Self::Error(message) => serde_json::json!({ "error": message }),
        }
    }
}

/// A tool invocation requested by the decision engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// One piece of a turn's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    ToolCall(ToolRequest),
    ToolResponse { name: String, result: ToolResult },
}

/// An entry in the append-only conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn agent(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Agent,
            parts,
        }
    }

    pub fn tool(name: impl Into<String>, result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResponse {
                name: name.into(),
                result,
            }],
        }
    }

    /// Tool invocations carried by this turn, in the order they were issued.
    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text parts, or `None` if the turn has no text.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    /// The tool-response envelope, if this is a tool turn.
    pub fn tool_response(&self) -> Option<(&str, &ToolResult)> {
        self.parts.iter().find_map(|part| match part {
            Part::ToolResponse { name, result } => Some((name.as_str(), result)),
            _ => None,
        })
    }
}

/// Token accounting reported by the decision engine for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
}

/// The decision engine's answer for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Agent-role turn, appended to history verbatim.
    pub turn: ConversationTurn,
    pub usage: Option<TokenUsage>,
}

impl Decision {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            turn: ConversationTurn::agent(parts),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// A decision with no tool requests ends the conversation.
    pub fn is_final(&self) -> bool {
        self.turn.tool_requests().is_empty()
    }
}

/// Captured result of running a script.
///
/// A timed-out outcome never carries an exit code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecutionOutcome {
    pub fn timed_out(stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            exit_code: None,
            timed_out: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_envelope_shape() {
        let ok = ToolResult::ok("hello");
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"result": "hello"}));
        assert_eq!(ok.to_response(), json!({"result": "hello"}));

        let err = ToolResult::error("nope");
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "nope"}));
        assert!(err.is_error());
        assert_eq!(err.text(), "nope");
    }

    #[test]
    fn test_tool_request_ignores_non_object_arguments() {
        let request = ToolRequest::new("get_files_info", json!("not an object"));
        assert!(request.arguments.is_empty());

        let request = ToolRequest::new("get_file_content", json!({"file_path": "main.py"}));
        assert_eq!(request.arguments["file_path"], json!("main.py"));
    }

    #[test]
    fn test_turn_accessors() {
        let turn = ConversationTurn::agent(vec![
            Part::Text("Looking around".into()),
            Part::ToolCall(ToolRequest::new("get_files_info", json!({}))),
            Part::ToolCall(ToolRequest::new("get_file_content", json!({"file_path": "a"}))),
        ]);
        let names: Vec<&str> = turn.tool_requests().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["get_files_info", "get_file_content"]);
        assert_eq!(turn.text().as_deref(), Some("Looking around"));
        assert!(turn.tool_response().is_none());

        let tool = ConversationTurn::tool("write_file", ToolResult::ok("done"));
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_response(), Some(("write_file", &ToolResult::ok("done"))));
    }

    #[test]
    fn test_decision_is_final_without_requests() {
        assert!(Decision::new(vec![Part::Text("All done".into())]).is_final());
        let decision = Decision::new(vec![Part::ToolCall(ToolRequest::new("write_file", json!({})))]);
        assert!(!decision.is_final());
    }
}
