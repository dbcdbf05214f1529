//! Gemini `generateContent` wire format
//!
//! Conversation turns become `contents`, the tool catalog becomes a single
//! `functionDeclarations` tool. Function responses travel in `user`-role content,
//! one content per round holding every response in request order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::catalog::ToolSignature;
use crate::domain::types::{ConversationTurn, Decision, Part, Role, TokenUsage, ToolRequest, ToolResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclarations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclarations {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateRequest {
    pub fn new(
        history: &[ConversationTurn],
        tools: &[ToolSignature],
        system_prompt: &str,
        temperature: Option<f32>,
    ) -> Self {
        let declarations: Vec<FunctionDeclaration> = tools
            .iter()
            .map(|tool| FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            })
            .collect();

        Self {
            contents: to_contents(history),
            tools: if declarations.is_empty() {
                Vec::new()
            } else {
                vec![ToolDeclarations {
                    function_declarations: declarations,
                }]
            },
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![WirePart {
                    text: Some(system_prompt.to_string()),
                    ..Default::default()
                }],
            }),
            generation_config: temperature.map(|t| GenerationConfig { temperature: Some(t) }),
        }
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User | Role::Tool => "user",
        Role::Agent => "model",
    }
}

/// Consecutive tool turns collapse into a single content so the responses
/// arrive together, matching the batch of calls they answer.
fn to_contents(history: &[ConversationTurn]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::with_capacity(history.len());
    let mut previous: Option<Role> = None;

    for turn in history {
        let content = to_content(turn);
        let merge = turn.role == Role::Tool && previous == Some(Role::Tool);
        if merge && let Some(last) = contents.last_mut() {
            last.parts.extend(content.parts);
        } else {
            contents.push(content);
        }
        previous = Some(turn.role);
    }
    contents
}

fn to_content(turn: &ConversationTurn) -> Content {
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::ToolCall(request) => WirePart {
                function_call: Some(FunctionCall {
                    name: request.name.clone(),
                    args: request.arguments.clone(),
                }),
                ..Default::default()
            },
            Part::ToolResponse { name, result } => WirePart {
                function_response: Some(FunctionResponse {
                    name: name.clone(),
                    response: result.to_response(),
                }),
                ..Default::default()
            },
        })
        .collect();

    Content {
        role: Some(wire_role(turn.role).to_string()),
        parts,
    }
}

fn from_wire_part(part: WirePart) -> Option<Part> {
    if let Some(call) = part.function_call {
        return Some(Part::ToolCall(ToolRequest {
            name: call.name,
            arguments: call.args,
        }));
    }
    if let Some(response) = part.function_response {
        let result = match response.response.get("error").and_then(Value::as_str) {
            Some(message) => ToolResult::error(message),
            None => ToolResult::ok(
                response
                    .response
                    .get("result")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
        };
        return Some(Part::ToolResponse {
            name: response.name,
            result,
        });
    }
    part.text.filter(|text| !text.is_empty()).map(Part::Text)
}

impl GenerateResponse {
    /// Converts the first candidate into a decision.
    ///
    /// A response without candidates, or a candidate without parts, yields an
    /// empty decision; the loop treats that as a protocol violation.
    pub fn into_decision(self) -> Decision {
        if let Some(reason) = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            tracing::debug!("Gemini finish reason: {}", reason);
        }

        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(from_wire_part).collect())
            .unwrap_or_default();

        let decision = Decision::new(parts);
        match self.usage_metadata {
            Some(usage) => decision.with_usage(TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                response_tokens: usage.candidates_token_count,
            }),
            None => decision,
        }
    }
}

/// Extracts `error.message` from an API error body, falling back to the raw text.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::catalog;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let history = vec![
            ConversationTurn::user("what files are in the root?"),
            ConversationTurn::agent(vec![Part::ToolCall(ToolRequest::new(
                "get_files_info",
                json!({"directory": "."}),
            ))]),
            ConversationTurn::tool("get_files_info", ToolResult::ok("- main.py: file_size=3 bytes, is_dir=false")),
        ];
        let request = GenerateRequest::new(&history, &catalog(), "be helpful", Some(0.0));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "what files are in the root?");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["name"], "get_files_info");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["args"]["directory"], ".");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
            "- main.py: file_size=3 bytes, is_dir=false"
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["temperature"], 0.0);

        let declarations = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        let names: Vec<&str> = declarations.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["get_files_info", "get_file_content", "write_file", "run_python_file"]
        );
    }

    #[test]
    fn test_parallel_calls_answered_in_one_content() {
        let history = vec![
            ConversationTurn::user("read both files"),
            ConversationTurn::agent(vec![
                Part::ToolCall(ToolRequest::new("get_file_content", json!({"file_path": "a.py"}))),
                Part::ToolCall(ToolRequest::new("get_file_content", json!({"file_path": "b.py"}))),
            ]),
            ConversationTurn::tool("get_file_content", ToolResult::ok("A")),
            ConversationTurn::tool("get_file_content", ToolResult::error("missing")),
            ConversationTurn::agent(vec![Part::ToolCall(ToolRequest::new("get_files_info", json!({})))]),
            ConversationTurn::tool("get_files_info", ToolResult::ok("")),
        ];
        let request = GenerateRequest::new(&history, &catalog(), "", None);
        let body = serde_json::to_value(&request).unwrap();
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 5);
        assert_eq!(contents[2]["role"], "user");
        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["response"]["result"], "A");
        assert_eq!(responses[1]["functionResponse"]["response"]["error"], "missing");
        assert_eq!(contents[3]["role"], "model");
        assert_eq!(contents[4]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_optional_sections_omitted() {
        let request = GenerateRequest::new(&[ConversationTurn::user("hi")], &[], "", None);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_function_calls_and_usage() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Let me look around."},
                        {"functionCall": {"name": "get_files_info", "args": {}}},
                        {"functionCall": {"name": "get_file_content", "args": {"file_path": "main.py"}}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 17, "totalTokenCount": 137}
        });
        let response: GenerateResponse = serde_json::from_value(raw).unwrap();
        let decision = response.into_decision();

        assert!(!decision.is_final());
        let requests = decision.turn.tool_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].name, "get_files_info");
        assert_eq!(requests[1].arguments["file_path"], "main.py");
        assert_eq!(decision.turn.text().as_deref(), Some("Let me look around."));
        assert_eq!(
            decision.usage,
            Some(TokenUsage {
                prompt_tokens: 120,
                response_tokens: 17
            })
        );
    }

    #[test]
    fn test_missing_candidates_yield_empty_decision() {
        let response: GenerateResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        let decision = response.into_decision();
        assert!(decision.turn.parts.is_empty());
        assert!(decision.usage.is_none());

        let response: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]})).unwrap();
        assert!(response.into_decision().turn.parts.is_empty());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }
}
