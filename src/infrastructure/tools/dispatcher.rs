//! # Tool Dispatcher
//!
//! Maps a requested tool name onto one of the sandboxed operations and wraps the
//! outcome in a tool-role turn. The confinement root always comes from the
//! dispatcher itself; arguments supplied by the agent cannot replace it.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::catalog::ToolKind;
use crate::domain::config::AppConfig;
use crate::domain::types::{ConversationTurn, ToolRequest, ToolResult};
use crate::infrastructure::tools::files;
use crate::infrastructure::tools::path_guard::{PathGuard, RootError};
use crate::infrastructure::tools::process::ProcessRunner;
use crate::strings::messages;

/// Argument name under which a caller might try to smuggle its own root.
const ROOT_ARGUMENT: &str = "working_directory";

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    file_path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RunArgs {
    file_path: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    guard: PathGuard,
    runner: ProcessRunner,
    max_file_chars: usize,
    write_attribution: bool,
    verbose: bool,
}

impl ToolDispatcher {
    pub fn new(guard: PathGuard, runner: ProcessRunner, max_file_chars: usize) -> Self {
        Self {
            guard,
            runner,
            max_file_chars,
            write_attribution: false,
            verbose: false,
        }
    }

    /// Builds the dispatcher from configuration, canonicalizing the root.
    pub fn from_config(config: &AppConfig) -> Result<Self, RootError> {
        let guard = PathGuard::new(&config.sandbox.root)?
            .with_symlink_hardening(config.sandbox.harden_symlinks);
        Ok(Self::new(
            guard,
            ProcessRunner::from_config(&config.process),
            config.sandbox.max_file_chars,
        )
        .with_write_attribution(config.sandbox.write_attribution))
    }

    pub fn with_write_attribution(mut self, enabled: bool) -> Self {
        self.write_attribution = enabled;
        self
    }

    /// Include full arguments in the audit line.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Executes one request and returns its tool-role turn.
    ///
    /// Every failure, unknown tools included, is reported inside the envelope.
    pub async fn dispatch(&self, request: &ToolRequest) -> ConversationTurn {
        if self.verbose {
            let args = Value::Object(request.arguments.clone());
            tracing::info!(tool = %request.name, args = %args, "Calling function");
        } else {
            tracing::info!(tool = %request.name, "Calling function");
        }

        let result = match ToolKind::from_name(&request.name) {
            Some(kind) => match self.invoke(kind, &request.arguments).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(messages::invalid_arguments(kind.name(), &e.to_string())),
            },
            None => {
                tracing::warn!("Agent requested unknown tool {}", request.name);
                ToolResult::error(messages::unknown_tool(&request.name))
            }
        };

        if let ToolResult::Error(message) = &result {
            tracing::debug!(tool = %request.name, "Tool reported error: {}", message);
        }

        ConversationTurn::tool(&request.name, result)
    }

    async fn invoke(&self, kind: ToolKind, arguments: &Map<String, Value>) -> Result<ToolResult, serde_json::Error> {
        if arguments.contains_key(ROOT_ARGUMENT) {
            tracing::warn!(tool = kind.name(), "Ignoring caller-supplied {}", ROOT_ARGUMENT);
        }

        let result = match kind {
            ToolKind::GetFilesInfo => {
                let args: ListArgs = parse(arguments)?;
                let directory = args.directory.as_deref().unwrap_or(".");
                files::list_directory(&self.guard, directory).await
            }
            ToolKind::GetFileContent => {
                let args: ReadArgs = parse(arguments)?;
                files::read_file(&self.guard, &args.file_path, self.max_file_chars).await
            }
            ToolKind::WriteFile => {
                let args: WriteArgs = parse(arguments)?;
                files::write_file(&self.guard, &args.file_path, &args.content, self.write_attribution)
                    .await
            }
            ToolKind::RunPythonFile => {
                let args: RunArgs = parse(arguments)?;
                self.runner.run(&self.guard, &args.file_path, &args.args).await
            }
        };
        Ok(result)
    }
}

fn parse<T: DeserializeOwned>(arguments: &Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(arguments.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn dispatcher() -> (TempDir, ToolDispatcher) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("root")).unwrap();
        let guard = PathGuard::new(dir.path().join("root")).unwrap();
        let runner = ProcessRunner::new("sh", vec![".sh".to_string()], Duration::from_secs(5));
        (dir, ToolDispatcher::new(guard, runner, 100))
    }

    fn result_of(turn: &ConversationTurn) -> ToolResult {
        assert_eq!(turn.role, Role::Tool);
        turn.tool_response().expect("tool turn carries a response").1.clone()
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let (_dir, dispatcher) = dispatcher();
        let turn = dispatcher
            .dispatch(&ToolRequest::new("rm_rf", json!({"path": "/"})))
            .await;
        assert_eq!(turn.tool_response().unwrap().0, "rm_rf");
        assert_eq!(result_of(&turn), ToolResult::error("Unknown function: rm_rf"));
    }

    #[tokio::test]
    async fn test_caller_cannot_override_root() {
        let (dir, dispatcher) = dispatcher();
        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir(&elsewhere).unwrap();

        let request = ToolRequest::new(
            "write_file",
            json!({
                "working_directory": elsewhere.to_str().unwrap(),
                "file_path": "out.txt",
                "content": "hi"
            }),
        );
        let turn = dispatcher.dispatch(&request).await;
        assert!(!result_of(&turn).is_error());
        assert!(dispatcher.guard().root().join("out.txt").is_file());
        assert!(!elsewhere.join("out.txt").exists());
    }

    #[tokio::test]
    async fn test_verbose_audit_does_not_change_result() {
        let (_dir, dispatcher) = dispatcher();
        let dispatcher = dispatcher.with_verbose(true);
        let turn = dispatcher
            .dispatch(&ToolRequest::new(
                "write_file",
                json!({"file_path": "log.txt", "content": "abc"}),
            ))
            .await;
        assert_eq!(
            result_of(&turn),
            ToolResult::ok(messages::write_succeeded("log.txt", 3))
        );
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let (_dir, dispatcher) = dispatcher();
        let turn = dispatcher
            .dispatch(&ToolRequest::new("get_file_content", json!({})))
            .await;
        let result = result_of(&turn);
        assert!(result.is_error());
        assert!(result.text().starts_with("Invalid arguments for get_file_content"));
    }

    #[tokio::test]
    async fn test_listing_defaults_to_root() {
        let (_dir, dispatcher) = dispatcher();
        fs::write(dispatcher.guard().root().join("main.py"), "abc").unwrap();

        let turn = dispatcher
            .dispatch(&ToolRequest::new("get_files_info", json!({})))
            .await;
        assert_eq!(
            result_of(&turn),
            ToolResult::ok("- main.py: file_size=3 bytes, is_dir=false")
        );
    }

    #[tokio::test]
    async fn test_read_is_capped() {
        let (_dir, dispatcher) = dispatcher();
        fs::write(dispatcher.guard().root().join("long.txt"), "x".repeat(500)).unwrap();

        let turn = dispatcher
            .dispatch(&ToolRequest::new("get_file_content", json!({"file_path": "long.txt"})))
            .await;
        assert_eq!(result_of(&turn), ToolResult::ok("x".repeat(100)));
    }

    #[tokio::test]
    async fn test_run_passes_arguments() {
        let (_dir, dispatcher) = dispatcher();
        fs::write(dispatcher.guard().root().join("sum.sh"), "echo $(($1 + $2))\n").unwrap();

        let turn = dispatcher
            .dispatch(&ToolRequest::new(
                "run_python_file",
                json!({"file_path": "sum.sh", "args": ["3", "5"]}),
            ))
            .await;
        assert_eq!(result_of(&turn), ToolResult::ok("STDOUT:\n8\n"));
    }

    #[tokio::test]
    async fn test_containment_errors_flow_back() {
        let (_dir, dispatcher) = dispatcher();
        let turn = dispatcher
            .dispatch(&ToolRequest::new("get_files_info", json!({"directory": "../"})))
            .await;
        assert_eq!(
            result_of(&turn),
            ToolResult::error(messages::outside_root("list", "../"))
        );
    }
}
