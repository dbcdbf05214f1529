//! # Tool Catalog
//!
//! The fixed set of operations the decision engine may request, and the
//! signatures it is told about. Adding a variant forces every `match` over
//! `ToolKind` (dispatch included) to handle it.

use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetFilesInfo,
    GetFileContent,
    WriteFile,
    RunPythonFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GetFilesInfo,
        ToolKind::GetFileContent,
        ToolKind::WriteFile,
        ToolKind::RunPythonFile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::GetFilesInfo => "get_files_info",
            ToolKind::GetFileContent => "get_file_content",
            ToolKind::WriteFile => "write_file",
            ToolKind::RunPythonFile => "run_python_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::GetFilesInfo => {
                "Lists files in the specified directory along with their sizes, constrained to the working directory."
            }
            ToolKind::GetFileContent => {
                "Reads the content of a file within the working directory, with content length limiting for AI processing."
            }
            ToolKind::WriteFile => {
                "Writes content to a file within the working directory, creating parent directories if needed."
            }
            ToolKind::RunPythonFile => {
                "Executes a Python file within the working directory with optional command line arguments."
            }
        }
    }

    /// JSON schema of the arguments. The confinement root is never part of it.
    pub fn parameters(&self) -> Value {
        match self {
            ToolKind::GetFilesInfo => json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                    }
                }
            }),
            ToolKind::GetFileContent => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The relative path to the file to read within the working directory."
                    }
                },
                "required": ["file_path"]
            }),
            ToolKind::WriteFile => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The relative path to the file to write within the working directory."
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file."
                    }
                },
                "required": ["file_path", "content"]
            }),
            ToolKind::RunPythonFile => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The relative path to the Python file to execute within the working directory."
                    },
                    "args": {
                        "type": "array",
                        "description": "Optional command line arguments to pass to the Python script.",
                        "items": { "type": "string" }
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    pub fn signature(&self) -> ToolSignature {
        ToolSignature {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// What the decision engine is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSignature {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The static four-entry catalog.
pub fn catalog() -> Vec<ToolSignature> {
    ToolKind::ALL.iter().map(ToolKind::signature).collect()
}
