//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Every section has defaults, so an absent file yields a usable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub agent_loop: LoopConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `path`.
    ///
    /// When `required` is false a missing file falls back to defaults; an
    /// explicitly requested file must exist.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() && !required {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Settings for the decision engine (the LLM).
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    /// Overrides the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            system_prompt: None,
            temperature: None,
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay(),
        }
    }
}

/// Confinement settings shared by every tool.
#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
    /// Resolve symlinks in the existing part of a path before the prefix check.
    #[serde(default)]
    pub harden_symlinks: bool,
    /// Annotate written files with creation/modification comments.
    #[serde(default)]
    pub write_attribution: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_file_chars: default_max_file_chars(),
            harden_symlinks: false,
            write_attribution: false,
        }
    }
}

/// Script execution settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ProcessConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Allow-list of script extensions, including the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            extensions: default_extensions(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoopConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash-001".to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".to_string())
}
fn default_max_retries() -> usize {
    3
}
fn default_retry_base_delay() -> u64 {
    2
}
fn default_root() -> String {
    "./calculator".to_string()
}
fn default_max_file_chars() -> usize {
    10_000
}
fn default_interpreter() -> String {
    "python3".to_string()
}
fn default_extensions() -> Vec<String> {
    vec![".py".to_string()]
}
fn default_timeout() -> u64 {
    30
}
fn default_max_rounds() -> usize {
    20
}
fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.agent.model, "gemini-2.0-flash-001");
        assert_eq!(config.sandbox.max_file_chars, 10_000);
        assert_eq!(config.process.timeout_secs, 30);
        assert_eq!(config.process.extensions, vec![".py".to_string()]);
        assert_eq!(config.agent_loop.max_rounds, 20);
        assert!(!config.sandbox.harden_symlinks);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml = r#"
sandbox:
  root: /srv/work
  write_attribution: true
process:
  interpreter: python3.12
agent_loop:
  max_rounds: 5
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sandbox.root, "/srv/work");
        assert!(config.sandbox.write_attribution);
        assert_eq!(config.sandbox.max_file_chars, 10_000);
        assert_eq!(config.process.interpreter, "python3.12");
        assert_eq!(config.process.timeout_secs, 30);
        assert_eq!(config.agent_loop.max_rounds, 5);
        assert_eq!(config.agent.api_key_env.as_deref(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.yaml"), false).unwrap();
        assert_eq!(config.agent.provider, "gemini");
        assert!(AppConfig::load(&dir.path().join("absent.yaml"), true).is_err());
    }
}
