//! # Gemini Engine
//!
//! [`DecisionEngine`] backed by the Gemini `generateContent` REST endpoint with
//! function calling. Transient failures are retried through [`RetryPolicy`].

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::catalog::ToolSignature;
use crate::domain::config::AgentConfig;
use crate::domain::traits::DecisionEngine;
use crate::domain::types::{ConversationTurn, Decision};
use crate::infrastructure::llm::error::EngineError;
use crate::infrastructure::llm::gemini::{GenerateRequest, GenerateResponse, api_error_message};
use crate::infrastructure::llm::retry::RetryPolicy;

const PROVIDER: &str = "gemini";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct GeminiEngine {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    system_prompt: String,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

impl GeminiEngine {
    /// Builds the engine from the agent section of the configuration.
    pub fn from_config(config: &AgentConfig, system_prompt: impl Into<String>) -> Result<Self, EngineError> {
        if !config.provider.eq_ignore_ascii_case(PROVIDER) {
            return Err(EngineError::Config(format!(
                "unsupported provider '{}' (only '{}' is available)",
                config.provider, PROVIDER
            )));
        }

        let api_key = resolve_api_key(config)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: config.model.clone(),
            api_key,
            system_prompt: system_prompt.into(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn send_once(&self, request: &GenerateRequest) -> Result<GenerateResponse, EngineError> {
        let response = self
            .http
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DecisionEngine for GeminiEngine {
    async fn decide(&self, history: &[ConversationTurn], tools: &[ToolSignature]) -> anyhow::Result<Decision> {
        let request = GenerateRequest::new(history, tools, &self.system_prompt, self.temperature);
        tracing::debug!(model = %self.model, turns = history.len(), "Sending generateContent request");

        let response = self.retry.execute(|| self.send_once(&request), PROVIDER).await?;
        Ok(response.into_decision())
    }
}

fn resolve_api_key(config: &AgentConfig) -> Result<String, EngineError> {
    if let Some(key) = config.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.clone());
    }
    let Some(var) = config.api_key_env.as_deref() else {
        return Err(EngineError::Config("no api_key or api_key_env configured".to_string()));
    };
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(EngineError::Config(format!(
            "API key not found: set {} or agent.api_key",
            var
        ))),
    }
}
