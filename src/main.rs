//! # Main Entry Point
//!
//! Parses the command line, loads configuration, wires the tool dispatcher and
//! decision engine into an agent loop, and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use agent_sandbox::application::engine::{AgentLoop, LoopEvent, Outcome};
use agent_sandbox::application::logging::init_logging;
use agent_sandbox::domain::catalog::catalog;
use agent_sandbox::domain::config::{AppConfig, DEFAULT_CONFIG_PATH};
use agent_sandbox::domain::types::ToolResult;
use agent_sandbox::infrastructure::llm::GeminiEngine;
use agent_sandbox::infrastructure::tools::ToolDispatcher;
use agent_sandbox::strings::prompts;

const RESULT_PREVIEW_CHARS: usize = 100;
const THINKING_PREVIEW_CHARS: usize = 150;

#[derive(Debug, Parser)]
#[command(name = "agent-sandbox", version, about = "Run a sandboxed coding agent on a single request")]
struct Cli {
    /// The request for the agent
    prompt: String,

    /// Print rounds, token usage and tool results
    #[arg(long)]
    verbose: bool,

    /// Configuration file (defaults to data/config.yaml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory the agent is confined to
    #[arg(long)]
    root: Option<String>,

    /// Maximum decision rounds before giving up
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1. Configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = AppConfig::load(&config_path, cli.config.is_some())?;
    if let Some(root) = &cli.root {
        config.sandbox.root = root.clone();
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.agent_loop.max_rounds = max_rounds;
    }
    if let Some(model) = &cli.model {
        config.agent.model = model.clone();
    }

    // 2. Logging
    let _guard = init_logging(&config.logging, cli.verbose)?;
    tracing::info!("Starting agent-sandbox...");

    // 3. Tools, confined to a root canonicalized once here
    let dispatcher = ToolDispatcher::from_config(&config)
        .with_context(|| format!("Invalid confinement root '{}'", config.sandbox.root))?
        .with_verbose(cli.verbose);
    tracing::info!("Confinement root: {}", dispatcher.guard().root().display());

    // 4. Decision engine
    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| prompts::system_prompt(&catalog()));
    let engine = GeminiEngine::from_config(&config.agent, system_prompt)
        .context("Failed to initialise decision engine")?;
    tracing::info!("Using model {}", engine.model());

    let mut agent = AgentLoop::new(Arc::new(engine), dispatcher).with_max_rounds(config.agent_loop.max_rounds);

    let printer = if cli.verbose {
        println!("User prompt: {}", cli.prompt);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        agent = agent.with_events(tx);
        Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if event == LoopEvent::Finished {
                    break;
                }
                print_event(&event);
            }
        }))
    } else {
        None
    };

    // 5. Run
    let report = agent.run(&cli.prompt).await;
    drop(agent);
    if let Some(printer) = printer {
        printer.await.context("Event printer panicked")?;
    }

    match report.outcome {
        Outcome::Completed { answer } => {
            println!("Final response:\n{}", answer);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Aborted { reason } => {
            eprintln!("{}", reason);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_event(event: &LoopEvent) {
    match event {
        LoopEvent::RoundStarted { round } => println!("--- Round {} ---", round),
        LoopEvent::Usage {
            prompt_tokens,
            response_tokens,
        } => {
            println!("Prompt tokens: {}", prompt_tokens);
            println!("Response tokens: {}", response_tokens);
        }
        LoopEvent::Thinking { text } => println!("Thinking: {}", preview(text, THINKING_PREVIEW_CHARS)),
        LoopEvent::ToolsRequested { names } => println!("Calling: {}", names.join(", ")),
        LoopEvent::ToolFinished { name, result } => match result {
            ToolResult::Ok(payload) => println!("-> {}: {}", name, preview(payload, RESULT_PREVIEW_CHARS)),
            ToolResult::Error(message) => {
                println!("-> {} failed: {}", name, preview(message, RESULT_PREVIEW_CHARS))
            }
        },
        LoopEvent::Finished => {}
    }
}

/// First `max` characters on one line, with an ellipsis when cut.
fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
