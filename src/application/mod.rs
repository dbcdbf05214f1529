//! # Application Layer
//!
//! Orchestration: the agent loop that drives a conversation, and logging setup.

pub mod engine;
pub mod logging;

pub use engine::{AbortReason, AgentLoop, LoopEvent, Outcome, RunReport};
