//! # LLM Module
//!
//! The Gemini decision-engine adapter and its retry policy.

pub mod client;
pub mod error;
pub mod gemini;
pub mod retry;

pub use client::GeminiEngine;
pub use error::EngineError;
