//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the filesystem, child processes
//! and the decision-engine API. Implements the traits defined in the Domain layer.

pub mod llm;
pub mod tools;
