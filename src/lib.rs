//! # Agent Sandbox
//!
//! A bounded tool-using agent whose filesystem and process access is confined
//! to a single root directory.
//!
//! - Domain: configuration, conversation types, the tool catalog
//! - Infrastructure: sandboxed tools and the Gemini decision engine
//! - Application: the agent loop and logging setup

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod strings;
