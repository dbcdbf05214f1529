//! # Strings Module
//!
//! Centralizes user-facing strings and prompts.

pub mod messages;
pub mod prompts;
