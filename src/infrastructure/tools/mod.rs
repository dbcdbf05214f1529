//! # Tools Module
//!
//! Sandboxed tool execution: path confinement, file operations and script runs,
//! reached through the [`dispatcher::ToolDispatcher`].

pub mod attribution;
pub mod dispatcher;
pub mod files;
pub mod path_guard;
pub mod process;

pub use dispatcher::ToolDispatcher;
pub use path_guard::{PathGuard, PathRejected, RootError};
pub use process::ProcessRunner;
