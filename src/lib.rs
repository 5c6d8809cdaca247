//! devassist - a YAML-driven assistant interpreter
//!
//! Assistants are YAML scripts that scaffold, prepare and modify projects.
//! This crate loads them from a library, walks their sections (assignments,
//! conditions, loops, scoped blocks) and dispatches leaf commands to pluggable
//! runners for shell execution, dependency installation and logging.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{DevassistError, Result};

/// Current version of devassist
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
