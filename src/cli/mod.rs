//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, logging setup and shell
//! completion generation.

pub mod app;

// Re-export main types
pub use app::*;
