//! Script loading and validation
//!
//! This module handles parsing of assistant and snippet YAML files, discovery
//! of library roots, and the `.devassistant` project marker format.

pub mod library;
pub mod marker;
pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use library::*;
pub use marker::*;
pub use parse::*;
pub use schema::*;
pub use types::*;
