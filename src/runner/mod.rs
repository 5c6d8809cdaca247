//! Section interpreter and command dispatch
//!
//! This module walks assistant sections, evaluates the expression language,
//! and dispatches leaf commands to the registered runners.

pub mod call;
pub mod cancel;
pub mod command;
pub mod context;
pub mod deps;
pub mod expr;
pub mod github;
pub mod install;
pub mod interpolate;
pub mod log;
pub mod marker;
pub mod path;
pub mod registry;
pub mod section;
pub mod vars;

// Re-export main types
pub use call::*;
pub use cancel::*;
pub use command::*;
pub use context::*;
pub use deps::*;
pub use expr::*;
pub use github::*;
pub use install::*;
pub use interpolate::*;
pub use log::*;
pub use marker::*;
pub use path::*;
pub use registry::*;
pub use section::{assign_variable, run_command, run_section};
pub use vars::*;
