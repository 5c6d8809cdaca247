//! Error types for devassist

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for devassist operations
pub type Result<T> = std::result::Result<T, DevassistError>;

/// Main error type for devassist
#[derive(Error, Debug)]
pub enum DevassistError {
    /// Library and script loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed script constructs
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// Failures raised while running a section
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Library discovery and script loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No assistant library found (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load script '{path}': {error}")]
    InvalidScript { path: PathBuf, error: String },

    #[error("Assistant '{0}' is not defined")]
    AssistantNotFound(String),

    #[error("Argument flag '{0}' is declared more than once")]
    DuplicateFlag(String),

    #[error("No command runner matches '{0}'")]
    NoRunner(String),
}

/// Malformed expressions, variable references and block headers
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("Not a valid expression: {0}")]
    InvalidExpression(String),

    #[error("Not a proper variable name: {0}")]
    InvalidVariable(String),

    #[error("Max two variables allowed on left side: {0}")]
    TooManyVariables(String),

    #[error("For loop call must be in form 'for $var in expression', got: {0}")]
    InvalidFor(String),

    #[error("Can't expand {0} to two control variables")]
    NotAMapping(String),

    #[error("Invalid section: {0}")]
    InvalidSection(String),
}

/// Failures while executing commands
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{command}' failed with exit code {code:?}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{0}")]
    Logged(String),

    #[error("Couldn't find properly formatted .devassistant file: {0}")]
    MarkerFile(String),

    #[error("Argument '{0}' is required but not provided")]
    MissingArgument(String),

    #[error("Call depth limit exceeded: {0}")]
    RecursionLimit(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for syntax checks
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Output captured by a failed shell command, if the error carries any
pub fn command_output(err: &DevassistError) -> Option<&str> {
    match err {
        DevassistError::Execution(ExecutionError::CommandFailed { output, .. }) => Some(output),
        _ => None,
    }
}
