//! Command dispatch
//!
//! Every leaf entry of a section becomes a [`Command`] that is handed to the
//! first registered [`CommandRunner`] whose predicate accepts its type tag.
//! Registration order is priority order.

use crate::config::describe;
use crate::error::{ConfigError, SyntaxError};
use crate::runner::{
    format_str, format_value, render, CallRunner, ClRunner, CommandInstaller, Context,
    DependenciesRunner, DependencyInstaller, GitHubRunner, LogRunner, MarkerRunner,
};
use serde_yaml::Value;
use std::sync::Arc;

/// A leaf entry to execute: its type tag and raw argument
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub comm_type: String,
    pub comm: Value,
}

impl Command {
    pub fn new(comm_type: impl Into<String>, comm: Value) -> Self {
        Command {
            comm_type: comm_type.into(),
            comm,
        }
    }

    /// The argument as a formatted string
    ///
    /// Scalars are rendered; lists and mappings are not valid here.
    pub fn format_str(&self, ctx: &Context) -> crate::Result<String> {
        match &self.comm {
            Value::Sequence(_) | Value::Mapping(_) => Err(SyntaxError::InvalidExpression(format!(
                "'{}' expects a string argument, got {}",
                self.comm_type,
                describe(&self.comm)
            ))
            .into()),
            other => Ok(format_str(&render(other), ctx)),
        }
    }

    /// The argument with every string inside it formatted
    pub fn format_value(&self, ctx: &Context) -> Value {
        format_value(&self.comm, ctx)
    }
}

/// A handler for a family of command type tags
pub trait CommandRunner: Send + Sync {
    /// Short name, used in logs
    fn name(&self) -> &'static str;

    /// Whether this runner handles the command
    fn matches(&self, command: &Command) -> bool;

    /// Execute the command
    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value>;
}

/// Ordered set of command runners, first match wins
#[derive(Default)]
pub struct Registry {
    runners: Vec<Box<dyn CommandRunner>>,
    installer: Option<Arc<dyn DependencyInstaller>>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in runners, installing dependencies with shell commands
    pub fn with_defaults() -> Self {
        Self::with_installer(Arc::new(CommandInstaller))
    }

    /// The built-in runners with a specific dependency installer
    pub fn with_installer(installer: Arc<dyn DependencyInstaller>) -> Self {
        let mut registry = Registry::new();
        registry.installer = Some(Arc::clone(&installer));
        registry
            .register(CallRunner)
            .register(ClRunner)
            .register(DependenciesRunner::new(installer))
            .register(MarkerRunner)
            .register(GitHubRunner)
            .register(LogRunner);
        registry
    }

    /// Add a runner after all existing ones
    pub fn register<R: CommandRunner + 'static>(&mut self, runner: R) -> &mut Self {
        self.runners.push(Box::new(runner));
        self
    }

    /// The runner that would handle `command`
    pub fn resolve(&self, command: &Command) -> Option<&dyn CommandRunner> {
        self.runners
            .iter()
            .find(|r| r.matches(command))
            .map(|r| r.as_ref())
    }

    /// Run `command` with the first matching runner
    pub fn dispatch(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        let runner = self
            .resolve(command)
            .ok_or_else(|| ConfigError::NoRunner(command.comm_type.clone()))?;
        tracing::trace!(runner = runner.name(), command = %command.comm_type, "dispatching");
        runner.run(command, ctx)
    }

    /// Installer behind the `dependencies` runner, if one was configured
    pub fn installer(&self) -> Option<&Arc<dyn DependencyInstaller>> {
        self.installer.as_ref()
    }

    pub fn runner_names(&self) -> Vec<&'static str> {
        self.runners.iter().map(|r| r.name()).collect()
    }
}
