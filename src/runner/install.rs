//! Dependency installation
//!
//! The `dependencies` command hands its list to a [`DependencyInstaller`]. The
//! default installer maps each kind to a package manager command line.

use crate::runner::{
    dependencies_from_value, run_shell, Command, CommandRunner, Context, Dependency, ShellOptions,
};
use serde_yaml::Value;
use std::sync::{Arc, Mutex};
use tracing::Level;

/// Installs collected dependencies
pub trait DependencyInstaller: Send + Sync {
    fn install(&self, deps: &[Dependency], ctx: &mut Context) -> crate::Result<()>;
}

/// Hand an already resolved list to the registry's installer
///
/// Collection formats every argument once, so the list is not formatted again.
pub fn install_resolved(deps: &[Dependency], ctx: &mut Context) -> crate::Result<()> {
    let registry = Arc::clone(&ctx.registry);
    match registry.installer() {
        Some(installer) => installer.install(deps, ctx),
        None => {
            tracing::warn!("No dependency installer configured, skipping installation");
            Ok(())
        }
    }
}

/// Installs through package manager command lines run in the context's shell
pub struct CommandInstaller;

impl CommandInstaller {
    /// Command prefix for a dependency kind
    pub fn install_command(kind: &str) -> Option<&'static str> {
        match kind {
            "rpm" => Some("dnf install -y"),
            "pip" => Some("pip install --user"),
            "npm" => Some("npm install -g"),
            "gem" => Some("gem install"),
            _ => None,
        }
    }
}

impl DependencyInstaller for CommandInstaller {
    fn install(&self, deps: &[Dependency], ctx: &mut Context) -> crate::Result<()> {
        for dep in deps {
            let packages = dep.packages();
            if packages.is_empty() {
                continue;
            }

            let Some(prefix) = Self::install_command(&dep.kind) else {
                tracing::warn!("Unknown dependency type '{}', skipping", dep.kind);
                continue;
            };

            tracing::info!("Installing {} dependencies: {}", dep.kind, packages.join(", "));
            let line = format!("{} {}", prefix, packages.join(" "));
            run_shell(&line, ctx, ShellOptions::default().with_level(Level::INFO))?;
        }
        Ok(())
    }
}

/// Keeps what it was asked to install without running anything
#[derive(Default)]
pub struct RecordingInstaller {
    installed: Mutex<Vec<Dependency>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed(&self) -> Vec<Dependency> {
        self.installed
            .lock()
            .map(|deps| deps.clone())
            .unwrap_or_default()
    }
}

impl DependencyInstaller for RecordingInstaller {
    fn install(&self, deps: &[Dependency], _ctx: &mut Context) -> crate::Result<()> {
        for dep in deps {
            tracing::info!("Would install {} dependencies: {}", dep.kind, dep.packages().join(", "));
        }
        if let Ok(mut installed) = self.installed.lock() {
            installed.extend_from_slice(deps);
        }
        Ok(())
    }
}

/// Runner for `dependencies`
pub struct DependenciesRunner {
    installer: Arc<dyn DependencyInstaller>,
}

impl DependenciesRunner {
    pub fn new(installer: Arc<dyn DependencyInstaller>) -> Self {
        DependenciesRunner { installer }
    }
}

impl CommandRunner for DependenciesRunner {
    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type.starts_with("dependencies")
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        if command.comm_type != "dependencies" {
            tracing::warn!("Unknown dependencies command '{}', skipping", command.comm_type);
            return Ok(Value::Null);
        }

        let deps = dependencies_from_value(&command.format_value(ctx))?;
        self.installer.install(&deps, ctx)?;
        Ok(Value::Null)
    }
}
