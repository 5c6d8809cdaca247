//! Assistant path driver
//!
//! Runs a selected assistant: collects the dependencies of every assistant on
//! the path, hands them to the installer in one batch, then runs the
//! `run` section of the last assistant with its files pushed.

use crate::config::{Assistant, Library, RUN_SECTION};
use crate::error::{ConfigError, ExecutionError};
use crate::runner::{
    assistant_dependencies, install_resolved, run_section, subassistant_var, text, CancelToken,
    Context, Registry, Vars,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs one assistant path, e.g. `crt python django`
pub struct PathRunner {
    role: String,
    chain: Vec<Arc<Assistant>>,
    library: Arc<Library>,
    registry: Arc<Registry>,
    working_dir: Option<PathBuf>,
    interpreter: Option<Vec<String>>,
    cancel: CancelToken,
}

impl PathRunner {
    pub fn new(
        role: impl Into<String>,
        chain: Vec<Arc<Assistant>>,
        library: Arc<Library>,
        registry: Arc<Registry>,
    ) -> Self {
        PathRunner {
            role: role.into(),
            chain,
            library,
            registry,
            working_dir: None,
            interpreter: None,
            cancel: CancelToken::new(),
        }
    }

    /// Resolve `names` under `role` in the library
    pub fn from_library<S: AsRef<str>>(
        library: Arc<Library>,
        registry: Arc<Registry>,
        role: &str,
        names: &[S],
    ) -> crate::Result<Self> {
        let chain = library.chain(role, names)?;
        Ok(Self::new(role, chain, library, registry))
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    /// Token that stops the run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request the run to stop before its next entry
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The assistant whose `run` section is executed
    pub fn assistant(&self) -> Option<&Arc<Assistant>> {
        self.chain.last()
    }

    /// Variables for the run: the path, argument defaults and a required check
    pub fn prepare_vars(&self, mut vars: Vars) -> crate::Result<Vars> {
        vars.insert(subassistant_var(0), text(self.role.clone()));
        for (i, assistant) in self.chain.iter().enumerate() {
            vars.insert(subassistant_var(i + 1), text(assistant.name.clone()));
        }

        for assistant in &self.chain {
            for (name, arg) in &assistant.args {
                if vars.contains_key(name) {
                    continue;
                }
                match &arg.default {
                    Some(default) => {
                        vars.insert(name.clone(), default.clone());
                    }
                    None if arg.required => {
                        return Err(ExecutionError::MissingArgument(name.clone()).into())
                    }
                    None => {}
                }
            }
        }

        Ok(vars)
    }

    /// Run the path and return the final context
    pub fn run(&self, vars: Vars) -> crate::Result<Context> {
        let assistant = self
            .assistant()
            .cloned()
            .ok_or_else(|| ConfigError::AssistantNotFound(self.role.clone()))?;

        let mut ctx = Context::new()
            .with_vars(self.prepare_vars(vars)?)
            .with_assistant(Arc::clone(&assistant))
            .with_library(Arc::clone(&self.library))
            .with_registry(Arc::clone(&self.registry))
            .with_cancel_token(self.cancel.clone());
        if let Some(dir) = &self.working_dir {
            ctx = ctx.with_working_dir(dir.clone());
        }
        if let Some(interpreter) = &self.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        tracing::info!("Resolving dependencies...");
        let mut deps = Vec::new();
        for member in &self.chain {
            deps.extend(assistant_dependencies(member, &ctx)?);
        }
        if self.cancel.is_cancelled() {
            return Ok(ctx);
        }
        install_resolved(&deps, &mut ctx)?;

        match assistant.section(RUN_SECTION) {
            Some(section) => {
                tracing::info!("Running {}...", assistant.fullname);
                let mut with_files =
                    ctx.push_files(assistant.files.clone(), assistant.files_dir.clone());
                run_section(section, &mut with_files)?;
            }
            None => tracing::debug!("{} has no run section", assistant.name),
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_assistant, CREATOR_ROLE};
    use crate::runner::{Dependency, RecordingInstaller};
    use crate::DevassistError;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn library() -> Arc<Library> {
        let mut library = Library::new();
        let python = parse_assistant(
            r#"
args:
  name:
    flags: [-n, --name]
    required: true
  version:
    flags: [--version]
    default: "3"
dependencies:
  - rpm: [python$version]
run:
  - cl: echo $name > name.txt
"#,
            "python",
        )
        .unwrap();
        let flask = parse_assistant(
            r#"
args:
  docs:
    flags: [--docs]
dependencies_docs:
  - pip: [sphinx]
run:
  - cl: echo $subassistant_2 > chain.txt
"#,
            "flask",
        )
        .unwrap();
        library.add_assistant(CREATOR_ROLE, &[], python).unwrap();
        library.add_assistant(CREATOR_ROLE, &["python"], flask).unwrap();
        Arc::new(library)
    }

    fn runner(names: &[&str], installer: Arc<RecordingInstaller>) -> PathRunner {
        let registry = Arc::new(Registry::with_installer(installer));
        PathRunner::from_library(library(), registry, CREATOR_ROLE, names).unwrap()
    }

    #[test]
    fn test_prepare_vars() {
        let runner = runner(&["python"], Arc::new(RecordingInstaller::new()));
        let mut vars = Vars::new();
        vars.insert("name".to_string(), text("blog"));

        let vars = runner.prepare_vars(vars).unwrap();
        assert_eq!(vars.get("subassistant_0"), Some(&text("crt")));
        assert_eq!(vars.get("subassistant_1"), Some(&text("python")));
        assert_eq!(vars.get("version"), Some(&text("3")));
    }

    #[test]
    fn test_missing_required_argument() {
        let runner = runner(&["python"], Arc::new(RecordingInstaller::new()));
        assert!(matches!(
            runner.prepare_vars(Vars::new()),
            Err(DevassistError::Execution(ExecutionError::MissingArgument(name))) if name == "name"
        ));
    }

    #[test]
    fn test_run_installs_chain_dependencies_then_runs_last() {
        let temp_dir = TempDir::new().unwrap();
        let installer = Arc::new(RecordingInstaller::new());
        let runner = runner(&["python", "flask"], installer.clone())
            .with_working_dir(temp_dir.path().to_path_buf());

        let mut vars = Vars::new();
        vars.insert("name".to_string(), text("blog"));
        vars.insert("docs".to_string(), Value::Bool(true));
        runner.run(vars).unwrap();

        assert_eq!(
            installer.installed(),
            vec![
                Dependency::new("rpm", Value::Sequence(vec![text("python3")])),
                Dependency::new("pip", Value::Sequence(vec![text("sphinx")])),
            ]
        );
        let chain = std::fs::read_to_string(temp_dir.path().join("chain.txt")).unwrap();
        assert_eq!(chain.trim(), "flask");
        assert!(!temp_dir.path().join("name.txt").exists());
    }

    #[test]
    fn test_dependency_arguments_are_substituted_once() {
        let temp_dir = TempDir::new().unwrap();
        let installer = Arc::new(RecordingInstaller::new());
        let runner = runner(&["python"], installer.clone())
            .with_working_dir(temp_dir.path().to_path_buf());

        let mut vars = Vars::new();
        vars.insert("name".to_string(), text("blog"));
        vars.insert("version".to_string(), text("$other"));
        vars.insert("other".to_string(), text("INJECTED"));
        runner.run(vars).unwrap();

        assert_eq!(
            installer.installed(),
            vec![Dependency::new(
                "rpm",
                Value::Sequence(vec![text("python$other")])
            )]
        );
    }

    #[test]
    fn test_run_uses_configured_interpreter() {
        let temp_dir = TempDir::new().unwrap();
        let runner = runner(&["python"], Arc::new(RecordingInstaller::new()))
            .with_working_dir(temp_dir.path().to_path_buf())
            .with_interpreter(vec!["/nonexistent/sh".to_string(), "-c".to_string()]);

        let mut vars = Vars::new();
        vars.insert("name".to_string(), text("blog"));
        let result = runner.run(vars);

        assert!(matches!(
            result,
            Err(DevassistError::Execution(ExecutionError::CommandFailed { code: None, .. }))
        ));
        assert!(!temp_dir.path().join("name.txt").exists());
    }

    #[test]
    fn test_stopped_runner_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let installer = Arc::new(RecordingInstaller::new());
        let runner = runner(&["python"], installer.clone())
            .with_working_dir(temp_dir.path().to_path_buf());
        runner.stop();

        let mut vars = Vars::new();
        vars.insert("name".to_string(), text("blog"));
        runner.run(vars).unwrap();

        assert!(installer.installed().is_empty());
        assert!(!temp_dir.path().join("name.txt").exists());
    }

    #[test]
    fn test_unknown_path() {
        let registry = Arc::new(Registry::with_defaults());
        let result = PathRunner::from_library(library(), registry, CREATOR_ROLE, &["ruby"]);
        assert!(matches!(
            result,
            Err(DevassistError::Config(ConfigError::AssistantNotFound(_)))
        ));
    }
}
