//! Execution context for section running
//!
//! The context carries everything one script run shares: the variable store,
//! the scope label stack, the files accumulators, the current assistant and the
//! process-wide library and command registry. It is passed explicitly through
//! every interpreter and runner call.

use crate::config::{Assistant, Library, DEPENDENCIES_SECTION, RUN_SECTION};
use crate::runner::{CancelToken, Registry, Vars};
use serde_yaml::Value;
use std::env;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which kind of section is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Commands are executed
    Run,
    /// Dependency declarations are collected
    Dependencies,
}

impl SectionKind {
    /// Section called when a `call` names no section, e.g. `call: self`
    pub fn default_section(self) -> &'static str {
        match self {
            SectionKind::Run => RUN_SECTION,
            SectionKind::Dependencies => DEPENDENCIES_SECTION,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_section())
    }
}

/// Execution context that tracks state during a run
pub struct Context {
    /// Variables (from arguments, assignments, loop control variables)
    pub vars: Vars,

    /// Current working directory for shell commands
    pub working_dir: PathBuf,

    /// Shell interpreter (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Kind of section being evaluated
    pub section_kind: SectionKind,

    /// Assistant whose sections `self.*` calls resolve against
    pub assistant: Arc<Assistant>,

    /// Snippets and assistants available to `call` and marker commands
    pub library: Arc<Library>,

    /// Command runners for leaf entries
    pub registry: Arc<Registry>,

    /// Cancellation flag observed before every entry
    pub cancel: CancelToken,

    /// Stack of calls being executed
    pub call_stack: Vec<String>,

    scls: Vec<Vec<String>>,
    files: Vec<Value>,
    files_dirs: Vec<PathBuf>,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            vars: Vars::new(),
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            section_kind: SectionKind::Run,
            assistant: Arc::new(Assistant::default()),
            library: Arc::new(Library::new()),
            registry: Arc::new(Registry::with_defaults()),
            cancel: CancelToken::new(),
            call_stack: Vec::new(),
            scls: Vec::new(),
            files: Vec::new(),
            files_dirs: Vec::new(),
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set variables
    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.vars = vars;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_assistant(mut self, assistant: Arc<Assistant>) -> Self {
        self.assistant = assistant;
        self
    }

    pub fn with_library(mut self, library: Arc<Library>) -> Self {
        self.library = library;
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key.into(), value);
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Copy of this context for a called section
    ///
    /// Variables and stacks are copied, so the callee's assignments are not
    /// visible to the caller; the cancel token and shared handles are the same.
    pub fn fork(&self, kind: SectionKind) -> Context {
        Context {
            vars: self.vars.clone(),
            working_dir: self.working_dir.clone(),
            interpreter: self.interpreter.clone(),
            section_kind: kind,
            assistant: Arc::clone(&self.assistant),
            library: Arc::clone(&self.library),
            registry: Arc::clone(&self.registry),
            cancel: self.cancel.clone(),
            call_stack: self.call_stack.clone(),
            scls: self.scls.clone(),
            files: self.files.clone(),
            files_dirs: self.files_dirs.clone(),
        }
    }

    /// Push a group of scope labels; popped when the guard drops
    pub fn push_scls(&mut self, labels: Vec<String>) -> SclGuard<'_> {
        self.scls.push(labels);
        SclGuard { ctx: self }
    }

    /// Active scope label groups, outermost first
    pub fn scls(&self) -> &[Vec<String>] {
        &self.scls
    }

    /// All active scope labels flattened into one list
    pub fn flat_scls(&self) -> Vec<String> {
        self.scls.iter().flatten().cloned().collect()
    }

    /// Push a files section and its directory; popped when the guard drops
    pub fn push_files(&mut self, files: Value, dir: PathBuf) -> FilesGuard<'_> {
        self.files.push(files);
        self.files_dirs.push(dir);
        FilesGuard { ctx: self }
    }

    /// Innermost files section and the directory it is relative to
    pub fn current_files(&self) -> Option<(&Value, &Path)> {
        match (self.files.last(), self.files_dirs.last()) {
            (Some(files), Some(dir)) => Some((files, dir.as_path())),
            _ => None,
        }
    }

    pub fn files_depth(&self) -> usize {
        self.files.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope label group pushed for the lifetime of the guard
pub struct SclGuard<'a> {
    ctx: &'a mut Context,
}

impl Deref for SclGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for SclGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for SclGuard<'_> {
    fn drop(&mut self) {
        self.ctx.scls.pop();
    }
}

/// Files section pushed for the lifetime of the guard
pub struct FilesGuard<'a> {
    ctx: &'a mut Context,
}

impl Deref for FilesGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for FilesGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for FilesGuard<'_> {
    fn drop(&mut self) {
        self.ctx.files.pop();
        self.ctx.files_dirs.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::text;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.interpreter, vec!["sh", "-c"]);
        assert_eq!(ctx.section_kind, SectionKind::Run);
        assert!(ctx.vars.is_empty());
        assert!(ctx.scls().is_empty());
        assert!(ctx.current_files().is_none());
    }

    #[test]
    fn test_context_set_var() {
        let mut ctx = Context::new();
        ctx.set_var("test", text("value"));
        assert_eq!(ctx.get_var("test"), Some(&text("value")));
    }

    #[test]
    fn test_scl_guard_pops_on_drop() {
        let mut ctx = Context::new();
        {
            let mut outer = ctx.push_scls(vec!["enable".to_string(), "python33".to_string()]);
            {
                let inner = outer.push_scls(vec!["enable".to_string(), "pg".to_string()]);
                assert_eq!(inner.scls().len(), 2);
                assert_eq!(inner.flat_scls(), vec!["enable", "python33", "enable", "pg"]);
            }
            assert_eq!(outer.scls().len(), 1);
        }
        assert!(ctx.scls().is_empty());
    }

    #[test]
    fn test_files_guard_pops_on_drop() {
        let mut ctx = Context::new();
        {
            let guard = ctx.push_files(Value::Null, PathBuf::from("/tmp/files"));
            assert_eq!(guard.files_depth(), 1);
            assert_eq!(guard.current_files().unwrap().1, Path::new("/tmp/files"));
        }
        assert_eq!(ctx.files_depth(), 0);
    }

    #[test]
    fn test_fork_copies_vars_but_shares_cancel() {
        let mut ctx = Context::new();
        ctx.set_var("a", text("1"));

        let mut forked = ctx.fork(SectionKind::Dependencies);
        forked.set_var("b", text("2"));
        assert_eq!(forked.section_kind, SectionKind::Dependencies);
        assert!(ctx.get_var("b").is_none());

        forked.cancel.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
