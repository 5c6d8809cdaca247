//! `call` resolution
//!
//! `self.X` names section `X` of the running assistant and `name.X` section `X`
//! of snippet `name`. Without a section part the default section of the
//! current kind is used (`run` or `dependencies`). The callee runs on a copy of
//! the caller's context; a snippet's files are pushed for the duration.

use crate::config::Section;
use crate::error::ExecutionError;
use crate::runner::{
    dependencies_section, dependencies_to_value, run_section, Command, CommandRunner, Context,
    Dependency, SectionKind,
};
use serde_yaml::Value;
use std::path::PathBuf;

/// Maximum nesting of calls before a run is aborted
pub const MAX_CALL_DEPTH: usize = 64;

/// A resolved call target
struct Callee {
    section: Section,
    files: Option<(Value, PathBuf)>,
}

fn resolve(target: &str, kind: SectionKind, ctx: &Context) -> Option<Callee> {
    let (script, name) = match target.split_once('.') {
        Some((script, name)) => (script, name),
        None => (target, kind.default_section()),
    };

    if script == "self" {
        return ctx.assistant.section(name).map(|section| Callee {
            section: section.clone(),
            files: None,
        });
    }

    let snippet = ctx.library.snippet(script)?;
    snippet.section(name).map(|section| Callee {
        section: section.clone(),
        files: Some((snippet.files.clone(), snippet.files_dir.clone())),
    })
}

/// Copy of the context for a callee, with the call recorded on the stack
fn enter(target: &str, kind: SectionKind, ctx: &Context) -> crate::Result<Context> {
    if ctx.call_stack.len() >= MAX_CALL_DEPTH {
        let mut chain = ctx.call_stack.clone();
        chain.push(target.to_string());
        return Err(ExecutionError::RecursionLimit(chain.join(" -> ")).into());
    }

    let mut callee = ctx.fork(kind);
    callee.call_stack.push(target.to_string());
    Ok(callee)
}

/// Run the section a call names
pub fn call_run(target: &str, ctx: &mut Context) -> crate::Result<()> {
    let Some(callee) = resolve(target, SectionKind::Run, ctx) else {
        tracing::warn!("Couldn't find run section '{}'", target);
        return Ok(());
    };

    let mut scoped = enter(target, SectionKind::Run, ctx)?;
    match callee.files {
        Some((files, dir)) => {
            let mut with_files = scoped.push_files(files, dir);
            run_section(&callee.section, &mut with_files)
        }
        None => run_section(&callee.section, &mut scoped),
    }
}

/// Dependencies declared by the section a call names
pub fn call_dependencies(target: &str, ctx: &mut Context) -> crate::Result<Vec<Dependency>> {
    let Some(callee) = resolve(target, SectionKind::Dependencies, ctx) else {
        tracing::warn!("Couldn't find dependencies section '{}'", target);
        return Ok(Vec::new());
    };

    let mut scoped = enter(target, SectionKind::Dependencies, ctx)?;
    match callee.files {
        Some((files, dir)) => {
            let mut with_files = scoped.push_files(files, dir);
            dependencies_section(&callee.section, &mut with_files)
        }
        None => dependencies_section(&callee.section, &mut scoped),
    }
}

/// Runner for `call`
pub struct CallRunner;

impl CommandRunner for CallRunner {
    fn name(&self) -> &'static str {
        "call"
    }

    fn matches(&self, command: &Command) -> bool {
        command.comm_type == "call"
    }

    fn run(&self, command: &Command, ctx: &mut Context) -> crate::Result<Value> {
        let target = command.format_str(ctx)?;
        match ctx.section_kind {
            SectionKind::Run => {
                call_run(target.trim(), ctx)?;
                Ok(Value::Null)
            }
            SectionKind::Dependencies => {
                let deps = call_dependencies(target.trim(), ctx)?;
                Ok(dependencies_to_value(&deps))
            }
        }
    }
}
