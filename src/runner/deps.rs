//! Dependency resolution
//!
//! A dependencies section is walked like a run section, but instead of running
//! leaf entries it collects `{kind: argument}` declarations. Assignments and
//! conditions still evaluate for real, so shell conditions see live state.

use crate::config::{Assistant, Section, DEPENDENCIES_SECTION};
use crate::error::SyntaxError;
use crate::runner::section::{expand_for, scl_labels, section_from_condition, Construct, Pairing};
use crate::runner::{
    assign_variable, call_dependencies, format_str, format_value, is_truthy, render, Context,
    SectionKind,
};
use serde_yaml::{Mapping, Value};
use std::sync::Arc;

/// Dependency kinds an installer understands
pub const DEPENDENCY_KINDS: &[&str] = &["rpm", "pip", "npm", "gem"];

/// One dependency declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Installer kind, e.g. `rpm`
    pub kind: String,

    /// Packages, usually a list of names
    pub arg: Value,
}

impl Dependency {
    pub fn new(kind: impl Into<String>, arg: Value) -> Self {
        Dependency {
            kind: kind.into(),
            arg,
        }
    }

    /// Package names as strings; a scalar argument is a single package
    pub fn packages(&self) -> Vec<String> {
        match &self.arg {
            Value::Sequence(items) => items.iter().map(render).collect(),
            Value::Null => Vec::new(),
            other => vec![render(other)],
        }
    }
}

pub fn is_dependency_kind(tag: &str) -> bool {
    DEPENDENCY_KINDS.contains(&tag)
}

/// Serialize declarations as a list of single-key mappings
pub fn dependencies_to_value(deps: &[Dependency]) -> Value {
    Value::Sequence(
        deps.iter()
            .map(|dep| {
                let mut entry = Mapping::new();
                entry.insert(Value::String(dep.kind.clone()), dep.arg.clone());
                Value::Mapping(entry)
            })
            .collect(),
    )
}

/// Parse a list of single-key mappings back into declarations
pub fn dependencies_from_value(value: &Value) -> crate::Result<Vec<Dependency>> {
    let section = Section::from_value(value)
        .map_err(|e| SyntaxError::InvalidSection(format!("dependency list: {}", e)))?;
    Ok(section
        .iter()
        .map(|entry| Dependency::new(entry.tag.clone(), entry.arg.clone()))
        .collect())
}

/// Collect the dependencies a section declares
pub fn dependencies_section(section: &Section, ctx: &mut Context) -> crate::Result<Vec<Dependency>> {
    let entries = section.entries();
    let mut deps = Vec::new();
    let mut pairing = Pairing::Scanning;

    for (i, entry) in entries.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            break;
        }

        match Construct::of(&entry.tag) {
            Construct::Assign => assign_variable(&entry.tag, &entry.arg, ctx)?,
            Construct::If => {
                let (to_run, consumed) = section_from_condition(entry, entries.get(i + 1), ctx)?;
                pairing = if consumed {
                    Pairing::ElseConsumed
                } else {
                    Pairing::Scanning
                };
                if let Some(body) = to_run {
                    deps.extend(dependencies_section(&body, ctx)?);
                }
            }
            Construct::Else => {
                if pairing != Pairing::ElseConsumed {
                    tracing::warn!("Encountered 'else' with no associated 'if', skipping");
                }
                pairing = Pairing::Scanning;
            }
            Construct::For => {
                let body = entry.body()?;
                for iteration in expand_for(&entry.tag, ctx)? {
                    for (name, value) in iteration {
                        ctx.set_var(name, value);
                    }
                    deps.extend(dependencies_section(&body, ctx)?);
                }
            }
            Construct::Scl => {
                let body = entry.body()?;
                let mut scoped = ctx.push_scls(scl_labels(&entry.tag));
                deps.extend(dependencies_section(&body, &mut scoped)?);
            }
            Construct::Command if entry.tag == "call" => {
                let target = format_str(&render(&entry.arg), ctx);
                deps.extend(call_dependencies(&target, ctx)?);
            }
            Construct::Command if is_dependency_kind(&entry.tag) => {
                deps.push(Dependency::new(entry.tag.clone(), format_value(&entry.arg, ctx)));
            }
            Construct::Command => {
                tracing::warn!("Unknown dependency type '{}', skipping", entry.tag);
            }
        }
    }

    Ok(deps)
}

/// Dependencies of an assistant for the current variables
///
/// Collects `dependencies` and then every `dependencies_<arg>` section whose
/// argument is set to a truthy value.
pub fn assistant_dependencies(
    assistant: &Arc<Assistant>,
    ctx: &Context,
) -> crate::Result<Vec<Dependency>> {
    let mut scoped = ctx.fork(SectionKind::Dependencies);
    scoped.assistant = Arc::clone(assistant);

    let prefix = format!("{}_", DEPENDENCIES_SECTION);
    let mut names = vec![DEPENDENCIES_SECTION.to_string()];
    for name in assistant.section_names() {
        if let Some(arg) = name.strip_prefix(&prefix) {
            if scoped.get_var(arg).is_some_and(is_truthy) {
                names.push(name.to_string());
            }
        }
    }

    let mut deps = Vec::new();
    for name in names {
        if let Some(section) = assistant.section(&name) {
            tracing::debug!("Resolving {} of {}", name, assistant.name);
            deps.extend(dependencies_section(section, &mut scoped)?);
        }
    }
    Ok(deps)
}
