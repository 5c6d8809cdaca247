//! Section interpreter
//!
//! Walks a section top to bottom. Control entries (assignment, `if`/`else`,
//! `for`, `scl`) are handled here; every other entry becomes a [`Command`] for
//! the registry. The cancel token is checked before each entry.

use crate::config::{describe, Entry, Section};
use crate::error::{ConfigError, DevassistError, SyntaxError};
use crate::runner::{evaluate, get_var_name, parse_for, text, Command, Context};
use serde_yaml::Value;
use std::sync::Arc;

/// Position of the walk relative to an `if`/`else` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pairing {
    /// No pending `else`
    Scanning,
    /// The next entry is the `else` of the previous `if` and was already handled
    ElseConsumed,
}

/// Control construct an entry's tag introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construct {
    Assign,
    If,
    Else,
    For,
    Scl,
    Command,
}

impl Construct {
    pub(crate) fn of(tag: &str) -> Self {
        if tag.starts_with('$') {
            Construct::Assign
        } else if tag.starts_with("if") {
            Construct::If
        } else if tag == "else" {
            Construct::Else
        } else if tag.starts_with("for") {
            Construct::For
        } else if tag.starts_with("scl") {
            Construct::Scl
        } else {
            Construct::Command
        }
    }
}

/// Run a section against the context
pub fn run_section(section: &Section, ctx: &mut Context) -> crate::Result<()> {
    let entries = section.entries();
    let mut pairing = Pairing::Scanning;

    for (i, entry) in entries.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            tracing::debug!("Run cancelled, skipping '{}'", entry.tag);
            return Ok(());
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
                    run_section(&body, ctx)?;
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
                    run_section(&body, ctx)?;
                    if ctx.cancel.is_cancelled() {
                        break;
                    }
                }
            }
            Construct::Scl => {
                let body = entry.body()?;
                let mut scoped = ctx.push_scls(scl_labels(&entry.tag));
                run_section(&body, &mut scoped)?;
            }
            Construct::Command => {
                run_command(Command::new(entry.tag.clone(), entry.arg.clone()), ctx)?;
            }
        }
    }

    Ok(())
}

/// Dispatch a leaf command; a tag no runner handles is skipped with a warning
pub fn run_command(command: Command, ctx: &mut Context) -> crate::Result<Value> {
    let registry = Arc::clone(&ctx.registry);
    match registry.dispatch(&command, ctx) {
        Err(DevassistError::Config(ConfigError::NoRunner(tag))) => {
            tracing::warn!("Unknown command type '{}', skipping", tag);
            Ok(Value::Null)
        }
        other => other,
    }
}

/// Labels of an `scl` tag: `scl enable python33` gives ["enable", "python33"]
pub(crate) fn scl_labels(tag: &str) -> Vec<String> {
    tag.split_whitespace().skip(1).map(str::to_string).collect()
}

/// Assign the result of an expression to one or two variables
///
/// With two names the first gets the logical result and the second the value.
/// A false logical result is still stored.
pub fn assign_variable(target: &str, expression: &Value, ctx: &mut Context) -> crate::Result<()> {
    if target.matches(',').count() > 1 {
        return Err(SyntaxError::TooManyVariables(target.to_string()).into());
    }

    let names = target
        .split(',')
        .map(get_var_name)
        .collect::<Result<Vec<_>, _>>()?;
    let result = evaluate(expression, ctx)?;

    match names.as_slice() {
        [name] => ctx.set_var(name.clone(), result.value),
        [logical, value] => {
            ctx.set_var(logical.clone(), Value::Bool(result.logical));
            ctx.set_var(value.clone(), result.value);
        }
        _ => return Err(SyntaxError::InvalidVariable(target.to_string()).into()),
    }
    Ok(())
}

/// Pick the branch of an `if` entry to run
///
/// `next` is the entry following the `if`. Returns the section to run, if
/// any, and whether `next` is an `else` that has now been consumed.
pub(crate) fn section_from_condition(
    entry: &Entry,
    next: Option<&Entry>,
    ctx: &mut Context,
) -> crate::Result<(Option<Section>, bool)> {
    let else_entry = next.filter(|e| e.tag == "else");
    let condition = entry.tag.strip_prefix("if").unwrap_or(&entry.tag).trim();

    if evaluate(&text(condition), ctx)?.logical {
        Ok((Some(entry.body()?), else_entry.is_some()))
    } else {
        match else_entry {
            Some(alternative) => Ok((Some(alternative.body()?), true)),
            None => Ok((None, false)),
        }
    }
}

/// Evaluate a `for` header into the variable bindings of each iteration
///
/// One control variable iterates the whitespace-split words of a text value or
/// the items of a list. Two control variables require a mapping; anything else
/// is a syntax error raised before any iteration.
pub(crate) fn expand_for(
    header: &str,
    ctx: &mut Context,
) -> crate::Result<Vec<Vec<(String, Value)>>> {
    let (vars, expression) = parse_for(header)?;
    let value = evaluate(&text(expression), ctx)?.value;

    let iterations = match vars.as_slice() {
        [key, val] => match value {
            Value::Mapping(map) => map
                .into_iter()
                .map(|(k, v)| vec![(key.clone(), k), (val.clone(), v)])
                .collect(),
            other => return Err(SyntaxError::NotAMapping(describe(&other).to_string()).into()),
        },
        [var] => match value {
            Value::String(s) => s
                .split_whitespace()
                .map(|word| vec![(var.clone(), text(word))])
                .collect(),
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| vec![(var.clone(), item)])
                .collect(),
            _ => Vec::new(),
        },
        _ => return Err(SyntaxError::InvalidFor(header.to_string()).into()),
    };

    Ok(iterations)
}
