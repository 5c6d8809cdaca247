//! Expression evaluation
//!
//! Expressions appear as `if` conditions, `for` iterables and assignment
//! right-hand sides:
//!
//! - `$foo` / `${foo}` / `"$foo"`: true iff `foo` is defined, non-empty and not
//!   `false`; the value is the variable or an empty string.
//! - `$(command)`: true iff the command exits with 0; the value is its combined
//!   output either way.
//! - `defined $foo`: true iff `foo` is defined at all.
//! - `not <expr>`: inverts the logical result only.
//!
//! Anything that is not a string evaluates to itself.

use crate::error::{DevassistError, SyntaxError, SyntaxResult};
use crate::runner::{is_truthy, run_shell, text, Context, ShellOptions};
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    /// Logical result, used by conditions
    pub logical: bool,

    /// Value, used by assignments and loops
    pub value: Value,
}

impl Evaluated {
    pub fn new(logical: bool, value: Value) -> Self {
        Evaluated { logical, value }
    }
}

/// Evaluate an expression against the context
pub fn evaluate(expression: &Value, ctx: &mut Context) -> crate::Result<Evaluated> {
    let raw = match expression {
        Value::String(s) => s,
        other => return Ok(Evaluated::new(is_truthy(other), other.clone())),
    };

    let mut expr = raw.trim();
    let mut invert = false;
    if let Some(rest) = expr.strip_prefix("not ") {
        invert = true;
        expr = rest.trim_start();
    }

    let result = if let Some(rest) = expr.strip_prefix("$(") {
        let command = rest
            .strip_suffix(')')
            .ok_or_else(|| SyntaxError::InvalidExpression(raw.clone()))?;
        evaluate_command(command, ctx)?
    } else if expr.starts_with('$') || expr.starts_with("\"$") {
        let name = get_var_name(expr)?;
        match ctx.get_var(&name) {
            Some(value) if is_truthy(value) => Evaluated::new(true, value.clone()),
            _ => Evaluated::new(false, text("")),
        }
    } else if let Some(rest) = expr.strip_prefix("defined ") {
        let name = get_var_name(rest)?;
        match ctx.get_var(&name) {
            Some(value) => Evaluated::new(true, value.clone()),
            None => Evaluated::new(false, text("")),
        }
    } else {
        return Err(SyntaxError::InvalidExpression(raw.clone()).into());
    };

    Ok(Evaluated {
        logical: result.logical != invert,
        value: result.value,
    })
}

/// Run `$(...)`; a failing command is a false result, not an error
fn evaluate_command(command: &str, ctx: &mut Context) -> crate::Result<Evaluated> {
    let command = crate::runner::format_str(command, ctx);
    match run_shell(&command, ctx, ShellOptions::quiet()) {
        Ok(output) => Ok(Evaluated::new(true, text(output))),
        Err(DevassistError::Execution(err)) => {
            let output = match err {
                crate::error::ExecutionError::CommandFailed { output, .. } => output,
                _ => String::new(),
            };
            Ok(Evaluated::new(false, text(output)))
        }
        Err(e) => Err(e),
    }
}

/// Extract a variable name from `$foo`, `${foo}`, `"$foo"` or `'${foo}'`
pub fn get_var_name(reference: &str) -> SyntaxResult<String> {
    let trimmed = reference.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| trimmed.strip_prefix(*q).and_then(|s| s.strip_suffix(*q)))
        .unwrap_or(trimmed);

    let name = unquoted
        .strip_prefix('$')
        .ok_or_else(|| SyntaxError::InvalidVariable(reference.to_string()))?;
    let name = name
        .strip_prefix('{')
        .and_then(|n| n.strip_suffix('}'))
        .unwrap_or(name);

    if name.is_empty() {
        return Err(SyntaxError::InvalidVariable(reference.to_string()));
    }
    Ok(name.to_string())
}

fn for_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^for\s+(\$\{?\w+\}?)(?:\s*,\s*(\$\{?\w+\}?))?\s+in\s+(\S.*)$").unwrap()
    })
}

/// Parse a `for` header into its control variable names and iterable expression
///
/// - `for $i in $foo` gives (["i"], "$foo")
/// - `for ${i} in $(ls $foo)` gives (["i"], "$(ls $foo)")
/// - `for $k, $v in $foo` gives (["k", "v"], "$foo")
pub fn parse_for(header: &str) -> SyntaxResult<(Vec<String>, String)> {
    let caps = for_regex()
        .captures(header.trim())
        .ok_or_else(|| SyntaxError::InvalidFor(header.to_string()))?;

    let mut vars = vec![get_var_name(&caps[1])?];
    if let Some(second) = caps.get(2) {
        vars.push(get_var_name(second.as_str())?);
    }

    Ok((vars, caps[3].trim().to_string()))
}
