//! Variable and file-reference substitution for command strings
//!
//! `$name` and `${name}` are replaced with the rendered variable value;
//! references to undefined variables are left untouched so that shell
//! variables such as `$HOME` pass through. `*name` is replaced with the path of
//! file `name` from the innermost files section.

use crate::runner::{render, Context, Vars};
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::OnceLock;

fn var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").unwrap())
}

fn file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)\*(\w+)").unwrap())
}

/// Substitute variable references in a string
pub fn interpolate(s: &str, vars: &Vars) -> String {
    var_regex()
        .replace_all(s, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => render(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Substitute `*name` file references using a files section
pub fn interpolate_files(s: &str, files: &Value, files_dir: &Path) -> String {
    file_regex()
        .replace_all(s, |caps: &Captures| {
            let source = files
                .get(&caps[2])
                .and_then(|f| f.get("source"))
                .and_then(Value::as_str);
            match source {
                Some(source) => format!("{}{}", &caps[1], files_dir.join(source).display()),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Substitute variables, then file references from the innermost files section
pub fn format_str(s: &str, ctx: &Context) -> String {
    let formatted = interpolate(s, &ctx.vars);
    match ctx.current_files() {
        Some((files, dir)) => interpolate_files(&formatted, files, dir),
        None => formatted,
    }
}

/// Apply [`format_str`] to every string inside a nested value
pub fn format_value(value: &Value, ctx: &Context) -> Value {
    match value {
        Value::String(s) => Value::String(format_str(s, ctx)),
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(|v| format_value(v, ctx)).collect()),
        Value::Mapping(map) => {
            let mut formatted = Mapping::new();
            for (k, v) in map {
                formatted.insert(k.clone(), format_value(v, ctx));
            }
            Value::Mapping(formatted)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::text;
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        pairs.iter().map(|(k, v)| (k.to_string(), text(*v))).collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let result = interpolate("Hello, $name!", &vars(&[("name", "world")]));
        assert_eq!(result, "Hello, world!");
    }

    #[test]
    fn test_braced_variables() {
        let result = interpolate("${first}_${last}", &vars(&[("first", "John"), ("last", "Doe")]));
        assert_eq!(result, "John_Doe");
    }

    #[test]
    fn test_undefined_variable_is_kept() {
        let result = interpolate("echo $HOME ${missing}", &Vars::new());
        assert_eq!(result, "echo $HOME ${missing}");
    }

    #[test]
    fn test_non_string_values_are_rendered() {
        let mut v = Vars::new();
        v.insert("flag".to_string(), Value::Bool(false));
        v.insert("count".to_string(), Value::Number(3.into()));
        assert_eq!(interpolate("$flag $count", &v), "false 3");
    }

    #[test]
    fn test_no_interpolation() {
        assert_eq!(interpolate("No variables here", &Vars::new()), "No variables here");
    }

    #[test]
    fn test_file_references() {
        let files: Value = serde_yaml::from_str("main: {source: python/main.py}").unwrap();
        let dir = PathBuf::from("/lib/files/crt/python");

        let result = interpolate_files("cp *main ./ && ls *.py", &files, &dir);
        assert_eq!(result, "cp /lib/files/crt/python/python/main.py ./ && ls *.py");
    }

    #[test]
    fn test_format_str_uses_innermost_files() {
        let mut ctx = Context::new();
        ctx.set_var("dest", text("out"));
        let files: Value = serde_yaml::from_str("tpl: {source: a.txt}").unwrap();
        let guard = ctx.push_files(files, PathBuf::from("/f"));

        assert_eq!(format_str("cp *tpl $dest", &guard), "cp /f/a.txt out");
    }

    #[test]
    fn test_format_value_nested() {
        let mut ctx = Context::new();
        ctx.set_var("pkg", text("django"));
        let value: Value = serde_yaml::from_str("- rpm: [python-$pkg, git]").unwrap();

        let formatted = format_value(&value, &ctx);
        let expected: Value = serde_yaml::from_str("- rpm: [python-django, git]").unwrap();
        assert_eq!(formatted, expected);
    }
}
