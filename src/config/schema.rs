//! Script validation
//!
//! Load-time checks for assistant and snippet definitions, so that structural
//! mistakes are reported with the file name instead of in the middle of a run.

use crate::config::types::{is_section_key, ScriptDef, Section};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::parse_for;
use crate::runner::section::Construct;
use serde_yaml::Value;
use std::collections::HashSet;

/// Validate a parsed assistant or snippet definition
pub fn validate_script(def: &ScriptDef) -> ConfigResult<()> {
    validate_args(def)?;

    for (key, value) in &def.rest {
        if is_section_key(key) {
            validate_section(key, value)?;
        }
    }

    validate_files(&def.files)?;

    Ok(())
}

/// Argument flags must be unique across all declared arguments
fn validate_args(def: &ScriptDef) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for arg in def.args.values() {
        for flag in &arg.flags {
            if !seen.insert(flag.as_str()) {
                return Err(ConfigError::DuplicateFlag(flag.clone()));
            }
        }
    }
    Ok(())
}

/// The files section must be a mapping of name -> {source: path}
fn validate_files(files: &Value) -> ConfigResult<()> {
    let mapping = match files {
        Value::Null => return Ok(()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(ConfigError::Invalid("files must be a mapping".to_string())),
    };

    for (name, file) in mapping {
        let has_source = file.get("source").and_then(Value::as_str).is_some();
        if !has_source {
            return Err(ConfigError::Invalid(format!(
                "file '{}' has no source",
                name.as_str().unwrap_or("?")
            )));
        }
    }
    Ok(())
}

/// Recursively validate a section and the bodies of its block entries
pub fn validate_section(name: &str, value: &Value) -> ConfigResult<()> {
    let section = Section::from_value(value)
        .map_err(|e| ConfigError::Invalid(format!("section '{}': {}", name, e)))?;

    for entry in section.iter() {
        match Construct::of(&entry.tag) {
            Construct::For => {
                parse_for(&entry.tag)
                    .map_err(|e| ConfigError::Invalid(format!("section '{}': {}", name, e)))?;
            }
            Construct::If | Construct::Else | Construct::Scl => {}
            Construct::Assign | Construct::Command => continue,
        }

        validate_section(name, &entry.arg)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(yaml: &str) -> ScriptDef {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_script() {
        let script = def(r#"
run:
  - if $foo:
    - for $i in $bar:
      - cl: echo $i
  - else:
    - scl enable python33:
      - cl: python --version
"#);
        assert!(validate_script(&script).is_ok());
    }

    #[test]
    fn test_nested_block_must_be_section() {
        let script = def(r#"
run:
  - if $foo: echo nope
"#);
        let result = validate_script(&script);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_only_exact_else_is_a_block() {
        let script = def(r#"
run:
  - elsewhere: somewhere
  - else:
    - cl: ls
"#);
        assert!(validate_script(&script).is_ok());

        let script = def("run:\n  - else: somewhere\n");
        assert!(validate_script(&script).is_err());
    }

    #[test]
    fn test_bad_for_header() {
        let script = def(r#"
run:
  - for i in $x:
    - cl: ls
"#);
        assert!(validate_script(&script).is_err());
    }

    #[test]
    fn test_duplicate_flags() {
        let script = def(r#"
args:
  name:
    flags: [-n, --name]
  nick:
    flags: [-n]
"#);
        let result = validate_script(&script);
        assert!(matches!(result, Err(ConfigError::DuplicateFlag(f)) if f == "-n"));
    }

    #[test]
    fn test_files_need_source() {
        let script = def(r#"
files:
  main: {target: main.py}
"#);
        assert!(validate_script(&script).is_err());
    }

    #[test]
    fn test_non_section_keys_are_ignored() {
        let script = def(r#"
icon_path: foo.svg
run:
  - cl: ls
"#);
        assert!(validate_script(&script).is_ok());
    }
}
