//! Core script types
//!
//! This module defines the data structures that represent assistant and snippet
//! YAML files, and the ordered `Section` form the interpreter walks.

use crate::config::schema::validate_script;
use crate::error::{ConfigError, ConfigResult, SyntaxError, SyntaxResult};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the default run section
pub const RUN_SECTION: &str = "run";

/// Name of the default dependencies section
pub const DEPENDENCIES_SECTION: &str = "dependencies";

/// One `{type tag: argument}` pair of a section
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The type tag, e.g. `cl`, `if $foo`, `$result`
    pub tag: String,

    /// The tag's argument: a string, or a nested section for composite constructs
    pub arg: Value,
}

impl Entry {
    pub fn new(tag: impl Into<String>, arg: Value) -> Self {
        Entry {
            tag: tag.into(),
            arg,
        }
    }

    /// Interpret the argument as a nested section
    pub fn body(&self) -> SyntaxResult<Section> {
        Section::from_value(&self.arg)
            .map_err(|e| SyntaxError::InvalidSection(format!("body of '{}': {}", self.tag, e)))
    }
}

/// An ordered list of single-key command entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    entries: Vec<Entry>,
}

impl Section {
    pub fn new(entries: Vec<Entry>) -> Self {
        Section { entries }
    }

    /// Build a section from a loaded YAML value
    ///
    /// `null` is an empty section. Every item must be a mapping with exactly
    /// one string key.
    pub fn from_value(value: &Value) -> SyntaxResult<Self> {
        let items = match value {
            Value::Null => return Ok(Section::default()),
            Value::Sequence(items) => items,
            other => {
                return Err(SyntaxError::InvalidSection(format!(
                    "expected a list of commands, got {}",
                    describe(other)
                )))
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let mapping = item.as_mapping().ok_or_else(|| {
                SyntaxError::InvalidSection(format!(
                    "expected a single-key mapping, got {}",
                    describe(item)
                ))
            })?;

            if mapping.len() != 1 {
                return Err(SyntaxError::InvalidSection(format!(
                    "command entry must have exactly one key, got {}",
                    mapping.len()
                )));
            }

            for (key, arg) in mapping {
                let tag = key.as_str().ok_or_else(|| {
                    SyntaxError::InvalidSection(format!(
                        "command type must be a string, got {}",
                        describe(key)
                    ))
                })?;
                entries.push(Entry::new(tag, arg.clone()));
            }
        }

        Ok(Section { entries })
    }

    /// Parse a section directly from YAML text
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(Section::from_value(&value)?)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

/// Short description of a YAML value kind, for error messages
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Raw shape shared by assistant and snippet files
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptDef {
    /// Human readable name
    #[serde(default)]
    pub fullname: Option<String>,

    /// Longer description for help text
    #[serde(default)]
    pub description: Option<String>,

    /// Arguments the assistant accepts on invocation
    #[serde(default)]
    pub args: BTreeMap<String, ArgDef>,

    /// Files section: name -> {source: relative path}
    #[serde(default)]
    pub files: Value,

    /// Everything else, including the `run*` and `dependencies*` sections
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

/// An argument declaration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ArgDef {
    /// Command line flags, e.g. ["-n", "--name"]
    #[serde(default)]
    pub flags: Vec<String>,

    /// Help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Required argument
    #[serde(default)]
    pub required: bool,

    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Whether a top-level key names a run or dependencies section
pub fn is_section_key(key: &str) -> bool {
    key.starts_with(RUN_SECTION) || key.starts_with(DEPENDENCIES_SECTION)
}

fn collect_sections(rest: BTreeMap<String, Value>) -> ConfigResult<BTreeMap<String, Section>> {
    let mut sections = BTreeMap::new();
    for (key, value) in rest {
        if !is_section_key(&key) {
            continue;
        }
        let section = Section::from_value(&value)
            .map_err(|e| ConfigError::Invalid(format!("section '{}': {}", key, e)))?;
        sections.insert(key, section);
    }
    Ok(sections)
}

/// A loaded assistant
#[derive(Debug, Clone, Default)]
pub struct Assistant {
    /// Name, taken from the file stem
    pub name: String,

    /// Human readable name
    pub fullname: String,

    /// Longer description
    pub description: Option<String>,

    /// Declared invocation arguments
    pub args: BTreeMap<String, ArgDef>,

    /// Files section
    pub files: Value,

    /// Directory the files section is relative to
    pub files_dir: PathBuf,

    sections: BTreeMap<String, Section>,
}

impl Assistant {
    /// Build an assistant from its parsed definition
    pub fn from_def(name: impl Into<String>, def: ScriptDef) -> ConfigResult<Self> {
        validate_script(&def)?;

        let name = name.into();
        Ok(Assistant {
            fullname: def.fullname.unwrap_or_else(|| name.clone()),
            name,
            description: def.description,
            args: def.args,
            files: def.files,
            files_dir: PathBuf::new(),
            sections: collect_sections(def.rest)?,
        })
    }

    /// Set the directory the files section is relative to
    pub fn with_files_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.files_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Look up a named section, e.g. `run`, `run_foo`, `dependencies_bar`
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }
}

/// A reusable script addressed by name from `call` entries
#[derive(Debug, Clone, Default)]
pub struct Snippet {
    pub name: String,
    pub files: Value,
    pub files_dir: PathBuf,
    sections: BTreeMap<String, Section>,
}

impl Snippet {
    pub fn from_def(name: impl Into<String>, def: ScriptDef) -> ConfigResult<Self> {
        validate_script(&def)?;

        Ok(Snippet {
            name: name.into(),
            files: def.files,
            files_dir: PathBuf::new(),
            sections: collect_sections(def.rest)?,
        })
    }

    pub fn with_files_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.files_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_from_yaml() {
        let section = Section::from_yaml(
            r#"
- cl: echo hello
- if $foo:
  - log_i: yes
- else:
  - log_i: no
"#,
        )
        .unwrap();

        assert_eq!(section.len(), 3);
        assert_eq!(section.entries()[0].tag, "cl");
        assert_eq!(section.entries()[1].tag, "if $foo");
        assert_eq!(section.entries()[1].body().unwrap().len(), 1);
    }

    #[test]
    fn test_null_is_empty_section() {
        let section = Section::from_value(&Value::Null).unwrap();
        assert!(section.is_empty());
    }

    #[test]
    fn test_entry_with_two_keys_is_rejected() {
        let result = Section::from_yaml("- {cl: ls, log_i: hi}");
        assert!(matches!(
            result,
            Err(crate::DevassistError::Syntax(SyntaxError::InvalidSection(_)))
        ));
    }

    #[test]
    fn test_scalar_section_is_rejected() {
        let result = Section::from_value(&Value::String("cl: ls".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_assistant_collects_sections() {
        let yaml = r#"
fullname: Django
args:
  name:
    flags: [-n, --name]
    required: true
dependencies:
  - rpm: [python-django]
run:
  - cl: django-admin startproject $name
run_extra:
  - log_i: extra
icon_path: django.svg
"#;
        let def: ScriptDef = serde_yaml::from_str(yaml).unwrap();
        let assistant = Assistant::from_def("django", def).unwrap();

        assert_eq!(assistant.fullname, "Django");
        assert!(assistant.is_arg("name"));
        assert!(assistant.section("run").is_some());
        assert!(assistant.section("run_extra").is_some());
        assert!(assistant.section("dependencies").is_some());
        assert!(assistant.section("icon_path").is_none());
    }

    #[test]
    fn test_fullname_defaults_to_name() {
        let assistant = Assistant::from_def("python", ScriptDef::default()).unwrap();
        assert_eq!(assistant.fullname, "python");
    }
}
