//! Project marker file
//!
//! Every project created by an assistant gets a `.devassistant` file recording
//! which assistant produced it and with which arguments, so that later runs
//! (installing dependencies, re-running sections) can reconstruct the original
//! invocation.

use crate::config::library::ASSISTANT_ROLES;
use crate::error::{ExecutionError, ExecutionResult};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the marker inside a project directory
pub const MARKER_FILE: &str = ".devassistant";

/// Prefix for re-exposed original arguments
pub const ORIGINAL_ARG_PREFIX: &str = "dda__";

/// Contents of a `.devassistant` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMarker {
    /// Version of the tool that wrote the file
    #[serde(default)]
    pub devassistant_version: String,

    /// Path of the assistant that created the project, without the role
    #[serde(default)]
    pub subassistant_path: Vec<String>,

    /// Arguments the project was created with
    #[serde(default)]
    pub original_kwargs: BTreeMap<String, Value>,

    /// Hand-written additions such as `dependencies` or `run` sections
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProjectMarker {
    /// Create a marker for `path`; a leading role entry is dropped
    pub fn new(path: Vec<String>, original_kwargs: BTreeMap<String, Value>) -> Self {
        let mut path = path;
        if path
            .first()
            .is_some_and(|first| ASSISTANT_ROLES.contains(&first.as_str()))
        {
            path.remove(0);
        }

        ProjectMarker {
            devassistant_version: crate::VERSION.to_string(),
            subassistant_path: path,
            original_kwargs,
            extra: BTreeMap::new(),
        }
    }

    /// Write the marker into `dir`, returning the file path
    pub fn write_to(&self, dir: &Path) -> ExecutionResult<PathBuf> {
        let path = dir.join(MARKER_FILE);
        let contents = serde_yaml::to_string(self)
            .map_err(|e| ExecutionError::MarkerFile(e.to_string()))?;
        fs::write(&path, contents)
            .map_err(|e| ExecutionError::MarkerFile(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }

    /// Read the marker from `dir`; a missing or malformed file is an error
    pub fn read_from(dir: &Path) -> ExecutionResult<Self> {
        let path = dir.join(MARKER_FILE);
        let contents = fs::read_to_string(&path)
            .map_err(|e| ExecutionError::MarkerFile(format!("{}: {}", path.display(), e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ExecutionError::MarkerFile(format!("{}: {}", path.display(), e)))
    }

    /// The marker as a mapping, plus `dda__<arg>` aliases and the project `name`
    pub fn to_mapping(&self, dir: &Path) -> ExecutionResult<Mapping> {
        let value =
            serde_yaml::to_value(self).map_err(|e| ExecutionError::MarkerFile(e.to_string()))?;
        let mut mapping = match value {
            Value::Mapping(mapping) => mapping,
            _ => Mapping::new(),
        };

        for (key, value) in &self.original_kwargs {
            mapping.insert(
                Value::String(format!("{}{}", ORIGINAL_ARG_PREFIX, key)),
                value.clone(),
            );
        }
        mapping.insert(
            Value::String("name".to_string()),
            Value::String(project_name(dir)),
        );

        Ok(mapping)
    }

    /// An extra top-level value of the marker, `null` when absent
    pub fn extra_value(&self, key: &str) -> Value {
        self.extra.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// Resolve a project directory argument: `~` expansion, then relative to `base`
pub fn project_dir(arg: &str, base: &Path) -> PathBuf {
    let expanded = match arg.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(arg)),
        _ => PathBuf::from(arg),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    fs::canonicalize(&absolute).unwrap_or(absolute)
}

/// Base name of a project directory
pub fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
