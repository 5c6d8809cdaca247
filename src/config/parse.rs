//! Script file parsing and library discovery

use crate::config::types::{Assistant, ScriptDef, Snippet};
use crate::error::{ConfigError, ConfigResult, DevassistError};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding extra library roots
pub const LIBRARY_PATH_VAR: &str = "DEVASSIST_PATH";

/// Project-local library directory name
const LOCAL_LIBRARY_DIR: &str = ".devassist";

/// Candidate library roots, in priority order
///
/// Explicit roots come first, then `DEVASSIST_PATH`, the project-local
/// `.devassist` directory and finally the per-user data directory.
pub fn library_search_path(explicit: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = explicit.to_vec();

    if let Some(paths) = env::var_os(LIBRARY_PATH_VAR) {
        candidates.extend(env::split_paths(&paths));
    }

    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(LOCAL_LIBRARY_DIR));
    }

    if let Some(dirs) = ProjectDirs::from("org", "devassist", "devassist") {
        candidates.push(dirs.data_dir().to_path_buf());
    }

    candidates
}

/// Find the library roots that exist on disk
pub fn find_library_roots(explicit: &[PathBuf]) -> ConfigResult<Vec<PathBuf>> {
    let candidates = library_search_path(explicit);
    let roots: Vec<PathBuf> = candidates.iter().filter(|p| p.is_dir()).cloned().collect();

    if roots.is_empty() {
        let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        return Err(ConfigError::NotFound(searched.join(", ")));
    }

    Ok(roots)
}

/// Parse a script definition from YAML text
pub fn parse_script(yaml: &str) -> Result<ScriptDef, DevassistError> {
    // An empty file is a script with no sections
    if yaml.trim().is_empty() {
        return Ok(ScriptDef::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse an assistant from YAML text
pub fn parse_assistant(yaml: &str, name: &str) -> Result<Assistant, DevassistError> {
    let def = parse_script(yaml)?;
    Ok(Assistant::from_def(name, def)?)
}

/// Parse an assistant file; its name is the file stem
pub fn parse_assistant_file(path: &Path) -> Result<Assistant, DevassistError> {
    let def = read_script_file(path)?;
    Assistant::from_def(file_stem(path)?, def).map_err(|e| script_error(path, e).into())
}

/// Parse a snippet file; its name is the file stem
pub fn parse_snippet_file(path: &Path) -> Result<Snippet, DevassistError> {
    let def = read_script_file(path)?;
    Snippet::from_def(file_stem(path)?, def).map_err(|e| script_error(path, e).into())
}

fn read_script_file(path: &Path) -> ConfigResult<ScriptDef> {
    let contents = fs::read_to_string(path).map_err(|e| script_error(path, e))?;
    parse_script(&contents).map_err(|e| script_error(path, e))
}

pub(crate) fn file_stem(path: &Path) -> ConfigResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| script_error(path, "file name is not valid UTF-8"))
}

fn script_error(path: &Path, error: impl ToString) -> ConfigError {
    ConfigError::InvalidScript {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_assistant() {
        let yaml = r#"
fullname: Python
run:
  - cl: echo python
"#;
        let assistant = parse_assistant(yaml, "python").unwrap();
        assert_eq!(assistant.name, "python");
        assert_eq!(assistant.section("run").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_empty_script() {
        let assistant = parse_assistant("", "empty").unwrap();
        assert!(assistant.section("run").is_none());
    }

    #[test]
    fn test_parse_assistant_file_uses_stem() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flask.yaml");
        fs::write(&path, "run:\n  - log_i: flask\n").unwrap();

        let assistant = parse_assistant_file(&path).unwrap();
        assert_eq!(assistant.name, "flask");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "run: just a string\n").unwrap();

        let err = parse_assistant_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_explicit_roots_come_first() {
        let temp_dir = TempDir::new().unwrap();
        let roots = find_library_roots(&[temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(roots[0], temp_dir.path());
    }
}
