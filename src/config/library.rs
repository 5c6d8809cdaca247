//! Assistant and snippet library
//!
//! A library root is laid out as:
//!
//! ```text
//! <root>/assistants/<role>/<name>.yaml
//! <root>/assistants/<role>/<name>/<subassistant>.yaml
//! <root>/snippets/<name>.yaml
//! <root>/files/<role>/<name>/...
//! <root>/files/snippets/<name>/...
//! ```

use crate::config::parse::{file_stem, parse_assistant_file, parse_snippet_file};
use crate::config::types::{Assistant, Snippet};
use crate::error::{ConfigError, ConfigResult, DevassistError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Known assistant roles
pub const ASSISTANT_ROLES: &[&str] = &["crt", "mod", "prep", "task"];

/// Role of assistants that create new projects
pub const CREATOR_ROLE: &str = "crt";

/// An assistant together with its subassistants
#[derive(Debug, Clone)]
pub struct AssistantNode {
    pub assistant: Arc<Assistant>,
    pub children: Vec<AssistantNode>,
}

impl AssistantNode {
    pub fn new(assistant: Assistant) -> Self {
        AssistantNode {
            assistant: Arc::new(assistant),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.assistant.name
    }
}

/// All assistants (by role) and snippets (by name) available to a run
#[derive(Debug, Default)]
pub struct Library {
    assistants: BTreeMap<String, Vec<AssistantNode>>,
    snippets: BTreeMap<String, Arc<Snippet>>,
}

impl Library {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every root; names found in earlier roots shadow later ones
    pub fn load(roots: &[PathBuf]) -> Result<Self, DevassistError> {
        let mut library = Library::new();

        for root in roots {
            for role in ASSISTANT_ROLES {
                let dir = root.join("assistants").join(role);
                if !dir.is_dir() {
                    continue;
                }
                let files_dir = root.join("files").join(role);
                for node in load_assistant_dir(&dir, &files_dir)? {
                    let nodes = library.assistants.entry(role.to_string()).or_default();
                    if !nodes.iter().any(|n| n.name() == node.name()) {
                        nodes.push(node);
                    }
                }
            }

            let snippets_dir = root.join("snippets");
            if snippets_dir.is_dir() {
                for path in yaml_files(&snippets_dir)? {
                    let name = file_stem(&path)?;
                    if library.snippets.contains_key(&name) {
                        continue;
                    }
                    let snippet = parse_snippet_file(&path)?
                        .with_files_dir(root.join("files").join("snippets").join(&name));
                    library.add_snippet(snippet);
                }
            }
        }

        Ok(library)
    }

    /// Register an assistant under `role`, nested below the `parents` path
    pub fn add_assistant(
        &mut self,
        role: &str,
        parents: &[&str],
        assistant: Assistant,
    ) -> ConfigResult<()> {
        let mut nodes = self.assistants.entry(role.to_string()).or_default();
        for (depth, parent) in parents.iter().enumerate() {
            let node = nodes
                .iter_mut()
                .find(|n| n.name() == *parent)
                .ok_or_else(|| {
                    let mut path = vec![role];
                    path.extend_from_slice(&parents[..=depth]);
                    ConfigError::AssistantNotFound(path.join(" "))
                })?;
            nodes = &mut node.children;
        }
        nodes.push(AssistantNode::new(assistant));
        Ok(())
    }

    /// Register a snippet, replacing any snippet of the same name
    pub fn add_snippet(&mut self, snippet: Snippet) {
        self.snippets.insert(snippet.name.clone(), Arc::new(snippet));
    }

    pub fn snippet(&self, name: &str) -> Option<Arc<Snippet>> {
        self.snippets.get(name).cloned()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.assistants.keys().map(String::as_str)
    }

    /// Top-level assistants of a role
    pub fn assistants(&self, role: &str) -> &[AssistantNode] {
        self.assistants.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a path of names under `role` into the chain of assistants
    ///
    /// `chain("crt", ["python", "django"])` returns `[python, django]`.
    pub fn chain<S: AsRef<str>>(&self, role: &str, names: &[S]) -> ConfigResult<Vec<Arc<Assistant>>> {
        let not_found = || {
            let mut path = vec![role.to_string()];
            path.extend(names.iter().map(|n| n.as_ref().to_string()));
            ConfigError::AssistantNotFound(path.join(" "))
        };

        if names.is_empty() {
            return Err(not_found());
        }

        let mut chain = Vec::with_capacity(names.len());
        let mut nodes = self.assistants(role);
        for name in names {
            let node = nodes
                .iter()
                .find(|n| n.name() == name.as_ref())
                .ok_or_else(not_found)?;
            chain.push(Arc::clone(&node.assistant));
            nodes = &node.children;
        }

        Ok(chain)
    }
}

/// Load the assistants of one directory and, recursively, their subassistants
fn load_assistant_dir(dir: &Path, files_dir: &Path) -> Result<Vec<AssistantNode>, DevassistError> {
    let mut nodes = Vec::new();

    for path in yaml_files(dir)? {
        let name = file_stem(&path)?;
        let assistant = parse_assistant_file(&path)?.with_files_dir(files_dir.join(&name));
        let mut node = AssistantNode::new(assistant);

        let sub_dir = dir.join(&name);
        if sub_dir.is_dir() {
            node.children = load_assistant_dir(&sub_dir, &files_dir.join(&name))?;
        }
        nodes.push(node);
    }

    Ok(nodes)
}

/// YAML files directly inside `dir`, sorted by path
fn yaml_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let base = dir.to_str().ok_or_else(|| {
        ConfigError::Invalid(format!("path is not valid UTF-8: {}", dir.display()))
    })?;
    let base = glob::Pattern::escape(base);

    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = format!("{}/*.{}", base, ext);
        let paths = glob::glob(&pattern)
            .map_err(|e| ConfigError::Invalid(format!("bad pattern '{}': {}", pattern, e)))?;
        for path in paths {
            let path = path.map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_library_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "assistants/crt/python.yaml", "fullname: Python\n");
        write(root, "assistants/crt/python/django.yaml", "run:\n  - log_i: django\n");
        write(root, "assistants/mod/eclipse.yml", "run: []\n");
        write(root, "snippets/git.yaml", "run:\n  - cl: git init\n");

        let library = Library::load(&[root.to_path_buf()]).unwrap();

        let chain = library.chain("crt", &["python", "django"]).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].fullname, "Python");
        assert_eq!(chain[1].name, "django");
        assert_eq!(chain[1].files_dir, root.join("files/crt/python/django"));

        assert_eq!(library.assistants("mod").len(), 1);
        assert_eq!(library.roles().collect::<Vec<_>>(), vec!["crt", "mod"]);
        let git = library.snippet("git").unwrap();
        assert!(git.section("run").is_some());
        assert_eq!(git.files_dir, root.join("files/snippets/git"));
    }

    #[test]
    fn test_earlier_root_shadows_later() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "assistants/crt/c.yaml", "fullname: First\n");
        write(second.path(), "assistants/crt/c.yaml", "fullname: Second\n");

        let library =
            Library::load(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
        let chain = library.chain("crt", &["c"]).unwrap();
        assert_eq!(chain[0].fullname, "First");
    }

    #[test]
    fn test_chain_not_found() {
        let library = Library::new();
        let result = library.chain("crt", &["nope"]);
        assert!(matches!(result, Err(ConfigError::AssistantNotFound(p)) if p == "crt nope"));
    }

    #[test]
    fn test_add_assistant_under_parent() {
        let mut library = Library::new();
        library
            .add_assistant("crt", &[], Assistant::from_def("web", Default::default()).unwrap())
            .unwrap();
        library
            .add_assistant(
                "crt",
                &["web"],
                Assistant::from_def("django", Default::default()).unwrap(),
            )
            .unwrap();

        assert_eq!(library.chain("crt", &["web", "django"]).unwrap().len(), 2);
        assert!(library
            .add_assistant("crt", &["missing"], Assistant::default())
            .is_err());
    }
}
