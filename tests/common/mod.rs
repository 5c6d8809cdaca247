//! Common test utilities

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An assistant library laid out in a temporary directory
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        TestLibrary {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `assistants/<role>/<path...>.yaml`
    pub fn assistant(&self, role: &str, path: &[&str], yaml: &str) -> &Self {
        let mut file = self.root().join("assistants").join(role);
        for name in path {
            file.push(name);
        }
        file.set_extension("yaml");
        write_file(&file, yaml);
        self
    }

    /// Write `snippets/<name>.yaml`
    pub fn snippet(&self, name: &str, yaml: &str) -> &Self {
        write_file(&self.root().join("snippets").join(format!("{}.yaml", name)), yaml);
        self
    }

    /// Write a file below `files/`
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        write_file(&self.root().join("files").join(rel), content);
        self
    }
}

/// Create a temporary working directory
pub fn work_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().canonicalize().unwrap();
    (temp_dir, path)
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
