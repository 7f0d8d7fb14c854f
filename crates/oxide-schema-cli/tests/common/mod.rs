#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use oxide_schema_core::DialectRegistry;
use tempfile::TempDir;

/// A scratch directory holding command inputs.
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap_or_else(|e| panic!("Failed to create temp dir: {e}")),
        }
    }

    /// Writes `contents` to `name` and returns its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn registry() -> DialectRegistry {
    let mut registry = DialectRegistry::new();
    oxide_schema_mysql::register(&mut registry)
        .unwrap_or_else(|e| panic!("Failed to register dialect: {e}"));
    registry
}
