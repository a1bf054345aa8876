// src/module/loader.rs
//! Source file resolution for imports.
//!
//! A qualified name maps to a relative path (`std::fs` -> `std/fs.stoat`)
//! searched through the include directories in order; earlier entries
//! shadow later ones.

use super::source_relative_path;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ModuleLoader {
    include: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(include: Vec<PathBuf>) -> Self {
        Self { include }
    }

    /// Resolve a qualified name to the first matching source file.
    pub fn resolve(&self, qualified_name: &str) -> Option<PathBuf> {
        let relative = source_relative_path(qualified_name);
        for directory in &self.include {
            let candidate = directory.join(&relative);
            if candidate.is_file() {
                tracing::debug!(module = qualified_name, path = %candidate.display(), "resolved module");
                return Some(candidate);
            }
        }
        None
    }

    pub fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_modules_resolve_to_none() {
        let loader = ModuleLoader::new(vec![PathBuf::from("/nonexistent")]);
        assert!(loader.resolve("std::missing").is_none());
    }

    #[test]
    fn earlier_include_directories_shadow_later_ones() {
        let base = std::env::temp_dir().join(format!("stoat-loader-{}", std::process::id()));
        let first = base.join("first");
        let second = base.join("second");
        std::fs::create_dir_all(first.join("std")).unwrap();
        std::fs::create_dir_all(second.join("std")).unwrap();
        std::fs::write(first.join("std/fs.stoat"), "").unwrap();
        std::fs::write(second.join("std/fs.stoat"), "").unwrap();

        let loader = ModuleLoader::new(vec![first.clone(), second]);
        let resolved = loader.resolve("std::fs").unwrap();
        assert!(resolved.starts_with(&first));

        std::fs::remove_dir_all(base).ok();
    }
}
