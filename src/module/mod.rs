// src/module/mod.rs
//! Compiled units and their identities.

pub mod loader;

use crate::frontend::ast::{Import, ModuleAst};
use crate::sema::Analysis;
use crate::sema::symbol_table::TableId;
use crate::sema::types::TypeId;
use crate::tir::CodeObject;
use std::path::PathBuf;
use std::rc::Rc;

/// File extension of Stoat source files
pub const SOURCE_EXTENSION: &str = "stoat";

/// File extension of compiled bytecode files. The emitter owns the actual
/// format; the compiler only computes import paths with it.
pub const BYTECODE_EXTENSION: &str = "bc";

/// Modules compiled without a module object: their top-level code object
/// skips the define-module block and their globals also land on the
/// toplevel.
pub const BOOTSTRAP_MODULES: &[&str] = &["std::bootstrap"];

/// The name of the global holding the module object, used by lambda
/// self-defaulting and module-method sends.
pub const MODULE_GLOBAL: &str = "MODULE";

/// A module registered in the compile state
#[derive(Debug)]
pub struct Module {
    /// Unqualified name: the last path segment
    pub name: String,
    pub qualified_name: String,
    pub source_path: PathBuf,
    pub define_module: bool,
    /// Import nodes in source order, collected by the first pass
    pub imports: Vec<Import>,
    /// The module's global symbol table
    pub globals: TableId,
    /// The module object's type; `self` in module scope
    pub self_type: TypeId,
    pub ast: Rc<ModuleAst>,
    pub analysis: Analysis,
    /// The top-level code object, filled by the TIR generator
    pub body: Option<CodeObject>,
    /// In-progress marker for import cycle detection
    pub loading: bool,
}

impl Module {
    pub fn new(
        qualified_name: impl Into<String>,
        source_path: PathBuf,
        globals: TableId,
        self_type: TypeId,
        ast: Rc<ModuleAst>,
    ) -> Self {
        let qualified_name = qualified_name.into();
        let name = qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(&qualified_name)
            .to_string();
        let define_module = !BOOTSTRAP_MODULES.contains(&qualified_name.as_str());

        Self {
            name,
            qualified_name,
            source_path,
            define_module,
            imports: Vec::new(),
            globals,
            self_type,
            ast,
            analysis: Analysis::default(),
            body: None,
            loading: false,
        }
    }

    /// The path the VM loads this module's bytecode from:
    /// `a::b::c` becomes `a/b/c.bc`.
    pub fn bytecode_import_path(&self) -> String {
        format!(
            "{}.{}",
            self.qualified_name.replace("::", "/"),
            BYTECODE_EXTENSION
        )
    }
}

/// The relative source path of a qualified name: `a::b` -> `a/b.stoat`.
pub fn source_relative_path(qualified_name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in qualified_name.split("::") {
        path.push(segment);
    }
    path.set_extension(SOURCE_EXTENSION);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Span;

    fn module(qualified_name: &str) -> Module {
        Module::new(
            qualified_name,
            PathBuf::from("src.stoat"),
            TableId(0),
            TypeId::DYNAMIC,
            Rc::new(ModuleAst {
                body: Vec::new(),
                location: Span::default(),
            }),
        )
    }

    #[test]
    fn bytecode_import_path_replaces_separators() {
        assert_eq!(
            module("std::hash_map").bytecode_import_path(),
            "std/hash_map.bc"
        );
        assert_eq!(module("main").bytecode_import_path(), "main.bc");
    }

    #[test]
    fn name_is_the_last_segment() {
        assert_eq!(module("std::hash_map").name, "hash_map");
        assert_eq!(module("main").name, "main");
    }

    #[test]
    fn bootstrap_modules_skip_the_module_object() {
        assert!(!module("std::bootstrap").define_module);
        assert!(module("std::prelude").define_module);
    }

    #[test]
    fn source_paths_use_the_source_extension() {
        assert_eq!(
            source_relative_path("std::fs::file"),
            PathBuf::from("std/fs/file.stoat")
        );
    }
}
